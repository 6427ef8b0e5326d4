//! WebSocket closure codes as seen by the relay.
//!
//! Only [`CloseCode::Normal`] is treated as an intentional shutdown. Every
//! other code, including ones the relay does not recognize, sends the
//! connection back through the reconnect backoff.

use std::fmt;

/// A connection closure code (RFC 6455 §7.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloseCode {
    /// 1000: the peer finished with the connection on purpose.
    Normal,
    /// 1001: the peer is going away (server restart, page navigation).
    GoingAway,
    /// 1002: protocol error.
    Protocol,
    /// 1003: the peer received a frame type it cannot accept.
    Unsupported,
    /// 1005: a close frame arrived without a status code.
    NoStatus,
    /// 1006: the connection dropped without a close frame.
    Abnormal,
    /// 1008: policy violation.
    Policy,
    /// 1011: the server hit an unexpected condition.
    Error,
    /// 1012: the server is restarting.
    Restart,
    /// Any other code.
    Other(u16),
}

impl CloseCode {
    /// Returns `true` if this closure must not trigger a reconnect.
    pub fn is_normal(self) -> bool {
        matches!(self, Self::Normal)
    }

    /// Returns a short human-readable description of this code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Normal => "normal closure",
            Self::GoingAway => "endpoint going away",
            Self::Protocol => "protocol error",
            Self::Unsupported => "unsupported data",
            Self::NoStatus => "no status code received",
            Self::Abnormal => "abnormal closure",
            Self::Policy => "policy violation",
            Self::Error => "internal server error",
            Self::Restart => "service restart",
            Self::Other(_) => "unrecognized closure code",
        }
    }
}

impl From<u16> for CloseCode {
    fn from(code: u16) -> Self {
        match code {
            1000 => Self::Normal,
            1001 => Self::GoingAway,
            1002 => Self::Protocol,
            1003 => Self::Unsupported,
            1005 => Self::NoStatus,
            1006 => Self::Abnormal,
            1008 => Self::Policy,
            1011 => Self::Error,
            1012 => Self::Restart,
            other => Self::Other(other),
        }
    }
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> Self {
        match code {
            CloseCode::Normal => 1000,
            CloseCode::GoingAway => 1001,
            CloseCode::Protocol => 1002,
            CloseCode::Unsupported => 1003,
            CloseCode::NoStatus => 1005,
            CloseCode::Abnormal => 1006,
            CloseCode::Policy => 1008,
            CloseCode::Error => 1011,
            CloseCode::Restart => 1012,
            CloseCode::Other(other) => other,
        }
    }
}

impl fmt::Display for CloseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", u16::from(*self), self.description())
    }
}

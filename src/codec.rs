//! Text-frame codec for the dashboard protocol.
//!
//! The codec owns the bot's `clientId` and stamps it on every outbound
//! frame, overwriting whatever the message itself carried.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{RelayError, Result};
use crate::protocol::Envelope;

const TYPE_FIELD: &str = "type";
const CLIENT_ID_FIELD: &str = "clientId";

/// Encoder/decoder bound to one bot identity.
#[derive(Debug, Clone)]
pub struct Codec {
    client_id: String,
}

impl Codec {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
        }
    }

    /// The identity stamped on outbound frames.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Serialize `message` into a UTF-8 text frame.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Encoding`] if the message does not serialize to
    /// a JSON object with a string `type` tag.
    pub fn encode<M: Serialize>(&self, message: &M) -> Result<String> {
        let value =
            serde_json::to_value(message).map_err(|e| RelayError::Encoding(e.to_string()))?;
        let Value::Object(mut fields) = value else {
            return Err(RelayError::Encoding(
                "message must serialize to a JSON object".into(),
            ));
        };
        if !fields.get(TYPE_FIELD).is_some_and(Value::is_string) {
            return Err(RelayError::Encoding("message has no `type` tag".into()));
        }
        fields.insert(
            CLIENT_ID_FIELD.to_string(),
            Value::String(self.client_id.clone()),
        );
        serde_json::to_string(&fields).map_err(|e| RelayError::Encoding(e.to_string()))
    }

    /// Like [`encode`](Self::encode), but fills in `kind` as the `type` tag
    /// when the payload does not name one itself.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Encoding`] if the payload is not a JSON object.
    pub fn encode_as<M: Serialize>(&self, kind: &str, payload: &M) -> Result<String> {
        let value =
            serde_json::to_value(payload).map_err(|e| RelayError::Encoding(e.to_string()))?;
        let Value::Object(mut fields) = value else {
            return Err(RelayError::Encoding(
                "payload must serialize to a JSON object".into(),
            ));
        };
        fields
            .entry(TYPE_FIELD)
            .or_insert_with(|| Value::String(kind.to_string()));
        self.encode(&fields)
    }

    /// Parse a text frame into an envelope.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::MalformedMessage`] if the frame is not valid JSON
    /// or does not match the shape of `M`.
    pub fn decode<M: DeserializeOwned>(&self, frame: &str) -> Result<Envelope<M>> {
        serde_json::from_str(frame).map_err(RelayError::MalformedMessage)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::protocol::{Command, InboundMessage, OutboundMessage};

    fn codec() -> Codec {
        Codec::new("bot-1")
    }

    #[test]
    fn encode_stamps_client_id() {
        let frame = codec()
            .encode(&OutboundMessage::ClientData {
                guilds: vec!["1".into(), "2".into()],
                users: 42,
            })
            .unwrap();
        let json: Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(json["type"], "clientData");
        assert_eq!(json["clientId"], "bot-1");
        assert_eq!(json["users"], 42);
    }

    #[test]
    fn encode_overwrites_caller_client_id() {
        let payload = serde_json::json!({ "type": "playerData", "clientId": "spoofed" });
        let frame = codec().encode(&payload).unwrap();
        let json: Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(json["clientId"], "bot-1");
    }

    #[test]
    fn encode_as_fills_missing_type_only() {
        let c = codec();
        let implicit = c.encode_as("clientData", &serde_json::json!({ "users": 1 })).unwrap();
        let json: Value = serde_json::from_str(&implicit).unwrap();
        assert_eq!(json["type"], "clientData");

        let explicit = c
            .encode_as("clientData", &serde_json::json!({ "type": "playerData" }))
            .unwrap();
        let json: Value = serde_json::from_str(&explicit).unwrap();
        assert_eq!(json["type"], "playerData");
    }

    #[test]
    fn encode_rejects_untagged_payloads() {
        let err = codec().encode(&serde_json::json!({ "users": 1 })).unwrap_err();
        assert!(matches!(err, RelayError::Encoding(_)));

        let err = codec().encode(&42).unwrap_err();
        assert!(matches!(err, RelayError::Encoding(_)));
    }

    #[test]
    fn decode_rejects_garbage() {
        let err = codec().decode::<InboundMessage>("not json").unwrap_err();
        assert!(matches!(err, RelayError::MalformedMessage(_)));

        let err = codec()
            .decode::<InboundMessage>(r#"{"type":"pause"}"#)
            .unwrap_err();
        assert!(matches!(err, RelayError::MalformedMessage(_)));
    }

    #[test]
    fn decode_tolerates_missing_client_id() {
        let envelope = codec()
            .decode::<InboundMessage>(r#"{"type":"shuffle","guildId":"7"}"#)
            .unwrap();
        assert_eq!(envelope.client_id, "");
        assert_eq!(envelope.message.guild_id, "7");
        assert_eq!(envelope.message.command, Command::Shuffle);
    }

    #[test]
    fn null_snapshot_round_trips() {
        let c = codec();
        let message = OutboundMessage::PlayerData {
            guild_id: "9".into(),
            player: None,
        };
        let frame = c.encode(&message).unwrap();
        assert!(frame.contains(r#""player":null"#));
        let decoded = c.decode::<OutboundMessage>(&frame).unwrap();
        assert_eq!(decoded.message, message);
        assert_eq!(decoded.client_id, "bot-1");
    }
}

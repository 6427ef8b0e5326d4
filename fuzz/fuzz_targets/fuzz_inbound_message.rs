#![no_main]

use kalliope_relay::protocol::InboundMessage;
use kalliope_relay::Codec;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Raw bytes straight into serde_json, including invalid UTF-8.
    let _ = serde_json::from_slice::<InboundMessage>(data);

    // The path the relay takes for every text frame.
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(envelope) = Codec::new("fuzz").decode::<InboundMessage>(s) {
            let _ = envelope.message.command.kind();
        }
    }
});

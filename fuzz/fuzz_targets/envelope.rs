#![no_main]

use libfuzzer_sys::fuzz_target;
use wab_bridge::Envelope;

fuzz_target!(|data: &[u8]| {
    if let Ok(envelope) = serde_json::from_slice::<Envelope>(data) {
        let _ = envelope.load_status();
        let encoded = serde_json::to_vec(&envelope).expect("decoded envelope encodes");
        let _ = serde_json::from_slice::<Envelope>(&encoded);
    }
});

#![no_main]

use libfuzzer_sys::fuzz_target;
use wab_bridge::ModuleSource;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(source) = ModuleSource::parse(text) {
        let code = source.to_code().expect("parsed source serialises");
        assert_eq!(ModuleSource::parse(&code).ok(), Some(source));
    }
});

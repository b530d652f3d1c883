//! Fuzz target: persisted config blob
//!
//! Arbitrary bytes in the NVS slot must either load as a config that
//! passes validation or be rejected, never panic.
//!
//! cargo fuzz run fuzz_config_blob

#![no_main]

use libfuzzer_sys::fuzz_target;
use signcam::adapters::nvs::NvsAdapter;
use signcam::app::ports::ConfigPort;

fuzz_target!(|data: &[u8]| {
    let Ok(nvs) = NvsAdapter::new() else {
        return;
    };
    nvs.put_raw(data);
    if let Ok(cfg) = nvs.load() {
        assert!(cfg.validate().is_ok(), "loaded config must be valid");
        assert!(cfg.samples() >= 1);
    }
});

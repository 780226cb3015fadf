//! Fuzz target: `Settings::from_json`
//!
//! Any document the parser accepts must also pass validation, and the
//! calibration curve built from it must be usable.
//!
//! cargo fuzz run fuzz_settings

#![no_main]

use apic::config::Settings;
use apic::host::CalibrationCurve;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };
    if let Ok(settings) = Settings::from_json(text) {
        assert!(settings.validate().is_ok());
        assert!(CalibrationCurve::new(settings.calib_gradient, settings.calib_offset).is_ok());
        assert!(settings.timeout().as_secs_f64() > 0.0);
    }
});

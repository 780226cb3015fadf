//! Acquisition modes run by the device dispatcher.
//!
//! | Mode      | Trigger          | Channel | Record                      |
//! |-----------|------------------|---------|-----------------------------|
//! | polled    | host count       | command | one 4-sample group per send |
//! | burst     | burst edge line  | command | 64 groups per send          |
//! | streaming | sample clock     | stream  | 190 timed samples per send  |
//! | rate      | rate edge line   | command | one u32 in Hz               |
//!
//! Every mode owns its scratch buffers for the duration of the call and
//! returns to the dispatcher only when its target is met.

pub mod burst;
pub mod polled;
pub mod rate;
pub mod stream;

pub use burst::DeferredSender;

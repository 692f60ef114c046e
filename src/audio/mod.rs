//! Device side of the microphone. Level analysis and capture decisions live
//! in `kernel::audio`.

#[cfg(feature = "devices")]
pub mod capture;
pub mod processing;

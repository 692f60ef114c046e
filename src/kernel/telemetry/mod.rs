//! Turn-taking telemetry.
//!
//! # SAFETY INVARIANT
//! Telemetry is a write-only side channel. Decision logic in the kernel
//! never reads it.
//!
//! # PRIVACY INVARIANT
//! Events carry states, durations and counts only. No transcript text, no
//! audio, no report contents.

pub mod event;
pub mod metrics;
pub mod recorder;

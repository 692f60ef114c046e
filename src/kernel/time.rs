/// Milliseconds since the session clock origin.
///
/// The kernel never reads a clock itself. The driver measures elapsed time
/// from a fixed origin and hands it to every step, which keeps the kernel
/// deterministic under test.
pub type Millis = u64;

/// Cadence of the driver loop (roughly one display frame).
pub const TICK_MS: Millis = 16;

/// Elapsed time between two instants, saturating at zero.
pub fn elapsed(since: Millis, now: Millis) -> Millis {
    now.saturating_sub(since)
}

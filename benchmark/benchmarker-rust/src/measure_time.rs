use std::time::Instant;

/// Milliseconds spent in `f`, saturating at `u64::MAX`.
pub fn measure_time<F: FnOnce()>(f: F) -> u64 {
    let t = Instant::now();
    f();
    t.elapsed().as_millis().try_into().unwrap_or(u64::MAX)
}

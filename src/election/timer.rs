use rand::Rng;
use std::time::Duration;

/// Picks a random interval within `[min_ms, max_ms]` so that nodes do not
/// probe or re-elect in lockstep.
pub fn random_interval(min_ms: u64, max_ms: u64) -> Duration {
    let (lo, hi) = if min_ms <= max_ms {
        (min_ms, max_ms)
    } else {
        (max_ms, min_ms)
    };
    let mut rng = rand::thread_rng();
    Duration::from_millis(rng.gen_range(lo..=hi))
}

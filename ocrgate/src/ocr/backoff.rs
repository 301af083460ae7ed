use rand::Rng;

/// Upper bound for any single retry delay.
pub const MAX_DELAY_MS: u64 = 30_000;

/// Exponential backoff with additive jitter.
///
/// Returns `base * 2^(attempt-1)` plus a uniform jitter in `[0, base)`, capped
/// at [`MAX_DELAY_MS`]. Attempts are numbered from 1; `base_ms` of 0 is treated
/// as 1.
pub fn compute_delay<R: Rng + ?Sized>(attempt: u32, base_ms: u64, rng: &mut R) -> u64 {
    let base = base_ms.max(1);
    let exponent = attempt.max(1) - 1;
    let exponential = 2_u64
        .checked_pow(exponent)
        .and_then(|factor| base.checked_mul(factor))
        .unwrap_or(u64::MAX);
    let jitter = rng.gen_range(0..base);
    exponential.saturating_add(jitter).min(MAX_DELAY_MS)
}

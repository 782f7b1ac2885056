//! Exponential backoff with jitter.

use std::time::Duration;

use rand::Rng;

use crate::config::RetryConfig;

/// Delay schedule between fetch attempts.
///
/// The n-th retry (counting from 0) waits `base(n) · (1 + u · jitter_ratio)`
/// where `base(n) = min(min_delay · 2ⁿ, max_delay)` and `u` is uniform in
/// `[0, 1)`. With `jitter_ratio < 1` every uncapped delay is strictly longer
/// than the one before it.
#[derive(Debug, Clone)]
pub struct Backoff {
    min_delay: Duration,
    max_delay: Duration,
    jitter_ratio: f64,
}

impl Backoff {
    pub fn new(min_delay: Duration, max_delay: Duration, jitter_ratio: f64) -> Self {
        Self {
            min_delay,
            max_delay: max_delay.max(min_delay),
            jitter_ratio: jitter_ratio.clamp(0.0, 0.999),
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.min_delay, config.max_delay, config.jitter_ratio)
    }

    /// Delay before the given retry, without jitter.
    pub fn base(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry);
        self.min_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Delay before the given retry, with jitter from the thread-local RNG.
    pub fn delay(&self, retry: u32) -> Duration {
        self.delay_with(retry, &mut rand::thread_rng())
    }

    pub fn delay_with<R: Rng + ?Sized>(&self, retry: u32, rng: &mut R) -> Duration {
        let base = self.base(retry);
        if self.jitter_ratio == 0.0 {
            return base;
        }
        base.mul_f64(1.0 + rng.r#gen::<f64>() * self.jitter_ratio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn backoff() -> Backoff {
        Backoff::new(Duration::from_secs(2), Duration::from_secs(60), 0.5)
    }

    #[test]
    fn base_doubles_until_cap() {
        let b = backoff();
        assert_eq!(b.base(0), Duration::from_secs(2));
        assert_eq!(b.base(1), Duration::from_secs(4));
        assert_eq!(b.base(2), Duration::from_secs(8));
        assert_eq!(b.base(4), Duration::from_secs(32));
        assert_eq!(b.base(5), Duration::from_secs(60));
        assert_eq!(b.base(40), Duration::from_secs(60));
    }

    #[test]
    fn jitter_stays_within_ratio() {
        let b = backoff();
        let mut rng = StdRng::seed_from_u64(7);
        for retry in 0..6 {
            let base = b.base(retry);
            for _ in 0..50 {
                let d = b.delay_with(retry, &mut rng);
                assert!(d >= base);
                assert!(d < base.mul_f64(1.5));
            }
        }
    }

    #[test]
    fn uncapped_delays_strictly_increase() {
        let b = backoff();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..100 {
            let delays: Vec<_> = (0..4).map(|r| b.delay_with(r, &mut rng)).collect();
            assert!(delays.windows(2).all(|w| w[0] < w[1]), "{delays:?}");
        }
    }

    #[test]
    fn zero_jitter_is_deterministic() {
        let b = Backoff::new(Duration::from_millis(100), Duration::from_secs(1), 0.0);
        assert_eq!(b.delay(0), Duration::from_millis(100));
        assert_eq!(b.delay(3), Duration::from_millis(800));
        assert_eq!(b.delay(4), Duration::from_secs(1));
    }
}

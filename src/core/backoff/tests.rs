//! Tests for backoff calculation

#[cfg(test)]
mod tests {
    use super::super::calculator::fibonacci;
    use super::super::*;
    use crate::config::models::{BackoffConfig, BackoffStrategy};
    use std::sync::Arc;
    use std::time::Duration;

    fn calculator(strategy: BackoffStrategy, initial: u64, max_retries: u32) -> BackoffCalculator {
        let config = BackoffConfig::new(strategy, initial, max_retries)
            .with_jitter(0.0)
            .with_max_delay_ms(u64::MAX);
        BackoffCalculator::new(config).unwrap()
    }

    fn delays(calc: &BackoffCalculator, attempts: u32) -> Vec<Option<u64>> {
        (1..=attempts)
            .map(|a| calc.calculate_delay(a).map(|d| d.as_millis() as u64))
            .collect()
    }

    #[test]
    fn test_exponential_sequence() {
        let calc = calculator(BackoffStrategy::Exponential, 1000, 3);
        assert_eq!(delays(&calc, 4), vec![Some(1000), Some(2000), Some(4000), None]);
    }

    #[test]
    fn test_linear_sequence() {
        let calc = calculator(BackoffStrategy::Linear, 250, 4);
        assert_eq!(
            delays(&calc, 5),
            vec![Some(250), Some(500), Some(750), Some(1000), None]
        );
    }

    #[test]
    fn test_fibonacci_sequence() {
        let calc = calculator(BackoffStrategy::Fibonacci, 100, 6);
        assert_eq!(
            delays(&calc, 6),
            vec![Some(100), Some(100), Some(200), Some(300), Some(500), Some(800)]
        );
        assert_eq!(fibonacci(0), 0);
        assert_eq!(fibonacci(200), u64::MAX);
    }

    #[test]
    fn test_custom_strategy() {
        let config = BackoffConfig::new(BackoffStrategy::Custom, 10, 3).with_jitter(0.0);
        let custom: CustomDelayFn =
            Arc::new(|attempt: u32, initial: u64| initial * 3 * u64::from(attempt));
        let calc = BackoffCalculator::with_custom(config, custom).unwrap();
        assert_eq!(calc.calculate_delay(2), Some(Duration::from_millis(60)));
    }

    #[test]
    fn test_custom_strategy_requires_function() {
        let config = BackoffConfig::new(BackoffStrategy::Custom, 10, 3);
        assert!(BackoffCalculator::new(config).is_err());
    }

    #[test]
    fn test_attempt_zero_is_immediate() {
        let calc = calculator(BackoffStrategy::Exponential, 1000, 3);
        assert_eq!(calc.calculate_delay(0), Some(Duration::ZERO));
    }

    #[test]
    fn test_delay_capped_at_max() {
        let config = BackoffConfig::new(BackoffStrategy::Exponential, 1000, 10)
            .with_jitter(0.0)
            .with_max_delay_ms(5000);
        let calc = BackoffCalculator::new(config).unwrap();
        assert_eq!(calc.calculate_delay(10), Some(Duration::from_millis(5000)));
    }

    #[test]
    fn test_large_attempts_saturate() {
        let calc = calculator(BackoffStrategy::Exponential, 1000, u32::MAX);
        assert_eq!(calc.calculate_delay(100), Some(Duration::from_millis(u64::MAX)));
    }

    #[test]
    fn test_monotonic_without_jitter() {
        for strategy in [
            BackoffStrategy::Linear,
            BackoffStrategy::Exponential,
            BackoffStrategy::Fibonacci,
        ] {
            let config = BackoffConfig::new(strategy, 100, 20)
                .with_jitter(0.0)
                .with_max_delay_ms(60_000);
            let calc = BackoffCalculator::new(config).unwrap();
            let mut previous = Duration::ZERO;
            for attempt in 1..=20 {
                let delay = calc.calculate_delay(attempt).unwrap();
                assert!(delay >= previous, "{} not monotonic at {}", strategy, attempt);
                previous = delay;
            }
            assert_eq!(calc.calculate_delay(21), None);
        }
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let config = BackoffConfig::new(BackoffStrategy::Linear, 1000, 5)
            .with_jitter(0.5)
            .with_max_delay_ms(1200);
        let calc = BackoffCalculator::new(config).unwrap();
        for _ in 0..200 {
            let delay = calc.calculate_delay(1).unwrap().as_millis();
            assert!((500..=1200).contains(&delay), "delay {} out of range", delay);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_waits_for_delay() {
        let calc = calculator(BackoffStrategy::Linear, 200, 2);
        let start = tokio::time::Instant::now();
        assert_eq!(calc.sleep(2).await, Some(Duration::from_millis(400)));
        assert!(start.elapsed() >= Duration::from_millis(400));
        assert_eq!(calc.sleep(3).await, None);
    }
}

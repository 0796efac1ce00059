use std::{fmt::Display, time::Duration};

use size::Size;

/// An amount of data moved over some period of time.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct TransferRate(pub Size, pub Duration);

impl Display for TransferRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/s", Size::from_bytes(self.bps()))
    }
}

impl TransferRate {
    fn bps(&self) -> f64 {
        let seconds = self.1.as_secs_f64();
        if seconds == 0.0 {
            return 0.0;
        }
        (self.0.bytes() as f64) / seconds
    }

    /// How long to wait after this transfer so that the average rate does not exceed `limit`
    /// bytes per second. Zero when the transfer was already slow enough.
    pub fn throttle(&self, limit: Size) -> Duration {
        let limit = limit.bytes();
        if limit <= 0 {
            return Duration::ZERO;
        }
        let minimum = Duration::from_secs_f64((self.0.bytes().max(0) as f64) / (limit as f64));
        minimum.saturating_sub(self.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn throttle_slows_down_fast_transfers() {
        let rate = TransferRate(Size::from_kibibytes(100), Duration::from_millis(500));

        assert_eq!(
            rate.throttle(Size::from_kibibytes(50)),
            Duration::from_millis(1500)
        );
    }

    #[test]
    fn no_throttle_for_slow_transfers() {
        let rate = TransferRate(Size::from_kibibytes(10), Duration::from_secs(2));

        assert_eq!(rate.throttle(Size::from_kibibytes(50)), Duration::ZERO);
    }

    #[test]
    fn display() {
        let rate = TransferRate(Size::from_kibibytes(20), Duration::from_secs(2));

        assert_eq!(rate.to_string(), format!("{}/s", Size::from_kibibytes(10)));
    }
}

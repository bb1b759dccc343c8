//! Timestamp wrapper shared by every stream in the pipeline.

use serde::{Deserialize, Serialize};

/// A value stamped with the time it describes.
///
/// Timestamps are microseconds since epoch. For sweep-derived data this is
/// the sweep stamp assigned by scan registration, not the arrival time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timestamped<T> {
    /// The wrapped data
    pub data: T,
    /// Timestamp in microseconds since epoch
    pub timestamp_us: u64,
}

impl<T> Timestamped<T> {
    /// Create a new timestamped value.
    #[inline]
    pub fn new(data: T, timestamp_us: u64) -> Self {
        Self { data, timestamp_us }
    }

    /// Map the inner data while keeping the stamp.
    #[inline]
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Timestamped<U> {
        Timestamped {
            data: f(self.data),
            timestamp_us: self.timestamp_us,
        }
    }

    /// Absolute stamp difference to another value, in microseconds.
    #[inline]
    pub fn skew_us<U>(&self, other: &Timestamped<U>) -> u64 {
        self.timestamp_us.abs_diff(other.timestamp_us)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamped_map_keeps_stamp() {
        let ts = Timestamped::new(21i32, 1_000);
        let doubled = ts.map(|x| x * 2);

        assert_eq!(doubled.data, 42);
        assert_eq!(doubled.timestamp_us, 1_000);
    }

    #[test]
    fn test_skew_is_symmetric() {
        let a = Timestamped::new((), 10_000);
        let b = Timestamped::new((), 14_999);
        assert_eq!(a.skew_us(&b), 4_999);
        assert_eq!(b.skew_us(&a), 4_999);
    }
}

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use std::{fmt, ops::Sub};

/// Nanoseconds since the Unix epoch.
///
/// Conntrack start/stop times (and capture frame times) are carried as
/// 64-bit nanosecond counters; `Display` renders them as UTC wall-clock
/// time, or as raw seconds with `{:#}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Timestamp(pub u64);

impl Timestamp {
    pub const ZERO: Self = Timestamp(0);

    #[inline]
    pub fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(date_time) = DateTime::from_timestamp(
            (self.0 / 1_000_000_000) as i64,
            (self.0 % 1_000_000_000) as u32,
        ) {
            if !f.alternate() {
                return write!(f, "{}", date_time.format("%Y-%m-%d %H:%M:%S%.6f UTC"));
            }
        }

        write!(
            f,
            "{}.{:09}",
            self.0 / 1_000_000_000,
            self.0 % 1_000_000_000
        )
    }
}

/// Signed nanosecond difference between two [`Timestamp`]s.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Interval(pub i64);

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total_nanos = self.0.abs();
        let secs = total_nanos / 1_000_000_000;
        let nanos = total_nanos % 1_000_000_000;
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:09}", sign, secs, nanos)
    }
}

impl Sub for Timestamp {
    type Output = Interval;

    #[inline]
    fn sub(self, rhs: Self) -> Self::Output {
        if self.0 >= rhs.0 {
            Interval((self.0 - rhs.0) as i64)
        } else {
            Interval(-((rhs.0 - self.0) as i64))
        }
    }
}

//! DateTime display utilities.

use std::fmt;

use jiff::{tz::TimeZone, Timestamp};

/// A `Timestamp` rendered as `YYYY-MM-DD HH:MM:SS TZ`.
///
/// Without an explicit zone the system zone is used.
pub struct LocalDateTime<'a> {
    timestamp: &'a Timestamp,
    zone: Option<&'a TimeZone>,
}

impl<'a> LocalDateTime<'a> {
    pub fn new(timestamp: &'a Timestamp) -> Self {
        Self {
            timestamp,
            zone: None,
        }
    }

    pub fn in_zone(timestamp: &'a Timestamp, zone: &'a TimeZone) -> Self {
        Self {
            timestamp,
            zone: Some(zone),
        }
    }
}

impl fmt::Display for LocalDateTime<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let zone = self.zone.cloned().unwrap_or_else(TimeZone::system);
        write!(
            f,
            "{}",
            self.timestamp.to_zoned(zone).strftime("%Y-%m-%d %H:%M:%S %Z")
        )
    }
}

/// Hours rendered as `1h 30m`, or minutes only below one hour.
pub struct Hours(pub f64);

impl fmt::Display for Hours {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let minutes = (self.0.max(0.0) * 60.0).round() as u64;
        match (minutes / 60, minutes % 60) {
            (0, m) => write!(f, "{m}m"),
            (h, 0) => write!(f, "{h}h"),
            (h, m) => write!(f, "{h}h {m}m"),
        }
    }
}

//! Output throttling by poll interval.
//!
//! Tempo Disks advertise every few seconds while their readings change
//! slowly. With a poll interval configured, the output host reports each
//! property of each device at most once per interval. The devices' cached
//! values are always updated; only the output is throttled.

use crate::peripheral_id::PeripheralId;
use crate::property::PropertyName;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Limits reports per device and property to one per `interval`.
///
/// The first report for a key is always allowed. A suppressed report does
/// not restart the interval.
#[derive(Debug)]
pub struct Throttle {
    interval: Duration,
    last_emitted: HashMap<(PeripheralId, PropertyName), Instant>,
}

impl Throttle {
    /// # Example
    /// ```
    /// use std::time::Duration;
    /// use tempodisk_listener::throttle::Throttle;
    ///
    /// let throttle = Throttle::new(Duration::from_secs(60));
    /// ```
    pub fn new(interval: Duration) -> Self {
        Throttle {
            interval,
            last_emitted: HashMap::new(),
        }
    }

    /// Whether a report for `property` of `id` may be emitted now.
    pub fn should_emit(&mut self, id: PeripheralId, property: PropertyName) -> bool {
        self.should_emit_at(id, property, Instant::now())
    }

    fn should_emit_at(&mut self, id: PeripheralId, property: PropertyName, now: Instant) -> bool {
        match self.last_emitted.get(&(id, property)) {
            Some(last) if now.duration_since(*last) < self.interval => false,
            _ => {
                self.last_emitted.insert((id, property), now);
                true
            }
        }
    }
}

/// Parse a duration from a human-readable string.
///
/// Supports the suffixes `ms`, `s`, `m` and `h`; a bare number is seconds.
///
/// # Examples
/// ```
/// use tempodisk_listener::throttle::parse_duration;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration("3s").unwrap(), Duration::from_secs(3));
/// assert_eq!(parse_duration("1m").unwrap(), Duration::from_secs(60));
/// assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
/// ```
pub fn parse_duration(src: &str) -> Result<Duration, String> {
    let src = src.trim();
    if src.is_empty() {
        return Err("empty duration string".to_string());
    }

    // "ms" must be tried before "m" and "s"
    let (number, unit, to_duration): (&str, &str, fn(u64) -> Duration) =
        if let Some(num) = src.strip_suffix("ms") {
            (num, "milliseconds", Duration::from_millis)
        } else if let Some(num) = src.strip_suffix('h') {
            (num, "hours", |n| Duration::from_secs(n * 3600))
        } else if let Some(num) = src.strip_suffix('m') {
            (num, "minutes", |n| Duration::from_secs(n * 60))
        } else if let Some(num) = src.strip_suffix('s') {
            (num, "seconds", Duration::from_secs)
        } else {
            (src, "duration", Duration::from_secs)
        };

    let value: u64 = number
        .trim()
        .parse()
        .map_err(|_| format!("invalid {unit}: {number}"))?;
    Ok(to_duration(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TEST_ID;

    const OTHER_ID: PeripheralId = PeripheralId([0x11, 0x22, 0x33, 0x44, 0x55, 0x66]);

    #[test]
    fn test_first_report_allowed() {
        let mut throttle = Throttle::new(Duration::from_secs(1));
        assert!(throttle.should_emit(TEST_ID, PropertyName::Temperature));
    }

    #[test]
    fn test_immediate_repeat_blocked() {
        let mut throttle = Throttle::new(Duration::from_secs(1));
        assert!(throttle.should_emit(TEST_ID, PropertyName::Temperature));
        assert!(!throttle.should_emit(TEST_ID, PropertyName::Temperature));
    }

    #[test]
    fn test_properties_are_independent() {
        let mut throttle = Throttle::new(Duration::from_secs(1));
        for name in PropertyName::ALL {
            assert!(throttle.should_emit(TEST_ID, name));
        }
        for name in PropertyName::ALL {
            assert!(!throttle.should_emit(TEST_ID, name));
        }
    }

    #[test]
    fn test_devices_are_independent() {
        let mut throttle = Throttle::new(Duration::from_secs(1));
        assert!(throttle.should_emit(TEST_ID, PropertyName::Battery));
        assert!(throttle.should_emit(OTHER_ID, PropertyName::Battery));
        assert!(!throttle.should_emit(TEST_ID, PropertyName::Battery));
        assert!(!throttle.should_emit(OTHER_ID, PropertyName::Battery));
    }

    #[test]
    fn test_zero_interval_never_blocks() {
        let mut throttle = Throttle::new(Duration::ZERO);
        assert!(throttle.should_emit(TEST_ID, PropertyName::Humidity));
        assert!(throttle.should_emit(TEST_ID, PropertyName::Humidity));
    }

    #[test]
    fn test_allowed_again_after_interval() {
        let mut throttle = Throttle::new(Duration::from_secs(30));
        let start = Instant::now();
        let key = (TEST_ID, PropertyName::DewPoint);

        assert!(throttle.should_emit_at(key.0, key.1, start));
        assert!(!throttle.should_emit_at(key.0, key.1, start + Duration::from_secs(29)));
        assert!(throttle.should_emit_at(key.0, key.1, start + Duration::from_secs(30)));
    }

    #[test]
    fn test_blocked_report_does_not_restart_interval() {
        let mut throttle = Throttle::new(Duration::from_secs(30));
        let start = Instant::now();

        assert!(throttle.should_emit_at(TEST_ID, PropertyName::Temperature, start));
        assert!(!throttle.should_emit_at(
            TEST_ID,
            PropertyName::Temperature,
            start + Duration::from_secs(10)
        ));
        assert!(!throttle.should_emit_at(
            TEST_ID,
            PropertyName::Temperature,
            start + Duration::from_secs(20)
        ));
        assert!(throttle.should_emit_at(
            TEST_ID,
            PropertyName::Temperature,
            start + Duration::from_secs(35)
        ));
    }

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("3s").unwrap(), Duration::from_secs(3));
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("10").unwrap(), Duration::from_secs(10));
    }

    #[test]
    fn test_parse_duration_with_whitespace() {
        assert_eq!(parse_duration(" 3s ").unwrap(), Duration::from_secs(3));
        assert_eq!(parse_duration("3 s").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn test_parse_duration_invalid() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("abc").is_err());
        assert!(parse_duration("-1s").is_err());
        assert_eq!(parse_duration("xm").unwrap_err(), "invalid minutes: x");
    }
}

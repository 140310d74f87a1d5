//! Time zones accepted by cron triggers.

use chrono::{DateTime, FixedOffset, Utc};
use chrono_tz::Tz;
use cron::Schedule;

use dqjobs_protocols::SchedulerError;

const MAX_OFFSET_HOURS: i32 = 14;

/// Zone a cron expression is evaluated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerZone {
    Fixed(FixedOffset),
    /// IANA zone; occurrences follow its daylight saving rules.
    Named(Tz),
}

impl TriggerZone {
    /// First occurrence of `schedule` after `after`, in UTC.
    pub fn next_after(&self, schedule: &Schedule, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::Fixed(offset) => schedule
                .after(&after.with_timezone(offset))
                .next()
                .map(|next| next.with_timezone(&Utc)),
            Self::Named(tz) => schedule
                .after(&after.with_timezone(tz))
                .next()
                .map(|next| next.with_timezone(&Utc)),
        }
    }
}

/// Parse a time zone id.
///
/// Accepts an empty string, `UTC`, `GMT` and `Z` (all UTC), fixed offsets
/// with an optional `UTC`/`GMT` prefix (`GMT+8`, `GMT+08:00`, `UTC-5:30`,
/// `+0800`) and IANA zone ids such as `Asia/Shanghai`.
pub fn parse_time_zone(id: &str) -> Result<TriggerZone, SchedulerError> {
    let trimmed = id.trim();
    if let Some(offset) = parse_offset(trimmed) {
        return Ok(TriggerZone::Fixed(offset));
    }
    trimmed
        .parse::<Tz>()
        .map(TriggerZone::Named)
        .map_err(|_| SchedulerError::InvalidTimeZone(id.to_string()))
}

fn parse_offset(trimmed: &str) -> Option<FixedOffset> {
    let rest = ["UTC", "GMT"]
        .iter()
        .find_map(|prefix| strip_prefix_ignore_case(trimmed, prefix))
        .unwrap_or(trimmed);

    if rest.is_empty() || (rest.eq_ignore_ascii_case("Z") && rest.len() == trimmed.len()) {
        return FixedOffset::east_opt(0);
    }

    let (sign, digits) = match rest.as_bytes()[0] {
        b'+' => (1, &rest[1..]),
        b'-' => (-1, &rest[1..]),
        _ => return None,
    };

    let (hours, minutes) = split_offset(digits)?;
    if hours > MAX_OFFSET_HOURS || minutes >= 60 {
        return None;
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

fn strip_prefix_ignore_case<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    let head = value.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &value[prefix.len()..])
}

/// `H`, `HH`, `H:MM`, `HH:MM` or `HHMM`.
fn split_offset(digits: &str) -> Option<(i32, i32)> {
    if digits.is_empty() {
        return None;
    }
    let (hours, minutes) = match digits.split_once(':') {
        Some((h, m)) if m.len() == 2 => (h, m),
        Some(_) => return None,
        None if digits.len() == 4 => digits.split_at(2),
        None if digits.len() <= 2 => (digits, "0"),
        None => return None,
    };
    if hours.is_empty() || hours.len() > 2 || !all_digits(hours) || !all_digits(minutes) {
        return None;
    }
    Some((hours.parse().ok()?, minutes.parse().ok()?))
}

fn all_digits(value: &str) -> bool {
    value.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offset_secs(id: &str) -> i32 {
        match parse_time_zone(id).unwrap() {
            TriggerZone::Fixed(offset) => offset.local_minus_utc(),
            TriggerZone::Named(tz) => panic!("expected a fixed offset for {id:?}, got {tz:?}"),
        }
    }

    #[test]
    fn test_utc_aliases() {
        for id in ["", "UTC", "GMT", "Z", "utc", " GMT "] {
            assert_eq!(offset_secs(id), 0, "{id:?}");
        }
    }

    #[test]
    fn test_prefixed_offsets() {
        assert_eq!(offset_secs("GMT+8"), 8 * 3600);
        assert_eq!(offset_secs("GMT+08:00"), 8 * 3600);
        assert_eq!(offset_secs("GMT+8:00"), 8 * 3600);
        assert_eq!(offset_secs("UTC-5:30"), -(5 * 3600 + 30 * 60));
    }

    #[test]
    fn test_bare_offsets() {
        assert_eq!(offset_secs("+0800"), 8 * 3600);
        assert_eq!(offset_secs("-03"), -3 * 3600);
        assert_eq!(offset_secs("+05:45"), 5 * 3600 + 45 * 60);
    }

    #[test]
    fn test_named_zones() {
        assert_eq!(
            parse_time_zone("Asia/Shanghai").unwrap(),
            TriggerZone::Named(Tz::Asia__Shanghai)
        );
        assert_eq!(
            parse_time_zone(" America/New_York ").unwrap(),
            TriggerZone::Named(Tz::America__New_York)
        );
    }

    #[test]
    fn test_rejects_unknown_zones() {
        for id in ["Mars/Olympus", "PST", "GMTZ"] {
            assert!(
                matches!(parse_time_zone(id), Err(SchedulerError::InvalidTimeZone(_))),
                "{id:?}"
            );
        }
    }

    #[test]
    fn test_rejects_malformed_offsets() {
        for id in ["GMT+", "+8:0", "+123", "GMT+15", "+08:60", "GMT+a"] {
            assert!(parse_time_zone(id).is_err(), "{id:?}");
        }
    }
}

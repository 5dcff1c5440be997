//! Remaining-time and expiry helpers.
//!
//! These depend on the wall clock and are meant to be re-evaluated on every
//! render. The `_at` variants take `now` explicitly.

use chrono::{DateTime, Duration, Utc};

/// Label shown once a deadline has passed
pub const EXPIRED_LABEL: &str = "Isteklo";

/// Time left until `expires_at` as `"{h}h {m}m"`, or [`EXPIRED_LABEL`]
pub fn remaining_time(expires_at: DateTime<Utc>) -> String {
    remaining_time_at(expires_at, Utc::now())
}

/// [`remaining_time`] evaluated at `now`
pub fn remaining_time_at(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = expires_at.signed_duration_since(now);
    if diff <= Duration::zero() {
        return EXPIRED_LABEL.to_string();
    }

    let hours = diff.num_hours();
    let minutes = diff.num_minutes() % 60;
    format!("{}h {}m", hours, minutes)
}

/// Whether the current time is strictly past `closes_at`
pub fn has_expired(closes_at: DateTime<Utc>) -> bool {
    has_expired_at(closes_at, Utc::now())
}

/// [`has_expired`] evaluated at `now`
pub fn has_expired_at(closes_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now > closes_at
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn test_remaining_time_format() {
        let now = at(1_700_000_000);
        let deadline = now + Duration::hours(26) + Duration::minutes(5) + Duration::seconds(59);
        assert_eq!(remaining_time_at(deadline, now), "26h 5m");
    }

    #[test]
    fn test_remaining_time_under_a_minute() {
        let now = at(1_700_000_000);
        assert_eq!(remaining_time_at(now + Duration::seconds(30), now), "0h 0m");
    }

    #[test]
    fn test_remaining_time_expired() {
        let now = at(1_700_000_000);
        assert_eq!(remaining_time_at(now, now), EXPIRED_LABEL);
        assert_eq!(remaining_time_at(now - Duration::hours(1), now), "Isteklo");
    }

    #[test]
    fn test_expiry_boundary_is_strict() {
        let closes_at = at(1_700_000_000);
        assert!(!has_expired_at(closes_at, closes_at));
        assert!(has_expired_at(closes_at, closes_at + Duration::milliseconds(1)));
        assert!(has_expired_at(closes_at, closes_at + Duration::seconds(1)));
    }

    #[test]
    fn test_wall_clock_variants() {
        assert!(has_expired(at(0)));
        assert_eq!(remaining_time(at(0)), EXPIRED_LABEL);
    }
}

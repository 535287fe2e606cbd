use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of an event.
///
/// Statuses only ever move forward:
/// `CREATED -> PAID -> ACTIVE -> GRACE_PERIOD -> DOWNLOAD_PERIOD -> ARCHIVED`.
/// The lifecycle jobs drive the last two transitions; everything before
/// `DOWNLOAD_PERIOD` is owned by the organizer-facing API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    Created,
    Paid,
    Active,
    GracePeriod,
    DownloadPeriod,
    Archived,
}

impl EventStatus {
    /// Convert to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Paid => "PAID",
            Self::Active => "ACTIVE",
            Self::GracePeriod => "GRACE_PERIOD",
            Self::DownloadPeriod => "DOWNLOAD_PERIOD",
            Self::Archived => "ARCHIVED",
        }
    }

    /// Position in the forward-only status order.
    fn rank(&self) -> u8 {
        match self {
            Self::Created => 0,
            Self::Paid => 1,
            Self::Active => 2,
            Self::GracePeriod => 3,
            Self::DownloadPeriod => 4,
            Self::Archived => 5,
        }
    }

    /// Whether moving from `self` to `next` is a forward move.
    ///
    /// Staying in place is not an advance. Nothing may skip `DOWNLOAD_PERIOD`
    /// on its way to `ARCHIVED`.
    pub fn can_advance_to(&self, next: EventStatus) -> bool {
        if next.rank() <= self.rank() {
            return false;
        }
        !(next == Self::Archived && *self != Self::DownloadPeriod)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Archived)
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EventStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATED" => Ok(Self::Created),
            "PAID" => Ok(Self::Paid),
            "ACTIVE" => Ok(Self::Active),
            "GRACE_PERIOD" => Ok(Self::GracePeriod),
            "DOWNLOAD_PERIOD" => Ok(Self::DownloadPeriod),
            "ARCHIVED" => Ok(Self::Archived),
            _ => Err(format!("Invalid event status: {}", s)),
        }
    }
}

/// An event as seen by the lifecycle jobs.
///
/// Only `status` and `updated_at` are ever written here; the other fields are
/// owned by the organizer-facing API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub name: String,
    pub start_date_time: DateTime<Utc>,
    pub end_date_time: DateTime<Utc>,
    pub grace_period_days: u32,
    pub retention_period_days: u32,
    pub status: EventStatus,
    pub organizer_id: String,
    /// Face-index collection holding this event's indexed faces.
    #[serde(default)]
    pub face_collection_id: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// `end_date_time + grace_period_days`, in 24h days. `None` when the
    /// deadline is past the representable date range.
    pub fn grace_period_end(&self) -> Option<DateTime<Utc>> {
        add_days(self.end_date_time, self.grace_period_days)
    }

    /// `end_date_time + grace_period_days + retention_period_days`, in 24h
    /// days. `None` when the deadline is past the representable date range.
    pub fn retention_end(&self) -> Option<DateTime<Utc>> {
        add_days(self.grace_period_end()?, self.retention_period_days)
    }

    /// The grace period has elapsed strictly before `now`. A deadline that
    /// cannot be represented is never reached.
    pub fn is_grace_period_over(&self, now: DateTime<Utc>) -> bool {
        self.grace_period_end().is_some_and(|end| now > end)
    }

    /// The retention period has elapsed strictly before `now`. A deadline
    /// that cannot be represented is never reached.
    pub fn is_retention_over(&self, now: DateTime<Utc>) -> bool {
        self.retention_end().is_some_and(|end| now > end)
    }
}

fn add_days(from: DateTime<Utc>, days: u32) -> Option<DateTime<Utc>> {
    from.checked_add_signed(Duration::try_days(i64::from(days))?)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rstest::rstest;

    use super::*;

    fn event(grace: u32, retention: u32) -> Event {
        let end = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Event {
            id: "evt-1".into(),
            name: "Summer Gala".into(),
            start_date_time: end - Duration::hours(6),
            end_date_time: end,
            grace_period_days: grace,
            retention_period_days: retention,
            status: EventStatus::Active,
            organizer_id: "org-1".into(),
            face_collection_id: Some("evt-1".into()),
            updated_at: end,
        }
    }

    #[test]
    fn test_deadlines() {
        let e = event(3, 7);
        assert_eq!(
            e.grace_period_end(),
            Some(Utc.with_ymd_and_hms(2024, 1, 4, 0, 0, 0).unwrap())
        );
        assert_eq!(
            e.retention_end(),
            Some(Utc.with_ymd_and_hms(2024, 1, 11, 0, 0, 0).unwrap())
        );
    }

    #[rstest]
    #[case("2024-01-03T23:00:00Z", false)]
    #[case("2024-01-04T00:00:00Z", false)]
    #[case("2024-01-04T00:00:01Z", true)]
    #[case("2024-02-01T00:00:00Z", true)]
    fn test_grace_period_over(#[case] now: &str, #[case] expected: bool) {
        let now: DateTime<Utc> = now.parse().unwrap();
        assert_eq!(event(3, 7).is_grace_period_over(now), expected);
    }

    #[rstest]
    #[case("2024-01-10T23:59:59Z", false)]
    #[case("2024-01-11T00:00:00Z", false)]
    #[case("2024-01-11T00:00:01Z", true)]
    fn test_retention_over(#[case] now: &str, #[case] expected: bool) {
        let now: DateTime<Utc> = now.parse().unwrap();
        assert_eq!(event(3, 7).is_retention_over(now), expected);
    }

    #[test]
    fn test_zero_day_periods_end_with_the_event() {
        let e = event(0, 0);
        assert_eq!(e.grace_period_end(), Some(e.end_date_time));
        assert_eq!(e.retention_end(), Some(e.end_date_time));
        assert!(!e.is_retention_over(e.end_date_time));
        assert!(e.is_retention_over(e.end_date_time + Duration::seconds(1)));
    }

    #[test]
    fn test_unrepresentable_deadline_is_never_due() {
        let far_future = Utc.with_ymd_and_hms(200_000, 1, 1, 0, 0, 0).unwrap();

        let e = event(3, u32::MAX);
        assert!(e.grace_period_end().is_some());
        assert_eq!(e.retention_end(), None);
        assert!(!e.is_retention_over(far_future));
        assert!(e.is_grace_period_over(far_future));

        let e = event(u32::MAX, 0);
        assert_eq!(e.grace_period_end(), None);
        assert_eq!(e.retention_end(), None);
        assert!(!e.is_grace_period_over(far_future));
    }

    #[rstest]
    #[case(EventStatus::Active, EventStatus::DownloadPeriod, true)]
    #[case(EventStatus::GracePeriod, EventStatus::DownloadPeriod, true)]
    #[case(EventStatus::DownloadPeriod, EventStatus::Archived, true)]
    #[case(EventStatus::Active, EventStatus::Archived, false)]
    #[case(EventStatus::GracePeriod, EventStatus::Archived, false)]
    #[case(EventStatus::Archived, EventStatus::DownloadPeriod, false)]
    #[case(EventStatus::DownloadPeriod, EventStatus::DownloadPeriod, false)]
    #[case(EventStatus::DownloadPeriod, EventStatus::Active, false)]
    fn test_can_advance_to(
        #[case] from: EventStatus,
        #[case] to: EventStatus,
        #[case] expected: bool,
    ) {
        assert_eq!(from.can_advance_to(to), expected);
    }

    #[test]
    fn test_status_round_trips_through_storage_string() {
        for status in [
            EventStatus::Created,
            EventStatus::Paid,
            EventStatus::Active,
            EventStatus::GracePeriod,
            EventStatus::DownloadPeriod,
            EventStatus::Archived,
        ] {
            assert_eq!(status.as_str().parse::<EventStatus>().unwrap(), status);
        }
        assert!("archived".parse::<EventStatus>().is_err());
    }

    #[test]
    fn test_status_serde_uses_screaming_case() {
        let json = serde_json::to_string(&EventStatus::DownloadPeriod).unwrap();
        assert_eq!(json, "\"DOWNLOAD_PERIOD\"");
    }
}

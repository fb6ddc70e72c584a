use crate::models::ConversationStatus;
use chrono::{DateTime, Utc};

/// One row of the console's conversation list.
#[derive(Debug, Clone)]
pub struct ConversationSummary {
    pub id: String,
    pub customer_label: String,
    pub preview: String,
    pub status: ConversationStatus,
    pub updated_at: DateTime<Utc>,
    pub recency: String,
}

/// Human-readable elapsed time with fixed thresholds: under a minute is
/// "just now", then minutes, hours, days, and past a week the calendar
/// date.
pub fn recency_label(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(at);
    let minutes = elapsed.num_minutes();
    if minutes < 1 {
        "just now".to_string()
    } else if minutes < 60 {
        format!("{minutes} minutes ago")
    } else if elapsed.num_hours() < 24 {
        format!("{} hours ago", elapsed.num_hours())
    } else if elapsed.num_days() < 7 {
        format!("{} days ago", elapsed.num_days())
    } else {
        at.format("%Y-%m-%d").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn base() -> DateTime<Utc> {
        DateTime::from_timestamp_millis(1_700_000_000_000).unwrap()
    }

    #[test]
    fn test_recency_thresholds() {
        let now = base();
        assert_eq!(recency_label(now - Duration::seconds(30), now), "just now");
        assert_eq!(
            recency_label(now - Duration::minutes(5), now),
            "5 minutes ago"
        );
        assert_eq!(
            recency_label(now - Duration::minutes(59), now),
            "59 minutes ago"
        );
        assert_eq!(recency_label(now - Duration::hours(3), now), "3 hours ago");
        assert_eq!(recency_label(now - Duration::days(2), now), "2 days ago");
    }

    #[test]
    fn test_recency_falls_back_to_date_past_a_week() {
        let now = base();
        let label = recency_label(now - Duration::days(10), now);
        assert_eq!(label, (now - Duration::days(10)).format("%Y-%m-%d").to_string());
    }

    #[test]
    fn test_future_timestamp_reads_just_now() {
        let now = base();
        assert_eq!(recency_label(now + Duration::minutes(2), now), "just now");
    }
}

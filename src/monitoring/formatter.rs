//! Offline event to notification payload mapping

use serde::Serialize;

use crate::event::OfflineEvent;

/// Header shown on every offline alert
pub const ALERT_HEADER: &str = "🚨 Embed Swiper Offline Alert!";

/// Layout used for the `Log Time` field
const LOG_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Transport-agnostic notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationPayload {
    pub header: String,
    pub fields: Vec<PayloadField>,
    pub body: String,
}

/// Labeled value inside a notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PayloadField {
    pub label: String,
    pub value: String,
}

impl PayloadField {
    fn new(label: &str, value: impl Into<String>) -> Self {
        Self {
            label: label.to_string(),
            value: value.into(),
        }
    }
}

impl NotificationPayload {
    /// Value of the field labeled `label`, if any
    pub fn field(&self, label: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.label == label)
            .map(|f| f.value.as_str())
    }
}

/// Build the alert for one event. Pure; field order is fixed.
pub fn format_notification(event: &OfflineEvent) -> NotificationPayload {
    NotificationPayload {
        header: ALERT_HEADER.to_string(),
        fields: vec![
            PayloadField::new("Game", event.device_description.as_str()),
            PayloadField::new("User", event.user_name.as_str()),
            PayloadField::new("Days Offline", event.days_offline.to_string()),
            PayloadField::new(
                "Log Time",
                event.occurred_at.format(LOG_TIME_FORMAT).to_string(),
            ),
        ],
        body: event.comment.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_event() -> OfflineEvent {
        let occurred_at = NaiveDate::from_ymd_opt(2025, 2, 1)
            .and_then(|d| d.and_hms_opt(14, 23, 45))
            .expect("valid timestamp");
        OfflineEvent::new(
            "Skee Ball 3",
            "jsmith",
            "Swiper placed Offline - card reader jammed",
            occurred_at,
            4,
        )
    }

    #[test]
    fn should_map_event_to_labeled_fields_in_order() {
        // Act
        let payload = format_notification(&sample_event());

        // Assert
        let labels: Vec<_> = payload.fields.iter().map(|f| f.label.as_str()).collect();
        assert_eq!(labels, vec!["Game", "User", "Days Offline", "Log Time"]);
        assert_eq!(payload.field("Game"), Some("Skee Ball 3"));
        assert_eq!(payload.field("User"), Some("jsmith"));
        assert_eq!(payload.field("Days Offline"), Some("4"));
        assert_eq!(payload.field("Log Time"), Some("2025-02-01 14:23:45"));
    }

    #[test]
    fn should_use_fixed_header_and_comment_body() {
        let payload = format_notification(&sample_event());

        assert_eq!(payload.header, ALERT_HEADER);
        assert_eq!(payload.body, "Swiper placed Offline - card reader jammed");
    }

    #[test]
    fn should_be_deterministic() {
        let event = sample_event();

        assert_eq!(format_notification(&event), format_notification(&event));
    }

    #[test]
    fn should_return_none_for_unknown_field() {
        let payload = format_notification(&sample_event());

        assert_eq!(payload.field("Severity"), None);
    }
}

use chrono::NaiveDateTime;

/// One "device placed offline" record returned by the event store.
///
/// Carries no identity besides `occurred_at`; duplicates across polls are prevented
/// by the watermark alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfflineEvent {
    /// Device (game swiper) description, the stable ordering key
    pub device_description: String,
    /// User who placed the device offline
    pub user_name: String,
    /// Offline comment(s) logged with the event
    pub comment: String,
    /// When the event was logged, in store-local time
    pub occurred_at: NaiveDateTime,
    /// Calendar days between the event and the query time
    pub days_offline: i64,
}

impl OfflineEvent {
    pub fn new(
        device_description: impl Into<String>,
        user_name: impl Into<String>,
        comment: impl Into<String>,
        occurred_at: NaiveDateTime,
        days_offline: i64,
    ) -> Self {
        Self {
            device_description: device_description.into(),
            user_name: user_name.into(),
            comment: comment.into(),
            occurred_at,
            days_offline,
        }
    }
}

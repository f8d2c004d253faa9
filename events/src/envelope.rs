use chrono::{DateTime, FixedOffset};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// The catalog of event tags the backend emits on the real-time channel.
///
/// Tags arrive as plain strings on the wire; anything outside the known
/// catalog lands in `Other` and is still dispatched generically, so a
/// backend rollout that adds a new event kind never breaks older clients.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// First frame after the channel opens; carries the session's display timezone.
    ConnectionEstablished,
    MessageSent,
    MessageReceived,
    EmailSent,
    EmailReceived,
    ConversationAssigned,
    ReminderShared,
    WebchatVisitorOnline,
    /// Any tag not in the known catalog.
    Other(String),
}

impl EventKind {
    /// The wire representation of this kind.
    pub fn as_str(&self) -> &str {
        match self {
            EventKind::ConnectionEstablished => "connection-established",
            EventKind::MessageSent => "message-sent",
            EventKind::MessageReceived => "message-received",
            EventKind::EmailSent => "email-sent",
            EventKind::EmailReceived => "email-received",
            EventKind::ConversationAssigned => "conversation-assigned",
            EventKind::ReminderShared => "reminder-shared",
            EventKind::WebchatVisitorOnline => "webchat-visitor-online",
            EventKind::Other(tag) => tag,
        }
    }
}

impl From<&str> for EventKind {
    fn from(tag: &str) -> Self {
        match tag {
            "connection-established" => EventKind::ConnectionEstablished,
            "message-sent" => EventKind::MessageSent,
            "message-received" => EventKind::MessageReceived,
            "email-sent" => EventKind::EmailSent,
            "email-received" => EventKind::EmailReceived,
            "conversation-assigned" => EventKind::ConversationAssigned,
            "reminder-shared" => EventKind::ReminderShared,
            "webchat-visitor-online" => EventKind::WebchatVisitorOnline,
            other => EventKind::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for EventKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(EventKind::from(tag.as_str()))
    }
}

/// The uniform wrapper carried by every frame on the real-time channel.
///
/// `kind` (wire name `type`) is the only required field and drives both
/// dispatch and rendering. `timestamp` and `timezone` are kept verbatim as
/// the backend produced them; typed accessors are provided for consumers
/// that want to render, and a value that fails to parse simply yields
/// `None` rather than invalidating the envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    #[serde(rename = "type")]
    pub kind: EventKind,

    /// Instant the event was produced, as an ISO-8601 string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,

    /// IANA timezone describing how the timestamp should be displayed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,

    /// Opaque payload; shape is determined by `kind`.
    #[serde(default)]
    pub data: Value,
}

impl EventEnvelope {
    /// Build an envelope with no payload, timestamp, or timezone.
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            timestamp: None,
            timezone: None,
            data: Value::Null,
        }
    }

    /// Build an envelope carrying the given payload.
    pub fn with_data(kind: EventKind, data: Value) -> Self {
        Self {
            kind,
            timestamp: None,
            timezone: None,
            data,
        }
    }

    /// The timestamp parsed as an RFC 3339 instant, if present and well formed.
    pub fn parsed_timestamp(&self) -> Option<DateTime<FixedOffset>> {
        self.timestamp
            .as_deref()
            .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
    }

    /// The display timezone parsed as an IANA `Tz`, if present and well formed.
    pub fn display_timezone(&self) -> Option<Tz> {
        self.timezone.as_deref().and_then(|tz| tz.parse().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_full_envelope() {
        let raw = r#"{
            "type": "message-received",
            "timestamp": "2025-06-01T12:30:00+01:00",
            "timezone": "Europe/London",
            "data": {"conversation_id": "c-42", "body": "hello"}
        }"#;

        let envelope: EventEnvelope = serde_json::from_str(raw).unwrap();

        assert_eq!(envelope.kind, EventKind::MessageReceived);
        assert_eq!(envelope.data["conversation_id"], "c-42");
        assert_eq!(
            envelope.parsed_timestamp().unwrap().to_rfc3339(),
            "2025-06-01T12:30:00+01:00"
        );
        assert_eq!(envelope.display_timezone(), Some(chrono_tz::Europe::London));
    }

    #[test]
    fn unknown_tag_lands_in_other() {
        let raw = r#"{"type": "call-missed", "data": {}}"#;
        let envelope: EventEnvelope = serde_json::from_str(raw).unwrap();

        assert_eq!(envelope.kind, EventKind::Other("call-missed".to_string()));
        assert_eq!(envelope.kind.as_str(), "call-missed");
    }

    #[test]
    fn missing_type_is_rejected() {
        let raw = r#"{"timestamp": "2025-06-01T12:30:00Z", "data": {}}"#;
        assert!(serde_json::from_str::<EventEnvelope>(raw).is_err());
    }

    #[test]
    fn optional_fields_default() {
        let raw = r#"{"type": "webchat-visitor-online"}"#;
        let envelope: EventEnvelope = serde_json::from_str(raw).unwrap();

        assert_eq!(envelope.kind, EventKind::WebchatVisitorOnline);
        assert!(envelope.timestamp.is_none());
        assert!(envelope.timezone.is_none());
        assert_eq!(envelope.data, Value::Null);
    }

    #[test]
    fn malformed_timestamp_and_timezone_parse_to_none() {
        let envelope = EventEnvelope {
            kind: EventKind::EmailReceived,
            timestamp: Some("yesterday-ish".to_string()),
            timezone: Some("Narnia/Lantern".to_string()),
            data: json!({}),
        };

        assert!(envelope.parsed_timestamp().is_none());
        assert!(envelope.display_timezone().is_none());
    }

    #[test]
    fn kind_round_trips_through_wire_names() {
        let kinds = [
            EventKind::ConnectionEstablished,
            EventKind::MessageSent,
            EventKind::MessageReceived,
            EventKind::EmailSent,
            EventKind::EmailReceived,
            EventKind::ConversationAssigned,
            EventKind::ReminderShared,
            EventKind::WebchatVisitorOnline,
        ];

        for kind in kinds {
            assert_eq!(EventKind::from(kind.as_str()), kind);
        }
    }

    #[test]
    fn serializes_kind_as_type_field() {
        let envelope = EventEnvelope::with_data(EventKind::EmailSent, json!({"id": 7}));
        let value = serde_json::to_value(&envelope).unwrap();

        assert_eq!(value["type"], "email-sent");
        assert_eq!(value["data"]["id"], 7);
    }
}

use std::fmt::Display;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl FromStr for Level {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warn" => Ok(Level::Warn),
            "error" => Ok(Level::Error),
            _ => Err(eyre::eyre!("unsupported level: {:?}", s)),
        }
    }
}

impl Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Level::Debug => write!(f, "debug"),
            Level::Info => write!(f, "info"),
            Level::Warn => write!(f, "warn"),
            Level::Error => write!(f, "error"),
        }
    }
}

/// The JSON payload as it arrives over HTTP. Missing fields decode to their
/// empty values and are rejected by `into_event`, which keeps the error
/// messages in one place.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct EventPayload {
    pub timestamp: String,
    pub level: String,
    pub message: String,
    pub app: String,
    pub user: String,
    pub fields: Option<Map<String, Value>>,
}

/// A validated, normalised log event. Immutable once constructed.
#[derive(Clone, Debug)]
pub struct Event {
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    pub message: String,
    pub app: Option<String>,
    pub user: Option<String>,
    pub fields: Map<String, Value>,
}

impl EventPayload {
    pub fn into_event(self) -> eyre::Result<Event> {
        let timestamp = self.timestamp.trim();
        if timestamp.is_empty() {
            return Err(eyre::eyre!("missing field: timestamp"));
        }

        let timestamp = DateTime::parse_from_rfc3339(timestamp)
            .map_err(|_| eyre::eyre!("invalid timestamp: must be RFC3339"))?
            .with_timezone(&Utc);

        let level: Level = self.level.parse()?;

        let message = self.message.trim();
        if message.is_empty() {
            return Err(eyre::eyre!("missing field: message"));
        }

        Ok(Event {
            timestamp,
            level,
            message: message.to_string(),
            app: non_empty(&self.app),
            user: non_empty(&self.user),
            fields: self.fields.unwrap_or_default(),
        })
    }
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn payload() -> EventPayload {
        EventPayload {
            timestamp: "2026-02-09T12:34:56Z".to_string(),
            level: "info".to_string(),
            message: "hello".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn level_parsing_trims_and_ignores_case() {
        assert_eq!(" WARN ".parse::<Level>().unwrap(), Level::Warn);
        assert_eq!("Error".parse::<Level>().unwrap(), Level::Error);
        assert_eq!("debug".parse::<Level>().unwrap(), Level::Debug);
    }

    #[test]
    fn level_parsing_rejects_unknown_values() {
        let err = "fatal".parse::<Level>().unwrap_err();
        assert!(err.to_string().contains("unsupported level"));
    }

    #[test]
    fn valid_payload_becomes_event() {
        let event = payload().into_event().unwrap();

        assert_eq!(
            event.timestamp,
            Utc.with_ymd_and_hms(2026, 2, 9, 12, 34, 56).unwrap()
        );
        assert_eq!(event.level, Level::Info);
        assert_eq!(event.message, "hello");
        assert_eq!(event.app, None);
        assert_eq!(event.user, None);
        assert!(event.fields.is_empty());
    }

    #[test]
    fn offset_timestamps_normalise_to_utc() {
        let mut p = payload();
        p.timestamp = "2026-02-09T14:34:56+02:00".to_string();

        let event = p.into_event().unwrap();
        assert_eq!(
            event.timestamp,
            Utc.with_ymd_and_hms(2026, 2, 9, 12, 34, 56).unwrap()
        );
    }

    #[test]
    fn missing_timestamp_is_rejected() {
        let mut p = payload();
        p.timestamp = "   ".to_string();

        let err = p.into_event().unwrap_err();
        assert_eq!(err.to_string(), "missing field: timestamp");
    }

    #[test]
    fn malformed_timestamp_is_rejected() {
        let mut p = payload();
        p.timestamp = "2026-02-09 12:34:56".to_string();

        let err = p.into_event().unwrap_err();
        assert_eq!(err.to_string(), "invalid timestamp: must be RFC3339");
    }

    #[test]
    fn blank_message_is_rejected() {
        let mut p = payload();
        p.message = " \t ".to_string();

        let err = p.into_event().unwrap_err();
        assert_eq!(err.to_string(), "missing field: message");
    }

    #[test]
    fn message_is_trimmed() {
        let mut p = payload();
        p.message = "  spaced out  ".to_string();

        assert_eq!(p.into_event().unwrap().message, "spaced out");
    }

    #[test]
    fn app_and_user_trim_to_none_when_blank() {
        let mut p = payload();
        p.app = "  ".to_string();
        p.user = " alice ".to_string();

        let event = p.into_event().unwrap();
        assert_eq!(event.app, None);
        assert_eq!(event.user, Some("alice".to_string()));
    }

    #[test]
    fn missing_fields_default_to_empty_payload() {
        let p: EventPayload = serde_json::from_value(json!({
            "timestamp": "2026-02-09T12:34:56Z",
            "level": "warn",
            "message": "m"
        }))
        .unwrap();

        let event = p.into_event().unwrap();
        assert!(event.fields.is_empty());
        assert_eq!(event.level, Level::Warn);
    }
}

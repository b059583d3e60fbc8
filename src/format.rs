use chrono::SecondsFormat;
use serde_json::Value;

use crate::event::{Event, Level};

// Replaces newlines with tabs so one event can never span more than one
// physical line in the stored file.
fn sanitize(s: &str) -> String {
    s.replace(['\r', '\n'], "\t")
}

// Every tag occupies 7 characters including the brackets, so the segment
// after the level starts at the same column on every line.
fn level_tag(level: Level) -> &'static str {
    match level {
        Level::Debug => "[DEBUG]",
        Level::Info => "[INFO] ",
        Level::Warn => "[WARN] ",
        Level::Error => "[ERROR]",
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => "null".to_string(),
        // Compound values get a compact JSON rendering; if that ever fails
        // the Display form still yields something greppable.
        other => serde_json::to_string(other).unwrap_or_else(|_| other.to_string()),
    }
}

/// Renders an event into a single deterministic log line:
/// `[timestamp] [LEVEL] [app] [user] message | key=value ...`
/// with the app, user and field segments omitted when empty.
pub fn format_event(event: &Event) -> String {
    let timestamp = event.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true);

    let mut line = format!("[{}] {}", timestamp, level_tag(event.level));

    if let Some(app) = &event.app {
        line.push_str(&format!(" [{}]", sanitize(app)));
    }

    if let Some(user) = &event.user {
        line.push_str(&format!(" [{}]", sanitize(user)));
    }

    line.push(' ');
    line.push_str(&sanitize(&event.message));

    if event.fields.is_empty() {
        return line;
    }

    // Extra fields render in sorted key order. The output has to be
    // byte-identical across runs for the same field set, so the ordering
    // can't be left to whatever the map happens to iterate in.
    let mut fields: Vec<(&String, &Value)> = event.fields.iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    line.push_str(" | ");
    for (i, (key, value)) in fields.iter().enumerate() {
        if i > 0 {
            line.push(' ');
        }
        line.push_str(&sanitize(key));
        line.push('=');
        line.push_str(&sanitize(&format_value(value)));
    }

    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::{json, Map};

    fn event(level: Level, message: &str) -> Event {
        Event {
            timestamp: Utc.with_ymd_and_hms(2026, 2, 9, 12, 34, 56).unwrap(),
            level,
            message: message.to_string(),
            app: None,
            user: None,
            fields: Map::new(),
        }
    }

    #[test]
    fn renders_bare_event() {
        let line = format_event(&event(Level::Error, "disk full"));
        assert_eq!(line, "[2026-02-09T12:34:56Z] [ERROR] disk full");
    }

    #[test]
    fn level_tags_are_seven_characters_wide() {
        assert_eq!(level_tag(Level::Debug), "[DEBUG]");
        assert_eq!(level_tag(Level::Info), "[INFO] ");
        assert_eq!(level_tag(Level::Warn), "[WARN] ");
        assert_eq!(level_tag(Level::Error), "[ERROR]");

        for level in [Level::Debug, Level::Info, Level::Warn, Level::Error] {
            assert_eq!(level_tag(level).len(), 7);
        }
    }

    #[test]
    fn padded_levels_keep_the_message_column_aligned() {
        let info = format_event(&event(Level::Info, "m"));
        let error = format_event(&event(Level::Error, "m"));

        assert_eq!(info, "[2026-02-09T12:34:56Z] [INFO]  m");
        assert_eq!(info.find(" m"), error.find(" m"));
    }

    #[test]
    fn app_and_user_render_as_bracketed_tags() {
        let mut e = event(Level::Info, "started");
        e.app = Some("web".to_string());
        e.user = Some("alice".to_string());

        let line = format_event(&e);
        assert_eq!(line, "[2026-02-09T12:34:56Z] [INFO]  [web] [alice] started");
    }

    #[test]
    fn fields_render_in_sorted_key_order() {
        let mut e = event(Level::Info, "m");
        e.fields.insert("b".to_string(), json!("2"));
        e.fields.insert("a".to_string(), json!("1"));
        e.fields.insert("c".to_string(), json!("3"));

        let line = format_event(&e);
        assert!(line.ends_with(" m | a=1 b=2 c=3"));
    }

    #[test]
    fn field_values_stringify_per_type() {
        let mut e = event(Level::Info, "m");
        e.fields.insert("count".to_string(), json!(3));
        e.fields.insert("ratio".to_string(), json!(0.5));
        e.fields.insert("ok".to_string(), json!(true));
        e.fields.insert("gone".to_string(), json!(null));
        e.fields.insert("ctx".to_string(), json!({ "a": 1 }));
        e.fields.insert("tags".to_string(), json!(["x", "y"]));

        let line = format_event(&e);
        assert!(line.ends_with(
            r#" m | count=3 ctx={"a":1} gone=null ok=true ratio=0.5 tags=["x","y"]"#
        ));
    }

    #[test]
    fn newlines_become_tabs_in_every_text_segment() {
        let mut e = event(Level::Error, "Line1\nLine2\rLine3");
        e.app = Some("we\nb".to_string());
        e.user = Some("al\rice".to_string());
        e.fields.insert("no\nte".to_string(), json!("a\r\nb"));

        let line = format_event(&e);
        assert!(!line.contains('\n'));
        assert!(!line.contains('\r'));
        assert!(line.contains("Line1\tLine2\tLine3"));
        assert!(line.contains("[we\tb] [al\tice]"));
        assert!(line.contains("no\tte=a\t\tb"));
    }

    #[test]
    fn matches_the_documented_example() {
        let mut e = event(Level::Error, "Line1\nLine2");
        e.fields.insert("user_id".to_string(), json!("123"));
        e.fields.insert("ip".to_string(), json!("203.0.113.42"));

        assert_eq!(
            format_event(&e),
            "[2026-02-09T12:34:56Z] [ERROR] Line1\tLine2 | ip=203.0.113.42 user_id=123"
        );
    }
}

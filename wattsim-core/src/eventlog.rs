//! Structured JSONL game log.
//!
//! The engine emits one JSON object per significant event, written
//! synchronously before the state transition it describes takes effect.
//! Loggers carry persistent fields; deriving a child copies the parent's
//! fields without ever mutating the parent, so scoping a logger to a phase or
//! a player is cheap and safe.
//!
//! ```text
//! game logger ── round=3
//!     └── phase logger ── round=3 phase=operate
//!             └── player logger ── round=3 phase=operate player=1
//! ```

use serde::Serialize;
use serde_json::{Map, Value};
use std::io::Write;
use std::sync::{Arc, Mutex};

/// Fixed tags identifying each kind of game event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    PhaseTransition,
    PlayerAction,
    InvalidPlayerAction,
    RiskDrawn,
    GridOutcome,
    MarketOutcome,
    CarbonTaxApplied,
    PlayerLoses,
    EveryoneLoses,
    GlobalWin,
}

type Sink = Arc<Mutex<Box<dyn Write + Send>>>;

/// A structured logger with persistent fields and an optional JSONL sink.
///
/// Cloning or [`child`](GameLogger::child)-deriving copies the field set;
/// the sink itself is shared. A logger without a sink drops every event,
/// which is the null logger used by tests.
#[derive(Clone, Default)]
pub struct GameLogger {
    sink: Option<Sink>,
    fields: Map<String, Value>,
}

impl GameLogger {
    /// Logger writing one JSON line per event to the given sink.
    pub fn to_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            sink: Some(Arc::new(Mutex::new(Box::new(writer)))),
            fields: Map::new(),
        }
    }

    /// Logger that discards all events.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Derive a logger with a copy of this logger's persistent fields.
    pub fn child(&self) -> Self {
        self.clone()
    }

    /// Add a persistent field included in every subsequent event.
    ///
    /// An unserializable value is dropped with a warning rather than
    /// aborting the game over a log line.
    pub fn with(mut self, key: &str, value: impl Serialize) -> Self {
        match serde_json::to_value(value) {
            Ok(v) => {
                self.fields.insert(key.to_string(), v);
            }
            Err(e) => log::warn!("dropping unserializable log field {key}: {e}"),
        }
        self
    }

    /// Start an event of the given kind.
    pub fn event(&self, kind: EventKind) -> EventBuilder<'_> {
        let mut fields = self.fields.clone();
        match serde_json::to_value(kind) {
            Ok(v) => {
                fields.insert("event".to_string(), v);
            }
            Err(e) => log::warn!("dropping unserializable event kind: {e}"),
        }
        EventBuilder {
            sink: self.sink.as_ref(),
            fields,
        }
    }
}

/// One in-flight log event; finalize with [`emit`](EventBuilder::emit).
pub struct EventBuilder<'a> {
    sink: Option<&'a Sink>,
    fields: Map<String, Value>,
}

impl EventBuilder<'_> {
    /// Add a contextual field to this event only.
    pub fn field(mut self, key: &str, value: impl Serialize) -> Self {
        match serde_json::to_value(value) {
            Ok(v) => {
                self.fields.insert(key.to_string(), v);
            }
            Err(e) => log::warn!("dropping unserializable event field {key}: {e}"),
        }
        self
    }

    /// Write the event as a single JSON line. Write failures are logged and
    /// otherwise ignored; the simulation never fails over its log.
    pub fn emit(self) {
        let Some(sink) = self.sink else {
            return;
        };
        let line = Value::Object(self.fields);
        match sink.lock() {
            Ok(mut writer) => {
                if let Err(e) = writeln!(writer, "{line}") {
                    log::warn!("event log write failed: {e}");
                }
            }
            Err(_) => log::warn!("event log sink poisoned; dropping event"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A clonable in-memory sink so tests can read back what was written.
    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        fn lines(&self) -> Vec<Value> {
            let buf = self.0.lock().unwrap();
            String::from_utf8(buf.clone())
                .unwrap()
                .lines()
                .map(|l| serde_json::from_str(l).unwrap())
                .collect()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().write(data)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_event_carries_kind_and_fields() {
        let buf = SharedBuf::default();
        let logger = GameLogger::to_writer(buf.clone());

        logger
            .event(EventKind::RiskDrawn)
            .field("risk", "medium")
            .emit();

        let lines = buf.lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["event"], "risk_drawn");
        assert_eq!(lines[0]["risk"], "medium");
    }

    #[test]
    fn test_persistent_fields_appear_in_every_event() {
        let buf = SharedBuf::default();
        let logger = GameLogger::to_writer(buf.clone()).with("round", 3);

        logger.event(EventKind::PhaseTransition).emit();
        logger.event(EventKind::GridOutcome).emit();

        for line in buf.lines() {
            assert_eq!(line["round"], 3);
        }
    }

    #[test]
    fn test_child_extends_without_mutating_parent() {
        let buf = SharedBuf::default();
        let parent = GameLogger::to_writer(buf.clone()).with("round", 1);
        let child = parent.child().with("player", 2);

        child.event(EventKind::MarketOutcome).emit();
        parent.event(EventKind::PhaseTransition).emit();

        let lines = buf.lines();
        assert_eq!(lines[0]["round"], 1);
        assert_eq!(lines[0]["player"], 2);
        assert_eq!(lines[1]["round"], 1);
        assert!(lines[1].get("player").is_none());
    }

    #[test]
    fn test_event_field_overwrites_persistent_field() {
        let buf = SharedBuf::default();
        let logger = GameLogger::to_writer(buf.clone()).with("round", 1);

        logger
            .event(EventKind::PlayerAction)
            .field("round", 2)
            .emit();

        assert_eq!(buf.lines()[0]["round"], 2);
    }

    #[test]
    fn test_disabled_logger_drops_events() {
        // Nothing to assert beyond "does not panic without a sink".
        GameLogger::disabled()
            .with("round", 1)
            .event(EventKind::GlobalWin)
            .field("x", 1)
            .emit();
    }

    #[test]
    fn test_struct_values_serialize_inline() {
        #[derive(Serialize)]
        struct Funds {
            money: i64,
        }

        let buf = SharedBuf::default();
        let logger = GameLogger::to_writer(buf.clone());
        logger
            .event(EventKind::MarketOutcome)
            .field("funds", Funds { money: 7 })
            .emit();

        assert_eq!(buf.lines()[0]["funds"]["money"], 7);
    }
}

/*!
An injectable logging sink. The loader, mutation API, and tempo map log through
the `log` crate facade the same way the teacher does (`trace!`/`debug!`/`warn!`), so any host
binary wiring up `env_logger` (as the teacher's own `tests/utils.rs` does) gets diagnostics for
free. `LogSink` sits on top for callers who want a structured, in-process callback instead of (or
in addition to) the global logger — e.g. a GUI that wants to render the warning.
!*/

use log::{debug, error, warn};

/// Severity of a logged message.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LogLevel {
    Debug,
    Warning,
    Critical,
}

/// A process- or song-wide callback for library diagnostics.
pub trait LogSink: std::fmt::Debug {
    fn log(&self, level: LogLevel, message: &str);
}

/// Forwards every message to the `log` crate facade. This is the default sink for a new [`crate::Smf`]
/// so that a host binary's existing logger configuration (`env_logger`, etc.) picks up diagnostics
/// without any extra wiring.
#[derive(Debug, Default)]
pub(crate) struct DefaultLogSink;

impl LogSink for DefaultLogSink {
    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Debug => debug!("{}", message),
            LogLevel::Warning => warn!("{}", message),
            LogLevel::Critical => error!("{}", message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Debug, Default)]
    struct RecordingSink {
        messages: RefCell<Vec<(LogLevel, String)>>,
    }

    impl LogSink for RecordingSink {
        fn log(&self, level: LogLevel, message: &str) {
            self.messages.borrow_mut().push((level, message.to_string()));
        }
    }

    #[test]
    fn recording_sink_captures_messages() {
        let sink = RecordingSink::default();
        sink.log(LogLevel::Warning, "tempo change discarded");
        assert_eq!(1, sink.messages.borrow().len());
        assert_eq!(LogLevel::Warning, sink.messages.borrow()[0].0);
    }
}

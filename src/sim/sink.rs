//! Receivers for the execution trace.
//!
//! While executing, the simulator emits one line per instruction (its caption),
//! followed by one indented line per mutation the instruction made.
//! These lines are sent to a [`LogSink`].
//!
//! A sink can be:
//! - a closure (`|line: &str| ...`),
//! - a `Vec<String>`, which collects every line,
//! - a [`crossbeam_channel::Sender`], which forwards every line to another thread (e.g., a UI),
//! - a [`NullSink`], which discards every line.

/// A receiver of trace lines.
pub trait LogSink {
    /// Receives one line of the trace.
    fn log(&mut self, line: &str);
}

impl<F: FnMut(&str)> LogSink for F {
    fn log(&mut self, line: &str) {
        self(line)
    }
}

impl LogSink for Vec<String> {
    fn log(&mut self, line: &str) {
        self.push(line.to_string());
    }
}

impl LogSink for crossbeam_channel::Sender<String> {
    /// Sends the line to the receiving end.
    ///
    /// If the receiver has been dropped, the line is discarded.
    fn log(&mut self, line: &str) {
        // a disconnected receiver is not an execution error
        let _ = self.send(line.to_string());
    }
}

/// A sink which discards every line.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Default)]
pub struct NullSink;
impl LogSink for NullSink {
    fn log(&mut self, _line: &str) {}
}

#[cfg(test)]
mod tests {
    use super::{LogSink, NullSink};

    fn emit(sink: &mut impl LogSink) {
        sink.log("(0): LOCO 1");
        sink.log("    ac := 1");
    }

    #[test]
    fn test_vec_sink() {
        let mut lines: Vec<String> = vec![];
        emit(&mut lines);
        assert_eq!(lines, ["(0): LOCO 1", "    ac := 1"]);
    }

    #[test]
    fn test_closure_sink() {
        let mut count = 0;
        emit(&mut |line: &str| count += line.len());
        assert_eq!(count, 22);
    }

    #[test]
    fn test_channel_sink() {
        let (mut tx, rx) = crossbeam_channel::unbounded::<String>();
        emit(&mut tx);
        drop(tx);
        assert_eq!(rx.iter().collect::<Vec<_>>(), ["(0): LOCO 1", "    ac := 1"]);

        // sending to a dropped receiver does not panic
        let (mut tx, rx) = crossbeam_channel::unbounded::<String>();
        drop(rx);
        emit(&mut tx);
    }

    #[test]
    fn test_null_sink() {
        emit(&mut NullSink);
    }
}

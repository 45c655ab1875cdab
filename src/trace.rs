//! Destinations for the driver's trace lines.
//!
//! Every frame sent and received, and every current clamp, is written to the
//! driver's sink verbatim while tracing is enabled.

use core::fmt;

/// Receives trace lines.
pub trait TraceSink: Send {
    fn log(&mut self, line: &str);
}

/// Emits each line as an INFO event on the `pantak_hf75::trace` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl TraceSink for TracingSink {
    fn log(&mut self, line: &str) {
        tracing::info!(target: "pantak_hf75::trace", "{line}");
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl TraceSink for NullSink {
    fn log(&mut self, _line: &str) {}
}

impl<F: FnMut(&str) + Send> TraceSink for F {
    fn log(&mut self, line: &str) {
        self(line)
    }
}

/// A sink plus its on/off switch.
pub(crate) struct Tracer {
    enabled: bool,
    sink: Box<dyn TraceSink>,
}

impl Tracer {
    pub(crate) fn new(enabled: bool, sink: Box<dyn TraceSink>) -> Self {
        Self { enabled, sink }
    }

    pub(crate) fn log(&mut self, args: fmt::Arguments<'_>) {
        if self.enabled {
            self.sink.log(&args.to_string());
        }
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn set_sink(&mut self, sink: Box<dyn TraceSink>) {
        self.sink = sink;
    }
}

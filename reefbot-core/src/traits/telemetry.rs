//! Telemetry sink trait
//!
//! Subsystems emit named numeric samples each tick. How they are published
//! (network tables, RTT, a log file) is up to the implementation.

/// Trait for receiving telemetry samples
pub trait TelemetrySink {
    /// Record the latest value for `key`
    fn record(&mut self, key: &str, value: f32);

    /// Record a boolean as 0.0 / 1.0
    fn record_flag(&mut self, key: &str, value: bool) {
        self.record(key, if value { 1.0 } else { 0.0 });
    }
}

/// Sink that drops every sample
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl TelemetrySink for NullSink {
    fn record(&mut self, _key: &str, _value: f32) {}
}

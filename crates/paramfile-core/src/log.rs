//! Logging capability handed to the config binder.

/// Four-level sink for binder progress and diagnostics.
pub trait ConfigLog {
    fn debug(&self, msg: &str);
    fn info(&self, msg: &str);
    fn warn(&self, msg: &str);
    fn error(&self, msg: &str);
}

/// Discards everything. Used when the caller supplies no sink.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLog;

impl ConfigLog for NoopLog {
    fn debug(&self, _msg: &str) {}
    fn info(&self, _msg: &str) {}
    fn warn(&self, _msg: &str) {}
    fn error(&self, _msg: &str) {}
}

/// Forwards to the `tracing` macros under the `paramfile::config` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLog;

impl ConfigLog for TracingLog {
    fn debug(&self, msg: &str) {
        tracing::debug!(target: "paramfile::config", "{msg}");
    }

    fn info(&self, msg: &str) {
        tracing::info!(target: "paramfile::config", "{msg}");
    }

    fn warn(&self, msg: &str) {
        tracing::warn!(target: "paramfile::config", "{msg}");
    }

    fn error(&self, msg: &str) {
        tracing::error!(target: "paramfile::config", "{msg}");
    }
}

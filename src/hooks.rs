//! Optional logging callbacks supplied by the host.
//!
//! The strategy always emits `tracing` events. Hosts that route logs
//! elsewhere can additionally register plain functions here.

use std::fmt;
use std::sync::Arc;

/// Logging callback: `(message, error)`.
pub type LogFn = Arc<dyn Fn(&str, Option<&anyhow::Error>) + Send + Sync>;

/// Host logging callbacks. Both are optional and fire-and-forget.
#[derive(Clone, Default)]
pub struct LogHooks {
    info: Option<LogFn>,
    error: Option<LogFn>,
}

impl LogHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_info<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, Option<&anyhow::Error>) + Send + Sync + 'static,
    {
        self.info = Some(Arc::new(f));
        self
    }

    pub fn with_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, Option<&anyhow::Error>) + Send + Sync + 'static,
    {
        self.error = Some(Arc::new(f));
        self
    }

    pub(crate) fn info(&self, message: &str) {
        if let Some(ref f) = self.info {
            f(message, None);
        }
    }

    pub(crate) fn error(&self, message: &str, error: Option<&anyhow::Error>) {
        if let Some(ref f) = self.error {
            f(message, error);
        }
    }
}

impl fmt::Debug for LogHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogHooks")
            .field("info", &self.info.is_some())
            .field("error", &self.error.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::Mutex;

    #[test]
    fn test_hooks_receive_messages() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let info_seen = Arc::clone(&seen);
        let error_seen = Arc::clone(&seen);

        let hooks = LogHooks::new()
            .with_info(move |msg, _| info_seen.lock().unwrap().push(format!("info:{}", msg)))
            .with_error(move |msg, err| {
                let err = err.map(|e| e.to_string()).unwrap_or_default();
                error_seen.lock().unwrap().push(format!("error:{}:{}", msg, err));
            });

        hooks.info("redirecting");
        hooks.error("logout failed", Some(&anyhow!("no session")));

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["info:redirecting", "error:logout failed:no session"]
        );
    }

    #[test]
    fn test_missing_hooks_are_noops() {
        let hooks = LogHooks::default();
        hooks.info("nothing");
        hooks.error("nothing", None);
        assert_eq!(format!("{:?}", hooks), "LogHooks { info: false, error: false }");
    }
}

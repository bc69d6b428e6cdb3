//! Phase runner and core state.
//!
//! A phase loads one slice of the provider list:
//!
//! ```text
//! init(A).await → init(B).await → … → start(A), start(B), …
//! ```
//!
//! Inits run one at a time in registration order. Starts are fired
//! back-to-back once every init of the phase has returned.

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use hearth_support::rendering::render_sequence;
use tracing::{debug, info, instrument};

use crate::logger::Logger;
use crate::provider::{Phase, ProviderEntry};

/// Emitted after `boot()` loads the early providers. Payload: phase success.
pub const EVENT_BOOTED: &str = "core:booted";
/// Emitted after `start()` loads the normal providers. Payload: phase success.
pub const EVENT_STARTED: &str = "core:started";
/// Emitted once `destroy()` has torn every provider down.
pub const EVENT_DESTROYED: &str = "core:destroyed";

/// Where a core is in its one-way lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoreState {
    New,
    Booted,
    Started,
    Destroyed,
}

impl CoreState {
    /// Derives the state from the three lifecycle flags.
    ///
    /// `start()` may run without `boot()`, so `started` wins over
    /// `booted`, and `destroyed` wins over both.
    pub fn from_flags(booted: bool, started: bool, destroyed: bool) -> Self {
        match (booted, started, destroyed) {
            (_, _, true) => CoreState::Destroyed,
            (_, true, _) => CoreState::Started,
            (true, _, _) => CoreState::Booted,
            _ => CoreState::New,
        }
    }
}

impl fmt::Display for CoreState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreState::New => write!(f, "new"),
            CoreState::Booted => write!(f, "booted"),
            CoreState::Started => write!(f, "started"),
            CoreState::Destroyed => write!(f, "destroyed"),
        }
    }
}

/// Runs one phase over `entries`.
///
/// Returns `false` only when a panic escapes a provider's `init()`: the
/// remaining inits are skipped and no provider of the phase is started.
/// Providers initialized before the panic are left as they are.
#[instrument(skip_all, name = "load_providers", fields(phase = %phase, providers = entries.len()))]
pub(crate) async fn load_providers(entries: Vec<ProviderEntry>, phase: Phase, logger: &dyn Logger) -> bool {
    let names: Vec<String> = entries.iter().map(ProviderEntry::display_name).collect();
    logger.log(&format!(
        "Loading {} {phase} providers: {}",
        entries.len(),
        render_sequence(&names)
    ));

    let inits = async {
        for (entry, name) in entries.iter().zip(&names) {
            debug!(provider = %name, "Initializing provider");
            if let Err(e) = entry.provider.init().await {
                logger.warn(&format!("Provider {name} failed to initialize: {e}"));
            }
        }
    };

    if let Err(panic) = AssertUnwindSafe(inits).catch_unwind().await {
        logger.error(&format!(
            "Loading {phase} providers aborted: {}",
            panic_message(panic.as_ref())
        ));
        return false;
    }

    for (entry, name) in entries.iter().zip(&names) {
        debug!(provider = %name, "Starting provider");
        if let Err(e) = entry.provider.start() {
            logger.warn(&format!("Provider {name} failed to start: {e}"));
        }
    }

    info!("Phase loaded ✓");
    true
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "provider panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::logger::{Level, RecordingLogger};
    use crate::provider::{Provider, RegisterOptions};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::Arc;

    type Trace = Arc<Mutex<Vec<String>>>;

    #[derive(Clone, Copy)]
    enum Script {
        Ok,
        Fail,
        Panic,
        FailStart,
    }

    struct Scripted {
        label: &'static str,
        script: Script,
        trace: Trace,
    }

    #[async_trait]
    impl Provider for Scripted {
        fn name(&self) -> &str {
            self.label
        }

        async fn init(&self) -> Result<(), ProviderError> {
            tokio::task::yield_now().await;
            self.trace.lock().push(format!("{}.init", self.label));
            match self.script {
                Script::Ok | Script::FailStart => Ok(()),
                Script::Fail => Err("no database".into()),
                Script::Panic => panic!("{} exploded", self.label),
            }
        }

        fn start(&self) -> Result<(), ProviderError> {
            self.trace.lock().push(format!("{}.start", self.label));
            match self.script {
                Script::FailStart => Err("port in use".into()),
                _ => Ok(()),
            }
        }
    }

    fn scripted(trace: &Trace, specs: &[(&'static str, Script)]) -> Vec<ProviderEntry> {
        specs
            .iter()
            .map(|&(label, script)| ProviderEntry {
                options: RegisterOptions::default(),
                provider: Arc::new(Scripted {
                    label,
                    script,
                    trace: trace.clone(),
                }),
            })
            .collect()
    }

    #[tokio::test]
    async fn inits_all_then_starts_all() {
        let trace = Trace::default();
        let logger = RecordingLogger::new();
        let entries = scripted(&trace, &[("A", Script::Ok), ("B", Script::Ok)]);

        assert!(load_providers(entries, Phase::Normal, &logger).await);
        assert_eq!(*trace.lock(), vec!["A.init", "B.init", "A.start", "B.start"]);
        assert_eq!(logger.at(Level::Log), vec!["Loading 2 normal providers: A → B".to_string()]);
    }

    #[tokio::test]
    async fn failed_init_is_warned_and_still_started() {
        let trace = Trace::default();
        let logger = RecordingLogger::new();
        let entries = scripted(&trace, &[("A", Script::Fail), ("B", Script::Ok)]);

        assert!(load_providers(entries, Phase::Early, &logger).await);
        assert_eq!(*trace.lock(), vec!["A.init", "B.init", "A.start", "B.start"]);

        let warnings = logger.at(Level::Warn);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("A failed to initialize: no database"));
    }

    #[tokio::test]
    async fn failed_start_is_warned_and_fan_out_continues() {
        let trace = Trace::default();
        let logger = RecordingLogger::new();
        let entries = scripted(&trace, &[("A", Script::FailStart), ("B", Script::Ok)]);

        assert!(load_providers(entries, Phase::Normal, &logger).await);
        assert_eq!(*trace.lock(), vec!["A.init", "B.init", "A.start", "B.start"]);

        let warnings = logger.at(Level::Warn);
        assert_eq!(warnings, vec!["Provider A failed to start: port in use".to_string()]);
        assert!(logger.at(Level::Error).is_empty());
    }

    #[tokio::test]
    async fn panic_aborts_phase() {
        let trace = Trace::default();
        let logger = RecordingLogger::new();
        let entries = scripted(&trace, &[("A", Script::Ok), ("B", Script::Panic), ("C", Script::Ok)]);

        assert!(!load_providers(entries, Phase::Normal, &logger).await);
        assert_eq!(*trace.lock(), vec!["A.init", "B.init"]);

        let errors = logger.at(Level::Error);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("B exploded"));
    }

    #[tokio::test]
    async fn empty_phase_succeeds() {
        let logger = RecordingLogger::new();
        assert!(load_providers(Vec::new(), Phase::Early, &logger).await);
        assert_eq!(logger.at(Level::Log), vec!["Loading 0 early providers: (none)".to_string()]);
    }

    #[test]
    fn state_from_flags() {
        assert_eq!(CoreState::from_flags(false, false, false), CoreState::New);
        assert_eq!(CoreState::from_flags(true, false, false), CoreState::Booted);
        assert_eq!(CoreState::from_flags(false, true, false), CoreState::Started);
        assert_eq!(CoreState::from_flags(true, true, false), CoreState::Started);
        assert_eq!(CoreState::from_flags(true, true, true), CoreState::Destroyed);
        assert_eq!(CoreState::Destroyed.to_string(), "destroyed");
    }
}

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Initialise logging. Without `debug` the level is forced to `info`;
/// with it the default is `debug` and `RUST_LOG` may override it.
pub fn init(debug: bool) {
    // Outside debug mode `RUST_LOG` is ignored, so a stray variable in the
    // user's environment cannot turn on verbose output.
    let level = if debug { "debug" } else { "info" };

    let filter = if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    } else {
        EnvFilter::new(level)
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init();
}

/// Opt-in verbose logging for one binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Events processed and FSM transitions fired.
    Interaction,
    /// Lifecycle decisions of the binding.
    Binding,
    /// Command creation, execution and outcome.
    Command,
    /// Duration of each gesture cycle, measured on the scheduler clock.
    Usage,
}

impl LogLevel {
    pub fn enabled(levels: &[LogLevel], level: LogLevel) -> bool {
        levels.contains(&level)
    }
}

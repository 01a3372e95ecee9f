//! Logging configuration for the validation engine
//!
//! The engine only talks to the `log` facade. Whoever embeds it (the
//! deployment assembler, a test, a bench) installs `env_logger` through one
//! of the `init*` functions below.
//!
//! ```rust,ignore
//! validator::logging::init();                                // warn
//! validator::logging::init_with_level(log::LevelFilter::Debug);
//! ```
//!
//! # Log Levels
//!
//! - `error!` - A rule crashed and its findings for the pass were dropped
//! - `warn!` - Recoverable environment problems (unreadable archive)
//! - `info!` - One line per validation pass
//! - `debug!` - Rule and target progress
//! - `trace!` - Individual lookups and comparisons
//!
//! `RUST_LOG` always wins over the level passed in, so a single module can
//! be turned up with e.g. `RUST_LOG=validator::classloading=trace`.

use env_logger::Builder;
use log::LevelFilter;
use std::io::Write;
use std::sync::Once;

static INIT: Once = Once::new();

/// `[LEVEL] target - message`, at `level` unless `RUST_LOG` says otherwise
fn builder(level: LevelFilter) -> Builder {
    let mut builder = Builder::new();
    builder
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{:5}] {} - {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .parse_default_env();
    builder
}

/// Install the logger at Warn level. Later calls are no-ops.
pub fn init() {
    init_with_level(LevelFilter::Warn);
}

/// Install the logger at `level`. Later calls are no-ops.
pub fn init_with_level(level: LevelFilter) {
    INIT.call_once(|| {
        if builder(level).try_init().is_err() {
            log::debug!("a logger was already installed");
        }
    });
}

/// Install the logger with `RUST_LOG` alone deciding what is shown
pub fn init_from_env() {
    init_with_level(LevelFilter::Off);
}

/// Logger for tests: output is captured per test, and installing it from
/// every test is fine.
pub fn init_test() {
    let _ = builder(LevelFilter::Warn).is_test(true).try_init();
}

pub fn is_initialized() -> bool {
    INIT.is_completed()
}

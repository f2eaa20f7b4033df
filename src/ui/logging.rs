//! ui::logging
//!
//! Installs the tracing subscriber for the binary. Logs go to stderr so
//! that file content and JSON on stdout stay clean.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use super::output::Verbosity;

/// Default filter when `RUST_LOG` is unset.
fn default_directive(verbosity: Verbosity) -> &'static str {
    match verbosity {
        Verbosity::Debug => "branchfs=debug",
        Verbosity::Quiet => "error",
        Verbosity::Normal => "warn",
    }
}

/// Initialize logging. `RUST_LOG` wins over the verbosity flags.
///
/// Calling this twice is harmless; the second subscriber is rejected.
pub fn init(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .compact();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_flag_raises_crate_level() {
        assert_eq!(default_directive(Verbosity::Debug), "branchfs=debug");
        assert_eq!(default_directive(Verbosity::Normal), "warn");
    }

    #[test]
    fn init_twice_does_not_panic() {
        init(Verbosity::Normal);
        init(Verbosity::Debug);
        tracing::debug!("after init");
    }
}

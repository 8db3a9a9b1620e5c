//! Tracing subscriber setup shared by the binaries

use crate::config::LoggingConfig;
use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset: `warn` everywhere, the configured
/// level for each of `targets`
pub fn default_filter(config: &LoggingConfig, targets: &[&str]) -> Result<EnvFilter> {
    let mut filter = EnvFilter::new("warn");
    for target in targets {
        filter = filter.add_directive(format!("{}={}", target, config.level).parse()?);
    }
    Ok(filter)
}

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over [`default_filter`].
pub fn init(config: &LoggingConfig, targets: &[&str]) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => default_filter(config, targets)?,
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

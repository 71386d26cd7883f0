//! tracing subscriber setup for the command-line driver.
//!
//! `TROUPE_LOG` takes an `EnvFilter` directive and overrides the configured
//! level. When a log directory is configured, output goes to a daily rolling
//! file there instead of stderr.

use color_eyre::{eyre::eyre, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogConfig;

pub const LOG_ENV: &str = "TROUPE_LOG";

/// Install the global subscriber.
///
/// Keep the returned guard alive until exit, or buffered file output is lost.
pub fn init(config: &LogConfig) -> Result<Option<WorkerGuard>> {
  let filter = filter_for(config)?;

  match &config.dir {
    Some(dir) => {
      std::fs::create_dir_all(dir)
        .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;
      let appender = tracing_appender::rolling::daily(dir, "troupe.log");
      let (writer, guard) = tracing_appender::non_blocking(appender);
      tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .try_init()
        .map_err(|e| eyre!("Failed to install logger: {}", e))?;
      Ok(Some(guard))
    }
    None => {
      tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init()
        .map_err(|e| eyre!("Failed to install logger: {}", e))?;
      Ok(None)
    }
  }
}

fn filter_for(config: &LogConfig) -> Result<EnvFilter> {
  match std::env::var(LOG_ENV) {
    Ok(directive) if !directive.trim().is_empty() => EnvFilter::try_new(&directive)
      .map_err(|e| eyre!("Invalid {} directive {:?}: {}", LOG_ENV, directive, e)),
    _ => EnvFilter::try_new(&config.level)
      .map_err(|e| eyre!("Invalid log level {:?}: {}", config.level, e)),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  // Assumes TROUPE_LOG is not set in the test environment.
  #[test]
  fn test_configured_level_is_used() {
    let config = LogConfig {
      level: "troupe=debug,warn".to_string(),
      dir: None,
    };
    let filter = filter_for(&config).unwrap();
    assert!(filter.to_string().contains("troupe=debug"));
  }

  #[test]
  fn test_invalid_level_is_rejected() {
    let config = LogConfig {
      level: "troupe=loud".to_string(),
      dir: None,
    };
    assert!(filter_for(&config).is_err());
  }
}

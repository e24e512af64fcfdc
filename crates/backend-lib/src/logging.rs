// ============================
// backend-lib/src/logging.rs
// ============================
//! Tracing subscriber setup.
use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, Settings};

/// `RUST_LOG` wins over the configured level when present.
fn env_filter(settings: &Settings) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_level))
}

/// Install the global subscriber. Calling it twice is harmless.
pub fn init_tracing(settings: &Settings) {
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter(settings));
    let result = match settings.log_format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    if let Err(e) = result {
        tracing::debug!(error = %e, "tracing subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_is_harmless() {
        let settings = Settings {
            log_level: "debug".to_string(),
            ..Settings::default()
        };
        init_tracing(&settings);
        init_tracing(&settings);
        tracing::info!("still logging");
    }
}

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use duel_engine::RevealTiming;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,

    // Reveal pacing
    pub timing: RevealTiming,

    // Bundle source: precomputed files when set, simulation otherwise
    pub bundle_dir: Option<PathBuf>,
    pub seed: Option<u64>,

    // Session housekeeping
    pub session_ttl: Duration,
    pub sweep_interval: Duration,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        let millis = |name: &str, default: &str| -> Result<Duration> {
            let ms: u64 = env::var(name)
                .unwrap_or_else(|_| default.to_string())
                .parse()
                .with_context(|| format!("{} must be a number of milliseconds", name))?;
            Ok(Duration::from_millis(ms))
        };

        let timing = RevealTiming::new(
            millis("DUEL_SETTLE_MS", "600")?,
            millis("DUEL_REVEAL_MS", "400")?,
            millis("DUEL_ADVANCE_MS", "600")?,
            millis("DUEL_FAST_FORWARD_MS", "350")?,
        )
        .context("Invalid reveal timing")?;

        let config = Self {
            host: env::var("DUEL_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("DUEL_PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .context("DUEL_PORT must be a port number")?,
            timing,
            bundle_dir: env::var("DUEL_BUNDLE_DIR")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            seed: env::var("DUEL_SEED")
                .ok()
                .map(|v| v.parse())
                .transpose()
                .context("DUEL_SEED must be an unsigned integer")?,
            session_ttl: Duration::from_secs(
                env::var("DUEL_SESSION_TTL_SECS")
                    .unwrap_or_else(|_| "1800".to_string())
                    .parse()
                    .context("DUEL_SESSION_TTL_SECS must be a number of seconds")?,
            ),
            sweep_interval: Duration::from_secs(
                env::var("DUEL_SWEEP_SECS")
                    .unwrap_or_else(|_| "60".to_string())
                    .parse()
                    .context("DUEL_SWEEP_SECS must be a number of seconds")?,
            ),
        };

        if config.sweep_interval.is_zero() {
            anyhow::bail!("DUEL_SWEEP_SECS must be greater than zero");
        }

        Ok(config)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            timing: RevealTiming::default(),
            bundle_dir: None,
            seed: None,
            session_ttl: Duration::from_secs(1800),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

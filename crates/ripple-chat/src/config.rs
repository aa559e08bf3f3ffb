use std::time::Duration;

use tracing::warn;

/// Tunable intervals for the messaging core.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Idle time after the last keystroke before the stop-typing
    /// broadcast fires.
    pub typing_debounce: Duration,
    /// How long receivers keep a remote typing entry without a stop
    /// event before expiring it themselves.
    pub typing_grace: Duration,
    /// Silence past this means a peer is offline.
    pub presence_timeout: Duration,
    /// How often the local client announces itself.
    pub heartbeat_interval: Duration,
    /// Tick interval of the ephemeral expiry sweeper.
    pub sweep_interval: Duration,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            typing_debounce: Duration::from_millis(2000),
            typing_grace: Duration::from_millis(3000),
            presence_timeout: Duration::from_secs(30),
            heartbeat_interval: Duration::from_secs(10),
            sweep_interval: Duration::from_secs(30),
        }
    }
}

impl ChatConfig {
    /// Defaults overridden by `RIPPLE_*` environment variables, with a
    /// `.env` file loaded first if one is present.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        let mut config = Self::default();
        if let Some(ms) = env_u64("RIPPLE_TYPING_DEBOUNCE_MS") {
            config.typing_debounce = Duration::from_millis(ms);
        }
        if let Some(ms) = env_u64("RIPPLE_TYPING_GRACE_MS") {
            config.typing_grace = Duration::from_millis(ms);
        }
        if let Some(secs) = env_u64("RIPPLE_PRESENCE_TIMEOUT_SECS") {
            config.presence_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = env_u64("RIPPLE_HEARTBEAT_SECS") {
            config.heartbeat_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = env_u64("RIPPLE_SWEEP_INTERVAL_SECS") {
            config.sweep_interval = Duration::from_secs(secs);
        }
        config
    }
}

fn env_u64(key: &str) -> Option<u64> {
    let raw = std::env::var(key).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring {}={:?}: not a number", key, raw);
            None
        }
    }
}

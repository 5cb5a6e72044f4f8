use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_UPLOAD_DELAY_MS: u64 = 1500;
pub const DEFAULT_REPLY_DELAY_MS: u64 = 1500;
pub const DEFAULT_NOTICE_DELAY_MS: u64 = 1000;
pub const DEFAULT_NOTIFICATION_DURATION_MS: u64 = 3000;
pub const DEFAULT_PREVIEW_CHARS: usize = 60;

/// One layer of configuration; unset fields fall through to the layer below.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SettingsLayer {
    pub upload_delay_ms: Option<u64>,
    pub reply_delay_ms: Option<u64>,
    pub notice_delay_ms: Option<u64>,
    pub notification_duration_ms: Option<u64>,
    pub preview_chars: Option<usize>,
    pub seed: Option<u64>,
}

impl SettingsLayer {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let layer = serde_json::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("invalid config {}: {}", path.display(), e))?;
        Ok(layer)
    }

    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            upload_delay_ms: env_u64("ASSISTANT_UPLOAD_DELAY_MS")?,
            reply_delay_ms: env_u64("ASSISTANT_REPLY_DELAY_MS")?,
            notice_delay_ms: env_u64("ASSISTANT_NOTICE_DELAY_MS")?,
            notification_duration_ms: None,
            preview_chars: None,
            seed: env_u64("ASSISTANT_SEED")?,
        })
    }
}

fn env_u64(key: &str) -> anyhow::Result<Option<u64>> {
    match std::env::var(key) {
        Ok(v) => v
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{}={:?}: {}", key, v, e)),
        Err(_) => Ok(None),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EffectiveSettings {
    pub upload_delay_ms: u64,
    pub reply_delay_ms: u64,
    pub notice_delay_ms: u64,
    pub notification_duration_ms: u64,
    pub preview_chars: usize,
    pub seed: Option<u64>,
}

impl Default for EffectiveSettings {
    fn default() -> Self {
        resolve_effective_settings(
            &SettingsLayer::default(),
            &SettingsLayer::default(),
            &SettingsLayer::default(),
        )
    }
}

impl EffectiveSettings {
    pub fn upload_delay(&self) -> Duration {
        Duration::from_millis(self.upload_delay_ms)
    }

    pub fn reply_delay(&self) -> Duration {
        Duration::from_millis(self.reply_delay_ms)
    }

    pub fn notice_delay(&self) -> Duration {
        Duration::from_millis(self.notice_delay_ms)
    }

    pub fn notification_duration(&self) -> Duration {
        Duration::from_millis(self.notification_duration_ms)
    }
}

/// Precedence: command line over environment over config file over built-in defaults.
pub fn resolve_effective_settings(
    file: &SettingsLayer,
    env: &SettingsLayer,
    cli: &SettingsLayer,
) -> EffectiveSettings {
    EffectiveSettings {
        upload_delay_ms: cli
            .upload_delay_ms
            .or(env.upload_delay_ms)
            .or(file.upload_delay_ms)
            .unwrap_or(DEFAULT_UPLOAD_DELAY_MS),
        reply_delay_ms: cli
            .reply_delay_ms
            .or(env.reply_delay_ms)
            .or(file.reply_delay_ms)
            .unwrap_or(DEFAULT_REPLY_DELAY_MS),
        notice_delay_ms: cli
            .notice_delay_ms
            .or(env.notice_delay_ms)
            .or(file.notice_delay_ms)
            .unwrap_or(DEFAULT_NOTICE_DELAY_MS),
        notification_duration_ms: cli
            .notification_duration_ms
            .or(env.notification_duration_ms)
            .or(file.notification_duration_ms)
            .unwrap_or(DEFAULT_NOTIFICATION_DURATION_MS),
        preview_chars: cli
            .preview_chars
            .or(env.preview_chars)
            .or(file.preview_chars)
            .unwrap_or(DEFAULT_PREVIEW_CHARS),
        seed: cli.seed.or(env.seed).or(file.seed),
    }
}

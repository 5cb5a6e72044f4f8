use std::time::Duration;

use async_trait::async_trait;

use crate::settings::EffectiveSettings;

/// The points where the simulated assistant suspends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delay {
    Upload,
    Reply,
    /// Reply that only tells the user to upload documents first.
    Notice,
}

/// Stand-in for the network round trip a real backend would make.
#[async_trait]
pub trait Latency: Send + Sync {
    async fn pause(&self, delay: Delay);
}

#[derive(Debug, Clone)]
pub struct SimulatedLatency {
    pub upload: Duration,
    pub reply: Duration,
    pub notice: Duration,
}

impl SimulatedLatency {
    pub fn from_settings(settings: &EffectiveSettings) -> Self {
        Self {
            upload: settings.upload_delay(),
            reply: settings.reply_delay(),
            notice: settings.notice_delay(),
        }
    }

    #[cfg(test)]
    pub fn none() -> Self {
        Self {
            upload: Duration::ZERO,
            reply: Duration::ZERO,
            notice: Duration::ZERO,
        }
    }

    pub fn duration(&self, delay: Delay) -> Duration {
        match delay {
            Delay::Upload => self.upload,
            Delay::Reply => self.reply,
            Delay::Notice => self.notice,
        }
    }
}

#[async_trait]
impl Latency for SimulatedLatency {
    async fn pause(&self, delay: Delay) {
        let d = self.duration(delay);
        if !d.is_zero() {
            tokio::time::sleep(d).await;
        }
    }
}

//! Stream configuration: endpoint, resolution, frame pacing, view count and
//! capture mode. Every field has a default matching the original deployment
//! (a render endpoint on localhost:4322), and the whole thing can be loaded
//! from a JSON file.

use std::path::Path;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

use crate::frame::CaptureMode;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub host: String,
    pub port: u16,
    pub path: String,
    pub resolution: [u32; 2],
    pub fps: u32,
    /// Views rendered and sent per cycle: 1 (mono) or 2 (stereo pair).
    pub views: u8,
    pub capture: CaptureMode,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 4322,
            path: "/render".to_string(),
            resolution: [640, 480],
            fps: 60,
            views: 2,
            capture: CaptureMode::Raw,
        }
    }
}

impl StreamConfig {
    pub fn load_from_json(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("invalid stream config in {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.resolution[0] > 0 && self.resolution[1] > 0,
            "resolution must be non-zero, got {}x{}",
            self.resolution[0],
            self.resolution[1]
        );
        ensure!(self.fps > 0, "fps must be at least 1");
        ensure!(
            (1..=2).contains(&self.views),
            "views must be 1 or 2, got {}",
            self.views
        );
        Ok(())
    }

    pub fn endpoint_url(&self) -> String {
        format!("ws://{}:{}{}", self.host, self.port, self.path)
    }
}

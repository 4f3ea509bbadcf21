use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

pub const DEFAULT_WINDOW_NAME: &str = "Window";
pub const DEFAULT_KEY_DELAY: Duration = Duration::from_millis(1);

/// Initial size of the window and its offset from the primary monitor's origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowGeometry {
    pub width: u32,
    pub height: u32,
    pub offset_x: i32,
    pub offset_y: i32,
    /// Origin of the primary monitor on the virtual desktop. Set this when the
    /// primary monitor isn't the top-left one.
    pub monitor_x: i32,
    pub monitor_y: i32,
}

impl Default for WindowGeometry {
    fn default() -> Self {
        Self {
            width: 960,
            height: 720,
            offset_x: 1200,
            offset_y: 300,
            monitor_x: 0,
            monitor_y: 0,
        }
    }
}

impl WindowGeometry {
    /// Desktop coordinates of the window's top-left corner.
    pub fn position(&self) -> (i32, i32) {
        (
            self.monitor_x.saturating_add(self.offset_x),
            self.monitor_y.saturating_add(self.offset_y),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualizerConfig {
    pub window_name: String,
    /// Draw per-label object counts in the corner of each frame.
    pub show_count: bool,
    /// Caption shapes with their top label only.
    pub is_one_label: bool,
    /// Disable the window entirely; `show`, `is_quit` and `video_delay` become no-ops.
    pub no_show: bool,
    /// How long `is_quit` polls for a key, in milliseconds. Unset means 1 ms, 0 waits for a key.
    pub delay_ms: Option<u64>,
    /// Every shown frame is also written here, overwriting the previous one.
    pub output: Option<PathBuf>,
    /// Font for captions and counts; outlines only when unset.
    pub font: Option<PathBuf>,
    pub geometry: WindowGeometry,
}

impl Default for VisualizerConfig {
    fn default() -> Self {
        Self {
            window_name: DEFAULT_WINDOW_NAME.to_string(),
            show_count: false,
            is_one_label: false,
            no_show: false,
            delay_ms: None,
            output: None,
            font: None,
            geometry: WindowGeometry::default(),
        }
    }
}

impl VisualizerConfig {
    /// Reads a JSON config file; absent fields keep their defaults.
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open config file {path:?}"))?;
        serde_json::from_reader(std::io::BufReader::new(file))
            .with_context(|| format!("Failed to parse config file {path:?}"))
    }

    pub fn key_delay(&self) -> Duration {
        self.delay_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_KEY_DELAY)
    }
}

//! Render statistics.
//!
//! Collects what the backend reports per frame. The visible numbers refresh at most 30
//! times per second and are summarised in the log once per second.

use crate::render::FrameInfo;

const REFRESH_INTERVAL: f32 = 1.0 / 30.0;
const LOG_INTERVAL: f32 = 1.0;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatsSnapshot {
    pub fps: f32,
    pub frame: FrameInfo,
}

#[derive(Debug, Default)]
pub struct RenderStats {
    enabled: bool,
    since_refresh: f32,
    frames_since_refresh: u32,
    since_log: f32,
    snapshot: StatsSnapshot,
}

impl RenderStats {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            ..Self::default()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn record(&mut self, frame: FrameInfo, dt: f32) {
        if !self.enabled {
            return;
        }
        self.since_refresh += dt;
        self.since_log += dt;
        self.frames_since_refresh += 1;
        if self.since_refresh >= REFRESH_INTERVAL {
            self.snapshot = StatsSnapshot {
                fps: self.frames_since_refresh as f32 / self.since_refresh,
                frame,
            };
            self.since_refresh = 0.0;
            self.frames_since_refresh = 0;
        }
        if self.since_log >= LOG_INTERVAL {
            let StatsSnapshot { fps, frame } = self.snapshot;
            log::debug!(
                "{fps:.0} fps, {} draw calls, {} triangles, {} lines",
                frame.draw_calls,
                frame.triangles,
                frame.lines
            );
            self.since_log = 0.0;
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        self.snapshot
    }
}

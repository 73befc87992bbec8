use std::time::{Duration, Instant};

/// Time covered by one frame. `wall_ms` is what really elapsed; `sim_ms` is
/// the same delta capped so a stalled terminal does not jump the simulation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameDelta {
    pub wall_ms: f64,
    pub sim_ms: f64,
}

impl FrameDelta {
    pub fn between(last: Instant, now: Instant, max_ms: f64) -> Self {
        let wall_ms = now.saturating_duration_since(last).as_secs_f64() * 1000.0;
        Self {
            wall_ms,
            sim_ms: wall_ms.min(max_ms),
        }
    }

    /// A frame where simulation and wall time agree.
    #[cfg(test)]
    pub fn uniform(ms: f64) -> Self {
        Self {
            wall_ms: ms,
            sim_ms: ms,
        }
    }

    pub fn is_clamped(&self) -> bool {
        self.sim_ms < self.wall_ms
    }
}

pub fn frame_budget(target_fps: u32) -> Duration {
    Duration::from_secs_f64(1.0 / target_fps.max(1) as f64)
}

/// How long to wait for input before the next frame is due.
pub fn poll_timeout(last_frame: Instant, budget: Duration, now: Instant) -> Duration {
    (last_frame + budget).saturating_duration_since(now)
}

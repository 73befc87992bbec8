use std::collections::VecDeque;

const WINDOW: usize = 60;

/// Frame rate over a sliding window of the last 60 frame timestamps.
#[derive(Debug, Default)]
pub struct FpsCounter {
    frames: VecDeque<f64>,
}

impl FpsCounter {
    pub fn new() -> Self {
        Self {
            frames: VecDeque::with_capacity(WINDOW + 1),
        }
    }

    pub fn record(&mut self, now_ms: f64) {
        self.frames.push_back(now_ms);
        if self.frames.len() > WINDOW {
            self.frames.pop_front();
        }
    }

    /// Frames in the window divided by the seconds the window spans.
    /// `None` until the window spans a non-zero duration.
    pub fn fps(&self) -> Option<f64> {
        let oldest = *self.frames.front()?;
        let newest = *self.frames.back()?;
        let elapsed = (newest - oldest) / 1000.0;
        (elapsed > 0.0).then(|| self.frames.len() as f64 / elapsed)
    }
}

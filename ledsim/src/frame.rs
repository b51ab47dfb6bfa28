use std::time::Duration;

use log::{debug, warn};
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

/// Frames allowed to pile up as lateness before it is reported loudly.
const LATE_FRAME_BUDGET: u128 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameData {
    pub frame: u64,
    pub interval_ms: u64,
}

struct FrameStats {
    pub frame_start_time: Instant,
    pub target_frame_time: u128,
}

/// Paces the tick driver. A late frame pushes the schedule back instead of
/// bursting to catch up.
pub struct FrameTimeKeeper {
    clock_frame: Interval,
    interval_ms: u64,
    frame_data: FrameData,
    frame_stats: FrameStats,
    late_time: u128,
}

impl FrameTimeKeeper {
    pub fn new(interval_ms: u64) -> Self {
        let interval_ms = interval_ms.max(1);
        let mut clock_frame = time::interval(Duration::from_millis(interval_ms));
        clock_frame.set_missed_tick_behavior(MissedTickBehavior::Delay);

        FrameTimeKeeper {
            clock_frame,
            interval_ms,
            frame_data: FrameData::new(0, interval_ms),
            frame_stats: FrameStats::new(u128::from(interval_ms)),
            late_time: 0,
        }
    }

    /// Waits for the next frame slot. The first call returns immediately.
    pub async fn tick(&mut self) -> FrameData {
        self.clock_frame.tick().await;

        let target_frame_time = self.frame_stats.target_frame_time;
        let elapsed_time = Instant::now()
            .duration_since(self.frame_stats.frame_start_time)
            .as_millis();

        if self.frame_data.frame > 0 {
            if elapsed_time > target_frame_time {
                self.late_time += elapsed_time - target_frame_time;
                debug!(
                    "Frame late by {}ms (Took {}ms)",
                    elapsed_time - target_frame_time,
                    elapsed_time
                );
            } else if self.late_time > 0 {
                self.late_time = self
                    .late_time
                    .saturating_sub(target_frame_time - elapsed_time);
            }

            if self.late_time >= target_frame_time * LATE_FRAME_BUDGET {
                warn!("Running late by {}ms", self.late_time);
            }
        }

        self.frame_stats = FrameStats::new(target_frame_time);
        let current = self.frame_data;
        self.frame_data = FrameData::new(current.frame + 1, self.interval_ms);

        current
    }

    /// Frames handed out so far.
    pub fn frames(&self) -> u64 {
        self.frame_data.frame
    }

    pub fn late_time_ms(&self) -> u128 {
        self.late_time
    }
}

impl FrameData {
    pub fn new(frame: u64, interval_ms: u64) -> Self {
        FrameData { frame, interval_ms }
    }
}

impl FrameStats {
    pub fn new(target_frame_time: u128) -> Self {
        FrameStats {
            frame_start_time: Instant::now(),
            target_frame_time,
        }
    }
}

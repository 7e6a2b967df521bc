//! Fixed-rate frame clock for the privileged context.
//!
//! The world does its work once per frame: drain the handoff queue, then
//! run due label retries. [`FrameScheduler`] paces that loop and sits in a
//! `tokio::select!` next to shutdown and event handling:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         frame = frames.wait_for_frame() => { world.tick(frame.now); }
//!         _ = &mut shutdown => break,
//!     }
//! }
//! ```
//!
//! A frame that wakes up late skips the missed frames and schedules the
//! next one from now, so a stall never turns into a burst.

use std::time::{Duration, Instant};

use tokio::time::{self, Instant as TokioInstant};
use tracing::{debug, trace, warn};

/// Frame clock configuration.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Frames per second. Default: 60.
    pub rate_hz: u32,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self { rate_hz: 60 }
    }
}

impl FrameConfig {
    pub const MAX_RATE_HZ: u32 = 240;

    pub fn with_rate(rate_hz: u32) -> Self {
        Self { rate_hz }
    }

    /// Clamps the rate into `1..=MAX_RATE_HZ`.
    pub fn validated(mut self) -> Self {
        if self.rate_hz == 0 {
            warn!("rate_hz is 0, using 1");
            self.rate_hz = 1;
        } else if self.rate_hz > Self::MAX_RATE_HZ {
            warn!(
                rate = self.rate_hz,
                max = Self::MAX_RATE_HZ,
                "rate_hz exceeds maximum, clamping"
            );
            self.rate_hz = Self::MAX_RATE_HZ;
        }
        self
    }

    pub fn frame_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.rate_hz.max(1)))
    }
}

/// Information about a frame, returned by [`FrameScheduler::wait_for_frame`].
#[derive(Debug, Clone)]
pub struct FrameInfo {
    /// Frame number, starting at 1.
    pub frame: u64,
    /// Fixed frame duration.
    pub dt: Duration,
    /// When the frame fired. Follows Tokio's clock, so paused-time tests
    /// see virtual time here.
    pub now: Instant,
    /// `true` if the frame fired noticeably late.
    pub overrun: bool,
    pub frames_skipped: u64,
}

/// Fixed-rate frame scheduler.
#[derive(Debug)]
pub struct FrameScheduler {
    config: FrameConfig,
    frame_duration: Duration,
    frame_count: u64,
    next_frame: TokioInstant,
    total_skipped: u64,
}

impl FrameScheduler {
    pub fn new(config: FrameConfig) -> Self {
        let config = config.validated();
        let frame_duration = config.frame_duration();
        debug!(
            rate_hz = config.rate_hz,
            frame_ms = frame_duration.as_secs_f64() * 1000.0,
            "frame scheduler created"
        );
        Self {
            config,
            frame_duration,
            frame_count: 0,
            next_frame: TokioInstant::now() + frame_duration,
            total_skipped: 0,
        }
    }

    pub fn with_rate(rate_hz: u32) -> Self {
        Self::new(FrameConfig::with_rate(rate_hz))
    }

    /// Waits until the next frame is due.
    pub async fn wait_for_frame(&mut self) -> FrameInfo {
        let next = self.next_frame;
        time::sleep_until(next).await;

        let now = TokioInstant::now();
        self.frame_count += 1;

        let late_by = now.saturating_duration_since(next);
        let overrun = late_by > self.frame_duration / 10;
        let mut frames_skipped = 0;
        if overrun {
            frames_skipped =
                (late_by.as_nanos() / self.frame_duration.as_nanos()) as u64;
            if frames_skipped > 0 {
                warn!(
                    frame = self.frame_count,
                    skipped = frames_skipped,
                    late_ms = late_by.as_secs_f64() * 1000.0,
                    "frame overrun, skipping ahead"
                );
            }
        }
        self.total_skipped += frames_skipped;
        self.next_frame = now + self.frame_duration;

        trace!(frame = self.frame_count, overrun, "frame fired");

        FrameInfo {
            frame: self.frame_count,
            dt: self.frame_duration,
            now: now.into_std(),
            overrun,
            frames_skipped,
        }
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn frame_duration(&self) -> Duration {
        self.frame_duration
    }

    pub fn rate_hz(&self) -> u32 {
        self.config.rate_hz
    }

    /// Frames skipped over the scheduler's lifetime.
    pub fn total_skipped(&self) -> u64 {
        self.total_skipped
    }
}

//! Frame pacing for the present hook.
//!
//! Telemetry sampling and text regeneration are throttled to once per
//! [`UPDATE_INTERVAL`]; everything else the hook does per frame is counter
//! bookkeeping. The fps value is only recomputed at interval boundaries and
//! is read-only in between.

use std::time::{Duration, Instant};

pub const UPDATE_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug)]
pub struct PresentStats {
    last_update: Instant,
    frames_since_update: u32,
    last_fps: f32,
}

impl PresentStats {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    fn starting_at(now: Instant) -> Self {
        Self {
            last_update: now,
            frames_since_update: 0,
            last_fps: 0.0,
        }
    }

    /// Account one present at `now`. Returns true when the update interval
    /// elapsed, in which case `fps()` has been recomputed from the frames
    /// counted since the previous boundary and the caller should refresh
    /// telemetry and regenerate the overlay text.
    pub fn tick(&mut self, now: Instant) -> bool {
        let elapsed = now.duration_since(self.last_update);
        let refresh = elapsed >= UPDATE_INTERVAL;
        if refresh {
            self.last_fps = self.frames_since_update as f32 / elapsed.as_secs_f32();
            self.frames_since_update = 0;
            self.last_update = now;
        }
        self.frames_since_update += 1;
        refresh
    }

    pub fn fps(&self) -> f32 {
        self.last_fps
    }

    #[cfg(test)]
    fn frames_since_update(&self) -> u32 {
        self.frames_since_update
    }
}

impl Default for PresentStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> Instant {
        Instant::now()
    }

    #[test]
    fn one_frame_per_interval_gives_inverse_interval_fps() {
        let start = t0();
        let mut stats = PresentStats::starting_at(start);
        let interval = Duration::from_millis(500);

        // First boundary counts zero frames; fps settles from the second on.
        assert!(stats.tick(start + interval));
        for n in 2..=5u32 {
            let refreshed = stats.tick(start + interval * n);
            assert!(refreshed);
            assert!((stats.fps() - 1.0 / interval.as_secs_f32()).abs() < 1e-3);
        }
    }

    #[test]
    fn burst_under_interval_counts_frames_without_touching_fps() {
        let start = t0();
        let mut stats = PresentStats::starting_at(start);
        assert!(stats.tick(start + Duration::from_millis(600)));
        let fps_before = stats.fps();

        let base = start + Duration::from_millis(600);
        for i in 1..=10u32 {
            assert!(!stats.tick(base + Duration::from_millis(i as u64 * 10)));
            assert_eq!(stats.frames_since_update(), i + 1);
            assert_eq!(stats.fps(), fps_before);
        }
    }

    #[test]
    fn counter_resets_at_each_boundary() {
        let start = t0();
        let mut stats = PresentStats::starting_at(start);
        for i in 1..=30u32 {
            stats.tick(start + Duration::from_millis(i as u64 * 16));
        }
        assert!(stats.tick(start + Duration::from_millis(600)));
        assert_eq!(stats.frames_since_update(), 1);
    }

    #[test]
    fn sixty_frames_in_one_second_reads_sixty_fps() {
        let start = t0();
        let mut stats = PresentStats::starting_at(start);
        let frame = Duration::from_nanos(16_666_667);
        let mut refreshes = 0;
        for i in 1..=60u32 {
            if stats.tick(start + frame * i) {
                refreshes += 1;
            }
        }
        assert!(refreshes >= 1);
        assert!((stats.fps() - 60.0).abs() < 2.0);
    }
}

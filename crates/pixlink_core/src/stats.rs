//! # Engine Statistics
//!
//! Frame timing plus a flat snapshot of every counter the render side keeps.
//! Snapshots are plain `Copy` data so they can be published across units.

use std::time::{Duration, Instant};

/// Everything the render side counts, captured once per frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Live sprites.
    pub active_sprites: usize,
    /// Sprites destroyed by any path.
    pub destroyed_total: u64,
    /// Sprites removed by cleanup sweeps.
    pub cleaned_up_total: u64,
    /// Live texture slots.
    pub textures_live: usize,
    /// Live animation slots.
    pub animations_live: usize,
    /// Texture pool bytes in use.
    pub texture_pool_used: usize,
    /// Texture pool bytes left.
    pub texture_pool_free: usize,
    /// Animation pool bytes in use.
    pub animation_pool_used: usize,
    /// Animation pool bytes left.
    pub animation_pool_free: usize,
    /// Successful pool allocations.
    pub allocations: u64,
    /// Refused pool allocations.
    pub allocation_failures: u64,
    /// Particle systems in use.
    pub particle_systems: usize,
    /// Live particles across every system.
    pub particles_live: usize,
    /// Collision events rejected by the full buffer.
    pub collision_events_dropped: u64,
    /// Commands applied.
    pub commands_executed: u64,
    /// Commands that failed (full table, unknown sprite).
    pub commands_failed: u64,
    /// Frames rendered.
    pub frame_count: u64,
    /// Frames per second, from the interval between updates.
    pub fps: u32,
    /// Rolling average of update + render time.
    pub avg_frame_us: u64,
    /// Worst update + render time.
    pub max_frame_us: u64,
    /// Frames whose work exceeded the frame budget.
    pub late_frames: u64,
}

/// Measures frame work and frame spacing.
#[derive(Clone, Copy, Debug)]
pub struct FrameTimer {
    budget: Duration,
    last_frame_ms: Option<u32>,
    avg_interval_us: u64,
    avg_frame_us: u64,
    max_frame_us: u64,
    late_frames: u64,
}

impl FrameTimer {
    /// Timer for the given target rate.
    #[must_use]
    pub fn new(frame_rate: u32) -> Self {
        let rate = frame_rate.max(1);
        Self {
            budget: Duration::from_micros(1_000_000 / u64::from(rate)),
            last_frame_ms: None,
            avg_interval_us: 1_000_000 / u64::from(rate),
            avg_frame_us: 0,
            max_frame_us: 0,
            late_frames: 0,
        }
    }

    /// Marks the start of a frame's work.
    #[inline]
    #[must_use]
    pub fn begin(&self) -> Instant {
        Instant::now()
    }

    /// Records a finished frame that began at `start` and was stamped `now_ms`.
    pub fn end(&mut self, start: Instant, now_ms: u32) {
        let duration = start.elapsed();
        let duration_us = duration.as_micros() as u64;

        self.max_frame_us = self.max_frame_us.max(duration_us);
        self.avg_frame_us = (self.avg_frame_us * 15 + duration_us) / 16;
        if duration > self.budget {
            self.late_frames += 1;
        }

        if let Some(last) = self.last_frame_ms {
            let interval_us = u64::from(now_ms.wrapping_sub(last)) * 1000;
            self.avg_interval_us = (self.avg_interval_us * 15 + interval_us) / 16;
        }
        self.last_frame_ms = Some(now_ms);
    }

    /// Frames per second implied by the average interval.
    #[must_use]
    pub fn fps(&self) -> u32 {
        if self.avg_interval_us == 0 {
            0
        } else {
            u32::try_from(1_000_000 / self.avg_interval_us).unwrap_or(u32::MAX)
        }
    }

    /// Rolling average frame work.
    #[inline]
    #[must_use]
    pub const fn avg_frame_us(&self) -> u64 {
        self.avg_frame_us
    }

    /// Worst frame work.
    #[inline]
    #[must_use]
    pub const fn max_frame_us(&self) -> u64 {
        self.max_frame_us
    }

    /// Frames over budget.
    #[inline]
    #[must_use]
    pub const fn late_frames(&self) -> u64 {
        self.late_frames
    }
}

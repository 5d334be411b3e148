//! # Render Unit
//!
//! Sole owner of the [`GraphicsEngine`]. Waits for a "go" pulse, then runs
//! one frame:
//!
//! ```text
//! drain commands -> update -> report events -> render -> publish stats
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use pixlink_core::{
    CleanupMode, CommandChannel, CommandRecord, EngineStats, GraphicsEngine, PipelineConfig,
    Rasterizer, SnapshotCell,
};

use super::frame::Clock;
use super::report::{ReportRecord, ReportSender};

/// How long to wait for a pulse before re-checking the running flag.
const GO_TIMEOUT: Duration = Duration::from_millis(100);

/// The display-facing unit.
pub struct RenderUnit {
    engine: GraphicsEngine,
    channel: Arc<CommandChannel<CommandRecord>>,
    reports: ReportSender,
    go: Receiver<()>,
    snapshot: Arc<SnapshotCell<EngineStats>>,
    raster: Box<dyn Rasterizer + Send>,
    clock: Clock,
    seen_dropped: u64,
}

impl RenderUnit {
    /// Builds the engine from `config` and wires the unit's channels.
    #[must_use]
    pub fn new(
        config: &PipelineConfig,
        channel: Arc<CommandChannel<CommandRecord>>,
        reports: ReportSender,
        go: Receiver<()>,
        snapshot: Arc<SnapshotCell<EngineStats>>,
        raster: Box<dyn Rasterizer + Send>,
        clock: Clock,
    ) -> Self {
        Self {
            engine: GraphicsEngine::new(config),
            channel,
            reports,
            go,
            snapshot,
            raster,
            clock,
            seen_dropped: 0,
        }
    }

    /// The engine, for loading assets before the loop starts.
    pub fn engine_mut(&mut self) -> &mut GraphicsEngine {
        &mut self.engine
    }

    /// The engine.
    #[must_use]
    pub const fn engine(&self) -> &GraphicsEngine {
        &self.engine
    }

    /// Runs one frame at `now`. Returns the number of commands applied.
    pub fn step(&mut self, now: u32) -> usize {
        let engine = &mut self.engine;
        let reports = &self.reports;
        let applied = self.channel.drain(|command| {
            if engine.execute(&command, now).is_err() {
                reports.send(ReportRecord::CommandFailed {
                    opcode: command.opcode,
                    sprite_id: command.sprite_id,
                    timestamp: now,
                });
            }
        });

        let dropped = self.channel.stats().dropped;
        if dropped > self.seen_dropped {
            self.reports.send(ReportRecord::CommandsDropped {
                count: dropped - self.seen_dropped,
                timestamp: now,
            });
            self.seen_dropped = dropped;
        }

        self.engine.update(now);

        for event in self.engine.collisions().events() {
            let (x, y) = self.engine.sprites().get(event.a).map_or((0, 0), |s| (s.x, s.y));
            self.reports.send(ReportRecord::Collision { event: *event, x, y });
        }
        for removal in self.engine.drain_removals() {
            if matches!(removal.reason, CleanupMode::OffScreen | CleanupMode::FarOffScreen) {
                self.reports.send(ReportRecord::OutOfBounds { removal, timestamp: now });
            }
        }

        self.engine.render(self.raster.as_mut());
        self.reports.send(ReportRecord::RenderComplete {
            sprites: self.engine.sprites().active_count(),
            timestamp: now,
        });
        self.snapshot.publish(self.engine.stats());

        applied
    }

    /// Runs frames on each pulse until `running` is cleared or the ingress
    /// unit goes away. Returns the final stats.
    pub fn run(&mut self, running: &AtomicBool) -> EngineStats {
        tracing::info!("Render unit started");

        while running.load(Ordering::Acquire) {
            match self.go.recv_timeout(GO_TIMEOUT) {
                Ok(()) => {
                    let now = self.clock.now_ms();
                    self.step(now);
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    tracing::info!("Frame signal closed, render unit exiting");
                    break;
                }
            }
        }

        let stats = self.engine.stats();
        self.snapshot.publish(stats);
        tracing::info!(
            "Render unit stopped: {} frames, {} commands, {} sprites live, {} reports dropped",
            stats.frame_count,
            stats.commands_executed,
            stats.active_sprites,
            self.reports.dropped(),
        );
        stats
    }
}

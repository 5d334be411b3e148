//! # Pipeline
//!
//! Wires the two units onto two OS threads:
//!
//! ```text
//!             CommandChannel (spin lock)
//! Ingress ------------------------------> Render
//!    |  <------- reports (bounded) ---------  |
//!    |  -------- go (bounded(1)) ---------->  |
//!    |  <------- SnapshotCell<EngineStats> -  |
//! ```
//!
//! Both threads poll a shared running flag. [`Pipeline::stop`] clears it,
//! joins both threads and returns their final counters.

mod frame;
mod ingress;
mod render;
mod report;

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use pixlink_core::{
    ChannelStats, CommandChannel, CommandRecord, EngineStats, PipelineConfig, Rasterizer,
    SnapshotCell,
};

use crate::error::PipelineError;
use crate::transport::UdpTransport;

pub use frame::{go_channel, Clock, FramePacer, GoSender, Pulse};
pub use ingress::{IngressStats, IngressUnit};
pub use render::RenderUnit;
pub use report::{
    report_channel, ReportRecord, ReportSender, ERROR_COMMAND_FAILED, ERROR_QUEUE_OVERFLOW,
};

/// Final counters of a stopped pipeline.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PipelineReport {
    /// Ingress unit counters.
    pub ingress: IngressStats,
    /// Render unit counters.
    pub engine: EngineStats,
    /// Command channel counters.
    pub channel: ChannelStats,
    /// Reports lost to a full report channel.
    pub reports_dropped: u64,
}

/// Handle to a running pipeline.
pub struct Pipeline {
    running: Arc<AtomicBool>,
    ingress: Option<JoinHandle<IngressStats>>,
    render: Option<JoinHandle<EngineStats>>,
    channel: Arc<CommandChannel<CommandRecord>>,
    snapshot: Arc<SnapshotCell<EngineStats>>,
    reports: ReportSender,
    local_addr: Option<SocketAddr>,
}

impl Pipeline {
    /// Validates `config`, binds the socket and starts both units.
    ///
    /// A bind failure does not fail the call; the ingress unit runs without
    /// a network.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Config`] for an invalid configuration and
    /// [`PipelineError::Spawn`] if a thread cannot be started.
    pub fn spawn(
        config: &PipelineConfig,
        raster: Box<dyn Rasterizer + Send>,
    ) -> Result<Self, PipelineError> {
        config.validate()?;

        let running = Arc::new(AtomicBool::new(true));
        let channel = Arc::new(CommandChannel::new(config.channel.command_capacity));
        let snapshot = Arc::new(SnapshotCell::new(EngineStats::default()));
        let (reports, report_rx) = report_channel(config.channel.report_capacity);
        let (go_tx, go_rx) = go_channel();
        let clock = Clock::start();

        let transport = IngressUnit::bind_transport(&config.network);
        let local_addr = transport.as_ref().map(UdpTransport::local_addr);

        let mut render_unit = RenderUnit::new(
            config,
            Arc::clone(&channel),
            reports.clone(),
            go_rx,
            Arc::clone(&snapshot),
            raster,
            clock,
        );
        let mut ingress_unit = IngressUnit::new(
            config,
            transport,
            Arc::clone(&channel),
            report_rx,
            go_tx,
            Arc::clone(&snapshot),
            clock,
        );

        let flag = Arc::clone(&running);
        let render = thread::Builder::new()
            .name("pixlink-render".into())
            .spawn(move || render_unit.run(&flag))
            .map_err(|source| PipelineError::Spawn { unit: "render", source })?;

        let flag = Arc::clone(&running);
        let ingress = match thread::Builder::new()
            .name("pixlink-ingress".into())
            .spawn(move || ingress_unit.run(&flag))
        {
            Ok(handle) => handle,
            Err(source) => {
                running.store(false, Ordering::Release);
                if render.join().is_err() {
                    tracing::warn!("Render thread panicked during aborted start");
                }
                return Err(PipelineError::Spawn { unit: "ingress", source });
            }
        };

        tracing::info!("Pipeline running");
        Ok(Self {
            running,
            ingress: Some(ingress),
            render: Some(render),
            channel,
            snapshot,
            reports,
            local_addr,
        })
    }

    /// Address the ingress socket is bound to, or `None` without a network.
    #[must_use]
    pub const fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Latest stats published by the render unit.
    #[must_use]
    pub fn stats(&self) -> Arc<EngineStats> {
        self.snapshot.latest()
    }

    /// Command channel counters.
    #[must_use]
    pub fn channel_stats(&self) -> ChannelStats {
        self.channel.stats()
    }

    /// True until [`Pipeline::stop`] is called.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Stops both units and collects their counters.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Panicked`] if a unit thread panicked.
    pub fn stop(mut self) -> Result<PipelineReport, PipelineError> {
        self.running.store(false, Ordering::Release);

        let ingress = match self.ingress.take() {
            Some(handle) => handle.join().map_err(|_| PipelineError::Panicked("ingress"))?,
            None => IngressStats::default(),
        };
        let engine = match self.render.take() {
            Some(handle) => handle.join().map_err(|_| PipelineError::Panicked("render"))?,
            None => EngineStats::default(),
        };

        let report = PipelineReport {
            ingress,
            engine,
            channel: self.channel.stats(),
            reports_dropped: self.reports.dropped(),
        };
        tracing::info!("Pipeline stopped after {} frames", report.engine.frame_count);
        Ok(report)
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

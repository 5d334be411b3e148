//! # Ingress Unit
//!
//! Owns the socket. Each iteration it:
//! 1. Reads waiting datagrams, translates them and pushes commands
//! 2. Forwards render reports to the peer
//! 3. Sends a heartbeat when one is due
//! 4. Pulses the render unit when a frame is due
//!
//! Without a socket (bind failed) it keeps pacing frames and discards
//! reports, so the render side runs unchanged.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;
use pixlink_core::{CommandChannel, CommandRecord, EngineStats, NetworkConfig, PipelineConfig, SnapshotCell};

use super::frame::{Clock, FramePacer, GoSender, Pulse};
use super::report::ReportRecord;
use crate::error::PacketError;
use crate::protocol::{translate, InboundPacket, OutboundPacket, PacketWriter, ResponseKind};
use crate::transport::{PeerTracker, UdpTransport, RECV_BUFFER_SIZE};
use crate::MAX_PACKET_SIZE;

/// Longest sleep between socket polls.
const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Datagrams read per iteration before the loop moves on.
const MAX_DATAGRAMS_PER_POLL: usize = 64;

/// How often engine stats are logged.
const STATS_LOG_INTERVAL_MS: u32 = 5_000;

/// Ingress counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IngressStats {
    /// Datagrams handed to [`IngressUnit::handle_datagram`].
    pub packets_received: u64,
    /// Datagrams shorter than one packet.
    pub packets_truncated: u64,
    /// Datagrams longer than `max_packet_size`.
    pub packets_oversized: u64,
    /// Packets with a command byte outside the known set.
    pub unknown_commands: u64,
    /// Commands accepted by the command channel.
    pub commands_queued: u64,
    /// Commands refused by the full command channel.
    pub commands_rejected: u64,
    /// Packets sent to the peer, heartbeats included.
    pub reports_sent: u64,
    /// Reports discarded for lack of a peer or socket.
    pub reports_suppressed: u64,
    /// Heartbeats sent.
    pub heartbeats_sent: u64,
    /// Frames signalled to the render unit.
    pub frames_pulsed: u64,
    /// Frames skipped because the render unit was still busy.
    pub frames_skipped: u64,
}

/// The network-facing unit.
pub struct IngressUnit {
    transport: Option<UdpTransport>,
    channel: Arc<CommandChannel<CommandRecord>>,
    reports: Receiver<ReportRecord>,
    go: GoSender,
    snapshot: Arc<SnapshotCell<EngineStats>>,
    clock: Clock,
    peers: PeerTracker,
    pacer: FramePacer,
    writer: PacketWriter,
    max_packet_size: usize,
    heartbeat_interval_ms: u32,
    last_heartbeat_ms: Option<u32>,
    last_stats_log_ms: u32,
    stats: IngressStats,
}

impl IngressUnit {
    /// Binds the configured listen address. A failure is logged and yields
    /// `None`, which runs the unit without a network.
    #[must_use]
    pub fn bind_transport(config: &NetworkConfig) -> Option<UdpTransport> {
        match UdpTransport::bind_host(&config.bind_address, config.listen_port) {
            Ok(transport) => {
                tracing::info!("Listening on {}", transport.local_addr());
                Some(transport)
            }
            Err(err) => {
                tracing::warn!("Network unavailable, running without a socket: {err}");
                None
            }
        }
    }

    /// Assembles the unit. `transport` may be `None` for degraded mode.
    #[must_use]
    pub fn new(
        config: &PipelineConfig,
        transport: Option<UdpTransport>,
        channel: Arc<CommandChannel<CommandRecord>>,
        reports: Receiver<ReportRecord>,
        go: GoSender,
        snapshot: Arc<SnapshotCell<EngineStats>>,
        clock: Clock,
    ) -> Self {
        Self {
            transport,
            channel,
            reports,
            go,
            snapshot,
            clock,
            peers: PeerTracker::new(config.network.response_port),
            pacer: FramePacer::new(config.frame.frame_rate),
            writer: PacketWriter::new(),
            max_packet_size: config.network.max_packet_size.min(MAX_PACKET_SIZE),
            heartbeat_interval_ms: config.network.heartbeat_interval_ms,
            last_heartbeat_ms: None,
            last_stats_log_ms: 0,
            stats: IngressStats::default(),
        }
    }

    /// Counters so far.
    #[must_use]
    pub const fn stats(&self) -> &IngressStats {
        &self.stats
    }

    /// The peer tracker.
    #[must_use]
    pub const fn peers(&self) -> &PeerTracker {
        &self.peers
    }

    /// Bound socket address, if any.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.transport.as_ref().map(UdpTransport::local_addr)
    }

    /// Decodes one datagram and queues its command. Returns true if a
    /// command reached the channel.
    pub fn handle_datagram(&mut self, bytes: &[u8], from: SocketAddr) -> bool {
        self.stats.packets_received += 1;
        if bytes.len() > self.max_packet_size {
            self.stats.packets_oversized += 1;
            tracing::warn!("Discarding {}-byte datagram from {from}", bytes.len());
            return false;
        }

        let packet = match InboundPacket::decode(bytes) {
            Ok(packet) => packet,
            Err(err) => {
                self.stats.packets_truncated += 1;
                tracing::warn!("Discarding datagram from {from}: {err}");
                return false;
            }
        };
        self.peers.observe(from);

        let record = match translate(&packet) {
            Ok(record) => record,
            Err(err @ PacketError::UnknownCommand(_)) => {
                self.stats.unknown_commands += 1;
                tracing::warn!("Discarding packet from {from}: {err}");
                return false;
            }
            Err(err) => {
                tracing::warn!("Discarding packet from {from}: {err}");
                return false;
            }
        };

        if self.channel.try_push(record) {
            self.stats.commands_queued += 1;
            true
        } else {
            self.stats.commands_rejected += 1;
            false
        }
    }

    /// Reads and handles waiting datagrams. Returns how many were read.
    pub fn poll_socket(&mut self) -> usize {
        let mut buffer = [0u8; RECV_BUFFER_SIZE];
        let mut handled = 0;
        while handled < MAX_DATAGRAMS_PER_POLL {
            let Some(transport) = self.transport.as_mut() else {
                break;
            };
            let Some((data, from)) = transport.poll_datagram() else {
                break;
            };
            let len = data.len();
            buffer[..len].copy_from_slice(data);
            self.handle_datagram(&buffer[..len], from);
            handled += 1;
        }
        handled
    }

    /// Sends every queued render report. Returns how many were taken off the
    /// report channel (sent or suppressed).
    pub fn flush_reports(&mut self) -> usize {
        let mut flushed = 0;
        while let Ok(report) = self.reports.try_recv() {
            self.send_packet(&report.to_packet());
            flushed += 1;
        }
        flushed
    }

    /// Sends a heartbeat if a peer is known and the interval has passed.
    /// The heartbeat carries the live sprite count and fps.
    pub fn maybe_heartbeat(&mut self, now: u32) -> bool {
        if !self.peers.is_known() || self.heartbeat_interval_ms == 0 {
            return false;
        }
        if let Some(last) = self.last_heartbeat_ms {
            if now.wrapping_sub(last) < self.heartbeat_interval_ms {
                return false;
            }
        }
        self.last_heartbeat_ms = Some(now);

        let stats = self.snapshot.latest();
        let packet = OutboundPacket::new(ResponseKind::Heartbeat, 0, 0, now).at(
            i16::try_from(stats.active_sprites).unwrap_or(i16::MAX),
            i16::try_from(stats.fps).unwrap_or(i16::MAX),
        );
        let sent = self.send_packet(&packet);
        if sent {
            self.stats.heartbeats_sent += 1;
        }
        sent
    }

    /// Pulses the render unit if a frame is due at `now`.
    pub fn pulse_frame(&mut self, now: Instant) -> Option<Pulse> {
        if !self.pacer.due(now) {
            return None;
        }
        let pulse = self.go.pulse();
        match pulse {
            Pulse::Sent => self.stats.frames_pulsed += 1,
            Pulse::Skipped => self.stats.frames_skipped += 1,
            Pulse::Closed => {}
        }
        Some(pulse)
    }

    /// Runs until `running` is cleared, then flushes what is left.
    pub fn run(&mut self, running: &AtomicBool) -> IngressStats {
        tracing::info!(
            "Ingress unit started ({} fps, {})",
            1_000 / self.pacer.period().as_millis().max(1),
            if self.transport.is_some() { "network up" } else { "no network" },
        );

        while running.load(Ordering::Acquire) {
            self.poll_socket();
            self.flush_reports();

            let now_ms = self.clock.now_ms();
            self.maybe_heartbeat(now_ms);
            self.maybe_log_stats(now_ms);

            let now = Instant::now();
            self.pulse_frame(now);

            let wait = self.pacer.until_next(Instant::now()).min(POLL_INTERVAL);
            if !wait.is_zero() {
                std::thread::sleep(wait);
            }
        }

        self.flush_reports();
        tracing::info!(
            "Ingress unit stopped: {} packets, {} queued, {} rejected, {} reports sent",
            self.stats.packets_received,
            self.stats.commands_queued,
            self.stats.commands_rejected,
            self.stats.reports_sent,
        );
        self.stats
    }

    fn send_packet(&mut self, packet: &OutboundPacket) -> bool {
        let (Some(transport), Some(target)) = (self.transport.as_mut(), self.peers.target()) else {
            self.stats.reports_suppressed += 1;
            tracing::debug!("No peer, {:?} report suppressed", packet.response);
            return false;
        };

        if !packet.encode(&mut self.writer) {
            return false;
        }
        match transport.send_to(self.writer.as_slice(), target) {
            Ok(_) => {
                self.stats.reports_sent += 1;
                true
            }
            Err(err) => {
                tracing::warn!("Report to {target} failed: {err}");
                false
            }
        }
    }

    fn maybe_log_stats(&mut self, now: u32) {
        if now.wrapping_sub(self.last_stats_log_ms) < STATS_LOG_INTERVAL_MS {
            return;
        }
        self.last_stats_log_ms = now;
        let stats = self.snapshot.latest();
        tracing::debug!(
            "Frame {}: {} sprites, {} fps, avg {}us, pool {}/{}B",
            stats.frame_count,
            stats.active_sprites,
            stats.fps,
            stats.avg_frame_us,
            stats.texture_pool_used,
            stats.texture_pool_used + stats.texture_pool_free,
        );
    }
}

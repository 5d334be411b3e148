//! # Report Channel
//!
//! Results flow from the render unit to the ingress unit as messages over a
//! bounded crossbeam channel. The ingress unit never reads engine memory.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use pixlink_core::{CollisionEvent, Opcode, Removal};

use crate::protocol::{OutboundPacket, ResponseKind};

/// `object2_id` of an error report for a command that failed to apply.
pub const ERROR_COMMAND_FAILED: u8 = 1;

/// `object2_id` of an error report for commands dropped at a full queue.
pub const ERROR_QUEUE_OVERFLOW: u8 = 2;

/// Something the peer should hear about.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportRecord {
    /// Two sprites overlap. Position is that of the lower id.
    Collision {
        /// The pair.
        event: CollisionEvent,
        /// X of sprite `event.a`.
        x: i16,
        /// Y of sprite `event.a`.
        y: i16,
    },
    /// A sprite was swept for leaving the field.
    OutOfBounds {
        /// The removal.
        removal: Removal,
        /// When it was swept.
        timestamp: u32,
    },
    /// A frame was presented.
    RenderComplete {
        /// Live sprites after the frame.
        sprites: usize,
        /// When it was presented.
        timestamp: u32,
    },
    /// A command was dequeued but could not be applied.
    CommandFailed {
        /// Opcode of the command.
        opcode: Opcode,
        /// Target sprite.
        sprite_id: u8,
        /// When it failed.
        timestamp: u32,
    },
    /// Commands were dropped because the queue was full.
    CommandsDropped {
        /// Drops since the last report.
        count: u64,
        /// When the drops were noticed.
        timestamp: u32,
    },
}

impl ReportRecord {
    /// The wire form.
    #[must_use]
    pub fn to_packet(&self) -> OutboundPacket {
        match *self {
            Self::Collision { event, x, y } => {
                OutboundPacket::new(ResponseKind::CollisionDetected, event.a, event.b, event.timestamp)
                    .at(x, y)
            }
            Self::OutOfBounds { removal, timestamp } => {
                OutboundPacket::new(ResponseKind::ObjectOutOfBounds, removal.id, 0, timestamp)
                    .at(removal.x, removal.y)
            }
            Self::RenderComplete { sprites, timestamp } => {
                OutboundPacket::new(ResponseKind::RenderComplete, 0, 0, timestamp)
                    .at(clamp_count(sprites as u64), 0)
            }
            Self::CommandFailed { opcode, sprite_id, timestamp } => {
                OutboundPacket::new(ResponseKind::Error, sprite_id, ERROR_COMMAND_FAILED, timestamp)
                    .at(i16::from(opcode as u8), 0)
            }
            Self::CommandsDropped { count, timestamp } => {
                OutboundPacket::new(ResponseKind::Error, 0, ERROR_QUEUE_OVERFLOW, timestamp)
                    .at(clamp_count(count), 0)
            }
        }
    }
}

fn clamp_count(count: u64) -> i16 {
    i16::try_from(count).unwrap_or(i16::MAX)
}

/// Render end of the report channel. Never blocks.
#[derive(Clone, Debug)]
pub struct ReportSender {
    tx: Sender<ReportRecord>,
    dropped: Arc<AtomicU64>,
}

impl ReportSender {
    /// Queues a report. Returns false, and counts it, if the channel is full
    /// or the ingress unit is gone.
    pub fn send(&self, report: ReportRecord) -> bool {
        match self.tx.try_send(report) {
            Ok(()) => true,
            Err(TrySendError::Full(_) | TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Reports lost so far.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Creates the report channel.
#[must_use]
pub fn report_channel(capacity: usize) -> (ReportSender, Receiver<ReportRecord>) {
    let (tx, rx) = bounded(capacity);
    (ReportSender { tx, dropped: Arc::new(AtomicU64::new(0)) }, rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixlink_core::CleanupMode;

    #[test]
    fn test_full_channel_counts_drops() {
        let (tx, rx) = report_channel(1);
        let report = ReportRecord::RenderComplete { sprites: 1, timestamp: 0 };
        assert!(tx.send(report));
        assert!(!tx.send(report));
        assert_eq!(tx.dropped(), 1);
        assert_eq!(rx.try_recv(), Ok(report));
    }

    #[test]
    fn test_packet_mapping() {
        let collision = ReportRecord::Collision { event: CollisionEvent::new(5, 2, 77), x: 3, y: 4 };
        assert_eq!(
            collision.to_packet(),
            OutboundPacket::new(ResponseKind::CollisionDetected, 2, 5, 77).at(3, 4)
        );

        let removal = Removal { id: 9, x: -100, y: 10, reason: CleanupMode::OffScreen };
        let out = ReportRecord::OutOfBounds { removal, timestamp: 8 }.to_packet();
        assert_eq!(out, OutboundPacket::new(ResponseKind::ObjectOutOfBounds, 9, 0, 8).at(-100, 10));

        let dropped = ReportRecord::CommandsDropped { count: 1_000_000, timestamp: 1 }.to_packet();
        assert_eq!((dropped.response, dropped.object2_id, dropped.x), (ResponseKind::Error, ERROR_QUEUE_OVERFLOW, i16::MAX));

        let failed = ReportRecord::CommandFailed { opcode: Opcode::MoveSprite, sprite_id: 4, timestamp: 2 };
        assert_eq!(failed.to_packet().x, 1);
    }
}

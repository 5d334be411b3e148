//! # PIXLINK Net
//!
//! The two long-running units of the pipeline and the wire protocol between
//! the ingress unit and its remote peer.
//!
//! ## Data Flow
//!
//! ```text
//!  peer --UDP:8080--> Ingress Unit --CommandChannel--> Render Unit
//!                          ^                               |
//!  peer <-UDP:8081---------+--------report channel---------+
//! ```
//!
//! The ingress unit is the only socket owner. The render unit is the only
//! owner of engine state; it answers with [`pipeline::ReportRecord`]s and
//! publishes [`pixlink_core::EngineStats`] snapshots.
//!
//! ## Example
//!
//! ```rust,ignore
//! use pixlink_core::{NullRasterizer, PipelineConfig};
//! use pixlink_net::pipeline::Pipeline;
//!
//! let pipeline = Pipeline::spawn(&PipelineConfig::default(), Box::new(NullRasterizer))?;
//! std::thread::sleep(std::time::Duration::from_secs(5));
//! let report = pipeline.stop()?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod error;
pub mod pipeline;
pub mod protocol;
pub mod transport;

pub use error::{PacketError, PipelineError, TransportError};
pub use pipeline::{IngressStats, Pipeline, PipelineReport, ReportRecord};
pub use protocol::{InboundPacket, NetCommand, OutboundPacket, ResponseKind};
pub use transport::{PeerTracker, TransportStats, UdpTransport, RECV_BUFFER_SIZE};

/// Default port inbound command packets arrive on.
pub const LISTEN_PORT: u16 = 8080;

/// Default port on the peer that reports are sent to.
pub const RESPONSE_PORT: u16 = 8081;

/// Largest datagram the node accepts; longer ones are counted and dropped.
pub const MAX_PACKET_SIZE: usize = 512;

/// Wire size of an inbound command packet.
pub const INBOUND_PACKET_SIZE: usize = 11;

/// Wire size of an outbound report packet.
pub const OUTBOUND_PACKET_SIZE: usize = 11;

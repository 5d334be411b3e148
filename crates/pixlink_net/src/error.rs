//! # Network Error Types

use std::io;
use std::net::SocketAddr;

use pixlink_core::ConfigError;
use thiserror::Error;

/// A datagram that could not be turned into a command.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketError {
    /// Fewer bytes than one packet.
    #[error("truncated packet: {len} bytes, need {need}")]
    Truncated {
        /// Bytes received.
        len: usize,
        /// Bytes required.
        need: usize,
    },

    /// Command byte outside the known set.
    #[error("unknown command byte {0:#04x}")]
    UnknownCommand(u8),

    /// Response byte outside the known set.
    #[error("unknown response byte {0:#04x}")]
    UnknownResponse(u8),
}

/// Socket failures.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The configured bind address does not parse.
    #[error("invalid bind address {0:?}")]
    InvalidAddress(String),

    /// The OS refused the bind or the socket options.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address we tried to bind.
        addr: SocketAddr,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
}

/// Failures starting or stopping the unit threads.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The configuration failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A unit thread could not be spawned.
    #[error("failed to spawn {unit} thread: {source}")]
    Spawn {
        /// Which unit.
        unit: &'static str,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// A unit thread panicked.
    #[error("{0} thread panicked")]
    Panicked(&'static str),
}

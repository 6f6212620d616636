//! DMA (Direct Memory Access) channel subsystem.
//!
//! This module implements the channel side of the simulator:
//! - Per-channel transfer state machine
//! - Fixed-size channel registry with aggregate statistics
//!
//! # Architecture
//!
//! The controller owns a fixed set of independent channels. Each channel
//! is created once with a stable identity and reused across transfers.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                  DMA Controller                      │
//! │                                                      │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐    │
//! │  │  CH 0   │ │  CH 1   │ │  CH 2   │ │  CH 3   │    │
//! │  │ src/dst │ │ src/dst │ │ src/dst │ │ src/dst │    │
//! │  │ size    │ │ size    │ │ size    │ │ size    │    │
//! │  │ state   │ │ state   │ │ state   │ │ state   │    │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘    │
//! │                                                      │
//! │  transfers_completed / bytes_transferred / cycles    │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Channel Lifecycle
//!
//! ```text
//! Idle --configure--> Configured --start--> Active --complete--> Complete
//! ```
//!
//! `Complete` is a terminal state until the whole registry is reset: a
//! completed channel cannot be reconfigured without `DmaController::reset`.
//!
//! # Usage
//!
//! ```ignore
//! use dmasim::dma::DmaController;
//!
//! let mut dma = DmaController::new(4);
//! dma.configure(0, 0x1000, 0x2000, 1024, 0)?;
//! dma.start(0)?;
//! dma.complete(0)?;
//! assert_eq!(dma.stats().transfers_completed, 1);
//! ```

pub mod channel;
pub mod controller;

pub use channel::{Channel, ChannelState};
pub use controller::{DmaController, TransferStats};

/// Channel identifier (index into the registry).
pub type ChannelId = usize;

/// Number of channels a controller has unless configured otherwise.
pub const DEFAULT_NUM_CHANNELS: usize = 4;

/// DMA error types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmaError {
    /// Channel index out of registry bounds
    InvalidChannel(ChannelId),
    /// Channel is not idle, cannot be reconfigured
    ChannelBusy(ChannelId),
    /// Channel has no configured transfer to start
    NotConfigured(ChannelId),
    /// Channel has no active transfer to complete
    TransferNotActive(ChannelId),
}

impl std::fmt::Display for DmaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidChannel(ch) => write!(f, "Invalid channel index: {}", ch),
            Self::ChannelBusy(ch) => write!(f, "Channel {} is not idle", ch),
            Self::NotConfigured(ch) => write!(f, "Channel {} has no configured transfer", ch),
            Self::TransferNotActive(ch) => {
                write!(f, "Channel {} has no active transfer to complete", ch)
            }
        }
    }
}

impl std::error::Error for DmaError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            DmaError::InvalidChannel(5).to_string(),
            "Invalid channel index: 5"
        );
        assert_eq!(DmaError::ChannelBusy(0).to_string(), "Channel 0 is not idle");
    }

    #[test]
    fn test_error_is_std_error() {
        fn assert_error<E: std::error::Error>(_e: E) {}
        assert_error(DmaError::NotConfigured(1));
    }
}

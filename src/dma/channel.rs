//! Per-channel transfer state machine.
//!
//! A channel moves through `Idle -> Configured -> Active -> Complete`.
//! Each transition is guarded: configuration requires an idle channel,
//! starting requires a configured one, and completion requires an active
//! one. Transfer fields (addresses, size) only carry meaning once the
//! channel has left `Idle`.

use super::{ChannelId, DmaError};

/// State of a DMA channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelState {
    /// Channel is idle (no transfer programmed)
    #[default]
    Idle,
    /// Transfer parameters are programmed, transfer not yet started
    Configured,
    /// Transfer in progress
    Active,
    /// Transfer finished; channel stays here until the registry is reset
    Complete,
}

/// One DMA engine slot.
///
/// Channels are created once by the controller with a stable identity and
/// owned exclusively by it. Addresses and sizes are opaque integers; no
/// bytes actually move.
#[derive(Debug, Clone)]
pub struct Channel {
    /// Stable index within the registry
    id: ChannelId,

    /// Current lifecycle state
    state: ChannelState,

    /// Transfer source address
    source_address: u64,

    /// Transfer destination address
    destination_address: u64,

    /// Transfer size in bytes
    transfer_size: u64,

    /// Opaque transfer mode tag
    transfer_kind: u8,

    /// Read pointer position (source on configure, source + size once done)
    current_address: u64,

    /// Bytes left to move (size on configure, 0 once done)
    remaining_bytes: u64,
}

impl Channel {
    /// Create an idle channel with the given identity.
    pub fn new(id: ChannelId) -> Self {
        Self {
            id,
            state: ChannelState::Idle,
            source_address: 0,
            destination_address: 0,
            transfer_size: 0,
            transfer_kind: 0,
            current_address: 0,
            remaining_bytes: 0,
        }
    }

    /// Program a transfer.
    ///
    /// Fails with `ChannelBusy` unless the channel is `Idle`. A channel in
    /// `Complete` also counts as busy: it must be released through a
    /// registry reset before it can carry another transfer.
    pub fn configure(
        &mut self,
        source: u64,
        destination: u64,
        size: u64,
        kind: u8,
    ) -> Result<(), DmaError> {
        if self.state != ChannelState::Idle {
            return Err(DmaError::ChannelBusy(self.id));
        }

        self.source_address = source;
        self.destination_address = destination;
        self.transfer_size = size;
        self.transfer_kind = kind;
        self.current_address = source;
        self.remaining_bytes = size;
        self.state = ChannelState::Configured;

        log::debug!(
            "ch{} configured: src=0x{:X} dst=0x{:X} size={} kind={}",
            self.id, source, destination, size, kind
        );

        Ok(())
    }

    /// Begin the programmed transfer.
    ///
    /// Fails with `NotConfigured` unless the channel is `Configured`.
    /// Returns immediately after recording `Active`; completion is a
    /// separate event reported via [`Channel::complete`].
    pub fn start(&mut self) -> Result<(), DmaError> {
        if self.state != ChannelState::Configured {
            return Err(DmaError::NotConfigured(self.id));
        }

        self.state = ChannelState::Active;
        log::debug!("ch{} active", self.id);
        Ok(())
    }

    /// Finish the in-flight transfer.
    ///
    /// Fails with `TransferNotActive` unless the channel is `Active`.
    /// Advances the read pointer past the programmed window and drains the
    /// remaining byte count.
    pub fn complete(&mut self) -> Result<(), DmaError> {
        if self.state != ChannelState::Active {
            return Err(DmaError::TransferNotActive(self.id));
        }

        self.current_address = self.source_address + self.transfer_size;
        self.remaining_bytes = 0;
        self.state = ChannelState::Complete;
        log::debug!("ch{} complete ({} bytes)", self.id, self.transfer_size);
        Ok(())
    }

    /// Force the channel back to `Idle`, clearing all transfer fields.
    pub fn reset(&mut self) {
        self.state = ChannelState::Idle;
        self.source_address = 0;
        self.destination_address = 0;
        self.transfer_size = 0;
        self.transfer_kind = 0;
        self.current_address = 0;
        self.remaining_bytes = 0;
    }

    /// Check if the channel has a transfer in progress.
    pub fn is_busy(&self) -> bool {
        self.state == ChannelState::Active
    }

    /// Get the channel identity.
    pub fn id(&self) -> ChannelId {
        self.id
    }

    /// Get the current lifecycle state.
    pub fn state(&self) -> ChannelState {
        self.state
    }

    /// Get the programmed source address.
    pub fn source_address(&self) -> u64 {
        self.source_address
    }

    /// Get the programmed destination address.
    pub fn destination_address(&self) -> u64 {
        self.destination_address
    }

    /// Get the programmed transfer size in bytes.
    pub fn transfer_size(&self) -> u64 {
        self.transfer_size
    }

    /// Get the opaque transfer mode tag.
    pub fn transfer_kind(&self) -> u8 {
        self.transfer_kind
    }

    /// Get the read pointer position.
    pub fn current_address(&self) -> u64 {
        self.current_address
    }

    /// Get the bytes left to move.
    pub fn remaining_bytes(&self) -> u64 {
        self.remaining_bytes
    }
}

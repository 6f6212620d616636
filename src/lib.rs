//! dmasim library
//!
//! Core simulation logic for DMA channel management and shared-bus
//! arbitration. The `dma` module owns the per-channel transfer state
//! machines; the `bus` module owns slot-bounded, priority-ordered
//! admission control. The two are independent: the bus arbiter operates
//! on abstract requests and knows nothing about DMA semantics.

pub mod bus;
pub mod config;
pub mod dma;
pub mod workload;

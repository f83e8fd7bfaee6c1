//! Trama Core - a pull-based real-time signal-flow graph
//!
//! This crate is the scheduling and declick heart of a modular audio
//! engine: processing nodes connected through typed directional sockets,
//! re-evaluated once per fixed-size block.
//!
//! # Core Abstractions
//!
//! ## Graph
//!
//! - [`Patch`] - the node arena, wiring operations, and the per-block driver
//! - [`Node`] - a graph vertex: behavior plus sockets, buffers, parameters
//! - [`NodeBehavior`] - the processing contract concrete node kinds fulfill
//! - [`ProcessContext`] - what a behavior sees of the graph while rendering
//!
//! ## Signals
//!
//! - [`AudioBuffer`] - channel-major audio-rate block
//! - [`ControlBuffer`] - single-channel control-rate block
//! - [`LinkType`] - the audio/control signal-class split carried by sockets
//!
//! ## Declick
//!
//! - [`Envelope`] - one linear ramp state machine used for both rewiring
//!   fades and smooth mute
//! - [`InputSocket`] / [`OutputSocket`] - connection endpoints; rewiring a
//!   socket that still carries signal is deferred behind a fade-out
//!
//! ## Parameters
//!
//! - [`ParamTable`] - per-node typed parameters with staged cross-thread
//!   writes, committed only at the start of a node's update
//!
//! # Scheduling Model
//!
//! A single logical thread drives the graph: [`Patch::tick`] resets
//! per-block bookkeeping on every node and then pulls recursively from the
//! sink. A node feeding several consumers is recomputed once per block (or
//! once per distinct consumer port for multi-update nodes), never once per
//! pull. Rendering is total: a disconnected input reads as silence, and no
//! error path exists inside the block-processing recursion.
//!
//! # no_std Support
//!
//! This crate is `no_std` compatible (with `alloc`). Disable the default
//! `std` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! trama-core = { version = "0.1", default-features = false }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod buffer;
pub mod config;
pub mod envelope;
pub mod error;
pub mod node;
pub mod param;
pub mod patch;
pub mod socket;

// Re-export main types at crate root
pub use buffer::{AudioBuffer, ControlBuffer};
pub use config::AudioConfig;
pub use envelope::{Envelope, EnvelopeShape};
pub use error::PatchError;
pub use node::{Node, NodeBehavior, NodeId, NodeLayout, ProcessContext};
pub use param::{
    COMMON_PARAMS, PARAM_MUTE, PARAM_POSITION, PARAM_RADIUS, ParamKind, ParamSpec, ParamTable,
    ParamValue,
};
pub use patch::Patch;
pub use socket::{Endpoint, InputSocket, LinkType, OutputSocket, Tap};

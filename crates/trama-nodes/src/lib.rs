//! Trama Nodes - concrete node behaviors for the trama signal-flow graph
//!
//! Built-in node kinds for [`trama_core`]'s patch, plus a registry for
//! creating them by name and a [`Rack`] bundling both:
//!
//! - [`AudioOscillator`] - audio-rate oscillator, four waveforms, FM/AM/PM
//! - [`ControlOscillator`] - LFO writing a control-rate output
//! - [`Mixer`] - N-input sum/product mixer
//! - [`NodeRegistry`] - kind-name to factory mapping with UI metadata
//! - [`Rack`] - patch + registry, the surface a control layer drives
//!
//! # Example
//!
//! ```rust
//! use trama_core::{AudioConfig, LinkType};
//! use trama_nodes::Rack;
//!
//! let mut rack = Rack::new(AudioConfig::default()).unwrap();
//! let osc = rack.create_node("oscillator").unwrap();
//! let mixer = rack.create_node("mixer").unwrap();
//! rack.connect(mixer, LinkType::Audio, 0, (osc, 0)).unwrap();
//! rack.set_sink(mixer).unwrap();
//! let block = rack.tick().unwrap();
//! assert_eq!(block[0].len(), 64);
//! ```
//!
//! # no_std Support
//!
//! This crate is `no_std` compatible (with `alloc`). Disable the default
//! `std` feature in your `Cargo.toml`.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod lfo;
pub mod mixer;
pub mod osc;
pub mod rack;
pub mod registry;

pub use lfo::ControlOscillator;
pub use mixer::{MixOp, Mixer};
pub use osc::{AudioOscillator, Modulation, Phasor, Waveform};
pub use rack::Rack;
pub use registry::{NodeCategory, NodeDescriptor, NodeRegistry};

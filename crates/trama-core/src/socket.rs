//! Directional connection endpoints.
//!
//! A connection is not a standalone entity: it is the relationship encoded
//! jointly by one [`InputSocket`]'s source field and the matching entry in
//! the source [`OutputSocket`]'s reverse-reference set. Sockets store arena
//! identifiers, never pointers, so tearing a node down cannot leave anything
//! dangling. The invariant maintained by [`Patch`](crate::Patch): the reverse
//! sets are always the exact inverse of every stable source field.

#[cfg(not(feature = "std"))]
use alloc::{boxed::Box, vec::Vec};

#[cfg(not(feature = "std"))]
use alloc::collections::BTreeSet;
#[cfg(feature = "std")]
use std::collections::BTreeSet;

use crate::buffer::{AudioBuffer, ControlBuffer};
use crate::config::AudioConfig;
use crate::envelope::{Envelope, EnvelopeShape};
use crate::node::NodeId;

/// Signal class of a socket or buffer: audio-rate (multi-channel) or
/// control-rate (single-channel).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkType {
    /// Audio-rate link, carried by [`AudioBuffer`]s.
    Audio,
    /// Control-rate link, carried by [`ControlBuffer`]s.
    Control,
}

impl LinkType {
    /// Number of link types, for per-link-type socket tables.
    pub const COUNT: usize = 2;
    /// Both link types, in table order.
    pub const ALL: [LinkType; Self::COUNT] = [LinkType::Audio, LinkType::Control];

    /// Table index of this link type.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Self::Audio => 0,
            Self::Control => 1,
        }
    }
}

/// A `(node, socket index)` endpoint on the far side of a connection.
pub type Endpoint = (NodeId, usize);

/// Observer tapping the signal arriving at an input socket.
///
/// Taps see the socket's input *after* the socket envelope has been applied
/// to a scratch copy, so an external consumer (metering, visualization)
/// hears the same declick fade the graph does. Default implementations
/// ignore the link type a tap does not care about.
pub trait Tap: Send {
    /// Called with the audio arriving at an audio input socket.
    fn on_audio(&mut self, _buffer: &AudioBuffer) {}
    /// Called with the signal arriving at a control input socket.
    fn on_control(&mut self, _buffer: &ControlBuffer) {}
}

/// Output endpoint: the set of consumers currently reading from it.
#[derive(Debug)]
pub struct OutputSocket {
    link: LinkType,
    consumers: BTreeSet<Endpoint>,
}

impl OutputSocket {
    pub(crate) fn new(link: LinkType) -> Self {
        Self {
            link,
            consumers: BTreeSet::new(),
        }
    }

    /// Link type of this socket.
    pub fn link(&self) -> LinkType {
        self.link
    }

    /// Iterates over the `(consumer node, consumer input)` reverse references.
    pub fn consumers(&self) -> impl Iterator<Item = Endpoint> + '_ {
        self.consumers.iter().copied()
    }

    /// Number of consumers currently wired to this socket.
    pub fn len(&self) -> usize {
        self.consumers.len()
    }

    /// True if nothing reads from this socket.
    pub fn is_empty(&self) -> bool {
        self.consumers.is_empty()
    }

    pub(crate) fn attach(&mut self, consumer: NodeId, input: usize) {
        self.consumers.insert((consumer, input));
    }

    pub(crate) fn detach(&mut self, consumer: NodeId, input: usize) {
        self.consumers.remove(&(consumer, input));
    }

    pub(crate) fn clear(&mut self) {
        self.consumers.clear();
    }
}

/// Input endpoint: an optional source, an optional pending rewire, and the
/// declick envelope gating source changes.
///
/// A socket is either *stable* (no pending rewire) or *transitioning*
/// (pending rewire recorded, envelope releasing); at most one rewire can be
/// pending at a time — a newer request simply replaces the recorded one.
pub struct InputSocket {
    link: LinkType,
    source: Option<Endpoint>,
    pending: Option<Option<Endpoint>>,
    envelope: Envelope,
    taps: Vec<Box<dyn Tap>>,
    tap_audio: Option<AudioBuffer>,
    tap_control: Option<ControlBuffer>,
}

impl core::fmt::Debug for InputSocket {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InputSocket")
            .field("link", &self.link)
            .field("source", &self.source)
            .field("pending", &self.pending)
            .field("envelope", &self.envelope)
            .field("taps", &self.taps.len())
            .finish()
    }
}

impl InputSocket {
    pub(crate) fn new(link: LinkType, shape: EnvelopeShape, config: &AudioConfig) -> Self {
        Self {
            link,
            source: None,
            pending: None,
            // Released so the first connection on a silent socket is applied
            // immediately instead of waiting out a fade of silence.
            envelope: Envelope::released(shape, config.sample_rate),
            taps: Vec::new(),
            tap_audio: None,
            tap_control: None,
        }
    }

    /// Link type of this socket.
    pub fn link(&self) -> LinkType {
        self.link
    }

    /// The `(source node, source output)` pair currently feeding this socket.
    pub fn source(&self) -> Option<Endpoint> {
        self.source
    }

    /// The rewire awaiting this socket's fade-out, if any. `Some(None)` is a
    /// pending disconnection.
    pub fn pending(&self) -> Option<Option<Endpoint>> {
        self.pending
    }

    /// The declick envelope gating source changes on this socket.
    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    /// True if the socket has neither a source nor a pending rewire.
    pub fn is_empty(&self) -> bool {
        self.source.is_none() && self.pending.is_none()
    }

    /// Registers a tap observing the signal arriving at this socket.
    pub fn add_tap(&mut self, tap: Box<dyn Tap>, config: &AudioConfig) {
        match self.link {
            LinkType::Audio => {
                self.tap_audio.get_or_insert_with(|| AudioBuffer::new(config));
            }
            LinkType::Control => {
                self.tap_control
                    .get_or_insert_with(|| ControlBuffer::new(config.block_size));
            }
        }
        self.taps.push(tap);
    }

    /// True if any tap is registered.
    pub fn has_taps(&self) -> bool {
        !self.taps.is_empty()
    }

    pub(crate) fn envelope_mut(&mut self) -> &mut Envelope {
        &mut self.envelope
    }

    pub(crate) fn set_source(&mut self, source: Option<Endpoint>) {
        self.source = source;
    }

    pub(crate) fn set_pending(&mut self, target: Option<Endpoint>) {
        self.pending = Some(target);
    }

    pub(crate) fn take_pending(&mut self) -> Option<Option<Endpoint>> {
        self.pending.take()
    }

    pub(crate) fn clear(&mut self) {
        self.source = None;
        self.pending = None;
    }

    pub(crate) fn set_config(&mut self, shape: EnvelopeShape, config: &AudioConfig) {
        self.envelope.set_deltas(shape, config.sample_rate);
        if let Some(buf) = &mut self.tap_audio {
            buf.resize(config);
        }
        if let Some(buf) = &mut self.tap_control {
            buf.resize(config.block_size);
        }
    }

    /// Copies `source` into the tap scratch (silence when absent), applies
    /// the socket envelope as a ramp over every channel, and hands the
    /// result to each tap.
    pub(crate) fn deliver_audio(&mut self, source: Option<&AudioBuffer>) {
        let Some(scratch) = &mut self.tap_audio else {
            return;
        };
        match source {
            Some(buf) => scratch.copy_from(buf),
            None => scratch.clear(),
        }
        for ch in 0..scratch.channels() {
            // Each channel gets the same ramp.
            let mut env = self.envelope;
            env.apply(scratch.channel_mut(ch));
        }
        for tap in &mut self.taps {
            tap.on_audio(scratch);
        }
    }

    /// Control-rate twin of [`deliver_audio`](Self::deliver_audio).
    pub(crate) fn deliver_control(&mut self, source: Option<&ControlBuffer>) {
        let Some(scratch) = &mut self.tap_control else {
            return;
        };
        match source {
            Some(buf) => scratch.copy_from(buf),
            None => scratch.fill(0.0),
        }
        let mut env = self.envelope;
        env.apply(scratch.as_mut_slice());
        for tap in &mut self.taps {
            tap.on_control(scratch);
        }
    }
}

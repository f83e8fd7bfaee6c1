//! Graph vertices and the per-block update state machine.
//!
//! A [`Node`] bundles a behavior (the DSP) with everything the scheduler
//! needs around it: output buffers, input/output sockets per link type, the
//! parameter table, the shared mute envelope, and the per-block dedup
//! bookkeeping. Behaviors implement [`NodeBehavior`] and see the graph only
//! through a [`ProcessContext`], which resolves input sockets to their
//! source buffers and hides everything else.

#[cfg(not(feature = "std"))]
use alloc::{boxed::Box, vec::Vec};

#[cfg(not(feature = "std"))]
use alloc::collections::BTreeSet;
#[cfg(feature = "std")]
use std::collections::BTreeSet;

use crate::buffer::{AudioBuffer, ControlBuffer};
use crate::config::AudioConfig;
use crate::envelope::{Envelope, EnvelopeShape};
use crate::param::{ParamSpec, ParamTable, ParamValue, PARAM_MUTE};
use crate::socket::{Endpoint, InputSocket, LinkType, OutputSocket, Tap};

/// Unique identifier for a node in a patch.
///
/// Ids are assigned sequentially and never reused within a patch instance,
/// so a stale id can at worst name an empty slot, never a different node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Returns the raw numeric identifier.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl core::fmt::Display for NodeId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Static shape of a node kind: socket counts, parameters, and whether the
/// node may be recomputed once per distinct consumer or only once per block.
pub struct NodeLayout {
    /// Tag identifying the concrete behavior, e.g. `"oscillator"`.
    pub kind: &'static str,
    /// Number of audio-rate input sockets.
    pub audio_inputs: usize,
    /// Number of control-rate input sockets.
    pub control_inputs: usize,
    /// Number of audio-rate output sockets (each backed by a buffer).
    pub audio_outputs: usize,
    /// Number of control-rate output sockets (each backed by a buffer).
    pub control_outputs: usize,
    /// Behavior-specific parameters, appended after the common set.
    pub params: Vec<ParamSpec>,
    /// When true the node recomputes at most once per block regardless of
    /// how many consumers pull it.
    pub single_update: bool,
}

impl NodeLayout {
    /// A layout with no sockets and no extra parameters, in single-update
    /// mode. Callers fill in what they need.
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            audio_inputs: 0,
            control_inputs: 0,
            audio_outputs: 0,
            control_outputs: 0,
            params: Vec::new(),
            single_update: true,
        }
    }
}

/// The processing contract a concrete node kind fulfills.
///
/// All hooks run on the block-processing thread. `process` must be total:
/// it always produces a full block, substituting silence for absent inputs.
pub trait NodeBehavior: Send {
    /// Declares socket counts, parameters, and update mode. Called once at
    /// node construction.
    fn layout(&self) -> NodeLayout;

    /// Recomputes this block's output buffers from current inputs and
    /// parameters.
    fn process(&mut self, ctx: &mut ProcessContext<'_>);

    /// Per-block housekeeping, called from `advance()` before any pulls.
    fn advance(&mut self) {}

    /// Invoked when the audio configuration changes, after buffers have been
    /// resized.
    fn config_changed(&mut self, _config: &AudioConfig) {}

    /// Invoked after a staged parameter write has been committed.
    fn param_changed(&mut self, _index: usize, _value: &ParamValue) {}
}

/// What a behavior sees of the graph while recomputing a block.
///
/// The node being processed is borrowed out of the arena, so `nodes` and
/// `node` are disjoint and input references can be held across output
/// borrows.
pub struct ProcessContext<'a> {
    pub(crate) nodes: &'a [Option<Node>],
    pub(crate) node: &'a mut Node,
}

impl<'a> ProcessContext<'a> {
    /// The active audio configuration.
    pub fn config(&self) -> AudioConfig {
        self.node.config
    }

    /// Current committed value of the parameter at `index`.
    pub fn param(&self, index: usize) -> Option<ParamValue> {
        self.node.params.value(index)
    }

    fn resolve(&self, link: LinkType, index: usize) -> Option<&'a Node> {
        let (src, _) = self.node.in_sockets[link.index()].get(index)?.source()?;
        self.nodes.get(src.0 as usize)?.as_ref()
    }

    /// The audio buffer feeding audio input `index`, or `None` when the
    /// socket is disconnected or the source is muted and fully settled.
    /// `None` means silence.
    pub fn audio_input(&self, index: usize) -> Option<&'a AudioBuffer> {
        let (_, port) = self.node.in_sockets[LinkType::Audio.index()]
            .get(index)?
            .source()?;
        self.resolve(LinkType::Audio, index)?.visible_audio_output(port)
    }

    /// The control buffer feeding control input `index`, or `None` meaning
    /// silence.
    pub fn control_input(&self, index: usize) -> Option<&'a ControlBuffer> {
        let (_, port) = self.node.in_sockets[LinkType::Control.index()]
            .get(index)?
            .source()?;
        let node = self.resolve(LinkType::Control, index)?;
        node.visible_control_output(port)
    }

    /// Mutable access to audio output buffer `index`.
    ///
    /// # Panics
    /// Panics if `index` is out of range for the layout.
    pub fn audio_output(&mut self, index: usize) -> &mut AudioBuffer {
        &mut self.node.out_audio[index]
    }

    /// Mutable access to control output buffer `index`.
    ///
    /// # Panics
    /// Panics if `index` is out of range for the layout.
    pub fn control_output(&mut self, index: usize) -> &mut ControlBuffer {
        &mut self.node.out_control[index]
    }

    /// Number of audio input sockets.
    pub fn audio_inputs(&self) -> usize {
        self.node.in_sockets[LinkType::Audio.index()].len()
    }

    /// Number of control input sockets.
    pub fn control_inputs(&self) -> usize {
        self.node.in_sockets[LinkType::Control.index()].len()
    }
}

/// A graph vertex: behavior plus sockets, buffers, parameters, envelopes,
/// and per-block scheduling state.
pub struct Node {
    id: Option<NodeId>,
    kind: &'static str,
    single_update: bool,
    config: AudioConfig,
    shape: EnvelopeShape,
    out_audio: Vec<AudioBuffer>,
    out_control: Vec<ControlBuffer>,
    in_sockets: [Vec<InputSocket>; LinkType::COUNT],
    out_sockets: [Vec<OutputSocket>; LinkType::COUNT],
    params: ParamTable,
    out_envelope: Envelope,
    updated: bool,
    visited: [BTreeSet<Endpoint>; LinkType::COUNT],
    behavior: Option<Box<dyn NodeBehavior>>,
}

impl core::fmt::Debug for Node {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("single_update", &self.single_update)
            .field("updated", &self.updated)
            .finish_non_exhaustive()
    }
}

impl Node {
    /// Builds a node around `behavior` with the default declick shape.
    pub fn new(behavior: Box<dyn NodeBehavior>, config: &AudioConfig) -> Self {
        Self::with_shape(behavior, config, EnvelopeShape::default())
    }

    /// Builds a node around `behavior` with explicit rise/fall durations for
    /// its declick and mute envelopes.
    pub fn with_shape(
        mut behavior: Box<dyn NodeBehavior>,
        config: &AudioConfig,
        shape: EnvelopeShape,
    ) -> Self {
        let layout = behavior.layout();
        behavior.config_changed(config);
        let in_counts = [layout.audio_inputs, layout.control_inputs];
        let out_counts = [layout.audio_outputs, layout.control_outputs];

        let mut in_sockets: [Vec<InputSocket>; LinkType::COUNT] = [Vec::new(), Vec::new()];
        let mut out_sockets: [Vec<OutputSocket>; LinkType::COUNT] = [Vec::new(), Vec::new()];
        for link in LinkType::ALL {
            let i = link.index();
            in_sockets[i] = (0..in_counts[i])
                .map(|_| InputSocket::new(link, shape, config))
                .collect();
            out_sockets[i] = (0..out_counts[i]).map(|_| OutputSocket::new(link)).collect();
        }

        Self {
            id: None,
            kind: layout.kind,
            single_update: layout.single_update,
            config: *config,
            shape,
            out_audio: (0..layout.audio_outputs)
                .map(|_| AudioBuffer::new(config))
                .collect(),
            out_control: (0..layout.control_outputs)
                .map(|_| ControlBuffer::new(config.block_size))
                .collect(),
            in_sockets,
            out_sockets,
            params: ParamTable::new(&layout.params),
            // Unmuted from birth: outputs are audible immediately.
            out_envelope: Envelope::pressed(shape, config.sample_rate),
            updated: false,
            visited: [BTreeSet::new(), BTreeSet::new()],
            behavior: Some(behavior),
        }
    }

    /// The id assigned by the owning patch, `None` before insertion.
    pub fn id(&self) -> Option<NodeId> {
        self.id
    }

    /// Tag identifying this node's behavior.
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// True if this node recomputes at most once per block.
    pub fn single_update(&self) -> bool {
        self.single_update
    }

    /// The node's parameter table.
    pub fn params(&self) -> &ParamTable {
        &self.params
    }

    pub(crate) fn params_mut(&mut self) -> &mut ParamTable {
        &mut self.params
    }

    /// The shared mute envelope applied to every output buffer.
    pub fn out_envelope(&self) -> &Envelope {
        &self.out_envelope
    }

    /// Input sockets of the given link type.
    pub fn inputs(&self, link: LinkType) -> &[InputSocket] {
        &self.in_sockets[link.index()]
    }

    /// Output sockets of the given link type.
    pub fn outputs(&self, link: LinkType) -> &[OutputSocket] {
        &self.out_sockets[link.index()]
    }

    pub(crate) fn inputs_mut(&mut self, link: LinkType) -> &mut [InputSocket] {
        &mut self.in_sockets[link.index()]
    }

    pub(crate) fn outputs_mut(&mut self, link: LinkType) -> &mut [OutputSocket] {
        &mut self.out_sockets[link.index()]
    }

    /// Registers a tap observing the signal arriving at the given input.
    /// Returns false if the socket index is out of range.
    pub fn add_tap(&mut self, link: LinkType, input: usize, tap: Box<dyn Tap>) -> bool {
        let config = self.config;
        match self.in_sockets[link.index()].get_mut(input) {
            Some(sock) => {
                sock.add_tap(tap, &config);
                true
            }
            None => false,
        }
    }

    /// True if any input has a source or pending rewire, or any output has
    /// a consumer.
    pub fn has_connections(&self) -> bool {
        self.in_sockets
            .iter()
            .any(|socks| socks.iter().any(|s| !s.is_empty()))
            || self
                .out_sockets
                .iter()
                .any(|socks| socks.iter().any(|s| !s.is_empty()))
    }

    /// True if the mute parameter is currently set.
    pub fn is_muted(&self) -> bool {
        matches!(self.params.value(PARAM_MUTE), Some(ParamValue::Bool(true)))
    }

    /// True while the node's outputs carry meaningful signal: always when
    /// unmuted, and during the fade-out after muting.
    pub fn output_visible(&self) -> bool {
        !self.is_muted() || !self.out_envelope.finished()
    }

    /// Audio output `port`, or `None` when out of range or the node is muted
    /// and fully faded out.
    pub fn visible_audio_output(&self, port: usize) -> Option<&AudioBuffer> {
        if self.output_visible() {
            self.out_audio.get(port)
        } else {
            None
        }
    }

    /// Control output `port`, or `None` when out of range or the node is
    /// muted and fully faded out.
    pub fn visible_control_output(&self, port: usize) -> Option<&ControlBuffer> {
        if self.output_visible() {
            self.out_control.get(port)
        } else {
            None
        }
    }

    /// Raw audio output `port`, ignoring mute visibility.
    pub fn audio_output(&self, port: usize) -> Option<&AudioBuffer> {
        self.out_audio.get(port)
    }

    /// All audio output buffers, ignoring mute visibility.
    pub fn audio_outputs(&self) -> &[AudioBuffer] {
        &self.out_audio
    }

    /// Raw control output `port`, ignoring mute visibility.
    pub fn control_output(&self, port: usize) -> Option<&ControlBuffer> {
        self.out_control.get(port)
    }

    pub(crate) fn set_id(&mut self, id: NodeId) {
        self.id = Some(id);
    }

    pub(crate) fn take_behavior(&mut self) -> Option<Box<dyn NodeBehavior>> {
        self.behavior.take()
    }

    pub(crate) fn put_behavior(&mut self, behavior: Box<dyn NodeBehavior>) {
        self.behavior = Some(behavior);
    }

    /// Resets per-block dedup state and runs the behavior's housekeeping
    /// hook. Called once per block, before any pulls.
    pub(crate) fn advance_block(&mut self) {
        self.updated = false;
        if !self.single_update {
            for set in &mut self.visited {
                set.clear();
            }
        }
        if let Some(behavior) = &mut self.behavior {
            behavior.advance();
        }
    }

    /// Dedup gate for a pull. Returns whether this pull should recompute,
    /// and records the pull either way.
    pub(crate) fn begin_update(&mut self, caller: Option<(LinkType, NodeId, usize)>) -> bool {
        let can = match caller {
            None => !self.updated,
            Some((link, id, port)) => {
                if self.single_update {
                    !self.updated
                } else {
                    self.visited[link.index()].insert((id, port))
                }
            }
        };
        self.updated = true;
        can
    }

    /// Commits staged parameter writes and translates the mute parameter
    /// into the output envelope's direction.
    pub(crate) fn apply_params(&mut self) {
        let mut behavior = self.behavior.take();
        self.params.drain_staged(|index, value| {
            if let Some(b) = &mut behavior {
                b.param_changed(index, value);
            }
        });
        self.behavior = behavior;
        if self.is_muted() {
            self.out_envelope.release();
        } else {
            self.out_envelope.press();
        }
    }

    /// Applies the shared output envelope to every output buffer as an
    /// identical per-sample ramp, then advances it and every input socket
    /// envelope by one block.
    pub(crate) fn update_envelopes(&mut self) {
        let block = self.config.block_size;
        for buf in &mut self.out_audio {
            for ch in 0..buf.channels() {
                let mut env = self.out_envelope;
                env.apply(buf.channel_mut(ch));
            }
        }
        for buf in &mut self.out_control {
            let mut env = self.out_envelope;
            env.apply(buf.as_mut_slice());
        }
        self.out_envelope.update(block);
        for sockets in &mut self.in_sockets {
            for sock in sockets {
                sock.envelope_mut().update(block);
            }
        }
    }

    /// Collects the input sockets whose fade-out has completed and whose
    /// deferred rewire can now be applied. Returns `(link, input, target)`
    /// triples; the empty case allocates nothing.
    pub(crate) fn finished_pendings(&mut self) -> Vec<(LinkType, usize, Option<Endpoint>)> {
        let mut out = Vec::new();
        for link in LinkType::ALL {
            for (i, sock) in self.in_sockets[link.index()].iter_mut().enumerate() {
                if sock.pending().is_some() && sock.envelope().finished() {
                    if let Some(target) = sock.take_pending() {
                        out.push((link, i, target));
                    }
                }
            }
        }
        out
    }

    /// Resizes buffers, recomputes envelope deltas, and notifies the
    /// behavior. Envelope values and directions are preserved so an active
    /// fade is not cut short.
    pub(crate) fn set_config(&mut self, config: &AudioConfig) {
        self.config = *config;
        for buf in &mut self.out_audio {
            buf.resize(config);
        }
        for buf in &mut self.out_control {
            buf.resize(config.block_size);
        }
        self.out_envelope.set_deltas(self.shape, config.sample_rate);
        let shape = self.shape;
        for sockets in &mut self.in_sockets {
            for sock in sockets {
                sock.set_config(shape, config);
            }
        }
        if let Some(behavior) = &mut self.behavior {
            behavior.config_changed(config);
        }
    }
}

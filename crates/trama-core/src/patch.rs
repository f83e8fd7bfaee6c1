//! The patch: node arena, wiring operations, and the per-block pull driver.
//!
//! Nodes live in an arena of slots addressed by stable [`NodeId`]s; ids are
//! never reused, so a stale handle can at worst name an empty slot. All
//! wiring goes through [`Patch::connect`], which enforces the declick
//! protocol: a socket still carrying signal is never rewired instantly, the
//! request is deferred behind a fade-out instead.
//!
//! `tick()` drives one block: every node's bookkeeping is reset, then output
//! is pulled recursively from the sink. Nodes feeding several consumers are
//! recomputed once per block (or once per distinct consumer port, in
//! multi-update mode), never once per pull.

#[cfg(not(feature = "std"))]
use alloc::{boxed::Box, vec::Vec};

#[cfg(not(feature = "std"))]
use alloc::collections::BTreeSet;
#[cfg(feature = "std")]
use std::collections::BTreeSet;

use crate::buffer::AudioBuffer;
use crate::config::AudioConfig;
use crate::envelope::EnvelopeShape;
use crate::error::PatchError;
use crate::node::{Node, NodeBehavior, NodeId, ProcessContext};
use crate::param::ParamValue;
use crate::socket::{Endpoint, LinkType};

/// A signal-flow graph plus the scheduler that evaluates it block by block.
pub struct Patch {
    nodes: Vec<Option<Node>>,
    config: AudioConfig,
    sink: Option<NodeId>,
}

impl Patch {
    /// Creates an empty patch. Fails if the configuration is invalid.
    pub fn new(config: AudioConfig) -> Result<Self, PatchError> {
        config.validate()?;
        Ok(Self {
            nodes: Vec::new(),
            config,
            sink: None,
        })
    }

    /// The active audio configuration.
    pub fn config(&self) -> AudioConfig {
        self.config
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|slot| slot.is_some()).count()
    }

    /// True if the patch holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Inserts a behavior as a new node with the default declick shape and
    /// returns its id.
    pub fn insert(&mut self, behavior: Box<dyn NodeBehavior>) -> NodeId {
        self.insert_with_shape(behavior, EnvelopeShape::default())
    }

    /// Inserts a behavior with explicit declick rise/fall durations.
    pub fn insert_with_shape(
        &mut self,
        behavior: Box<dyn NodeBehavior>,
        shape: EnvelopeShape,
    ) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let mut node = Node::with_shape(behavior, &self.config, shape);
        node.set_id(id);
        #[cfg(feature = "tracing")]
        tracing::debug!("patch_insert: {} node {id}", node.kind());
        self.nodes.push(Some(node));
        id
    }

    /// Severs all of `id`'s connections and removes it from the patch.
    ///
    /// Teardown bypasses the fade protocol: every input pointing at the node
    /// is nulled, every reverse reference is dropped, and the node is gone by
    /// the next block.
    pub fn remove(&mut self, id: NodeId) -> Result<(), PatchError> {
        self.node(id)?;
        #[cfg(feature = "tracing")]
        tracing::debug!("patch_remove: node {id}");

        // Detach this node's inputs from their sources.
        let mut sources = Vec::new();
        if let Some(node) = self.slot_mut(id) {
            for link in LinkType::ALL {
                for sock in node.inputs_mut(link) {
                    if let Some((src, port)) = sock.source() {
                        sources.push((link, src, port));
                    }
                    sock.clear();
                }
            }
        }
        for (link, src, port) in sources {
            if let Some(node) = self.slot_mut(src) {
                if let Some(out) = node.outputs_mut(link).get_mut(port) {
                    // All of `id`'s entries on this output go away at once.
                    let stale: Vec<Endpoint> = out
                        .consumers()
                        .filter(|&(consumer, _)| consumer == id)
                        .collect();
                    for (consumer, input) in stale {
                        out.detach(consumer, input);
                    }
                }
            }
        }

        // Null out every consumer's reference to this node's outputs.
        let mut consumers = Vec::new();
        if let Some(node) = self.slot_mut(id) {
            for link in LinkType::ALL {
                for out in node.outputs_mut(link) {
                    consumers.extend(out.consumers().map(|(n, i)| (link, n, i)));
                    out.clear();
                }
            }
        }
        for (link, consumer, input) in consumers {
            if let Some(node) = self.slot_mut(consumer) {
                if let Some(sock) = node.inputs_mut(link).get_mut(input) {
                    sock.clear();
                }
            }
        }

        // Pending rewires carry no reverse reference, so they are hunted
        // down directly: a fade still destined for this node becomes a
        // pending disconnection instead.
        for node in self.nodes.iter_mut().flatten() {
            for link in LinkType::ALL {
                for sock in node.inputs_mut(link) {
                    if let Some(Some((target, _))) = sock.pending() {
                        if target == id {
                            sock.set_pending(None);
                        }
                    }
                }
            }
        }

        self.nodes[id.0 as usize] = None;
        if self.sink == Some(id) {
            self.sink = None;
        }
        Ok(())
    }

    /// Borrows the node with the given id.
    pub fn node(&self, id: NodeId) -> Result<&Node, PatchError> {
        self.nodes
            .get(id.0 as usize)
            .and_then(|slot| slot.as_ref())
            .ok_or(PatchError::NodeNotFound(id))
    }

    /// True if `id` names a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_ok()
    }

    fn slot_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0 as usize)?.as_mut()
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, PatchError> {
        self.slot_mut(id).ok_or(PatchError::NodeNotFound(id))
    }

    /// Designates the node `tick()` pulls from.
    pub fn set_sink(&mut self, id: NodeId) -> Result<(), PatchError> {
        self.node(id)?;
        self.sink = Some(id);
        Ok(())
    }

    /// The current sink, if any.
    pub fn sink(&self) -> Option<NodeId> {
        self.sink
    }

    /// Wires `source` (an output endpoint, or `None` to disconnect) into
    /// input `input` of `dst`.
    ///
    /// If the input socket is still carrying signal from a previous source,
    /// the rewire is deferred: the request is recorded, the socket's
    /// envelope is released, and the old source keeps feeding until the
    /// fade-out completes. A silent socket is rewired on the spot.
    pub fn connect(
        &mut self,
        dst: NodeId,
        link: LinkType,
        input: usize,
        source: Option<Endpoint>,
    ) -> Result<(), PatchError> {
        let node = self.node(dst)?;
        if input >= node.inputs(link).len() {
            return Err(PatchError::SocketOutOfRange {
                node: dst,
                link,
                socket: input,
            });
        }
        if let Some((src, output)) = source {
            let src_node = self.node(src)?;
            if output >= src_node.outputs(link).len() {
                return Err(PatchError::SocketOutOfRange {
                    node: src,
                    link,
                    socket: output,
                });
            }
            // A feedback edge would make the pull recursion unbounded.
            if src == dst || self.can_reach(dst, src) {
                return Err(PatchError::CycleDetected);
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!("patch_connect: {source:?} → {dst}/{link:?}[{input}]");

        let sock = &self.node(dst)?.inputs(link)[input];
        if sock.envelope().value() > 0.0 {
            // Still audible: fade the old signal out first.
            let node = self.node_mut(dst)?;
            let sock = &mut node.inputs_mut(link)[input];
            sock.set_pending(source);
            sock.envelope_mut().release();
        } else {
            self.apply_rewire(dst, link, input, source);
        }
        Ok(())
    }

    /// Disconnects input `input` of `dst`, fading out whatever feeds it.
    pub fn disconnect(
        &mut self,
        dst: NodeId,
        link: LinkType,
        input: usize,
    ) -> Result<(), PatchError> {
        self.connect(dst, link, input, None)
    }

    /// Performs the actual rewire: old reverse reference out, new source and
    /// reverse reference in, input envelope pressed so the new signal fades
    /// in from silence.
    fn apply_rewire(&mut self, dst: NodeId, link: LinkType, input: usize, target: Option<Endpoint>) {
        let old = {
            let Some(node) = self.slot_mut(dst) else {
                return;
            };
            let sock = &mut node.inputs_mut(link)[input];
            let old = sock.source();
            let _ = sock.take_pending();
            sock.set_source(target);
            sock.envelope_mut().press();
            old
        };
        if let Some((src, port)) = old {
            if let Some(node) = self.slot_mut(src) {
                if let Some(out) = node.outputs_mut(link).get_mut(port) {
                    out.detach(dst, input);
                }
            }
        }
        if let Some((src, port)) = target {
            if let Some(node) = self.slot_mut(src) {
                if let Some(out) = node.outputs_mut(link).get_mut(port) {
                    out.attach(dst, input);
                }
            }
        }
    }

    /// True if `to` is reachable from `from` along stable downstream edges.
    /// Pending rewires carry no edge yet and do not count.
    fn can_reach(&self, from: NodeId, to: NodeId) -> bool {
        let mut visited = BTreeSet::new();
        let mut stack = Vec::new();
        stack.push(from);
        while let Some(id) = stack.pop() {
            if id == to {
                return true;
            }
            if !visited.insert(id) {
                continue;
            }
            let Ok(node) = self.node(id) else { continue };
            for link in LinkType::ALL {
                for out in node.outputs(link) {
                    stack.extend(out.consumers().map(|(consumer, _)| consumer));
                }
            }
        }
        false
    }

    /// The source endpoint currently feeding the given input socket.
    pub fn source_of(
        &self,
        id: NodeId,
        link: LinkType,
        input: usize,
    ) -> Result<Option<Endpoint>, PatchError> {
        let node = self.node(id)?;
        node.inputs(link)
            .get(input)
            .map(|s| s.source())
            .ok_or(PatchError::SocketOutOfRange {
                node: id,
                link,
                socket: input,
            })
    }

    /// The consumers currently wired to the given output socket.
    pub fn consumers_of(
        &self,
        id: NodeId,
        link: LinkType,
        output: usize,
    ) -> Result<Vec<Endpoint>, PatchError> {
        let node = self.node(id)?;
        node.outputs(link)
            .get(output)
            .map(|s| s.consumers().collect())
            .ok_or(PatchError::SocketOutOfRange {
                node: id,
                link,
                socket: output,
            })
    }

    /// Stages a parameter write by index. The value is committed at the
    /// start of the node's next update, never mid-block.
    pub fn set_param_at(
        &mut self,
        id: NodeId,
        index: usize,
        value: ParamValue,
    ) -> Result<(), PatchError> {
        self.node_mut(id)?.params_mut().stage(index, value)
    }

    /// Stages a parameter write by name.
    pub fn set_param(
        &mut self,
        id: NodeId,
        name: &str,
        value: ParamValue,
    ) -> Result<(), PatchError> {
        let node = self.node_mut(id)?;
        let index = node
            .params()
            .index_of(name)
            .ok_or(PatchError::ParamNotFound)?;
        node.params_mut().stage(index, value)
    }

    /// Reads the committed value of a parameter by index. Staged writes are
    /// not visible until the node's next update.
    pub fn param_at(&self, id: NodeId, index: usize) -> Result<ParamValue, PatchError> {
        self.node(id)?
            .params()
            .value(index)
            .ok_or(PatchError::ParamNotFound)
    }

    /// Reads the committed value of a parameter by name.
    pub fn param(&self, id: NodeId, name: &str) -> Result<ParamValue, PatchError> {
        let node = self.node(id)?;
        let index = node
            .params()
            .index_of(name)
            .ok_or(PatchError::ParamNotFound)?;
        node.params()
            .value(index)
            .ok_or(PatchError::ParamNotFound)
    }

    /// Propagates a new audio configuration to every node: buffers are
    /// resized, envelope deltas recomputed. An invalid configuration is
    /// rejected and the previous one retained.
    pub fn configure(&mut self, config: AudioConfig) -> Result<(), PatchError> {
        config.validate()?;
        #[cfg(feature = "tracing")]
        tracing::debug!(
            "patch_configure: {} Hz, block {}, {} ch",
            config.sample_rate,
            config.block_size,
            config.channels
        );
        self.config = config;
        for node in self.nodes.iter_mut().flatten() {
            node.set_config(&config);
        }
        Ok(())
    }

    /// Produces one block: resets every node's per-block bookkeeping, pulls
    /// from the sink, and returns the sink's audio output buffers.
    pub fn tick(&mut self) -> Result<&[AudioBuffer], PatchError> {
        let sink = self.sink.ok_or(PatchError::NoSink)?;
        for node in self.nodes.iter_mut().flatten() {
            node.advance_block();
        }
        self.pull(sink, None);
        Ok(self.node(sink)?.audio_outputs())
    }

    /// Pulls one node for this block: dedup gate, staged parameters, input
    /// recursion, recompute, envelopes, then any finished pending rewires.
    ///
    /// The node is moved out of its slot for the duration, so a pull that
    /// somehow reaches back to it (a stale cycle) finds an empty slot and
    /// degrades to silence instead of recursing forever.
    fn pull(&mut self, id: NodeId, caller: Option<(LinkType, NodeId, usize)>) {
        let idx = id.0 as usize;
        let Some(slot) = self.nodes.get_mut(idx) else {
            return;
        };
        let Some(mut node) = slot.take() else {
            return;
        };

        if !node.begin_update(caller) {
            self.nodes[idx] = Some(node);
            return;
        }

        node.apply_params();

        // A muted node whose fade has settled skips the whole recompute;
        // one transitioning into mute still renders so the ramp has signal.
        if node.output_visible() {
            for link in LinkType::ALL {
                let count = node.inputs(link).len();
                for input in 0..count {
                    if let Some((src, _)) = node.inputs(link)[input].source() {
                        self.pull(src, Some((link, id, input)));
                    }
                }
            }
            if let Some(mut behavior) = node.take_behavior() {
                let mut ctx = ProcessContext {
                    nodes: &self.nodes,
                    node: &mut node,
                };
                behavior.process(&mut ctx);
                node.put_behavior(behavior);
            }
        }

        self.deliver_taps(&mut node);
        node.update_envelopes();
        let pendings = node.finished_pendings();
        self.nodes[idx] = Some(node);

        for (link, input, target) in pendings {
            #[cfg(feature = "tracing")]
            tracing::debug!("patch_rewire: {id}/{link:?}[{input}] → {target:?}");
            self.apply_rewire(id, link, input, target);
        }
    }

    /// Hands each tapped input socket an enveloped copy of its current
    /// signal. `node` is borrowed out of the arena, so source lookups and
    /// socket mutation cannot alias.
    fn deliver_taps(&self, node: &mut Node) {
        for link in LinkType::ALL {
            for sock in node.inputs_mut(link) {
                if !sock.has_taps() {
                    continue;
                }
                let source = sock.source().and_then(|(src, port)| {
                    self.nodes.get(src.0 as usize)?.as_ref().map(|n| (n, port))
                });
                match link {
                    LinkType::Audio => {
                        let buf = source.and_then(|(n, port)| n.visible_audio_output(port));
                        sock.deliver_audio(buf);
                    }
                    LinkType::Control => {
                        let buf = source.and_then(|(n, port)| n.visible_control_output(port));
                        sock.deliver_control(buf);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeLayout;

    struct Gen;
    impl NodeBehavior for Gen {
        fn layout(&self) -> NodeLayout {
            let mut layout = NodeLayout::new("gen");
            layout.audio_outputs = 1;
            layout.single_update = false;
            layout
        }
        fn process(&mut self, ctx: &mut ProcessContext<'_>) {
            ctx.audio_output(0).channel_mut(0).fill(1.0);
        }
    }

    struct Pass;
    impl NodeBehavior for Pass {
        fn layout(&self) -> NodeLayout {
            let mut layout = NodeLayout::new("pass");
            layout.audio_inputs = 1;
            layout.audio_outputs = 1;
            layout
        }
        fn process(&mut self, ctx: &mut ProcessContext<'_>) {
            let samples: Vec<f32> = match ctx.audio_input(0) {
                Some(buf) => buf.channel(0).to_vec(),
                None => vec![0.0; ctx.config().block_size],
            };
            ctx.audio_output(0).channel_mut(0).copy_from_slice(&samples);
        }
    }

    fn patch() -> Patch {
        Patch::new(AudioConfig::default()).unwrap()
    }

    #[test]
    fn stale_id_after_remove_is_not_found() {
        let mut p = patch();
        let a = p.insert(Box::new(Gen));
        let b = p.insert(Box::new(Gen));
        p.remove(a).unwrap();
        assert!(!p.contains(a));
        assert!(p.contains(b));
        // Ids are never reused.
        let c = p.insert(Box::new(Gen));
        assert_ne!(c, a);
        assert_eq!(p.len(), 2);
    }

    #[test]
    fn connect_validates_endpoints() {
        let mut p = patch();
        let src = p.insert(Box::new(Gen));
        let pass = p.insert(Box::new(Pass));
        assert_eq!(
            p.connect(pass, LinkType::Audio, 3, Some((src, 0))),
            Err(PatchError::SocketOutOfRange {
                node: pass,
                link: LinkType::Audio,
                socket: 3
            })
        );
        assert_eq!(
            p.connect(pass, LinkType::Audio, 0, Some((src, 9))),
            Err(PatchError::SocketOutOfRange {
                node: src,
                link: LinkType::Audio,
                socket: 9
            })
        );
        let ghost = NodeId(99);
        assert_eq!(
            p.connect(pass, LinkType::Audio, 0, Some((ghost, 0))),
            Err(PatchError::NodeNotFound(ghost))
        );
        // Nothing was wired.
        assert_eq!(p.source_of(pass, LinkType::Audio, 0).unwrap(), None);
    }

    #[test]
    fn cycles_are_rejected() {
        let mut p = patch();
        let a = p.insert(Box::new(Pass));
        let b = p.insert(Box::new(Pass));
        let c = p.insert(Box::new(Pass));
        p.connect(b, LinkType::Audio, 0, Some((a, 0))).unwrap();
        p.connect(c, LinkType::Audio, 0, Some((b, 0))).unwrap();
        assert_eq!(
            p.connect(a, LinkType::Audio, 0, Some((c, 0))),
            Err(PatchError::CycleDetected)
        );
        assert_eq!(
            p.connect(a, LinkType::Audio, 0, Some((a, 0))),
            Err(PatchError::CycleDetected)
        );
    }

    #[test]
    fn first_connect_on_silent_socket_is_immediate() {
        let mut p = patch();
        let src = p.insert(Box::new(Gen));
        let pass = p.insert(Box::new(Pass));
        p.connect(pass, LinkType::Audio, 0, Some((src, 0))).unwrap();
        assert_eq!(
            p.source_of(pass, LinkType::Audio, 0).unwrap(),
            Some((src, 0))
        );
        assert_eq!(
            p.consumers_of(src, LinkType::Audio, 0).unwrap(),
            [(pass, 0)]
        );
        // The new source fades in from silence.
        let sock = &p.node(pass).unwrap().inputs(LinkType::Audio)[0];
        assert!(sock.envelope().is_rising());
        assert_eq!(sock.envelope().value(), 0.0);
    }

    #[test]
    fn rewire_of_live_socket_is_deferred_until_faded() {
        let mut p = patch();
        let a = p.insert(Box::new(Gen));
        let b = p.insert(Box::new(Gen));
        let pass = p.insert(Box::new(Pass));
        p.set_sink(pass).unwrap();
        p.connect(pass, LinkType::Audio, 0, Some((a, 0))).unwrap();

        // Let the fade-in get some way up.
        for _ in 0..4 {
            p.tick().unwrap();
        }
        let env = *p.node(pass).unwrap().inputs(LinkType::Audio)[0].envelope();
        assert!(env.value() > 0.0);

        p.connect(pass, LinkType::Audio, 0, Some((b, 0))).unwrap();
        // Old source still wired while the fade-out runs.
        assert_eq!(p.source_of(pass, LinkType::Audio, 0).unwrap(), Some((a, 0)));
        assert_eq!(
            p.node(pass).unwrap().inputs(LinkType::Audio)[0].pending(),
            Some(Some((b, 0)))
        );

        // 50 ms fall at 48 kHz / 64-sample blocks is under 40 blocks.
        for _ in 0..40 {
            p.tick().unwrap();
        }
        assert_eq!(p.source_of(pass, LinkType::Audio, 0).unwrap(), Some((b, 0)));
        assert_eq!(p.consumers_of(a, LinkType::Audio, 0).unwrap(), []);
        assert_eq!(p.consumers_of(b, LinkType::Audio, 0).unwrap(), [(pass, 0)]);
        assert_eq!(
            p.node(pass).unwrap().inputs(LinkType::Audio)[0].pending(),
            None
        );
    }

    #[test]
    fn teardown_clears_both_directions() {
        let mut p = patch();
        let src = p.insert(Box::new(Gen));
        let x = p.insert(Box::new(Pass));
        let y = p.insert(Box::new(Pass));
        p.connect(x, LinkType::Audio, 0, Some((src, 0))).unwrap();
        p.connect(y, LinkType::Audio, 0, Some((src, 0))).unwrap();
        p.remove(src).unwrap();
        assert_eq!(p.source_of(x, LinkType::Audio, 0).unwrap(), None);
        assert_eq!(p.source_of(y, LinkType::Audio, 0).unwrap(), None);
        assert!(!p.node(x).unwrap().has_connections());
    }

    #[test]
    fn removing_a_pending_target_cancels_the_rewire() {
        let mut p = patch();
        let a = p.insert(Box::new(Gen));
        let b = p.insert(Box::new(Gen));
        let pass = p.insert(Box::new(Pass));
        p.set_sink(pass).unwrap();
        p.connect(pass, LinkType::Audio, 0, Some((a, 0))).unwrap();
        for _ in 0..4 {
            p.tick().unwrap();
        }

        // Deferred rewire toward b, then b disappears mid-fade.
        p.connect(pass, LinkType::Audio, 0, Some((b, 0))).unwrap();
        assert_eq!(
            p.node(pass).unwrap().inputs(LinkType::Audio)[0].pending(),
            Some(Some((b, 0)))
        );
        p.remove(b).unwrap();
        assert_eq!(
            p.node(pass).unwrap().inputs(LinkType::Audio)[0].pending(),
            Some(None)
        );

        // The fade-out resolves to a disconnection, never to the dead id.
        for _ in 0..40 {
            p.tick().unwrap();
        }
        assert_eq!(p.source_of(pass, LinkType::Audio, 0).unwrap(), None);
        assert_eq!(
            p.node(pass).unwrap().inputs(LinkType::Audio)[0].pending(),
            None
        );
        assert_eq!(p.consumers_of(a, LinkType::Audio, 0).unwrap(), []);
    }

    #[test]
    fn tick_without_sink_fails() {
        let mut p = patch();
        assert_eq!(p.tick().err(), Some(PatchError::NoSink));
    }

    #[test]
    fn configure_rejects_invalid_and_keeps_previous() {
        let mut p = patch();
        let bad = AudioConfig::new(0.0, 64, 2);
        assert!(p.configure(bad).is_err());
        assert_eq!(p.config().sample_rate, 48000.0);
    }
}

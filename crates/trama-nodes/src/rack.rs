//! The rack: a patch plus a kind registry, exposing the by-name surface a
//! control layer (UI, network protocol) drives.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use trama_core::{
    AudioBuffer, AudioConfig, Endpoint, LinkType, NodeId, ParamValue, Patch, PatchError,
};

use crate::registry::NodeRegistry;

/// A patch with node creation by kind name.
pub struct Rack {
    patch: Patch,
    registry: NodeRegistry,
}

impl Rack {
    /// Creates an empty rack with the built-in node kinds.
    pub fn new(config: AudioConfig) -> Result<Self, PatchError> {
        Ok(Self {
            patch: Patch::new(config)?,
            registry: NodeRegistry::new(),
        })
    }

    /// Creates an empty rack with a custom registry.
    pub fn with_registry(config: AudioConfig, registry: NodeRegistry) -> Result<Self, PatchError> {
        Ok(Self {
            patch: Patch::new(config)?,
            registry,
        })
    }

    /// The underlying patch, for wiring and introspection beyond this
    /// surface.
    pub fn patch(&self) -> &Patch {
        &self.patch
    }

    /// Mutable access to the underlying patch.
    pub fn patch_mut(&mut self) -> &mut Patch {
        &mut self.patch
    }

    /// The kind registry.
    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    /// Instantiates a node by kind name. `None` for an unknown kind.
    pub fn create_node(&mut self, kind: &str) -> Option<NodeId> {
        let behavior = self.registry.create(kind, &self.patch.config())?;
        Some(self.patch.insert(behavior))
    }

    /// Severs all of a node's connections and removes it.
    pub fn destroy_node(&mut self, id: NodeId) -> Result<(), PatchError> {
        self.patch.remove(id)
    }

    /// Designates the node `tick()` pulls from.
    pub fn set_sink(&mut self, id: NodeId) -> Result<(), PatchError> {
        self.patch.set_sink(id)
    }

    /// Wires an output endpoint into an input socket, declick-gated.
    pub fn connect(
        &mut self,
        dst: NodeId,
        link: LinkType,
        input: usize,
        source: Endpoint,
    ) -> Result<(), PatchError> {
        self.patch.connect(dst, link, input, Some(source))
    }

    /// Fades out and detaches whatever feeds the given input socket.
    pub fn disconnect(
        &mut self,
        dst: NodeId,
        link: LinkType,
        input: usize,
    ) -> Result<(), PatchError> {
        self.patch.disconnect(dst, link, input)
    }

    /// Stages a parameter write by name.
    pub fn set_param(
        &mut self,
        id: NodeId,
        name: &str,
        value: ParamValue,
    ) -> Result<(), PatchError> {
        self.patch.set_param(id, name, value)
    }

    /// Reads the committed value of a parameter by name.
    pub fn param(&self, id: NodeId, name: &str) -> Result<ParamValue, PatchError> {
        self.patch.param(id, name)
    }

    /// Propagates a new audio configuration to every node.
    pub fn configure(&mut self, config: AudioConfig) -> Result<(), PatchError> {
        self.patch.configure(config)
    }

    /// Produces one block and returns the sink's audio output buffers.
    pub fn tick(&mut self) -> Result<&[AudioBuffer], PatchError> {
        self.patch.tick()
    }

    /// Kind names currently available, for listing in a UI.
    pub fn kinds(&self) -> Vec<&'static str> {
        self.registry.descriptors().map(|d| d.id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_kind_creates_nothing() {
        let mut rack = Rack::new(AudioConfig::default()).unwrap();
        assert!(rack.create_node("vocoder").is_none());
        assert!(rack.patch().is_empty());
    }

    #[test]
    fn create_wire_and_tick() {
        let mut rack = Rack::new(AudioConfig::new(48000.0, 64, 2)).unwrap();
        let osc = rack.create_node("oscillator").unwrap();
        let mixer = rack.create_node("mixer").unwrap();
        rack.connect(mixer, LinkType::Audio, 0, (osc, 0)).unwrap();
        rack.set_sink(mixer).unwrap();
        let out = rack.tick().unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].channels(), 2);
    }
}

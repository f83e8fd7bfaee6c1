//! Node kind registry and factory.
//!
//! Maps kind identifiers to behavior factories so a control surface can
//! instantiate nodes by name at runtime, and carries the metadata a UI
//! needs to list what is available.

#[cfg(not(feature = "std"))]
use alloc::{boxed::Box, vec::Vec};

use trama_core::{AudioConfig, NodeBehavior};

use crate::lfo::ControlOscillator;
use crate::mixer::Mixer;
use crate::osc::AudioOscillator;

/// Category of node kind for organization and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeCategory {
    /// Audio-rate signal sources.
    Generator,
    /// Control-rate modulation sources.
    Modulation,
    /// Combining and routing.
    Mixing,
}

impl NodeCategory {
    /// Returns a human-readable name for the category.
    pub const fn name(&self) -> &'static str {
        match self {
            NodeCategory::Generator => "Generators",
            NodeCategory::Modulation => "Modulation",
            NodeCategory::Mixing => "Mixing",
        }
    }
}

/// Describes a node kind in the registry.
#[derive(Debug, Clone)]
pub struct NodeDescriptor {
    /// Unique kind identifier (lowercase, no spaces).
    pub id: &'static str,
    /// Human-readable name.
    pub name: &'static str,
    /// Brief description of the behavior.
    pub description: &'static str,
    /// Category for organization.
    pub category: NodeCategory,
}

/// Factory function type for creating node behaviors.
type NodeFactory = fn(&AudioConfig) -> Box<dyn NodeBehavior>;

struct RegistryEntry {
    descriptor: NodeDescriptor,
    factory: NodeFactory,
}

/// Registry of all available node kinds.
pub struct NodeRegistry {
    entries: Vec<RegistryEntry>,
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn with_config<B: NodeBehavior + 'static>(mut behavior: B, config: &AudioConfig) -> Box<dyn NodeBehavior> {
    behavior.config_changed(config);
    Box::new(behavior)
}

impl NodeRegistry {
    /// Creates a registry with all built-in kinds registered.
    pub fn new() -> Self {
        let mut registry = Self {
            entries: Vec::with_capacity(3),
        };
        registry.register_builtin_kinds();
        registry
    }

    fn register_builtin_kinds(&mut self) {
        self.register(
            NodeDescriptor {
                id: "oscillator",
                name: "Oscillator",
                description: "Audio-rate oscillator with four waveforms and FM/AM/PM inputs",
                category: NodeCategory::Generator,
            },
            |config| with_config(AudioOscillator::new(), config),
        );

        self.register(
            NodeDescriptor {
                id: "lfo",
                name: "LFO",
                description: "Control-rate oscillator for modulating other nodes",
                category: NodeCategory::Modulation,
            },
            |config| with_config(ControlOscillator::new(), config),
        );

        self.register(
            NodeDescriptor {
                id: "mixer",
                name: "Mixer",
                description: "Sums or multiplies up to four audio inputs",
                category: NodeCategory::Mixing,
            },
            |config| with_config(Mixer::new(4), config),
        );
    }

    /// Registers a custom kind. Later registrations shadow earlier ones
    /// with the same id.
    pub fn register(&mut self, descriptor: NodeDescriptor, factory: NodeFactory) {
        self.entries.insert(0, RegistryEntry { descriptor, factory });
    }

    /// Instantiates a behavior by kind id, or `None` for an unknown kind.
    pub fn create(&self, id: &str, config: &AudioConfig) -> Option<Box<dyn NodeBehavior>> {
        self.entries
            .iter()
            .find(|entry| entry.descriptor.id == id)
            .map(|entry| (entry.factory)(config))
    }

    /// All registered kind descriptors.
    pub fn descriptors(&self) -> impl Iterator<Item = &NodeDescriptor> {
        self.entries.iter().map(|entry| &entry.descriptor)
    }

    /// Descriptors in the given category.
    pub fn in_category(&self, category: NodeCategory) -> impl Iterator<Item = &NodeDescriptor> {
        self.descriptors()
            .filter(move |descriptor| descriptor.category == category)
    }
}

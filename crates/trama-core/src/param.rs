//! Typed node parameters with staged cross-thread writes.
//!
//! Every node carries an ordered table of named parameters: the three common
//! ones (`position`, `radius`, `mute`) followed by whatever its behavior
//! declares. Writes from a control plane (network protocol, UI) land in a
//! per-parameter mailbox and are committed only at the start of the node's
//! per-block update, so the block-processing thread never observes a
//! partially written value. Floats are clamped into the declared range at
//! staging time; a wrong-type write is rejected synchronously and never
//! surfaces in the processing path.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::error::PatchError;

/// Index of the common `position` parameter (spatial metadata).
pub const PARAM_POSITION: usize = 0;
/// Index of the common `radius` parameter (spatial metadata).
pub const PARAM_RADIUS: usize = 1;
/// Index of the common `mute` parameter, translated into the output envelope.
pub const PARAM_MUTE: usize = 2;
/// Number of common parameters preceding behavior-declared ones.
pub const COMMON_PARAMS: usize = 3;

/// Type tag of a parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// 32-bit float, range-clamped.
    Float,
    /// 32-bit integer, range-clamped (enum selectors, counters).
    Int,
    /// Boolean flag.
    Bool,
    /// 2D vector (spatial position).
    Vec2,
}

/// A parameter value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    /// Float value.
    Float(f32),
    /// Integer value.
    Int(i32),
    /// Boolean value.
    Bool(bool),
    /// 2D vector value.
    Vec2([f32; 2]),
}

impl ParamValue {
    /// Returns the type tag of this value.
    pub fn kind(&self) -> ParamKind {
        match self {
            Self::Float(_) => ParamKind::Float,
            Self::Int(_) => ParamKind::Int,
            Self::Bool(_) => ParamKind::Bool,
            Self::Vec2(_) => ParamKind::Vec2,
        }
    }

    /// Returns the float value, if this is a float.
    pub fn as_float(&self) -> Option<f32> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the integer value, if this is an integer.
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the boolean value, if this is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the vector value, if this is a 2D vector.
    pub fn as_vec2(&self) -> Option<[f32; 2]> {
        match self {
            Self::Vec2(v) => Some(*v),
            _ => None,
        }
    }
}

/// Static description of one parameter: name, default, and numeric range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    /// Parameter name, unique within a node.
    pub name: &'static str,
    /// Default value; its kind fixes the parameter's type tag.
    pub default: ParamValue,
    /// Lower bound for `Float`/`Int` parameters (unused otherwise).
    pub min: f32,
    /// Upper bound for `Float`/`Int` parameters (unused otherwise).
    pub max: f32,
}

impl ParamSpec {
    /// A range-clamped float parameter.
    pub const fn float(name: &'static str, default: f32, min: f32, max: f32) -> Self {
        Self {
            name,
            default: ParamValue::Float(default),
            min,
            max,
        }
    }

    /// A range-clamped integer parameter (enum selectors).
    pub const fn int(name: &'static str, default: i32, min: i32, max: i32) -> Self {
        Self {
            name,
            default: ParamValue::Int(default),
            min: min as f32,
            max: max as f32,
        }
    }

    /// A boolean parameter.
    pub const fn bool(name: &'static str, default: bool) -> Self {
        Self {
            name,
            default: ParamValue::Bool(default),
            min: 0.0,
            max: 0.0,
        }
    }

    /// A 2D vector parameter.
    pub const fn vec2(name: &'static str, default: [f32; 2]) -> Self {
        Self {
            name,
            default: ParamValue::Vec2(default),
            min: 0.0,
            max: 0.0,
        }
    }

    /// Type tag of the parameter.
    pub fn kind(&self) -> ParamKind {
        self.default.kind()
    }

    fn clamp(&self, value: ParamValue) -> ParamValue {
        match value {
            ParamValue::Float(v) => ParamValue::Float(v.clamp(self.min, self.max)),
            ParamValue::Int(v) => ParamValue::Int(v.clamp(self.min as i32, self.max as i32)),
            other => other,
        }
    }
}

/// The three common parameters every node carries first.
pub fn common_specs() -> [ParamSpec; COMMON_PARAMS] {
    [
        ParamSpec::vec2("position", [0.0, 0.0]),
        ParamSpec::float("radius", 5.0, 0.0, 100.0),
        ParamSpec::bool("mute", false),
    ]
}

#[derive(Debug, Clone)]
struct Param {
    spec: ParamSpec,
    value: ParamValue,
    staged: Option<ParamValue>,
}

/// Ordered parameter storage with a per-parameter write mailbox.
#[derive(Debug, Clone)]
pub struct ParamTable {
    params: Vec<Param>,
}

impl ParamTable {
    /// Builds a table from the common specs followed by `extra`.
    pub fn new(extra: &[ParamSpec]) -> Self {
        let params = common_specs()
            .into_iter()
            .chain(extra.iter().copied())
            .map(|spec| Param {
                value: spec.default,
                staged: None,
                spec,
            })
            .collect();
        Self { params }
    }

    /// Number of parameters, common ones included.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Returns true if the table is empty (never the case for a node).
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Returns the spec of the parameter at `index`.
    pub fn spec(&self, index: usize) -> Option<&ParamSpec> {
        self.params.get(index).map(|p| &p.spec)
    }

    /// Returns the committed value of the parameter at `index`.
    pub fn value(&self, index: usize) -> Option<ParamValue> {
        self.params.get(index).map(|p| p.value)
    }

    /// Resolves a parameter name to its index.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|p| p.spec.name == name)
    }

    /// Stages a write; it commits at the start of the node's next update.
    ///
    /// Floats and integers are clamped into the declared range. A value of
    /// the wrong type is rejected and nothing is staged.
    pub fn stage(&mut self, index: usize, value: ParamValue) -> Result<(), PatchError> {
        let param = self.params.get_mut(index).ok_or(PatchError::ParamNotFound)?;
        if value.kind() != param.spec.kind() {
            return Err(PatchError::ParamType {
                expected: param.spec.kind(),
                found: value.kind(),
            });
        }
        param.staged = Some(param.spec.clamp(value));
        Ok(())
    }

    /// Commits every staged write, invoking `changed` for each one after the
    /// value is in place. The graph calls this at the start of a node's
    /// update; it is public so a table embedded elsewhere can follow the
    /// same discipline.
    pub fn drain_staged(&mut self, mut changed: impl FnMut(usize, &ParamValue)) {
        for (index, param) in self.params.iter_mut().enumerate() {
            if let Some(value) = param.staged.take() {
                param.value = value;
                changed(index, &param.value);
            }
        }
    }
}

//! Error types for patch mutation and configuration.
//!
//! Every fallible operation lives on the mutation surface: inserting and
//! removing nodes, wiring sockets, staging parameters, and swapping the audio
//! configuration. The block-processing path itself has no error channel — a
//! recompute is total and always produces a block.

use crate::node::NodeId;
use crate::param::ParamKind;
use crate::socket::LinkType;

/// Errors produced by [`Patch`](crate::Patch) mutation operations.
///
/// Errors are reported synchronously to the caller of the mutating operation
/// and never deferred into the block-processing path. A rejected operation
/// leaves the patch unmodified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchError {
    /// The specified node was not found in the patch.
    NodeNotFound(NodeId),
    /// A socket index is out of range for the node and link type.
    SocketOutOfRange {
        /// Node whose socket table was indexed.
        node: NodeId,
        /// Link type of the socket table.
        link: LinkType,
        /// Offending socket index.
        socket: usize,
    },
    /// Applying this connection would create a dependency cycle.
    CycleDetected,
    /// `tick()` was called with no sink node designated.
    NoSink,
    /// The audio configuration was rejected; the previous one is retained.
    InvalidConfig(&'static str),
    /// No parameter with the given name or index exists on the node.
    ParamNotFound,
    /// A parameter write carried a value of the wrong type.
    ParamType {
        /// Type tag of the parameter being written.
        expected: ParamKind,
        /// Type tag of the rejected value.
        found: ParamKind,
    },
}

impl core::fmt::Display for PatchError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NodeNotFound(id) => write!(f, "node {id} not found"),
            Self::SocketOutOfRange { node, link, socket } => {
                write!(f, "{link:?} socket {socket} out of range on node {node}")
            }
            Self::CycleDetected => write!(f, "connection would create a cycle"),
            Self::NoSink => write!(f, "no sink node designated"),
            Self::InvalidConfig(msg) => write!(f, "invalid audio configuration: {msg}"),
            Self::ParamNotFound => write!(f, "parameter not found"),
            Self::ParamType { expected, found } => {
                write!(f, "parameter type mismatch: expected {expected:?}, found {found:?}")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for PatchError {}

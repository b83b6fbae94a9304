use raven_core::thiserror::Error;

use crate::graph_resource::GraphResourceHandle;

/// Errors raised while declaring, compiling or executing a render graph.
///
/// Any of these drops the whole frame, the next frame starts from a fresh graph.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RgError {
    #[error("Invalid descriptor for resource {name:?}: {reason}")]
    InvalidDescriptor {
        name: String,
        reason: &'static str,
    },
    #[error("Invalid use of {handle:?} in pass {pass:?}: {reason}")]
    InvalidHandleUse {
        pass: String,
        handle: GraphResourceHandle,
        reason: &'static str,
    },
    #[error("Pass {pass:?} was closed without an execution callback")]
    MissingCallback {
        pass: String,
    },
    #[error("Cyclic dependency between passes {passes:?}")]
    CyclicDependency {
        passes: Vec<String>,
    },
    #[error("Exported {handle:?} is never produced by any pass")]
    UnresolvableOutput {
        handle: GraphResourceHandle,
    },
    #[error("{handle:?} has no physical resource bound")]
    UnresolvedHandle {
        handle: GraphResourceHandle,
    },
    #[error("Pass {pass:?} resolves {handle:?} without declaring it")]
    UndeclaredAccess {
        pass: String,
        handle: GraphResourceHandle,
    },
}

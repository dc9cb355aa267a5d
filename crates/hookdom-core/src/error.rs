use crate::component::InstanceKey;
use crate::dom::NodeId;

/// Failure reported by a [`Dom`](crate::dom::Dom) implementation.
#[derive(Debug, thiserror::Error)]
pub enum DomError {
    #[error("unknown DOM node {0:?}")]
    UnknownNode(NodeId),
    #[error("node {child:?} is not a child of {parent:?}")]
    NotAChild { parent: NodeId, child: NodeId },
    #[error("node {0:?} is not an element")]
    NotAnElement(NodeId),
    #[error("host DOM error: {0}")]
    Host(String),
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Dom(#[from] DomError),
    #[error("component instance {0:?} is not mounted")]
    UnknownInstance(InstanceKey),
    #[error("updates did not settle after {0} flush rounds")]
    Unsettled(usize),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

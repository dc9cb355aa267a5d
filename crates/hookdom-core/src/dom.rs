//! The narrow interface the committer uses to touch a real document.
//!
//! The runtime never holds on to host nodes directly. A `Dom` implementation
//! hands out [`NodeId`] handles and the committed virtual tree stores those as
//! weak back-references for patching only. Once the committer drops a
//! subtree it calls [`Dom::release`], after which the handles are dead.

use std::rc::Rc;

use crate::error::DomError;
use crate::hooks::Ref;
use crate::props::Value;

slotmap::new_key_type! {
    /// Handle to a node owned by a [`Dom`] implementation.
    pub struct NodeId;
}

/// Event delivered to handler props (`onClick`, `onChange`, ...).
#[derive(Clone, Debug)]
pub struct Event {
    pub name: String,
    pub target: NodeId,
    /// Current value of the target for form controls.
    pub value: Option<String>,
}

impl Event {
    pub fn new(name: impl Into<String>, target: NodeId) -> Self {
        Self {
            name: name.into(),
            target,
            value: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

pub type Handler = Rc<dyn Fn(&Event)>;

/// Ref box a `ref` prop writes its element into.
pub type NodeRef = Ref<Option<NodeId>>;

pub trait Dom {
    fn create_element(&mut self, tag: &str) -> NodeId;
    fn create_text_node(&mut self, text: &str) -> NodeId;
    fn set_text(&mut self, node: NodeId, text: &str) -> Result<(), DomError>;

    fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError>;
    /// Inserts `child` before `reference`, or appends when `reference` is `None`.
    fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), DomError>;
    fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError>;
    fn replace_child(
        &mut self,
        parent: NodeId,
        new_child: NodeId,
        old_child: NodeId,
    ) -> Result<(), DomError>;

    fn first_child(&self, parent: NodeId) -> Result<Option<NodeId>, DomError>;
    fn next_sibling(&self, node: NodeId) -> Result<Option<NodeId>, DomError>;

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), DomError>;
    fn remove_attribute(&mut self, node: NodeId, name: &str) -> Result<(), DomError>;
    /// Direct property write (`className`, `value`).
    fn set_property(&mut self, node: NodeId, name: &str, value: &Value) -> Result<(), DomError>;
    /// Replaces the whole inline style (`cssText`).
    fn set_style(&mut self, node: NodeId, css: &str) -> Result<(), DomError>;

    fn add_event_listener(
        &mut self,
        node: NodeId,
        event: &str,
        handler: &Handler,
    ) -> Result<(), DomError>;
    fn remove_event_listener(
        &mut self,
        node: NodeId,
        event: &str,
        handler: &Handler,
    ) -> Result<(), DomError>;

    /// Forgets a detached `node` and its descendants: their handles become
    /// unknown and their listeners are dropped. Unknown nodes are ignored.
    fn release(&mut self, node: NodeId);
}

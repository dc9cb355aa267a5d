//! DOM commit: node creation, insertion and attribute patching.

use smallvec::{SmallVec, smallvec};

use crate::component::Site;
use crate::dom::{Dom, NodeId};
use crate::element::{Element, ElementKind, VirtualElement};
use crate::error::{DomError, Error, Result};
use crate::props::{Props, Value};
use crate::reconcile::Insert;
use crate::runtime::Runtime;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Phase {
    Create,
    Update,
}

/// `onClick` -> `click`. Only `on` followed by an uppercase letter counts.
fn event_name(prop: &str) -> Option<String> {
    let rest = prop.strip_prefix("on")?;
    rest.starts_with(|c: char| c.is_ascii_uppercase())
        .then(|| rest.to_ascii_lowercase())
}

/// DOM events a handler prop listens to. `onChange` also listens to `input`
/// and `paste` so text fields update while typing.
fn wired_events(event: String) -> SmallVec<[String; 3]> {
    if event == "change" {
        smallvec![event, "input".to_string(), "paste".to_string()]
    } else {
        smallvec![event]
    }
}

impl<D: Dom> Runtime<D> {
    pub(crate) fn dom_op<R>(
        &self,
        op: impl FnOnce(&mut D) -> std::result::Result<R, DomError>,
    ) -> Result<R> {
        self.stats.borrow_mut().dom_ops += 1;
        let mut dom = self.dom.borrow_mut();
        Ok(op(&mut *dom)?)
    }

    /// Builds the committed node for `element`, creating DOM nodes (detached
    /// at the top) and mounting components on the way.
    pub(crate) fn create(&self, element: &Element, site: Site) -> Result<VirtualElement> {
        let source = element.clone();
        match element.kind() {
            ElementKind::Empty => {
                let target = self.dom_op(|dom| Ok(dom.create_text_node("")))?;
                Ok(VirtualElement::Empty { target, source })
            }
            ElementKind::Text(value) => {
                let target = self.dom_op(|dom| Ok(dom.create_text_node(value)))?;
                Ok(VirtualElement::Text {
                    value: value.clone(),
                    target,
                    source,
                })
            }
            ElementKind::Tag {
                tag,
                props,
                children,
            } => {
                let target = self.dom_op(|dom| Ok(dom.create_element(tag)))?;
                log::trace!("create <{}> {:?}", tag, target);
                self.apply_props(target, props)?;
                let mut created = Vec::with_capacity(children.len());
                for (index, child) in children.iter().enumerate() {
                    let node = self.create(child, site.child(target, index))?;
                    let child_target = self.dom_node(&node)?;
                    self.dom_op(|dom| dom.append_child(target, child_target))?;
                    created.push(node);
                }
                Ok(VirtualElement::Tag {
                    tag: tag.clone(),
                    props: props.clone(),
                    children: created,
                    target,
                    source,
                })
            }
            ElementKind::ComponentTemplate { component, props } => {
                let instance = self.mount_component(*component, props, site)?;
                Ok(VirtualElement::Component {
                    instance,
                    component: *component,
                    key: props.key(),
                    source,
                })
            }
        }
    }

    /// DOM node standing for `node`; components delegate to their rendered
    /// child.
    pub(crate) fn dom_node(&self, node: &VirtualElement) -> Result<NodeId> {
        match node {
            VirtualElement::Empty { target, .. }
            | VirtualElement::Text { target, .. }
            | VirtualElement::Tag { target, .. } => Ok(*target),
            VirtualElement::Component { instance, .. } => {
                let instances = self.instances.borrow();
                let tree = instances
                    .get(*instance)
                    .and_then(|i| i.tree.as_ref())
                    .ok_or(Error::UnknownInstance(*instance))?;
                self.dom_node(tree)
            }
        }
    }

    pub(crate) fn insert_node(&self, parent: NodeId, node: NodeId, insert: Insert) -> Result<()> {
        log::trace!("insert {:?} into {:?} ({:?})", node, parent, insert);
        match insert {
            Insert::Append => self.dom_op(|dom| dom.append_child(parent, node)),
            Insert::Prepend => self.dom_op(|dom| {
                let first = dom.first_child(parent)?;
                dom.insert_before(parent, node, first)
            }),
            Insert::After(anchor) => self.dom_op(|dom| {
                let next = dom.next_sibling(anchor)?;
                dom.insert_before(parent, node, next)
            }),
        }
    }

    fn apply_props(&self, node: NodeId, props: &Props) -> Result<()> {
        for (name, value) in props.iter() {
            self.set_prop(node, name, None, Some(value), Phase::Create)?;
        }
        Ok(())
    }

    /// Applies added, then removed, then changed props.
    pub(crate) fn patch_props(&self, node: NodeId, previous: &Props, next: &Props) -> Result<()> {
        if previous.ptr_eq(next) {
            return Ok(());
        }
        for (name, value) in next.iter() {
            if previous.get(name).is_none() {
                self.set_prop(node, name, None, Some(value), Phase::Update)?;
            }
        }
        for (name, value) in previous.iter() {
            if next.get(name).is_none() {
                self.set_prop(node, name, Some(value), None, Phase::Update)?;
            }
        }
        for (name, value) in next.iter() {
            if let Some(old) = previous.get(name)
                && !old.same(value)
            {
                self.set_prop(node, name, Some(old), Some(value), Phase::Update)?;
            }
        }
        Ok(())
    }

    fn set_prop(
        &self,
        node: NodeId,
        name: &str,
        previous: Option<&Value>,
        next: Option<&Value>,
        phase: Phase,
    ) -> Result<()> {
        if name == "key" || name == "children" || name == self.options.ordered_hint {
            return Ok(());
        }

        if name == "ref" {
            // only reached on creation or when the box itself changed
            if let Some(Value::Ref(node_ref)) = next {
                node_ref.set(Some(node));
            }
            return Ok(());
        }

        if let Some(event) = event_name(name) {
            let events = wired_events(event);
            if let Some(Value::Handler(handler)) = previous {
                for event in &events {
                    self.dom_op(|dom| dom.remove_event_listener(node, event, handler))?;
                }
            }
            if let Some(Value::Handler(handler)) = next {
                for event in &events {
                    self.dom_op(|dom| dom.add_event_listener(node, event, handler))?;
                }
            }
            return Ok(());
        }

        let cleared = Value::Str("".into());
        match name {
            "className" => {
                self.dom_op(|dom| dom.set_property(node, "className", next.unwrap_or(&cleared)))
            }
            "style" => {
                let css = next.and_then(Value::as_str).unwrap_or_default();
                self.dom_op(|dom| dom.set_style(node, css))
            }
            // property write keeps the caret where it is
            "value" if phase == Phase::Update => {
                self.dom_op(|dom| dom.set_property(node, "value", next.unwrap_or(&cleared)))
            }
            _ => match next.and_then(Value::to_attr) {
                Some(text) => self.dom_op(|dom| dom.set_attribute(node, name, &text)),
                None if previous.is_some() => self.dom_op(|dom| dom.remove_attribute(node, name)),
                None => Ok(()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_props_map_to_event_names() {
        assert_eq!(event_name("onClick").as_deref(), Some("click"));
        assert_eq!(event_name("onMouseDown").as_deref(), Some("mousedown"));
        assert_eq!(event_name("online"), None);
        assert_eq!(event_name("className"), None);
    }

    #[test]
    fn change_handlers_wire_input_and_paste() {
        assert_eq!(
            wired_events("change".into()).as_slice(),
            ["change", "input", "paste"]
        );
        assert_eq!(wired_events("click".into()).as_slice(), ["click"]);
    }
}

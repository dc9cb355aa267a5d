//! In-memory [`Dom`] for headless hosts and tests.
//!
//! Detached subtrees stay addressable until [`Dom::release`] frees them, so a
//! node moved between parents keeps its handle. Releases are not recorded in
//! the mutation log.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::rc::Rc;

use slotmap::SlotMap;

use crate::dom::{Dom, Event, Handler, NodeId};
use crate::error::DomError;
use crate::props::Value;
use crate::runtime::Runtime;

/// One recorded DOM call, in the order the committer issued it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mutation {
    CreateElement { node: NodeId, tag: String },
    CreateText { node: NodeId, text: String },
    SetText { node: NodeId, text: String },
    Append { parent: NodeId, child: NodeId },
    InsertBefore {
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    },
    Remove { parent: NodeId, child: NodeId },
    Replace {
        parent: NodeId,
        new_child: NodeId,
        old_child: NodeId,
    },
    SetAttribute { node: NodeId, name: String, value: String },
    RemoveAttribute { node: NodeId, name: String },
    SetProperty { node: NodeId, name: String },
    SetStyle { node: NodeId, css: String },
    AddListener { node: NodeId, event: String },
    RemoveListener { node: NodeId, event: String },
}

enum NodeData {
    Element {
        tag: String,
        attrs: BTreeMap<String, String>,
        style: String,
        listeners: Vec<(String, Handler)>,
    },
    Text(String),
}

struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Default)]
pub struct MemoryDom {
    nodes: SlotMap<NodeId, Node>,
    mutations: Vec<Mutation>,
}

impl MemoryDom {
    pub fn new() -> Self {
        Self::default()
    }

    fn node(&self, id: NodeId) -> Result<&Node, DomError> {
        self.nodes.get(id).ok_or(DomError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, DomError> {
        self.nodes.get_mut(id).ok_or(DomError::UnknownNode(id))
    }

    fn element_mut(
        &mut self,
        id: NodeId,
    ) -> Result<
        (
            &mut BTreeMap<String, String>,
            &mut String,
            &mut Vec<(String, Handler)>,
        ),
        DomError,
    > {
        match &mut self.node_mut(id)?.data {
            NodeData::Element {
                attrs,
                style,
                listeners,
                ..
            } => Ok((attrs, style, listeners)),
            NodeData::Text(_) => Err(DomError::NotAnElement(id)),
        }
    }

    fn detach(&mut self, child: NodeId) -> Result<(), DomError> {
        if let Some(parent) = self.node(child)?.parent {
            self.node_mut(parent)?.children.retain(|c| *c != child);
            self.node_mut(child)?.parent = None;
        }
        Ok(())
    }

    fn index_in(&self, parent: NodeId, child: NodeId) -> Result<usize, DomError> {
        self.node(parent)?
            .children
            .iter()
            .position(|c| *c == child)
            .ok_or(DomError::NotAChild { parent, child })
    }

    /// Drains the mutation log.
    pub fn take_mutations(&mut self) -> Vec<Mutation> {
        std::mem::take(&mut self.mutations)
    }

    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    /// Nodes currently held, attached or not.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(node)
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes.get(node).map_or(&[], |n| &n.children)
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node).and_then(|n| n.parent)
    }

    pub fn tag(&self, node: NodeId) -> Option<&str> {
        match &self.nodes.get(node)?.data {
            NodeData::Element { tag, .. } => Some(tag),
            NodeData::Text(_) => None,
        }
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        match &self.nodes.get(node)?.data {
            NodeData::Element { attrs, .. } => attrs.get(name).map(String::as_str),
            NodeData::Text(_) => None,
        }
    }

    pub fn style(&self, node: NodeId) -> Option<&str> {
        match &self.nodes.get(node)?.data {
            NodeData::Element { style, .. } => Some(style),
            NodeData::Text(_) => None,
        }
    }

    pub fn listeners(&self, node: NodeId, event: &str) -> Vec<Handler> {
        match self.nodes.get(node).map(|n| &n.data) {
            Some(NodeData::Element { listeners, .. }) => listeners
                .iter()
                .filter(|(name, _)| name == event)
                .map(|(_, h)| h.clone())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Concatenated text of `node` and its descendants.
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        let Some(n) = self.nodes.get(node) else {
            return;
        };
        if let NodeData::Text(t) = &n.data {
            out.push_str(t);
        }
        for child in &n.children {
            self.collect_text(*child, out);
        }
    }

    /// Every element under `root` (inclusive) with the given tag, in
    /// document order.
    pub fn find_all(&self, root: NodeId, tag: &str) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_tag(root, tag, &mut out);
        out
    }

    pub fn find(&self, root: NodeId, tag: &str) -> Option<NodeId> {
        self.find_all(root, tag).into_iter().next()
    }

    fn collect_tag(&self, node: NodeId, tag: &str, out: &mut Vec<NodeId>) {
        let Some(n) = self.nodes.get(node) else {
            return;
        };
        if matches!(&n.data, NodeData::Element { tag: t, .. } if t == tag) {
            out.push(node);
        }
        for child in &n.children {
            self.collect_tag(*child, tag, out);
        }
    }

    /// Serializes `root` and its descendants. Attributes come out sorted,
    /// inline style last.
    pub fn to_html(&self, root: NodeId) -> String {
        let mut out = String::new();
        self.write_html(root, &mut out);
        out
    }

    fn write_html(&self, node: NodeId, out: &mut String) {
        let Some(n) = self.nodes.get(node) else {
            return;
        };
        match &n.data {
            NodeData::Text(t) => escape_into(t, false, out),
            NodeData::Element {
                tag, attrs, style, ..
            } => {
                let _ = write!(out, "<{tag}");
                for (name, value) in attrs {
                    if value.is_empty() {
                        let _ = write!(out, " {name}");
                    } else {
                        let _ = write!(out, " {name}=\"");
                        escape_into(value, true, out);
                        out.push('"');
                    }
                }
                if !style.is_empty() {
                    out.push_str(" style=\"");
                    escape_into(style, true, out);
                    out.push('"');
                }
                out.push('>');
                for child in &n.children {
                    self.write_html(*child, out);
                }
                let _ = write!(out, "</{tag}>");
            }
        }
    }
}

fn escape_into(text: &str, attr: bool, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attr => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
}

impl Dom for MemoryDom {
    fn create_element(&mut self, tag: &str) -> NodeId {
        let node = self.nodes.insert(Node {
            data: NodeData::Element {
                tag: tag.to_string(),
                attrs: BTreeMap::new(),
                style: String::new(),
                listeners: Vec::new(),
            },
            parent: None,
            children: Vec::new(),
        });
        self.mutations.push(Mutation::CreateElement {
            node,
            tag: tag.to_string(),
        });
        node
    }

    fn create_text_node(&mut self, text: &str) -> NodeId {
        let node = self.nodes.insert(Node {
            data: NodeData::Text(text.to_string()),
            parent: None,
            children: Vec::new(),
        });
        self.mutations.push(Mutation::CreateText {
            node,
            text: text.to_string(),
        });
        node
    }

    fn set_text(&mut self, node: NodeId, text: &str) -> Result<(), DomError> {
        if let NodeData::Text(t) = &mut self.node_mut(node)?.data {
            *t = text.to_string();
        } else {
            // element: textContent semantics
            let children = std::mem::take(&mut self.node_mut(node)?.children);
            for child in children {
                self.node_mut(child)?.parent = None;
                self.release(child);
            }
            let text_node = self.create_text_node(text);
            self.append_child(node, text_node)?;
        }
        self.mutations.push(Mutation::SetText {
            node,
            text: text.to_string(),
        });
        Ok(())
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.node(parent)?;
        self.detach(child)?;
        self.node_mut(parent)?.children.push(child);
        self.node_mut(child)?.parent = Some(parent);
        self.mutations.push(Mutation::Append { parent, child });
        Ok(())
    }

    fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), DomError> {
        self.node(parent)?;
        if reference == Some(child) {
            return Ok(());
        }
        self.detach(child)?;
        let index = match reference {
            Some(reference) => self.index_in(parent, reference)?,
            None => self.node(parent)?.children.len(),
        };
        self.node_mut(parent)?.children.insert(index, child);
        self.node_mut(child)?.parent = Some(parent);
        self.mutations.push(Mutation::InsertBefore {
            parent,
            child,
            reference,
        });
        Ok(())
    }

    fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        let index = self.index_in(parent, child)?;
        self.node_mut(parent)?.children.remove(index);
        self.node_mut(child)?.parent = None;
        self.mutations.push(Mutation::Remove { parent, child });
        Ok(())
    }

    fn replace_child(
        &mut self,
        parent: NodeId,
        new_child: NodeId,
        old_child: NodeId,
    ) -> Result<(), DomError> {
        self.index_in(parent, old_child)?;
        self.detach(new_child)?;
        let index = self.index_in(parent, old_child)?;
        self.node_mut(parent)?.children[index] = new_child;
        self.node_mut(new_child)?.parent = Some(parent);
        self.node_mut(old_child)?.parent = None;
        self.mutations.push(Mutation::Replace {
            parent,
            new_child,
            old_child,
        });
        Ok(())
    }

    fn first_child(&self, parent: NodeId) -> Result<Option<NodeId>, DomError> {
        Ok(self.node(parent)?.children.first().copied())
    }

    fn next_sibling(&self, node: NodeId) -> Result<Option<NodeId>, DomError> {
        let Some(parent) = self.node(node)?.parent else {
            return Ok(None);
        };
        let index = self.index_in(parent, node)?;
        Ok(self.node(parent)?.children.get(index + 1).copied())
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        let (attrs, _, _) = self.element_mut(node)?;
        attrs.insert(name.to_string(), value.to_string());
        self.mutations.push(Mutation::SetAttribute {
            node,
            name: name.to_string(),
            value: value.to_string(),
        });
        Ok(())
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) -> Result<(), DomError> {
        let (attrs, _, _) = self.element_mut(node)?;
        attrs.remove(name);
        self.mutations.push(Mutation::RemoveAttribute {
            node,
            name: name.to_string(),
        });
        Ok(())
    }

    fn set_property(&mut self, node: NodeId, name: &str, value: &Value) -> Result<(), DomError> {
        let attr = if name == "className" { "class" } else { name };
        let (attrs, _, _) = self.element_mut(node)?;
        match value.to_attr() {
            Some(text) if !(attr == "class" && text.is_empty()) => {
                attrs.insert(attr.to_string(), text.into_owned());
            }
            _ => {
                attrs.remove(attr);
            }
        }
        self.mutations.push(Mutation::SetProperty {
            node,
            name: name.to_string(),
        });
        Ok(())
    }

    fn set_style(&mut self, node: NodeId, css: &str) -> Result<(), DomError> {
        let (_, style, _) = self.element_mut(node)?;
        *style = css.to_string();
        self.mutations.push(Mutation::SetStyle {
            node,
            css: css.to_string(),
        });
        Ok(())
    }

    fn add_event_listener(
        &mut self,
        node: NodeId,
        event: &str,
        handler: &Handler,
    ) -> Result<(), DomError> {
        let (_, _, listeners) = self.element_mut(node)?;
        listeners.push((event.to_string(), handler.clone()));
        self.mutations.push(Mutation::AddListener {
            node,
            event: event.to_string(),
        });
        Ok(())
    }

    fn remove_event_listener(
        &mut self,
        node: NodeId,
        event: &str,
        handler: &Handler,
    ) -> Result<(), DomError> {
        let (_, _, listeners) = self.element_mut(node)?;
        if let Some(index) = listeners
            .iter()
            .position(|(name, h)| name == event && Rc::ptr_eq(h, handler))
        {
            listeners.remove(index);
        }
        self.mutations.push(Mutation::RemoveListener {
            node,
            event: event.to_string(),
        });
        Ok(())
    }

    fn release(&mut self, node: NodeId) {
        if self.detach(node).is_err() {
            return;
        }
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            if let Some(freed) = self.nodes.remove(id) {
                stack.extend(freed.children);
            }
        }
    }
}

impl Runtime<MemoryDom> {
    /// Invokes the `event` listeners registered on `target` (no bubbling) and
    /// returns how many ran. Handlers run with the DOM unborrowed, so they may
    /// set state freely; call [`Runtime::flush`] afterwards to apply it.
    pub fn dispatch(&self, target: NodeId, event: &str) -> usize {
        self.dispatch_event(Event::new(event, target))
    }

    pub fn dispatch_event(&self, event: Event) -> usize {
        let handlers = self.dom().listeners(event.target, &event.name);
        log::trace!(
            "dispatch {} to {:?}: {} listeners",
            event.name,
            event.target,
            handlers.len()
        );
        for handler in &handlers {
            handler(&event);
        }
        handlers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_before_moves_attached_nodes() {
        let mut dom = MemoryDom::new();
        let root = dom.create_element("ul");
        let a = dom.create_text_node("a");
        let b = dom.create_text_node("b");
        let c = dom.create_text_node("c");
        for n in [a, b, c] {
            dom.append_child(root, n).unwrap();
        }

        dom.insert_before(root, c, Some(a)).unwrap();
        assert_eq!(dom.children(root), &[c, a, b]);
        assert_eq!(dom.next_sibling(a).unwrap(), Some(b));
        assert_eq!(dom.next_sibling(b).unwrap(), None);

        dom.insert_before(root, a, None).unwrap();
        assert_eq!(dom.text_content(root), "cba");
    }

    #[test]
    fn detached_reference_is_rejected() {
        let mut dom = MemoryDom::new();
        let root = dom.create_element("div");
        let stray = dom.create_element("span");
        let child = dom.create_element("b");
        assert!(matches!(
            dom.insert_before(root, child, Some(stray)),
            Err(DomError::NotAChild { .. })
        ));
        assert!(matches!(
            dom.remove_child(root, stray),
            Err(DomError::NotAChild { .. })
        ));
    }

    #[test]
    fn html_serializes_attributes_and_escapes_text() {
        let mut dom = MemoryDom::new();
        let root = dom.create_element("p");
        dom.set_attribute(root, "title", "a \"quote\"").unwrap();
        dom.set_attribute(root, "hidden", "").unwrap();
        dom.set_property(root, "className", &Value::from("lead")).unwrap();
        dom.set_style(root, "color: red").unwrap();
        let text = dom.create_text_node("1 < 2 & 3");
        dom.append_child(root, text).unwrap();

        assert_eq!(
            dom.to_html(root),
            "<p class=\"lead\" hidden title=\"a &quot;quote&quot;\" style=\"color: red\">\
             1 &lt; 2 &amp; 3</p>"
        );
    }

    #[test]
    fn listeners_are_removed_by_identity() {
        let mut dom = MemoryDom::new();
        let button = dom.create_element("button");
        let first: Handler = Rc::new(|_: &Event| {});
        let second: Handler = Rc::new(|_: &Event| {});
        dom.add_event_listener(button, "click", &first).unwrap();
        dom.add_event_listener(button, "click", &second).unwrap();

        dom.remove_event_listener(button, "click", &first).unwrap();
        let left = dom.listeners(button, "click");
        assert_eq!(left.len(), 1);
        assert!(Rc::ptr_eq(&left[0], &second));
    }

    #[test]
    fn release_frees_the_whole_subtree() {
        let mut dom = MemoryDom::new();
        let root = dom.create_element("div");
        let list = dom.create_element("ul");
        let item = dom.create_element("li");
        let label = dom.create_text_node("x");
        dom.append_child(root, list).unwrap();
        dom.append_child(list, item).unwrap();
        dom.append_child(item, label).unwrap();
        let handler: Handler = Rc::new(|_: &Event| {});
        dom.add_event_listener(item, "click", &handler).unwrap();
        assert_eq!(Rc::strong_count(&handler), 2);

        dom.release(list);
        assert_eq!(dom.node_count(), 1);
        assert!(dom.children(root).is_empty());
        assert!(!dom.contains(item));
        assert_eq!(Rc::strong_count(&handler), 1);
        assert!(matches!(dom.next_sibling(label), Err(DomError::UnknownNode(_))));

        // already gone
        dom.release(list);
        assert_eq!(dom.node_count(), 1);
    }

    #[test]
    fn text_nodes_reject_element_operations() {
        let mut dom = MemoryDom::new();
        let text = dom.create_text_node("x");
        assert!(matches!(
            dom.set_attribute(text, "id", "y"),
            Err(DomError::NotAnElement(_))
        ));
    }
}

//! # Reconciliation
//!
//! [`Runtime::reconcile`] consumes the previously committed node at one
//! position and returns the node committed for the next template:
//!
//! 1. same component and key: update props and re-render in place (unless
//!    memo says the props are equal);
//! 2. identical template pointer: nothing to do;
//! 3. nothing before: create and insert;
//! 4. nothing after: unmount and remove;
//! 5. identity changed (variant, tag, key, component): unmount, create,
//!    replace;
//! 6. same identity: patch text or attributes and recurse into children.
//!
//! Children are matched by position unless the parent tag carries the
//! `ordered` hint, in which case both lists are taken to be sorted by key and
//! merged in one pass (see [`Runtime::reconcile_keyed`]).

use std::cmp::Ordering;
use std::collections::VecDeque;

use crate::component::Site;
use crate::dom::{Dom, NodeId};
use crate::element::{Element, ElementKind, VirtualElement};
use crate::error::Result;
use crate::props::{Props, Value};
use crate::runtime::Runtime;

/// Where a newly created node goes in its DOM parent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Insert {
    Append,
    Prepend,
    After(NodeId),
}

impl<D: Dom> Runtime<D> {
    pub(crate) fn reconcile(
        &self,
        current: Option<VirtualElement>,
        next: Option<&Element>,
        site: Site,
        insert: Insert,
    ) -> Result<Option<VirtualElement>> {
        match (current, next) {
            (None, None) => Ok(None),
            (None, Some(next)) => {
                let node = self.create(next, site)?;
                let target = self.dom_node(&node)?;
                self.insert_node(site.dom_parent, target, insert)?;
                Ok(Some(node))
            }
            (Some(current), None) => {
                let target = self.dom_node(&current)?;
                self.unmount_tree(current);
                log::trace!("remove {:?} from {:?}", target, site.dom_parent);
                self.dom_op(|dom| dom.remove_child(site.dom_parent, target))?;
                self.dom.borrow_mut().release(target);
                Ok(None)
            }
            (Some(current), Some(next)) => self.patch(current, next, site).map(Some),
        }
    }

    fn patch(&self, current: VirtualElement, next: &Element, site: Site) -> Result<VirtualElement> {
        match (current, next.kind()) {
            (
                VirtualElement::Component {
                    instance,
                    component,
                    key,
                    ..
                },
                ElementKind::ComponentTemplate {
                    component: next_component,
                    props,
                },
            ) if component.same(next_component) && key == props.key() => {
                self.update_component(instance, props, site)?;
                Ok(VirtualElement::Component {
                    instance,
                    component: *next_component,
                    key,
                    source: next.clone(),
                })
            }
            (current, _) if current.source().ptr_eq(next) => Ok(current),
            (VirtualElement::Empty { target, .. }, ElementKind::Empty) => {
                Ok(VirtualElement::Empty {
                    target,
                    source: next.clone(),
                })
            }
            (VirtualElement::Text { value, target, .. }, ElementKind::Text(next_value)) => {
                if value != *next_value {
                    self.dom_op(|dom| dom.set_text(target, next_value))?;
                }
                Ok(VirtualElement::Text {
                    value: next_value.clone(),
                    target,
                    source: next.clone(),
                })
            }
            (
                VirtualElement::Tag {
                    tag,
                    props,
                    children,
                    target,
                    ..
                },
                ElementKind::Tag {
                    tag: next_tag,
                    props: next_props,
                    children: next_children,
                },
            ) if tag == *next_tag && props.key() == next_props.key() => {
                self.patch_props(target, &props, next_props)?;
                let children =
                    self.reconcile_children(target, children, next_children, next_props, site)?;
                Ok(VirtualElement::Tag {
                    tag,
                    props: next_props.clone(),
                    children,
                    target,
                    source: next.clone(),
                })
            }
            (current, _) => {
                let old_target = self.dom_node(&current)?;
                log::trace!("replace {:?}: identity changed", old_target);
                self.unmount_tree(current);
                let node = self.create(next, site)?;
                let new_target = self.dom_node(&node)?;
                self.dom_op(|dom| dom.replace_child(site.dom_parent, new_target, old_target))?;
                self.dom.borrow_mut().release(old_target);
                Ok(node)
            }
        }
    }

    fn reconcile_children(
        &self,
        dom_parent: NodeId,
        previous: Vec<VirtualElement>,
        next: &[Element],
        props: &Props,
        site: Site,
    ) -> Result<Vec<VirtualElement>> {
        let ordered = props
            .get(self.options.ordered_hint)
            .is_some_and(Value::is_truthy);
        if ordered {
            if previous.iter().all(|c| c.key().is_some()) && next.iter().all(|c| c.key().is_some()) {
                return self.reconcile_keyed(dom_parent, previous, next, site);
            }
            log::warn!(
                "ordered children of {:?} without keys; falling back to positional diff",
                dom_parent
            );
        }
        self.reconcile_positional(dom_parent, previous, next, site)
    }

    /// Index-by-index diff over `max(previous, next)` positions.
    fn reconcile_positional(
        &self,
        dom_parent: NodeId,
        previous: Vec<VirtualElement>,
        next: &[Element],
        site: Site,
    ) -> Result<Vec<VirtualElement>> {
        let len = previous.len().max(next.len());
        let mut previous = previous.into_iter();
        let mut out = Vec::with_capacity(next.len());
        for index in 0..len {
            let node = self.reconcile(
                previous.next(),
                next.get(index),
                site.child(dom_parent, index),
                Insert::Append,
            )?;
            out.extend(node);
        }
        Ok(out)
    }

    /// Merge diff of two lists sorted by ascending key.
    ///
    /// New keys are inserted after the last kept or inserted node (prepended
    /// when there is none yet), missing keys are removed, equal keys are
    /// patched in place. A key that moved shows up as remove plus insert.
    pub(crate) fn reconcile_keyed(
        &self,
        dom_parent: NodeId,
        previous: Vec<VirtualElement>,
        next: &[Element],
        site: Site,
    ) -> Result<Vec<VirtualElement>> {
        let mut previous: VecDeque<VirtualElement> = previous.into();
        let mut out = Vec::with_capacity(next.len());
        let mut anchor: Option<NodeId> = None;
        let mut next_i = 0;

        loop {
            let step = match (previous.front(), next.get(next_i)) {
                (None, None) => break,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(prev), Some(next)) => prev.key().cmp(&next.key()),
            };
            match step {
                // next key is smaller: insert it
                Ordering::Greater => {
                    let insert = anchor.map_or(Insert::Prepend, Insert::After);
                    let node = self.reconcile(
                        None,
                        next.get(next_i),
                        site.child(dom_parent, next_i),
                        insert,
                    )?;
                    if let Some(node) = node {
                        anchor = Some(self.dom_node(&node)?);
                        out.push(node);
                    }
                    next_i += 1;
                }
                // previous key is smaller: it is gone
                Ordering::Less => {
                    let gone = previous.pop_front();
                    self.reconcile(gone, None, site.child(dom_parent, next_i), Insert::Append)?;
                }
                Ordering::Equal => {
                    let kept = previous.pop_front();
                    let node = self.reconcile(
                        kept,
                        next.get(next_i),
                        site.child(dom_parent, next_i),
                        Insert::Append,
                    )?;
                    if let Some(node) = node {
                        anchor = Some(self.dom_node(&node)?);
                        out.push(node);
                    }
                    next_i += 1;
                }
            }
        }
        Ok(out)
    }
}

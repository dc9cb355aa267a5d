//! Component descriptors and the mount/render/unmount lifecycle.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::dom::{Dom, NodeId};
use crate::element::{Element, VirtualElement};
use crate::error::{Error, Result};
use crate::hooks::{HookStore, RenderContext};
use crate::props::{Props, shallow_equal};
use crate::reconcile::Insert;
use crate::runtime::Runtime;

pub type RenderFn = fn(&mut RenderContext<'_>, &Props) -> Element;
pub type PropsEq = fn(&Props, &Props) -> bool;

slotmap::new_key_type! {
    /// Arena handle of a mounted component instance.
    pub struct InstanceKey;
}

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct InstanceFlags: u8 {
        const MOUNTED = 1;
        /// A re-render is queued for the next frame.
        const UPDATE_QUEUED = 1 << 1;
    }
}

/// A component: display name plus render function.
///
/// Two components are the same when they share the render function and
/// memo-ness, so declare them once:
///
/// ```rust
/// use hookdom_core::*;
///
/// fn badge(_cx: &mut RenderContext<'_>, props: &Props) -> Element {
///     let label = props.get_str("label").unwrap_or_default().to_string();
///     create_element("span", Props::new(), children![label])
/// }
///
/// const BADGE: Component = memo(Component::new("Badge", badge));
/// ```
#[derive(Clone, Copy)]
pub struct Component {
    name: &'static str,
    render: RenderFn,
    are_equal: Option<PropsEq>,
}

impl Component {
    pub const fn new(name: &'static str, render: RenderFn) -> Self {
        Self {
            name,
            render,
            are_equal: None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_memo(&self) -> bool {
        self.are_equal.is_some()
    }

    pub(crate) fn same(&self, other: &Component) -> bool {
        std::ptr::fn_addr_eq(self.render, other.render) && self.is_memo() == other.is_memo()
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.name)
            .field("memo", &self.is_memo())
            .finish()
    }
}

/// Reuses the mounted instance untouched while [`shallow_equal`] holds for
/// its old and new props.
pub const fn memo(component: Component) -> Component {
    memo_with(component, shallow_equal)
}

pub const fn memo_with(component: Component, are_equal: PropsEq) -> Component {
    Component {
        are_equal: Some(are_equal),
        ..component
    }
}

/// Where an instance re-enters the reconciler: its DOM parent, its index in
/// the parent's children, and its depth in the component tree.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Site {
    pub(crate) dom_parent: NodeId,
    pub(crate) index: usize,
    pub(crate) depth: usize,
}

impl Site {
    pub(crate) fn child(self, dom_parent: NodeId, index: usize) -> Self {
        Site {
            dom_parent,
            index,
            depth: self.depth,
        }
    }
}

pub(crate) struct ComponentInstance {
    pub(crate) component: Component,
    pub(crate) props: Props,
    /// Raw output of the last render, compared by pointer for bail-out.
    pub(crate) rendered_value: Option<Element>,
    /// Committed subtree of the single rendered child.
    pub(crate) tree: Option<VirtualElement>,
    pub(crate) hooks: HookStore,
    pub(crate) flags: Rc<Cell<InstanceFlags>>,
    pub(crate) site: Site,
}

impl<D: Dom> Runtime<D> {
    /// Allocates an instance, renders it and creates its subtree (detached;
    /// the caller inserts it).
    pub(crate) fn mount_component(
        &self,
        component: Component,
        props: &Props,
        site: Site,
    ) -> Result<InstanceKey> {
        let key = self.instances.borrow_mut().insert(ComponentInstance {
            component,
            props: props.clone(),
            rendered_value: None,
            tree: None,
            hooks: HookStore::default(),
            flags: Rc::new(Cell::new(InstanceFlags::MOUNTED)),
            site,
        });
        self.stats.borrow_mut().mounts += 1;
        log::debug!("mount <{}> {:?}", component.name(), key);

        if let Some(element) = self.render_component(key)? {
            let tree = self.create(&element, self.subtree_site(site))?;
            let mut instances = self.instances.borrow_mut();
            let instance = instances.get_mut(key).ok_or(Error::UnknownInstance(key))?;
            instance.tree = Some(tree);
        }
        Ok(key)
    }

    /// Runs the render function with fresh hook cursors.
    ///
    /// Returns `None` on bail-out: the instance rendered before and produced
    /// the very same element.
    pub(crate) fn render_component(&self, key: InstanceKey) -> Result<Option<Element>> {
        let (render, mut hooks, props, flags, name) = {
            let mut instances = self.instances.borrow_mut();
            let instance = instances.get_mut(key).ok_or(Error::UnknownInstance(key))?;
            (
                instance.component.render,
                std::mem::take(&mut instance.hooks),
                instance.props.clone(),
                instance.flags.clone(),
                instance.component.name,
            )
        };

        hooks.reset_cursors();
        // rendering now reads the latest state
        flags.set(flags.get() - InstanceFlags::UPDATE_QUEUED);

        let output = {
            let mut cx = RenderContext {
                hooks: &mut hooks,
                instance: key,
                flags: &flags,
                scheduler: &self.scheduler,
            };
            render(&mut cx, &props)
        };

        let mut instances = self.instances.borrow_mut();
        let instance = instances.get_mut(key).ok_or(Error::UnknownInstance(key))?;
        instance.hooks = hooks;
        self.stats.borrow_mut().renders += 1;

        if instance
            .rendered_value
            .as_ref()
            .is_some_and(|previous| previous.ptr_eq(&output))
        {
            self.stats.borrow_mut().bailouts += 1;
            log::trace!("<{}> bailed out", name);
            return Ok(None);
        }
        instance.rendered_value = Some(output.clone());
        Ok(Some(output))
    }

    /// Parent re-render reaching an instance of the same component and key:
    /// take the new props and site, then re-render unless memo says equal.
    pub(crate) fn update_component(&self, key: InstanceKey, props: &Props, site: Site) -> Result<()> {
        let skip = {
            let mut instances = self.instances.borrow_mut();
            let instance = instances.get_mut(key).ok_or(Error::UnknownInstance(key))?;
            instance.site = site;
            let skip = instance
                .component
                .are_equal
                .is_some_and(|are_equal| are_equal(&instance.props, props));
            if !skip {
                instance.props = props.clone();
            }
            skip
        };
        if skip {
            self.stats.borrow_mut().memo_skips += 1;
            return Ok(());
        }
        match self.render_component(key)? {
            Some(element) => self.commit_instance(key, &element),
            None => Ok(()),
        }
    }

    /// Re-renders `key` outside of a parent pass (state change) and re-enters
    /// the reconciler at its site when the output changed.
    pub(crate) fn force_update(&self, key: InstanceKey) -> Result<()> {
        if !self.instances.borrow().contains_key(key) {
            return Ok(());
        }
        match self.render_component(key)? {
            Some(element) => self.commit_instance(key, &element),
            None => Ok(()),
        }
    }

    fn commit_instance(&self, key: InstanceKey, element: &Element) -> Result<()> {
        let (tree, site) = {
            let mut instances = self.instances.borrow_mut();
            let instance = instances.get_mut(key).ok_or(Error::UnknownInstance(key))?;
            (instance.tree.take(), instance.site)
        };
        log::trace!(
            "re-entering reconciler for {:?} at index {} under {:?}",
            key,
            site.index,
            site.dom_parent
        );
        let previous = tree.clone();
        let result = self.reconcile(tree, Some(element), self.subtree_site(site), Insert::Append);
        let mut instances = self.instances.borrow_mut();
        let instance = instances.get_mut(key).ok_or(Error::UnknownInstance(key))?;
        match result {
            Ok(tree) => {
                instance.tree = tree;
                Ok(())
            }
            Err(e) => {
                // keep the last committed subtree addressable
                instance.tree = previous;
                Err(e)
            }
        }
    }

    fn subtree_site(&self, site: Site) -> Site {
        Site {
            depth: site.depth + 1,
            ..site
        }
    }

    /// Releases every component in `node`, pre-order: effect cleanups run in
    /// slot order, hook slots are cleared and the arena entry is dropped.
    /// DOM nodes are left to the caller.
    pub(crate) fn unmount_tree(&self, node: VirtualElement) {
        match node {
            VirtualElement::Empty { .. } | VirtualElement::Text { .. } => {}
            VirtualElement::Tag { children, .. } => {
                for child in children {
                    self.unmount_tree(child);
                }
            }
            VirtualElement::Component { instance, .. } => {
                let removed = self.instances.borrow_mut().remove(instance);
                let Some(mut removed) = removed else {
                    return;
                };
                removed.flags.set(InstanceFlags::empty());
                log::debug!("unmount <{}> {:?}", removed.component.name, instance);
                removed.hooks.release();
                self.stats.borrow_mut().unmounts += 1;
                if let Some(tree) = removed.tree.take() {
                    self.unmount_tree(tree);
                }
            }
        }
    }
}

use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use slotmap::SlotMap;
use web_time::Instant;

use crate::component::{ComponentInstance, InstanceFlags, InstanceKey, Site};
use crate::dom::{Dom, NodeId};
use crate::element::{Element, VirtualElement};
use crate::error::{Error, Result};
use crate::props::Props;
use crate::reconcile::Insert;
use crate::scheduler::Scheduler;

/// Runtime configuration.
#[derive(Clone, Debug)]
pub struct RuntimeOptions {
    /// Frames taking longer than this are logged.
    pub frame_budget: Duration,
    /// Upper bound on frames [`Runtime::flush`] runs before giving up.
    pub max_flush_rounds: usize,
    /// Tag prop switching children to the ordered keyed diff.
    pub ordered_hint: &'static str,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            frame_budget: Duration::from_millis(16),
            max_flush_rounds: 64,
            ordered_hint: "ordered",
        }
    }
}

impl RuntimeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame_budget(mut self, budget: Duration) -> Self {
        self.frame_budget = budget;
        self
    }

    pub fn max_flush_rounds(mut self, rounds: usize) -> Self {
        self.max_flush_rounds = rounds;
        self
    }

    pub fn ordered_hint(mut self, prop: &'static str) -> Self {
        self.ordered_hint = prop;
        self
    }
}

/// Cumulative counters since the runtime was created.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RenderStats {
    pub renders: u64,
    pub bailouts: u64,
    pub memo_skips: u64,
    pub mounts: u64,
    pub unmounts: u64,
    pub dom_ops: u64,
    pub frames: u64,
}

/// Read-only view of one committed node, handed out by [`Runtime::walk`].
#[derive(Debug)]
pub enum NodeView<'a> {
    Empty,
    Text(&'a str),
    Tag {
        tag: &'a str,
        props: &'a Props,
        target: NodeId,
    },
    Component {
        name: &'static str,
        instance: InstanceKey,
        memo: bool,
        /// State, effect and memo slot counts.
        slots: (usize, usize, usize),
    },
}

/// Owns the committed trees, the component instance arena and the scheduler
/// for one [`Dom`].
///
/// ```rust
/// use hookdom_core::*;
///
/// let mut dom = MemoryDom::new();
/// let root = dom.create_element("main");
/// let rt = Runtime::new(dom);
///
/// rt.render(create_element("p", Props::new(), children!["hello"]), root)?;
/// rt.flush()?;
/// assert_eq!(rt.dom().to_html(root), "<main><p>hello</p></main>");
/// # Ok::<(), hookdom_core::Error>(())
/// ```
pub struct Runtime<D: Dom> {
    pub(crate) dom: RefCell<D>,
    pub(crate) instances: RefCell<SlotMap<InstanceKey, ComponentInstance>>,
    roots: RefCell<HashMap<NodeId, VirtualElement>>,
    pub(crate) scheduler: Rc<Scheduler>,
    pub(crate) options: RuntimeOptions,
    pub(crate) stats: RefCell<RenderStats>,
}

impl<D: Dom> Runtime<D> {
    pub fn new(dom: D) -> Self {
        Self::with_options(dom, RuntimeOptions::default())
    }

    pub fn with_options(dom: D, options: RuntimeOptions) -> Self {
        Self {
            dom: RefCell::new(dom),
            instances: RefCell::new(SlotMap::with_key()),
            roots: RefCell::new(HashMap::new()),
            scheduler: Scheduler::new(),
            options,
            stats: RefCell::new(RenderStats::default()),
        }
    }

    /// Mounts `element` into `container` on the first call, patches the
    /// previous commit on later calls.
    ///
    /// Effects queued by this pass run when the host drives the scheduler
    /// (or on [`Runtime::flush`]).
    pub fn render(&self, element: Element, container: NodeId) -> Result<()> {
        let previous = self.roots.borrow_mut().remove(&container);
        log::debug!(
            "{} into {:?}",
            if previous.is_some() { "patch" } else { "mount" },
            container
        );
        let site = Site {
            dom_parent: container,
            index: 0,
            depth: 0,
        };
        if let Some(committed) = self.reconcile(previous, Some(&element), site, Insert::Append)? {
            self.roots.borrow_mut().insert(container, committed);
        }
        Ok(())
    }

    /// Removes whatever was rendered into `container`, running every cleanup.
    pub fn unmount(&self, container: NodeId) -> Result<()> {
        let previous = self.roots.borrow_mut().remove(&container);
        let site = Site {
            dom_parent: container,
            index: 0,
            depth: 0,
        };
        self.reconcile(previous, None, site, Insert::Append)?;
        Ok(())
    }

    /// Runs tick-end tasks (layout effects) until the queue is empty.
    pub fn run_tick_end(&self) {
        self.scheduler.begin_tick();
        while let Some(task) = self.scheduler.pop_tick_end() {
            task();
        }
    }

    /// One animation frame: pending tick work, passive effects of earlier
    /// commits, then queued instance updates parents-first, then the layout
    /// effects those updates produced.
    pub fn run_frame(&self) -> Result<()> {
        let started = Instant::now();
        self.scheduler.begin_frame();
        self.run_tick_end();

        for task in self.scheduler.take_after_paint() {
            task();
        }

        let mut queued: Vec<(usize, InstanceKey)> = {
            let instances = self.instances.borrow();
            self.scheduler
                .take_updates()
                .into_iter()
                .filter_map(|key| instances.get(key).map(|i| (i.site.depth, key)))
                .collect()
        };
        queued.sort_by_key(|(depth, _)| *depth);
        let update_count = queued.len();

        for (_, key) in queued {
            // an ancestor's re-render this frame may already have covered it
            let still_queued = self
                .instances
                .borrow()
                .get(key)
                .is_some_and(|i| i.flags.get().contains(InstanceFlags::UPDATE_QUEUED));
            if still_queued {
                self.force_update(key)?;
            }
        }

        self.run_tick_end();

        self.stats.borrow_mut().frames += 1;
        let elapsed = started.elapsed();
        if elapsed > self.options.frame_budget {
            log::warn!(
                "frame took {:.2} ms ({} updates), budget {:.2} ms",
                elapsed.as_secs_f64() * 1000.0,
                update_count,
                self.options.frame_budget.as_secs_f64() * 1000.0
            );
        } else {
            log::trace!("frame done: {} updates", update_count);
        }
        Ok(())
    }

    /// Runs frames until no work is pending. Deterministic replacement for
    /// the microtask/animation-frame cadence in headless hosts and tests.
    pub fn flush(&self) -> Result<()> {
        for _ in 0..self.options.max_flush_rounds {
            if !self.scheduler.has_pending_work() {
                return Ok(());
            }
            self.run_frame()?;
        }
        if self.scheduler.has_pending_work() {
            return Err(Error::Unsettled(self.options.max_flush_rounds));
        }
        Ok(())
    }

    pub fn scheduler(&self) -> &Rc<Scheduler> {
        &self.scheduler
    }

    pub fn options(&self) -> &RuntimeOptions {
        &self.options
    }

    pub fn dom(&self) -> Ref<'_, D> {
        self.dom.borrow()
    }

    pub fn dom_mut(&self) -> RefMut<'_, D> {
        self.dom.borrow_mut()
    }

    pub fn stats(&self) -> RenderStats {
        *self.stats.borrow()
    }

    pub fn instance_count(&self) -> usize {
        self.instances.borrow().len()
    }

    /// Visits the committed tree of `container` depth-first, descending into
    /// component instances.
    pub fn walk(&self, container: NodeId, visit: &mut dyn FnMut(usize, NodeView<'_>)) {
        let roots = self.roots.borrow();
        if let Some(root) = roots.get(&container) {
            self.walk_node(root, 0, visit);
        }
    }

    fn walk_node(
        &self,
        node: &VirtualElement,
        depth: usize,
        visit: &mut dyn FnMut(usize, NodeView<'_>),
    ) {
        match node {
            VirtualElement::Empty { .. } => visit(depth, NodeView::Empty),
            VirtualElement::Text { value, .. } => visit(depth, NodeView::Text(value)),
            VirtualElement::Tag {
                tag,
                props,
                children,
                target,
                ..
            } => {
                visit(
                    depth,
                    NodeView::Tag {
                        tag,
                        props,
                        target: *target,
                    },
                );
                for child in children {
                    self.walk_node(child, depth + 1, visit);
                }
            }
            VirtualElement::Component {
                instance,
                component,
                ..
            } => {
                let instances = self.instances.borrow();
                let Some(record) = instances.get(*instance) else {
                    return;
                };
                visit(
                    depth,
                    NodeView::Component {
                        name: component.name(),
                        instance: *instance,
                        memo: component.is_memo(),
                        slots: record.hooks.slot_counts(),
                    },
                );
                if let Some(tree) = &record.tree {
                    self.walk_node(tree, depth + 1, visit);
                }
            }
        }
    }
}

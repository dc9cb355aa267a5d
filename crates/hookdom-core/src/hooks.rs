//! # Hooks
//!
//! Hooks keep per-instance state across renders. Each instance owns three
//! append-only slot lists (state, effects, memos) addressed by call order: the
//! Nth `use_state` call of a render always refers to the Nth state slot.
//! Cursors reset to zero at the start of every render, so hooks must be called
//! in the same order every time (no hooks inside conditions or loops).
//!
//! Every hook takes the explicit [`RenderContext`] handed to the component
//! function; there is no global "currently rendering" instance.
//!
//! ```rust
//! use hookdom_core::*;
//!
//! fn counter(cx: &mut RenderContext<'_>, _props: &Props) -> Element {
//!     let (count, set_count) = use_state(cx, || 0);
//!
//!     use_effect(cx, Some(&[count.into()]), move || {
//!         log::info!("count is now {count}");
//!         Dispose::none()
//!     });
//!
//!     create_element(
//!         "button",
//!         Props::new().on("onClick", move |_| set_count.update(|n| n + 1)),
//!         children![format!("clicked {count} times")],
//!     )
//! }
//! ```

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use smallvec::SmallVec;

use crate::component::{InstanceFlags, InstanceKey};
use crate::effects::Dispose;
use crate::props::Value;
use crate::scheduler::Scheduler;

type Deps = SmallVec<[Value; 4]>;

#[derive(Default)]
pub(crate) struct HookStore {
    state: Vec<Box<dyn Any>>,
    effects: Vec<EffectSlot>,
    memos: Vec<MemoSlot>,
    state_cursor: usize,
    effect_cursor: usize,
    memo_cursor: usize,
}

struct EffectSlot {
    deps: Option<Deps>,
    cleanup: Rc<RefCell<Option<Dispose>>>,
}

struct MemoSlot {
    deps: Deps,
    value: Box<dyn Any>,
}

impl HookStore {
    pub(crate) fn reset_cursors(&mut self) {
        self.state_cursor = 0;
        self.effect_cursor = 0;
        self.memo_cursor = 0;
    }

    /// Runs every effect cleanup in slot order, then releases all slots.
    pub(crate) fn release(&mut self) {
        for slot in &self.effects {
            let cleanup = slot.cleanup.borrow_mut().take();
            if let Some(cleanup) = cleanup {
                cleanup.run();
            }
        }
        self.state.clear();
        self.effects.clear();
        self.memos.clear();
        self.reset_cursors();
    }

    pub(crate) fn slot_counts(&self) -> (usize, usize, usize) {
        (self.state.len(), self.effects.len(), self.memos.len())
    }
}

fn deps_changed(prev: Option<&[Value]>, next: Option<&[Value]>) -> bool {
    match (prev, next) {
        (Some(prev), Some(next)) => {
            prev.len() != next.len() || prev.iter().zip(next).any(|(a, b)| !a.same(b))
        }
        _ => true,
    }
}

/// Handle to the instance being rendered, threaded into every hook call.
pub struct RenderContext<'a> {
    pub(crate) hooks: &'a mut HookStore,
    pub(crate) instance: InstanceKey,
    pub(crate) flags: &'a Rc<Cell<InstanceFlags>>,
    pub(crate) scheduler: &'a Rc<Scheduler>,
}

impl RenderContext<'_> {
    pub fn instance(&self) -> InstanceKey {
        self.instance
    }

    /// Throttled re-render trigger for this instance (a `forceUpdate`).
    pub fn updater(&self) -> Updater {
        Updater {
            instance: self.instance,
            flags: self.flags.clone(),
            scheduler: Rc::downgrade(self.scheduler),
        }
    }
}

#[derive(Clone)]
pub struct Updater {
    instance: InstanceKey,
    flags: Rc<Cell<InstanceFlags>>,
    scheduler: Weak<Scheduler>,
}

impl Updater {
    pub fn request(&self) {
        if let Some(scheduler) = self.scheduler.upgrade() {
            scheduler.schedule_update(self.instance, &self.flags);
        }
    }
}

/// Setter returned by [`use_state`]. Created once per slot; clones share it.
pub struct SetState<T> {
    cell: Rc<RefCell<T>>,
    updater: Updater,
}

impl<T> Clone for SetState<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
            updater: self.updater.clone(),
        }
    }
}

impl<T: Clone + PartialEq + 'static> SetState<T> {
    pub fn get(&self) -> T {
        self.cell.borrow().clone()
    }

    /// Stores `value` and schedules a re-render unless it equals the current
    /// value.
    pub fn set(&self, value: T) {
        if *self.cell.borrow() == value {
            return;
        }
        *self.cell.borrow_mut() = value;
        self.updater.request();
    }

    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let next = {
            let current = self.cell.borrow();
            f(&current)
        };
        self.set(next);
    }

    pub fn ptr_eq(&self, other: &SetState<T>) -> bool {
        Rc::ptr_eq(&self.cell, &other.cell)
    }
}

pub fn use_state<T: Clone + PartialEq + 'static>(
    cx: &mut RenderContext<'_>,
    init: impl FnOnce() -> T,
) -> (T, SetState<T>) {
    let cursor = cx.hooks.state_cursor;
    cx.hooks.state_cursor += 1;

    if let Some(slot) = cx.hooks.state.get(cursor) {
        if let Some(setter) = slot.downcast_ref::<SetState<T>>() {
            return (setter.get(), setter.clone());
        }
        log::warn!(
            "use_state: slot {} type changed; replacing. \
             Hooks must be called in the same order on every render.",
            cursor
        );
    }

    let setter = SetState {
        cell: Rc::new(RefCell::new(init())),
        updater: cx.updater(),
    };
    let boxed: Box<dyn Any> = Box::new(setter.clone());
    if cursor < cx.hooks.state.len() {
        cx.hooks.state[cursor] = boxed;
    } else {
        cx.hooks.state.push(boxed);
    }
    (setter.get(), setter)
}

#[derive(Clone, Copy)]
enum EffectTiming {
    /// Before paint, at the end of the current tick.
    Layout,
    /// After the next frame.
    Passive,
}

/// Passive effect: runs after the next frame.
///
/// `deps == None` re-runs after every render, `Some(&[])` only once.
pub fn use_effect<F>(cx: &mut RenderContext<'_>, deps: Option<&[Value]>, f: F)
where
    F: FnOnce() -> Dispose + 'static,
{
    effect_hook(cx, deps, f, EffectTiming::Passive)
}

/// Layout effect: runs at the end of the current tick, before paint.
pub fn use_layout_effect<F>(cx: &mut RenderContext<'_>, deps: Option<&[Value]>, f: F)
where
    F: FnOnce() -> Dispose + 'static,
{
    effect_hook(cx, deps, f, EffectTiming::Layout)
}

fn effect_hook<F>(cx: &mut RenderContext<'_>, deps: Option<&[Value]>, f: F, timing: EffectTiming)
where
    F: FnOnce() -> Dispose + 'static,
{
    let cursor = cx.hooks.effect_cursor;
    cx.hooks.effect_cursor += 1;

    if cursor >= cx.hooks.effects.len() {
        cx.hooks.effects.push(EffectSlot {
            deps: None,
            cleanup: Rc::new(RefCell::new(None)),
        });
    } else if !deps_changed(cx.hooks.effects[cursor].deps.as_deref(), deps) {
        return;
    }
    let slot = &mut cx.hooks.effects[cursor];
    slot.deps = deps.map(|d| d.iter().cloned().collect());

    let cleanup = slot.cleanup.clone();
    let flags = cx.flags.clone();
    let task = move || {
        if !flags.get().contains(InstanceFlags::MOUNTED) {
            return;
        }
        let previous = cleanup.borrow_mut().take();
        if let Some(previous) = previous {
            previous.run();
        }
        let next = f();
        *cleanup.borrow_mut() = Some(next);
    };

    match timing {
        EffectTiming::Layout => cx.scheduler.queue_tick_end(task),
        EffectTiming::Passive => cx.scheduler.queue_after_paint(task),
    }
}

/// Recomputes `f` only when a dependency changed; otherwise returns the
/// cached value.
pub fn use_memo<T: Clone + 'static>(
    cx: &mut RenderContext<'_>,
    deps: &[Value],
    f: impl FnOnce() -> T,
) -> T {
    let cursor = cx.hooks.memo_cursor;
    cx.hooks.memo_cursor += 1;

    if let Some(slot) = cx.hooks.memos.get(cursor)
        && !deps_changed(Some(slot.deps.as_slice()), Some(deps))
    {
        if let Some(v) = slot.value.downcast_ref::<T>() {
            return v.clone();
        }
        log::warn!(
            "use_memo: slot {} type changed; recomputing. \
             Hooks must be called in the same order on every render.",
            cursor
        );
    }

    let value = f();
    let slot = MemoSlot {
        deps: deps.iter().cloned().collect(),
        value: Box::new(value.clone()),
    };
    if cursor < cx.hooks.memos.len() {
        cx.hooks.memos[cursor] = slot;
    } else {
        cx.hooks.memos.push(slot);
    }
    value
}

/// `use_memo(cx, deps, || Rc::new(f))`: a callback whose identity only
/// changes with its dependencies.
pub fn use_callback<F: 'static>(cx: &mut RenderContext<'_>, deps: &[Value], f: F) -> Rc<F> {
    use_memo(cx, deps, || Rc::new(f))
}

/// Mutable box that stays the same across renders.
pub fn use_ref<T: 'static>(cx: &mut RenderContext<'_>, init: impl FnOnce() -> T) -> Ref<T> {
    use_memo(cx, &[], || Ref::new(init()))
}

/// Shared mutable box (`{ current }`).
pub struct Ref<T>(Rc<RefCell<T>>);

impl<T> Clone for Ref<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Ref<T> {
    pub fn new(value: T) -> Self {
        Self(Rc::new(RefCell::new(value)))
    }

    pub fn set(&self, value: T) {
        *self.0.borrow_mut() = value;
    }

    pub fn borrow(&self) -> std::cell::Ref<'_, T> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> std::cell::RefMut<'_, T> {
        self.0.borrow_mut()
    }

    pub fn ptr_eq(&self, other: &Ref<T>) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl<T: Clone> Ref<T> {
    pub fn current(&self) -> T {
        self.0.borrow().clone()
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Ref<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ref").field("current", &self.0.borrow()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::on_unmount;
    use slotmap::KeyData;

    struct Harness {
        hooks: HookStore,
        flags: Rc<Cell<InstanceFlags>>,
        scheduler: Rc<Scheduler>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                hooks: HookStore::default(),
                flags: Rc::new(Cell::new(InstanceFlags::MOUNTED)),
                scheduler: Scheduler::new(),
            }
        }

        fn render<R>(&mut self, f: impl FnOnce(&mut RenderContext<'_>) -> R) -> R {
            self.hooks.reset_cursors();
            let mut cx = RenderContext {
                hooks: &mut self.hooks,
                instance: InstanceKey::from(KeyData::from_ffi(1)),
                flags: &self.flags,
                scheduler: &self.scheduler,
            };
            f(&mut cx)
        }

        fn drain(&self) {
            while let Some(task) = self.scheduler.pop_tick_end() {
                task();
            }
            for task in self.scheduler.take_after_paint() {
                task();
            }
        }
    }

    #[test]
    fn memo_returns_cached_value_until_deps_change() {
        let mut h = Harness::new();
        let a = Value::any(1u8);
        let b = Value::from("b");
        let calls = Rc::new(Cell::new(0));

        let compute = |calls: &Rc<Cell<i32>>| {
            calls.set(calls.get() + 1);
            Rc::new(vec![1, 2, 3])
        };

        let first = h.render(|cx| use_memo(cx, &[a.clone(), b.clone()], || compute(&calls)));
        let second = h.render(|cx| use_memo(cx, &[a.clone(), b.clone()], || compute(&calls)));
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(calls.get(), 1);

        let third = h.render(|cx| use_memo(cx, &[Value::any(1u8), b.clone()], || compute(&calls)));
        assert!(!Rc::ptr_eq(&first, &third));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn setter_is_stable_and_ignores_equal_values() {
        let mut h = Harness::new();
        let (v, set) = h.render(|cx| use_state(cx, || 5));
        assert_eq!(v, 5);

        set.set(5);
        assert!(!h.scheduler.has_pending_work());

        set.set(6);
        assert!(h.flags.get().contains(InstanceFlags::UPDATE_QUEUED));

        let (v, again) = h.render(|cx| use_state(cx, || 0));
        assert_eq!(v, 6);
        assert!(set.ptr_eq(&again));
    }

    #[test]
    fn effect_cleanup_runs_before_next_invocation() {
        let mut h = Harness::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        for dep in [1, 1, 2] {
            let log = log.clone();
            h.render(|cx| {
                use_effect(cx, Some(&[dep.into()]), move || {
                    log.borrow_mut().push(format!("run {dep}"));
                    let log = log.clone();
                    on_unmount(move || log.borrow_mut().push(format!("cleanup {dep}")))
                })
            });
            h.drain();
        }

        assert_eq!(*log.borrow(), vec!["run 1", "cleanup 1", "run 2"]);

        h.hooks.release();
        assert_eq!(log.borrow().last().map(String::as_str), Some("cleanup 2"));
    }

    #[test]
    fn effect_without_deps_runs_every_render() {
        let mut h = Harness::new();
        let runs = Rc::new(Cell::new(0));
        for _ in 0..3 {
            let runs = runs.clone();
            h.render(|cx| {
                use_layout_effect(cx, None, move || {
                    runs.set(runs.get() + 1);
                    Dispose::none()
                })
            });
            h.drain();
        }
        assert_eq!(runs.get(), 3);
    }

    #[test]
    fn effects_of_unmounted_instances_are_dropped() {
        let mut h = Harness::new();
        let ran = Rc::new(Cell::new(false));
        {
            let ran = ran.clone();
            h.render(|cx| {
                use_effect(cx, Some(&[]), move || {
                    ran.set(true);
                    Dispose::none()
                })
            });
        }
        h.flags.set(InstanceFlags::empty());
        h.drain();
        assert!(!ran.get());
    }

    #[test]
    fn callback_identity_follows_its_deps() {
        let mut h = Harness::new();
        let mut seen = Vec::new();
        for dep in [1i64, 1, 2] {
            seen.push(h.render(|cx| use_callback(cx, &[dep.into()], move |x: i64| x + dep)));
        }
        assert!(Rc::ptr_eq(&seen[0], &seen[1]));
        assert!(!Rc::ptr_eq(&seen[1], &seen[2]));
        assert_eq!(seen[1](10), 11);
        assert_eq!(seen[2](10), 12);
    }

    #[test]
    fn ref_is_stable_across_renders() {
        let mut h = Harness::new();
        let first = h.render(|cx| use_ref(cx, || 0));
        first.set(41);
        let second = h.render(|cx| use_ref(cx, || 0));
        assert!(first.ptr_eq(&second));
        assert_eq!(second.current(), 41);
    }
}

//! Deferred work queues.
//!
//! Three entry points, all cooperative on the single UI thread:
//!
//! - [`Scheduler::queue_tick_end`]: after the current call stack, before
//!   paint (layout effects).
//! - [`Scheduler::queue_after_paint`]: on the next frame (passive effects).
//! - [`Scheduler::schedule_update`]: per-instance re-render throttled to one
//!   per frame; repeated requests inside a frame coalesce.
//!
//! The scheduler only queues. A host drives it through
//! [`Runtime::run_tick_end`](crate::Runtime::run_tick_end) and
//! [`Runtime::run_frame`](crate::Runtime::run_frame), optionally woken through
//! [`Scheduler::set_waker`]; headless code calls
//! [`Runtime::flush`](crate::Runtime::flush).

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use crate::component::{InstanceFlags, InstanceKey};

pub(crate) type Task = Box<dyn FnOnce()>;

/// What a host is asked to schedule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Wake {
    /// Call `run_tick_end` once the current call stack unwinds (microtask).
    Tick,
    /// Call `run_frame` on the next animation frame.
    Frame,
}

#[derive(Default)]
pub struct Scheduler {
    tick_end: RefCell<VecDeque<Task>>,
    after_paint: RefCell<VecDeque<Task>>,
    updates: RefCell<Vec<InstanceKey>>,
    tick_requested: Cell<bool>,
    frame_requested: Cell<bool>,
    waker: RefCell<Option<Rc<dyn Fn(Wake)>>>,
}

impl Scheduler {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Installs the host hook asked to run a tick or a frame. It is called at
    /// most once per pending batch.
    pub fn set_waker(&self, waker: impl Fn(Wake) + 'static) {
        *self.waker.borrow_mut() = Some(Rc::new(waker));
    }

    pub fn queue_tick_end(&self, task: impl FnOnce() + 'static) {
        self.tick_end.borrow_mut().push_back(Box::new(task));
        self.wake(Wake::Tick);
    }

    pub fn queue_after_paint(&self, task: impl FnOnce() + 'static) {
        self.after_paint.borrow_mut().push_back(Box::new(task));
        self.wake(Wake::Frame);
    }

    /// Queues a re-render of `instance` for the next frame. Requests for an
    /// instance that is already queued, or no longer mounted, are dropped.
    pub fn schedule_update(&self, instance: InstanceKey, flags: &Cell<InstanceFlags>) {
        let current = flags.get();
        if !current.contains(InstanceFlags::MOUNTED)
            || current.contains(InstanceFlags::UPDATE_QUEUED)
        {
            return;
        }
        flags.set(current | InstanceFlags::UPDATE_QUEUED);
        self.updates.borrow_mut().push(instance);
        log::trace!("update queued for {:?}", instance);
        self.wake(Wake::Frame);
    }

    pub fn has_pending_work(&self) -> bool {
        !self.tick_end.borrow().is_empty()
            || !self.after_paint.borrow().is_empty()
            || !self.updates.borrow().is_empty()
    }

    pub fn pending_updates(&self) -> usize {
        self.updates.borrow().len()
    }

    fn wake(&self, wake: Wake) {
        let requested = match wake {
            Wake::Tick => &self.tick_requested,
            Wake::Frame => &self.frame_requested,
        };
        if requested.replace(true) {
            return;
        }
        let waker = self.waker.borrow().clone();
        if let Some(waker) = waker {
            waker(wake);
        }
    }

    pub(crate) fn begin_tick(&self) {
        self.tick_requested.set(false);
    }

    pub(crate) fn begin_frame(&self) {
        self.frame_requested.set(false);
    }

    pub(crate) fn pop_tick_end(&self) -> Option<Task> {
        self.tick_end.borrow_mut().pop_front()
    }

    /// Everything queued for after-paint so far; later requests wait for the
    /// following frame.
    pub(crate) fn take_after_paint(&self) -> VecDeque<Task> {
        std::mem::take(&mut *self.after_paint.borrow_mut())
    }

    pub(crate) fn take_updates(&self) -> Vec<InstanceKey> {
        std::mem::take(&mut *self.updates.borrow_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::KeyData;

    #[test]
    fn waker_fires_once_per_batch() {
        let scheduler = Scheduler::new();
        let wakes = Rc::new(RefCell::new(Vec::new()));
        {
            let wakes = wakes.clone();
            scheduler.set_waker(move |w| wakes.borrow_mut().push(w));
        }

        scheduler.queue_tick_end(|| {});
        scheduler.queue_tick_end(|| {});
        scheduler.queue_after_paint(|| {});
        assert_eq!(*wakes.borrow(), vec![Wake::Tick, Wake::Frame]);

        scheduler.begin_tick();
        scheduler.queue_tick_end(|| {});
        assert_eq!(wakes.borrow().len(), 3);
    }

    #[test]
    fn updates_coalesce_per_instance() {
        let scheduler = Scheduler::new();
        let key = InstanceKey::from(KeyData::from_ffi(7));
        let flags = Cell::new(InstanceFlags::MOUNTED);

        scheduler.schedule_update(key, &flags);
        scheduler.schedule_update(key, &flags);
        assert_eq!(scheduler.pending_updates(), 1);

        let unmounted = Cell::new(InstanceFlags::empty());
        scheduler.schedule_update(InstanceKey::from(KeyData::from_ffi(8)), &unmounted);
        assert_eq!(scheduler.take_updates(), vec![key]);
    }
}

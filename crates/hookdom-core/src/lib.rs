//! # Elements, Components and Hooks
//!
//! Hookdom renders a tree of immutable element templates into a document and
//! keeps it up to date as component state changes. There are four pieces:
//!
//! - [`Element`]: cheap, pointer-compared template built with
//!   [`create_element`].
//! - [`Component`]: a named `fn(&mut RenderContext, &Props) -> Element`.
//! - hooks (`use_state`, `use_effect`, `use_memo`, ...): per-instance state
//!   addressed by call order.
//! - [`Runtime`]: reconciles templates against the committed tree, commits the
//!   difference through a [`Dom`], and drives the update scheduler.
//!
//! ## Elements
//!
//! ```rust
//! use hookdom_core::*;
//!
//! let el = create_element(
//!     "a",
//!     Props::new().with("href", "/docs").with("className", "link"),
//!     children!["Read the docs"],
//! );
//! assert!(matches!(el.kind(), ElementKind::Tag { .. }));
//! ```
//!
//! Props starting with `on` plus an uppercase letter are event handlers,
//! `key` identifies siblings, `ref` receives the created DOM node, `style`
//! replaces the inline style and `className`/`value` are written as
//! properties. Everything else becomes an attribute.
//!
//! ## Components and hooks
//!
//! ```rust
//! use hookdom_core::*;
//!
//! fn counter(cx: &mut RenderContext<'_>, props: &Props) -> Element {
//!     let step = props.get_int("step").unwrap_or(1);
//!     let (count, set_count) = use_state(cx, || 0i64);
//!
//!     create_element(
//!         "button",
//!         Props::new().on("onClick", move |_| set_count.update(|n| n + step)),
//!         children![count.to_string()],
//!     )
//! }
//!
//! const COUNTER: Component = Component::new("Counter", counter);
//!
//! let mut dom = MemoryDom::new();
//! let root = dom.create_element("main");
//! let rt = Runtime::new(dom);
//! rt.render(create_element(COUNTER, Props::new().with("step", 2), children![]), root)?;
//!
//! let button = rt.dom().find(root, "button").unwrap();
//! rt.dispatch(button, "click");
//! rt.flush()?;
//! assert_eq!(rt.dom().text_content(root), "2");
//! # Ok::<(), hookdom_core::Error>(())
//! ```
//!
//! - Hooks take the explicit `cx` and must run in the same order on every
//!   render.
//! - Setting state never renders synchronously: the instance is queued and
//!   re-rendered at most once per frame, parents before children.
//! - A component that returns the exact same `Element` as last time (for
//!   example one cached with `use_memo`) skips the diff entirely.
//! - [`memo`] components skip re-rendering when their props are shallowly
//!   equal.
//!
//! ## Effects and cleanup
//!
//! `use_layout_effect` runs at the end of the current tick, `use_effect` after
//! the next frame. Both may return a [`Dispose`] that runs before the next
//! invocation and on unmount.
//!
//! ## Driving the runtime
//!
//! The scheduler only queues work. Browser hosts install a waker and call
//! [`Runtime::run_tick_end`] / [`Runtime::run_frame`] from a microtask and
//! `requestAnimationFrame`; headless hosts and tests call [`Runtime::flush`].

pub mod commit;
pub mod component;
pub mod dom;
pub mod effects;
pub mod element;
pub mod error;
pub mod hooks;
pub mod memory;
pub mod prelude;
pub mod props;
pub mod reconcile;
pub mod runtime;
pub mod scheduler;

pub use component::*;
pub use dom::*;
pub use effects::*;
pub use element::*;
pub use error::*;
pub use hooks::*;
pub use memory::*;
pub use props::*;
pub use runtime::*;
pub use scheduler::*;

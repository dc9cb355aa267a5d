//! Browser host for hookdom.
//!
//! On `wasm32` this crate provides [`WebDom`](web::WebDom), a
//! [`Dom`](hookdom_core::Dom) over `web-sys`, and [`run_web_app`](web::run_web_app),
//! which mounts a root element and drives the scheduler from
//! `queueMicrotask` (through `spawn_local`) and `requestAnimationFrame`.
//!
//! ```rust,ignore
//! use hookdom_core::*;
//! use wasm_bindgen::prelude::*;
//!
//! #[wasm_bindgen(start)]
//! pub fn start() -> Result<(), JsValue> {
//!     hookdom_web::run_web_app(
//!         || create_element("h1", Props::new(), children!["hello"]),
//!         hookdom_web::WebOptions::new(Some("app".into())),
//!     )
//! }
//! ```

#[cfg(target_arch = "wasm32")]
pub mod web;

#[cfg(target_arch = "wasm32")]
pub use web::*;

//! Web host (wasm32): a [`Dom`] over web-sys plus microtask/animation-frame
//! scheduling.
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use slotmap::{Key as _, KeyData, SecondaryMap, SlotMap};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

use hookdom_core::{
    Dom, DomError, Element, Event, Handler, NodeId, Runtime, RuntimeOptions, Value, Wake,
};
use hookdom_devtools::Inspector;

/// Expando property carrying a node's handle, for sibling lookups.
const ID_PROP: &str = "__hookdomId";

type Listener = Closure<dyn FnMut(web_sys::Event)>;

/// Listener wired for one `(event, handler)` pair on a node.
struct Wired {
    event: String,
    handler: *const (),
    listener: Listener,
}

fn js_err(e: JsValue) -> DomError {
    DomError::Host(e.as_string().unwrap_or_else(|| format!("{e:?}")))
}

fn to_js(value: &Value) -> JsValue {
    match value {
        Value::Str(s) => JsValue::from_str(s),
        Value::Int(i) => JsValue::from_f64(*i as f64),
        Value::Float(f) => JsValue::from_f64(*f),
        Value::Bool(b) => JsValue::from_bool(*b),
        _ => JsValue::UNDEFINED,
    }
}

/// Current value of a form control.
fn form_value(target: &web_sys::EventTarget) -> Option<String> {
    if let Some(input) = target.dyn_ref::<web_sys::HtmlInputElement>() {
        Some(input.value())
    } else if let Some(area) = target.dyn_ref::<web_sys::HtmlTextAreaElement>() {
        Some(area.value())
    } else {
        target
            .dyn_ref::<web_sys::HtmlSelectElement>()
            .map(|select| select.value())
    }
}

pub struct WebDom {
    document: web_sys::Document,
    nodes: SlotMap<NodeId, web_sys::Node>,
    listeners: SecondaryMap<NodeId, Vec<Wired>>,
}

impl WebDom {
    pub fn new(document: web_sys::Document) -> Self {
        Self {
            document,
            nodes: SlotMap::with_key(),
            listeners: SecondaryMap::new(),
        }
    }

    /// Registers an existing document node, typically the mount container.
    pub fn adopt(&mut self, node: web_sys::Node) -> NodeId {
        let id = self.nodes.insert(node);
        if let Some(node) = self.nodes.get(id) {
            let _ = js_sys::Reflect::set(
                node,
                &JsValue::from_str(ID_PROP),
                &JsValue::from_str(&id.data().as_ffi().to_string()),
            );
        }
        id
    }

    pub fn node(&self, id: NodeId) -> Result<&web_sys::Node, DomError> {
        self.nodes.get(id).ok_or(DomError::UnknownNode(id))
    }

    fn element(&self, id: NodeId) -> Result<&web_sys::Element, DomError> {
        self.node(id)?
            .dyn_ref::<web_sys::Element>()
            .ok_or(DomError::NotAnElement(id))
    }

    fn id_of(&self, node: &web_sys::Node) -> Option<NodeId> {
        let raw = js_sys::Reflect::get(node, &JsValue::from_str(ID_PROP))
            .ok()?
            .as_string()?;
        let id = NodeId::from(KeyData::from_ffi(raw.parse().ok()?));
        self.nodes.contains_key(id).then_some(id)
    }

    /// Handles of `root` and its adopted descendants.
    fn subtree_ids(&self, root: &web_sys::Node) -> Vec<NodeId> {
        let mut ids = Vec::new();
        let mut stack = vec![root.clone()];
        while let Some(node) = stack.pop() {
            ids.extend(self.id_of(&node));
            let mut child = node.first_child();
            while let Some(c) = child {
                child = c.next_sibling();
                stack.push(c);
            }
        }
        ids
    }

    /// Unhooks the listeners of `ids` and drops their handles.
    fn forget(&mut self, ids: &[NodeId]) {
        let prop = JsValue::from_str(ID_PROP);
        for id in ids {
            let Some(node) = self.nodes.remove(*id) else {
                continue;
            };
            for wired in self.listeners.remove(*id).unwrap_or_default() {
                let _ = node.remove_event_listener_with_callback(
                    &wired.event,
                    wired.listener.as_ref().unchecked_ref(),
                );
            }
            let _ = js_sys::Reflect::delete_property(&node, &prop);
        }
        log::trace!("released {} nodes, {} held", ids.len(), self.nodes.len());
    }
}

impl Dom for WebDom {
    fn create_element(&mut self, tag: &str) -> NodeId {
        let node: web_sys::Node = match self.document.create_element(tag) {
            Ok(el) => el.into(),
            Err(e) => {
                log::error!("create_element <{tag}> failed: {e:?}; using a placeholder");
                self.document.create_text_node("").into()
            }
        };
        self.adopt(node)
    }

    fn create_text_node(&mut self, text: &str) -> NodeId {
        let node: web_sys::Node = self.document.create_text_node(text).into();
        self.adopt(node)
    }

    fn set_text(&mut self, node: NodeId, text: &str) -> Result<(), DomError> {
        let target = self.node(node)?.clone();
        // textContent on an element drops its children
        let mut dropped = Vec::new();
        let mut child = target.first_child();
        while let Some(c) = child {
            child = c.next_sibling();
            dropped.extend(self.subtree_ids(&c));
        }
        self.forget(&dropped);
        target.set_text_content(Some(text));
        Ok(())
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.node(parent)?
            .append_child(self.node(child)?)
            .map(drop)
            .map_err(js_err)
    }

    fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), DomError> {
        let reference = reference.map(|r| self.node(r)).transpose()?;
        self.node(parent)?
            .insert_before(self.node(child)?, reference)
            .map(drop)
            .map_err(js_err)
    }

    fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.node(parent)?
            .remove_child(self.node(child)?)
            .map(drop)
            .map_err(js_err)
    }

    fn replace_child(
        &mut self,
        parent: NodeId,
        new_child: NodeId,
        old_child: NodeId,
    ) -> Result<(), DomError> {
        self.node(parent)?
            .replace_child(self.node(new_child)?, self.node(old_child)?)
            .map(drop)
            .map_err(js_err)
    }

    fn first_child(&self, parent: NodeId) -> Result<Option<NodeId>, DomError> {
        Ok(self.node(parent)?.first_child().and_then(|n| self.id_of(&n)))
    }

    fn next_sibling(&self, node: NodeId) -> Result<Option<NodeId>, DomError> {
        Ok(self.node(node)?.next_sibling().and_then(|n| self.id_of(&n)))
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        self.element(node)?
            .set_attribute(name, value)
            .map_err(js_err)
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) -> Result<(), DomError> {
        self.element(node)?.remove_attribute(name).map_err(js_err)
    }

    fn set_property(&mut self, node: NodeId, name: &str, value: &Value) -> Result<(), DomError> {
        let el = self.element(node)?;
        let text = value.to_attr().unwrap_or_default();
        match name {
            "className" => el.set_class_name(&text),
            "value" => {
                if let Some(input) = el.dyn_ref::<web_sys::HtmlInputElement>() {
                    input.set_value(&text);
                } else if let Some(area) = el.dyn_ref::<web_sys::HtmlTextAreaElement>() {
                    area.set_value(&text);
                } else if let Some(select) = el.dyn_ref::<web_sys::HtmlSelectElement>() {
                    select.set_value(&text);
                } else {
                    el.set_attribute("value", &text).map_err(js_err)?;
                }
            }
            _ => {
                js_sys::Reflect::set(el, &JsValue::from_str(name), &to_js(value))
                    .map_err(js_err)?;
            }
        }
        Ok(())
    }

    fn set_style(&mut self, node: NodeId, css: &str) -> Result<(), DomError> {
        let el = self.element(node)?;
        match el.dyn_ref::<web_sys::HtmlElement>() {
            Some(html) => html.style().set_css_text(css),
            // svg and friends
            None => el.set_attribute("style", css).map_err(js_err)?,
        }
        Ok(())
    }

    fn add_event_listener(
        &mut self,
        node: NodeId,
        event: &str,
        handler: &Handler,
    ) -> Result<(), DomError> {
        let handler_ptr = Rc::as_ptr(handler) as *const ();
        let listener: Listener = {
            let handler = handler.clone();
            let name = event.to_string();
            Closure::new(move |ev: web_sys::Event| {
                let mut event = Event::new(name.clone(), node);
                if let Some(value) = ev.target().and_then(|t| form_value(&t)) {
                    event = event.with_value(value);
                }
                handler(&event);
            })
        };
        self.node(node)?
            .add_event_listener_with_callback(event, listener.as_ref().unchecked_ref())
            .map_err(js_err)?;
        let wired = Wired {
            event: event.to_string(),
            handler: handler_ptr,
            listener,
        };
        match self.listeners.get_mut(node) {
            Some(list) => list.push(wired),
            None => {
                self.listeners.insert(node, vec![wired]);
            }
        }
        Ok(())
    }

    fn remove_event_listener(
        &mut self,
        node: NodeId,
        event: &str,
        handler: &Handler,
    ) -> Result<(), DomError> {
        let handler_ptr = Rc::as_ptr(handler) as *const ();
        let Some(list) = self.listeners.get_mut(node) else {
            return Ok(());
        };
        let Some(index) = list
            .iter()
            .position(|w| w.event == event && w.handler == handler_ptr)
        else {
            return Ok(());
        };
        let wired = list.remove(index);
        self.node(node)?
            .remove_event_listener_with_callback(event, wired.listener.as_ref().unchecked_ref())
            .map_err(js_err)
    }

    fn release(&mut self, node: NodeId) {
        let Some(root) = self.nodes.get(node).cloned() else {
            return;
        };
        if let Some(parent) = root.parent_node() {
            let _ = parent.remove_child(&root);
        }
        let ids = self.subtree_ids(&root);
        self.forget(&ids);
    }
}

#[wasm_bindgen]
pub struct WebOptions {
    container_id: String,
    hud: bool,
}

#[wasm_bindgen]
impl WebOptions {
    #[wasm_bindgen(constructor)]
    pub fn new(container_id: Option<String>) -> Self {
        Self {
            container_id: container_id.unwrap_or_else(|| "app".to_string()),
            hud: false,
        }
    }

    #[wasm_bindgen(getter)]
    pub fn container_id(&self) -> String {
        self.container_id.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn hud(&self) -> bool {
        self.hud
    }

    /// Logs the devtools HUD line after every frame.
    #[wasm_bindgen(setter)]
    pub fn set_hud(&mut self, v: bool) {
        self.hud = v;
    }
}

/// A runtime mounted into a document element.
pub struct WebApp {
    pub runtime: Runtime<WebDom>,
    pub container: NodeId,
    inspector: RefCell<Inspector>,
}

impl WebApp {
    fn frame(&self) {
        if let Err(e) = self.runtime.run_frame() {
            log::error!("frame failed: {e}");
        }
        if let Some(line) = self.inspector.borrow_mut().frame(&self.runtime) {
            log::info!("{line}");
        }
    }
}

thread_local! {
    static APPS: RefCell<Vec<Rc<WebApp>>> = const { RefCell::new(Vec::new()) };
}

fn schedule(app: Weak<WebApp>, wake: Wake) {
    match wake {
        Wake::Tick => spawn_local(async move {
            if let Some(app) = app.upgrade() {
                app.runtime.run_tick_end();
            }
        }),
        Wake::Frame => {
            let Some(window) = web_sys::window() else {
                return;
            };
            let callback = Closure::once_into_js(move || {
                if let Some(app) = app.upgrade() {
                    app.frame();
                }
            });
            if let Err(e) = window.request_animation_frame(callback.unchecked_ref()) {
                log::error!("requestAnimationFrame failed: {e:?}");
            }
        }
    }
}

/// Mounts `root` into the element with `options.container_id`. The caller
/// keeps the returned app alive; scheduled work is dropped once it is gone.
pub fn mount(root: Element, options: &WebOptions) -> Result<Rc<WebApp>, JsValue> {
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let container = document
        .get_element_by_id(&options.container_id)
        .ok_or_else(|| JsValue::from_str(&format!("no element #{}", options.container_id)))?;

    let mut dom = WebDom::new(document);
    let container = dom.adopt(container.into());
    let app = Rc::new(WebApp {
        runtime: Runtime::with_options(dom, RuntimeOptions::default()),
        container,
        inspector: RefCell::new(Inspector::new()),
    });
    if options.hud {
        app.inspector.borrow_mut().hud.toggle_inspector();
    }

    let weak = Rc::downgrade(&app);
    app.runtime
        .scheduler()
        .set_waker(move |wake| schedule(weak.clone(), wake));

    log::info!("mounting into #{}", options.container_id);
    app.runtime
        .render(root, container)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    Ok(app)
}

/// Entry point for wasm binaries: installs console logging and the panic
/// hook, then mounts `root` for the lifetime of the page.
pub fn run_web_app(root: impl FnOnce() -> Element, options: WebOptions) -> Result<(), JsValue> {
    std::panic::set_hook(Box::new(console_error_panic_hook::hook));
    let _ = console_log::init_with_level(log::Level::Info);

    let app = mount(root(), &options)?;
    APPS.with(|apps| apps.borrow_mut().push(app));
    Ok(())
}

//! # Virtual elements
//!
//! Two sum types describe UI shape:
//!
//! - [`Element`] is a template produced by [`create_element`]. It is cheap to
//!   clone and compared by pointer, which is what makes bail-out possible: a
//!   component returning the very same `Element` as last time skips the diff.
//! - [`VirtualElement`] is the committed tree. Every node remembers the
//!   template it was built from and the DOM node it patches.
//!
//! ```rust
//! use hookdom_core::*;
//!
//! let list = create_element(
//!     "ul",
//!     Props::new().with("className", "todos"),
//!     children![
//!         create_element("li", Props::new(), children!["one"]),
//!         None::<Element>,
//!         create_element("li", Props::new(), children!["two"]),
//!     ],
//! );
//! // the interior `None` keeps its position as an `Empty` placeholder
//! if let ElementKind::Tag { children, .. } = list.kind() {
//!     assert_eq!(children.len(), 3);
//! }
//! ```

use std::fmt;
use std::rc::Rc;

use crate::component::{Component, InstanceKey};
use crate::dom::NodeId;
use crate::props::{Key, Props, Value};

#[derive(Clone)]
pub struct Element(Rc<ElementKind>);

pub enum ElementKind {
    /// Placeholder; commits to an empty text node.
    Empty,
    Text(Rc<str>),
    Tag {
        tag: Rc<str>,
        props: Props,
        children: Vec<Element>,
    },
    /// Component invocation that has no instance yet.
    ComponentTemplate { component: Component, props: Props },
}

impl Element {
    pub fn new(kind: ElementKind) -> Self {
        Self(Rc::new(kind))
    }

    pub fn empty() -> Self {
        Self::new(ElementKind::Empty)
    }

    pub fn text(value: impl Into<Rc<str>>) -> Self {
        Self::new(ElementKind::Text(value.into()))
    }

    pub fn kind(&self) -> &ElementKind {
        &self.0
    }

    pub fn ptr_eq(&self, other: &Element) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn key(&self) -> Option<Key> {
        match self.kind() {
            ElementKind::Tag { props, .. } | ElementKind::ComponentTemplate { props, .. } => {
                props.key()
            }
            ElementKind::Empty | ElementKind::Text(_) => None,
        }
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            ElementKind::Empty => f.write_str("Empty"),
            ElementKind::Text(t) => f.debug_tuple("Text").field(t).finish(),
            ElementKind::Tag {
                tag,
                props,
                children,
            } => f
                .debug_struct("Tag")
                .field("tag", tag)
                .field("props", props)
                .field("children", children)
                .finish(),
            ElementKind::ComponentTemplate { component, props } => f
                .debug_struct("ComponentTemplate")
                .field("component", &component.name())
                .field("props", props)
                .finish(),
        }
    }
}

impl From<&str> for Element {
    fn from(v: &str) -> Self {
        Element::text(v)
    }
}

impl From<String> for Element {
    fn from(v: String) -> Self {
        Element::text(v)
    }
}

/// First argument of [`create_element`].
#[derive(Clone, Debug)]
pub enum ElementType {
    Tag(Rc<str>),
    Component(Component),
}

impl From<&str> for ElementType {
    fn from(v: &str) -> Self {
        ElementType::Tag(v.into())
    }
}

impl From<String> for ElementType {
    fn from(v: String) -> Self {
        ElementType::Tag(v.into())
    }
}

impl From<Component> for ElementType {
    fn from(v: Component) -> Self {
        ElementType::Component(v)
    }
}

/// A child slot as written by the caller: an element, a nested list, or
/// nothing (the falsy case).
pub enum Child {
    None,
    Element(Element),
    List(Vec<Child>),
}

impl From<Element> for Child {
    fn from(v: Element) -> Self {
        Child::Element(v)
    }
}

impl From<&str> for Child {
    fn from(v: &str) -> Self {
        Child::Element(Element::text(v))
    }
}

impl From<String> for Child {
    fn from(v: String) -> Self {
        Child::Element(Element::text(v))
    }
}

impl<T: Into<Child>> From<Option<T>> for Child {
    fn from(v: Option<T>) -> Self {
        v.map_or(Child::None, Into::into)
    }
}

impl<T: Into<Child>> From<Vec<T>> for Child {
    fn from(v: Vec<T>) -> Self {
        Child::List(v.into_iter().map(Into::into).collect())
    }
}

/// Builds a `Vec<Child>` from heterogeneous child expressions.
#[macro_export]
macro_rules! children {
    ($($child:expr),* $(,)?) => {
        ::std::vec![$($crate::element::Child::from($child)),*]
    };
}

fn flatten(children: impl IntoIterator<Item = Child>, out: &mut Vec<Option<Element>>) {
    for child in children {
        match child {
            Child::None => out.push(None),
            Child::Element(e) => out.push(Some(e)),
            Child::List(list) => flatten(list, out),
        }
    }
}

/// Builds a tag element or a component template.
///
/// Nested child lists are flattened. Trailing empty children are dropped,
/// interior ones become [`ElementKind::Empty`] so positional siblings keep
/// their index across renders. Component children travel in the `children`
/// prop: one child as [`Value::Element`], several as [`Value::Elements`].
pub fn create_element(
    kind: impl Into<ElementType>,
    props: Props,
    children: impl IntoIterator<Item = Child>,
) -> Element {
    let mut flat = Vec::new();
    flatten(children, &mut flat);
    while matches!(flat.last(), Some(None)) {
        flat.pop();
    }
    let mut children: Vec<Element> = flat
        .into_iter()
        .map(|c| c.unwrap_or_else(Element::empty))
        .collect();

    match kind.into() {
        ElementType::Tag(tag) => Element::new(ElementKind::Tag {
            tag,
            props,
            children,
        }),
        ElementType::Component(component) => {
            let props = match children.len() {
                0 => props,
                1 => props.with("children", Value::Element(children.remove(0))),
                _ => props.with("children", Value::Elements(children.into())),
            };
            Element::new(ElementKind::ComponentTemplate { component, props })
        }
    }
}

/// Shorthand for a tag without children.
pub fn h(tag: &str, props: Props) -> Element {
    create_element(tag, props, Vec::new())
}

pub fn text(value: impl Into<Rc<str>>) -> Element {
    Element::text(value)
}

pub fn empty() -> Element {
    Element::empty()
}

/// Committed virtual tree node.
#[derive(Clone, Debug)]
pub enum VirtualElement {
    Empty {
        target: NodeId,
        source: Element,
    },
    Text {
        value: Rc<str>,
        target: NodeId,
        source: Element,
    },
    Tag {
        tag: Rc<str>,
        props: Props,
        children: Vec<VirtualElement>,
        target: NodeId,
        source: Element,
    },
    /// Mounted component; its single rendered child is owned by the instance.
    Component {
        instance: InstanceKey,
        component: Component,
        key: Option<Key>,
        source: Element,
    },
}

impl VirtualElement {
    /// Template this node was last committed from.
    pub fn source(&self) -> &Element {
        match self {
            VirtualElement::Empty { source, .. }
            | VirtualElement::Text { source, .. }
            | VirtualElement::Tag { source, .. }
            | VirtualElement::Component { source, .. } => source,
        }
    }

    pub fn key(&self) -> Option<Key> {
        match self {
            VirtualElement::Tag { props, .. } => props.key(),
            VirtualElement::Component { key, .. } => key.clone(),
            VirtualElement::Empty { .. } | VirtualElement::Text { .. } => None,
        }
    }

    /// DOM node of this element, `None` for components (their node lives in
    /// the instance's rendered child).
    pub fn target(&self) -> Option<NodeId> {
        match self {
            VirtualElement::Empty { target, .. }
            | VirtualElement::Text { target, .. }
            | VirtualElement::Tag { target, .. } => Some(*target),
            VirtualElement::Component { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::RenderContext;

    fn noop(_cx: &mut RenderContext<'_>, _props: &Props) -> Element {
        Element::empty()
    }

    #[test]
    fn trailing_empty_children_are_dropped() {
        let el = create_element(
            "div",
            Props::new(),
            children!["a", None::<Element>, "b", None::<Element>, None::<Element>],
        );
        let ElementKind::Tag { children, .. } = el.kind() else {
            panic!("expected a tag");
        };
        assert_eq!(children.len(), 3);
        assert!(matches!(children[1].kind(), ElementKind::Empty));
    }

    #[test]
    fn nested_lists_are_flattened() {
        let items: Vec<Element> = (0..3).map(|i| text(i.to_string())).collect();
        let el = create_element("ul", Props::new(), children!["head", items, "tail"]);
        let ElementKind::Tag { children, .. } = el.kind() else {
            panic!("expected a tag");
        };
        assert_eq!(children.len(), 5);
    }

    #[test]
    fn component_children_collapse_to_props() {
        let c = Component::new("Noop", noop);

        let one = create_element(c, Props::new(), children!["only"]);
        let ElementKind::ComponentTemplate { props, .. } = one.kind() else {
            panic!("expected a template");
        };
        assert!(matches!(props.get("children"), Some(Value::Element(_))));
        assert_eq!(props.children().len(), 1);

        let many = create_element(c, Props::new(), children!["a", "b"]);
        let ElementKind::ComponentTemplate { props, .. } = many.kind() else {
            panic!("expected a template");
        };
        assert!(matches!(props.get("children"), Some(Value::Elements(_))));
        assert_eq!(props.children().len(), 2);

        let none = create_element(c, Props::new(), children![None::<Element>]);
        let ElementKind::ComponentTemplate { props, .. } = none.kind() else {
            panic!("expected a template");
        };
        assert!(props.get("children").is_none());
    }
}

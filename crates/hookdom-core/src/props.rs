use std::any::Any;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::dom::{Event, Handler, NodeRef};
use crate::element::Element;

/// Sibling identity used by the reconciler and the ordered children diff.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Key {
    Int(i64),
    Str(Rc<str>),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(i) => write!(f, "{i}"),
            Key::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Key {
    fn from(v: i64) -> Self {
        Key::Int(v)
    }
}

impl From<i32> for Key {
    fn from(v: i32) -> Self {
        Key::Int(v.into())
    }
}

impl From<u32> for Key {
    fn from(v: u32) -> Self {
        Key::Int(v.into())
    }
}

impl From<usize> for Key {
    fn from(v: usize) -> Self {
        Key::Int(v as i64)
    }
}

impl From<&str> for Key {
    fn from(v: &str) -> Self {
        Key::Str(v.into())
    }
}

impl From<String> for Key {
    fn from(v: String) -> Self {
        Key::Str(v.into())
    }
}

impl From<Key> for Value {
    fn from(k: Key) -> Self {
        match k {
            Key::Int(i) => Value::Int(i),
            Key::Str(s) => Value::Str(s),
        }
    }
}

/// Dynamic value held by props and hook dependency lists.
#[derive(Clone)]
pub enum Value {
    Str(Rc<str>),
    Int(i64),
    Float(f64),
    Bool(bool),
    Handler(Handler),
    Ref(NodeRef),
    Element(Element),
    Elements(Rc<[Element]>),
    Any(Rc<dyn Any>),
}

impl Value {
    /// Strict equality: scalars compare by value, everything else by pointer.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Handler(a), Value::Handler(b)) => Rc::ptr_eq(a, b),
            (Value::Ref(a), Value::Ref(b)) => a.ptr_eq(b),
            (Value::Element(a), Value::Element(b)) => a.ptr_eq(b),
            (Value::Elements(a), Value::Elements(b)) => Rc::ptr_eq(a, b),
            (Value::Any(a), Value::Any(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Str(s) => !s.is_empty(),
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0 && !f.is_nan(),
            Value::Bool(b) => *b,
            _ => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn downcast<T: Any>(&self) -> Option<&T> {
        match self {
            Value::Any(v) => v.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Attribute text for this value; `None` means "no attribute".
    pub fn to_attr(&self) -> Option<Cow<'_, str>> {
        match self {
            Value::Str(s) => Some(Cow::Borrowed(s)),
            Value::Int(i) => Some(Cow::Owned(i.to_string())),
            Value::Float(f) => Some(Cow::Owned(f.to_string())),
            Value::Bool(true) => Some(Cow::Borrowed("")),
            _ => None,
        }
    }

    pub fn any<T: Any>(v: T) -> Self {
        Value::Any(Rc::new(v))
    }

    pub fn handler(f: impl Fn(&Event) + 'static) -> Self {
        Value::Handler(Rc::new(f))
    }

    fn to_key(&self) -> Option<Key> {
        match self {
            Value::Int(i) => Some(Key::Int(*i)),
            Value::Str(s) => Some(Key::Str(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Handler(_) => f.write_str("<handler>"),
            Value::Ref(_) => f.write_str("<ref>"),
            Value::Element(_) => f.write_str("<element>"),
            Value::Elements(els) => write!(f, "<{} elements>", els.len()),
            Value::Any(_) => f.write_str("<any>"),
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.into())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v.into())
    }
}

impl From<Rc<str>> for Value {
    fn from(v: Rc<str>) -> Self {
        Value::Str(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(v.into())
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<Handler> for Value {
    fn from(v: Handler) -> Self {
        Value::Handler(v)
    }
}

impl From<NodeRef> for Value {
    fn from(v: NodeRef) -> Self {
        Value::Ref(v)
    }
}

impl From<Element> for Value {
    fn from(v: Element) -> Self {
        Value::Element(v)
    }
}

impl From<Vec<Element>> for Value {
    fn from(v: Vec<Element>) -> Self {
        Value::Elements(v.into())
    }
}

/// Ordered `name -> Value` map shared by elements and component instances.
///
/// Cloning is cheap; builders copy on write.
#[derive(Clone, Default)]
pub struct Props {
    entries: Rc<BTreeMap<Rc<str>, Value>>,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<Rc<str>>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<Rc<str>>, value: impl Into<Value>) {
        Rc::make_mut(&mut self.entries).insert(name.into(), value.into());
    }

    /// Adds an event handler prop, e.g. `on("onClick", ...)`.
    pub fn on(self, name: impl Into<Rc<str>>, f: impl Fn(&Event) + 'static) -> Self {
        self.with(name, Value::handler(f))
    }

    pub fn keyed(self, key: impl Into<Key>) -> Self {
        self.with("key", key.into())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_int)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    pub fn get_any<T: Any>(&self, name: &str) -> Option<&T> {
        self.get(name).and_then(Value::downcast)
    }

    pub fn key(&self) -> Option<Key> {
        self.get("key").and_then(Value::to_key)
    }

    /// Children passed to a component template, whether collapsed to a single
    /// element or kept as a list.
    pub fn children(&self) -> Vec<Element> {
        match self.get("children") {
            Some(Value::Element(e)) => vec![e.clone()],
            Some(Value::Elements(els)) => els.to_vec(),
            _ => Vec::new(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (&**k, v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ptr_eq(&self, other: &Props) -> bool {
        Rc::ptr_eq(&self.entries, &other.entries)
    }
}

impl fmt::Debug for Props {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Default `memo` comparator: same key set, every value strictly equal.
pub fn shallow_equal(a: &Props, b: &Props) -> bool {
    a.ptr_eq(b)
        || (a.len() == b.len()
            && a.iter().all(|(k, v)| b.get(k).is_some_and(|w| v.same(w))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_equality_follows_value_kind() {
        assert!(Value::from("a").same(&Value::from("a")));
        assert!(!Value::from(1).same(&Value::from("1")));

        let h: Handler = Rc::new(|_: &Event| {});
        assert!(Value::Handler(h.clone()).same(&Value::Handler(h)));
        assert!(!Value::handler(|_| {}).same(&Value::handler(|_| {})));
        assert!(!Value::Float(f64::NAN).same(&Value::Float(f64::NAN)));
    }

    #[test]
    fn shallow_equal_compares_entries() {
        let shared = Value::any(vec![1, 2, 3]);
        let a = Props::new().with("label", "x").with("data", shared.clone());
        let b = Props::new().with("label", "x").with("data", shared);
        assert!(shallow_equal(&a, &b));

        let c = b.clone().with("extra", true);
        assert!(!shallow_equal(&a, &c));
        let d = Props::new().with("label", "x").with("data", Value::any(vec![1, 2, 3]));
        assert!(!shallow_equal(&a, &d));
    }

    #[test]
    fn keys_order_ints_before_strings() {
        assert_eq!(Props::new().keyed(3).key(), Some(Key::Int(3)));
        assert_eq!(Props::new().keyed("a").key(), Some(Key::Str("a".into())));
        assert!(Key::Int(100) < Key::from("0"));
        assert_eq!(Props::new().with("key", true).key(), None);
    }

    #[test]
    fn builder_copies_on_write() {
        let base = Props::new().with("a", 1);
        let extended = base.clone().with("b", 2);
        assert_eq!(base.len(), 1);
        assert_eq!(extended.len(), 2);
        assert_eq!(extended.get_int("b"), Some(2));
    }
}

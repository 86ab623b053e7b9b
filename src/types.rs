//! Core types for spark-dom.
//!
//! These types define the foundation that everything builds on: opaque
//! handles into the host tree and the updater arena, the prop value model,
//! and the frozen/mutable key-value maps that flow through render, diff,
//! and state merging.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::component::Scope;

// =============================================================================
// Handles
// =============================================================================

/// Opaque reference to a host node owned by the adapter.
///
/// Exactly one mounted node owns a given handle at a time. Handles transfer
/// between old and new descriptions on reuse and are released on removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HostId(pub(crate) usize);

/// Stable index of an updater in the runtime's arena.
///
/// Carries a generation counter so a queued job for a disposed updater can
/// never alias a reused slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UpdaterId {
    pub(crate) index: usize,
    pub(crate) generation: u32,
}

/// Explicit reconciliation key supplied by the tree builder.
pub type Key = Rc<str>;

/// User callback fired after an update commits.
pub type Callback = Box<dyn FnOnce()>;

// =============================================================================
// Prop Values
// =============================================================================

/// A single prop value.
///
/// `Map` carries nested per-property maps (e.g. style objects) which the
/// reconciler diffs with the same add/changed/removed rule as the top level.
/// `Handler` is an opaque event closure compared by pointer identity.
#[derive(Clone, Debug)]
pub enum PropValue {
    Str(Rc<str>),
    Bool(bool),
    Int(i64),
    Float(f64),
    Map(PropMap),
    Handler(Handler),
}

impl PartialEq for PropValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (PropValue::Str(a), PropValue::Str(b)) => a == b,
            (PropValue::Bool(a), PropValue::Bool(b)) => a == b,
            (PropValue::Int(a), PropValue::Int(b)) => a == b,
            (PropValue::Float(a), PropValue::Float(b)) => a == b,
            (PropValue::Map(a), PropValue::Map(b)) => a == b,
            (PropValue::Handler(a), PropValue::Handler(b)) => a == b,
            _ => false,
        }
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::Str(Rc::from(value))
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::Str(Rc::from(value.as_str()))
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        PropValue::Bool(value)
    }
}

impl From<i64> for PropValue {
    fn from(value: i64) -> Self {
        PropValue::Int(value)
    }
}

impl From<i32> for PropValue {
    fn from(value: i32) -> Self {
        PropValue::Int(value as i64)
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        PropValue::Float(value)
    }
}

impl From<PropMap> for PropValue {
    fn from(value: PropMap) -> Self {
        PropValue::Map(value)
    }
}

impl From<Handler> for PropValue {
    fn from(value: Handler) -> Self {
        PropValue::Handler(value)
    }
}

// =============================================================================
// Event Handlers
// =============================================================================

/// Opaque event closure attached to a host node.
///
/// The core never interprets handlers; it maintains the handler map on each
/// matched host node and runs a handler only when the event adapter calls
/// [`Runtime::dispatch`](crate::runtime::Runtime::dispatch). Equality is
/// pointer identity, so re-creating a closure each render counts as a change.
#[derive(Clone)]
pub struct Handler(Rc<dyn Fn(&mut Scope)>);

impl Handler {
    /// Wrap an event closure.
    pub fn new(f: impl Fn(&mut Scope) + 'static) -> Self {
        Handler(Rc::new(f))
    }

    /// Invoke the handler, collecting update requests into `scope`.
    pub(crate) fn call(&self, scope: &mut Scope) {
        (self.0)(scope);
    }
}

impl PartialEq for Handler {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handler(..)")
    }
}

// =============================================================================
// Prop Maps
// =============================================================================

/// Mutable key-value map of prop values.
///
/// Used directly for component state and as the backing storage of frozen
/// [`Props`]. `children` is a reserved key: the builder carries children
/// alongside the map, so setting it here is rejected.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PropMap {
    entries: HashMap<String, PropValue>,
}

impl PropMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a prop. The reserved `children` key is ignored with a warning.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<PropValue>) {
        let name = name.into();
        if name == "children" {
            log::warn!("`children` is a reserved prop key; children ride alongside the prop map");
            return;
        }
        self.entries.insert(name, value.into());
    }

    pub fn get(&self, name: &str) -> Option<&PropValue> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<PropValue> {
        self.entries.remove(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Shallow merge: every entry of `patch` overwrites the matching key.
    pub fn merge(&mut self, patch: &PropMap) {
        for (k, v) in patch.iter() {
            self.entries.insert(k.to_string(), v.clone());
        }
    }
}

/// Component state snapshot. Same shape as props; merged shallowly.
pub type State = PropMap;

// =============================================================================
// Frozen Props
// =============================================================================

/// Frozen key-value prop map attached to a [`Node`](crate::node::Node).
///
/// Created once by the tree builder and never mutated afterwards; clones
/// share the same storage.
#[derive(Clone, Debug, Default)]
pub struct Props(Rc<PropMap>);

impl Props {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&PropValue> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.0.iter()
    }

    pub(crate) fn map(&self) -> &PropMap {
        &self.0
    }
}

impl From<PropMap> for Props {
    fn from(map: PropMap) -> Self {
        Props(Rc::new(map))
    }
}

impl PartialEq for Props {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

// =============================================================================
// Context
// =============================================================================

/// Read-only key-value context threaded through render calls.
///
/// A component may extend the context its children see via
/// [`Component::child_context`](crate::component::Component::child_context);
/// extension copies, so ancestors never observe descendant additions.
#[derive(Clone, Debug, Default)]
pub struct Context(Rc<PropMap>);

impl Context {
    pub fn get(&self, name: &str) -> Option<&PropValue> {
        self.0.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// New context with `additions` layered over this one.
    pub fn extended(&self, additions: &PropMap) -> Context {
        let mut merged = (*self.0).clone();
        merged.merge(additions);
        Context(Rc::new(merged))
    }
}

// =============================================================================
// Macros
// =============================================================================

/// Build a frozen [`Props`] map: `props! { "id" => "a", "hidden" => true }`.
#[macro_export]
macro_rules! props {
    () => { $crate::types::Props::empty() };
    ($($name:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::types::PropMap::new();
        $( map.set($name, $value); )+
        $crate::types::Props::from(map)
    }};
}

/// Build a mutable [`PropMap`]: `propmap! { "count" => 1 }`.
#[macro_export]
macro_rules! propmap {
    () => { $crate::types::PropMap::new() };
    ($($name:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::types::PropMap::new();
        $( map.set($name, $value); )+
        map
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shallow_merge_overwrites() {
        let mut base = propmap! { "a" => 1, "b" => 2 };
        base.merge(&propmap! { "b" => 3, "c" => 4 });

        assert_eq!(base.get("a"), Some(&PropValue::Int(1)));
        assert_eq!(base.get("b"), Some(&PropValue::Int(3)));
        assert_eq!(base.get("c"), Some(&PropValue::Int(4)));
    }

    #[test]
    fn test_children_key_reserved() {
        let mut map = PropMap::new();
        map.set("children", "nope");
        assert!(map.is_empty());
    }

    #[test]
    fn test_handler_identity() {
        let h1 = Handler::new(|_| {});
        let h2 = h1.clone();
        let h3 = Handler::new(|_| {});

        assert_eq!(PropValue::from(h1), PropValue::from(h2));
        assert_ne!(
            PropValue::Handler(h3.clone()),
            PropValue::Handler(Handler::new(|_| {}))
        );
        assert_eq!(PropValue::Handler(h3.clone()), PropValue::Handler(h3));
    }

    #[test]
    fn test_context_extension_is_copy_on_write() {
        let root = Context::default();
        let child = root.extended(&propmap! { "theme" => "dark" });

        assert!(root.get("theme").is_none());
        assert_eq!(child.get("theme"), Some(&PropValue::from("dark")));
    }

    #[test]
    fn test_props_equality_by_content() {
        let a = props! { "id" => "x" };
        let b = props! { "id" => "x" };
        let c = props! { "id" => "y" };

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, a.clone());
    }
}

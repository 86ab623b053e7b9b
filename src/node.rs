//! Node - Immutable tree description.
//!
//! A `Node` describes one element, text run, or component at a point in the
//! tree. Nodes are produced once per render call by the tree builder, diffed
//! against the previously committed output, and then discarded; props and
//! children are frozen at construction and never mutated.
//!
//! The builder flattens nested child lists, tracking the nesting depth each
//! child came from (depth participates in reconciliation identity), merges
//! adjacent text runs, and drops empty ones.

use std::fmt;
use std::rc::Rc;

use anyhow::Result;

use crate::component::Component;
use crate::types::{Context, Key, Props};

// =============================================================================
// Node
// =============================================================================

/// Immutable description of one node in the tree.
#[derive(Clone, Debug)]
pub struct Node {
    kind: NodeKind,
    props: Props,
    key: Option<Key>,
    depth: u16,
    children: Rc<[Node]>,
}

/// What a node describes: a host element, a text run, or a component.
#[derive(Clone, Debug)]
pub enum NodeKind {
    Element(Rc<str>),
    Text(Rc<str>),
    Component(ComponentSpec),
}

impl Node {
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn props(&self) -> &Props {
        &self.props
    }

    pub fn key(&self) -> Option<&Key> {
        self.key.as_ref()
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub(crate) fn depth(&self) -> u16 {
        self.depth
    }

    /// Attach an explicit reconciliation key.
    pub fn with_key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub(crate) fn with_depth(mut self, depth: u16) -> Self {
        self.depth = depth;
        self
    }

    /// The node's display identity: element tag, `#text`, or component name.
    pub fn type_tag(&self) -> &str {
        match &self.kind {
            NodeKind::Element(tag) => tag,
            NodeKind::Text(_) => "#text",
            NodeKind::Component(spec) => spec.name(),
        }
    }
}

// =============================================================================
// Component Specs
// =============================================================================

/// How a component node resolves to running code.
///
/// A tagged variant instead of a base-class hierarchy: `Stateless` is a bare
/// render function with no lifecycle or state, `Stateful` is a factory for a
/// [`Component`] instance. The display `name` is the component's identity
/// for reconciliation, so two specs with the same name reconcile as the
/// same type.
#[derive(Clone)]
pub enum ComponentSpec {
    Stateless {
        name: Rc<str>,
        render: Rc<dyn Fn(&Props, &Context) -> Node>,
    },
    Stateful {
        name: Rc<str>,
        create: Rc<dyn Fn() -> Result<Box<dyn Component>>>,
    },
}

impl ComponentSpec {
    pub fn name(&self) -> &str {
        match self {
            ComponentSpec::Stateless { name, .. } => name,
            ComponentSpec::Stateful { name, .. } => name,
        }
    }
}

impl fmt::Debug for ComponentSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentSpec::Stateless { name, .. } => write!(f, "Stateless({name})"),
            ComponentSpec::Stateful { name, .. } => write!(f, "Stateful({name})"),
        }
    }
}

// =============================================================================
// Builders
// =============================================================================

/// A child slot accepted by [`element_with`]: a node, raw text, or a nested
/// list (flattened with its depth recorded).
pub enum Child {
    Node(Node),
    Text(String),
    Many(Vec<Child>),
}

impl From<Node> for Child {
    fn from(node: Node) -> Self {
        Child::Node(node)
    }
}

impl From<&str> for Child {
    fn from(value: &str) -> Self {
        Child::Text(value.to_string())
    }
}

impl From<String> for Child {
    fn from(value: String) -> Self {
        Child::Text(value)
    }
}

impl From<Vec<Node>> for Child {
    fn from(nodes: Vec<Node>) -> Self {
        Child::Many(nodes.into_iter().map(Child::Node).collect())
    }
}

/// Build a host element node with a flat child list.
pub fn element(tag: impl Into<Rc<str>>, props: Props, children: Vec<Node>) -> Node {
    element_with(tag, props, children.into_iter().map(Child::Node).collect())
}

/// Build a host element node from possibly nested child slots.
pub fn element_with(tag: impl Into<Rc<str>>, props: Props, children: Vec<Child>) -> Node {
    let mut flat = Vec::new();
    flatten(children, 0, &mut flat);
    Node {
        kind: NodeKind::Element(tag.into()),
        props,
        key: None,
        depth: 0,
        children: flat.into(),
    }
}

/// Build a text node. Empty text still produces a node when built directly;
/// the flattener is what drops empty runs inside child lists.
pub fn text(content: impl Into<Rc<str>>) -> Node {
    Node {
        kind: NodeKind::Text(content.into()),
        props: Props::empty(),
        key: None,
        depth: 0,
        children: Rc::from([]),
    }
}

/// Build a stateless component node: a named render function.
pub fn stateless(
    name: impl Into<Rc<str>>,
    props: Props,
    render: impl Fn(&Props, &Context) -> Node + 'static,
) -> Node {
    from_spec(
        ComponentSpec::Stateless {
            name: name.into(),
            render: Rc::new(render),
        },
        props,
    )
}

/// Build a stateful component node for a defaultable component type.
pub fn component<C: Component + Default>(name: impl Into<Rc<str>>, props: Props) -> Node {
    component_with(name, props, || Ok(Box::new(C::default()) as Box<dyn Component>))
}

/// Build a stateful component node with an explicit (fallible) factory.
pub fn component_with(
    name: impl Into<Rc<str>>,
    props: Props,
    create: impl Fn() -> Result<Box<dyn Component>> + 'static,
) -> Node {
    from_spec(
        ComponentSpec::Stateful {
            name: name.into(),
            create: Rc::new(create),
        },
        props,
    )
}

fn from_spec(spec: ComponentSpec, props: Props) -> Node {
    Node {
        kind: NodeKind::Component(spec),
        props,
        key: None,
        depth: 0,
        children: Rc::from([]),
    }
}

// =============================================================================
// Child Flattening
// =============================================================================

/// Flatten nested child slots into one list.
///
/// Nested lists contribute their entries at `depth + 1`. Adjacent text runs
/// merge into a single text node and empty text is dropped, so sibling
/// identity stays stable regardless of how the caller interleaved literals.
fn flatten(children: Vec<Child>, depth: u16, out: &mut Vec<Node>) {
    for child in children {
        match child {
            Child::Node(node) => push_child(node.with_depth(depth), out),
            Child::Text(content) => {
                if !content.is_empty() {
                    push_child(text(content.as_str()).with_depth(depth), out);
                }
            }
            Child::Many(nested) => flatten(nested, depth + 1, out),
        }
    }
}

fn push_child(node: Node, out: &mut Vec<Node>) {
    if let NodeKind::Text(run) = &node.kind {
        if run.is_empty() {
            return;
        }
        if let Some(prev) = out.last_mut() {
            if let NodeKind::Text(existing) = &prev.kind {
                let merged: Rc<str> = Rc::from(format!("{existing}{run}").as_str());
                prev.kind = NodeKind::Text(merged);
                return;
            }
        }
    }
    out.push(node);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::props;

    #[test]
    fn test_element_basics() {
        let node = element("div", props! { "id" => "a" }, vec![text("hi")]);

        assert_eq!(node.type_tag(), "div");
        assert_eq!(node.children().len(), 1);
        assert_eq!(node.children()[0].type_tag(), "#text");
        assert!(node.key().is_none());
    }

    #[test]
    fn test_with_key() {
        let node = element("li", props! {}, vec![]).with_key("k1");
        assert_eq!(node.key().map(|k| &**k), Some("k1"));
    }

    #[test]
    fn test_adjacent_text_merges() {
        let node = element_with(
            "p",
            props! {},
            vec!["hello".into(), " ".into(), "world".into()],
        );

        assert_eq!(node.children().len(), 1);
        match node.children()[0].kind() {
            NodeKind::Text(run) => assert_eq!(&**run, "hello world"),
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_text_dropped() {
        let node = element_with("p", props! {}, vec!["".into(), text("x").into()]);
        assert_eq!(node.children().len(), 1);
    }

    #[test]
    fn test_nested_lists_record_depth() {
        let node = element_with(
            "ul",
            props! {},
            vec![
                element("li", props! {}, vec![]).into(),
                Child::Many(vec![
                    element("li", props! {}, vec![]).into(),
                    element("li", props! {}, vec![]).into(),
                ]),
            ],
        );

        assert_eq!(node.children().len(), 3);
        assert_eq!(node.children()[0].depth(), 0);
        assert_eq!(node.children()[1].depth(), 1);
        assert_eq!(node.children()[2].depth(), 1);
    }

    #[test]
    fn test_text_not_merged_across_element() {
        let node = element_with(
            "p",
            props! {},
            vec!["a".into(), element("b", props! {}, vec![]).into(), "c".into()],
        );
        assert_eq!(node.children().len(), 3);
    }

    #[test]
    fn test_component_spec_identity_is_name() {
        let a = stateless("Label", props! {}, |_, _| text("x"));
        let b = stateless("Label", props! {}, |_, _| text("y"));
        assert_eq!(a.type_tag(), b.type_tag());
    }
}

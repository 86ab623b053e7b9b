//! Reconciler - turns a rendered [`Node`] tree into host mutations.
//!
//! The committed tree is a parallel [`MountedNode`] structure holding the
//! host handles and last-applied props. Diffing walks new description and
//! committed tree together: matched pairs patch in place, incompatible
//! pairs replace at their position, unmatched new children mount detached
//! and are inserted by the placement pass, and unmatched old children are
//! removed strictly last.
//!
//! Placement compares each kept child's rank among kept children before and
//! after the diff and commits right-to-left with the already-placed next
//! sibling as anchor. An unchanged list therefore commits nothing, and a
//! full rotation moves every displaced node exactly once.

pub(crate) mod keys;

use std::rc::Rc;

use crate::adapter::HostAdapter;
use crate::node::{Node, NodeKind};
use crate::runtime::Runtime;
use crate::scheduler::Work;
use crate::types::{Context, HostId, Key, PropMap, PropValue, Props, UpdaterId};

use keys::ChildMatch;

// =============================================================================
// Committed Tree
// =============================================================================

/// One committed node: the host handle plus everything the next diff needs.
#[derive(Debug)]
pub(crate) enum MountedNode {
    Element {
        tag: Rc<str>,
        key: Option<Key>,
        depth: u16,
        props: Props,
        handle: HostId,
        children: Vec<MountedNode>,
        /// Component whose render produced this element; event dispatch
        /// applies handler requests against it.
        owner: Option<UpdaterId>,
    },
    Text {
        key: Option<Key>,
        depth: u16,
        text: Rc<str>,
        handle: HostId,
    },
    Component {
        name: Rc<str>,
        key: Option<Key>,
        depth: u16,
        updater: UpdaterId,
    },
}

/// Host handle a mounted subtree occupies, chasing through component
/// wrappers to their rendered output.
pub(crate) fn first_host<A: HostAdapter>(rt: &Runtime<A>, mounted: &MountedNode) -> Option<HostId> {
    match mounted {
        MountedNode::Element { handle, .. } | MountedNode::Text { handle, .. } => Some(*handle),
        MountedNode::Component { updater, .. } => {
            let rendered = rt.up(*updater)?.rendered.as_ref()?;
            first_host(rt, rendered)
        }
    }
}

// =============================================================================
// Child Diffing
// =============================================================================

/// Reconcile a child list against its committed predecessors under `parent`.
///
/// Returns the new committed children in order. Every returned child is
/// attached under `parent` when this returns.
pub(crate) fn diff_children<A: HostAdapter>(
    rt: &mut Runtime<A>,
    new_children: &[Node],
    old_children: Vec<MountedNode>,
    parent: HostId,
    owner: Option<UpdaterId>,
    context: &Context,
    work: &mut Work,
) -> Vec<MountedNode> {
    let matching = ChildMatch::compute(new_children, &old_children);
    let old_ranks = matching.kept_ranks();

    let mut pool: Vec<Option<MountedNode>> = old_children.into_iter().map(Some).collect();

    // Pair phase: patch or replace matched children in place, mount the
    // rest detached. Nothing new is attached yet.
    let mut entries: Vec<(MountedNode, Option<usize>)> = Vec::with_capacity(new_children.len());
    for (i, child) in new_children.iter().enumerate() {
        match matching.matched[i] {
            Some(old_index) => {
                let old = pool[old_index].take().expect("matched old index taken twice");
                let updated = diff_pair(rt, child, old, parent, owner, context, work);
                entries.push((updated, Some(old_index)));
            }
            None => {
                let mounted = mount_detached(rt, child, owner, context, parent, work);
                entries.push((mounted, None));
            }
        }
    }

    // Placement phase, right to left. A kept child moves only when its rank
    // among kept children changed; new children always insert.
    let mut new_ranks: Vec<usize> = Vec::with_capacity(entries.len());
    let mut kept_seen = 0;
    for (_, old_index) in &entries {
        new_ranks.push(kept_seen);
        if old_index.is_some() {
            kept_seen += 1;
        }
    }

    let mut anchor: Option<HostId> = None;
    for i in (0..entries.len()).rev() {
        let Some(handle) = first_host(rt, &entries[i].0) else {
            continue;
        };
        match entries[i].1 {
            None => rt.adapter.insert_before(parent, handle, anchor),
            Some(old_index) => {
                if old_ranks.get(&old_index) != Some(&new_ranks[i]) {
                    rt.adapter.insert_before(parent, handle, anchor);
                }
            }
        }
        anchor = Some(handle);
    }

    // Removals run strictly after every insert, move, and patch.
    for leftover in pool.into_iter().flatten() {
        unmount_tree(rt, leftover, Some(parent), work);
    }

    entries.into_iter().map(|(mounted, _)| mounted).collect()
}

// =============================================================================
// Pair Diffing
// =============================================================================

/// Reconcile a component's fresh render output against its committed
/// subtree. The root pair sits at the component's `host_parent`, already
/// attached, so patch and replace both land in place.
pub(crate) fn diff_pair_root<A: HostAdapter>(
    rt: &mut Runtime<A>,
    new: &Node,
    old: MountedNode,
    parent: HostId,
    owner: UpdaterId,
    context: &Context,
    work: &mut Work,
) -> MountedNode {
    diff_pair(rt, new, old, parent, Some(owner), context, work)
}

fn compatible(new: &Node, old: &MountedNode) -> bool {
    let (old_key, old_depth) = match old {
        MountedNode::Element { key, depth, .. } => (key.as_ref(), *depth),
        MountedNode::Text { key, depth, .. } => (key.as_ref(), *depth),
        MountedNode::Component { key, depth, .. } => (key.as_ref(), *depth),
    };
    if new.key() != old_key || new.depth() != old_depth {
        return false;
    }
    match (new.kind(), old) {
        (NodeKind::Element(tag), MountedNode::Element { tag: old_tag, .. }) => **tag == **old_tag,
        (NodeKind::Text(_), MountedNode::Text { .. }) => true,
        (NodeKind::Component(spec), MountedNode::Component { name, .. }) => spec.name() == &**name,
        _ => false,
    }
}

/// Reconcile one paired `(new description, committed node)`.
///
/// Compatible pairs patch in place and keep their handle; incompatible ones
/// mount the new description detached, swap it in with a single replace, and
/// tear the old subtree down. Either way the result occupies the old node's
/// host position.
fn diff_pair<A: HostAdapter>(
    rt: &mut Runtime<A>,
    new: &Node,
    old: MountedNode,
    parent: HostId,
    owner: Option<UpdaterId>,
    context: &Context,
    work: &mut Work,
) -> MountedNode {
    if !compatible(new, &old) {
        let mounted = mount_detached(rt, new, owner, context, parent, work);
        let new_handle = first_host(rt, &mounted);
        let old_handle = first_host(rt, &old);
        match (new_handle, old_handle) {
            (Some(n), Some(o)) => rt.adapter.replace_child(parent, n, o),
            // every mounted subtree, placeholders included, resolves a
            // handle; a hostless side can only be a stale updater id
            (Some(n), None) => rt.adapter.append_child(parent, n),
            (None, Some(o)) => rt.adapter.remove_child(parent, o),
            (None, None) => {}
        }
        // the old subtree is already detached from the host here
        unmount_tree(rt, old, None, work);
        return mounted;
    }

    match (new.kind(), old) {
        (
            NodeKind::Element(tag),
            MountedNode::Element {
                props: old_props,
                handle,
                children: old_kids,
                ..
            },
        ) => {
            diff_props(&mut rt.adapter, handle, &old_props, new.props());
            let children = diff_children(rt, new.children(), old_kids, handle, owner, context, work);
            MountedNode::Element {
                tag: tag.clone(),
                key: new.key().cloned(),
                depth: new.depth(),
                props: new.props().clone(),
                handle,
                children,
                owner,
            }
        }
        (NodeKind::Text(run), MountedNode::Text { text, handle, .. }) => {
            if *run != text {
                rt.adapter.update_text(handle, run);
            }
            MountedNode::Text {
                key: new.key().cloned(),
                depth: new.depth(),
                text: run.clone(),
                handle,
            }
        }
        (NodeKind::Component(spec), MountedNode::Component { updater, .. }) => {
            rt.receive_component(updater, new.props().clone(), context, parent, work);
            MountedNode::Component {
                name: Rc::from(spec.name()),
                key: new.key().cloned(),
                depth: new.depth(),
                updater,
            }
        }
        // compatible() already ruled every other combination out
        _ => unreachable!("incompatible pair reached patch path"),
    }
}

// =============================================================================
// Prop Diffing
// =============================================================================

/// Apply the three-way prop delta (added, changed, removed) to a host node.
///
/// Handlers route to the handler map, nested maps recurse as dotted paths,
/// and a removed nested map clears its whole dotted group with one call.
pub(crate) fn diff_props<A: HostAdapter>(adapter: &mut A, handle: HostId, old: &Props, new: &Props) {
    if old == new {
        return;
    }
    diff_prop_maps(adapter, handle, None, old.map(), new.map());
}

fn diff_prop_maps<A: HostAdapter>(
    adapter: &mut A,
    handle: HostId,
    prefix: Option<&str>,
    old: &PropMap,
    new: &PropMap,
) {
    let path = |name: &str| match prefix {
        Some(p) => format!("{p}.{name}"),
        None => name.to_string(),
    };

    for (name, value) in new.iter() {
        let previous = old.get(name);
        if previous == Some(value) {
            continue;
        }
        match value {
            PropValue::Handler(handler) => adapter.set_handler(handle, &path(name), handler),
            PropValue::Map(map) => {
                let empty = PropMap::new();
                let old_map = match previous {
                    Some(PropValue::Map(m)) => m,
                    // a non-map sat here before; clear it, then write entries
                    Some(_) => {
                        adapter.remove_attribute(handle, &path(name));
                        &empty
                    }
                    None => &empty,
                };
                diff_prop_maps(adapter, handle, Some(&path(name)), old_map, map);
            }
            _ => adapter.set_attribute(handle, &path(name), value),
        }
    }

    for (name, value) in old.iter() {
        if new.contains(name) {
            continue;
        }
        match value {
            PropValue::Handler(_) => adapter.remove_handler(handle, &path(name)),
            // one removal clears the whole dotted group
            _ => adapter.remove_attribute(handle, &path(name)),
        }
    }
}

// =============================================================================
// Mounting
// =============================================================================

/// Build the host subtree for a fresh description. The returned root is
/// detached; the caller attaches it (placement pass, replace, or append).
///
/// `host_parent` is where the subtree will live once attached; component
/// updaters remember it for their later re-renders.
pub(crate) fn mount_detached<A: HostAdapter>(
    rt: &mut Runtime<A>,
    node: &Node,
    owner: Option<UpdaterId>,
    context: &Context,
    host_parent: HostId,
    work: &mut Work,
) -> MountedNode {
    match node.kind() {
        NodeKind::Text(run) => {
            let handle = rt.adapter.create_text(run);
            MountedNode::Text {
                key: node.key().cloned(),
                depth: node.depth(),
                text: run.clone(),
                handle,
            }
        }
        NodeKind::Element(tag) => {
            let handle = rt.adapter.create(tag);
            diff_props(&mut rt.adapter, handle, &Props::empty(), node.props());
            let mut children = Vec::with_capacity(node.children().len());
            for child in node.children() {
                let mounted = mount_detached(rt, child, owner, context, handle, work);
                if let Some(child_handle) = first_host(rt, &mounted) {
                    rt.adapter.append_child(handle, child_handle);
                }
                children.push(mounted);
            }
            MountedNode::Element {
                tag: tag.clone(),
                key: node.key().cloned(),
                depth: node.depth(),
                props: node.props().clone(),
                handle,
                children,
                owner,
            }
        }
        NodeKind::Component(spec) => {
            let updater = rt.mount_component(spec, node.props().clone(), owner, context, host_parent, work);
            MountedNode::Component {
                name: Rc::from(spec.name()),
                key: node.key().cloned(),
                depth: node.depth(),
                updater,
            }
        }
    }
}

// =============================================================================
// Unmounting
// =============================================================================

/// Tear a committed subtree down: unmount hooks fire owner-first on the way
/// down, the top host detaches with a single removal when `detach_from` is
/// given, and every handle is released.
pub(crate) fn unmount_tree<A: HostAdapter>(
    rt: &mut Runtime<A>,
    mounted: MountedNode,
    detach_from: Option<HostId>,
    work: &mut Work,
) {
    match mounted {
        MountedNode::Text { handle, .. } => {
            if let Some(parent) = detach_from {
                rt.adapter.remove_child(parent, handle);
            }
            rt.adapter.release(handle);
        }
        MountedNode::Element { handle, children, .. } => {
            if let Some(parent) = detach_from {
                rt.adapter.remove_child(parent, handle);
            }
            for child in children {
                // descendants detach implicitly with the subtree root
                unmount_tree(rt, child, None, work);
            }
            rt.adapter.release(handle);
        }
        MountedNode::Component { updater, .. } => {
            rt.dispose_updater(updater, detach_from, work);
        }
    }
}

//! Reconciliation identity and the keyed matcher.
//!
//! Two nodes are "the same identity" across a diff iff their computed key
//! matches: `(type tag, depth, explicit key)`, with text runs additionally
//! folding their content in (a changed text run is a different identity and
//! pairs positionally instead). Identity match is the sole basis for
//! state and host-handle reuse.
//!
//! The matcher builds a FIFO queue per identity over the old children, so
//! duplicate keys pair up in order. New children whose identity never
//! occurred in the old list fall back to positional pairing against the
//! removal pool - first unused entry in old order. That fallback preserves
//! host identity for unkeyed lists that do not reorder; it is not a
//! minimum-edit-distance match, and an exhausted queue does not fall back.

use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use crate::node::{Node, NodeKind};
use crate::types::Key;

use super::MountedNode;

// =============================================================================
// Identity
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct IdentityKey {
    tag: Rc<str>,
    depth: u16,
    key: Option<Key>,
    text: Option<Rc<str>>,
}

pub(crate) fn identity_of_node(node: &Node) -> IdentityKey {
    let (tag, text): (Rc<str>, Option<Rc<str>>) = match node.kind() {
        NodeKind::Element(tag) => (tag.clone(), None),
        NodeKind::Text(run) => (Rc::from("#text"), Some(run.clone())),
        NodeKind::Component(spec) => (Rc::from(spec.name()), None),
    };
    IdentityKey {
        tag,
        depth: node.depth(),
        key: node.key().cloned(),
        text,
    }
}

pub(crate) fn identity_of_mounted(mounted: &MountedNode) -> IdentityKey {
    match mounted {
        MountedNode::Element { tag, key, depth, .. } => IdentityKey {
            tag: tag.clone(),
            depth: *depth,
            key: key.clone(),
            text: None,
        },
        MountedNode::Text { text, key, depth, .. } => IdentityKey {
            tag: Rc::from("#text"),
            depth: *depth,
            key: key.clone(),
            text: Some(text.clone()),
        },
        MountedNode::Component { name, key, depth, .. } => IdentityKey {
            tag: name.clone(),
            depth: *depth,
            key: key.clone(),
            text: None,
        },
    }
}

// =============================================================================
// Matcher
// =============================================================================

/// Pairing of a new child list against the previous committed children.
///
/// `matched[i]` is the old index new child `i` reuses, either by identity
/// or through the positional fallback. Old indices absent from `matched`
/// are removals.
pub(crate) struct ChildMatch {
    pub matched: Vec<Option<usize>>,
}

impl ChildMatch {
    pub fn compute(new_children: &[Node], old_children: &[MountedNode]) -> ChildMatch {
        // FIFO queue of old indices per identity; the map remembers every
        // identity that ever existed, even once its queue drains.
        let mut queues: HashMap<IdentityKey, VecDeque<usize>> = HashMap::new();
        for (i, old) in old_children.iter().enumerate() {
            queues.entry(identity_of_mounted(old)).or_default().push_back(i);
        }

        let mut matched: Vec<Option<usize>> = Vec::with_capacity(new_children.len());
        let mut known: Vec<bool> = Vec::with_capacity(new_children.len());
        for child in new_children {
            let ident = identity_of_node(child);
            match queues.get_mut(&ident) {
                Some(queue) => {
                    matched.push(queue.pop_front());
                    known.push(true);
                }
                None => {
                    matched.push(None);
                    known.push(false);
                }
            }
        }

        let mut used = vec![false; old_children.len()];
        for old_index in matched.iter().flatten() {
            used[*old_index] = true;
        }

        // Positional fallback: unknown identities pair index-for-index, in
        // iteration order, against the first unused old children.
        let pool: Vec<usize> = (0..old_children.len()).filter(|i| !used[*i]).collect();
        let mut cursor = 0;
        for (i, slot) in matched.iter_mut().enumerate() {
            if slot.is_none() && !known[i] && cursor < pool.len() {
                *slot = Some(pool[cursor]);
                used[pool[cursor]] = true;
                cursor += 1;
            }
        }

        ChildMatch { matched }
    }

    /// Old indices that stayed paired, in old order, mapped to their rank.
    /// Placement moves a kept child only when its rank changed.
    pub fn kept_ranks(&self) -> HashMap<usize, usize> {
        let mut kept: Vec<usize> = self.matched.iter().flatten().copied().collect();
        kept.sort_unstable();
        kept.into_iter().enumerate().map(|(rank, old)| (old, rank)).collect()
    }
}

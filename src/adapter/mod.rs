//! Host adapter seam.
//!
//! The reconciler drives the host tree exclusively through [`HostAdapter`]'s
//! primitive create/insert/remove/mutate calls, so alternate hosts (a real
//! DOM binding, a string renderer, the in-memory test host) plug in without
//! touching the core. Attribute translation quirks - boolean attributes,
//! controlled inputs, vendor prefixes - belong to the adapter, not here.

mod memory;

pub use memory::{MemoryDom, Mutation};

use crate::types::{Handler, HostId, PropValue};

/// Primitive operations on the host tree.
///
/// The core assumes nothing about the host beyond these calls. Handles are
/// allocated by `create`/`create_text` and must stay valid until `release`.
pub trait HostAdapter {
    /// Create a detached element node.
    fn create(&mut self, tag: &str) -> HostId;

    /// Create a detached text node.
    fn create_text(&mut self, content: &str) -> HostId;

    /// Replace the stored text of a text node.
    fn update_text(&mut self, node: HostId, content: &str);

    /// Set or overwrite an attribute. Nested prop maps arrive as dotted
    /// paths (`style.color`).
    fn set_attribute(&mut self, node: HostId, name: &str, value: &PropValue);

    /// Clear an attribute back to its default.
    fn remove_attribute(&mut self, node: HostId, name: &str);

    /// Attach or replace an event handler in the node's handler map.
    fn set_handler(&mut self, node: HostId, name: &str, handler: &Handler);

    /// Detach an event handler.
    fn remove_handler(&mut self, node: HostId, name: &str);

    /// Insert `node` before `anchor` under `parent`; append when `anchor`
    /// is `None`. Re-inserting an attached node moves it.
    fn insert_before(&mut self, parent: HostId, node: HostId, anchor: Option<HostId>);

    /// Append `node` as the last child of `parent`.
    fn append_child(&mut self, parent: HostId, node: HostId);

    /// Detach `node` from `parent`.
    fn remove_child(&mut self, parent: HostId, node: HostId);

    /// Swap `old` for `new` in place under `parent`.
    fn replace_child(&mut self, parent: HostId, new: HostId, old: HostId);

    /// Free a detached node's resources. The handle is dead afterwards.
    fn release(&mut self, node: HostId);
}

//! # spark-dom
//!
//! Declarative tree renderer core for Rust.
//!
//! ## Architecture
//!
//! The crate is a retained virtual tree pipeline: components render
//! immutable [`Node`] descriptions, a reconciler diffs each description
//! against the committed tree, and the diff lands on the host through a
//! small [`HostAdapter`] mutation surface.
//!
//! ```text
//! Component render → Node tree → reconciler diff → HostAdapter mutations
//! ```
//!
//! Component state lives on per-component updaters in a generational arena
//! inside the [`Runtime`]; update requests batch through an iterative
//! transaction scheduler, so one event cycle commits once no matter how
//! many requests it makes.
//!
//! ## Modules
//!
//! - [`types`] - Prop values, frozen prop maps, handles, context
//! - [`node`] - Immutable tree descriptions and builders
//! - [`component`] - The [`Component`] trait and the update [`Scope`]
//! - [`adapter`] - The [`HostAdapter`] seam and the in-memory host
//! - [`error`] - Error taxonomy and boundary info
//! - [`runtime`] - The [`Runtime`]: render, dispatch, batch, unmount

pub mod adapter;
pub mod component;
pub mod error;
pub mod node;
pub mod runtime;
pub mod types;

pub(crate) mod reconciler;
pub(crate) mod scheduler;
pub(crate) mod updater;

// Re-export commonly used items
pub use adapter::{HostAdapter, MemoryDom, Mutation};
pub use component::{inputs_changed, Component, Scope, StateUpdate};
pub use error::{CoreError, ErrorInfo, HookKind};
pub use node::{
    component, component_with, element, element_with, stateless, text, Child, ComponentSpec,
    Node, NodeKind,
};
pub use runtime::Runtime;
pub use types::{
    Callback, Context, Handler, HostId, Key, PropMap, PropValue, Props, State, UpdaterId,
};

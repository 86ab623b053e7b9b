//! Component authoring contract.
//!
//! A component is a capability bundle: a pure `render` plus optional
//! lifecycle hooks, dispatched through the [`Component`] trait rather than a
//! base-class chain. State lives on the component's updater as a key-value
//! snapshot, so hooks receive `(props, state)` views and request changes
//! through a [`Scope`] instead of mutating anything in place.
//!
//! Hooks are fallible; a returned error becomes a caught lifecycle error
//! (see [`error`](crate::error)) rather than unwinding the pass.

use std::rc::Rc;

use anyhow::Result;

use crate::error::{CoreError, ErrorInfo};
use crate::node::Node;
use crate::types::{Callback, Context, PropMap, Props, State};

// =============================================================================
// Component Trait
// =============================================================================

/// A stateful component instance.
///
/// Only `render` is required. Hook default implementations do nothing, so an
/// implementation opts into exactly the lifecycle it needs. Hooks that are
/// allowed to request updates receive a [`Scope`].
pub trait Component: 'static {
    /// State the component starts with, before `will_mount` adjustments.
    fn initial_state(&self, _props: &Props) -> State {
        State::new()
    }

    /// Produce the node tree for the current props/state snapshot.
    fn render(&self, props: &Props, state: &State, context: &Context) -> Result<Node>;

    /// Runs once before the first render. Updates requested here merge into
    /// the initial state; they do not cause a second render.
    fn will_mount(&mut self, _props: &Props, _state: &State, _scope: &mut Scope) -> Result<()> {
        Ok(())
    }

    /// Runs after the first commit, children first.
    fn did_mount(&mut self, _props: &Props, _state: &State, _scope: &mut Scope) -> Result<()> {
        Ok(())
    }

    /// Runs when the parent re-renders this component with new props.
    /// Updates requested here are dropped; the in-flight update already
    /// carries the incoming props and any state merged so far.
    fn will_receive_props(&mut self, _next: &Props, _scope: &mut Scope) -> Result<()> {
        Ok(())
    }

    /// Gate for the render/diff of one update cycle, given the committed
    /// `(props, state)` and the incoming pair. Returning `false` skips
    /// render and the `did_update` hook; the new props and state are
    /// applied to the updater regardless. [`inputs_changed`] is the usual
    /// comparison for a pure gate.
    fn should_update(
        &self,
        _props: &Props,
        _state: &State,
        _next_props: &Props,
        _next_state: &State,
        _context: &Context,
    ) -> Result<bool> {
        Ok(true)
    }

    /// Runs just before a re-render.
    fn will_update(&mut self, _next_props: &Props, _next_state: &State) -> Result<()> {
        Ok(())
    }

    /// Runs after an update commits, children first.
    fn did_update(&mut self, _prev_props: &Props, _prev_state: &State, _scope: &mut Scope) -> Result<()> {
        Ok(())
    }

    /// Runs before the component's subtree is torn down.
    fn will_unmount(&mut self) -> Result<()> {
        Ok(())
    }

    /// Extra context entries this component's children should see.
    fn child_context(&self, _props: &Props, _state: &State, _parent: &Context) -> Option<PropMap> {
        None
    }

    /// Opt-in marker making this component an error boundary.
    fn catches_errors(&self) -> bool {
        false
    }

    /// Receives errors caught below this component when
    /// [`catches_errors`](Component::catches_errors) returns `true`.
    /// Typically requests a state change whose render replaces the failed
    /// subtree with a fallback.
    fn did_catch(&mut self, _error: &CoreError, _info: &ErrorInfo, _scope: &mut Scope) -> Result<()> {
        Ok(())
    }
}

/// Value comparison of a component's render inputs, for implementing a
/// pure [`should_update`](Component::should_update) gate: `true` when
/// either pair differs.
pub fn inputs_changed(props: &Props, state: &State, next_props: &Props, next_state: &State) -> bool {
    props != next_props || state != next_state
}

// =============================================================================
// State Updates
// =============================================================================

/// One pending state change: a plain patch, or a pure function of the
/// current `(state, props)` producing a patch. Pending updates fold
/// left-to-right by shallow merge into exactly one snapshot per flush.
#[derive(Clone)]
pub enum StateUpdate {
    Patch(PropMap),
    Compute(Rc<dyn Fn(&State, &Props) -> PropMap>),
}

impl StateUpdate {
    pub(crate) fn apply(&self, state: &State, props: &Props) -> PropMap {
        match self {
            StateUpdate::Patch(patch) => patch.clone(),
            StateUpdate::Compute(f) => f(state, props),
        }
    }
}

// =============================================================================
// Scope
// =============================================================================

/// Buffer for update requests made from hooks and event handlers.
///
/// Requests are applied through the owning updater after the hook returns;
/// whether a request merges into the current cycle, defers to a follow-up
/// pass, batches, or is dropped depends on the updater's phase at that
/// moment.
#[derive(Default)]
pub struct Scope {
    pub(crate) requests: Vec<Request>,
}

pub(crate) enum Request {
    SetState(StateUpdate, Option<Callback>),
    ForceUpdate(Option<Callback>),
}

impl Scope {
    /// Request a shallow state patch.
    pub fn set_state(&mut self, patch: PropMap) {
        self.requests.push(Request::SetState(StateUpdate::Patch(patch), None));
    }

    /// Request a shallow state patch with an after-commit callback.
    pub fn set_state_with(&mut self, patch: PropMap, callback: impl FnOnce() + 'static) {
        self.requests
            .push(Request::SetState(StateUpdate::Patch(patch), Some(Box::new(callback))));
    }

    /// Request a state change computed from the flushed `(state, props)`.
    pub fn update_state(&mut self, f: impl Fn(&State, &Props) -> PropMap + 'static) {
        self.requests
            .push(Request::SetState(StateUpdate::Compute(Rc::new(f)), None));
    }

    /// Request a re-render that bypasses `should_update`.
    pub fn force_update(&mut self) {
        self.requests.push(Request::ForceUpdate(None));
    }

    /// Request a forced re-render with an after-commit callback.
    pub fn force_update_with(&mut self, callback: impl FnOnce() + 'static) {
        self.requests.push(Request::ForceUpdate(Some(Box::new(callback))));
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

//! Updater - per-component state machine.
//!
//! Every mounted component owns one `Updater` slot in the runtime arena. The
//! updater holds the committed `(props, state, context)` snapshot, the queue
//! of pending state updates, and a small job queue the scheduler drains:
//!
//! - `Hydrate` folds pending updates into one snapshot, runs the
//!   `should_update` gate, renders, and diffs the rendered output.
//! - `Resolve` runs after the subtree commits: it fires `did_mount` or
//!   `did_update`, delivers caught errors to boundaries, and flushes
//!   after-commit callbacks.
//!
//! Update requests behave by phase. During `HYDRATING` they defer to a
//! follow-up pass that always renders, even past a `should_update` gate that
//! would have skipped it. During `RECEIVING` the patch joins the in-flight
//! cycle and no extra work is scheduled. Otherwise the request batches when
//! a pass or batch is active and drains synchronously when not.

use std::collections::VecDeque;

use anyhow::Result;
use bitflags::bitflags;

use crate::adapter::HostAdapter;
use crate::component::{Component, Request, Scope, StateUpdate};
use crate::error::{CoreError, ErrorInfo, HookKind};
use crate::node::{ComponentSpec, Node};
use crate::reconciler::{self, MountedNode};
use crate::runtime::Runtime;
use crate::scheduler::Work;
use crate::types::{Callback, Context, HostId, Props, State, UpdaterId};

// =============================================================================
// Updater
// =============================================================================

bitflags! {
    /// Lifecycle phase bits of one updater.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) struct Phase: u8 {
        /// Between the start of a render cycle and its `Resolve`.
        const HYDRATING = 1 << 0;
        /// Inside `will_receive_props`.
        const RECEIVING = 1 << 1;
        /// Next hydrate must render regardless of `should_update`.
        const FORCE     = 1 << 2;
        /// First commit has happened.
        const MOUNTED   = 1 << 3;
        /// Torn down; every job and request is a no-op from here.
        const DISPOSED  = 1 << 4;
        /// The in-flight cycle's render failed; its commit hook is skipped.
        const FAILED    = 1 << 5;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Job {
    Hydrate,
    Resolve,
}

/// Running form of a component node.
pub(crate) enum Instance {
    Stateless(std::rc::Rc<dyn Fn(&Props, &Context) -> Node>),
    Stateful(Box<dyn Component>),
    /// Construction failed; renders as an inert empty text run.
    Placeholder,
}

pub(crate) struct Updater {
    pub(crate) name: std::rc::Rc<str>,
    pub(crate) instance: Instance,
    pub(crate) props: Props,
    pub(crate) state: State,
    pub(crate) context: Context,
    pub(crate) flags: Phase,
    pub(crate) jobs: VecDeque<Job>,
    pub(crate) owner: Option<UpdaterId>,
    pub(crate) host_parent: HostId,
    pub(crate) rendered: Option<MountedNode>,
    /// Position in overall mount order; ancestors always precede their
    /// descendants. Assigned by the arena on allocation.
    pub(crate) mount_order: u64,

    pending_props: Option<Props>,
    pending_states: Vec<StateUpdate>,
    pending_callbacks: Vec<Callback>,
    /// Callbacks for requests made mid-cycle; promoted when the deferred
    /// follow-up pass is scheduled.
    next_callbacks: Vec<Callback>,
    has_deferred: bool,
    /// `(props, state)` before the in-flight update, for `did_update`.
    prev_snapshot: Option<(Props, State)>,
    /// Error waiting for this updater's `did_catch`.
    caught: Option<(CoreError, ErrorInfo)>,
}

impl Updater {
    fn new(
        name: std::rc::Rc<str>,
        instance: Instance,
        props: Props,
        context: Context,
        owner: Option<UpdaterId>,
        host_parent: HostId,
    ) -> Self {
        Updater {
            name,
            instance,
            props,
            state: State::new(),
            context,
            flags: Phase::empty(),
            jobs: VecDeque::new(),
            owner,
            host_parent,
            rendered: None,
            mount_order: 0,
            pending_props: None,
            pending_states: Vec::new(),
            pending_callbacks: Vec::new(),
            next_callbacks: Vec::new(),
            has_deferred: false,
            prev_snapshot: None,
            caught: None,
        }
    }

    /// Queue a job unless it is already the tail of the queue.
    pub(crate) fn add_job(&mut self, job: Job) {
        if self.jobs.back() != Some(&job) {
            self.jobs.push_back(job);
        }
    }

    fn is_disposed(&self) -> bool {
        self.flags.contains(Phase::DISPOSED)
    }
}

// =============================================================================
// Lifecycle Driving
// =============================================================================

impl<A: HostAdapter> Runtime<A> {
    /// Mount a component node: construct the instance, fold `will_mount`
    /// state into the initial snapshot, render once, and queue `Resolve`.
    ///
    /// The rendered subtree is built detached; the caller attaches it.
    pub(crate) fn mount_component(
        &mut self,
        spec: &ComponentSpec,
        props: Props,
        owner: Option<UpdaterId>,
        context: &Context,
        host_parent: HostId,
        work: &mut Work,
    ) -> UpdaterId {
        let name: std::rc::Rc<str> = std::rc::Rc::from(spec.name());

        let (instance, construction_error) = match spec {
            ComponentSpec::Stateless { render, .. } => (Instance::Stateless(render.clone()), None),
            ComponentSpec::Stateful { create, .. } => match create() {
                Ok(boxed) => (Instance::Stateful(boxed), None),
                Err(err) => (Instance::Placeholder, Some(err)),
            },
        };

        let id = self.alloc_updater(Updater::new(
            name,
            instance,
            props,
            context.clone(),
            owner,
            host_parent,
        ));

        if let Some(err) = construction_error {
            // Inert placeholder keeps the slot well-formed for diffing and
            // teardown while the error routes to a boundary.
            let handle = self.adapter.create_text("");
            if let Some(up) = self.up_mut(id) {
                up.rendered = Some(MountedNode::Text {
                    key: None,
                    depth: 0,
                    text: std::rc::Rc::from(""),
                    handle,
                });
                up.flags.insert(Phase::MOUNTED);
            }
            self.push_error(id, HookKind::Constructor, err, work);
            return id;
        }

        // Initial state, then will_mount with its updates folded in locally
        // so the first render already sees them.
        if let Some(up) = self.up_mut(id) {
            if let Instance::Stateful(instance) = &up.instance {
                up.state = instance.initial_state(&up.props);
            }
            up.flags.insert(Phase::HYDRATING);
        }
        let will_mount = {
            let mut scope = Scope::default();
            let result = match self.up_mut(id) {
                Some(Updater {
                    instance: Instance::Stateful(instance),
                    props,
                    state,
                    ..
                }) => instance.will_mount(props, state, &mut scope),
                _ => Ok(()),
            };
            (result, scope)
        };
        let (result, scope) = will_mount;
        self.capture_hook(id, HookKind::WillMount, result, work);
        self.apply_scope_local(id, scope);

        self.run_render(id, work);

        if let Some(up) = self.up_mut(id) {
            up.add_job(Job::Resolve);
            work.push_back(id);
        }
        id
    }

    /// New props arrived from the owner's re-render. Joins the owner's
    /// in-flight cycle: `will_receive_props` fires with `RECEIVING` set,
    /// then the updater hydrates synchronously.
    pub(crate) fn receive_component(
        &mut self,
        id: UpdaterId,
        props: Props,
        context: &Context,
        host_parent: HostId,
        work: &mut Work,
    ) {
        let next = props.clone();
        let Some(up) = self.up_mut(id) else {
            return;
        };
        if up.is_disposed() {
            return;
        }
        up.pending_props = Some(props);
        up.context = context.clone();
        up.host_parent = host_parent;
        up.flags.insert(Phase::RECEIVING);

        let (result, scope) = {
            let mut scope = Scope::default();
            let result = match self.up_mut(id) {
                Some(Updater {
                    instance: Instance::Stateful(instance),
                    ..
                }) => instance.will_receive_props(&next, &mut scope),
                _ => Ok(()),
            };
            (result, scope)
        };
        self.capture_hook(id, HookKind::WillReceiveProps, result, work);
        let mut local = Work::new();
        self.apply_scope(id, scope, &mut local);
        debug_assert!(local.is_empty(), "requests during RECEIVING never schedule");

        if let Some(up) = self.up_mut(id) {
            up.flags.remove(Phase::RECEIVING);
        }
        self.hydrate(id, work);
    }

    /// Fold pending updates into one snapshot, gate, render, diff.
    pub(crate) fn hydrate(&mut self, id: UpdaterId, work: &mut Work) {
        let Some(up) = self.up_mut(id) else {
            return;
        };
        if up.is_disposed() {
            return;
        }
        up.flags.insert(Phase::HYDRATING);

        let next_props = up.pending_props.take().unwrap_or_else(|| up.props.clone());
        let force = up.flags.contains(Phase::FORCE);
        up.flags.remove(Phase::FORCE);

        // Pending updates fold left to right; each computed update sees the
        // state produced by the ones before it. The queue clears atomically
        // with the fold.
        let updates = std::mem::take(&mut up.pending_states);
        let mut next_state = up.state.clone();
        for update in &updates {
            let patch = update.apply(&next_state, &next_props);
            next_state.merge(&patch);
        }

        let should = if force {
            true
        } else {
            let gate = match self.up(id) {
                Some(Updater {
                    instance: Instance::Stateful(instance),
                    props,
                    state,
                    context,
                    ..
                }) => instance.should_update(props, state, &next_props, &next_state, context),
                Some(Updater {
                    instance: Instance::Stateless(_),
                    ..
                }) => Ok(true),
                _ => Ok(false),
            };
            match gate {
                Ok(should) => should,
                Err(err) => {
                    // a failing gate reports and skips, it never renders
                    self.push_error(id, HookKind::ShouldUpdate, err, work);
                    false
                }
            }
        };

        if should {
            let result = match self.up_mut(id) {
                Some(Updater {
                    instance: Instance::Stateful(instance),
                    ..
                }) => instance.will_update(&next_props, &next_state),
                _ => Ok(()),
            };
            self.capture_hook(id, HookKind::WillUpdate, result, work);
        }

        // Props and state commit to the updater whether or not it renders.
        if let Some(up) = self.up_mut(id) {
            if should && up.flags.contains(Phase::MOUNTED) {
                up.prev_snapshot = Some((up.props.clone(), up.state.clone()));
            }
            up.props = next_props;
            up.state = next_state;
            if !should {
                up.flags.remove(Phase::HYDRATING);
            }
        }

        if should {
            self.run_render(id, work);
        }

        if let Some(up) = self.up_mut(id) {
            up.add_job(Job::Resolve);
            work.push_back(id);
        }
    }

    /// Render the instance and reconcile the output against the committed
    /// subtree. A failed re-render keeps the last committed subtree; a
    /// failed first render mounts an inert empty text run, so every live
    /// component owns a host position.
    pub(crate) fn run_render(&mut self, id: UpdaterId, work: &mut Work) {
        let (rendered, child_context, host_parent) = {
            let Some(up) = self.up(id) else {
                return;
            };
            let child_context = match &up.instance {
                Instance::Stateful(instance) => {
                    match instance.child_context(&up.props, &up.state, &up.context) {
                        Some(additions) => up.context.extended(&additions),
                        None => up.context.clone(),
                    }
                }
                _ => up.context.clone(),
            };
            let rendered = match &up.instance {
                Instance::Stateless(render) => Ok(render(&up.props, &up.context)),
                Instance::Stateful(instance) => instance.render(&up.props, &up.state, &up.context),
                Instance::Placeholder => Ok(crate::node::text("")),
            };
            (rendered, child_context, up.host_parent)
        };

        let node = match rendered {
            Ok(node) => node,
            Err(err) => {
                self.push_error(id, HookKind::Render, err, work);
                let needs_placeholder = self.up(id).is_some_and(|up| up.rendered.is_none());
                if needs_placeholder {
                    let handle = self.adapter.create_text("");
                    if let Some(up) = self.up_mut(id) {
                        up.rendered = Some(MountedNode::Text {
                            key: None,
                            depth: 0,
                            text: std::rc::Rc::from(""),
                            handle,
                        });
                    }
                }
                return;
            }
        };

        let old = self.up_mut(id).and_then(|up| up.rendered.take());
        let mounted = match old {
            Some(old) => reconciler::diff_pair_root(self, &node, old, host_parent, id, &child_context, work),
            None => reconciler::mount_detached(self, &node, Some(id), &child_context, host_parent, work),
        };
        if let Some(up) = self.up_mut(id) {
            up.rendered = Some(mounted);
        }
    }

    /// After-commit step: `did_mount`/`did_update`, boundary delivery,
    /// callbacks, and scheduling of any deferred follow-up pass.
    pub(crate) fn resolve(&mut self, id: UpdaterId, work: &mut Work) {
        let (first, hydrating) = {
            let Some(up) = self.up_mut(id) else {
                return;
            };
            if up.is_disposed() {
                return;
            }
            let first = !up.flags.contains(Phase::MOUNTED);
            up.flags.insert(Phase::MOUNTED);
            (first, up.flags.contains(Phase::HYDRATING))
        };

        let failed = self.up_mut(id).is_some_and(|up| {
            let failed = up.flags.contains(Phase::FAILED);
            up.flags.remove(Phase::FAILED);
            failed
        });

        if hydrating && !failed {
            // HYDRATING stays set while the hook runs so its requests take
            // the deferred path instead of re-entering the scheduler.
            let (result, scope, hook) = {
                let mut scope = Scope::default();
                match self.up_mut(id) {
                    Some(Updater {
                        instance: Instance::Stateful(instance),
                        props,
                        state,
                        prev_snapshot,
                        ..
                    }) => {
                        if first {
                            let result = instance.did_mount(props, state, &mut scope);
                            (result, scope, HookKind::DidMount)
                        } else if let Some((prev_props, prev_state)) = prev_snapshot.take() {
                            let result = instance.did_update(&prev_props, &prev_state, &mut scope);
                            (result, scope, HookKind::DidUpdate)
                        } else {
                            (Ok(()), scope, HookKind::DidUpdate)
                        }
                    }
                    _ => (Ok(()), scope, HookKind::DidMount),
                }
            };
            self.capture_hook(id, hook, result, work);
            self.apply_scope(id, scope, work);
        }
        if hydrating {
            if let Some(up) = self.up_mut(id) {
                up.flags.remove(Phase::HYDRATING);
                up.prev_snapshot = None;
            }
        }

        let caught = self.up_mut(id).and_then(|up| up.caught.take());
        if let Some((error, info)) = caught {
            if let Some(up) = self.up_mut(id) {
                up.jobs.clear();
            }
            let (result, scope) = {
                let mut scope = Scope::default();
                let result = match self.up_mut(id) {
                    Some(Updater {
                        instance: Instance::Stateful(instance),
                        ..
                    }) => instance.did_catch(&error, &info, &mut scope),
                    _ => Ok(()),
                };
                (result, scope)
            };
            self.capture_hook(id, HookKind::DidCatch, result, work);
            self.apply_scope(id, scope, work);
        }

        let callbacks = self
            .up_mut(id)
            .map(|up| std::mem::take(&mut up.pending_callbacks))
            .unwrap_or_default();
        for callback in callbacks {
            callback();
        }

        // Requests made mid-cycle force a follow-up pass; FORCE makes it
        // render even past a should_update gate.
        let deferred = self.up_mut(id).is_some_and(|up| {
            if !up.has_deferred {
                return false;
            }
            up.has_deferred = false;
            let promoted = std::mem::take(&mut up.next_callbacks);
            up.pending_callbacks.extend(promoted);
            up.flags.insert(Phase::FORCE);
            up.add_job(Job::Hydrate);
            true
        });
        if deferred {
            work.push_back(id);
        }
    }

    /// Tear one component down: `will_unmount`, then its rendered subtree,
    /// then the arena slot.
    pub(crate) fn dispose_updater(
        &mut self,
        id: UpdaterId,
        detach_from: Option<HostId>,
        work: &mut Work,
    ) {
        let rendered = {
            let Some(up) = self.up_mut(id) else {
                return;
            };
            if up.is_disposed() {
                return;
            }
            up.flags.insert(Phase::DISPOSED);
            up.jobs.clear();
            up.rendered.take()
        };

        let result = match self.up_mut(id) {
            Some(Updater {
                instance: Instance::Stateful(instance),
                ..
            }) => instance.will_unmount(),
            _ => Ok(()),
        };
        self.capture_hook(id, HookKind::WillUnmount, result, work);

        if let Some(rendered) = rendered {
            reconciler::unmount_tree(self, rendered, detach_from, work);
        }
        self.free_updater(id);
    }

    // -------------------------------------------------------------------------
    // Update Requests
    // -------------------------------------------------------------------------

    /// Apply the requests a hook or handler buffered into its [`Scope`].
    pub(crate) fn apply_scope(&mut self, id: UpdaterId, scope: Scope, work: &mut Work) {
        for request in scope.requests {
            self.apply_request(id, request, work);
        }
    }

    fn apply_request(&mut self, id: UpdaterId, request: Request, work: &mut Work) {
        let scheduler_active = self.scheduler.is_active();
        let Some(up) = self.up_mut(id) else {
            log::warn!("update requested for a disposed component; dropped");
            return;
        };
        if up.is_disposed() {
            log::warn!("update requested for unmounted `{}`; dropped", up.name);
            return;
        }

        let callback = match request {
            Request::SetState(update, callback) => {
                up.pending_states.push(update);
                callback
            }
            Request::ForceUpdate(callback) => {
                up.flags.insert(Phase::FORCE);
                callback
            }
        };

        if up.flags.contains(Phase::HYDRATING) {
            up.has_deferred = true;
            up.next_callbacks.extend(callback);
            return;
        }
        if up.flags.contains(Phase::RECEIVING) {
            // the in-flight cycle picks the patch up; nothing to schedule
            up.pending_callbacks.extend(callback);
            return;
        }

        up.pending_callbacks.extend(callback);
        if scheduler_active {
            self.scheduler.enqueue(id);
        } else if up.flags.contains(Phase::MOUNTED) {
            up.add_job(Job::Hydrate);
            work.push_back(id);
        }
    }

    /// `will_mount` requests fold straight into the initial state; the
    /// first render has not happened yet, so nothing re-schedules.
    fn apply_scope_local(&mut self, id: UpdaterId, scope: Scope) {
        let Some(up) = self.up_mut(id) else {
            return;
        };
        for request in scope.requests {
            match request {
                Request::SetState(update, callback) => {
                    let patch = update.apply(&up.state, &up.props);
                    up.state.merge(&patch);
                    up.pending_callbacks.extend(callback);
                }
                Request::ForceUpdate(callback) => {
                    up.pending_callbacks.extend(callback);
                }
            }
        }
    }

    // -------------------------------------------------------------------------
    // Error Capture
    // -------------------------------------------------------------------------

    /// Fold a fallible hook result: errors route to a boundary and the hook
    /// counts as having produced nothing.
    pub(crate) fn capture_hook(
        &mut self,
        id: UpdaterId,
        hook: HookKind,
        result: Result<()>,
        work: &mut Work,
    ) {
        if let Err(err) = result {
            self.push_error(id, hook, err, work);
        }
    }

    /// Route a caught error to the nearest boundary above the failing
    /// component, or park it as uncaught. Always logged.
    pub(crate) fn push_error(
        &mut self,
        failing: UpdaterId,
        hook: HookKind,
        err: anyhow::Error,
        work: &mut Work,
    ) {
        let (component, mut owner) = match self.up(failing) {
            Some(up) => (up.name.to_string(), up.owner),
            None => ("<unknown>".to_string(), None),
        };

        let mut owner_stack = Vec::new();
        let mut boundary = None;
        while let Some(candidate) = owner {
            let Some(up) = self.up(candidate) else {
                break;
            };
            owner_stack.push(up.name.to_string());
            let catches = match &up.instance {
                Instance::Stateful(instance) => instance.catches_errors(),
                _ => false,
            };
            if boundary.is_none() && catches && !up.is_disposed() {
                boundary = Some(candidate);
            }
            owner = up.owner;
        }

        let error = CoreError::from_hook(&component, hook, err);
        let info = ErrorInfo {
            component,
            hook,
            owner_stack,
        };
        log::error!("{error}\n  {info}");

        if hook == HookKind::Render {
            if let Some(up) = self.up_mut(failing) {
                up.flags.insert(Phase::FAILED);
            }
        }

        match boundary {
            Some(boundary_id) => {
                if let Some(up) = self.up_mut(failing) {
                    up.jobs.clear();
                }
                if let Some(up) = self.up_mut(boundary_id) {
                    up.caught = Some((error, info));
                    up.add_job(Job::Resolve);
                    work.push_back(boundary_id);
                }
            }
            None => self.uncaught.push(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use anyhow::Result;

    use crate::adapter::MemoryDom;
    use crate::component::{Component, Scope};
    use crate::node::{component_with, element, text, Node};
    use crate::runtime::Runtime;
    use crate::types::{Context, Handler, HostId, PropValue, Props, State};
    use crate::{propmap, props};

    type Log = Rc<RefCell<Vec<String>>>;

    fn rig() -> (Runtime<MemoryDom>, HostId) {
        let mut rt = Runtime::new(MemoryDom::new());
        let container = rt.adapter_mut().create_container();
        (rt, container)
    }

    fn str_prop(map_get: Option<&PropValue>, fallback: &str) -> String {
        match map_get {
            Some(PropValue::Str(s)) => s.to_string(),
            _ => fallback.to_string(),
        }
    }

    // -------------------------------------------------------------------------
    // will_mount
    // -------------------------------------------------------------------------

    #[test]
    fn test_will_mount_updates_fold_into_first_render() {
        struct Init {
            log: Log,
        }
        impl Component for Init {
            fn initial_state(&self, _p: &Props) -> State {
                propmap! { "a" => 1 }
            }
            fn will_mount(&mut self, _p: &Props, _s: &State, scope: &mut Scope) -> Result<()> {
                scope.set_state(propmap! { "b" => 2 });
                scope.update_state(|state, _| {
                    let a = match state.get("a") {
                        Some(PropValue::Int(n)) => *n,
                        _ => 0,
                    };
                    propmap! { "a" => a + 10 }
                });
                Ok(())
            }
            fn render(&self, _p: &Props, state: &State, _c: &Context) -> Result<Node> {
                let a = match state.get("a") {
                    Some(PropValue::Int(n)) => *n,
                    _ => -1,
                };
                let b = match state.get("b") {
                    Some(PropValue::Int(n)) => *n,
                    _ => -1,
                };
                self.log.borrow_mut().push(format!("render:{a}:{b}"));
                Ok(text(format!("{a}:{b}")))
            }
        }

        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let (mut rt, container) = rig();
        let factory_log = log.clone();
        rt.render(
            component_with("Init", props! {}, move || {
                Ok(Box::new(Init {
                    log: factory_log.clone(),
                }) as Box<dyn Component>)
            }),
            container,
        )
        .unwrap();

        // one render, both updates already folded in
        assert_eq!(log.borrow().as_slice(), &["render:11:2".to_string()]);
    }

    // -------------------------------------------------------------------------
    // should_update gate
    // -------------------------------------------------------------------------

    struct Gate {
        log: Log,
    }

    impl Component for Gate {
        fn render(&self, props: &Props, _s: &State, _c: &Context) -> Result<Node> {
            let label = str_prop(props.get("label"), "unset");
            self.log.borrow_mut().push(format!("render:{label}"));
            Ok(element(
                "div",
                props! { "onForce" => Handler::new(|scope| scope.force_update()) },
                vec![text(label)],
            ))
        }

        fn should_update(
            &self,
            _p: &Props,
            _s: &State,
            _np: &Props,
            _ns: &State,
            _c: &Context,
        ) -> Result<bool> {
            Ok(false)
        }
    }

    fn gate_node(log: &Log, label: &str) -> Node {
        let factory_log = log.clone();
        component_with("Gate", props! { "label" => label }, move || {
            Ok(Box::new(Gate {
                log: factory_log.clone(),
            }) as Box<dyn Component>)
        })
    }

    #[test]
    fn test_gate_skips_render_but_commits_props() {
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let (mut rt, container) = rig();
        rt.render(gate_node(&log, "a"), container).unwrap();
        let div = rt.adapter().children(container)[0];

        rt.render(gate_node(&log, "b"), container).unwrap();

        // gated: no render, host untouched
        assert_eq!(log.borrow().as_slice(), &["render:a".to_string()]);
        assert_eq!(rt.adapter().render_to_string(div), "<div>a</div>");

        // force bypasses the gate and renders with the already-applied props
        rt.dispatch(div, "onForce").unwrap();
        assert_eq!(
            log.borrow().as_slice(),
            &["render:a".to_string(), "render:b".to_string()]
        );
        assert_eq!(rt.adapter().render_to_string(div), "<div>b</div>");
    }

    #[test]
    fn test_request_from_did_mount_renders_even_when_gated() {
        struct EagerGate {
            log: Log,
        }
        impl Component for EagerGate {
            fn render(&self, _p: &Props, state: &State, _c: &Context) -> Result<Node> {
                let ready = state.contains("ready");
                self.log.borrow_mut().push(format!("render:{ready}"));
                Ok(text(if ready { "ready" } else { "booting" }))
            }
            fn should_update(
                &self,
                _p: &Props,
                _s: &State,
                _np: &Props,
                _ns: &State,
                _c: &Context,
            ) -> Result<bool> {
                Ok(false)
            }
            fn did_mount(&mut self, _p: &Props, _s: &State, scope: &mut Scope) -> Result<()> {
                scope.set_state(propmap! { "ready" => true });
                Ok(())
            }
        }

        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let (mut rt, container) = rig();
        let factory_log = log.clone();
        rt.render(
            component_with("EagerGate", props! {}, move || {
                Ok(Box::new(EagerGate {
                    log: factory_log.clone(),
                }) as Box<dyn Component>)
            }),
            container,
        )
        .unwrap();

        // the mid-cycle request forces the follow-up pass past the gate
        assert_eq!(
            log.borrow().as_slice(),
            &["render:false".to_string(), "render:true".to_string()]
        );
        assert_eq!(
            rt.adapter().render_to_string(container),
            "<#container>ready</#container>"
        );
    }

    #[test]
    fn test_pure_gate_compares_current_against_next() {
        struct Pure {
            log: Log,
        }
        impl Component for Pure {
            fn render(&self, props: &Props, _s: &State, _c: &Context) -> Result<Node> {
                let label = str_prop(props.get("label"), "unset");
                self.log.borrow_mut().push(format!("render:{label}"));
                Ok(text(label))
            }
            fn should_update(
                &self,
                props: &Props,
                state: &State,
                next_props: &Props,
                next_state: &State,
                _c: &Context,
            ) -> Result<bool> {
                Ok(crate::component::inputs_changed(props, state, next_props, next_state))
            }
        }

        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let (mut rt, container) = rig();
        let node = |label: &str| {
            let factory_log = log.clone();
            component_with("Pure", props! { "label" => label }, move || {
                Ok(Box::new(Pure {
                    log: factory_log.clone(),
                }) as Box<dyn Component>)
            })
        };

        rt.render(node("a"), container).unwrap();
        rt.render(node("a"), container).unwrap();
        // equal inputs skip the cycle entirely
        assert_eq!(log.borrow().as_slice(), &["render:a".to_string()]);

        rt.render(node("b"), container).unwrap();
        assert_eq!(
            log.borrow().as_slice(),
            &["render:a".to_string(), "render:b".to_string()]
        );
        assert_eq!(
            rt.adapter().render_to_string(container),
            "<#container>b</#container>"
        );
    }

    // -------------------------------------------------------------------------
    // will_receive_props
    // -------------------------------------------------------------------------

    #[test]
    fn test_receive_props_requests_join_the_inflight_cycle() {
        struct Mirror {
            log: Log,
        }
        impl Component for Mirror {
            fn will_receive_props(&mut self, next: &Props, scope: &mut Scope) -> Result<()> {
                let label = str_prop(next.get("label"), "unset");
                scope.set_state(propmap! { "mirrored" => label });
                Ok(())
            }
            fn render(&self, props: &Props, state: &State, _c: &Context) -> Result<Node> {
                let label = str_prop(props.get("label"), "unset");
                let mirrored = str_prop(state.get("mirrored"), "none");
                self.log.borrow_mut().push(format!("render:{label}:{mirrored}"));
                Ok(text(format!("{label}/{mirrored}")))
            }
        }

        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let (mut rt, container) = rig();
        let node = |label: &str| {
            let factory_log = log.clone();
            component_with("Mirror", props! { "label" => label }, move || {
                Ok(Box::new(Mirror {
                    log: factory_log.clone(),
                }) as Box<dyn Component>)
            })
        };

        rt.render(node("a"), container).unwrap();
        rt.render(node("b"), container).unwrap();

        // exactly one render per received props, state patch included
        assert_eq!(
            log.borrow().as_slice(),
            &["render:a:none".to_string(), "render:b:b".to_string()]
        );
    }
}

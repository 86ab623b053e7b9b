//! Runtime - the public entry points and the updater arena.
//!
//! A `Runtime` owns the host adapter, the arena of component updaters, the
//! scheduler, and the committed tree of every container it has rendered
//! into. [`render`](Runtime::render) reconciles a description into a
//! container, [`dispatch`](Runtime::dispatch) routes a host event to the
//! handler committed on a node and flushes the updates it requests, and
//! [`batch`](Runtime::batch) coalesces several of either into one flush.
//!
//! Updaters live in a generational slot arena. A disposed slot bumps its
//! generation, so ids held by queued jobs or stale dirty entries resolve to
//! `None` instead of aliasing whatever reuses the slot.

use std::collections::HashMap;

use crate::adapter::HostAdapter;
use crate::component::Scope;
use crate::error::CoreError;
use crate::node::Node;
use crate::reconciler::{self, MountedNode};
use crate::scheduler::{Scheduler, Work};
use crate::types::{Context, Handler, HostId, PropValue, UpdaterId};
use crate::updater::Updater;

// =============================================================================
// Arena
// =============================================================================

struct Slot {
    generation: u32,
    updater: Option<Updater>,
}

// =============================================================================
// Runtime
// =============================================================================

pub struct Runtime<A: HostAdapter> {
    pub(crate) adapter: A,
    pub(crate) scheduler: Scheduler,
    pub(crate) uncaught: Vec<CoreError>,
    slots: Vec<Slot>,
    free: Vec<usize>,
    next_mount_order: u64,
    roots: HashMap<HostId, Vec<MountedNode>>,
}

impl<A: HostAdapter> Runtime<A> {
    pub fn new(adapter: A) -> Self {
        Runtime {
            adapter,
            scheduler: Scheduler::default(),
            uncaught: Vec::new(),
            slots: Vec::new(),
            free: Vec::new(),
            next_mount_order: 0,
            roots: HashMap::new(),
        }
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn adapter_mut(&mut self) -> &mut A {
        &mut self.adapter
    }

    // -------------------------------------------------------------------------
    // Rendering
    // -------------------------------------------------------------------------

    /// Reconcile `node` against whatever was last rendered into `container`
    /// and flush every update pass the commit triggers.
    ///
    /// Returns the first error no boundary caught; later ones stay
    /// available through [`take_uncaught`](Runtime::take_uncaught).
    pub fn render(&mut self, node: Node, container: HostId) -> Result<(), CoreError> {
        let old = self.roots.remove(&container).unwrap_or_default();
        let was_in_pass = self.scheduler.in_pass;
        self.scheduler.in_pass = true;

        let mut work = Work::new();
        let mounted = reconciler::diff_children(
            self,
            std::slice::from_ref(&node),
            old,
            container,
            None,
            &Context::default(),
            &mut work,
        );
        self.roots.insert(container, mounted);
        self.drain(&mut work);

        self.scheduler.in_pass = was_in_pass;
        self.run_passes();
        self.first_uncaught()
    }

    /// Tear down everything rendered into `container`.
    pub fn unmount(&mut self, container: HostId) -> Result<(), CoreError> {
        let Some(old) = self.roots.remove(&container) else {
            return Ok(());
        };
        let was_in_pass = self.scheduler.in_pass;
        self.scheduler.in_pass = true;

        let mut work = Work::new();
        for mounted in old {
            reconciler::unmount_tree(self, mounted, Some(container), &mut work);
        }
        self.drain(&mut work);

        self.scheduler.in_pass = was_in_pass;
        self.run_passes();
        self.first_uncaught()
    }

    // -------------------------------------------------------------------------
    // Events
    // -------------------------------------------------------------------------

    /// Run the `event` handler committed on `target`, apply the updates it
    /// requests against the component that rendered the node, and flush.
    ///
    /// `Ok(false)` means no such handler is committed there.
    pub fn dispatch(&mut self, target: HostId, event: &str) -> Result<bool, CoreError> {
        let Some((handler, owner)) = self.find_handler(target, event) else {
            return Ok(false);
        };

        let mut scope = Scope::default();
        handler.call(&mut scope);

        match owner {
            Some(id) => {
                self.scheduler.batch_depth += 1;
                let mut work = Work::new();
                self.apply_scope(id, scope, &mut work);
                debug_assert!(work.is_empty(), "batched requests never spawn jobs directly");
                self.scheduler.batch_depth -= 1;
                self.run_passes();
            }
            None => {
                if !scope.is_empty() {
                    log::warn!("`{event}` handler outside any component requested updates; dropped");
                }
            }
        }
        self.first_uncaught()?;
        Ok(true)
    }

    /// Run `f` with update flushing suspended; everything it queues commits
    /// in one flush when the outermost batch closes.
    pub fn batch(&mut self, f: impl FnOnce(&mut Self)) {
        self.scheduler.batch_depth += 1;
        f(self);
        self.scheduler.batch_depth -= 1;
        self.run_passes();
    }

    /// Errors no boundary caught, oldest first, draining them.
    pub fn take_uncaught(&mut self) -> Vec<CoreError> {
        std::mem::take(&mut self.uncaught)
    }

    fn first_uncaught(&mut self) -> Result<(), CoreError> {
        if self.uncaught.is_empty() {
            Ok(())
        } else {
            Err(self.uncaught.remove(0))
        }
    }

    fn find_handler(&self, target: HostId, event: &str) -> Option<(Handler, Option<UpdaterId>)> {
        fn search<A: HostAdapter>(
            rt: &Runtime<A>,
            nodes: &[MountedNode],
            target: HostId,
            event: &str,
        ) -> Option<(Handler, Option<UpdaterId>)> {
            for node in nodes {
                match node {
                    MountedNode::Element {
                        handle,
                        props,
                        children,
                        owner,
                        ..
                    } => {
                        if *handle == target {
                            return match props.get(event) {
                                Some(PropValue::Handler(handler)) => {
                                    Some((handler.clone(), *owner))
                                }
                                _ => None,
                            };
                        }
                        if let Some(found) = search(rt, children, target, event) {
                            return Some(found);
                        }
                    }
                    MountedNode::Text { .. } => {}
                    MountedNode::Component { updater, .. } => {
                        let Some(rendered) = rt.up(*updater).and_then(|up| up.rendered.as_ref())
                        else {
                            continue;
                        };
                        if let Some(found) =
                            search(rt, std::slice::from_ref(rendered), target, event)
                        {
                            return Some(found);
                        }
                    }
                }
            }
            None
        }
        self.roots
            .values()
            .find_map(|nodes| search(self, nodes, target, event))
    }

    // -------------------------------------------------------------------------
    // Arena Access
    // -------------------------------------------------------------------------

    pub(crate) fn up(&self, id: UpdaterId) -> Option<&Updater> {
        let slot = self.slots.get(id.index)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.updater.as_ref()
    }

    pub(crate) fn up_mut(&mut self, id: UpdaterId) -> Option<&mut Updater> {
        let slot = self.slots.get_mut(id.index)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.updater.as_mut()
    }

    pub(crate) fn alloc_updater(&mut self, mut updater: Updater) -> UpdaterId {
        updater.mount_order = self.next_mount_order;
        self.next_mount_order += 1;
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index];
                slot.updater = Some(updater);
                UpdaterId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len();
                self.slots.push(Slot {
                    generation: 0,
                    updater: Some(updater),
                });
                UpdaterId {
                    index,
                    generation: 0,
                }
            }
        }
    }

    pub(crate) fn free_updater(&mut self, id: UpdaterId) {
        let Some(slot) = self.slots.get_mut(id.index) else {
            return;
        };
        if slot.generation != id.generation {
            return;
        }
        slot.updater = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use anyhow::{anyhow, Result};

    use super::*;
    use crate::adapter::MemoryDom;
    use crate::component::Component;
    use crate::error::{ErrorInfo, HookKind};
    use crate::node::{component_with, element, stateless, text};
    use crate::types::{Props, State};
    use crate::{propmap, props};

    type Log = Rc<RefCell<Vec<String>>>;

    fn rig() -> (Runtime<MemoryDom>, HostId) {
        let mut rt = Runtime::new(MemoryDom::new());
        let container = rt.adapter_mut().create_container();
        (rt, container)
    }

    // -------------------------------------------------------------------------
    // Lifecycle ordering
    // -------------------------------------------------------------------------

    struct Probe {
        name: &'static str,
        log: Log,
        child: Option<Rc<dyn Fn() -> Node>>,
    }

    impl Component for Probe {
        fn render(&self, _props: &Props, _state: &State, _context: &Context) -> Result<Node> {
            self.log.borrow_mut().push(format!("{}:render", self.name));
            Ok(match &self.child {
                Some(build) => element("div", props! {}, vec![build()]),
                None => text(self.name),
            })
        }

        fn will_mount(&mut self, _p: &Props, _s: &State, _scope: &mut Scope) -> Result<()> {
            self.log.borrow_mut().push(format!("{}:will_mount", self.name));
            Ok(())
        }

        fn did_mount(&mut self, _p: &Props, _s: &State, _scope: &mut Scope) -> Result<()> {
            self.log.borrow_mut().push(format!("{}:did_mount", self.name));
            Ok(())
        }

        fn will_unmount(&mut self) -> Result<()> {
            self.log.borrow_mut().push(format!("{}:will_unmount", self.name));
            Ok(())
        }
    }

    fn probe(name: &'static str, log: Log, child: Option<Rc<dyn Fn() -> Node>>) -> Node {
        component_with(name, props! {}, move || {
            Ok(Box::new(Probe {
                name,
                log: log.clone(),
                child: child.clone(),
            }) as Box<dyn Component>)
        })
    }

    #[test]
    fn test_mount_order_parent_renders_first_child_commits_first() {
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let (mut rt, container) = rig();

        let inner_log = log.clone();
        let tree = probe(
            "Parent",
            log.clone(),
            Some(Rc::new(move || probe("Child", inner_log.clone(), None)) as Rc<dyn Fn() -> Node>),
        );
        rt.render(tree, container).unwrap();

        assert_eq!(
            log.borrow().as_slice(),
            &[
                "Parent:will_mount".to_string(),
                "Parent:render".to_string(),
                "Child:will_mount".to_string(),
                "Child:render".to_string(),
                "Child:did_mount".to_string(),
                "Parent:did_mount".to_string(),
            ]
        );
    }

    #[test]
    fn test_unmount_runs_hooks_and_clears_host() {
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let (mut rt, container) = rig();
        let inner_log = log.clone();
        rt.render(
            probe(
                "Parent",
                log.clone(),
                Some(Rc::new(move || probe("Child", inner_log.clone(), None)) as Rc<dyn Fn() -> Node>),
            ),
            container,
        )
        .unwrap();
        let div = rt.adapter().children(container)[0];
        log.borrow_mut().clear();

        rt.unmount(container).unwrap();

        assert_eq!(
            log.borrow().as_slice(),
            &[
                "Parent:will_unmount".to_string(),
                "Child:will_unmount".to_string(),
            ]
        );
        assert!(rt.adapter().children(container).is_empty());
        assert!(!rt.adapter().is_alive(div));
    }

    // -------------------------------------------------------------------------
    // Stateless components and context
    // -------------------------------------------------------------------------

    #[test]
    fn test_stateless_component_rerenders_on_new_props() {
        let (mut rt, container) = rig();
        let label = |value: &str| {
            stateless("Label", props! { "value" => value }, |props, _| {
                let value = match props.get("value") {
                    Some(PropValue::Str(s)) => s.to_string(),
                    _ => String::new(),
                };
                element("span", props! {}, vec![text(value)])
            })
        };

        rt.render(label("one"), container).unwrap();
        let span = rt.adapter().children(container)[0];
        assert_eq!(rt.adapter().render_to_string(span), "<span>one</span>");

        rt.render(label("two"), container).unwrap();
        assert_eq!(rt.adapter().children(container), vec![span]);
        assert_eq!(rt.adapter().render_to_string(span), "<span>two</span>");
    }

    #[test]
    fn test_child_context_reaches_descendants_not_ancestors() {
        struct Provider;
        impl Component for Provider {
            fn render(&self, _p: &Props, _s: &State, context: &Context) -> Result<Node> {
                // the provider itself must not see its own addition
                assert!(context.get("theme").is_none());
                Ok(element(
                    "div",
                    props! {},
                    vec![stateless("Reader", props! {}, |_, context| {
                        let theme = match context.get("theme") {
                            Some(PropValue::Str(s)) => s.to_string(),
                            _ => "unset".to_string(),
                        };
                        text(theme)
                    })],
                ))
            }

            fn child_context(&self, _p: &Props, _s: &State, _parent: &Context) -> Option<crate::types::PropMap> {
                Some(propmap! { "theme" => "dark" })
            }
        }

        let (mut rt, container) = rig();
        rt.render(
            component_with("Provider", props! {}, || Ok(Box::new(Provider) as Box<dyn Component>)),
            container,
        )
        .unwrap();

        assert_eq!(
            rt.adapter().render_to_string(rt.adapter().children(container)[0]),
            "<div>dark</div>"
        );
    }

    // -------------------------------------------------------------------------
    // Errors
    // -------------------------------------------------------------------------

    struct Boundary {
        caught: Log,
    }

    impl Component for Boundary {
        fn render(&self, _p: &Props, state: &State, _c: &Context) -> Result<Node> {
            if state.contains("failed") {
                return Ok(text("fallback"));
            }
            Ok(component_with("Bad", props! {}, || {
                Ok(Box::new(Bad) as Box<dyn Component>)
            }))
        }

        fn catches_errors(&self) -> bool {
            true
        }

        fn did_catch(&mut self, error: &CoreError, info: &ErrorInfo, scope: &mut Scope) -> Result<()> {
            self.caught
                .borrow_mut()
                .push(format!("{}:{}", info.component, error.component()));
            scope.set_state(propmap! { "failed" => true });
            Ok(())
        }
    }

    struct Bad;
    impl Component for Bad {
        fn render(&self, _p: &Props, _s: &State, _c: &Context) -> Result<Node> {
            Err(anyhow!("render exploded"))
        }
    }

    #[test]
    fn test_render_error_reaches_boundary_and_renders_fallback() {
        let caught: Log = Rc::new(RefCell::new(Vec::new()));
        let (mut rt, container) = rig();
        let boundary_caught = caught.clone();

        rt.render(
            component_with("Boundary", props! {}, move || {
                Ok(Box::new(Boundary {
                    caught: boundary_caught.clone(),
                }) as Box<dyn Component>)
            }),
            container,
        )
        .unwrap();

        assert_eq!(caught.borrow().as_slice(), &["Bad:Bad".to_string()]);
        assert_eq!(
            rt.adapter().render_to_string(container),
            "<#container>fallback</#container>"
        );
        assert!(rt.take_uncaught().is_empty());
    }

    #[test]
    fn test_boundary_fallback_commits_at_the_failed_child_slot() {
        let caught: Log = Rc::new(RefCell::new(Vec::new()));
        let (mut rt, container) = rig();
        let boundary_caught = caught.clone();

        rt.render(
            element(
                "div",
                props! {},
                vec![
                    component_with("Boundary", props! {}, move || {
                        Ok(Box::new(Boundary {
                            caught: boundary_caught.clone(),
                        }) as Box<dyn Component>)
                    }),
                    element("p", props! {}, vec![text("sibling")]),
                ],
            ),
            container,
        )
        .unwrap();

        assert_eq!(caught.borrow().as_slice(), &["Bad:Bad".to_string()]);
        // the fallback occupies the failed child's slot, not the end
        let div = rt.adapter().children(container)[0];
        assert_eq!(
            rt.adapter().render_to_string(div),
            "<div>fallback<p>sibling</p></div>"
        );
    }

    #[test]
    fn test_failing_child_leaves_sibling_subtrees_untouched() {
        let (mut rt, container) = rig();
        let tree = || {
            element(
                "div",
                props! {},
                vec![
                    element("span", props! {}, vec![text("left")]),
                    component_with("Bad", props! {}, || Ok(Box::new(Bad) as Box<dyn Component>)),
                    element("span", props! {}, vec![text("right")]),
                ],
            )
        };

        let err = rt.render(tree(), container).unwrap_err();
        assert!(matches!(err, CoreError::Render { .. }));

        let div = rt.adapter().children(container)[0];
        let kids = rt.adapter().children(div);
        // left span, the failed slot's inert placeholder, right span
        assert_eq!(kids.len(), 3);
        assert_eq!(
            rt.adapter().render_to_string(div),
            "<div><span>left</span><span>right</span></div>"
        );

        // re-rendering past the same failure keeps every sibling handle
        assert!(rt.render(tree(), container).is_err());
        assert_eq!(rt.adapter().children(div), kids);
        assert!(rt.adapter().is_alive(kids[0]));
        assert!(rt.adapter().is_alive(kids[2]));
    }

    #[test]
    fn test_replacement_whose_render_fails_detaches_the_old_node() {
        let (mut rt, container) = rig();
        rt.render(element("div", props! {}, vec![text("x")]), container)
            .unwrap();
        let div = rt.adapter().children(container)[0];
        let old = rt.adapter().children(div)[0];

        let err = rt
            .render(
                element(
                    "div",
                    props! {},
                    vec![component_with("Bad", props! {}, || {
                        Ok(Box::new(Bad) as Box<dyn Component>)
                    })],
                ),
                container,
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::Render { .. }));

        // the old text node left the child list, not just the arena
        let kids = rt.adapter().children(div);
        assert!(!kids.contains(&old));
        assert!(!rt.adapter().is_alive(old));
        assert_eq!(kids.len(), 1);
        assert!(rt.adapter().is_alive(kids[0]));
        assert_eq!(rt.adapter().render_to_string(div), "<div></div>");
    }

    #[test]
    fn test_construction_error_mounts_placeholder_and_reports() {
        let (mut rt, container) = rig();

        let result = rt.render(
            component_with("Broken", props! {}, || Err(anyhow!("no instance"))),
            container,
        );

        let err = result.unwrap_err();
        assert!(matches!(err, CoreError::Construction { .. }));
        assert_eq!(err.component(), "Broken");
        // inert placeholder keeps the container consistent
        assert_eq!(rt.adapter().render_to_string(container), "<#container></#container>");
    }

    #[test]
    fn test_uncaught_render_error_keeps_last_committed_output() {
        struct Flaky;
        impl Component for Flaky {
            fn initial_state(&self, _p: &Props) -> State {
                propmap! { "ok" => true }
            }
            fn render(&self, _p: &Props, state: &State, _c: &Context) -> Result<Node> {
                if state.contains("explode") {
                    return Err(anyhow!("boom"));
                }
                Ok(element(
                    "div",
                    props! { "onPress" => Handler::new(|scope| {
                        scope.set_state(propmap! { "explode" => true });
                    }) },
                    vec![text("steady")],
                ))
            }
        }

        let (mut rt, container) = rig();
        rt.render(
            component_with("Flaky", props! {}, || Ok(Box::new(Flaky) as Box<dyn Component>)),
            container,
        )
        .unwrap();
        let div = rt.adapter().children(container)[0];

        let err = rt.dispatch(div, "onPress").unwrap_err();
        assert!(matches!(err, CoreError::Render { .. }));
        // failed render never touches the committed subtree
        assert_eq!(
            rt.adapter().render_to_string(container),
            "<#container><div>steady</div></#container>"
        );
    }

    #[test]
    fn test_hook_error_is_isolated_and_surfaced() {
        struct SoreMount;
        impl Component for SoreMount {
            fn render(&self, _p: &Props, _s: &State, _c: &Context) -> Result<Node> {
                Ok(text("up"))
            }
            fn did_mount(&mut self, _p: &Props, _s: &State, _scope: &mut Scope) -> Result<()> {
                Err(anyhow!("mount hook failed"))
            }
        }

        let (mut rt, container) = rig();
        let err = rt
            .render(
                component_with("SoreMount", props! {}, || {
                    Ok(Box::new(SoreMount) as Box<dyn Component>)
                }),
                container,
            )
            .unwrap_err();

        match err {
            CoreError::Hook { hook, .. } => assert_eq!(hook, HookKind::DidMount),
            other => panic!("expected hook error, got {other}"),
        }
        // the tree mounted despite the failing hook
        assert_eq!(
            rt.adapter().render_to_string(container),
            "<#container>up</#container>"
        );
        assert!(rt.take_uncaught().is_empty());
    }

    #[test]
    fn test_dispatch_without_handler_is_false() {
        let (mut rt, container) = rig();
        rt.render(element("div", props! {}, vec![]), container).unwrap();
        let div = rt.adapter().children(container)[0];

        assert!(!rt.dispatch(div, "onPress").unwrap());
        assert!(!rt.dispatch(HostId(9999), "onPress").unwrap());
    }
}

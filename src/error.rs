//! Error taxonomy and boundary propagation.
//!
//! Three failure classes, all caught at the owning updater and never allowed
//! to unwind past it:
//!
//! - `Construction`: a component factory failed. The slot mounts an inert
//!   placeholder and boundary search begins immediately.
//! - `Render`: a render call failed. The subtree keeps its last committed
//!   state.
//! - `Hook`: one lifecycle hook failed. Isolated to that invocation; other
//!   hooks still fire on later cycles.
//!
//! Propagation walks the chain of component owners upward from the failing
//! updater until one opts in via `catches_errors`. Every caught error is
//! logged whether or not a boundary exists.

use std::fmt;

use thiserror::Error;

// =============================================================================
// Taxonomy
// =============================================================================

/// A caught component failure.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("failed to construct component `{component}`: {source}")]
    Construction {
        component: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("render of component `{component}` failed: {source}")]
    Render {
        component: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("{hook} hook of component `{component}` failed: {source}")]
    Hook {
        component: String,
        hook: HookKind,
        #[source]
        source: anyhow::Error,
    },
}

impl CoreError {
    /// Display name of the component the error originated in.
    pub fn component(&self) -> &str {
        match self {
            CoreError::Construction { component, .. } => component,
            CoreError::Render { component, .. } => component,
            CoreError::Hook { component, .. } => component,
        }
    }

    pub(crate) fn from_hook(component: &str, hook: HookKind, source: anyhow::Error) -> Self {
        match hook {
            HookKind::Constructor => CoreError::Construction {
                component: component.to_string(),
                source,
            },
            HookKind::Render => CoreError::Render {
                component: component.to_string(),
                source,
            },
            _ => CoreError::Hook {
                component: component.to_string(),
                hook,
                source,
            },
        }
    }
}

/// The lifecycle step a failure was caught in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    Constructor,
    WillMount,
    Render,
    DidMount,
    WillReceiveProps,
    ShouldUpdate,
    WillUpdate,
    DidUpdate,
    WillUnmount,
    DidCatch,
}

impl HookKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookKind::Constructor => "constructor",
            HookKind::WillMount => "will_mount",
            HookKind::Render => "render",
            HookKind::DidMount => "did_mount",
            HookKind::WillReceiveProps => "will_receive_props",
            HookKind::ShouldUpdate => "should_update",
            HookKind::WillUpdate => "will_update",
            HookKind::DidUpdate => "did_update",
            HookKind::WillUnmount => "will_unmount",
            HookKind::DidCatch => "did_catch",
        }
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Error Info
// =============================================================================

/// Context handed to a boundary's `did_catch` alongside the error.
#[derive(Debug, Clone)]
pub struct ErrorInfo {
    /// Display name of the failing component.
    pub component: String,
    /// The lifecycle step that failed.
    pub hook: HookKind,
    /// Component owner names from the failing component upward.
    pub owner_stack: Vec<String>,
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "in {} of `{}`", self.hook, self.component)?;
        for owner in &self.owner_stack {
            write!(f, "\n  in `{owner}`")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_names_component_and_hook() {
        let err = CoreError::from_hook("Panel", HookKind::DidMount, anyhow::anyhow!("boom"));
        let text = err.to_string();
        assert!(text.contains("did_mount"));
        assert!(text.contains("Panel"));
        assert!(text.contains("boom"));
    }

    #[test]
    fn test_constructor_and_render_map_to_their_variants() {
        let c = CoreError::from_hook("A", HookKind::Constructor, anyhow::anyhow!("x"));
        assert!(matches!(c, CoreError::Construction { .. }));

        let r = CoreError::from_hook("A", HookKind::Render, anyhow::anyhow!("x"));
        assert!(matches!(r, CoreError::Render { .. }));
    }

    #[test]
    fn test_error_info_display_includes_owner_stack() {
        let info = ErrorInfo {
            component: "Leaf".to_string(),
            hook: HookKind::Render,
            owner_stack: vec!["Middle".to_string(), "Root".to_string()],
        };
        let text = info.to_string();
        assert!(text.contains("`Leaf`"));
        assert!(text.contains("`Middle`"));
        assert!(text.contains("`Root`"));
    }
}

use std::any::Any;
use std::fmt;

use crate::reconciler::InstanceId;

/// Failure raised by a component hook.
///
/// Hooks return it directly (`render`, `did_mount`, ...) or the reconciler
/// builds one from a caught panic payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComponentError {
    pub message: String,
    /// Name of the component whose hook failed. Filled in by the reconciler
    /// when the hook left it empty.
    pub component: String,
}

impl ComponentError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            component: String::new(),
        }
    }

    pub fn in_component(mut self, name: &str) -> Self {
        if self.component.is_empty() {
            self.component = name.to_string();
        }
        self
    }

    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else if let Some(s) = payload.downcast_ref::<&str>() {
            s.to_string()
        } else {
            "Unknown panic".to_string()
        };
        Self::new(message)
    }
}

impl fmt::Display for ComponentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.component.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.component, self.message)
        }
    }
}

impl std::error::Error for ComponentError {}

/// Where an intercepted error came from, handed to `ErrorBoundary::did_catch`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorInfo {
    /// The component whose hook failed.
    pub component: String,
    /// Component names from the failing instance up to (excluding) the
    /// boundary, innermost first.
    pub component_stack: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("instance {0:?} has been unmounted")]
    Detached(InstanceId),
    #[error("instance {id:?} is a `{actual}`, not a `{expected}`")]
    TypeMismatch {
        id: InstanceId,
        expected: &'static str,
        actual: &'static str,
    },
    #[error("error captured by boundary {boundary:?}: {error}")]
    Captured {
        boundary: InstanceId,
        error: ComponentError,
    },
    #[error("uncaught component error: {0}")]
    Uncaught(ComponentError),
    #[error("maximum update depth exceeded ({0} cycles in one flush)")]
    UpdateDepthExceeded(usize),
}

pub type Result<T, E = LifecycleError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_payload_message() {
        let e = ComponentError::from_panic(Box::new("boom"));
        assert_eq!(e.message, "boom");

        let e = ComponentError::from_panic(Box::new(String::from("owned boom")));
        assert_eq!(e.message, "owned boom");

        let e = ComponentError::from_panic(Box::new(7u32));
        assert_eq!(e.message, "Unknown panic");
    }

    #[test]
    fn test_in_component_keeps_explicit_name() {
        let e = ComponentError {
            message: "bad".into(),
            component: "Inner".into(),
        }
        .in_component("Outer");
        assert_eq!(e.component, "Inner");
        assert_eq!(ComponentError::new("bad").in_component("Outer").to_string(), "Outer: bad");
    }
}

//! Annotated template component.
//!
//! `Template` implements every hook, including the error-boundary pair, with
//! trivial bodies. The interesting decisions (how state is derived, when to
//! re-render, what the snapshot measures, which fallback to show) live in a
//! [`TemplatePolicy`] chosen at the type level:
//!
//! ```rust
//! use hookline_core::*;
//!
//! let mut r = Reconciler::new(NullSink);
//! let t = r.mount::<Template>(TemplateProps::new("x")).unwrap();
//! assert_eq!(r.state(t).unwrap().message, DemoPolicy::FALLBACK_MESSAGE);
//!
//! let p = r.mount::<Template<PurePolicy>>(TemplateProps::new("x")).unwrap();
//! assert_eq!(r.state(p).unwrap().message, "x");
//! ```

use std::marker::PhantomData;

use crate::component::{Component, ErrorBoundary, FunctionComponent, Stateless, props_or_state_changed};
use crate::element::Element;
use crate::error::{ComponentError, ErrorInfo};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TemplateProps {
    pub value: String,
}

impl TemplateProps {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TemplateState {
    pub message: String,
    pub color: String,
    pub kind: String,
    /// Set by `derive_state_from_error`; switches `render` to the fallback.
    pub error: Option<String>,
}

/// Snapshot taken before an update is committed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScrollSnapshot {
    pub scroll_height: u32,
}

/// Static defaults merged into the initial state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TemplateDefaults {
    pub color: String,
    pub kind: String,
}

impl Default for TemplateDefaults {
    fn default() -> Self {
        Self {
            color: "blue".into(),
            kind: "button".into(),
        }
    }
}

pub trait TemplatePolicy: 'static {
    fn defaults() -> TemplateDefaults {
        TemplateDefaults::default()
    }

    fn derive(props: &TemplateProps, state: &TemplateState) -> Option<TemplateState>;

    fn should_update(
        props: &TemplateProps,
        state: &TemplateState,
        next_props: &TemplateProps,
        next_state: &TemplateState,
    ) -> bool;

    fn snapshot(prev_props: &TemplateProps, prev_state: &TemplateState) -> ScrollSnapshot;

    fn fallback(state: &TemplateState, error: &ComponentError) -> Option<TemplateState> {
        Some(TemplateState {
            error: Some(error.to_string()),
            ..state.clone()
        })
    }
}

/// Placeholder behavior: every derive overwrites the message with a fixed
/// string, every update proceeds, and the snapshot is a constant.
pub struct DemoPolicy;

impl DemoPolicy {
    pub const FALLBACK_MESSAGE: &'static str = "fallback message";
    pub const SCROLL_HEIGHT: u32 = 10;
}

impl TemplatePolicy for DemoPolicy {
    fn derive(_props: &TemplateProps, state: &TemplateState) -> Option<TemplateState> {
        Some(TemplateState {
            message: Self::FALLBACK_MESSAGE.to_string(),
            ..state.clone()
        })
    }

    fn should_update(_: &TemplateProps, _: &TemplateState, _: &TemplateProps, _: &TemplateState) -> bool {
        true
    }

    fn snapshot(_prev_props: &TemplateProps, _prev_state: &TemplateState) -> ScrollSnapshot {
        ScrollSnapshot {
            scroll_height: Self::SCROLL_HEIGHT,
        }
    }
}

/// Mirrors `props.value` into the message and only re-renders when props or
/// state actually changed.
pub struct PurePolicy;

impl TemplatePolicy for PurePolicy {
    fn derive(props: &TemplateProps, state: &TemplateState) -> Option<TemplateState> {
        (state.message != props.value).then(|| TemplateState {
            message: props.value.clone(),
            ..state.clone()
        })
    }

    fn should_update(
        props: &TemplateProps,
        state: &TemplateState,
        next_props: &TemplateProps,
        next_state: &TemplateState,
    ) -> bool {
        props_or_state_changed(props, state, next_props, next_state)
    }

    fn snapshot(prev_props: &TemplateProps, _prev_state: &TemplateState) -> ScrollSnapshot {
        ScrollSnapshot {
            scroll_height: prev_props.value.lines().count() as u32,
        }
    }
}

pub struct Template<P = DemoPolicy> {
    caught: usize,
    _policy: PhantomData<fn() -> P>,
}

impl<P> Template<P> {
    /// Number of errors this instance has intercepted.
    pub fn caught(&self) -> usize {
        self.caught
    }
}

impl<P: TemplatePolicy> Component for Template<P> {
    type Props = TemplateProps;
    type State = TemplateState;
    type Snapshot = ScrollSnapshot;

    fn name() -> &'static str {
        "Template"
    }

    fn initialize(_props: &TemplateProps) -> (Self, TemplateState) {
        let defaults = P::defaults();
        let state = TemplateState {
            message: String::new(),
            color: defaults.color,
            kind: defaults.kind,
            error: None,
        };
        (
            Template {
                caught: 0,
                _policy: PhantomData,
            },
            state,
        )
    }

    fn derive_state_from_props(props: &TemplateProps, state: &TemplateState) -> Option<TemplateState> {
        P::derive(props, state)
    }

    fn should_update(
        &self,
        props: &TemplateProps,
        state: &TemplateState,
        next_props: &TemplateProps,
        next_state: &TemplateState,
    ) -> bool {
        P::should_update(props, state, next_props, next_state)
    }

    fn render(&self, _props: &TemplateProps, state: &TemplateState) -> Result<Element, ComponentError> {
        if let Some(error) = &state.error {
            return Ok(Element::new("div").attr("role", "alert").text(error.clone()));
        }
        Ok(Element::new("div")
            .attr("color", state.color.clone())
            .attr("type", state.kind.clone())
            .text("Hello"))
    }

    fn get_snapshot_before_update(&self, prev_props: &TemplateProps, prev_state: &TemplateState) -> ScrollSnapshot {
        P::snapshot(prev_props, prev_state)
    }

    fn as_error_boundary(&mut self) -> Option<&mut dyn ErrorBoundary<State = TemplateState>> {
        Some(self)
    }
}

impl<P: TemplatePolicy> ErrorBoundary for Template<P> {
    type State = TemplateState;

    fn derive_state_from_error(&self, state: &TemplateState, error: &ComponentError) -> Option<TemplateState> {
        P::fallback(state, error)
    }

    fn did_catch(&mut self, error: &ComponentError, info: &ErrorInfo) {
        self.caught += 1;
        log::error!(
            "Template caught {error} (stack: {})",
            info.component_stack.join(" <- ")
        );
    }
}

/// Function component: renders the value as a heading.
pub struct Count;

impl FunctionComponent for Count {
    type Props = TemplateProps;

    fn render(props: &TemplateProps) -> Result<Element, ComponentError> {
        Ok(Element::new("h1").text(props.value.clone()))
    }
}

pub type CountView = Stateless<Count>;

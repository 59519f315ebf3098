//! # The component contract
//!
//! A [`Component`] never drives itself. The [`Reconciler`](crate::Reconciler)
//! owns every instance and calls its hooks in a fixed order:
//!
//! Mounting:
//!
//! 1. `initialize(props)` builds the instance and its first `State`.
//! 2. `derive_state_from_props(props, state)`
//! 3. `render(props, state)`
//! 4. `did_mount()`; the output is now committed.
//!
//! Updating (new props, `set_state`, or `force_update`):
//!
//! 1. `derive_state_from_props(next_props, state)`
//! 2. `should_update(..)`; `false` ends the cycle here. Forced updates skip
//!    this gate.
//! 3. `render(next_props, next_state)`
//! 4. `get_snapshot_before_update(prev_props, prev_state)`
//! 5. `did_update(prev_props, prev_state, snapshot)`
//!
//! Unmounting: `will_unmount()`, exactly once.
//!
//! Recovering (error boundaries only, after a descendant failed):
//! `derive_state_from_error`, `derive_state_from_props`, `render`, then
//! `did_catch` once the failed subtree is gone.
//!
//! `derive_state_from_props` has no `self` receiver: it cannot see the
//! instance, only its inputs. `should_update`, `render` and
//! `get_snapshot_before_update` take `&self` and must not have side effects.
//! Side effects belong in `did_mount` / `did_update` / `will_unmount`, which
//! may request further updates through [`Context`]:
//!
//! ```rust
//! use hookline_core::*;
//!
//! struct Ticker;
//!
//! impl Component for Ticker {
//!     type Props = ();
//!     type State = u32;
//!     type Snapshot = ();
//!
//!     fn get_snapshot_before_update(&self, _props: &(), _ticks: &u32) {}
//!
//!     fn initialize(_props: &()) -> (Self, u32) {
//!         (Ticker, 0)
//!     }
//!
//!     fn render(&self, _props: &(), ticks: &u32) -> Result<Element, ComponentError> {
//!         Ok(Element::new("span").text(ticks.to_string()))
//!     }
//!
//!     fn did_mount(&mut self, cx: &mut Context<'_, Self>) -> Result<(), ComponentError> {
//!         cx.set_state(|ticks, _| ticks + 1);
//!         Ok(())
//!     }
//! }
//!
//! let mut r = Reconciler::new(NullSink);
//! let ticker = r.mount::<Ticker>(()).unwrap();
//! assert_eq!(r.state(ticker), Some(&1));
//! ```

use std::any::type_name;
use std::fmt::Debug;
use std::marker::PhantomData;

use crate::element::Element;
use crate::error::{ComponentError, ErrorInfo};

pub trait Component: Sized + 'static {
    type Props: Clone + Debug + 'static;
    type State: Clone + Debug + 'static;
    type Snapshot: Debug + 'static;

    /// Display name used in traces and error info.
    fn name() -> &'static str {
        short_type_name::<Self>()
    }

    /// Build the instance and its initial state. Nothing is committed yet.
    fn initialize(props: &Self::Props) -> (Self, Self::State);

    /// Pure. `None` keeps `state` as is.
    fn derive_state_from_props(_props: &Self::Props, _state: &Self::State) -> Option<Self::State> {
        None
    }

    fn should_update(
        &self,
        _props: &Self::Props,
        _state: &Self::State,
        _next_props: &Self::Props,
        _next_state: &Self::State,
    ) -> bool {
        true
    }

    fn render(&self, props: &Self::Props, state: &Self::State) -> Result<Element, ComponentError>;

    /// Runs after `render` and before the new output is committed, on updates
    /// only. The value is moved into the matching `did_update`; components
    /// with nothing to measure use `Snapshot = ()` and an empty body.
    fn get_snapshot_before_update(&self, prev_props: &Self::Props, prev_state: &Self::State) -> Self::Snapshot;

    fn did_mount(&mut self, _cx: &mut Context<'_, Self>) -> Result<(), ComponentError> {
        Ok(())
    }

    fn did_update(
        &mut self,
        _cx: &mut Context<'_, Self>,
        _prev_props: &Self::Props,
        _prev_state: &Self::State,
        _snapshot: Self::Snapshot,
    ) -> Result<(), ComponentError> {
        Ok(())
    }

    fn will_unmount(&mut self) -> Result<(), ComponentError> {
        Ok(())
    }

    /// Capability probe. Components that intercept descendant failures return
    /// `Some(self)` here and implement [`ErrorBoundary`].
    fn as_error_boundary(&mut self) -> Option<&mut dyn ErrorBoundary<State = Self::State>> {
        None
    }
}

/// Optional capability: recover from a failure somewhere in the subtree.
pub trait ErrorBoundary {
    type State;

    /// Pure. Fallback state to render instead of the failed subtree; `None`
    /// keeps the current state.
    fn derive_state_from_error(&self, state: &Self::State, error: &ComponentError)
    -> Option<Self::State>;

    /// Diagnostics only. Runs after the fallback has been committed and must
    /// not fail.
    fn did_catch(&mut self, error: &ComponentError, info: &ErrorInfo);
}

/// Handed to side-effecting hooks. Requests are queued and run by the
/// reconciler once the current sequence has finished.
pub struct Context<'a, C: Component> {
    props: &'a C::Props,
    state: &'a C::State,
    requests: &'a mut Vec<Request<C>>,
}

impl<'a, C: Component> Context<'a, C> {
    pub(crate) fn new(
        props: &'a C::Props,
        state: &'a C::State,
        requests: &'a mut Vec<Request<C>>,
    ) -> Self {
        Self {
            props,
            state,
            requests,
        }
    }

    /// Committed props.
    pub fn props(&self) -> &C::Props {
        self.props
    }

    /// Committed state. Queued `set_state` calls are not reflected.
    pub fn state(&self) -> &C::State {
        self.state
    }

    pub fn set_state(&mut self, f: impl FnOnce(&C::State, &C::Props) -> C::State + 'static) {
        self.requests.push(Request::SetState(Box::new(f)));
    }

    pub fn force_update(&mut self) {
        self.requests.push(Request::Force);
    }
}

pub(crate) enum Request<C: Component> {
    SetState(Box<dyn FnOnce(&C::State, &C::Props) -> C::State>),
    Force,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Mounting,
    Idle,
    Updating,
    Unmounting,
}

/// Result of one update cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Rendered and committed; `did_update` ran.
    Committed,
    /// `should_update` returned false; output left untouched.
    Skipped,
}

/// Shallow-equality gate for components whose props and state are
/// `PartialEq`. Use it from `should_update` to only re-render on change.
pub fn props_or_state_changed<P: PartialEq, S: PartialEq>(
    props: &P,
    state: &S,
    next_props: &P,
    next_state: &S,
) -> bool {
    props != next_props || state != next_state
}

/// Render-only component: props in, element out, no state and no hooks.
pub trait FunctionComponent: 'static {
    type Props: Clone + Debug + PartialEq + 'static;

    fn render(props: &Self::Props) -> Result<Element, ComponentError>;
}

/// Drives a [`FunctionComponent`] through the regular lifecycle.
/// Re-renders only when props change, unless forced.
pub struct Stateless<F>(PhantomData<fn() -> F>);

impl<F: FunctionComponent> Component for Stateless<F> {
    type Props = F::Props;
    type State = ();
    type Snapshot = ();

    fn get_snapshot_before_update(&self, _: &F::Props, _: &()) {}

    fn name() -> &'static str {
        short_type_name::<F>()
    }

    fn initialize(_props: &F::Props) -> (Self, ()) {
        (Stateless(PhantomData), ())
    }

    fn should_update(&self, props: &F::Props, _: &(), next_props: &F::Props, _: &()) -> bool {
        props != next_props
    }

    fn render(&self, props: &F::Props, _: &()) -> Result<Element, ComponentError> {
        F::render(props)
    }
}

/// `a::b::Template<a::c::Policy>` -> `Template`
pub(crate) fn short_type_name<T: ?Sized>() -> &'static str {
    let full = type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

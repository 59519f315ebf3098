//! Typed instance storage and the hook sequences themselves.
//!
//! [`Instance<C>`] holds one component with its committed props, state and
//! output. The reconciler only sees it through [`AnyInstance`], so a tree can
//! mix component types.

use std::any::Any;
use std::fmt::Debug;
use std::panic::{self, AssertUnwindSafe};

use smallvec::{SmallVec, smallvec};

use crate::component::{Component, Context, Outcome, Phase, Request};
use crate::config::ReconcilerConfig;
use crate::element::Element;
use crate::error::{ComponentError, ErrorInfo};
use crate::reconciler::InstanceId;
use crate::sink::{DiagnosticSink, Hook, HookRecord};

pub(crate) type Args = SmallVec<[(&'static str, String); 3]>;

fn fmt_dbg<T: Debug + ?Sized>(v: &T) -> String {
    format!("{v:?}")
}

/// Runs single hooks for one instance: catches panics and reports each call
/// to the sink once it returns.
pub(crate) struct HookRunner<'a> {
    pub id: InstanceId,
    pub sink: &'a dyn DiagnosticSink,
    pub config: &'a ReconcilerConfig,
}

impl HookRunner<'_> {
    /// Formats arguments up front, only if the hook is traced.
    pub fn args(&self, hook: Hook, f: impl FnOnce() -> Args) -> Option<Args> {
        self.config.trace.contains(hook.mask()).then(f)
    }

    pub fn run<R>(
        &self,
        component: &'static str,
        hook: Hook,
        args: Option<Args>,
        f: impl FnOnce() -> R,
    ) -> Result<R, ComponentError> {
        let out = self.guard(component, f);
        if let Some(args) = args {
            self.sink.record(&HookRecord {
                instance: self.id,
                component,
                hook,
                args,
            });
        }
        out
    }

    pub fn try_run<R>(
        &self,
        component: &'static str,
        hook: Hook,
        args: Option<Args>,
        f: impl FnOnce() -> Result<R, ComponentError>,
    ) -> Result<R, ComponentError> {
        self.run(component, hook, args, f)?
            .map_err(|e| e.in_component(component))
    }

    /// Panic guard without a trace record, for user closures such as queued
    /// state updaters.
    pub fn guard<R>(&self, component: &'static str, f: impl FnOnce() -> R) -> Result<R, ComponentError> {
        if self.config.catch_panics {
            panic::catch_unwind(AssertUnwindSafe(f))
                .map_err(|payload| ComponentError::from_panic(payload).in_component(component))
        } else {
            Ok(f())
        }
    }
}

pub(crate) trait AnyInstance {
    fn name(&self) -> &'static str;
    fn phase(&self) -> Phase;
    fn output(&self) -> &Element;
    fn has_pending(&self) -> bool;
    fn clear_pending(&mut self);
    fn did_mount(&mut self, hooks: &HookRunner<'_>) -> Result<(), ComponentError>;
    fn update(&mut self, hooks: &HookRunner<'_>) -> Result<Outcome, ComponentError>;
    fn is_error_boundary(&mut self) -> bool;
    fn recover(&mut self, error: &ComponentError, hooks: &HookRunner<'_>) -> Result<(), ComponentError>;
    fn did_catch(
        &mut self,
        error: &ComponentError,
        info: &ErrorInfo,
        hooks: &HookRunner<'_>,
    ) -> Result<(), ComponentError>;
    fn will_unmount(&mut self, hooks: &HookRunner<'_>) -> Result<(), ComponentError>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

pub(crate) struct Instance<C: Component> {
    pub component: C,
    pub props: C::Props,
    pub state: C::State,
    pub output: Element,
    pub phase: Phase,
    /// Props delivered by the parent, applied by the next cycle.
    pub next_props: Option<C::Props>,
    pub pending: Vec<Request<C>>,
}

impl<C: Component> Instance<C> {
    /// initialize -> derive_state_from_props -> render. Nothing is committed
    /// to the tree until this returns `Ok`.
    pub fn mount(props: C::Props, hooks: &HookRunner<'_>) -> Result<Self, ComponentError> {
        let name = C::name();
        let args = hooks.args(Hook::Initialize, || smallvec![("props", fmt_dbg(&props))]);
        let (component, state) = hooks.run(name, Hook::Initialize, args, || C::initialize(&props))?;

        let state = Self::derive(&props, state, hooks)?;

        let args = hooks.args(Hook::Render, || {
            smallvec![("props", fmt_dbg(&props)), ("state", fmt_dbg(&state))]
        });
        let output = hooks.try_run(name, Hook::Render, args, || component.render(&props, &state))?;

        Ok(Instance {
            component,
            props,
            state,
            output,
            phase: Phase::Mounting,
            next_props: None,
            pending: Vec::new(),
        })
    }

    fn derive(
        props: &C::Props,
        state: C::State,
        hooks: &HookRunner<'_>,
    ) -> Result<C::State, ComponentError> {
        let args = hooks.args(Hook::DeriveStateFromProps, || {
            smallvec![("props", fmt_dbg(props)), ("state", fmt_dbg(&state))]
        });
        let derived = hooks.run(C::name(), Hook::DeriveStateFromProps, args, || {
            C::derive_state_from_props(props, &state)
        })?;
        Ok(derived.unwrap_or(state))
    }

    fn update_cycle(&mut self, hooks: &HookRunner<'_>) -> Result<Outcome, ComponentError> {
        let name = C::name();
        let next_props = self.next_props.take().unwrap_or_else(|| self.props.clone());

        // Batch every queued request into one cycle.
        let mut forced = false;
        let mut next_state = self.state.clone();
        for request in std::mem::take(&mut self.pending) {
            match request {
                Request::SetState(f) => {
                    let prev = next_state;
                    next_state = hooks.guard(name, || f(&prev, &next_props))?;
                }
                Request::Force => forced = true,
            }
        }

        let next_state = Self::derive(&next_props, next_state, hooks)?;

        if !forced {
            let args = hooks.args(Hook::ShouldUpdate, || {
                smallvec![
                    ("next_props", fmt_dbg(&next_props)),
                    ("next_state", fmt_dbg(&next_state))
                ]
            });
            let proceed = hooks.run(name, Hook::ShouldUpdate, args, || {
                self.component
                    .should_update(&self.props, &self.state, &next_props, &next_state)
            })?;
            if !proceed {
                // Inputs are still taken over; only the output stays put.
                self.props = next_props;
                self.state = next_state;
                return Ok(Outcome::Skipped);
            }
        }

        let args = hooks.args(Hook::Render, || {
            smallvec![("props", fmt_dbg(&next_props)), ("state", fmt_dbg(&next_state))]
        });
        let output = hooks.try_run(name, Hook::Render, args, || {
            self.component.render(&next_props, &next_state)
        })?;

        let args = hooks.args(Hook::GetSnapshotBeforeUpdate, || {
            smallvec![
                ("prev_props", fmt_dbg(&self.props)),
                ("prev_state", fmt_dbg(&self.state))
            ]
        });
        let snapshot = hooks.run(name, Hook::GetSnapshotBeforeUpdate, args, || {
            self.component
                .get_snapshot_before_update(&self.props, &self.state)
        })?;

        // commit
        let prev_props = std::mem::replace(&mut self.props, next_props);
        let prev_state = std::mem::replace(&mut self.state, next_state);
        self.output = output;

        let args = hooks.args(Hook::DidUpdate, || {
            smallvec![
                ("prev_props", fmt_dbg(&prev_props)),
                ("prev_state", fmt_dbg(&prev_state)),
                ("snapshot", fmt_dbg(&snapshot))
            ]
        });
        let Instance {
            component,
            props,
            state,
            pending,
            ..
        } = &mut *self;
        let mut cx = Context::new(props, state, pending);
        hooks.try_run(name, Hook::DidUpdate, args, || {
            component.did_update(&mut cx, &prev_props, &prev_state, snapshot)
        })?;

        Ok(Outcome::Committed)
    }
}

impl<C: Component> AnyInstance for Instance<C> {
    fn name(&self) -> &'static str {
        C::name()
    }

    fn phase(&self) -> Phase {
        self.phase
    }

    fn output(&self) -> &Element {
        &self.output
    }

    fn has_pending(&self) -> bool {
        !self.pending.is_empty() || self.next_props.is_some()
    }

    fn clear_pending(&mut self) {
        self.pending.clear();
        self.next_props = None;
    }

    fn did_mount(&mut self, hooks: &HookRunner<'_>) -> Result<(), ComponentError> {
        let args = hooks.args(Hook::DidMount, SmallVec::new);
        let Instance {
            component,
            props,
            state,
            pending,
            ..
        } = &mut *self;
        let mut cx = Context::new(props, state, pending);
        let result = hooks.try_run(C::name(), Hook::DidMount, args, || component.did_mount(&mut cx));
        self.phase = Phase::Idle;
        result
    }

    fn update(&mut self, hooks: &HookRunner<'_>) -> Result<Outcome, ComponentError> {
        self.phase = Phase::Updating;
        let result = self.update_cycle(hooks);
        self.phase = Phase::Idle;
        result
    }

    fn is_error_boundary(&mut self) -> bool {
        self.component.as_error_boundary().is_some()
    }

    /// derive_state_from_error -> derive_state_from_props -> render -> commit.
    fn recover(&mut self, error: &ComponentError, hooks: &HookRunner<'_>) -> Result<(), ComponentError> {
        let name = C::name();
        self.phase = Phase::Updating;

        let args = hooks.args(Hook::DeriveStateFromError, || smallvec![("error", error.to_string())]);
        let fallback = match self.component.as_error_boundary() {
            Some(boundary) => hooks.run(name, Hook::DeriveStateFromError, args, || {
                boundary.derive_state_from_error(&self.state, error)
            }),
            None => Err(error.clone()),
        };
        let next_state = match fallback
            .map(|state| state.unwrap_or_else(|| self.state.clone()))
            .and_then(|state| Self::derive(&self.props, state, hooks))
        {
            Ok(state) => state,
            Err(e) => {
                self.phase = Phase::Idle;
                return Err(e);
            }
        };

        let args = hooks.args(Hook::Render, || {
            smallvec![("props", fmt_dbg(&self.props)), ("state", fmt_dbg(&next_state))]
        });
        let rendered = hooks.try_run(name, Hook::Render, args, || {
            self.component.render(&self.props, &next_state)
        });
        self.phase = Phase::Idle;

        self.output = rendered?;
        self.state = next_state;
        Ok(())
    }

    fn did_catch(
        &mut self,
        error: &ComponentError,
        info: &ErrorInfo,
        hooks: &HookRunner<'_>,
    ) -> Result<(), ComponentError> {
        let args = hooks.args(Hook::DidCatch, || {
            smallvec![("error", error.to_string()), ("info", fmt_dbg(info))]
        });
        match self.component.as_error_boundary() {
            Some(boundary) => hooks.run(C::name(), Hook::DidCatch, args, || {
                boundary.did_catch(error, info)
            }),
            None => Err(error.clone()),
        }
    }

    fn will_unmount(&mut self, hooks: &HookRunner<'_>) -> Result<(), ComponentError> {
        self.phase = Phase::Unmounting;
        let args = hooks.args(Hook::WillUnmount, SmallVec::new);
        hooks.try_run(C::name(), Hook::WillUnmount, args, || self.component.will_unmount())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

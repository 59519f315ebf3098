use std::collections::VecDeque;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use slotmap::{SlotMap, new_key_type};
use smallvec::SmallVec;

use crate::component::{Component, Outcome, Phase, Request};
use crate::config::ReconcilerConfig;
use crate::element::Element;
use crate::error::{ComponentError, ErrorInfo, LifecycleError, Result};
use crate::instance::{AnyInstance, HookRunner, Instance};
use crate::sink::{DiagnosticSink, LogSink};

new_key_type! {
    /// Stable id of a mounted instance. Ids of unmounted instances are never
    /// reused, so a stale id is always reported as `Detached`.
    pub struct InstanceId;
}

/// Typed handle returned by `mount`. Dereferences to nothing; pass it back to
/// the reconciler to address the instance.
pub struct Handle<C> {
    id: InstanceId,
    _marker: PhantomData<fn() -> C>,
}

impl<C> Handle<C> {
    fn new(id: InstanceId) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }

    pub fn id(self) -> InstanceId {
        self.id
    }
}

impl<C> Clone for Handle<C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C> Copy for Handle<C> {}

impl<C> PartialEq for Handle<C> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<C> Eq for Handle<C> {}

impl<C> fmt::Debug for Handle<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handle").field(&self.id).finish()
    }
}

impl<C> From<Handle<C>> for InstanceId {
    fn from(h: Handle<C>) -> Self {
        h.id
    }
}

struct Node {
    /// `None` while the instance is being constructed.
    instance: Option<Box<dyn AnyInstance>>,
    parent: Option<InstanceId>,
    children: SmallVec<[InstanceId; 4]>,
}

/// Owns the instance tree and drives every hook.
///
/// All entry points run to completion: requests queued by hooks (through
/// `Context`) are drained before the entry point returns, one batched cycle
/// per instance at a time, never in the middle of another sequence.
pub struct Reconciler {
    nodes: SlotMap<InstanceId, Node>,
    dirty: VecDeque<InstanceId>,
    sink: Rc<dyn DiagnosticSink>,
    config: ReconcilerConfig,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(LogSink)
    }
}

impl Reconciler {
    pub fn new(sink: impl DiagnosticSink + 'static) -> Self {
        Self::with_config(ReconcilerConfig::default(), sink)
    }

    pub fn with_config(config: ReconcilerConfig, sink: impl DiagnosticSink + 'static) -> Self {
        Self {
            nodes: SlotMap::with_key(),
            dirty: VecDeque::new(),
            sink: Rc::new(sink),
            config,
        }
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Mounts a root instance.
    pub fn mount<C: Component>(&mut self, props: C::Props) -> Result<Handle<C>> {
        self.mount_under(None, props)
    }

    /// Mounts an instance below `parent`. Failures during the mount are routed
    /// to the nearest error boundary above `parent`.
    pub fn mount_child<C: Component>(
        &mut self,
        parent: impl Into<InstanceId>,
        props: C::Props,
    ) -> Result<Handle<C>> {
        let parent = parent.into();
        if !self.is_mounted(parent) {
            return Err(LifecycleError::Detached(parent));
        }
        self.mount_under(Some(parent), props)
    }

    fn mount_under<C: Component>(
        &mut self,
        parent: Option<InstanceId>,
        props: C::Props,
    ) -> Result<Handle<C>> {
        let id = self.nodes.insert(Node {
            instance: None,
            parent,
            children: SmallVec::new(),
        });

        let hooks = HookRunner {
            id,
            sink: &*self.sink,
            config: &self.config,
        };
        let instance = match Instance::<C>::mount(props, &hooks) {
            Ok(instance) => instance,
            Err(error) => {
                self.nodes.remove(id);
                log::warn!("mounting {} failed: {error}", C::name());
                return Err(self.route_error(parent, None, vec![C::name().to_string()], error));
            }
        };

        if let Some(node) = self.nodes.get_mut(id) {
            node.instance = Some(Box::new(instance));
        }
        if let Some(p) = parent.and_then(|p| self.nodes.get_mut(p)) {
            p.children.push(id);
        }

        if let Err(error) = self.run_hooked(id, |inst, hooks| inst.did_mount(hooks))? {
            return Err(self.route_error(parent, Some(id), vec![C::name().to_string()], error));
        }
        self.mark_if_pending(id);
        if let Err(error) = self.flush() {
            // No handle escapes a failed mount.
            if self.is_mounted(id)
                && let Some(e) = self.teardown(id)
            {
                log::error!("will_unmount failed while discarding {}: {e}", C::name());
            }
            return Err(error);
        }
        Ok(Handle::new(id))
    }

    /// Replaces the props of an instance wholesale and runs an update cycle.
    pub fn update_props<C: Component>(&mut self, handle: Handle<C>, props: C::Props) -> Result<Outcome> {
        self.typed_mut(handle)?.next_props = Some(props);
        self.run_now(handle.id)
    }

    /// Queues a state update and runs the resulting cycle, batched with any
    /// requests already queued for the instance.
    pub fn set_state<C: Component>(
        &mut self,
        handle: Handle<C>,
        f: impl FnOnce(&C::State, &C::Props) -> C::State + 'static,
    ) -> Result<Outcome> {
        self.typed_mut(handle)?
            .pending
            .push(Request::SetState(Box::new(f)));
        self.run_now(handle.id)
    }

    /// Runs an update cycle that skips `should_update`.
    pub fn force_update<C: Component>(&mut self, handle: Handle<C>) -> Result<Outcome> {
        self.typed_mut(handle)?.pending.push(Request::Force);
        self.run_now(handle.id)
    }

    /// Unmounts an instance and its subtree, children first. Every
    /// `will_unmount` runs even if one of them fails; the first failure is
    /// routed to the nearest error boundary above `id`.
    pub fn unmount(&mut self, id: impl Into<InstanceId>) -> Result<()> {
        let id = id.into();
        if !self.is_mounted(id) {
            log::warn!("unmount: {id:?} is not mounted");
            return Err(LifecycleError::Detached(id));
        }
        let parent = self.parent(id);
        match self.teardown(id) {
            Some(error) => {
                let stack = vec![error.component.clone()];
                Err(self.route_error(parent, None, stack, error))
            }
            None => Ok(()),
        }
    }

    /// Drains queued update requests.
    pub fn flush(&mut self) -> Result<()> {
        let mut cycles = 0;
        let mut first_error = None;
        while let Some(id) = self.dirty.pop_front() {
            if !self.is_mounted(id) {
                continue;
            }
            cycles += 1;
            if cycles > self.config.max_update_depth {
                self.dirty.push_front(id);
                for id in std::mem::take(&mut self.dirty) {
                    if let Some(inst) = self.nodes.get_mut(id).and_then(|n| n.instance.as_deref_mut()) {
                        inst.clear_pending();
                    }
                }
                log::error!(
                    "update depth exceeded: {} cycles without settling",
                    self.config.max_update_depth
                );
                return Err(LifecycleError::UpdateDepthExceeded(self.config.max_update_depth));
            }
            if let Err(e) = self.cycle(id) {
                log::warn!("queued update of {id:?} failed: {e}");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    pub fn is_mounted(&self, id: impl Into<InstanceId>) -> bool {
        self.nodes
            .get(id.into())
            .is_some_and(|n| n.instance.is_some())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Last committed render result.
    pub fn output(&self, id: impl Into<InstanceId>) -> Option<&Element> {
        self.instance(id.into()).map(|i| i.output())
    }

    pub fn phase(&self, id: impl Into<InstanceId>) -> Option<Phase> {
        self.instance(id.into()).map(|i| i.phase())
    }

    pub fn name(&self, id: impl Into<InstanceId>) -> Option<&'static str> {
        self.instance(id.into()).map(|i| i.name())
    }

    pub fn props<C: Component>(&self, handle: Handle<C>) -> Option<&C::Props> {
        self.typed(handle).map(|i| &i.props)
    }

    pub fn state<C: Component>(&self, handle: Handle<C>) -> Option<&C::State> {
        self.typed(handle).map(|i| &i.state)
    }

    pub fn component<C: Component>(&self, handle: Handle<C>) -> Option<&C> {
        self.typed(handle).map(|i| &i.component)
    }

    pub fn parent(&self, id: impl Into<InstanceId>) -> Option<InstanceId> {
        self.nodes.get(id.into()).and_then(|n| n.parent)
    }

    pub fn children(&self, id: impl Into<InstanceId>) -> &[InstanceId] {
        self.nodes
            .get(id.into())
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn roots(&self) -> impl Iterator<Item = InstanceId> + '_ {
        self.nodes
            .iter()
            .filter(|(_, n)| n.parent.is_none())
            .map(|(id, _)| id)
    }

    fn instance(&self, id: InstanceId) -> Option<&dyn AnyInstance> {
        self.nodes.get(id).and_then(|n| n.instance.as_deref())
    }

    fn typed<C: Component>(&self, handle: Handle<C>) -> Option<&Instance<C>> {
        self.instance(handle.id)?
            .as_any()
            .downcast_ref::<Instance<C>>()
    }

    fn typed_mut<C: Component>(&mut self, handle: Handle<C>) -> Result<&mut Instance<C>> {
        let id = handle.id;
        let inst = self
            .nodes
            .get_mut(id)
            .and_then(|n| n.instance.as_deref_mut())
            .ok_or(LifecycleError::Detached(id))?;
        let actual = inst.name();
        inst.as_any_mut()
            .downcast_mut::<Instance<C>>()
            .ok_or(LifecycleError::TypeMismatch {
                id,
                expected: C::name(),
                actual,
            })
    }

    fn run_hooked<R>(
        &mut self,
        id: InstanceId,
        f: impl FnOnce(&mut dyn AnyInstance, &HookRunner<'_>) -> R,
    ) -> Result<R> {
        let hooks = HookRunner {
            id,
            sink: &*self.sink,
            config: &self.config,
        };
        let inst = self
            .nodes
            .get_mut(id)
            .and_then(|n| n.instance.as_deref_mut())
            .ok_or(LifecycleError::Detached(id))?;
        Ok(f(inst, &hooks))
    }

    fn mark_if_pending(&mut self, id: InstanceId) {
        let pending = self.instance(id).is_some_and(|i| i.has_pending());
        if pending && !self.dirty.contains(&id) {
            self.dirty.push_back(id);
        }
    }

    fn run_now(&mut self, id: InstanceId) -> Result<Outcome> {
        self.dirty.retain(|d| *d != id);
        let outcome = self.cycle(id)?;
        self.flush()?;
        Ok(outcome)
    }

    fn cycle(&mut self, id: InstanceId) -> Result<Outcome> {
        match self.run_hooked(id, |inst, hooks| inst.update(hooks))? {
            Ok(outcome) => {
                self.mark_if_pending(id);
                Ok(outcome)
            }
            Err(error) => {
                let name = self.name(id).unwrap_or_default().to_string();
                let parent = self.parent(id);
                Err(self.route_error(parent, Some(id), vec![name], error))
            }
        }
    }

    /// Walks up from `cursor` to the nearest error boundary. `failed` is the
    /// failing instance if it made it into the tree.
    fn route_error(
        &mut self,
        mut cursor: Option<InstanceId>,
        failed: Option<InstanceId>,
        mut stack: Vec<String>,
        mut error: ComponentError,
    ) -> LifecycleError {
        let mut anchor = failed;
        while let Some(candidate) = cursor {
            anchor = Some(candidate);
            let is_boundary = self
                .run_hooked(candidate, |inst, _| inst.is_error_boundary())
                .unwrap_or(false);
            if !is_boundary {
                stack.push(self.name(candidate).unwrap_or_default().to_string());
                cursor = self.parent(candidate);
                continue;
            }

            match self.run_hooked(candidate, |inst, hooks| inst.recover(&error, hooks)) {
                Ok(Ok(())) => {}
                Ok(Err(fallback_error)) => {
                    // The fallback itself failed: the boundary is now the
                    // failing component.
                    log::warn!("boundary {candidate:?} failed to recover: {fallback_error}");
                    error = fallback_error;
                    stack = vec![self.name(candidate).unwrap_or_default().to_string()];
                    cursor = self.parent(candidate);
                    continue;
                }
                Err(e) => {
                    log::error!("boundary {candidate:?} vanished during recovery: {e}");
                    break;
                }
            }

            // The failed subtree is replaced by the fallback output.
            let children: Vec<InstanceId> = self.children(candidate).to_vec();
            for child in children {
                if let Some(e) = self.teardown(child) {
                    log::error!("will_unmount failed while discarding subtree: {e}");
                }
            }

            let info = ErrorInfo {
                component: stack.first().cloned().unwrap_or_default(),
                component_stack: stack,
            };
            return match self.run_hooked(candidate, |inst, hooks| inst.did_catch(&error, &info, hooks)) {
                Ok(Ok(())) => LifecycleError::Captured {
                    boundary: candidate,
                    error,
                },
                Ok(Err(e)) => {
                    log::error!("did_catch failed: {e}");
                    self.fatal(Some(candidate), e)
                }
                Err(e) => e,
            };
        }
        self.fatal(anchor, error)
    }

    /// Uncaught failure: the whole tree containing `anchor` is torn down.
    fn fatal(&mut self, anchor: Option<InstanceId>, error: ComponentError) -> LifecycleError {
        log::error!("uncaught component error: {error}");
        if let Some(mut root) = anchor.filter(|a| self.nodes.contains_key(*a)) {
            while let Some(p) = self.parent(root) {
                root = p;
            }
            if let Some(e) = self.teardown(root) {
                log::error!("will_unmount failed during fatal teardown: {e}");
            }
        }
        LifecycleError::Uncaught(error)
    }

    /// Unmounts `id` and its subtree, children first. Returns the first
    /// `will_unmount` failure.
    fn teardown(&mut self, id: InstanceId) -> Option<ComponentError> {
        let mut first_error = None;
        let children: Vec<InstanceId> = self.children(id).to_vec();
        for child in children {
            if let Some(e) = self.teardown(child) {
                first_error.get_or_insert(e);
            }
        }

        if let Ok(Err(e)) = self.run_hooked(id, |inst, hooks| inst.will_unmount(hooks)) {
            first_error.get_or_insert(e);
        }

        if let Some(node) = self.nodes.remove(id)
            && let Some(parent) = node.parent.and_then(|p| self.nodes.get_mut(p))
        {
            parent.children.retain(|c| *c != id);
        }
        self.dirty.retain(|d| *d != id);
        first_error
    }
}

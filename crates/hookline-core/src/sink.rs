//! Diagnostic sinks.
//!
//! The reconciler reports every hook it runs to one injected
//! [`DiagnosticSink`], after the hook returns. Components never log on their
//! own; that keeps hooks pure and lets tests capture the exact call order with
//! a [`RecordingSink`].

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use bitflags::bitflags;
use smallvec::SmallVec;

use crate::reconciler::InstanceId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Hook {
    Initialize,
    DeriveStateFromProps,
    ShouldUpdate,
    Render,
    GetSnapshotBeforeUpdate,
    DidMount,
    DidUpdate,
    WillUnmount,
    DeriveStateFromError,
    DidCatch,
}

impl Hook {
    pub const ALL: [Hook; 10] = [
        Hook::Initialize,
        Hook::DeriveStateFromProps,
        Hook::ShouldUpdate,
        Hook::Render,
        Hook::GetSnapshotBeforeUpdate,
        Hook::DidMount,
        Hook::DidUpdate,
        Hook::WillUnmount,
        Hook::DeriveStateFromError,
        Hook::DidCatch,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Hook::Initialize => "initialize",
            Hook::DeriveStateFromProps => "derive_state_from_props",
            Hook::ShouldUpdate => "should_update",
            Hook::Render => "render",
            Hook::GetSnapshotBeforeUpdate => "get_snapshot_before_update",
            Hook::DidMount => "did_mount",
            Hook::DidUpdate => "did_update",
            Hook::WillUnmount => "will_unmount",
            Hook::DeriveStateFromError => "derive_state_from_error",
            Hook::DidCatch => "did_catch",
        }
    }

    /// Error-boundary hooks report at error level.
    pub fn is_error_hook(self) -> bool {
        matches!(self, Hook::DeriveStateFromError | Hook::DidCatch)
    }

    pub fn mask(self) -> HookMask {
        match self {
            Hook::Initialize => HookMask::INITIALIZE,
            Hook::DeriveStateFromProps => HookMask::DERIVE_STATE_FROM_PROPS,
            Hook::ShouldUpdate => HookMask::SHOULD_UPDATE,
            Hook::Render => HookMask::RENDER,
            Hook::GetSnapshotBeforeUpdate => HookMask::GET_SNAPSHOT_BEFORE_UPDATE,
            Hook::DidMount => HookMask::DID_MOUNT,
            Hook::DidUpdate => HookMask::DID_UPDATE,
            Hook::WillUnmount => HookMask::WILL_UNMOUNT,
            Hook::DeriveStateFromError => HookMask::DERIVE_STATE_FROM_ERROR,
            Hook::DidCatch => HookMask::DID_CATCH,
        }
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

bitflags! {
    /// Selects which hooks are forwarded to the sink.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct HookMask: u16 {
        const INITIALIZE = 1 << 0;
        const DERIVE_STATE_FROM_PROPS = 1 << 1;
        const SHOULD_UPDATE = 1 << 2;
        const RENDER = 1 << 3;
        const GET_SNAPSHOT_BEFORE_UPDATE = 1 << 4;
        const DID_MOUNT = 1 << 5;
        const DID_UPDATE = 1 << 6;
        const WILL_UNMOUNT = 1 << 7;
        const DERIVE_STATE_FROM_ERROR = 1 << 8;
        const DID_CATCH = 1 << 9;

        const PURE = Self::DERIVE_STATE_FROM_PROPS.bits()
            | Self::SHOULD_UPDATE.bits()
            | Self::RENDER.bits()
            | Self::GET_SNAPSHOT_BEFORE_UPDATE.bits()
            | Self::DERIVE_STATE_FROM_ERROR.bits();
        const EFFECTS = Self::DID_MOUNT.bits()
            | Self::DID_UPDATE.bits()
            | Self::WILL_UNMOUNT.bits()
            | Self::DID_CATCH.bits();
    }
}

impl Default for HookMask {
    fn default() -> Self {
        HookMask::all()
    }
}

/// One hook invocation: which instance, which hook, and the arguments it
/// received, already `Debug`-formatted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HookRecord {
    pub instance: InstanceId,
    pub component: &'static str,
    pub hook: Hook,
    pub args: SmallVec<[(&'static str, String); 3]>,
}

impl HookRecord {
    pub fn arg(&self, name: &str) -> Option<&str> {
        self.args
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for HookRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.component, self.hook)?;
        for (name, value) in &self.args {
            write!(f, " {name}={value}")?;
        }
        Ok(())
    }
}

pub trait DiagnosticSink {
    fn record(&self, record: &HookRecord);
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for Rc<S> {
    fn record(&self, record: &HookRecord) {
        (**self).record(record)
    }
}

/// Forwards records to the `log` facade.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn record(&self, record: &HookRecord) {
        if record.hook.is_error_hook() {
            log::error!(target: "hookline::lifecycle", "{record}");
        } else {
            log::debug!(target: "hookline::lifecycle", "{record}");
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn record(&self, _record: &HookRecord) {}
}

/// Keeps every record in memory. Clones share the same buffer, so a test can
/// hand one clone to the reconciler and inspect the other.
#[derive(Clone, Default)]
pub struct RecordingSink {
    records: Rc<RefCell<Vec<HookRecord>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<HookRecord> {
        self.records.borrow().clone()
    }

    /// Hook names for one instance, in call order.
    pub fn hooks_for(&self, id: InstanceId) -> Vec<Hook> {
        self.records
            .borrow()
            .iter()
            .filter(|r| r.instance == id)
            .map(|r| r.hook)
            .collect()
    }

    pub fn hooks(&self) -> Vec<Hook> {
        self.records.borrow().iter().map(|r| r.hook).collect()
    }

    /// Drains the buffer, returning what was recorded so far.
    pub fn take(&self) -> Vec<HookRecord> {
        std::mem::take(&mut *self.records.borrow_mut())
    }

    pub fn clear(&self) {
        self.records.borrow_mut().clear();
    }

    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }
}

impl DiagnosticSink for RecordingSink {
    fn record(&self, record: &HookRecord) {
        self.records.borrow_mut().push(record.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masks_cover_every_hook() {
        let mut all = HookMask::empty();
        for h in Hook::ALL {
            assert!(!all.contains(h.mask()), "duplicate bit for {h}");
            all |= h.mask();
        }
        assert_eq!(all, HookMask::all());
        assert_eq!(HookMask::PURE | HookMask::EFFECTS | HookMask::INITIALIZE, HookMask::all());
    }

    #[test]
    fn test_error_hooks() {
        assert!(Hook::DidCatch.is_error_hook());
        assert!(Hook::DeriveStateFromError.is_error_hook());
        assert!(!Hook::Render.is_error_hook());
    }
}

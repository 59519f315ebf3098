use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;
use web_time::{Duration, Instant};

use hookline_core::{DiagnosticSink, HookRecord, InstanceId};

use crate::checker::{Violation, check};

#[derive(Clone, Debug)]
pub struct Entry {
    /// Time since the timeline was created.
    pub at: Duration,
    pub record: HookRecord,
}

struct Inner {
    started: Instant,
    entries: Vec<Entry>,
}

/// Timestamped hook trace. Clones share one buffer: give one to the
/// reconciler, keep the other for inspection.
#[derive(Clone)]
pub struct Timeline {
    inner: Rc<RefCell<Inner>>,
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct JsonEntry<'a> {
    at_us: u64,
    instance: String,
    component: &'a str,
    hook: &'a str,
    args: Vec<(&'a str, &'a str)>,
}

impl Timeline {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                started: Instant::now(),
                entries: Vec::new(),
            })),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().entries.is_empty()
    }

    pub fn entries(&self) -> Vec<Entry> {
        self.inner.borrow().entries.clone()
    }

    pub fn records(&self) -> Vec<HookRecord> {
        self.inner
            .borrow()
            .entries
            .iter()
            .map(|e| e.record.clone())
            .collect()
    }

    pub fn for_instance(&self, id: InstanceId) -> Vec<Entry> {
        self.inner
            .borrow()
            .entries
            .iter()
            .filter(|e| e.record.instance == id)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.entries.clear();
        inner.started = Instant::now();
    }

    /// One line per hook call, oldest first.
    pub fn lines(&self) -> Vec<String> {
        self.inner
            .borrow()
            .entries
            .iter()
            .map(|e| format!("{:>9.3} ms  {}", e.at.as_secs_f64() * 1000.0, e.record))
            .collect()
    }

    pub fn to_json(&self) -> String {
        let inner = self.inner.borrow();
        let entries: Vec<JsonEntry<'_>> = inner
            .entries
            .iter()
            .map(|e| JsonEntry {
                at_us: e.at.as_micros() as u64,
                instance: format!("{:?}", e.record.instance),
                component: e.record.component,
                hook: e.record.hook.as_str(),
                args: e
                    .record
                    .args
                    .iter()
                    .map(|(k, v)| (*k, v.as_str()))
                    .collect(),
            })
            .collect();
        serde_json::to_string_pretty(&entries).unwrap_or_else(|e| {
            log::warn!("timeline export failed: {e}");
            "[]".into()
        })
    }

    /// Runs the contract checker over everything recorded so far.
    pub fn check(&self) -> Vec<Violation> {
        check(&self.records())
    }
}

impl DiagnosticSink for Timeline {
    fn record(&self, record: &HookRecord) {
        let mut inner = self.inner.borrow_mut();
        let at = inner.started.elapsed();
        inner.entries.push(Entry {
            at,
            record: record.clone(),
        });
    }
}

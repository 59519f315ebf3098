use crate::sink::HookMask;

/// Knobs for a [`Reconciler`](crate::Reconciler).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReconcilerConfig {
    /// Upper bound on update cycles run while draining queued requests from
    /// one entry point. Guards against `did_update` requesting state forever.
    pub max_update_depth: usize,
    /// Convert panics inside hooks into `ComponentError`s and route them to
    /// error boundaries. When off, panics unwind through the reconciler.
    pub catch_panics: bool,
    /// Hooks forwarded to the diagnostic sink.
    pub trace: HookMask,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            max_update_depth: 50,
            catch_panics: true,
            trace: HookMask::all(),
        }
    }
}

impl ReconcilerConfig {
    pub fn max_update_depth(mut self, depth: usize) -> Self {
        self.max_update_depth = depth.max(1);
        self
    }

    pub fn catch_panics(mut self, on: bool) -> Self {
        self.catch_panics = on;
        self
    }

    pub fn trace(mut self, mask: HookMask) -> Self {
        self.trace = mask;
        self
    }
}

//! Replays a hook trace and reports ordering violations.
//!
//! The checker needs an unfiltered trace: with a `HookMask` that drops pure
//! hooks, every render looks underived.

use std::collections::HashMap;
use std::fmt;

use hookline_core::{Hook, HookRecord, InstanceId};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Violation {
    /// `render` ran without `derive_state_from_props` right before it,
    /// including recovery renders.
    RenderWithoutDerive { instance: InstanceId, index: usize },
    /// `get_snapshot_before_update` ran before the instance mounted.
    SnapshotOnMount { instance: InstanceId, index: usize },
    /// The instance's next hook after a snapshot was not `did_update`.
    SnapshotNotHandedOff { instance: InstanceId, index: usize },
    /// `did_update` without a snapshot right before it.
    UpdateWithoutSnapshot { instance: InstanceId, index: usize },
    /// Any hook after `will_unmount`, including a second `will_unmount`.
    HookAfterUnmount {
        instance: InstanceId,
        index: usize,
        hook: Hook,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::RenderWithoutDerive { instance, index } => {
                write!(f, "#{index} {instance:?}: render without derive")
            }
            Violation::SnapshotOnMount { instance, index } => {
                write!(f, "#{index} {instance:?}: snapshot before mount completed")
            }
            Violation::SnapshotNotHandedOff { instance, index } => {
                write!(f, "#{index} {instance:?}: snapshot not followed by did_update")
            }
            Violation::UpdateWithoutSnapshot { instance, index } => {
                write!(f, "#{index} {instance:?}: did_update without snapshot")
            }
            Violation::HookAfterUnmount {
                instance,
                index,
                hook,
            } => write!(f, "#{index} {instance:?}: {hook} after will_unmount"),
        }
    }
}

#[derive(Default)]
struct Track {
    mounted: bool,
    unmounted: bool,
    derived: bool,
    last: Option<Hook>,
}

pub fn check(records: &[HookRecord]) -> Vec<Violation> {
    let mut tracks: HashMap<InstanceId, Track> = HashMap::new();
    let mut out = Vec::new();

    for (index, rec) in records.iter().enumerate() {
        let instance = rec.instance;
        let t = tracks.entry(instance).or_default();

        if t.unmounted {
            out.push(Violation::HookAfterUnmount {
                instance,
                index,
                hook: rec.hook,
            });
            continue;
        }

        if t.last == Some(Hook::GetSnapshotBeforeUpdate) && rec.hook != Hook::DidUpdate {
            out.push(Violation::SnapshotNotHandedOff { instance, index });
        }

        match rec.hook {
            Hook::DeriveStateFromProps => t.derived = true,
            Hook::DeriveStateFromError => t.derived = false,
            Hook::Render => {
                if !t.derived {
                    out.push(Violation::RenderWithoutDerive { instance, index });
                }
                t.derived = false;
            }
            Hook::GetSnapshotBeforeUpdate if !t.mounted => {
                out.push(Violation::SnapshotOnMount { instance, index });
            }
            Hook::DidUpdate if t.last != Some(Hook::GetSnapshotBeforeUpdate) => {
                out.push(Violation::UpdateWithoutSnapshot { instance, index });
            }
            Hook::DidMount => t.mounted = true,
            Hook::WillUnmount => t.unmounted = true,
            _ => {}
        }
        t.last = Some(rec.hook);
    }
    out
}

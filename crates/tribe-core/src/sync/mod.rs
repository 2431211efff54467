//! List synchronization: status vocabulary, transition table, state machine,
//! conflict handling and sync rounds against external sources.

mod adapter;
mod config;
mod conflicts;
mod machine;
mod reconcile;
mod status;
mod transition;

pub use adapter::{AdapterRegistry, ExternalItem, JsonFileAdapter, SyncAdapter};
pub use config::{validate_raw_sync_config, validate_sync_config, SyncConfig};
pub use conflicts::{ConflictResolver, Resolution, ResolutionMode};
pub use machine::{
    plan_transition, Step, SyncStateMachine, SyncUpdate, TransitionOutcome, DEFAULT_RETRY_LIMIT,
};
pub use reconcile::{diff_items, Divergence, PullReport, PushReport, SyncReconciler};
pub use status::{SyncAction, SyncSource, SyncStatus};
pub use transition::{validate_transition, TransitionTable};

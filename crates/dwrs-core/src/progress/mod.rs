//! Progress Aggregator: merges per-transfer states into consistent snapshots.
//!
//! Transfer units call `record` after every chunk; renderers subscribe and
//! read coalesced snapshots. The state map sits behind one mutex that is held
//! only for the map update or the snapshot copy.

mod aggregator;
mod snapshot;

pub use aggregator::{ProgressAggregator, ProgressWatcher};
pub use snapshot::{ProgressSnapshot, ProgressTotals};

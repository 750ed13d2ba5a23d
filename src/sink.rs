pub mod terminal;

use crate::stats::SessionStats;
use crate::view::Snapshot;

/// Receiver of rendered frames; the drawing layer implements this.
pub trait FrameSink: Send + Sync {
    fn present(&self, snapshot: &Snapshot);

    fn summary(&self, stats: &SessionStats);
}

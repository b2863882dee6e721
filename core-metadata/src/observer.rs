//! Per-item observer hook
//!
//! The fetch pipeline reports every accepted item to the query's observer,
//! which decides whether the item is kept and whether fetching goes on.

use crate::cache::ResultItem;
use crate::query::Query;

/// Observer verdict for one item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flow {
    /// Keep the item and carry on
    #[default]
    Continue,
    /// Drop this item, carry on
    Skip,
    /// Keep the item, then cancel all remaining fetches
    Stop,
}

/// Receives items as the pipeline accepts them
///
/// Closures of the form `Fn(&ResultItem, &Query) -> Flow` implement this
/// trait, so most callers never name it:
///
/// ```ignore
/// query.set_observer(|item: &ResultItem, _: &Query| {
///     println!("{} from {}", item.len(), item.source);
///     Flow::Continue
/// });
/// ```
pub trait ItemObserver: Send + Sync {
    fn on_item(&self, item: &ResultItem, query: &Query) -> Flow;
}

impl<F> ItemObserver for F
where
    F: Fn(&ResultItem, &Query) -> Flow + Send + Sync,
{
    fn on_item(&self, item: &ResultItem, query: &Query) -> Flow {
        self(item, query)
    }
}

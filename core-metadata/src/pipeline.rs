//! # Fetch Pipeline
//!
//! Turns a query and its (possibly filtered) provider table into a
//! [`CacheList`]. The engine holds one pipeline per category; all built-in
//! categories share [`StandardPipeline`].
//!
//! ## Standard behaviour
//!
//! - Enabled, fetchable entries are tried in table order, at most `plugmax`.
//! - Up to `parallel` providers run concurrently. With `parallel == 1` items
//!   arrive in table order, otherwise in completion order.
//! - With grouped download, contiguous entries sharing a group mask form a
//!   batch; later batches only run while `number` is not yet reached.
//! - Items are filtered by format and image size bounds first. When `download`
//!   is on, surviving link items are then replaced by their payload, one at a
//!   time, until `number` is reached.
//! - Duplicates are detected on the final payload's content hash.
//! - The query's observer sees every accepted item. `Flow::Stop` cancels the
//!   remaining transfers and the items collected so far are returned.
//! - A failing provider is logged and skipped, never fatal.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::{CacheList, ItemKind, ResultItem};
use crate::error::Result;
use crate::observer::Flow;
use crate::provider::{ParseContext, Provider, ProviderDescriptor, ProviderTable};
use crate::query::Query;
use crate::transfer::Transfer;

/// Follow-up requests a provider may chain before parsing
const MAX_FOLLOW_UPS: usize = 3;

/// Category-specific fetch strategy
#[async_trait]
pub trait FetchPipeline: Send + Sync {
    /// Collect results for `query` from the enabled entries of `table`
    async fn fetch(&self, query: &Query, table: &ProviderTable) -> Result<CacheList>;
}

/// Default pipeline used for every built-in category
#[derive(Debug, Clone)]
pub struct StandardPipeline {
    transfer: Transfer,
}

impl StandardPipeline {
    pub fn new(transfer: Transfer) -> Self {
        Self { transfer }
    }

    async fn run_provider(
        &self,
        descriptor: &ProviderDescriptor,
        query: &Query,
        cancel: &CancellationToken,
    ) -> Vec<ResultItem> {
        let Some(provider) = descriptor.provider.as_deref() else {
            return Vec::new();
        };

        let Some(url) = provider.build_url(query) else {
            debug!(provider = %descriptor.name, "Query lacks fields required by provider");
            return Vec::new();
        };

        let items = match fetch_and_parse(&self.transfer, provider, &url, query, cancel).await {
            Some(Ok(items)) => items,
            Some(Err(err)) => {
                warn!(provider = %descriptor.name, error = %err, "Provider parse failed");
                return Vec::new();
            }
            None => return Vec::new(),
        };

        debug!(provider = %descriptor.name, count = items.len(), "Provider answered");
        items
    }

    /// Replace a link item by the payload it points at
    async fn resolve_link(
        &self,
        item: ResultItem,
        query: &Query,
        cancel: &CancellationToken,
    ) -> Option<ResultItem> {
        let url = match item.source_url.clone() {
            Some(url) => url,
            None => item.as_text()?.to_string(),
        };

        let data = self.transfer.download(&url, query, cancel).await?;
        Some(ResultItem {
            data,
            kind: ItemKind::Binary,
            source_url: Some(url),
            ..item
        })
    }
}

#[async_trait]
impl FetchPipeline for StandardPipeline {
    async fn fetch(&self, query: &Query, table: &ProviderTable) -> Result<CacheList> {
        let limit = match query.number() {
            0 => usize::MAX,
            n => n,
        };

        let candidates: Vec<&ProviderDescriptor> = table
            .enabled()
            .filter(|entry| entry.provider.is_some())
            .take(query.plugmax().unwrap_or(usize::MAX))
            .collect();

        info!(
            category = %query.category(),
            providers = candidates.len(),
            limit = query.number(),
            "Fetching"
        );

        let batches = if query.grouped_download() {
            group_batches(candidates)
        } else {
            vec![candidates]
        };

        let cancel = query.cancellation_token().child_token();
        let mut list = CacheList::new();

        for batch in batches {
            if cancel.is_cancelled() || list.len() >= limit {
                break;
            }

            let pending: Vec<_> = batch
                .into_iter()
                .map(|descriptor| self.run_provider(descriptor, query, &cancel))
                .collect();
            let mut results = stream::iter(pending).buffer_unordered(query.parallel().max(1));

            while let Some(items) = results.next().await {
                for item in items {
                    if list.len() >= limit || cancel.is_cancelled() {
                        break;
                    }
                    if !passes_filters(&item, query) {
                        continue;
                    }

                    let item = if query.download() && item.kind == ItemKind::Link {
                        match self.resolve_link(item, query, &cancel).await {
                            Some(item) => item,
                            None => continue,
                        }
                    } else {
                        item
                    };

                    if !is_new(&list, &item, query) {
                        continue;
                    }

                    let flow = query
                        .observer()
                        .map_or(Flow::Continue, |observer| observer.on_item(&item, query));

                    match flow {
                        Flow::Skip => continue,
                        Flow::Continue => {}
                        Flow::Stop => {
                            info!(source = %item.source, "Stopped by observer");
                            cancel.cancel();
                        }
                    }

                    query.record_item();
                    list.push(item);
                }

                if list.len() >= limit || cancel.is_cancelled() {
                    break;
                }
            }
        }

        info!(
            category = %query.category(),
            items = list.len(),
            bytes = list.total_bytes(),
            "Fetch finished"
        );
        Ok(list)
    }
}

/// Download `url` for `provider`, following the provider's chained requests,
/// and parse the final body. `None` when nothing could be downloaded.
///
/// Bodies are dropped as soon as they have been parsed.
pub(crate) async fn fetch_and_parse(
    transfer: &Transfer,
    provider: &dyn Provider,
    url: &str,
    query: &Query,
    cancel: &CancellationToken,
) -> Option<Result<Vec<ResultItem>>> {
    let mut url = url.to_string();

    for _ in 0..=MAX_FOLLOW_UPS {
        let body = transfer.download(&url, query, cancel).await?;
        let ctx = ParseContext::new(query, &url, &body);

        match provider.follow_up(&ctx) {
            Some(next) => url = next,
            None => return Some(provider.parse(&ctx)),
        }
    }

    debug!(provider = %provider.name(), "Too many chained requests");
    None
}

/// Split into runs of identical group masks, keeping order
fn group_batches(candidates: Vec<&ProviderDescriptor>) -> Vec<Vec<&ProviderDescriptor>> {
    let mut batches: Vec<Vec<&ProviderDescriptor>> = Vec::new();

    for descriptor in candidates {
        match batches.last_mut() {
            Some(batch) if batch[0].groups == descriptor.groups => batch.push(descriptor),
            _ => batches.push(vec![descriptor]),
        }
    }

    batches
}

/// Checks that need no payload: emptiness, image format and declared size
fn passes_filters(item: &ResultItem, query: &Query) -> bool {
    if item.is_empty() {
        return false;
    }

    if item.category.is_image() {
        if let Some(format) = item.format.as_deref() {
            if !query.accepts_format(format) {
                debug!(source = %item.source, format, "Rejected format");
                return false;
            }
        }

        if let Some(size) = item.declared_size {
            let too_small = query.cover_min_size().is_some_and(|min| size < min);
            let too_large = query.cover_max_size().is_some_and(|max| size > max);
            if too_small || too_large {
                debug!(source = %item.source, size, "Rejected size");
                return false;
            }
        }
    }

    true
}

/// Duplicate suppression on the final payload
fn is_new(list: &CacheList, item: &ResultItem, query: &Query) -> bool {
    if query.duplicate_check() && list.contains_hash(&item.content_hash()) {
        debug!(source = %item.source, "Rejected duplicate");
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::Category;
    use crate::group::GroupMask;

    fn descriptor(name: &str, groups: GroupMask) -> ProviderDescriptor {
        ProviderDescriptor {
            name: name.to_string(),
            key: Some(name.to_string()),
            groups,
            enabled: true,
            category: Category::Cover,
            provider: None,
        }
    }

    #[test]
    fn test_group_batches_are_contiguous_runs() {
        let a = descriptor("a", GroupMask::SAFE);
        let b = descriptor("b", GroupMask::SAFE);
        let c = descriptor("c", GroupMask::UNSAFE);
        let d = descriptor("d", GroupMask::SAFE);

        let batches = group_batches(vec![&a, &b, &c, &d]);
        let names: Vec<Vec<&str>> = batches
            .iter()
            .map(|batch| batch.iter().map(|entry| entry.name.as_str()).collect())
            .collect();

        assert_eq!(names, vec![vec!["a", "b"], vec!["c"], vec!["d"]]);
    }

    #[test]
    fn test_size_and_format_filters() {
        let mut query = Query::new();
        query.set_cover_min_size(100).unwrap();
        query.set_cover_max_size(600).unwrap();
        query.set_formats("jpg;png").unwrap();
        let ok = ResultItem::binary(Category::Cover, "x", vec![1u8])
            .with_declared_size(300)
            .with_format("jpg");
        let small = ok.clone().with_declared_size(50);
        let large = ok.clone().with_declared_size(1000);
        let gif = ok.clone().with_format("gif");

        assert!(passes_filters(&ok, &query));
        assert!(!passes_filters(&small, &query));
        assert!(!passes_filters(&large, &query));
        assert!(!passes_filters(&gif, &query));
    }

    #[test]
    fn test_text_items_ignore_image_filters() {
        let mut query = Query::new();
        query.set_formats("png").unwrap();
        let item = ResultItem::text(Category::Lyric, "x", "words").with_format("txt");
        assert!(passes_filters(&item, &query));
    }

    #[test]
    fn test_link_items_are_filtered_before_download() {
        let query = Query::new();
        let link = ResultItem::link(Category::Cover, "x", "https://img.test/34.png")
            .with_declared_size(34)
            .with_format("png");
        assert!(!passes_filters(&link, &query));
    }

    #[test]
    fn test_duplicate_check_toggle() {
        let mut query = Query::new();
        let mut list = CacheList::new();
        let item = ResultItem::text(Category::Lyric, "x", "words");
        list.push(item.clone());

        assert!(!is_new(&list, &item, &query));
        query.set_duplicate_check(false);
        assert!(is_new(&list, &item, &query));
    }
}

//! Integration tests for the MetadataEngine
//!
//! These tests drive the engine end to end against a canned HTTP client:
//! - Table resolution and the empty-result contract
//! - Ordering, limits, duplicate suppression and failing providers
//! - Grouped batches, parallel fetches and link downloads
//! - Observer verdicts and cancellation
//! - The direct-call override
//! - Selector expressions applied through the engine

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use core_metadata::{
    Category, Flow, GroupMask, ItemKind, MetadataEngine, MetadataError, ParseContext, Provider,
    ProviderRegistry, Query, ResultItem,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// HTTP client answering from a fixed URL map, 404 otherwise
#[derive(Default)]
struct CannedClient {
    bodies: HashMap<String, String>,
    requested: Mutex<Vec<String>>,
}

impl CannedClient {
    fn with(mut self, url: &str, body: &str) -> Self {
        self.bodies.insert(url.to_string(), body.to_string());
        self
    }

    fn calls(&self) -> usize {
        self.requested.lock().unwrap().len()
    }

    fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpClient for CannedClient {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        self.requested.lock().unwrap().push(request.url.clone());
        Ok(match self.bodies.get(&request.url) {
            Some(body) => HttpResponse::ok(body.clone()),
            None => HttpResponse::with_status(404),
        })
    }
}

/// One item per body line: text, or `url size` links for covers
struct LineProvider {
    name: &'static str,
    category: Category,
    groups: GroupMask,
}

impl LineProvider {
    fn lyrics(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            category: Category::Lyric,
            groups: GroupMask::SAFE | GroupMask::FAST,
        })
    }

    fn slow_lyrics(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            category: Category::Lyric,
            groups: GroupMask::SAFE | GroupMask::SLOW,
        })
    }

    fn covers(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            category: Category::Cover,
            groups: GroupMask::SAFE | GroupMask::FAST,
        })
    }

    fn item(&self, line: &str) -> Option<ResultItem> {
        if self.category != Category::Cover {
            return Some(ResultItem::text(self.category, self.name, line));
        }

        let (url, size) = line.split_once(' ')?;
        Some(
            ResultItem::link(self.category, self.name, url)
                .with_declared_size(size.parse().ok()?)
                .with_format("jpg"),
        )
    }
}

impl Provider for LineProvider {
    fn name(&self) -> &str {
        self.name
    }

    fn key(&self) -> &str {
        self.name
    }

    fn category(&self) -> Category {
        self.category
    }

    fn groups(&self) -> GroupMask {
        self.groups
    }

    fn build_url(&self, query: &Query) -> Option<String> {
        let artist = query.artist()?;
        Some(format!("https://{}.test/{}", self.name, artist))
    }

    fn parse(&self, ctx: &ParseContext<'_>) -> core_metadata::Result<Vec<ResultItem>> {
        Ok(ctx
            .text()
            .lines()
            .filter(|line| !line.is_empty())
            .filter_map(|line| self.item(line))
            .collect())
    }
}

fn engine_with(client: Arc<CannedClient>, providers: Vec<Arc<LineProvider>>) -> MetadataEngine {
    let mut registry = ProviderRegistry::new();
    for provider in providers {
        registry.register(provider);
    }

    MetadataEngine::builder()
        .http_client(client)
        .registry(registry)
        .build()
        .unwrap()
}

fn lyric_query() -> Query {
    let mut query = Query::new();
    query.set_category(Category::Lyric).unwrap();
    query.set_artist("band");
    query.set_number(0);
    query.set_parallel(1);
    query
}

fn cover_query() -> Query {
    let mut query = Query::new();
    query.set_category(Category::Cover).unwrap();
    query.set_artist("band");
    query.set_number(1);
    query.set_parallel(1);
    query
}

const COVER_LINKS: &str = "https://img.test/tiny.jpg 34\n\
                           https://img.test/big.jpg 500\n\
                           https://img.test/huge.jpg 600";

fn texts(items: &core_metadata::CacheList) -> Vec<String> {
    items
        .iter()
        .filter_map(|item| item.as_text().map(str::to_string))
        .collect()
}

#[tokio::test]
async fn test_empty_result_is_none() {
    let client = Arc::new(CannedClient::default().with("https://alpha.test/band", ""));
    let engine = engine_with(Arc::clone(&client), vec![LineProvider::lyrics("alpha")]);

    let mut query = lyric_query();
    let result = engine.execute(&mut query).await.unwrap();

    assert!(result.is_none());
    assert_eq!(client.calls(), 1);
    assert_eq!(query.item_count(), 0);
}

#[tokio::test]
async fn test_sequential_results_follow_table_order() {
    let client = Arc::new(
        CannedClient::default()
            .with("https://alpha.test/band", "a1\na2")
            .with("https://beta.test/band", "b1"),
    );
    let engine = engine_with(
        Arc::clone(&client),
        vec![LineProvider::lyrics("alpha"), LineProvider::lyrics("beta")],
    );

    let mut query = lyric_query();
    let results = engine.execute(&mut query).await.unwrap().unwrap();

    assert_eq!(texts(&results), vec!["a1", "a2", "b1"]);
    assert_eq!(query.item_count(), 0);
    assert_eq!(query.providers().unwrap().category(), Category::Lyric);
}

#[tokio::test]
async fn test_query_is_reusable() {
    let client = Arc::new(CannedClient::default().with("https://alpha.test/band", "a1"));
    let engine = engine_with(Arc::clone(&client), vec![LineProvider::lyrics("alpha")]);

    let mut query = lyric_query();
    let first = engine.execute(&mut query).await.unwrap().unwrap();
    let second = engine.execute(&mut query).await.unwrap().unwrap();

    assert_eq!(texts(&first), texts(&second));
    assert_eq!(query.item_count(), 0);
    assert_eq!(client.calls(), 2);
}

#[tokio::test]
async fn test_number_limits_results() {
    let client = Arc::new(
        CannedClient::default()
            .with("https://alpha.test/band", "a1\na2\na3")
            .with("https://beta.test/band", "b1"),
    );
    let engine = engine_with(
        Arc::clone(&client),
        vec![LineProvider::lyrics("alpha"), LineProvider::lyrics("beta")],
    );

    let mut query = lyric_query();
    query.set_number(2);
    let results = engine.execute(&mut query).await.unwrap().unwrap();

    assert_eq!(texts(&results), vec!["a1", "a2"]);
}

#[tokio::test]
async fn test_failing_provider_is_skipped() {
    let client = Arc::new(CannedClient::default().with("https://beta.test/band", "b1"));
    let engine = engine_with(
        Arc::clone(&client),
        vec![LineProvider::lyrics("alpha"), LineProvider::lyrics("beta")],
    );

    let mut query = lyric_query();
    let results = engine.execute(&mut query).await.unwrap().unwrap();

    assert_eq!(texts(&results), vec!["b1"]);
    assert_eq!(client.calls(), 2);
}

#[tokio::test]
async fn test_duplicates_are_suppressed() {
    let client = Arc::new(
        CannedClient::default()
            .with("https://alpha.test/band", "same\nother")
            .with("https://beta.test/band", "same"),
    );
    let engine = engine_with(
        Arc::clone(&client),
        vec![LineProvider::lyrics("alpha"), LineProvider::lyrics("beta")],
    );

    let mut query = lyric_query();
    let results = engine.execute(&mut query).await.unwrap().unwrap();
    assert_eq!(texts(&results), vec!["same", "other"]);

    query.set_duplicate_check(false);
    let results = engine.execute(&mut query).await.unwrap().unwrap();
    assert_eq!(texts(&results), vec!["same", "other", "same"]);
}

#[tokio::test]
async fn test_observer_stop_returns_partial_results() {
    let client = Arc::new(
        CannedClient::default()
            .with("https://alpha.test/band", "a1\na2")
            .with("https://beta.test/band", "b1"),
    );
    let engine = engine_with(
        Arc::clone(&client),
        vec![LineProvider::lyrics("alpha"), LineProvider::lyrics("beta")],
    );

    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);

    let mut query = lyric_query();
    query.set_observer(move |_: &ResultItem, _: &Query| {
        counter.fetch_add(1, Ordering::SeqCst);
        Flow::Stop
    });

    let results = engine.execute(&mut query).await.unwrap().unwrap();

    assert_eq!(texts(&results), vec!["a1"]);
    assert_eq!(seen.load(Ordering::SeqCst), 1);
    assert!(!client.requested().contains(&"https://beta.test/band".to_string()));
    assert!(!query.cancellation_token().is_cancelled());
}

#[tokio::test]
async fn test_observer_skip_drops_item() {
    let client = Arc::new(CannedClient::default().with("https://alpha.test/band", "a1\na2"));
    let engine = engine_with(Arc::clone(&client), vec![LineProvider::lyrics("alpha")]);

    let mut query = lyric_query();
    query.set_observer(|item: &ResultItem, _: &Query| {
        if item.as_text() == Some("a1") {
            Flow::Skip
        } else {
            Flow::Continue
        }
    });

    let results = engine.execute(&mut query).await.unwrap().unwrap();
    assert_eq!(texts(&results), vec!["a2"]);
}

#[tokio::test]
async fn test_cancelled_query_fetches_nothing() {
    let client = Arc::new(CannedClient::default().with("https://alpha.test/band", "a1"));
    let engine = engine_with(Arc::clone(&client), vec![LineProvider::lyrics("alpha")]);

    let mut query = lyric_query();
    query.cancellation_token().cancel();

    assert!(engine.execute(&mut query).await.unwrap().is_none());
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn test_category_without_providers() {
    let client = Arc::new(CannedClient::default());
    let engine = engine_with(Arc::clone(&client), vec![LineProvider::lyrics("alpha")]);

    let mut query = lyric_query();
    query.set_category(Category::Cover).unwrap();
    let result = engine.execute(&mut query).await;

    assert!(matches!(result, Err(MetadataError::NoProvider(Category::Cover))));
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn test_unresolved_category_gets_meta_table() {
    let client = Arc::new(CannedClient::default());
    let engine = engine_with(Arc::clone(&client), vec![LineProvider::lyrics("alpha")]);

    let mut query = Query::new();
    let result = engine.execute(&mut query).await;

    assert!(matches!(result, Err(MetadataError::UnknownGetter(_))));
    let table = query.providers().unwrap();
    assert_eq!(table.category(), Category::Unresolved);
    assert_eq!(table.len(), Category::FETCHABLE.len());
}

#[tokio::test]
async fn test_direct_call_to_unknown_provider_makes_no_request() {
    let client = Arc::new(CannedClient::default().with("https://alpha.test/band", "a1"));
    let engine = engine_with(Arc::clone(&client), vec![LineProvider::lyrics("alpha")]);

    let mut query = lyric_query();
    query.set_direct_use(true);
    query.set_direct_provider("nobody").unwrap();

    assert!(engine.execute(&mut query).await.unwrap().is_none());
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn test_direct_call_ignores_selector() {
    let client = Arc::new(
        CannedClient::default()
            .with("https://alpha.test/band", "a1")
            .with("https://beta.test/band", "b1"),
    );
    let engine = engine_with(
        Arc::clone(&client),
        vec![LineProvider::lyrics("alpha"), LineProvider::lyrics("beta")],
    );

    let mut query = lyric_query();
    engine.apply_selector(&mut query, "-all +alpha").unwrap();
    query.set_direct_use(true);
    query.set_direct_provider("BETA").unwrap();

    let results = engine.execute(&mut query).await.unwrap().unwrap();

    assert_eq!(texts(&results), vec!["b1"]);
    assert_eq!(client.requested(), vec!["https://beta.test/band"]);
}

#[tokio::test]
async fn test_direct_call_with_forced_url() {
    let client = Arc::new(CannedClient::default().with("https://mirror.test/lyrics", "m1\nm2"));
    let engine = engine_with(Arc::clone(&client), vec![LineProvider::lyrics("alpha")]);

    let mut query = lyric_query();
    query.set_direct_use(true);
    query.set_direct_provider("alpha").unwrap();
    query.set_direct_url("https://mirror.test/lyrics").unwrap();

    let results = engine.execute(&mut query).await.unwrap().unwrap();

    assert_eq!(texts(&results), vec!["m1", "m2"]);
    assert_eq!(client.requested(), vec!["https://mirror.test/lyrics"]);
}

#[tokio::test]
async fn test_selector_reports_unknown_token_but_applies_the_rest() {
    let client = Arc::new(
        CannedClient::default()
            .with("https://alpha.test/band", "a1")
            .with("https://beta.test/band", "b1"),
    );
    let engine = engine_with(
        Arc::clone(&client),
        vec![LineProvider::lyrics("alpha"), LineProvider::lyrics("beta")],
    );

    let mut query = lyric_query();
    let result = engine.apply_selector(&mut query, "-all +beta +nonsense");
    assert!(matches!(result, Err(MetadataError::BadValue(_))));
    assert_eq!(query.providers().unwrap().enabled_names(), vec!["beta"]);

    let results = engine.execute(&mut query).await.unwrap().unwrap();
    assert_eq!(texts(&results), vec!["b1"]);
    assert_eq!(client.requested(), vec!["https://beta.test/band"]);
}

#[tokio::test]
async fn test_plugmax_caps_attempted_providers() {
    let client = Arc::new(
        CannedClient::default()
            .with("https://alpha.test/band", "a1")
            .with("https://beta.test/band", "b1"),
    );
    let engine = engine_with(
        Arc::clone(&client),
        vec![LineProvider::lyrics("alpha"), LineProvider::lyrics("beta")],
    );

    let mut query = lyric_query();
    query.set_plugmax(1).unwrap();
    let results = engine.execute(&mut query).await.unwrap().unwrap();

    assert_eq!(texts(&results), vec!["a1"]);
    assert_eq!(client.calls(), 1);
}

#[tokio::test]
async fn test_grouped_download_stops_after_satisfying_batch() {
    let client = Arc::new(
        CannedClient::default()
            .with("https://alpha.test/band", "a1")
            .with("https://beta.test/band", "b1")
            .with("https://gamma.test/band", "g1"),
    );
    let engine = engine_with(
        Arc::clone(&client),
        vec![
            LineProvider::lyrics("alpha"),
            LineProvider::lyrics("beta"),
            LineProvider::slow_lyrics("gamma"),
        ],
    );

    let mut query = lyric_query();
    query.set_grouped_download(true);
    query.set_number(2);
    let results = engine.execute(&mut query).await.unwrap().unwrap();

    assert_eq!(texts(&results), vec!["a1", "b1"]);
    assert!(!client
        .requested()
        .contains(&"https://gamma.test/band".to_string()));

    query.set_number(3);
    let results = engine.execute(&mut query).await.unwrap().unwrap();

    assert_eq!(texts(&results), vec!["a1", "b1", "g1"]);
    assert_eq!(
        client.requested().last().map(String::as_str),
        Some("https://gamma.test/band")
    );
}

#[tokio::test]
async fn test_links_are_replaced_by_downloaded_payload() {
    let client = Arc::new(
        CannedClient::default()
            .with("https://pics.test/band", COVER_LINKS)
            .with("https://img.test/tiny.jpg", "TINY")
            .with("https://img.test/big.jpg", "BIGIMAGE")
            .with("https://img.test/huge.jpg", "HUGEIMAGE"),
    );
    let engine = engine_with(Arc::clone(&client), vec![LineProvider::covers("pics")]);

    let mut query = cover_query();
    query.set_download(true);
    let results = engine.execute(&mut query).await.unwrap().unwrap();

    assert_eq!(results.len(), 1);
    let cover = results.get(0).unwrap();
    assert_eq!(cover.kind, ItemKind::Binary);
    assert_eq!(&cover.data[..], b"BIGIMAGE");
    assert_eq!(cover.source_url.as_deref(), Some("https://img.test/big.jpg"));

    // Undersized links are never fetched and nothing beyond `number` is
    assert_eq!(
        client.requested(),
        vec!["https://pics.test/band", "https://img.test/big.jpg"]
    );
}

#[tokio::test]
async fn test_failed_download_falls_through_to_next_link() {
    let client = Arc::new(
        CannedClient::default()
            .with("https://pics.test/band", COVER_LINKS)
            .with("https://img.test/huge.jpg", "HUGEIMAGE"),
    );
    let engine = engine_with(Arc::clone(&client), vec![LineProvider::covers("pics")]);

    let mut query = cover_query();
    let results = engine.execute(&mut query).await.unwrap().unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(&results.get(0).unwrap().data[..], b"HUGEIMAGE");
    assert_eq!(
        client.requested(),
        vec![
            "https://pics.test/band",
            "https://img.test/big.jpg",
            "https://img.test/huge.jpg"
        ]
    );
}

#[tokio::test]
async fn test_links_kept_without_download() {
    let client = Arc::new(CannedClient::default().with("https://pics.test/band", COVER_LINKS));
    let engine = engine_with(Arc::clone(&client), vec![LineProvider::covers("pics")]);

    let mut query = cover_query();
    query.set_download(false);
    query.set_number(0);
    let results = engine.execute(&mut query).await.unwrap().unwrap();

    let links: Vec<_> = results.iter().map(|item| item.kind).collect();
    assert_eq!(links, vec![ItemKind::Link, ItemKind::Link]);
    assert_eq!(client.calls(), 1);
}

#[tokio::test]
async fn test_parallel_fetch_respects_number() {
    let client = Arc::new(
        CannedClient::default()
            .with("https://alpha.test/band", "a1\na2")
            .with("https://beta.test/band", "b1\nb2")
            .with("https://gamma.test/band", "g1\ng2"),
    );
    let engine = engine_with(
        Arc::clone(&client),
        vec![
            LineProvider::lyrics("alpha"),
            LineProvider::lyrics("beta"),
            LineProvider::lyrics("gamma"),
        ],
    );

    let mut query = lyric_query();
    query.set_parallel(4);
    query.set_number(3);
    let results = engine.execute(&mut query).await.unwrap().unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(query.item_count(), 3);
    assert!(texts(&results)
        .iter()
        .all(|text| ["a1", "a2", "b1", "b2", "g1", "g2"].contains(&text.as_str())));
}

#[test]
fn test_query_logging_installs_once() {
    let mut query = Query::new();
    query.set_verbosity(2);
    query.set_color_output(false);

    assert!(core_metadata::init_query_logging(&query).is_ok());
    assert!(core_metadata::init_query_logging(&query).is_err());
}

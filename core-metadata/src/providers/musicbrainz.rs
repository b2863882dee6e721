//! MusicBrainz provider
//!
//! Artist relations (homepages, wikis, social profiles) and community tags
//! from the MusicBrainz web service.
//!
//! ## API Endpoints
//!
//! - **Search**: `https://musicbrainz.org/ws/2/artist/?query=artist:"{artist}"&fmt=json&limit=5`
//! - **Lookup**: `https://musicbrainz.org/ws/2/artist/{mbid}?inc=url-rels&fmt=json`
//!
//! Relations need the lookup, so the search response is followed up with a
//! second request for the best hit. Tags are already part of the search hit.
//! The best hit is the first one whose name is within the query's fuzzyness
//! of the requested artist.
//!
//! ## Rate Limiting
//!
//! Anonymous clients are limited to one request per second. The provider is
//! in the `slow` group; the transfer layer spaces requests per host.

use serde::Deserialize;

use crate::cache::ResultItem;
use crate::category::Category;
use crate::error::Result;
use crate::group::GroupMask;
use crate::provider::{ParseContext, Provider};
use crate::providers::{fuzzy_match, required};
use crate::query::Query;

/// MusicBrainz API base URL
const MUSICBRAINZ_API_BASE: &str = "https://musicbrainz.org/ws/2";

/// Search hits considered before giving up
const SEARCH_LIMIT: u32 = 5;

#[derive(Debug, Deserialize)]
struct ArtistSearchResponse {
    #[serde(default)]
    artists: Vec<ArtistHit>,
}

#[derive(Debug, Deserialize)]
struct ArtistHit {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    tags: Vec<Tag>,
}

#[derive(Debug, Deserialize)]
struct Tag {
    name: String,
    #[serde(default)]
    count: i64,
}

#[derive(Debug, Deserialize)]
struct ArtistLookup {
    #[serde(default)]
    relations: Vec<Relation>,
}

#[derive(Debug, Deserialize)]
struct Relation {
    #[serde(rename = "type")]
    kind: String,
    url: Option<RelationUrl>,
}

#[derive(Debug, Deserialize)]
struct RelationUrl {
    resource: String,
}

/// MusicBrainz provider for one category
pub struct MusicBrainzProvider {
    category: Category,
    base_url: String,
}

impl MusicBrainzProvider {
    pub fn relations() -> Self {
        Self {
            category: Category::Relation,
            base_url: MUSICBRAINZ_API_BASE.to_string(),
        }
    }

    pub fn tags() -> Self {
        Self {
            category: Category::Tag,
            base_url: MUSICBRAINZ_API_BASE.to_string(),
        }
    }

    /// One provider per supported category
    pub fn all() -> Vec<Self> {
        vec![Self::relations(), Self::tags()]
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn is_search(url: &str) -> bool {
        url.contains("query=")
    }

    /// First search hit matching the queried artist
    fn best_hit(ctx: &ParseContext<'_>) -> Result<Option<ArtistHit>> {
        let search: ArtistSearchResponse = ctx.json()?;
        let artist = ctx.query.artist().unwrap_or_default();

        Ok(search
            .artists
            .into_iter()
            .find(|hit| fuzzy_match(ctx.query, artist, &hit.name)))
    }

    fn lookup_url(&self, mbid: &str) -> String {
        format!(
            "{}/artist/{}?inc=url-rels&fmt=json",
            self.base_url,
            urlencoding::encode(mbid)
        )
    }

    fn parse_relations(&self, ctx: &ParseContext<'_>) -> Result<Vec<ResultItem>> {
        let lookup: ArtistLookup = ctx.json()?;

        Ok(lookup
            .relations
            .into_iter()
            .filter_map(|relation| {
                let resource = relation.url?.resource;
                let text = format!("{}: {}", relation.kind, resource);
                Some(
                    ResultItem::text(Category::Relation, self.name(), text)
                        .with_source_url(resource),
                )
            })
            .collect())
    }

    fn parse_tags(&self, ctx: &ParseContext<'_>) -> Result<Vec<ResultItem>> {
        let Some(mut artist) = Self::best_hit(ctx)? else {
            return Ok(Vec::new());
        };

        artist.tags.sort_by(|a, b| b.count.cmp(&a.count));

        Ok(artist
            .tags
            .into_iter()
            .filter(|tag| !tag.name.trim().is_empty())
            .map(|tag| {
                ResultItem::text(Category::Tag, self.name(), tag.name).with_source_url(ctx.url)
            })
            .collect())
    }
}

impl Provider for MusicBrainzProvider {
    fn name(&self) -> &str {
        "musicbrainz"
    }

    fn key(&self) -> &str {
        "mbz"
    }

    fn category(&self) -> Category {
        self.category
    }

    fn groups(&self) -> GroupMask {
        GroupMask::SAFE | GroupMask::SLOW
    }

    fn build_url(&self, query: &Query) -> Option<String> {
        let artist = required(query.artist())?;
        let search = format!("artist:\"{}\"", artist);

        Some(format!(
            "{}/artist/?query={}&fmt=json&limit={}",
            self.base_url,
            urlencoding::encode(&search),
            SEARCH_LIMIT
        ))
    }

    fn follow_up(&self, ctx: &ParseContext<'_>) -> Option<String> {
        if self.category != Category::Relation || !Self::is_search(ctx.url) {
            return None;
        }

        let artist = Self::best_hit(ctx).ok()??;
        Some(self.lookup_url(&artist.id))
    }

    fn parse(&self, ctx: &ParseContext<'_>) -> Result<Vec<ResultItem>> {
        match self.category {
            Category::Relation if Self::is_search(ctx.url) => Ok(Vec::new()),
            Category::Relation => self.parse_relations(ctx),
            Category::Tag => self.parse_tags(ctx),
            _ => Ok(Vec::new()),
        }
    }
}

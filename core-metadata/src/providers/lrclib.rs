//! LRCLib lyrics provider
//!
//! Free, open lyrics database with synced (LRC) and plain lyrics.
//!
//! - **Get**: `https://lrclib.net/api/get?artist_name={artist}&track_name={title}&album_name={album}`
//!
//! Synced lyrics are preferred when available.

use serde::Deserialize;

use crate::cache::ResultItem;
use crate::category::Category;
use crate::error::Result;
use crate::group::GroupMask;
use crate::provider::{ParseContext, Provider};
use crate::providers::required;
use crate::query::Query;

/// LRCLib API base URL
const LRCLIB_API_BASE: &str = "https://lrclib.net/api";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LrcLibResponse {
    plain_lyrics: Option<String>,
    synced_lyrics: Option<String>,
    #[serde(default)]
    instrumental: bool,
}

pub struct LrcLibProvider {
    base_url: String,
}

impl LrcLibProvider {
    pub fn new() -> Self {
        Self::with_base_url(LRCLIB_API_BASE)
    }

    /// Point at another LRCLib instance
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

impl Default for LrcLibProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl Provider for LrcLibProvider {
    fn name(&self) -> &str {
        "lrclib"
    }

    fn key(&self) -> &str {
        "lrc"
    }

    fn category(&self) -> Category {
        Category::Lyric
    }

    fn groups(&self) -> GroupMask {
        GroupMask::SAFE | GroupMask::FAST
    }

    fn build_url(&self, query: &Query) -> Option<String> {
        let artist = required(query.artist())?;
        let title = required(query.title())?;

        let mut url = format!(
            "{}/get?artist_name={}&track_name={}",
            self.base_url,
            urlencoding::encode(artist),
            urlencoding::encode(title)
        );

        if let Some(album) = required(query.album()) {
            url.push_str(&format!("&album_name={}", urlencoding::encode(album)));
        }

        Some(url)
    }

    fn parse(&self, ctx: &ParseContext<'_>) -> Result<Vec<ResultItem>> {
        let response: LrcLibResponse = ctx.json()?;

        if response.instrumental {
            return Ok(Vec::new());
        }

        let text = response
            .synced_lyrics
            .filter(|lyrics| !lyrics.trim().is_empty())
            .or(response.plain_lyrics)
            .filter(|lyrics| !lyrics.trim().is_empty());

        Ok(text
            .map(|lyrics| {
                ResultItem::text(Category::Lyric, self.name(), lyrics).with_source_url(ctx.url)
            })
            .into_iter()
            .collect())
    }
}

//! Deezer provider: album covers and artist photos
//!
//! - **Album search** (cover): `https://api.deezer.com/search/album?q=artist:"{artist}" album:"{album}"`
//! - **Artist search** (photos): `https://api.deezer.com/search/artist?q={artist}`
//!
//! Deezer serves each picture in four sizes; the largest one inside the
//! query's size bounds is picked.

use serde::Deserialize;

use crate::cache::ResultItem;
use crate::category::Category;
use crate::error::Result;
use crate::group::GroupMask;
use crate::provider::{ParseContext, Provider};
use crate::providers::{best_image, required};
use crate::query::Query;

const DEEZER_API_BASE: &str = "https://api.deezer.com";

/// Edge lengths of the small, medium, big and xl variants
const SIZES: [u32; 4] = [56, 250, 500, 1000];

#[derive(Debug, Deserialize)]
struct AlbumHit {
    #[serde(default)]
    cover_small: String,
    #[serde(default)]
    cover_medium: String,
    #[serde(default)]
    cover_big: String,
    #[serde(default)]
    cover_xl: String,
}

#[derive(Debug, Deserialize)]
struct ArtistHit {
    #[serde(default)]
    picture_small: String,
    #[serde(default)]
    picture_medium: String,
    #[serde(default)]
    picture_big: String,
    #[serde(default)]
    picture_xl: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

pub struct DeezerProvider {
    category: Category,
    base_url: String,
}

impl DeezerProvider {
    pub fn covers() -> Self {
        Self {
            category: Category::Cover,
            base_url: DEEZER_API_BASE.to_string(),
        }
    }

    pub fn photos() -> Self {
        Self {
            category: Category::Photo,
            base_url: DEEZER_API_BASE.to_string(),
        }
    }

    pub fn all() -> Vec<Self> {
        vec![Self::covers(), Self::photos()]
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn limit(query: &Query) -> usize {
        match query.number() {
            0 => 25,
            number => number.min(25),
        }
    }

    fn pick(&self, query: &Query, variants: [&str; 4]) -> Option<ResultItem> {
        let candidates: Vec<(u32, &str)> = SIZES.iter().copied().zip(variants).collect();
        let (size, url) = best_image(query, &candidates)?;

        Some(
            ResultItem::link(self.category, self.name(), url)
                .with_declared_size(size)
                .with_format("jpg"),
        )
    }
}

impl Provider for DeezerProvider {
    fn name(&self) -> &str {
        "deezer"
    }

    fn key(&self) -> &str {
        "dz"
    }

    fn category(&self) -> Category {
        self.category
    }

    fn groups(&self) -> GroupMask {
        GroupMask::SAFE | GroupMask::FAST
    }

    fn build_url(&self, query: &Query) -> Option<String> {
        let artist = required(query.artist())?;

        match self.category {
            Category::Cover => {
                let album = required(query.album())?;
                let search = format!("artist:\"{}\" album:\"{}\"", artist, album);
                Some(format!(
                    "{}/search/album?q={}&limit={}",
                    self.base_url,
                    urlencoding::encode(&search),
                    Self::limit(query)
                ))
            }
            Category::Photo => Some(format!(
                "{}/search/artist?q={}&limit={}",
                self.base_url,
                urlencoding::encode(artist),
                Self::limit(query)
            )),
            _ => None,
        }
    }

    fn parse(&self, ctx: &ParseContext<'_>) -> Result<Vec<ResultItem>> {
        let items = match self.category {
            Category::Cover => ctx
                .json::<SearchResponse<AlbumHit>>()?
                .data
                .iter()
                .filter_map(|hit| {
                    self.pick(
                        ctx.query,
                        [
                            hit.cover_small.as_str(),
                            hit.cover_medium.as_str(),
                            hit.cover_big.as_str(),
                            hit.cover_xl.as_str(),
                        ],
                    )
                })
                .collect(),
            Category::Photo => ctx
                .json::<SearchResponse<ArtistHit>>()?
                .data
                .iter()
                .filter_map(|hit| {
                    self.pick(
                        ctx.query,
                        [
                            hit.picture_small.as_str(),
                            hit.picture_medium.as_str(),
                            hit.picture_big.as_str(),
                            hit.picture_xl.as_str(),
                        ],
                    )
                })
                .collect(),
            _ => Vec::new(),
        };

        Ok(items)
    }
}

//! Last.fm API provider
//!
//! One provider instance per category, all named `lastfm`.
//!
//! ## API Endpoints
//!
//! - **Album Info** (cover, tracklist, review): `?method=album.getinfo&artist={artist}&album={album}`
//! - **Artist Info** (ainfo): `?method=artist.getinfo&artist={artist}&lang={lang}`
//! - **Similar Artists**: `?method=artist.getsimilar&artist={artist}&limit={number}`
//! - **Top Tags**: `?method=artist.gettoptags` or `album.gettoptags` when an album is set
//! - **Top Albums** (albumlist): `?method=artist.gettopalbums&artist={artist}`
//!
//! ## API Key Requirement
//!
//! Last.fm requires an API key for all requests.
//! Obtain one at: https://www.last.fm/api/account/create

use serde::Deserialize;
use tracing::debug;

use crate::cache::ResultItem;
use crate::category::Category;
use crate::error::{MetadataError, Result};
use crate::group::GroupMask;
use crate::provider::{ParseContext, Provider};
use crate::providers::{image_format, required, OneOrMany};
use crate::query::Query;

/// Last.fm API base URL
const LASTFM_API_BASE: &str = "https://ws.audioscrobbler.com/2.0/";

/// Last.fm error code for unknown artist/album
const NOT_FOUND: i32 = 6;

/// Categories served by Last.fm
const CATEGORIES: [Category; 7] = [
    Category::Cover,
    Category::ArtistInfo,
    Category::SimilarArtist,
    Category::Review,
    Category::TrackList,
    Category::Tag,
    Category::AlbumList,
];

#[derive(Debug, Clone, Deserialize)]
struct Image {
    #[serde(rename = "#text")]
    url: String,
    size: String,
}

impl Image {
    /// Approximate edge length of the named size
    fn pixels(&self) -> Option<u32> {
        match self.size.as_str() {
            "small" => Some(34),
            "medium" => Some(64),
            "large" => Some(174),
            "extralarge" => Some(300),
            "mega" => Some(600),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Wiki {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct Track {
    name: String,
    #[serde(default)]
    duration: Option<serde_json::Value>,
}

impl Track {
    fn seconds(&self) -> Option<u64> {
        match self.duration.as_ref()? {
            serde_json::Value::Number(n) => n.as_u64(),
            serde_json::Value::String(s) => s.parse().ok(),
            _ => None,
        }
        .filter(|seconds| *seconds > 0)
    }
}

#[derive(Debug, Default, Deserialize)]
struct Tracks {
    #[serde(default)]
    track: OneOrMany<Track>,
}

#[derive(Debug, Deserialize)]
struct AlbumInfo {
    #[serde(default)]
    image: Vec<Image>,
    #[serde(default)]
    tracks: Option<Tracks>,
    #[serde(default)]
    wiki: Option<Wiki>,
}

#[derive(Debug, Deserialize)]
struct AlbumResponse {
    album: AlbumInfo,
}

#[derive(Debug, Deserialize)]
struct ArtistInfo {
    #[serde(default)]
    bio: Option<Wiki>,
}

#[derive(Debug, Deserialize)]
struct ArtistResponse {
    artist: ArtistInfo,
}

#[derive(Debug, Deserialize)]
struct NamedEntry {
    name: String,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SimilarList {
    #[serde(default)]
    artist: OneOrMany<NamedEntry>,
}

#[derive(Debug, Deserialize)]
struct SimilarResponse {
    similarartists: SimilarList,
}

#[derive(Debug, Deserialize)]
struct TagList {
    #[serde(default)]
    tag: OneOrMany<NamedEntry>,
}

#[derive(Debug, Deserialize)]
struct TagResponse {
    toptags: TagList,
}

#[derive(Debug, Deserialize)]
struct AlbumList {
    #[serde(default)]
    album: OneOrMany<NamedEntry>,
}

#[derive(Debug, Deserialize)]
struct TopAlbumsResponse {
    topalbums: AlbumList,
}

/// Last.fm error response
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: i32,
    message: String,
}

pub struct LastFmProvider {
    api_key: String,
    category: Category,
    base_url: String,
}

impl LastFmProvider {
    /// Provider for one category; `None` if Last.fm does not serve it
    pub fn for_category(api_key: impl Into<String>, category: Category) -> Option<Self> {
        CATEGORIES.contains(&category).then(|| Self {
            api_key: api_key.into(),
            category,
            base_url: LASTFM_API_BASE.to_string(),
        })
    }

    /// One provider per served category
    pub fn all(api_key: &str) -> Vec<Self> {
        CATEGORIES
            .iter()
            .filter_map(|category| Self::for_category(api_key, *category))
            .collect()
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn method_url(&self, method: &str, params: &[(&str, &str)]) -> String {
        let mut url = format!(
            "{}?method={}&api_key={}&format=json&autocorrect=1",
            self.base_url,
            method,
            urlencoding::encode(&self.api_key)
        );
        for (name, value) in params {
            url.push_str(&format!("&{}={}", name, urlencoding::encode(value)));
        }
        url
    }

    fn text_item(&self, text: &str, ctx: &ParseContext<'_>) -> Option<ResultItem> {
        let text = text.trim();
        (!text.is_empty())
            .then(|| ResultItem::text(self.category, self.name(), text).with_source_url(ctx.url))
    }

    fn parse_album(&self, ctx: &ParseContext<'_>) -> Result<Vec<ResultItem>> {
        let album = ctx.json::<AlbumResponse>()?.album;

        let items = match self.category {
            Category::Cover => {
                let mut images: Vec<(u32, Image)> = album
                    .image
                    .into_iter()
                    .filter(|image| !image.url.is_empty())
                    .filter_map(|image| image.pixels().map(|size| (size, image)))
                    .collect();
                images.sort_by(|a, b| b.0.cmp(&a.0));

                images
                    .into_iter()
                    .map(|(size, image)| {
                        let mut item = ResultItem::link(self.category, self.name(), &image.url)
                            .with_declared_size(size);
                        if let Some(format) = image_format(&image.url) {
                            item = item.with_format(format);
                        }
                        item
                    })
                    .collect()
            }
            Category::TrackList => album
                .tracks
                .unwrap_or_default()
                .track
                .into_vec()
                .into_iter()
                .filter_map(|track| {
                    let line = match track.seconds() {
                        Some(seconds) => {
                            format!("{} ({}:{:02})", track.name, seconds / 60, seconds % 60)
                        }
                        None => track.name.clone(),
                    };
                    self.text_item(&line, ctx)
                })
                .collect(),
            Category::Review => album
                .wiki
                .and_then(|wiki| self.text_item(&wiki.content, ctx))
                .into_iter()
                .collect(),
            _ => Vec::new(),
        };

        Ok(items)
    }

    fn parse_names(&self, entries: Vec<NamedEntry>, ctx: &ParseContext<'_>) -> Vec<ResultItem> {
        entries
            .into_iter()
            .filter_map(|entry| {
                let item = self.text_item(&entry.name, ctx)?;
                Some(match entry.url {
                    Some(url) if !url.is_empty() => item.with_source_url(url),
                    _ => item,
                })
            })
            .collect()
    }
}

impl Provider for LastFmProvider {
    fn name(&self) -> &str {
        "lastfm"
    }

    fn key(&self) -> &str {
        "last"
    }

    fn category(&self) -> Category {
        self.category
    }

    fn groups(&self) -> GroupMask {
        GroupMask::SAFE | GroupMask::FAST
    }

    fn build_url(&self, query: &Query) -> Option<String> {
        let artist = required(query.artist())?;

        let url = match self.category {
            Category::Cover | Category::TrackList => {
                let album = required(query.album())?;
                self.method_url("album.getinfo", &[("artist", artist), ("album", album)])
            }
            Category::Review => {
                let album = required(query.album())?;
                self.method_url(
                    "album.getinfo",
                    &[("artist", artist), ("album", album), ("lang", query.language())],
                )
            }
            Category::ArtistInfo => self.method_url(
                "artist.getinfo",
                &[("artist", artist), ("lang", query.language())],
            ),
            Category::SimilarArtist => {
                let limit = query.number().to_string();
                if query.number() > 0 {
                    self.method_url(
                        "artist.getsimilar",
                        &[("artist", artist), ("limit", limit.as_str())],
                    )
                } else {
                    self.method_url("artist.getsimilar", &[("artist", artist)])
                }
            }
            Category::Tag => match required(query.album()) {
                Some(album) => {
                    self.method_url("album.gettoptags", &[("artist", artist), ("album", album)])
                }
                None => self.method_url("artist.gettoptags", &[("artist", artist)]),
            },
            Category::AlbumList => self.method_url("artist.gettopalbums", &[("artist", artist)]),
            _ => return None,
        };

        Some(url)
    }

    fn parse(&self, ctx: &ParseContext<'_>) -> Result<Vec<ResultItem>> {
        if let Ok(error) = ctx.json::<ErrorResponse>() {
            if error.error == NOT_FOUND {
                debug!(message = %error.message, "Last.fm: not found");
                return Ok(Vec::new());
            }
            return Err(MetadataError::Parse(format!(
                "Last.fm API error {}: {}",
                error.error, error.message
            )));
        }

        match self.category {
            Category::Cover | Category::TrackList | Category::Review => self.parse_album(ctx),
            Category::ArtistInfo => Ok(ctx
                .json::<ArtistResponse>()?
                .artist
                .bio
                .and_then(|bio| self.text_item(&bio.content, ctx))
                .into_iter()
                .collect()),
            Category::SimilarArtist => {
                let list = ctx.json::<SimilarResponse>()?.similarartists.artist;
                Ok(self.parse_names(list.into_vec(), ctx))
            }
            Category::Tag => {
                let list = ctx.json::<TagResponse>()?.toptags.tag;
                Ok(self.parse_names(list.into_vec(), ctx))
            }
            Category::AlbumList => {
                let list = ctx.json::<TopAlbumsResponse>()?.topalbums.album;
                Ok(self.parse_names(list.into_vec(), ctx))
            }
            _ => Ok(Vec::new()),
        }
    }
}

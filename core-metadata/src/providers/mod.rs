//! Built-in providers
//!
//! Each provider builds one request URL from the query and parses the JSON
//! the service answers with. Transfers, filtering and fallback are the
//! pipeline's business.
//!
//! | Provider    | Key    | Categories                                                | Groups    |
//! |-------------|--------|-----------------------------------------------------------|-----------|
//! | lrclib      | `lrc`  | lyrics                                                    | safe+fast |
//! | deezer      | `dz`   | cover, photos                                             | safe+fast |
//! | musicbrainz | `mbz`  | relations, tags                                           | safe+slow |
//! | lastfm      | `last` | cover, ainfo, similar, review, tracklist, tags, albumlist | safe+fast |
//!
//! Last.fm needs an API key and is only registered when one is configured.

pub mod deezer;
pub mod lastfm;
pub mod lrclib;
pub mod musicbrainz;

pub use deezer::DeezerProvider;
pub use lastfm::LastFmProvider;
pub use lrclib::LrcLibProvider;
pub use musicbrainz::MusicBrainzProvider;

use serde::Deserialize;

use crate::query::Query;

/// JSON APIs that return a bare object instead of a one-element array
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub(crate) fn into_vec(self) -> Vec<T> {
        match self {
            Self::Many(items) => items,
            Self::One(item) => vec![item],
        }
    }
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

/// Trimmed, non-empty value
pub(crate) fn required(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Whether `found` names the same thing as `expected` within the query's
/// edit-distance tolerance, ignoring case
pub(crate) fn fuzzy_match(query: &Query, expected: &str, found: &str) -> bool {
    let expected = expected.trim().to_lowercase();
    let found = found.trim().to_lowercase();
    strsim::levenshtein(&expected, &found) <= query.fuzzyness() as usize
}

/// Lowercase file extension of an image URL
pub(crate) fn image_format(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let file = path.rsplit('/').next()?;
    let (_, extension) = file.rsplit_once('.')?;
    let extension = extension.to_ascii_lowercase();
    matches!(extension.as_str(), "jpg" | "jpeg" | "png" | "gif" | "webp" | "bmp")
        .then_some(extension)
}

/// Largest candidate inside the query's image size bounds
pub(crate) fn best_image<'a>(
    query: &Query,
    candidates: &[(u32, &'a str)],
) -> Option<(u32, &'a str)> {
    let mut sorted: Vec<(u32, &str)> = candidates
        .iter()
        .copied()
        .filter(|(_, url)| !url.is_empty())
        .collect();
    sorted.sort_by(|a, b| b.0.cmp(&a.0));

    sorted.into_iter().find(|(size, _)| {
        query.cover_min_size().map_or(true, |min| *size >= min)
            && query.cover_max_size().map_or(true, |max| *size <= max)
    })
}

//! Metadata categories
//!
//! Every query asks for exactly one kind of metadata. The `Unresolved`
//! pseudo-category is the default of a fresh query and doubles as the key of
//! the introspection table listing the categories themselves.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MetadataError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Cover,
    Lyric,
    Photo,
    ArtistInfo,
    SimilarArtist,
    Review,
    TrackList,
    Tag,
    AlbumList,
    Relation,
    Unresolved,
}

impl Category {
    /// Categories that can actually be fetched, in introspection-table order
    pub const FETCHABLE: [Category; 10] = [
        Category::Cover,
        Category::Lyric,
        Category::Photo,
        Category::ArtistInfo,
        Category::SimilarArtist,
        Category::Review,
        Category::AlbumList,
        Category::Tag,
        Category::Relation,
        Category::TrackList,
    ];

    /// Name used on the command line and in the introspection table
    pub fn name(&self) -> &'static str {
        match self {
            Self::Cover => "cover",
            Self::Lyric => "lyrics",
            Self::Photo => "photos",
            Self::ArtistInfo => "ainfo",
            Self::SimilarArtist => "similar",
            Self::Review => "review",
            Self::TrackList => "tracklist",
            Self::Tag => "tags",
            Self::AlbumList => "albumlist",
            Self::Relation => "relations",
            Self::Unresolved => "unresolved",
        }
    }

    /// One-letter alias. `review` and `tracklist` share `r`.
    pub fn key(&self) -> Option<&'static str> {
        match self {
            Self::Cover => Some("c"),
            Self::Lyric => Some("l"),
            Self::Photo => Some("p"),
            Self::ArtistInfo => Some("a"),
            Self::SimilarArtist => Some("s"),
            Self::Review | Self::TrackList => Some("r"),
            Self::Tag => Some("t"),
            Self::AlbumList => Some("i"),
            Self::Relation => Some("n"),
            Self::Unresolved => None,
        }
    }

    /// Whether results of this category are images
    pub fn is_image(&self) -> bool {
        matches!(self, Self::Cover | Self::Photo)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Category {
    type Err = MetadataError;

    /// Accepts the full name or the kebab-case enum spelling, case-insensitive.
    /// The ambiguous short key `r` is not accepted here.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        let found = Self::FETCHABLE.iter().copied().find(|category| {
            category.name().eq_ignore_ascii_case(wanted)
                || kebab_name(*category).eq_ignore_ascii_case(wanted)
                || (category.key() != Some("r")
                    && category
                        .key()
                        .is_some_and(|key| key.eq_ignore_ascii_case(wanted)))
        });

        found.ok_or_else(|| MetadataError::UnknownGetter(s.to_string()))
    }
}

fn kebab_name(category: Category) -> &'static str {
    match category {
        Category::Cover => "cover",
        Category::Lyric => "lyric",
        Category::Photo => "photo",
        Category::ArtistInfo => "artist-info",
        Category::SimilarArtist => "similar-artist",
        Category::Review => "review",
        Category::TrackList => "track-list",
        Category::Tag => "tag",
        Category::AlbumList => "album-list",
        Category::Relation => "relation",
        Category::Unresolved => "unresolved",
    }
}

//! # Provider Selector Language
//!
//! A selector is a whitespace separated list of tokens that switch provider
//! table entries on or off:
//!
//! ```text
//! -all +lrclib          only lrclib
//! safe -slow            (re)enable safe providers, then drop slow ones
//! -unsafe deezer        drop scrapers, make sure deezer is on
//! ```
//!
//! Each token may start with `+` (enable, the default) or `-` (disable) and
//! names either a group (`all`, `safe`, `unsafe`, `special`, `fast`, `slow`)
//! or a provider by name or key, all case-insensitive.
//!
//! Evaluation is best-effort: tokens that match nothing are logged and
//! skipped, the remaining tokens still apply, and the whole call reports a
//! single `BadValue` listing the offenders.

use tracing::warn;

use crate::error::{MetadataError, Result};
use crate::group::Group;
use crate::provider::ProviderTable;
use crate::query::Query;
use crate::registry::ProviderRegistry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorTarget {
    Group(Group),
    /// Provider name or key
    Provider(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorToken {
    pub enable: bool,
    pub target: SelectorTarget,
}

impl SelectorToken {
    fn parse(raw: &str) -> Self {
        let (enable, rest) = match raw.as_bytes().first() {
            Some(b'-') => (false, &raw[1..]),
            Some(b'+') => (true, &raw[1..]),
            _ => (true, raw),
        };

        let target = match Group::from_name(rest) {
            Some(group) => SelectorTarget::Group(group),
            None => SelectorTarget::Provider(rest.to_string()),
        };

        Self { enable, target }
    }
}

/// A parsed selector expression
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selector {
    tokens: Vec<SelectorToken>,
}

impl Selector {
    pub fn parse(expression: &str) -> Self {
        Self {
            tokens: expression.split_whitespace().map(SelectorToken::parse).collect(),
        }
    }

    pub fn tokens(&self) -> &[SelectorToken] {
        &self.tokens
    }

    /// Apply every token in order. Returns the provider names that matched
    /// no entry.
    pub fn apply_to(&self, table: &mut ProviderTable) -> Vec<String> {
        let mut unknown = Vec::new();

        for token in &self.tokens {
            match &token.target {
                SelectorTarget::Group(group) => table.set_group_enabled(group.mask(), token.enable),
                SelectorTarget::Provider(name) => {
                    if table.set_enabled_by_name(name, token.enable) == 0 {
                        warn!(
                            provider = %name,
                            category = %table.category(),
                            "Unknown provider"
                        );
                        unknown.push(name.clone());
                    }
                }
            }
        }

        unknown
    }
}

/// Replace the query's provider table with a freshly resolved one and filter
/// it with `expression`.
///
/// A category without providers leaves the query without a table. Unknown
/// tokens yield one `BadValue` after every other token has been applied.
pub fn apply_selector(
    registry: &ProviderRegistry,
    query: &mut Query,
    expression: &str,
) -> Result<()> {
    let mut table = match registry.resolve_table(query.category()) {
        Ok(table) => table,
        Err(err) => {
            warn!(category = %query.category(), error = %err, "No provider table to filter");
            query.set_providers(None);
            return Ok(());
        }
    };

    let unknown = Selector::parse(expression).apply_to(&mut table);
    query.set_providers(Some(table));

    if unknown.is_empty() {
        Ok(())
    } else {
        Err(MetadataError::BadValue(format!(
            "unknown provider(s): {}",
            unknown.join(", ")
        )))
    }
}

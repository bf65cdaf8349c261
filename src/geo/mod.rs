//! # Geo resolution
//!
//! Deterministic country attribution for free text.
//!
//! - A valid ISO alpha-2 hint always wins.
//! - Otherwise the title (counted three times) and body are scanned for
//!   alias phrases with whole-word, case-insensitive matching.
//! - Longer phrases are matched first and their spans are masked, so
//!   "South Africa" never also counts as a shorter contained alias.
//! - Most mentions wins; ties go to the lowest ISO code.
//!
//! Resolution never fails: "no country" is a normal outcome.

pub mod aliases;
pub mod registry;
pub mod sources;

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

pub use aliases::AliasEntry;
pub use registry::country_name;
pub use sources::{country_for_community, country_for_source_label};

/// ISO 3166-1 alpha-2 code, upper-case.
pub type CountryCode = String;

/// How many times the title is repeated in the search string.
const TITLE_WEIGHT: usize = 3;

#[derive(Debug)]
struct CompiledAlias {
    phrase: String,
    code: Option<CountryCode>,
    re: Regex,
}

/// Alias-table matcher. Regexes are compiled once at construction.
#[derive(Debug)]
pub struct GeoResolver {
    aliases: Vec<CompiledAlias>,
}

impl Default for GeoResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl GeoResolver {
    /// Resolver over the built-in alias table.
    pub fn new() -> Self {
        Self::with_aliases(aliases::builtin())
    }

    /// Resolver over an explicit alias table.
    pub fn with_aliases(entries: Vec<AliasEntry>) -> Self {
        let mut entries = entries;
        // Longest phrase first; phrase order keeps equal lengths deterministic.
        entries.sort_by(|a, b| {
            b.phrase
                .chars()
                .count()
                .cmp(&a.phrase.chars().count())
                .then_with(|| a.phrase.cmp(&b.phrase))
        });
        entries.dedup_by(|a, b| a.phrase == b.phrase);

        let aliases = entries
            .into_iter()
            .filter_map(|e| match Regex::new(&phrase_pattern(&e.phrase)) {
                Ok(re) => Some(CompiledAlias {
                    phrase: e.phrase,
                    code: e.code,
                    re,
                }),
                Err(err) => {
                    tracing::warn!(target: "geo", phrase = %e.phrase, error = %err, "skipping alias");
                    None
                }
            })
            .collect();

        Self { aliases }
    }

    /// Built-in table merged with an optional JSON overlay.
    ///
    /// Overlay rows replace built-in rows with the same phrase. A missing or
    /// broken overlay file leaves the built-in table in place.
    pub fn from_config(overlay: Option<&Path>) -> Self {
        let mut table: HashMap<String, Option<CountryCode>> = aliases::builtin()
            .into_iter()
            .map(|e| (e.phrase, e.code))
            .collect();

        if let Some(path) = overlay.filter(|p| p.exists()) {
            match aliases::load_overlay(path) {
                Ok(extra) => {
                    tracing::info!(target: "geo", path = %path.display(), count = extra.len(), "alias overlay loaded");
                    for e in extra {
                        table.insert(e.phrase, e.code);
                    }
                }
                Err(err) => {
                    tracing::warn!(target: "geo", error = ?err, "alias overlay ignored");
                }
            }
        }

        Self::with_aliases(
            table
                .into_iter()
                .map(|(phrase, code)| AliasEntry { phrase, code })
                .collect(),
        )
    }

    /// Number of compiled alias phrases.
    pub fn alias_count(&self) -> usize {
        self.aliases.len()
    }

    /// Pick one country for an item, or `None` when nothing matches.
    pub fn resolve(&self, title: &str, body: Option<&str>, hint: Option<&str>) -> Option<CountryCode> {
        if let Some(code) = hint.and_then(valid_hint) {
            return Some(code);
        }
        self.rank_countries(title, body)
            .into_iter()
            .next()
            .map(|(code, _)| code)
    }

    /// Every mentioned country with its weighted mention count,
    /// sorted by count descending, then code ascending.
    pub fn rank_countries(&self, title: &str, body: Option<&str>) -> Vec<(CountryCode, usize)> {
        let text = search_text(title, body.unwrap_or_default());
        if text.trim().is_empty() {
            return Vec::new();
        }

        let mut ranked: Vec<(CountryCode, usize)> = self.mention_counts(&text).into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked
    }

    fn mention_counts(&self, text: &str) -> BTreeMap<CountryCode, usize> {
        let mut hay = text.to_lowercase();
        let mut counts = BTreeMap::new();

        for alias in &self.aliases {
            let spans: Vec<(usize, usize)> = alias
                .re
                .find_iter(&hay)
                .map(|m| (m.start(), m.end()))
                .collect();
            if spans.is_empty() {
                continue;
            }

            // Consume the span so shorter contained phrases cannot re-match it.
            for &(start, end) in &spans {
                hay.replace_range(start..end, &" ".repeat(end - start));
            }

            match &alias.code {
                Some(code) => *counts.entry(code.clone()).or_insert(0) += spans.len(),
                None => tracing::trace!(target: "geo", phrase = %alias.phrase, "region phrase matched"),
            }
        }

        counts
    }
}

/// A hint is usable only when it is an assigned ISO alpha-2 code.
pub fn valid_hint(hint: &str) -> Option<CountryCode> {
    let hint = hint.trim();
    registry::is_valid_alpha2(hint).then(|| hint.to_ascii_uppercase())
}

static BUILTIN_ALIASES: Lazy<HashMap<String, Option<CountryCode>>> = Lazy::new(|| {
    aliases::builtin()
        .into_iter()
        .map(|e| (e.phrase, e.code))
        .collect()
});

/// Resolve a plain country *name* (not free text) to a code.
///
/// Alias table, then exact registry lookup (alpha-2, alpha-3, names), then
/// fuzzy registry search.
pub fn lookup_country_code(name: &str) -> Option<CountryCode> {
    let norm = registry::normalize_name(name);
    if norm.is_empty() {
        return None;
    }
    if let Some(code) = BUILTIN_ALIASES.get(&norm) {
        return code.clone();
    }
    registry::lookup(name)
        .or_else(|| registry::search_fuzzy(name))
        .map(|r| r.alpha2.to_string())
}

fn search_text(title: &str, body: &str) -> String {
    let mut parts = vec![title; TITLE_WEIGHT];
    parts.push(body);
    parts.join("\n")
}

/// Whole-word pattern for a lowercase phrase. Boundaries are only asserted
/// at word-character ends ("u.s." has none at its tail).
fn phrase_pattern(phrase: &str) -> String {
    let escaped = regex::escape(phrase).replace(' ', r"\s+");
    let starts_word = phrase.chars().next().is_some_and(char::is_alphanumeric);
    let ends_word = phrase.chars().last().is_some_and(char::is_alphanumeric);
    format!(
        "{}{}{}",
        if starts_word { r"\b" } else { "" },
        escaped,
        if ends_word { r"\b" } else { "" }
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> GeoResolver {
        GeoResolver::new()
    }

    #[test]
    fn valid_hint_short_circuits_text() {
        let r = resolver();
        assert_eq!(r.resolve("Elections in France", None, Some("de")), Some("DE".into()));
    }

    #[test]
    fn invalid_hint_falls_back_to_text() {
        let r = resolver();
        assert_eq!(r.resolve("Elections in France", None, Some("XX")), Some("FR".into()));
        assert_eq!(r.resolve("Elections in France", None, Some("FRA")), Some("FR".into()));
    }

    #[test]
    fn title_mentions_weigh_three_times() {
        let r = resolver();
        let got = r.resolve("Germany signs deal", Some("Officials from France attended."), None);
        assert_eq!(got, Some("DE".into()));
        assert_eq!(
            r.rank_countries("Germany signs deal", Some("Officials from France attended.")),
            vec![("DE".to_string(), 3), ("FR".to_string(), 1)]
        );
    }

    #[test]
    fn longest_phrase_consumes_contained_alias() {
        let r = resolver();
        assert_eq!(r.resolve("", Some("Rolling blackouts in South Africa"), None), Some("ZA".into()));
        let ranked = r.rank_countries("North Korea fires missile", None);
        assert_eq!(ranked, vec![("KP".to_string(), 3)]);
    }

    #[test]
    fn region_phrase_consumes_span_without_country() {
        let r = resolver();
        assert_eq!(r.resolve("Storm builds over the Gulf of Mexico", None, None), None);
        assert_eq!(r.resolve("Tensions in the South China Sea", None, None), None);
    }

    #[test]
    fn words_containing_an_alias_do_not_match() {
        let r = resolver();
        assert_eq!(r.resolve("Hurricane season starts early", None, None), None);
        assert_eq!(r.resolve("Nigeria", None, None), Some("NG".into()));
        assert_eq!(r.resolve("Niger", None, None), Some("NE".into()));
    }

    #[test]
    fn ties_break_on_lowest_code() {
        let r = resolver();
        assert_eq!(r.resolve("", Some("Japan and Brazil agree"), None), Some("BR".into()));
        assert_eq!(r.resolve("", Some("Brazil and Japan agree"), None), Some("BR".into()));
    }

    #[test]
    fn empty_input_is_unresolved() {
        let r = resolver();
        assert_eq!(r.resolve("", None, None), None);
        assert_eq!(r.resolve("   ", Some(""), None), None);
        assert!(r.rank_countries("", None).is_empty());
    }

    #[test]
    fn abbreviations_with_dots_match() {
        let r = resolver();
        assert_eq!(r.resolve("U.S. stocks rally", None, None), Some("US".into()));
    }

    #[test]
    fn lookup_country_code_chain() {
        assert_eq!(lookup_country_code("United Kingdom"), Some("GB".into()));
        assert_eq!(lookup_country_code("Holland"), Some("NL".into()));
        assert_eq!(lookup_country_code("DEU"), Some("DE".into()));
        assert_eq!(lookup_country_code("Côte d'Ivoire"), Some("CI".into()));
        assert_eq!(lookup_country_code("Phillipines"), Some("PH".into()));
        assert_eq!(lookup_country_code("Europe"), None);
        assert_eq!(lookup_country_code(""), None);
    }

    #[test]
    fn phrase_pattern_boundaries() {
        assert_eq!(phrase_pattern("iran"), r"\biran\b");
        assert_eq!(phrase_pattern("u.s."), r"\bu\.s\.");
        assert_eq!(phrase_pattern("south africa"), r"\bsouth\s+africa\b");
    }
}

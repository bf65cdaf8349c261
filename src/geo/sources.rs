//! Source-bound country hints: well-known outlets and community handles.
//!
//! These produce a structured hint before any text inference runs. An outlet
//! mapped to `None` is known to be international; it yields no hint and
//! text inference decides.

/// Outlet name → home country. `None` = international wire/broadcaster.
#[rustfmt::skip]
const OUTLETS: &[(&str, Option<&str>)] = &[
    ("bbc", Some("GB")), ("bbc news", Some("GB")), ("the guardian", Some("GB")),
    ("reuters", None), ("associated press", None), ("ap news", None), ("afp", None),
    ("cnn", Some("US")), ("fox news", Some("US")), ("nbc news", Some("US")),
    ("abc news", Some("US")), ("new york times", Some("US")), ("washington post", Some("US")),
    ("wall street journal", Some("US")), ("npr", Some("US")),
    ("al jazeera", Some("QA")),
    ("france 24", Some("FR")), ("le monde", Some("FR")),
    ("der spiegel", Some("DE")), ("deutsche welle", Some("DE")),
    ("times of india", Some("IN")), ("hindustan times", Some("IN")), ("ndtv", Some("IN")),
    ("south china morning post", Some("HK")), ("china daily", Some("CN")),
    ("nhk", Some("JP")), ("japan times", Some("JP")),
    ("abc australia", Some("AU")), ("sydney morning herald", Some("AU")),
    ("cbc", Some("CA")), ("globe and mail", Some("CA")),
    ("rt", Some("RU")),
];

/// Community handle (lowercase, no prefix) → country. `None` = global community.
#[rustfmt::skip]
const COMMUNITIES: &[(&str, Option<&str>)] = &[
    ("unitedkingdom", Some("GB")), ("ukpolitics", Some("GB")), ("casualuk", Some("GB")),
    ("france", Some("FR")), ("germany", Some("DE")), ("de", Some("DE")),
    ("india", Some("IN")), ("australia", Some("AU")), ("canada", Some("CA")),
    ("japan", Some("JP")), ("korea", Some("KR")), ("china", Some("CN")),
    ("russia", Some("RU")), ("brazil", Some("BR")), ("mexico", Some("MX")),
    ("spain", Some("ES")), ("italy", Some("IT")), ("netherlands", Some("NL")),
    ("sweden", Some("SE")), ("norway", Some("NO")), ("denmark", Some("DK")),
    ("finland", Some("FI")), ("poland", Some("PL")), ("ukraine", Some("UA")),
    ("ireland", Some("IE")), ("newzealand", Some("NZ")), ("singapore", Some("SG")),
    ("philippines", Some("PH")), ("indonesia", Some("ID")), ("malaysia", Some("MY")),
    ("thailand", Some("TH")), ("vietnam", Some("VN")), ("southafrica", Some("ZA")),
    ("israel", Some("IL")), ("turkey", Some("TR")), ("egypt", Some("EG")),
    ("nigeria", Some("NG")), ("kenya", Some("KE")), ("argentina", Some("AR")),
    ("chile", Some("CL")), ("colombia", Some("CO")), ("peru", Some("PE")),
    ("europe", None), ("worldnews", None),
    ("news", Some("US")), ("politics", Some("US")),
];

/// Country for a news outlet name.
///
/// Exact match first, then whole-word containment of a known outlet name
/// (e.g. "BBC News - World" → GB).
pub fn country_for_source_label(label: &str) -> Option<String> {
    let norm = label.trim().to_lowercase();
    if norm.is_empty() {
        return None;
    }

    if let Some((_, code)) = OUTLETS.iter().find(|(k, _)| *k == norm) {
        return code.map(str::to_string);
    }

    // Partial match needs whole words, otherwise "rt" hits "sports".
    let padded = format!(" {} ", norm.replace(|c: char| !c.is_alphanumeric(), " "));
    OUTLETS
        .iter()
        .find(|(k, _)| padded.contains(&format!(" {k} ")))
        .and_then(|(_, code)| code.map(str::to_string))
}

/// Country for a community handle such as `r/france` or `france`.
pub fn country_for_community(handle: &str) -> Option<String> {
    let norm = handle.trim().to_lowercase();
    let norm = norm
        .strip_prefix("/r/")
        .or_else(|| norm.strip_prefix("r/"))
        .unwrap_or(&norm)
        .trim();
    COMMUNITIES
        .iter()
        .find(|(k, _)| *k == norm)
        .and_then(|(_, code)| code.map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outlet_exact_and_partial_matches() {
        assert_eq!(country_for_source_label("BBC News"), Some("GB".into()));
        assert_eq!(country_for_source_label("Der Spiegel International"), Some("DE".into()));
        assert_eq!(country_for_source_label("Reuters"), None);
        assert_eq!(country_for_source_label("Unknown Gazette"), None);
    }

    #[test]
    fn short_outlet_keys_need_whole_words() {
        assert_eq!(country_for_source_label("Yahoo Sports"), None);
        assert_eq!(country_for_source_label("RT"), Some("RU".into()));
    }

    #[test]
    fn community_prefixes_are_stripped() {
        assert_eq!(country_for_community("r/france"), Some("FR".into()));
        assert_eq!(country_for_community("/r/Germany"), Some("DE".into()));
        assert_eq!(country_for_community("worldnews"), None);
        assert_eq!(country_for_community("r/cats"), None);
    }
}

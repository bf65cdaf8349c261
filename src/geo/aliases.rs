//! Built-in alias table (country names, demonyms, capitals, major cities)
//! plus the JSON overlay that extends it per deployment.
//!
//! JSON shape (`config/country_aliases.json`):
//! ```json
//! { "aliases": { "kyiv": "UA", "balkans": null } }
//! ```
//! A `null` target marks a phrase that should be recognized (and consume its
//! span) without attributing any country.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use super::registry;

/// Phrases that are not carried by the registry names themselves.
#[rustfmt::skip]
const CURATED: &[(&str, &str)] = &[
    // United States
    ("usa", "US"), ("u.s.", "US"), ("u.s.a.", "US"), ("united states of america", "US"),
    ("america", "US"), ("american", "US"), ("americans", "US"),
    ("washington", "US"), ("white house", "US"), ("new york", "US"), ("los angeles", "US"),
    ("chicago", "US"), ("san francisco", "US"), ("new jersey", "US"), ("new mexico", "US"),
    ("new england", "US"), ("silicon valley", "US"), ("capitol hill", "US"),
    // United Kingdom
    ("uk", "GB"), ("u.k.", "GB"), ("britain", "GB"), ("great britain", "GB"),
    ("british", "GB"), ("england", "GB"), ("scotland", "GB"), ("scottish", "GB"),
    ("wales", "GB"), ("welsh", "GB"), ("northern ireland", "GB"), ("london", "GB"),
    ("manchester", "GB"), ("edinburgh", "GB"), ("downing street", "GB"),
    // Europe
    ("french", "FR"), ("paris", "FR"), ("marseille", "FR"), ("elysee", "FR"),
    ("german", "DE"), ("germans", "DE"), ("berlin", "DE"), ("munich", "DE"), ("frankfurt", "DE"),
    ("bundestag", "DE"),
    ("italian", "IT"), ("rome", "IT"), ("milan", "IT"),
    ("spanish", "ES"), ("madrid", "ES"), ("barcelona", "ES"),
    ("portuguese", "PT"), ("lisbon", "PT"),
    ("dutch", "NL"), ("holland", "NL"), ("amsterdam", "NL"), ("the hague", "NL"),
    ("belgian", "BE"), ("brussels", "BE"),
    ("swiss", "CH"), ("zurich", "CH"), ("geneva", "CH"), ("bern", "CH"),
    ("austrian", "AT"), ("vienna", "AT"),
    ("irish", "IE"), ("dublin", "IE"),
    ("swedish", "SE"), ("stockholm", "SE"),
    ("norwegian", "NO"), ("oslo", "NO"),
    ("danish", "DK"), ("copenhagen", "DK"),
    ("finnish", "FI"), ("helsinki", "FI"),
    ("icelandic", "IS"), ("reykjavik", "IS"),
    ("polish", "PL"), ("warsaw", "PL"),
    ("czech", "CZ"), ("prague", "CZ"),
    ("slovak", "SK"), ("bratislava", "SK"),
    ("hungarian", "HU"), ("budapest", "HU"),
    ("romanian", "RO"), ("bucharest", "RO"),
    ("bulgarian", "BG"), ("sofia", "BG"),
    ("greek", "GR"), ("athens", "GR"),
    ("serbian", "RS"), ("belgrade", "RS"),
    ("croatian", "HR"), ("zagreb", "HR"),
    ("ukrainian", "UA"), ("ukrainians", "UA"), ("kyiv", "UA"), ("kiev", "UA"), ("kharkiv", "UA"),
    ("odesa", "UA"), ("odessa", "UA"),
    ("russian", "RU"), ("russians", "RU"), ("moscow", "RU"), ("kremlin", "RU"),
    ("st petersburg", "RU"),
    ("belarusian", "BY"), ("minsk", "BY"),
    ("moldovan", "MD"), ("chisinau", "MD"),
    ("lithuanian", "LT"), ("vilnius", "LT"),
    ("latvian", "LV"), ("riga", "LV"),
    ("estonian", "EE"), ("tallinn", "EE"),
    // Middle East
    ("turkish", "TR"), ("ankara", "TR"), ("istanbul", "TR"),
    ("iranian", "IR"), ("tehran", "IR"),
    ("iraqi", "IQ"), ("baghdad", "IQ"),
    ("syrian", "SY"), ("damascus", "SY"),
    ("israeli", "IL"), ("israelis", "IL"), ("jerusalem", "IL"), ("tel aviv", "IL"),
    ("palestinian", "PS"), ("palestinians", "PS"), ("gaza", "PS"), ("west bank", "PS"),
    ("lebanese", "LB"), ("beirut", "LB"),
    ("jordanian", "JO"), ("amman", "JO"),
    ("saudi", "SA"), ("saudis", "SA"), ("riyadh", "SA"),
    ("emirati", "AE"), ("uae", "AE"), ("dubai", "AE"), ("abu dhabi", "AE"),
    ("qatari", "QA"), ("doha", "QA"),
    ("kuwaiti", "KW"),
    ("yemeni", "YE"), ("sanaa", "YE"),
    ("omani", "OM"), ("muscat", "OM"),
    // Asia
    ("chinese", "CN"), ("beijing", "CN"), ("shanghai", "CN"), ("shenzhen", "CN"),
    ("peoples republic of china", "CN"),
    ("taiwanese", "TW"), ("taipei", "TW"),
    ("japanese", "JP"), ("tokyo", "JP"), ("osaka", "JP"),
    ("korea", "KR"), ("korean", "KR"), ("south korean", "KR"), ("seoul", "KR"),
    ("north korean", "KP"), ("pyongyang", "KP"),
    ("indian", "IN"), ("indians", "IN"), ("new delhi", "IN"), ("delhi", "IN"), ("mumbai", "IN"),
    ("bangalore", "IN"), ("bengaluru", "IN"),
    ("pakistani", "PK"), ("islamabad", "PK"), ("karachi", "PK"), ("lahore", "PK"),
    ("bangladeshi", "BD"), ("dhaka", "BD"),
    ("afghan", "AF"), ("kabul", "AF"),
    ("nepali", "NP"), ("kathmandu", "NP"),
    ("sri lankan", "LK"), ("colombo", "LK"),
    ("vietnamese", "VN"), ("hanoi", "VN"), ("ho chi minh city", "VN"),
    ("thai", "TH"), ("bangkok", "TH"),
    ("malaysian", "MY"), ("kuala lumpur", "MY"),
    ("singaporean", "SG"),
    ("indonesian", "ID"), ("jakarta", "ID"),
    ("filipino", "PH"), ("manila", "PH"),
    ("burmese", "MM"), ("yangon", "MM"), ("burma", "MM"),
    ("cambodian", "KH"), ("phnom penh", "KH"),
    ("mongolian", "MN"), ("ulaanbaatar", "MN"),
    ("kazakh", "KZ"), ("astana", "KZ"), ("almaty", "KZ"),
    ("uzbek", "UZ"), ("tashkent", "UZ"),
    // Oceania
    ("australian", "AU"), ("australians", "AU"), ("canberra", "AU"), ("sydney", "AU"),
    ("melbourne", "AU"), ("new south wales", "AU"), ("queensland", "AU"),
    ("new zealander", "NZ"), ("kiwi", "NZ"), ("wellington", "NZ"), ("auckland", "NZ"),
    ("fijian", "FJ"), ("suva", "FJ"),
    // Americas
    ("canadian", "CA"), ("canadians", "CA"), ("ottawa", "CA"), ("toronto", "CA"),
    ("vancouver", "CA"), ("montreal", "CA"), ("quebec", "CA"),
    ("mexican", "MX"), ("mexicans", "MX"), ("mexico city", "MX"),
    ("guatemalan", "GT"),
    ("honduran", "HN"), ("tegucigalpa", "HN"),
    ("salvadoran", "SV"), ("san salvador", "SV"),
    ("nicaraguan", "NI"), ("managua", "NI"),
    ("costa rican", "CR"),
    ("panamanian", "PA"),
    ("cuban", "CU"), ("havana", "CU"),
    ("haitian", "HT"), ("port au prince", "HT"),
    ("dominican", "DO"), ("santo domingo", "DO"),
    ("jamaican", "JM"), ("kingston", "JM"),
    ("puerto rican", "PR"), ("san juan", "PR"),
    ("colombian", "CO"), ("bogota", "CO"), ("medellin", "CO"),
    ("venezuelan", "VE"), ("caracas", "VE"),
    ("ecuadorian", "EC"), ("quito", "EC"),
    ("peruvian", "PE"), ("lima", "PE"),
    ("bolivian", "BO"), ("la paz", "BO"),
    ("brazilian", "BR"), ("brazilians", "BR"), ("brasilia", "BR"), ("sao paulo", "BR"),
    ("rio de janeiro", "BR"),
    ("chilean", "CL"), ("santiago", "CL"),
    ("argentine", "AR"), ("argentinian", "AR"), ("buenos aires", "AR"),
    ("uruguayan", "UY"), ("montevideo", "UY"),
    ("paraguayan", "PY"), ("asuncion", "PY"),
    // Africa
    ("egyptian", "EG"), ("cairo", "EG"),
    ("libyan", "LY"), ("tripoli", "LY"),
    ("tunisian", "TN"), ("tunis", "TN"),
    ("algerian", "DZ"), ("algiers", "DZ"),
    ("moroccan", "MA"), ("rabat", "MA"), ("casablanca", "MA"),
    ("sudanese", "SD"), ("khartoum", "SD"),
    ("south sudanese", "SS"), ("juba", "SS"),
    ("ethiopian", "ET"), ("addis ababa", "ET"),
    ("eritrean", "ER"), ("asmara", "ER"),
    ("somali", "SO"), ("mogadishu", "SO"),
    ("kenyan", "KE"), ("nairobi", "KE"),
    ("ugandan", "UG"), ("kampala", "UG"),
    ("tanzanian", "TZ"), ("dodoma", "TZ"), ("dar es salaam", "TZ"),
    ("rwandan", "RW"), ("kigali", "RW"),
    ("congolese", "CD"), ("kinshasa", "CD"), ("drc", "CD"),
    ("nigerian", "NG"), ("nigerians", "NG"), ("abuja", "NG"), ("lagos", "NG"),
    ("ghanaian", "GH"), ("accra", "GH"),
    ("senegalese", "SN"), ("dakar", "SN"),
    ("malian", "ML"), ("bamako", "ML"),
    ("nigerien", "NE"), ("niamey", "NE"),
    ("cameroonian", "CM"), ("yaounde", "CM"),
    ("angolan", "AO"), ("luanda", "AO"),
    ("zambian", "ZM"), ("lusaka", "ZM"),
    ("zimbabwean", "ZW"), ("harare", "ZW"),
    ("mozambican", "MZ"), ("maputo", "MZ"),
    ("south african", "ZA"), ("south africans", "ZA"), ("pretoria", "ZA"),
    ("johannesburg", "ZA"), ("cape town", "ZA"),
    ("namibian", "NA"), ("windhoek", "NA"),
    ("botswanan", "BW"), ("gaborone", "BW"),
    ("malagasy", "MG"), ("antananarivo", "MG"),
];

/// Phrases recognized without attributing a country: regions and
/// supranational bodies that would otherwise feed a contained country alias.
#[rustfmt::skip]
const NO_COUNTRY: &[&str] = &[
    "europe", "european union", "eurozone", "united nations", "nato", "african union",
    "africa", "asia", "middle east", "latin america", "latin american", "south america",
    "south american", "north america", "north american", "central america",
    "southeast asia", "south asia", "east asia", "central asia", "west africa",
    "east africa", "sub saharan africa", "indian ocean", "south china sea",
    "gulf of mexico", "english channel", "persian gulf", "arabian peninsula",
];

/// One alias row: lowercase phrase and its target (None = region/body).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasEntry {
    pub phrase: String,
    pub code: Option<String>,
}

/// Build the built-in table: registry names, curated aliases, region phrases.
///
/// Returned unsorted; the resolver orders it by phrase length.
pub fn builtin() -> Vec<AliasEntry> {
    let mut map: HashMap<String, Option<String>> = HashMap::new();

    for r in registry::all() {
        // Official names with commas/parentheses are lookup-only.
        if !r.name.contains([',', '(']) {
            map.insert(r.name.to_lowercase(), Some(r.alpha2.to_string()));
        }
        if let Some(common) = r.common_name {
            map.insert(common.to_lowercase(), Some(r.alpha2.to_string()));
        }
    }
    for &(phrase, code) in CURATED {
        map.insert(phrase.to_string(), Some(code.to_string()));
    }
    for &phrase in NO_COUNTRY {
        map.insert(phrase.to_string(), None);
    }

    map.into_iter()
        .map(|(phrase, code)| AliasEntry { phrase, code })
        .collect()
}

#[derive(Debug, Default, Deserialize)]
struct AliasFile {
    #[serde(default)]
    aliases: HashMap<String, Option<String>>,
}

/// Parse an alias overlay from JSON.
///
/// Entries whose target is not a valid ISO alpha-2 code are dropped with a warning.
pub fn parse_overlay(json: &str) -> Result<Vec<AliasEntry>> {
    let file: AliasFile = serde_json::from_str(json).context("parsing alias overlay json")?;
    let mut out = Vec::with_capacity(file.aliases.len());
    for (phrase, code) in file.aliases {
        let phrase = phrase.trim().to_lowercase();
        if phrase.is_empty() {
            continue;
        }
        let code = match code {
            Some(c) if registry::is_valid_alpha2(&c) => Some(c.trim().to_ascii_uppercase()),
            Some(c) => {
                tracing::warn!(target: "geo", %phrase, code = %c, "ignoring alias with unknown country code");
                continue;
            }
            None => None,
        };
        out.push(AliasEntry { phrase, code });
    }
    Ok(out)
}

/// Load an alias overlay file.
pub fn load_overlay(path: &Path) -> Result<Vec<AliasEntry>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading alias overlay from {}", path.display()))?;
    parse_overlay(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_contains_names_demonyms_and_regions() {
        let table = builtin();
        let find = |p: &str| table.iter().find(|e| e.phrase == p).cloned();

        assert_eq!(find("germany").and_then(|e| e.code), Some("DE".into()));
        assert_eq!(find("german").and_then(|e| e.code), Some("DE".into()));
        assert_eq!(find("south africa").and_then(|e| e.code), Some("ZA".into()));
        assert_eq!(find("russia").and_then(|e| e.code), Some("RU".into()));
        assert_eq!(find("europe").map(|e| e.code), Some(None));
        // Official names with commas are not text aliases.
        assert!(find("korea, republic of").is_none());
    }

    #[test]
    fn overlay_drops_invalid_codes_and_keeps_regions() {
        let json = r#"{ "aliases": { " Kyiv Oblast ": "ua", "balkans": null, "atlantis": "XX" } }"#;
        let mut out = parse_overlay(json).unwrap();
        out.sort_by(|a, b| a.phrase.cmp(&b.phrase));
        assert_eq!(
            out,
            vec![
                AliasEntry { phrase: "balkans".into(), code: None },
                AliasEntry { phrase: "kyiv oblast".into(), code: Some("UA".into()) },
            ]
        );
    }

    #[test]
    fn overlay_rejects_malformed_json() {
        assert!(parse_overlay("not json").is_err());
    }
}

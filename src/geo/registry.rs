//! ISO 3166-1 registry: alpha-2 / alpha-3 codes, official and common names.
//!
//! Backs hint validation, display names and the plain country-name lookup
//! (`lookup_country_code`), which falls back to a fuzzy registry search.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use strsim::jaro_winkler;

/// One registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountryRecord {
    pub alpha2: &'static str,
    pub alpha3: &'static str,
    pub name: &'static str,
    pub common_name: Option<&'static str>,
}

/// Minimum Jaro-Winkler similarity for the last-resort fuzzy match.
const FUZZY_MIN_SIMILARITY: f64 = 0.88;

#[rustfmt::skip]
const COUNTRIES: &[(&str, &str, &str, Option<&str>)] = &[
    ("AD", "AND", "Andorra", None),
    ("AE", "ARE", "United Arab Emirates", None),
    ("AF", "AFG", "Afghanistan", None),
    ("AG", "ATG", "Antigua and Barbuda", None),
    ("AI", "AIA", "Anguilla", None),
    ("AL", "ALB", "Albania", None),
    ("AM", "ARM", "Armenia", None),
    ("AO", "AGO", "Angola", None),
    ("AQ", "ATA", "Antarctica", None),
    ("AR", "ARG", "Argentina", None),
    ("AS", "ASM", "American Samoa", None),
    ("AT", "AUT", "Austria", None),
    ("AU", "AUS", "Australia", None),
    ("AW", "ABW", "Aruba", None),
    ("AX", "ALA", "Åland Islands", None),
    ("AZ", "AZE", "Azerbaijan", None),
    ("BA", "BIH", "Bosnia and Herzegovina", None),
    ("BB", "BRB", "Barbados", None),
    ("BD", "BGD", "Bangladesh", None),
    ("BE", "BEL", "Belgium", None),
    ("BF", "BFA", "Burkina Faso", None),
    ("BG", "BGR", "Bulgaria", None),
    ("BH", "BHR", "Bahrain", None),
    ("BI", "BDI", "Burundi", None),
    ("BJ", "BEN", "Benin", None),
    ("BL", "BLM", "Saint Barthélemy", None),
    ("BM", "BMU", "Bermuda", None),
    ("BN", "BRN", "Brunei Darussalam", Some("Brunei")),
    ("BO", "BOL", "Bolivia, Plurinational State of", Some("Bolivia")),
    ("BQ", "BES", "Bonaire, Sint Eustatius and Saba", None),
    ("BR", "BRA", "Brazil", None),
    ("BS", "BHS", "Bahamas", None),
    ("BT", "BTN", "Bhutan", None),
    ("BV", "BVT", "Bouvet Island", None),
    ("BW", "BWA", "Botswana", None),
    ("BY", "BLR", "Belarus", None),
    ("BZ", "BLZ", "Belize", None),
    ("CA", "CAN", "Canada", None),
    ("CC", "CCK", "Cocos (Keeling) Islands", None),
    ("CD", "COD", "Congo, The Democratic Republic of the", Some("DR Congo")),
    ("CF", "CAF", "Central African Republic", None),
    ("CG", "COG", "Congo", None),
    ("CH", "CHE", "Switzerland", None),
    ("CI", "CIV", "Côte d'Ivoire", Some("Ivory Coast")),
    ("CK", "COK", "Cook Islands", None),
    ("CL", "CHL", "Chile", None),
    ("CM", "CMR", "Cameroon", None),
    ("CN", "CHN", "China", None),
    ("CO", "COL", "Colombia", None),
    ("CR", "CRI", "Costa Rica", None),
    ("CU", "CUB", "Cuba", None),
    ("CV", "CPV", "Cabo Verde", Some("Cape Verde")),
    ("CW", "CUW", "Curaçao", None),
    ("CX", "CXR", "Christmas Island", None),
    ("CY", "CYP", "Cyprus", None),
    ("CZ", "CZE", "Czechia", Some("Czech Republic")),
    ("DE", "DEU", "Germany", None),
    ("DJ", "DJI", "Djibouti", None),
    ("DK", "DNK", "Denmark", None),
    ("DM", "DMA", "Dominica", None),
    ("DO", "DOM", "Dominican Republic", None),
    ("DZ", "DZA", "Algeria", None),
    ("EC", "ECU", "Ecuador", None),
    ("EE", "EST", "Estonia", None),
    ("EG", "EGY", "Egypt", None),
    ("EH", "ESH", "Western Sahara", None),
    ("ER", "ERI", "Eritrea", None),
    ("ES", "ESP", "Spain", None),
    ("ET", "ETH", "Ethiopia", None),
    ("FI", "FIN", "Finland", None),
    ("FJ", "FJI", "Fiji", None),
    ("FK", "FLK", "Falkland Islands (Malvinas)", Some("Falkland Islands")),
    ("FM", "FSM", "Micronesia, Federated States of", Some("Micronesia")),
    ("FO", "FRO", "Faroe Islands", None),
    ("FR", "FRA", "France", None),
    ("GA", "GAB", "Gabon", None),
    ("GB", "GBR", "United Kingdom", None),
    ("GD", "GRD", "Grenada", None),
    ("GE", "GEO", "Georgia", None),
    ("GF", "GUF", "French Guiana", None),
    ("GG", "GGY", "Guernsey", None),
    ("GH", "GHA", "Ghana", None),
    ("GI", "GIB", "Gibraltar", None),
    ("GL", "GRL", "Greenland", None),
    ("GM", "GMB", "Gambia", None),
    ("GN", "GIN", "Guinea", None),
    ("GP", "GLP", "Guadeloupe", None),
    ("GQ", "GNQ", "Equatorial Guinea", None),
    ("GR", "GRC", "Greece", None),
    ("GS", "SGS", "South Georgia and the South Sandwich Islands", None),
    ("GT", "GTM", "Guatemala", None),
    ("GU", "GUM", "Guam", None),
    ("GW", "GNB", "Guinea-Bissau", None),
    ("GY", "GUY", "Guyana", None),
    ("HK", "HKG", "Hong Kong", None),
    ("HM", "HMD", "Heard Island and McDonald Islands", None),
    ("HN", "HND", "Honduras", None),
    ("HR", "HRV", "Croatia", None),
    ("HT", "HTI", "Haiti", None),
    ("HU", "HUN", "Hungary", None),
    ("ID", "IDN", "Indonesia", None),
    ("IE", "IRL", "Ireland", None),
    ("IL", "ISR", "Israel", None),
    ("IM", "IMN", "Isle of Man", None),
    ("IN", "IND", "India", None),
    ("IO", "IOT", "British Indian Ocean Territory", None),
    ("IQ", "IRQ", "Iraq", None),
    ("IR", "IRN", "Iran, Islamic Republic of", Some("Iran")),
    ("IS", "ISL", "Iceland", None),
    ("IT", "ITA", "Italy", None),
    ("JE", "JEY", "Jersey", None),
    ("JM", "JAM", "Jamaica", None),
    ("JO", "JOR", "Jordan", None),
    ("JP", "JPN", "Japan", None),
    ("KE", "KEN", "Kenya", None),
    ("KG", "KGZ", "Kyrgyzstan", None),
    ("KH", "KHM", "Cambodia", None),
    ("KI", "KIR", "Kiribati", None),
    ("KM", "COM", "Comoros", None),
    ("KN", "KNA", "Saint Kitts and Nevis", None),
    ("KP", "PRK", "Korea, Democratic People's Republic of", Some("North Korea")),
    ("KR", "KOR", "Korea, Republic of", Some("South Korea")),
    ("KW", "KWT", "Kuwait", None),
    ("KY", "CYM", "Cayman Islands", None),
    ("KZ", "KAZ", "Kazakhstan", None),
    ("LA", "LAO", "Lao People's Democratic Republic", Some("Laos")),
    ("LB", "LBN", "Lebanon", None),
    ("LC", "LCA", "Saint Lucia", None),
    ("LI", "LIE", "Liechtenstein", None),
    ("LK", "LKA", "Sri Lanka", None),
    ("LR", "LBR", "Liberia", None),
    ("LS", "LSO", "Lesotho", None),
    ("LT", "LTU", "Lithuania", None),
    ("LU", "LUX", "Luxembourg", None),
    ("LV", "LVA", "Latvia", None),
    ("LY", "LBY", "Libya", None),
    ("MA", "MAR", "Morocco", None),
    ("MC", "MCO", "Monaco", None),
    ("MD", "MDA", "Moldova, Republic of", Some("Moldova")),
    ("ME", "MNE", "Montenegro", None),
    ("MF", "MAF", "Saint Martin (French part)", None),
    ("MG", "MDG", "Madagascar", None),
    ("MH", "MHL", "Marshall Islands", None),
    ("MK", "MKD", "North Macedonia", None),
    ("ML", "MLI", "Mali", None),
    ("MM", "MMR", "Myanmar", None),
    ("MN", "MNG", "Mongolia", None),
    ("MO", "MAC", "Macao", Some("Macau")),
    ("MP", "MNP", "Northern Mariana Islands", None),
    ("MQ", "MTQ", "Martinique", None),
    ("MR", "MRT", "Mauritania", None),
    ("MS", "MSR", "Montserrat", None),
    ("MT", "MLT", "Malta", None),
    ("MU", "MUS", "Mauritius", None),
    ("MV", "MDV", "Maldives", None),
    ("MW", "MWI", "Malawi", None),
    ("MX", "MEX", "Mexico", None),
    ("MY", "MYS", "Malaysia", None),
    ("MZ", "MOZ", "Mozambique", None),
    ("NA", "NAM", "Namibia", None),
    ("NC", "NCL", "New Caledonia", None),
    ("NE", "NER", "Niger", None),
    ("NF", "NFK", "Norfolk Island", None),
    ("NG", "NGA", "Nigeria", None),
    ("NI", "NIC", "Nicaragua", None),
    ("NL", "NLD", "Netherlands", None),
    ("NO", "NOR", "Norway", None),
    ("NP", "NPL", "Nepal", None),
    ("NR", "NRU", "Nauru", None),
    ("NU", "NIU", "Niue", None),
    ("NZ", "NZL", "New Zealand", None),
    ("OM", "OMN", "Oman", None),
    ("PA", "PAN", "Panama", None),
    ("PE", "PER", "Peru", None),
    ("PF", "PYF", "French Polynesia", None),
    ("PG", "PNG", "Papua New Guinea", None),
    ("PH", "PHL", "Philippines", None),
    ("PK", "PAK", "Pakistan", None),
    ("PL", "POL", "Poland", None),
    ("PM", "SPM", "Saint Pierre and Miquelon", None),
    ("PN", "PCN", "Pitcairn", None),
    ("PR", "PRI", "Puerto Rico", None),
    ("PS", "PSE", "Palestine, State of", Some("Palestine")),
    ("PT", "PRT", "Portugal", None),
    ("PW", "PLW", "Palau", None),
    ("PY", "PRY", "Paraguay", None),
    ("QA", "QAT", "Qatar", None),
    ("RE", "REU", "Réunion", None),
    ("RO", "ROU", "Romania", None),
    ("RS", "SRB", "Serbia", None),
    ("RU", "RUS", "Russian Federation", Some("Russia")),
    ("RW", "RWA", "Rwanda", None),
    ("SA", "SAU", "Saudi Arabia", None),
    ("SB", "SLB", "Solomon Islands", None),
    ("SC", "SYC", "Seychelles", None),
    ("SD", "SDN", "Sudan", None),
    ("SE", "SWE", "Sweden", None),
    ("SG", "SGP", "Singapore", None),
    ("SH", "SHN", "Saint Helena, Ascension and Tristan da Cunha", None),
    ("SI", "SVN", "Slovenia", None),
    ("SJ", "SJM", "Svalbard and Jan Mayen", None),
    ("SK", "SVK", "Slovakia", None),
    ("SL", "SLE", "Sierra Leone", None),
    ("SM", "SMR", "San Marino", None),
    ("SN", "SEN", "Senegal", None),
    ("SO", "SOM", "Somalia", None),
    ("SR", "SUR", "Suriname", None),
    ("SS", "SSD", "South Sudan", None),
    ("ST", "STP", "Sao Tome and Principe", None),
    ("SV", "SLV", "El Salvador", None),
    ("SX", "SXM", "Sint Maarten (Dutch part)", None),
    ("SY", "SYR", "Syrian Arab Republic", Some("Syria")),
    ("SZ", "SWZ", "Eswatini", None),
    ("TC", "TCA", "Turks and Caicos Islands", None),
    ("TD", "TCD", "Chad", None),
    ("TF", "ATF", "French Southern Territories", None),
    ("TG", "TGO", "Togo", None),
    ("TH", "THA", "Thailand", None),
    ("TJ", "TJK", "Tajikistan", None),
    ("TK", "TKL", "Tokelau", None),
    ("TL", "TLS", "Timor-Leste", Some("East Timor")),
    ("TM", "TKM", "Turkmenistan", None),
    ("TN", "TUN", "Tunisia", None),
    ("TO", "TON", "Tonga", None),
    ("TR", "TUR", "Türkiye", Some("Turkey")),
    ("TT", "TTO", "Trinidad and Tobago", None),
    ("TV", "TUV", "Tuvalu", None),
    ("TW", "TWN", "Taiwan, Province of China", Some("Taiwan")),
    ("TZ", "TZA", "Tanzania, United Republic of", Some("Tanzania")),
    ("UA", "UKR", "Ukraine", None),
    ("UG", "UGA", "Uganda", None),
    ("UM", "UMI", "United States Minor Outlying Islands", None),
    ("US", "USA", "United States", None),
    ("UY", "URY", "Uruguay", None),
    ("UZ", "UZB", "Uzbekistan", None),
    ("VA", "VAT", "Holy See (Vatican City State)", Some("Vatican")),
    ("VC", "VCT", "Saint Vincent and the Grenadines", None),
    ("VE", "VEN", "Venezuela, Bolivarian Republic of", Some("Venezuela")),
    ("VG", "VGB", "Virgin Islands, British", None),
    ("VI", "VIR", "Virgin Islands, U.S.", None),
    ("VN", "VNM", "Viet Nam", Some("Vietnam")),
    ("VU", "VUT", "Vanuatu", None),
    ("WF", "WLF", "Wallis and Futuna", None),
    ("WS", "WSM", "Samoa", None),
    ("YE", "YEM", "Yemen", None),
    ("YT", "MYT", "Mayotte", None),
    ("ZA", "ZAF", "South Africa", None),
    ("ZM", "ZMB", "Zambia", None),
    ("ZW", "ZWE", "Zimbabwe", None),
];

static RECORDS: Lazy<Vec<CountryRecord>> = Lazy::new(|| {
    COUNTRIES
        .iter()
        .map(|&(alpha2, alpha3, name, common_name)| CountryRecord {
            alpha2,
            alpha3,
            name,
            common_name,
        })
        .collect()
});

static BY_ALPHA2: Lazy<HashMap<&'static str, usize>> =
    Lazy::new(|| RECORDS.iter().enumerate().map(|(i, r)| (r.alpha2, i)).collect());

/// Every record, in alpha-2 order.
pub fn all() -> &'static [CountryRecord] {
    &RECORDS
}

/// Look up a record by alpha-2 code (case-insensitive).
pub fn by_alpha2(code: &str) -> Option<&'static CountryRecord> {
    let code = code.trim().to_ascii_uppercase();
    BY_ALPHA2.get(code.as_str()).map(|&i| &RECORDS[i])
}

/// Whether `code` is an assigned ISO 3166-1 alpha-2 code.
pub fn is_valid_alpha2(code: &str) -> bool {
    let code = code.trim();
    code.len() == 2 && code.chars().all(|c| c.is_ascii_alphabetic()) && by_alpha2(code).is_some()
}

/// Display name for a code: the common name when one exists, the official
/// name otherwise. Unknown codes come back upper-cased, empty input as "Unknown".
pub fn country_name(code: &str) -> String {
    let code = code.trim();
    if code.is_empty() {
        return "Unknown".to_string();
    }
    match by_alpha2(code) {
        Some(r) => r.common_name.unwrap_or(r.name).to_string(),
        None => code.to_ascii_uppercase(),
    }
}

/// Normalize a country name for lookup: lowercase letters and single spaces only.
pub(crate) fn normalize_name(name: &str) -> String {
    let kept: String = name
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphabetic() { c } else { ' ' })
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Exact registry lookup: alpha-2, alpha-3, official name, common name.
pub fn lookup(name: &str) -> Option<&'static CountryRecord> {
    let raw = name.trim();
    if raw.is_empty() {
        return None;
    }
    if raw.len() == 2 {
        if let Some(r) = by_alpha2(raw) {
            return Some(r);
        }
    }
    if raw.len() == 3 {
        let up = raw.to_ascii_uppercase();
        if let Some(r) = RECORDS.iter().find(|r| r.alpha3 == up) {
            return Some(r);
        }
    }
    let norm = normalize_name(raw);
    RECORDS.iter().find(|r| {
        normalize_name(r.name) == norm || r.common_name.is_some_and(|c| normalize_name(c) == norm)
    })
}

/// Fuzzy registry search, used as the last resort for plain name strings.
///
/// 1. A record whose normalized name contains the query as a whole word run.
/// 2. Highest Jaro-Winkler similarity above [`FUZZY_MIN_SIMILARITY`].
pub fn search_fuzzy(name: &str) -> Option<&'static CountryRecord> {
    let norm = normalize_name(name);
    if norm.len() < 3 {
        return None;
    }

    let padded = format!(" {norm} ");
    let contains = RECORDS.iter().find(|r| {
        std::iter::once(r.name)
            .chain(r.common_name)
            .any(|n| format!(" {} ", normalize_name(n)).contains(&padded))
    });
    if contains.is_some() {
        return contains;
    }

    let mut best: Option<(&CountryRecord, f64)> = None;
    for r in RECORDS.iter() {
        for candidate in std::iter::once(r.name).chain(r.common_name) {
            let sim = jaro_winkler(&norm, &normalize_name(candidate));
            let better = match best {
                Some((_, b)) => sim > b,
                None => true,
            };
            if sim >= FUZZY_MIN_SIMILARITY && better {
                best = Some((r, sim));
            }
        }
    }
    best.map(|(r, _)| r)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alpha2_lookup_is_case_insensitive() {
        assert_eq!(by_alpha2("de").map(|r| r.alpha3), Some("DEU"));
        assert!(is_valid_alpha2("fr"));
        assert!(!is_valid_alpha2("XX"));
        assert!(!is_valid_alpha2("FRA"));
        assert!(!is_valid_alpha2("1a"));
    }

    #[test]
    fn country_name_prefers_common_name() {
        assert_eq!(country_name("KR"), "South Korea");
        assert_eq!(country_name("DE"), "Germany");
        assert_eq!(country_name("zz"), "ZZ");
        assert_eq!(country_name(""), "Unknown");
    }

    #[test]
    fn registry_lookup_by_code_and_names() {
        assert_eq!(lookup("GBR").map(|r| r.alpha2), Some("GB"));
        assert_eq!(lookup("Russian Federation").map(|r| r.alpha2), Some("RU"));
        assert_eq!(lookup("russia").map(|r| r.alpha2), Some("RU"));
        assert_eq!(lookup("Viet Nam").map(|r| r.alpha2), Some("VN"));
        assert!(lookup("Atlantis").is_none());
    }

    #[test]
    fn fuzzy_search_handles_partial_and_misspelled_names() {
        assert_eq!(search_fuzzy("Bolivia").map(|r| r.alpha2), Some("BO"));
        assert_eq!(search_fuzzy("Argentinia").map(|r| r.alpha2), Some("AR"));
        assert!(search_fuzzy("qq").is_none());
    }

    #[test]
    fn registry_codes_are_unique() {
        let mut codes: Vec<_> = all().iter().map(|r| r.alpha2).collect();
        let n = codes.len();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), n);
    }
}

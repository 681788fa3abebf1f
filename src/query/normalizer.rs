//! Bare-query expansion.

use super::gazetteer::{is_known_place, DOMAIN_KEYWORDS, PROVINCE_PREFIX};

const SUFFIX_TH: &str = " สถานที่ท่องเที่ยว";
const SUFFIX_EN: &str = " tourist attractions";

/// Expand a query that is just a place name with a tourism qualifier.
///
/// Pure and deterministic: the output feeds cache-key derivation, so
/// equivalent surface forms must normalize identically. A query that
/// already contains tourism context is returned unchanged, which also
/// makes the function idempotent.
///
/// `lang` selects the suffix: `"en"` appends an English qualifier, anything
/// else (including empty) appends the Thai one.
pub fn expand_query(query: &str, lang: &str) -> String {
    if query.is_empty() {
        return query.to_string();
    }

    let suffix = if lang == "en" { SUFFIX_EN } else { SUFFIX_TH };
    let normalized = query.trim().to_lowercase();

    // Already has tourism context, no expansion needed.
    if DOMAIN_KEYWORDS.iter().any(|kw| normalized.contains(kw)) {
        return query.to_string();
    }

    let words: Vec<&str> = normalized.split_whitespace().collect();

    // Short queries: whole string, each word, or the space-stripped form
    // (Thai place names are often typed with stray spaces).
    if words.len() <= 2 {
        if is_known_place(&normalized)
            || words.iter().any(|w| is_known_place(w))
            || is_known_place(&normalized.replace(' ', ""))
        {
            return format!("{query}{suffix}");
        }
    }

    // "จังหวัด<name>": the locative prefix alone marks the query as a bare
    // place reference, whatever follows it.
    if let Some(rest) = normalized.strip_prefix(PROVINCE_PREFIX) {
        if !rest.trim().is_empty() {
            return format!("{query}{suffix}");
        }
    }

    query.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_province_thai_suffix() {
        assert_eq!(expand_query("เชียงใหม่", "th"), "เชียงใหม่ สถานที่ท่องเที่ยว");
        assert_eq!(expand_query("สกลนคร", ""), "สกลนคร สถานที่ท่องเที่ยว");
    }

    #[test]
    fn test_bare_province_english_suffix() {
        assert_eq!(expand_query("phuket", "en"), "phuket tourist attractions");
        assert_eq!(expand_query("Bangkok", "en"), "Bangkok tourist attractions");
    }

    #[test]
    fn test_qualified_query_unchanged() {
        assert_eq!(expand_query("เชียงใหม่ น้ำตก", "th"), "เชียงใหม่ น้ำตก");
        assert_eq!(expand_query("phuket beach resort", "en"), "phuket beach resort");
    }

    #[test]
    fn test_idempotent() {
        let once = expand_query("เชียงใหม่", "th");
        assert_eq!(expand_query(&once, "th"), once);
        let once_en = expand_query("krabi", "en");
        assert_eq!(expand_query(&once_en, "en"), once_en);
    }

    #[test]
    fn test_space_stripped_match() {
        assert_eq!(
            expand_query("chiang mai", "en"),
            "chiang mai tourist attractions"
        );
    }

    #[test]
    fn test_province_prefix() {
        assert_eq!(
            expand_query("จังหวัดน่าน", "th"),
            "จังหวัดน่าน สถานที่ท่องเที่ยว"
        );
    }

    #[test]
    fn test_unknown_query_unchanged() {
        assert_eq!(expand_query("ราคาน้ำมันวันนี้", "th"), "ราคาน้ำมันวันนี้");
        assert_eq!(expand_query("", "th"), "");
    }

    #[test]
    fn test_long_query_unchanged() {
        // More than two words never triggers the gazetteer rules.
        assert_eq!(
            expand_query("best time to fly", "en"),
            "best time to fly"
        );
    }
}

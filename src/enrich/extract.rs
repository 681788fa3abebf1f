//! Tolerant extraction of JSON from free-form model output.
//!
//! Generative providers are asked for JSON but routinely wrap it in prose
//! ("Here is the information you requested: {...}"). The contract is:
//! strict decode first, then extraction of the outermost balanced braced
//! region, and `None` when neither yields the expected shape: the caller
//! decides whether that is a total or a partial failure.

use serde::de::DeserializeOwned;

/// Decode `T` from model output, tolerating surrounding prose.
pub fn tolerant_parse<T: DeserializeOwned>(text: &str) -> Option<T> {
    if let Ok(value) = serde_json::from_str(text) {
        return Some(value);
    }
    balanced_region(text).and_then(|region| serde_json::from_str(region).ok())
}

/// The outermost balanced `{...}` region starting at the first opening
/// brace, or `None` if braces never balance. Braces inside JSON string
/// literals are ignored.
pub fn balanced_region(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, byte) in text.as_bytes()[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if *byte == b'\\' {
                escaped = true;
            } else if *byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

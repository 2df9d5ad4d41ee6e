//! Text helpers.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Fold diacritics to plain ASCII.
///
/// Returns `None` when the input is empty or carries no combining marks, so callers
/// can tell "nothing to convert" from a converted string.
pub fn convert_diacritics(input: &str) -> Option<String> {
    if input.is_empty() {
        return None;
    }

    if !input.nfd().any(is_combining_mark) {
        return None;
    }

    Some(input.nfkd().filter(char::is_ascii).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_diacritics() {
        assert_eq!(convert_diacritics("Müller"), Some("Muller".to_string()));
        assert_eq!(
            convert_diacritics("José Ñúñez"),
            Some("Jose Nunez".to_string())
        );
    }

    #[test]
    fn test_no_diacritics() {
        assert_eq!(convert_diacritics(""), None);
        assert_eq!(convert_diacritics("Smith"), None);
        // No combining marks after decomposition, so nothing to fold
        assert_eq!(convert_diacritics("Łukasz"), None);
    }
}

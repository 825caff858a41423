//! Word and punctuation segmentation.
//!
//! Text is normalized (full Unicode lowercase, outer whitespace trimmed) and
//! then scanned one `char` at a time:
//!
//! - the ASCII space `' '` ends the current word and is dropped
//! - a character from [`PUNCTUATION`] ends the current word and is emitted
//!   as its own single-character token
//! - everything else, including tabs, newlines and non-ASCII punctuation,
//!   is part of a word
//!
//! # Example
//!
//! ```
//! use alphapack::core::segment;
//!
//! assert_eq!(segment("Hello, World!"), vec!["hello", ",", "world", "!"]);
//! ```

/// ASCII punctuation and symbols that split words and stand as their own tokens.
pub const PUNCTUATION: &str = ".,!?;:@#$%&*+-=/()[]{}\"\\'`~<>|^";

/// Returns true if `c` is one of the single-character delimiters in [`PUNCTUATION`].
#[inline]
pub fn is_delimiter(c: char) -> bool {
    c.is_ascii() && PUNCTUATION.contains(c)
}

/// Lowercase `text` and strip leading and trailing whitespace.
pub fn normalize(text: &str) -> String {
    text.to_lowercase().trim().to_string()
}

/// Split `text` into word and punctuation tokens.
///
/// Never yields empty tokens; an empty or all-space input yields an empty vector.
pub fn segment(text: &str) -> Vec<String> {
    let normalized = normalize(text);
    let mut tokens = Vec::new();
    let mut current = String::new();

    for c in normalized.chars() {
        if c == ' ' {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
        } else if is_delimiter(c) {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            tokens.push(c.to_string());
        } else {
            current.push(c);
        }
    }

    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_words_and_punctuation() {
        assert_eq!(segment("Hello, World!"), vec!["hello", ",", "world", "!"]);
    }

    #[test]
    fn test_segment_empty() {
        assert!(segment("").is_empty());
        assert!(segment("    ").is_empty());
    }

    #[test]
    fn test_no_empty_tokens() {
        let tokens = segment("  a  ,,  b!?  ");
        assert_eq!(tokens, vec!["a", ",", ",", "b", "!", "?"]);
        assert!(tokens.iter().all(|t| !t.is_empty()));
    }

    #[test]
    fn test_only_ascii_space_splits() {
        // Tabs and newlines inside the text are word characters.
        assert_eq!(segment("a\tb c\nd"), vec!["a\tb", "c\nd"]);
        // Outer whitespace of any kind is trimmed.
        assert_eq!(segment("\n\tword\t\n"), vec!["word"]);
    }

    #[test]
    fn test_every_delimiter_is_its_own_token() {
        for c in PUNCTUATION.chars() {
            let text = format!("x{}y", c);
            assert_eq!(
                segment(&text),
                vec!["x".to_string(), c.to_string(), "y".to_string()],
                "delimiter {:?}",
                c
            );
        }
    }

    #[test]
    fn test_unicode_is_word_material() {
        // Non-ASCII punctuation is not a delimiter.
        assert_eq!(segment("Merhaba¡ dünya…"), vec!["merhaba¡", "dünya…"]);
        assert_eq!(segment("ЗДРАВЕЙ, СВЯТ"), vec!["здравей", ",", "свят"]);
    }

    #[test]
    fn test_special_token_strings_are_split() {
        assert_eq!(segment("<PAD>"), vec!["<", "pad", ">"]);
    }

    #[test]
    fn test_is_delimiter() {
        assert!(is_delimiter('.'));
        assert!(is_delimiter('\\'));
        assert!(is_delimiter('^'));
        assert!(!is_delimiter('_'));
        assert!(!is_delimiter(' '));
        assert!(!is_delimiter('،'));
    }
}

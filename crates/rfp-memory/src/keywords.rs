//! Keyword and tag extraction for the memory keyword index (`spec.md` §4.10).

use std::collections::BTreeSet;

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "that", "this", "with", "from", "have", "has", "had", "was", "were",
    "are", "you", "your", "about", "into", "they", "them", "their", "will", "would", "could",
    "should", "been", "being", "what", "when", "where", "which", "who", "whom", "there", "here",
    "then", "than", "but", "not", "can", "all", "any", "our", "out", "over", "also", "just",
];

/// Tokenizes `text` on non-alphanumeric boundaries, lowercases, drops
/// stopwords and tokens shorter than 3 characters, and caps the result to
/// `max_keywords` unique tokens in order of first appearance.
pub fn extract_keywords(text: &str, max_keywords: usize) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for raw in text.split(|c: char| !c.is_alphanumeric()) {
        if raw.len() < 3 {
            continue;
        }
        let token = raw.to_lowercase();
        if STOPWORDS.contains(&token.as_str()) {
            continue;
        }
        if seen.insert(token.clone()) {
            out.push(token);
            if out.len() >= max_keywords {
                break;
            }
        }
    }
    out
}

/// Extracts a small set of free-text tags from `text`: currently the top
/// keywords by frequency, capped at 10.
pub fn extract_tags(text: &str) -> Vec<String> {
    extract_keywords(text, 10)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_stopwords_and_short_tokens() {
        let keywords = extract_keywords("The quick fox and a big dog run", 10);
        assert!(!keywords.contains(&"the".to_string()));
        assert!(!keywords.contains(&"and".to_string()));
        assert!(!keywords.contains(&"a".to_string()));
        assert!(keywords.contains(&"quick".to_string()));
        assert!(keywords.contains(&"dog".to_string()));
    }

    #[test]
    fn caps_to_max_keywords() {
        let keywords = extract_keywords("alpha beta gamma delta epsilon zeta eta theta", 3);
        assert_eq!(keywords.len(), 3);
    }

    #[test]
    fn deduplicates_repeated_tokens() {
        let keywords = extract_keywords("budget budget budget timeline", 10);
        assert_eq!(keywords.iter().filter(|k| *k == "budget").count(), 1);
    }
}

//! Trigram string similarity.
//!
//! Follows the pg_trgm model: text is lowercased and split into words, each
//! word is padded with two leading and one trailing space, and similarity is
//! the Jaccard coefficient over the resulting trigram sets. Scores land in
//! [0, 1] with 1 meaning identical trigram sets.

use std::collections::HashSet;

fn trigrams(text: &str) -> HashSet<String> {
    let lower = text.to_lowercase();
    let mut grams = HashSet::new();
    for word in lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let padded: Vec<char> = format!("  {word} ").chars().collect();
        for window in padded.windows(3) {
            grams.insert(window.iter().collect());
        }
    }
    grams
}

/// Normalized trigram similarity between two strings.
pub fn similarity(a: &str, b: &str) -> f32 {
    let ta = trigrams(a);
    let tb = trigrams(b);
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }
    let shared = ta.intersection(&tb).count();
    let union = ta.len() + tb.len() - shared;
    if union == 0 {
        return 0.0;
    }
    shared as f32 / union as f32
}

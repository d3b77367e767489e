use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Node};

use super::normalize_text;
use crate::report::KeywordStat;

static WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[a-z]{3,}").expect("word regex is hardcoded and valid"));

pub const STOPWORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "your", "with", "have", "this", "that", "was",
    "from", "they", "his", "her", "she", "him", "has", "had", "were", "will", "what", "when",
    "where", "who", "why", "how", "can", "all", "any", "each", "few", "more", "most", "other",
    "some", "such", "no", "nor", "too", "very", "of", "to", "in", "on", "by", "is", "as", "at",
    "it", "or", "be", "we", "an", "a", "our", "us", "if", "out", "up", "so", "do", "did", "does",
    "their", "its", "than", "then",
];

const HIDDEN_TEXT_PARENTS: &[&str] = &["script", "style", "noscript"];

/// Document text with `script`, `style` and `noscript` contents removed.
pub(super) fn visible_text(doc: &Html) -> String {
    let mut chunks = Vec::new();
    for node in doc.tree.root().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| HIDDEN_TEXT_PARENTS.contains(&el.name()))
        });
        if !hidden {
            chunks.push(&**text);
        }
    }
    normalize_text(&chunks.join(" "))
}

/// Top `top_n` words of three or more ASCII letters, stopwords excluded.
///
/// Ranked by count, ties by first occurrence. `percent` is relative to all
/// counted (non-stopword) tokens, rounded to two decimals.
pub fn keyword_density(text: &str, top_n: usize) -> Vec<KeywordStat> {
    let lowered = text.to_lowercase();
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for word in WORD.find_iter(&lowered).map(|m| m.as_str()) {
        if STOPWORDS.contains(&word) {
            continue;
        }
        let count = counts.entry(word).or_insert(0);
        if *count == 0 {
            order.push(word);
        }
        *count += 1;
    }

    let total: usize = counts.values().sum();
    let mut ranked: Vec<(&str, usize)> = order.iter().map(|w| (*w, counts[w])).collect();
    // Stable sort keeps first-occurrence order among equal counts.
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked
        .into_iter()
        .take(top_n)
        .map(|(word, count)| KeywordStat {
            word: word.to_string(),
            count,
            percent: super::percent(count, total.max(1)),
        })
        .collect()
}

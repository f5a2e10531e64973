use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use serde::Serialize;

pub const MIN_TOKEN_LEN: usize = 3;

const STOP_WORDS: &[&str] = &[
    // articles and determiners
    "the", "an", "this", "that", "these", "those", "some", "any", "each", "every", "all",
    "both", "either", "neither", "such", "other", "another", "more", "most", "much", "many",
    "few", "less", "least", "own", "same", "only", "very", "just", "than", "too", "also",
    // pronouns
    "you", "your", "yours", "yourself", "yourselves", "him", "his", "himself", "her", "hers",
    "herself", "its", "itself", "our", "ours", "ourselves", "they", "them", "their", "theirs",
    "themselves", "what", "which", "who", "whom", "whose", "she", "myself", "one", "ones",
    // prepositions
    "about", "above", "across", "after", "against", "along", "among", "around", "before",
    "behind", "below", "beneath", "beside", "between", "beyond", "but", "down", "during",
    "except", "for", "from", "into", "near", "off", "onto", "out", "over", "past", "since",
    "through", "throughout", "till", "toward", "towards", "under", "until", "upon", "with",
    "within", "without", "via", "per",
    // conjunctions and adverbs
    "and", "nor", "yet", "because", "although", "though", "while", "whereas", "whether",
    "unless", "when", "where", "why", "how", "then", "there", "here", "now", "not", "again",
    "further", "once", "however", "therefore", "thus", "else",
    // auxiliary and modal verbs
    "are", "was", "were", "been", "being", "have", "has", "had", "having", "does", "did",
    "doing", "done", "will", "would", "shall", "should", "can", "could", "may", "might",
    "must", "ought", "get", "gets", "got", "let",
];

fn stop_words() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| STOP_WORDS.iter().copied().collect())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedKeyword {
    pub word: String,
    pub count: usize,
}

impl RankedKeyword {
    /// Persisted weight is the raw occurrence count.
    pub fn weight(&self) -> f64 {
        self.count as f64
    }
}

/// Lowercases, splits on non-alphanumeric characters, drops short tokens and
/// stop words, then ranks by count (ties keep first-occurrence order).
pub fn extract_keywords(text: &str, top_n: usize) -> Vec<RankedKeyword> {
    let stop = stop_words();
    // word -> (count, first position)
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();

    let lowered = text.to_lowercase();
    let tokens = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= MIN_TOKEN_LEN)
        .filter(|t| !stop.contains(t));

    for (position, token) in tokens.enumerate() {
        counts
            .entry(token.to_string())
            .and_modify(|(count, _)| *count += 1)
            .or_insert((1, position));
    }

    let mut ranked: Vec<(String, usize, usize)> = counts
        .into_iter()
        .map(|(word, (count, first))| (word, count, first))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

    ranked
        .into_iter()
        .take(top_n)
        .map(|(word, count, _)| RankedKeyword { word, count })
        .collect()
}

/// Seam for swapping the ranking algorithm.
#[cfg_attr(test, mockall::automock)]
pub trait KeywordStrategy: Send + Sync {
    fn extract(&self, text: &str, top_n: usize) -> Vec<RankedKeyword>;
    fn name(&self) -> &'static str;
}

#[derive(Clone, Debug, Default)]
pub struct FrequencyStrategy;

impl KeywordStrategy for FrequencyStrategy {
    fn extract(&self, text: &str, top_n: usize) -> Vec<RankedKeyword> {
        extract_keywords(text, top_n)
    }

    fn name(&self) -> &'static str {
        "frequency"
    }
}

//! Duplicate-content detection
//!
//! Every successful HTML page is indexed by its content hash and a set of
//! three-word shingles. A new page is compared with all indexed pages:
//! identical hashes score 1.0, otherwise the Jaccard similarity of the
//! shingle sets is used. Pairs at or above the threshold get an advisory
//! `duplicate_content` issue on the newer page naming the older one.

use crate::issues::IssueKind;
use crate::state::IssueRecord;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};

/// Words per shingle
const SHINGLE_SIZE: usize = 3;

struct IndexedPage {
    url: String,
    hash: String,
    shingles: HashSet<u64>,
}

/// Index of analyzed page texts
pub struct DuplicateIndex {
    threshold: f64,
    pages: Vec<IndexedPage>,
}

impl DuplicateIndex {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold: threshold.clamp(0.0, 1.0),
            pages: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Re-adds a page known only by its hash (e.g. from a checkpoint)
    ///
    /// Such pages only ever match on identical hashes.
    pub fn insert_hash_only(&mut self, url: &str, hash: &str) {
        self.pages.push(IndexedPage {
            url: url.to_string(),
            hash: hash.to_string(),
            shingles: HashSet::new(),
        });
    }

    /// Compares a page with the index, then adds it
    ///
    /// # Arguments
    ///
    /// * `url` - The page URL
    /// * `hash` - Content hash of the normalized text
    /// * `text` - Normalized visible text
    ///
    /// # Returns
    ///
    /// One `duplicate_content` issue per indexed page that is similar enough
    pub fn check_and_insert(&mut self, url: &str, hash: &str, text: &str) -> Vec<IssueRecord> {
        let shingles = shingle_set(text);
        let mut issues = Vec::new();

        for other in &self.pages {
            if other.url == url {
                continue;
            }
            let similarity = if other.hash == hash {
                1.0
            } else if self.threshold >= 1.0 {
                continue;
            } else {
                jaccard(&shingles, &other.shingles)
            };

            if similarity >= self.threshold {
                issues.push(IssueKind::DuplicateContent.issue(
                    url,
                    format!(
                        "Content is {:.0}% similar to {}",
                        similarity * 100.0,
                        other.url
                    ),
                ));
            }
        }

        self.pages.push(IndexedPage {
            url: url.to_string(),
            hash: hash.to_string(),
            shingles,
        });

        issues
    }
}

/// Hashed word shingles; texts shorter than one shingle become one shingle
fn shingle_set(text: &str) -> HashSet<u64> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return HashSet::new();
    }
    if words.len() < SHINGLE_SIZE {
        return HashSet::from([hash_words(&words)]);
    }
    words.windows(SHINGLE_SIZE).map(hash_words).collect()
}

fn hash_words(words: &[&str]) -> u64 {
    let mut hasher = DefaultHasher::new();
    words.hash(&mut hasher);
    hasher.finish()
}

/// |A ∩ B| / |A ∪ B|, 0.0 when both are empty
fn jaccard(a: &HashSet<u64>, b: &HashSet<u64>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXT_A: &str = "the quick brown fox jumps over the lazy dog near the river bank today";
    const TEXT_B: &str = "the quick brown fox jumps over the lazy dog near the river bank tonight";
    const TEXT_C: &str = "completely different words describing an unrelated product page entirely";

    #[test]
    fn test_identical_hash_is_duplicate() {
        let mut index = DuplicateIndex::new(0.85);
        assert!(index.check_and_insert("https://a.test/1", "h1", TEXT_A).is_empty());
        let issues = index.check_and_insert("https://a.test/2", "h1", TEXT_A);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, "duplicate_content");
        assert_eq!(issues[0].url, "https://a.test/2");
        assert!(issues[0].detail.contains("100%"));
        assert!(issues[0].detail.contains("https://a.test/1"));
    }

    #[test]
    fn test_near_duplicate_above_threshold() {
        let mut index = DuplicateIndex::new(0.8);
        index.check_and_insert("https://a.test/1", "h1", TEXT_A);
        let issues = index.check_and_insert("https://a.test/2", "h2", TEXT_B);
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn test_different_content_not_flagged() {
        let mut index = DuplicateIndex::new(0.85);
        index.check_and_insert("https://a.test/1", "h1", TEXT_A);
        assert!(index.check_and_insert("https://a.test/2", "h2", TEXT_C).is_empty());
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_threshold_one_requires_exact_match() {
        let mut index = DuplicateIndex::new(1.0);
        index.check_and_insert("https://a.test/1", "h1", TEXT_A);
        assert!(index.check_and_insert("https://a.test/2", "h2", TEXT_A).is_empty());
        assert_eq!(index.check_and_insert("https://a.test/3", "h1", TEXT_A).len(), 1);
    }

    #[test]
    fn test_threshold_zero_flags_all_pairs() {
        let mut index = DuplicateIndex::new(0.0);
        index.check_and_insert("https://a.test/1", "h1", TEXT_A);
        index.check_and_insert("https://a.test/2", "h2", TEXT_C);
        assert_eq!(index.check_and_insert("https://a.test/3", "h3", "short").len(), 2);
    }

    #[test]
    fn test_hash_only_entries() {
        let mut index = DuplicateIndex::new(0.5);
        index.insert_hash_only("https://a.test/1", "h1");
        assert!(index.check_and_insert("https://a.test/2", "h2", TEXT_A).is_empty());
        assert_eq!(index.check_and_insert("https://a.test/3", "h1", TEXT_C).len(), 1);
    }

    #[test]
    fn test_jaccard() {
        let a: HashSet<u64> = [1, 2, 3].into();
        let b: HashSet<u64> = [2, 3, 4].into();
        assert_eq!(jaccard(&a, &b), 0.5);
        assert_eq!(jaccard(&HashSet::new(), &HashSet::new()), 0.0);
    }

    #[test]
    fn test_short_text_single_shingle() {
        assert_eq!(shingle_set("two words").len(), 1);
        assert!(shingle_set("").is_empty());
    }
}

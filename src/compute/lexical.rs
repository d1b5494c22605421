//! Inverted word index over record names.
//!
//! Every name of every record is split into tokens at non-alphanumeric
//! boundaries and lower-cased; each token maps to the sorted, deduplicated
//! identifiers of the records carrying it. Lookups are whole-token exact
//! matches. A substring of a token finds nothing.

use cityquery_types::record::{Record, RecordId};
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;

/// Split `text` into lower-cased alphanumeric tokens.
///
/// Alphanumeric is Unicode-aware, so CJK and accented names tokenize as words.
///
/// # Examples
///
/// ```
/// use cityquery::compute::lexical::tokenize;
///
/// let tokens: Vec<String> = tokenize("Sa'dah, Yemen").collect();
/// assert_eq!(tokens, vec!["sa", "dah", "yemen"]);
/// ```
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
}

/// Token → identifiers mapping built once from a record snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvertedIndex {
    postings: FxHashMap<String, Vec<RecordId>>,
}

impl InvertedIndex {
    /// Index every name of every record.
    pub fn build<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a Record>,
    {
        let mut postings: FxHashMap<String, Vec<RecordId>> = FxHashMap::default();
        for record in records {
            for name in record.names() {
                for token in tokenize(name) {
                    postings.entry(token).or_default().push(record.id);
                }
            }
        }
        Self::from_postings(postings)
    }

    /// Wrap raw postings, sorting and deduplicating every list.
    pub(crate) fn from_postings(mut postings: FxHashMap<String, Vec<RecordId>>) -> Self {
        postings.retain(|_, ids| {
            ids.sort_unstable();
            ids.dedup();
            !ids.is_empty()
        });
        Self { postings }
    }

    /// Identifiers of records with a name containing `word` as a whole token.
    ///
    /// Case-insensitive; unknown words yield an empty slice. The slice is
    /// sorted ascending.
    pub fn query(&self, word: &str) -> &[RecordId] {
        self.postings
            .get(&word.to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Identifiers of records whose names, taken together, contain every token
    /// of `phrase`.
    ///
    /// The words need not come from the same name. A phrase with no tokens
    /// matches nothing.
    pub fn query_all(&self, phrase: &str) -> Vec<RecordId> {
        let mut lists: Vec<&[RecordId]> = tokenize(phrase).map(|token| self.query(&token)).collect();
        if lists.is_empty() {
            return Vec::new();
        }

        // Intersect shortest-first so the running result only shrinks.
        lists.sort_by_key(|ids| ids.len());
        let mut result = lists[0].to_vec();
        for ids in &lists[1..] {
            if result.is_empty() {
                break;
            }
            result.retain(|id| ids.binary_search(id).is_ok());
        }
        result
    }

    /// Number of distinct tokens.
    pub fn len(&self) -> usize {
        self.postings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    /// All tokens, in no particular order.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.postings.keys().map(String::as_str)
    }

    /// Postings ordered by token, the shape used by the persisted forms.
    pub fn to_sorted_map(&self) -> BTreeMap<&str, &[RecordId]> {
        self.postings
            .iter()
            .map(|(token, ids)| (token.as_str(), ids.as_slice()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> Vec<Record> {
        vec![
            Record::new(1, "New York City", 40.71427, -74.00597)
                .with_alternate_names(["NYC", "Big Apple"]),
            Record::new(2, "York", 53.95763, -1.08271),
            Record::new(3, "Sa'dah", 16.94021, 43.76393).with_ascii_name("Sadah"),
            Record::new(4, "Beijing", 39.9075, 116.39723).with_alternate_names(["北京市"]),
            Record::new(5, "Cape Town", -33.92584, 18.42322)
                .with_alternate_names(["Kaapstad", "Cape Town"]),
        ]
    }

    #[test]
    fn test_tokenize_splits_and_lowercases() {
        let tokens: Vec<String> = tokenize("  Saint-Étienne du ROUVRAY ").collect();
        assert_eq!(tokens, vec!["saint", "étienne", "du", "rouvray"]);
        assert_eq!(tokenize("--,,").count(), 0);
    }

    #[test]
    fn test_query_is_case_insensitive() {
        let index = InvertedIndex::build(&fixture());
        assert_eq!(index.query("NYC"), &[1]);
        assert_eq!(index.query("nyc"), index.query("NYC"));
        assert_eq!(index.query("York"), &[1, 2]);
    }

    #[test]
    fn test_query_is_token_exact() {
        let index = InvertedIndex::build(&fixture());
        assert!(index.query("Yor").is_empty());
        assert!(index.query("New York").is_empty());
        assert!(index.query("meow").is_empty());
    }

    #[test]
    fn test_punctuation_and_ascii_names() {
        let index = InvertedIndex::build(&fixture());
        assert_eq!(index.query("sa"), &[3]);
        assert_eq!(index.query("dah"), &[3]);
        assert_eq!(index.query("sadah"), &[3]);
        assert!(index.query("sa'dah").is_empty());
    }

    #[test]
    fn test_unicode_names() {
        let index = InvertedIndex::build(&fixture());
        assert_eq!(index.query("北京市"), &[4]);
    }

    #[test]
    fn test_repeated_names_are_deduplicated() {
        let index = InvertedIndex::build(&fixture());
        assert_eq!(index.query("cape"), &[5]);
        assert_eq!(index.query("town"), &[5]);
    }

    #[test]
    fn test_query_all_intersects() {
        let index = InvertedIndex::build(&fixture());
        assert_eq!(index.query_all("New York"), vec![1]);
        assert_eq!(index.query_all("york"), vec![1, 2]);
        assert_eq!(index.query_all("Sa'dah"), vec![3]);
        assert!(index.query_all("Cape York").is_empty());
        assert!(index.query_all("  ").is_empty());
    }

    #[test]
    fn test_build_is_deterministic() {
        let a = InvertedIndex::build(&fixture());
        let b = InvertedIndex::build(&fixture());
        assert_eq!(a, b);
        assert_eq!(a.to_sorted_map(), b.to_sorted_map());
    }

    #[test]
    fn test_empty_index() {
        let index = InvertedIndex::build(std::iter::empty());
        assert!(index.is_empty());
        assert!(index.query("anything").is_empty());
    }
}

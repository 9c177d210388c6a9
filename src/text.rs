//! Bag-of-words vectorization for plain text.
//!
//! Stands in for a real embedding model in demos: every distinct lowercase
//! token of a corpus gets one axis, and a text maps to its token counts.

use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    index: HashMap<String, usize>,
}

impl Vocabulary {
    /// Assigns axes to tokens in first-seen order.
    ///
    /// # Examples
    ///
    /// ```
    /// use kvtree::text::Vocabulary;
    ///
    /// let vocab = Vocabulary::from_corpus(&["Cricket is popular", "cricket is fun"]);
    /// assert_eq!(vocab.len(), 4);
    /// assert_eq!(vocab.vectorize("CRICKET cricket fun"), vec![2.0, 0.0, 0.0, 1.0]);
    /// ```
    pub fn from_corpus(corpus: &[&str]) -> Vocabulary {
        let mut index = HashMap::new();
        for sentence in corpus {
            for token in tokenize(sentence) {
                let next = index.len();
                index.entry(token).or_insert(next);
            }
        }
        Vocabulary { index }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Token-count vector of length `len()`. Unknown tokens are ignored.
    pub fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; self.index.len()];
        for token in tokenize(text) {
            if let Some(&axis) = self.index.get(&token) {
                vector[axis] += 1.0;
            }
        }
        vector
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split_whitespace().map(str::to_lowercase)
}

#[cfg(test)]
mod text_test {
    use super::*;

    #[test]
    fn test_first_seen_order() {
        let vocab = Vocabulary::from_corpus(&["b a", "c a b"]);
        assert_eq!(vocab.vectorize("b"), vec![1.0, 0.0, 0.0]);
        assert_eq!(vocab.vectorize("a"), vec![0.0, 1.0, 0.0]);
        assert_eq!(vocab.vectorize("c"), vec![0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_unknown_tokens_ignored() {
        let vocab = Vocabulary::from_corpus(&["virat kohli"]);
        assert_eq!(vocab.vectorize("who is virat"), vec![1.0, 0.0]);
    }

    #[test]
    fn test_empty_corpus() {
        let vocab = Vocabulary::from_corpus(&[]);
        assert!(vocab.is_empty());
        assert!(vocab.vectorize("anything").is_empty());
    }
}

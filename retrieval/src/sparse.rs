//! BM25 keyword ranking over a candidate set.
//!
//! The index is built per request from the candidates only, so term
//! statistics reflect the scope being searched.

use std::collections::HashMap;

use crate::config::Bm25Params;

const STOPWORDS: &[&str] = &[
    "a", "about", "an", "and", "are", "as", "at", "be", "by", "do", "does", "for", "from", "how",
    "in", "is", "it", "its", "of", "on", "or", "that", "the", "their", "this", "to", "was", "we",
    "were", "what", "which", "with",
];

/// Split text into lowercase terms, dropping stopwords and one-letter tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() > 1)
        .map(str::to_lowercase)
        .filter(|t| !STOPWORDS.contains(&t.as_str()))
        .collect()
}

/// An in-memory BM25 index.
#[derive(Debug)]
pub struct Bm25Index {
    params: Bm25Params,
    term_freqs: Vec<HashMap<String, u32>>,
    doc_lens: Vec<f32>,
    avg_doc_len: f32,
    doc_freqs: HashMap<String, u32>,
}

impl Bm25Index {
    /// Index `documents`; positions in the slice become document ids.
    pub fn build<S: AsRef<str>>(documents: &[S], params: Bm25Params) -> Self {
        let mut term_freqs = Vec::with_capacity(documents.len());
        let mut doc_lens = Vec::with_capacity(documents.len());
        let mut doc_freqs: HashMap<String, u32> = HashMap::new();

        for doc in documents {
            let tokens = tokenize(doc.as_ref());
            doc_lens.push(tokens.len() as f32);

            let mut tf: HashMap<String, u32> = HashMap::new();
            for token in tokens {
                *tf.entry(token).or_insert(0) += 1;
            }
            for term in tf.keys() {
                *doc_freqs.entry(term.clone()).or_insert(0) += 1;
            }
            term_freqs.push(tf);
        }

        let avg_doc_len = if doc_lens.is_empty() {
            0.0
        } else {
            doc_lens.iter().sum::<f32>() / doc_lens.len() as f32
        };

        Self {
            params,
            term_freqs,
            doc_lens,
            avg_doc_len,
            doc_freqs,
        }
    }

    /// Number of indexed documents.
    pub fn len(&self) -> usize {
        self.term_freqs.len()
    }

    /// Whether the index holds no documents.
    pub fn is_empty(&self) -> bool {
        self.term_freqs.is_empty()
    }

    fn idf(&self, term: &str) -> f32 {
        let n = self.len() as f32;
        let df = self.doc_freqs.get(term).copied().unwrap_or(0) as f32;
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }

    /// BM25 score of every document for `query`, by document position.
    pub fn score(&self, query: &str) -> Vec<f32> {
        let mut terms = tokenize(query);
        terms.sort();
        terms.dedup();

        let Bm25Params { k1, b } = self.params;
        let avg = if self.avg_doc_len > 0.0 {
            self.avg_doc_len
        } else {
            1.0
        };

        self.term_freqs
            .iter()
            .zip(&self.doc_lens)
            .map(|(tf, &len)| {
                terms
                    .iter()
                    .filter_map(|term| tf.get(term).map(|&f| (term, f as f32)))
                    .map(|(term, f)| {
                        let norm = f * (k1 + 1.0) / (f + k1 * (1.0 - b + b * len / avg));
                        self.idf(term) * norm
                    })
                    .sum()
            })
            .collect()
    }
}

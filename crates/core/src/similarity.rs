//! Fuzzy string comparison for catalog lookups.
//!
//! Scores are a matching-blocks ratio (`2 * matched / total_len`), which keeps short
//! queries against long catalog names in a useful range where an edit distance would
//! collapse towards zero.

use std::collections::HashMap;

pub trait TextSimilarityScorer: Send + Sync {
    /// Similarity of `a` and `b` in `[0, 1]`. Must be symmetric and return 0 when
    /// either side is empty after normalization.
    fn score(&self, a: &str, b: &str) -> f64;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SequenceRatioScorer;

impl SequenceRatioScorer {
    pub fn new() -> Self {
        Self
    }
}

impl TextSimilarityScorer for SequenceRatioScorer {
    fn score(&self, a: &str, b: &str) -> f64 {
        let left = normalize(a);
        let right = normalize(b);
        if left.is_empty() || right.is_empty() {
            return 0.0;
        }

        // Block selection prefers the earliest match in the first sequence, so fix the
        // argument order to keep the score symmetric.
        let (first, second) = if left <= right { (left, right) } else { (right, left) };
        let first: Vec<char> = first.chars().collect();
        let second: Vec<char> = second.chars().collect();

        let matched = matched_len(&first, &second);
        (2 * matched) as f64 / (first.len() + second.len()) as f64
    }
}

/// Lowercases, folds Arabic letter variants onto their Persian forms, turns zero-width
/// non-joiners into spaces and collapses runs of whitespace.
pub fn normalize(text: &str) -> String {
    let folded: String = text
        .chars()
        .map(|ch| match ch {
            '\u{064A}' | '\u{0649}' => '\u{06CC}',
            '\u{0643}' => '\u{06A9}',
            '\u{200C}' => ' ',
            other => other,
        })
        .flat_map(char::to_lowercase)
        .collect();

    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn matched_len(a: &[char], b: &[char]) -> usize {
    let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
    for (index, ch) in b.iter().enumerate() {
        b2j.entry(*ch).or_default().push(index);
    }

    let mut total = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, size) = longest_match(a, &b2j, alo, ahi, blo, bhi);
        if size == 0 {
            continue;
        }

        total += size;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + size < ahi && j + size < bhi {
            pending.push((i + size, ahi, j + size, bhi));
        }
    }

    total
}

fn longest_match(
    a: &[char],
    b2j: &HashMap<char, Vec<usize>>,
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);
    let mut run_lengths: HashMap<usize, usize> = HashMap::new();

    for (i, ch) in a.iter().enumerate().take(ahi).skip(alo) {
        let mut next_run_lengths = HashMap::new();
        if let Some(positions) = b2j.get(ch) {
            for &j in positions {
                if j < blo {
                    continue;
                }
                if j >= bhi {
                    break;
                }

                let run = j.checked_sub(1).and_then(|prev| run_lengths.get(&prev)).copied();
                let size = run.unwrap_or(0) + 1;
                next_run_lengths.insert(j, size);
                if size > best_size {
                    best_i = i + 1 - size;
                    best_j = j + 1 - size;
                    best_size = size;
                }
            }
        }
        run_lengths = next_run_lengths;
    }

    (best_i, best_j, best_size)
}

//! Candidate scoring shared by the reference dictionaries.
//!
//! Scores follow the usual decoder magnitudes: an exact match of a frequent
//! word lands around 1.5M-2M, a one-edit correction around 0.6M-1.6M, and
//! pure context predictions stay in the low hundreds.

use crate::candidate::kind;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

const EXACT_MATCH_BASE: i32 = 1_000_000;
const CORRECTION_BASE: i32 = 600_000;
const FREQUENCY_UNIT: i32 = 4_000;
const ACCENT_PENALTY: i32 = 10_000;
const CASE_PENALTY: i32 = 5_000;

/// Scored match of a dictionary word against the typed input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    pub score: i32,
    pub kind_and_flags: u32,
}

/// Largest edit distance accepted for a typed word of `len` code points.
pub fn max_edit_distance(len: usize) -> u32 {
    match len {
        0 | 1 => 0,
        2 => 1,
        _ => 2,
    }
}

/// Plain Levenshtein distance over code points.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut cur = vec![0; b.len() + 1];
    for i in 1..=a.len() {
        cur[0] = i;
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            cur[j] = (prev[j - 1] + cost).min(prev[j] + 1).min(cur[j - 1] + 1);
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}

/// Optimal string alignment distance: Levenshtein plus adjacent transpositions.
pub fn damerau_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (n, m) = (a.len(), b.len());
    let mut d = vec![vec![0usize; m + 1]; n + 1];
    for (i, row) in d.iter_mut().enumerate() {
        row[0] = i;
    }
    for j in 0..=m {
        d[0][j] = j;
    }
    for i in 1..=n {
        for j in 1..=m {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            let mut best = (d[i - 1][j - 1] + cost).min(d[i - 1][j] + 1).min(d[i][j - 1] + 1);
            if i > 1 && j > 1 && a[i - 1] == b[j - 2] && a[i - 2] == b[j - 1] {
                best = best.min(d[i - 2][j - 2] + 1);
            }
            d[i][j] = best;
        }
    }
    d[n][m]
}

/// Lowercased form with combining marks removed.
pub fn strip_accents(s: &str) -> String {
    s.nfd().filter(|c| !is_combining_mark(*c)).collect::<String>().to_lowercase()
}

/// Scores `word` (with unigram `frequency` 0..=255) against the typed input.
///
/// Returns `None` when the word is too far from the input to be offered.
pub fn score_candidate(typed: &str, word: &str, frequency: u8) -> Option<Match> {
    if typed.is_empty() || word.is_empty() {
        return None;
    }
    let freq = i32::from(frequency) * FREQUENCY_UNIT;
    let appropriate = kind::CORRECTION | kind::FLAG_APPROPRIATE_FOR_AUTO_CORRECTION;
    if word == typed {
        return Some(Match {
            score: EXACT_MATCH_BASE + freq,
            kind_and_flags: appropriate | kind::FLAG_EXACT_MATCH,
        });
    }
    let typed_lc = typed.to_lowercase();
    let word_lc = word.to_lowercase();
    if word_lc == typed_lc {
        return Some(Match {
            score: EXACT_MATCH_BASE + freq - CASE_PENALTY,
            kind_and_flags: appropriate,
        });
    }
    if strip_accents(&word_lc) == strip_accents(&typed_lc) {
        return Some(Match {
            score: EXACT_MATCH_BASE + freq - ACCENT_PENALTY,
            kind_and_flags: appropriate | kind::FLAG_EXACT_MATCH_WITH_ACCENTS,
        });
    }
    let typed_len = typed_lc.chars().count();
    let word_len = word_lc.chars().count();
    if word_lc.starts_with(&typed_lc) {
        let score = i64::from(freq) * typed_len as i64 / word_len.max(1) as i64;
        return Some(Match {
            score: score as i32,
            kind_and_flags: kind::COMPLETION,
        });
    }
    let distance = damerau_distance(&typed_lc, &word_lc);
    if distance == 0 || distance as u32 > max_edit_distance(typed_len) {
        return None;
    }
    Some(Match {
        score: (CORRECTION_BASE + freq) >> (distance - 1),
        kind_and_flags: appropriate,
    })
}

/// Applies the per-locale weight to a raw score.
pub fn weighted(score: i32, weight_for_locale: f32) -> i32 {
    if score == i32::MAX || weight_for_locale >= 1.0 {
        return score;
    }
    (score as f64 * f64::from(weight_for_locale.max(0.0))) as i32
}

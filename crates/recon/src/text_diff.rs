//! Word-level diff of two texts.
//!
//! Texts are split on Unicode word boundaries (whitespace and punctuation
//! become their own segments) and the segment sequences are diffed. Only
//! what the target added or replaced is reported; deletions leave nothing
//! in the target to point at.

use serde::Serialize;
use similar::{capture_diff_slices, Algorithm, DiffOp};
use unicode_segmentation::UnicodeSegmentation;

/// A run of characters in the target text. Offsets count `char`s, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TextSpan {
    pub start: usize,
    pub len: usize,
}

pub fn segment_words(text: &str) -> Vec<&str> {
    text.split_word_bounds().collect()
}

pub fn find_text_diff(target: &str, reference: &str) -> Vec<TextSpan> {
    let target_words = segment_words(target);
    let reference_words = segment_words(reference);

    capture_diff_slices(Algorithm::Myers, &reference_words, &target_words)
        .into_iter()
        .filter_map(|op| match op {
            DiffOp::Insert { new_index, new_len, .. } | DiffOp::Replace { new_index, new_len, .. } => {
                Some(span_of(&target_words, new_index, new_index + new_len))
            }
            _ => None,
        })
        .collect()
}

fn span_of(words: &[&str], from: usize, to: usize) -> TextSpan {
    let start = words[..from].iter().map(|w| w.chars().count()).sum();
    let len = words[from..to].iter().map(|w| w.chars().count()).sum();
    TextSpan { start, len }
}

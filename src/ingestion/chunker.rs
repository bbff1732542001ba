//! Sentence-accumulating text chunker with trailing-sentence overlap.
//!
//! Sentences are never split. A chunk closes when the next sentence would
//! push it past the character budget; the next chunk re-opens with the
//! trailing whole sentences of the closed chunk that fit inside the overlap
//! budget, so no sentence boundary is lost across the seam.

use std::collections::VecDeque;
use std::sync::LazyLock;

use regex::Regex;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// Deterministic chunker configured with character budgets.
#[derive(Clone, Copy, Debug)]
pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
}

impl Chunker {
    /// `chunk_size` is the per-chunk character budget, `overlap` the budget
    /// for sentences carried across the seam. An overlap at or above the
    /// chunk size would never converge and is clamped below it.
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            overlap: overlap.min(chunk_size.saturating_sub(1)),
        }
    }

    /// Split `text` into overlapping chunks of whole sentences.
    ///
    /// A single sentence longer than the budget is kept whole; it is the only
    /// case where a chunk may exceed `chunk_size`.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let sentences = split_sentences(text);
        let mut chunks = Vec::new();
        let mut current: VecDeque<String> = VecDeque::new();
        let mut current_len = 0usize;

        for sentence in sentences {
            let sentence_len = sentence.chars().count();
            let projected = joined_len(current_len, current.is_empty(), sentence_len);

            if !current.is_empty() && projected > self.chunk_size {
                chunks.push(join(&current));
                let (kept, kept_len) = self.carry_over(&current);
                // Overlap plus the incoming sentence must still fit; if it
                // cannot, start the next chunk clean so only single-sentence
                // overflow can ever breach the budget.
                if joined_len(kept_len, kept.is_empty(), sentence_len) > self.chunk_size {
                    current = VecDeque::new();
                    current_len = 0;
                } else {
                    current = kept;
                    current_len = kept_len;
                }
            }

            current_len = joined_len(current_len, current.is_empty(), sentence_len);
            current.push_back(sentence);
        }

        if !current.is_empty() {
            chunks.push(join(&current));
        }
        chunks
    }

    // Trailing whole sentences of the closed chunk that fit the overlap budget.
    fn carry_over(&self, closed: &VecDeque<String>) -> (VecDeque<String>, usize) {
        let mut kept = VecDeque::new();
        let mut kept_len = 0usize;
        for sentence in closed.iter().rev() {
            let sentence_len = sentence.chars().count();
            let projected = joined_len(kept_len, kept.is_empty(), sentence_len);
            if projected > self.overlap {
                break;
            }
            kept.push_front(sentence.clone());
            kept_len = projected;
        }
        (kept, kept_len)
    }
}

fn joined_len(current_len: usize, empty: bool, addition: usize) -> usize {
    if empty {
        addition
    } else {
        current_len + 1 + addition
    }
}

fn join(sentences: &VecDeque<String>) -> String {
    sentences
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split text into sentences on `.`, `!`, `?` boundaries followed by
/// whitespace and an upper-case or numeric continuation. Whitespace is
/// normalized first, so chunk output is stable across formatting changes in
/// the source document.
pub fn split_sentences(text: &str) -> Vec<String> {
    let normalized = WHITESPACE.replace_all(text.trim(), " ");
    if normalized.is_empty() {
        return Vec::new();
    }

    let chars: Vec<char> = normalized.chars().collect();
    let mut sentences = Vec::new();
    let mut start = 0usize;
    let mut i = 0usize;

    while i < chars.len() {
        if matches!(chars[i], '.' | '!' | '?') {
            // Swallow runs of terminal punctuation and a closing quote.
            let mut end = i + 1;
            while end < chars.len() && matches!(chars[end], '.' | '!' | '?' | '"' | '\'' | ')') {
                end += 1;
            }
            let boundary = end < chars.len()
                && chars[end] == ' '
                && chars
                    .get(end + 1)
                    .is_some_and(|next| next.is_uppercase() || next.is_ascii_digit());
            if boundary {
                sentences.push(chars[start..end].iter().collect::<String>());
                start = end + 1;
                i = end + 1;
                continue;
            }
            i = end;
        } else {
            i += 1;
        }
    }

    if start < chars.len() {
        sentences.push(chars[start..].iter().collect::<String>());
    }
    sentences
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_sentence_boundaries() {
        let sentences = split_sentences("First point. Second point! Third question? Done.");
        assert_eq!(
            sentences,
            vec!["First point.", "Second point!", "Third question?", "Done."]
        );
    }

    #[test]
    fn keeps_abbreviations_and_lowercase_continuations_together() {
        let sentences = split_sentences("We cover e.g. embeddings here. Next topic.");
        assert_eq!(sentences, vec!["We cover e.g. embeddings here.", "Next topic."]);
    }

    #[test]
    fn normalizes_interior_whitespace() {
        let sentences = split_sentences("Spread\nover   lines. Another\tone.");
        assert_eq!(sentences, vec!["Spread over lines.", "Another one."]);
    }

    #[test]
    fn chunks_respect_the_character_budget() {
        let text = "Sentence one is here. Sentence two is here. Sentence three is here. \
                    Sentence four is here. Sentence five is here.";
        let chunker = Chunker::new(60, 0);
        let chunks = chunker.chunk(text);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(
                chunk.chars().count() <= 60,
                "chunk over budget: {chunk:?}"
            );
        }
    }

    #[test]
    fn overlap_repeats_trailing_sentences() {
        let text = "Alpha beta gamma delta. Epsilon zeta eta theta. Iota kappa lambda mu.";
        let chunker = Chunker::new(50, 25);
        let chunks = chunker.chunk(text);
        assert!(chunks.len() >= 2);
        // The second chunk re-opens with the closing sentence of the first.
        let first_tail = chunks[0].rsplit(". ").next().unwrap();
        assert!(
            chunks[1].starts_with(first_tail.trim_start_matches(". ")),
            "no overlap between {:?} and {:?}",
            chunks[0],
            chunks[1]
        );
    }

    #[test]
    fn oversized_sentence_is_kept_whole() {
        let long = format!("Word {}.", "word ".repeat(49).trim_end());
        let text = format!("Short lead. {long} Short tail.");
        let chunker = Chunker::new(80, 20);
        let chunks = chunker.chunk(&text);
        assert!(chunks.iter().any(|c| c.contains("word word")));
        // The oversized sentence appears unbroken in exactly one chunk body.
        let carrier = chunks.iter().find(|c| c.contains(&long)).unwrap();
        assert!(carrier.chars().count() >= 80);
    }

    #[test]
    fn chunk_cores_reconstruct_the_text() {
        let text = "One two three four. Five six seven eight. Nine ten eleven twelve. \
                    Thirteen fourteen fifteen sixteen.";
        let chunker = Chunker::new(50, 22);
        let chunks = chunker.chunk(text);
        assert!(chunks.len() > 1);

        // Drop each chunk's leading overlap (the longest chunk prefix that is
        // a suffix of what we already rebuilt) and splice the remainders; the
        // original text must come back.
        let mut reconstructed = chunks[0].clone();
        for chunk in &chunks[1..] {
            let mut overlap_end = 0;
            for idx in 1..=chunk.len() {
                if chunk.is_char_boundary(idx) && reconstructed.ends_with(&chunk[..idx]) {
                    overlap_end = idx;
                }
            }
            let fresh = chunk[overlap_end..].trim_start();
            if !fresh.is_empty() {
                reconstructed.push(' ');
                reconstructed.push_str(fresh);
            }
        }
        assert_eq!(reconstructed, text);
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        assert!(Chunker::new(100, 10).chunk("").is_empty());
        assert!(Chunker::new(100, 10).chunk("   \n  ").is_empty());
    }

    #[test]
    fn identical_input_identical_output() {
        let text = "Stable input. Stable output. Every single time.";
        let chunker = Chunker::new(30, 12);
        assert_eq!(chunker.chunk(text), chunker.chunk(text));
    }
}

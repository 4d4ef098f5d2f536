//! Text cleaning and token-bounded segmentation
//!
//! Documents are cut into [`Chunk`]s no larger than a character budget of
//! `max_chunk_tokens * 4`. Units are tried coarse to fine: paragraphs
//! (separated by a blank line), then sentences, then words. Units are packed
//! greedily, so a chunk is closed only when the next unit would not fit. A
//! single word longer than the budget becomes its own oversized chunk.

use cropwise_domain::chunk::{Chunk, CHARS_PER_TOKEN};
use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

const PARAGRAPH_BREAK: &str = "\n\n";
const SPACE: &str = " ";

fn horizontal_whitespace() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\S\n]+").expect("valid regex"))
}

fn padded_newline() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r" *\n *").expect("valid regex"))
}

fn blank_line_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n{3,}").expect("valid regex"))
}

fn keep_char(c: char) -> bool {
    c.is_alphanumeric()
        || c.is_whitespace()
        || matches!(c, '.' | ',' | ';' | ':' | '(' | ')' | '-' | '°' | '%' | '/')
}

/// Normalize extracted document text before segmentation
///
/// Line endings become `\n`, characters outside letters, digits, whitespace
/// and `. , ; : ( ) - ° % /` are dropped, runs of spaces and tabs collapse to
/// one space, and any run of blank lines becomes a single paragraph break.
///
/// # Examples
///
/// ```
/// use cropwise_extractor::clean_text;
///
/// let cleaned = clean_text("Rice:\t pH 6–7 *\r\n\r\n\r\n\r\nNeeds 25°C!");
/// assert_eq!(cleaned, "Rice: pH 67\n\nNeeds 25°C");
/// ```
pub fn clean_text(raw: &str) -> String {
    let unified = raw.replace("\r\n", "\n").replace('\r', "\n");
    let kept: String = unified.chars().filter(|c| keep_char(*c)).collect();
    let spaced = horizontal_whitespace().replace_all(&kept, SPACE);
    let lines = padded_newline().replace_all(&spaced, "\n");
    let paragraphs = blank_line_run().replace_all(&lines, PARAGRAPH_BREAK);
    paragraphs.trim().to_string()
}

/// Splits text into token-bounded chunks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSegmenter {
    max_chunk_tokens: usize,
}

impl TextSegmenter {
    /// Create a segmenter; a budget of 0 is treated as 1 token
    pub fn new(max_chunk_tokens: usize) -> Self {
        Self {
            max_chunk_tokens: max_chunk_tokens.max(1),
        }
    }

    /// Character budget per chunk
    pub fn budget_chars(&self) -> usize {
        self.max_chunk_tokens * CHARS_PER_TOKEN
    }

    /// Segment `text` into chunks with contiguous ids starting at 0
    ///
    /// Whitespace-only input yields no chunks.
    pub fn segment(&self, text: &str) -> Vec<Chunk> {
        let budget = self.budget_chars();
        let mut packer = Packer::new(budget);

        for paragraph in text
            .split(PARAGRAPH_BREAK)
            .map(str::trim)
            .filter(|p| !p.is_empty())
        {
            if char_len(paragraph) <= budget {
                packer.push(paragraph, PARAGRAPH_BREAK);
                continue;
            }

            let mut separator = PARAGRAPH_BREAK;
            for sentence in split_sentences(paragraph) {
                if char_len(sentence) <= budget {
                    packer.push(sentence, separator);
                } else {
                    for word in sentence.split_whitespace() {
                        packer.push(word, separator);
                        separator = SPACE;
                    }
                }
                separator = SPACE;
            }
        }

        let chunks = packer.finish();
        debug!(
            "Segmented {} chars into {} chunks (budget {} chars)",
            text.chars().count(),
            chunks.len(),
            budget
        );
        chunks
    }
}

/// Greedy accumulator for segmentation units
struct Packer {
    budget: usize,
    current: String,
    current_len: usize,
    chunks: Vec<Chunk>,
}

impl Packer {
    fn new(budget: usize) -> Self {
        Self {
            budget,
            current: String::new(),
            current_len: 0,
            chunks: Vec::new(),
        }
    }

    fn push(&mut self, unit: &str, separator: &str) {
        let unit_len = char_len(unit);
        if !self.current.is_empty() {
            let joined = self.current_len + char_len(separator) + unit_len;
            if joined <= self.budget {
                self.current.push_str(separator);
                self.current.push_str(unit);
                self.current_len = joined;
                return;
            }
            self.close();
        }
        self.current.push_str(unit);
        self.current_len = unit_len;
    }

    fn close(&mut self) {
        if self.current.is_empty() {
            return;
        }
        let id = self.chunks.len();
        self.chunks.push(Chunk::new(id, std::mem::take(&mut self.current)));
        self.current_len = 0;
    }

    fn finish(mut self) -> Vec<Chunk> {
        self.close();
        self.chunks
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Split after `.`, `!` or `?` followed by whitespace
fn split_sentences(paragraph: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut previous: Option<char> = None;
    let mut chars = paragraph.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if c.is_whitespace() && matches!(previous, Some('.' | '!' | '?')) {
            let sentence = paragraph[start..i].trim();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            let mut next_start = i + c.len_utf8();
            while let Some(&(j, d)) = chars.peek() {
                if !d.is_whitespace() {
                    break;
                }
                next_start = j + d.len_utf8();
                chars.next();
            }
            start = next_start;
            previous = None;
            continue;
        }
        previous = Some(c);
    }

    let tail = paragraph[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_clean_text_keeps_paragraphs() {
        let raw = "Maize  grows\tfast.  \n  Plant in rows.\n\n\n\nFertilize @ 120 kg/ha (split).";
        assert_eq!(
            clean_text(raw),
            "Maize grows fast.\nPlant in rows.\n\nFertilize 120 kg/ha (split)."
        );
    }

    #[test]
    fn test_clean_text_whitespace_only() {
        assert_eq!(clean_text(" \n\t \r\n "), "");
        assert!(TextSegmenter::new(100).segment("").is_empty());
        assert!(TextSegmenter::new(100).segment("   \n\n  ").is_empty());
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        let chunks = TextSegmenter::new(100).segment("Short text here.\n\nAnother paragraph.");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Short text here.\n\nAnother paragraph.");
        assert_eq!(chunks[0].id, 0);
    }

    #[test]
    fn test_paragraphs_pack_greedily() {
        // budget 20 chars
        let segmenter = TextSegmenter::new(5);
        let chunks = segmenter.segment("aaaa bbbb\n\ncccc dddd\n\neeee");
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["aaaa bbbb\n\ncccc dddd", "eeee"]);
    }

    #[test]
    fn test_long_paragraph_splits_on_sentences() {
        let segmenter = TextSegmenter::new(6); // 24 chars
        let chunks = segmenter.segment("Rice is a cereal. It needs water! Does it? Yes.");
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["Rice is a cereal.", "It needs water! Does it?", "Yes."]);
    }

    #[test]
    fn test_long_sentence_splits_on_words() {
        let segmenter = TextSegmenter::new(3); // 12 chars
        let chunks = segmenter.segment("alpha beta gamma delta epsilon");
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["alpha beta", "gamma delta", "epsilon"]);
    }

    #[test]
    fn test_oversized_word_is_its_own_chunk() {
        let segmenter = TextSegmenter::new(2); // 8 chars
        let word = "x".repeat(30);
        let chunks = segmenter.segment(&format!("ab {} cd", word));
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["ab", word.as_str(), "cd"]);
    }

    #[test]
    fn test_budget_counts_chars_not_bytes() {
        let segmenter = TextSegmenter::new(1); // 4 chars
        let chunks = segmenter.segment("°°°° °°°°");
        assert_eq!(chunks.len(), 2);
    }

    #[test]
    fn test_three_paragraph_document() {
        let paragraph = "Sorghum tolerates drought and heat. ".repeat(24);
        let text = [paragraph.trim(), paragraph.trim(), paragraph.trim()].join("\n\n");
        assert!(text.chars().count() > 2500);
        let chunks = TextSegmenter::new(100).segment(&text);
        assert!(chunks.len() >= 2);
    }

    fn document() -> impl Strategy<Value = String> {
        let word = "[a-z]{1,14}[.!?]?";
        let sep = prop_oneof![4 => Just(" "), 1 => Just("\n\n"), 1 => Just("\n")];
        prop::collection::vec((word, sep), 0..120).prop_map(|parts| {
            parts
                .into_iter()
                .map(|(w, s)| format!("{}{}", w, s))
                .collect::<String>()
        })
    }

    proptest! {
        #[test]
        fn prop_ids_are_contiguous(text in document(), tokens in 1usize..40) {
            let chunks = TextSegmenter::new(tokens).segment(&text);
            for (i, chunk) in chunks.iter().enumerate() {
                prop_assert_eq!(chunk.id, i);
            }
        }

        #[test]
        fn prop_chunks_respect_budget(text in document(), tokens in 1usize..40) {
            let segmenter = TextSegmenter::new(tokens);
            for chunk in segmenter.segment(&text) {
                let len = chunk.text.chars().count();
                let atomic = !chunk.text.contains(char::is_whitespace);
                prop_assert!(len <= segmenter.budget_chars() || atomic);
            }
        }

        #[test]
        fn prop_words_are_preserved_in_order(text in document(), tokens in 1usize..40) {
            let chunks = TextSegmenter::new(tokens).segment(&text);
            let rejoined: Vec<&str> = chunks.iter().flat_map(|c| c.text.split_whitespace()).collect();
            let original: Vec<&str> = text.split_whitespace().collect();
            prop_assert_eq!(rejoined, original);
        }

        #[test]
        fn prop_segmentation_is_deterministic(text in document(), tokens in 1usize..40) {
            let segmenter = TextSegmenter::new(tokens);
            prop_assert_eq!(segmenter.segment(&text), segmenter.segment(&text));
        }
    }
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Word emphasis: splits every word of a text span into a strong prefix and a
// normal-weight remainder. Pure and stateless.

use std::fmt::Write as _;
use std::sync::LazyLock;

use bionic_core::BoldRatio;
use regex::Regex;

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+").expect("static regex"));

/// One piece of an emphasised span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Leading part of a word, rendered in the strong weight.
    Strong(String),
    /// Remainder of a word, rendered in the normal weight.
    Normal(String),
    /// Whitespace and punctuation between words, passed through verbatim.
    Plain(String),
}

impl Segment {
    pub fn text(&self) -> &str {
        match self {
            Self::Strong(s) | Self::Normal(s) | Self::Plain(s) => s,
        }
    }
}

/// Output of [`emphasize`]: the input text cut into tagged segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emphasized {
    segments: Vec<Segment>,
}

impl Emphasized {
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn into_segments(self) -> Vec<Segment> {
        self.segments
    }

    /// Concatenation of all segment texts. Always equal to the input.
    pub fn plain_text(&self) -> String {
        self.segments.iter().map(Segment::text).collect()
    }

    /// Markup projection with `bionic-prefix` / `bionic-rest` spans.
    pub fn to_html(&self) -> String {
        segments_html(&self.segments)
    }
}

/// Render segments as HTML, escaping all text.
pub fn segments_html(segments: &[Segment]) -> String {
    let mut out = String::new();
    for segment in segments {
        match segment {
            Segment::Strong(s) => {
                let _ = write!(out, r#"<span class="bionic-prefix">{}</span>"#, escape_html(s));
            }
            Segment::Normal(s) => {
                let _ = write!(out, r#"<span class="bionic-rest">{}</span>"#, escape_html(s));
            }
            Segment::Plain(s) => out.push_str(&escape_html(s)),
        }
    }
    out
}

/// Emphasise the start of every word in `text`.
///
/// Returns `None` for empty or whitespace-only input; the caller then emits
/// the original text unchanged.
pub fn emphasize(text: &str, ratio: BoldRatio) -> Option<Emphasized> {
    if text.trim().is_empty() {
        return None;
    }

    let mut segments = Vec::new();
    let mut last = 0;
    for word in WORD.find_iter(text) {
        if word.start() > last {
            segments.push(Segment::Plain(text[last..word.start()].to_string()));
        }
        split_word(word.as_str(), ratio, &mut segments);
        last = word.end();
    }
    if last < text.len() {
        segments.push(Segment::Plain(text[last..].to_string()));
    }

    Some(Emphasized { segments })
}

/// Number of leading characters of a `len`-character word to emphasise.
pub fn prefix_len(len: usize, ratio: BoldRatio) -> usize {
    let k = (len as f64 * ratio.get()).floor() as usize;
    k.max(1).min(len)
}

fn split_word(word: &str, ratio: BoldRatio, out: &mut Vec<Segment>) {
    let len = word.chars().count();
    if len == 1 {
        out.push(Segment::Strong(word.to_string()));
        return;
    }
    let k = prefix_len(len, ratio);
    let split_at = word
        .char_indices()
        .nth(k)
        .map(|(idx, _)| idx)
        .unwrap_or(word.len());
    let (head, tail) = word.split_at(split_at);
    out.push(Segment::Strong(head.to_string()));
    if !tail.is_empty() {
        out.push(Segment::Normal(tail.to_string()));
    }
}

/// Escape HTML entities for safe embedding.
pub fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ratio(r: f64) -> BoldRatio {
        BoldRatio::new(r).unwrap()
    }

    #[test]
    fn reading_splits_after_three_chars() {
        let out = emphasize("reading", ratio(0.5)).unwrap();
        assert_eq!(
            out.segments(),
            &[
                Segment::Strong("rea".into()),
                Segment::Normal("ding".into())
            ]
        );
    }

    #[test]
    fn single_character_word_is_one_strong_span() {
        let out = emphasize("a", ratio(0.5)).unwrap();
        assert_eq!(out.segments(), &[Segment::Strong("a".into())]);
        assert_eq!(out.to_html(), r#"<span class="bionic-prefix">a</span>"#);
    }

    #[test]
    fn whitespace_only_yields_none() {
        assert!(emphasize("", ratio(0.5)).is_none());
        assert!(emphasize("   \t\n", ratio(0.5)).is_none());
    }

    #[test]
    fn punctuation_passes_through() {
        let out = emphasize("Hi, you!", ratio(0.5)).unwrap();
        assert_eq!(
            out.segments(),
            &[
                Segment::Strong("H".into()),
                Segment::Normal("i".into()),
                Segment::Plain(", ".into()),
                Segment::Strong("y".into()),
                Segment::Normal("ou".into()),
                Segment::Plain("!".into()),
            ]
        );
    }

    #[test]
    fn plain_text_round_trips() {
        let samples = [
            "The quick brown fox — jumps over 13 lazy dogs.",
            "  leading and trailing  ",
            "snake_case_identifier and CamelCase",
            "naïve café Ångström",
            "日本語のテキスト and ελληνικά",
            "tabs\tand\nnewlines\r\n",
            "<script>alert('x') & \"y\"</script>",
            "emoji 🎉 between words",
        ];
        for r in [0.01, 0.3, 0.5, 0.75, 1.0] {
            for sample in samples {
                let out = emphasize(sample, ratio(r)).unwrap();
                assert_eq!(out.plain_text(), sample, "ratio {r}");
            }
        }
    }

    #[test]
    fn prefix_is_strictly_inside_word_below_full_ratio() {
        for r in [0.01, 0.1, 0.25, 0.5, 0.66, 0.9, 0.99] {
            for len in 2..40 {
                let k = prefix_len(len, ratio(r));
                assert!(k >= 1 && k < len, "len {len} ratio {r} gave k {k}");
            }
        }
    }

    #[test]
    fn full_ratio_emphasises_whole_word() {
        let out = emphasize("word", ratio(1.0)).unwrap();
        assert_eq!(out.segments(), &[Segment::Strong("word".into())]);
    }

    #[test]
    fn multibyte_words_split_on_char_boundaries() {
        let out = emphasize("über", ratio(0.5)).unwrap();
        assert_eq!(
            out.segments(),
            &[Segment::Strong("üb".into()), Segment::Normal("er".into())]
        );
    }

    #[test]
    fn underscore_is_a_word_character() {
        let out = emphasize("a_b", ratio(0.5)).unwrap();
        assert_eq!(
            out.segments(),
            &[Segment::Strong("a".into()), Segment::Normal("_b".into())]
        );
    }

    #[test]
    fn html_projection_escapes_text() {
        let out = emphasize("a<b", ratio(0.5)).unwrap();
        assert_eq!(
            out.to_html(),
            r#"<span class="bionic-prefix">a</span>&lt;<span class="bionic-prefix">b</span>"#
        );
    }

    #[test]
    fn safe_to_share_across_threads() {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                std::thread::spawn(move || {
                    let text = format!("thread number {i} emphasises words");
                    emphasize(&text, ratio(0.5)).unwrap().plain_text() == text
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }
    }
}

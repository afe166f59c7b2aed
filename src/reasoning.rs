//! Reasoning extraction state machine
//!
//! Normalizes adapter events into a uniform reasoning/answer stream for one
//! upstream call. Two modes:
//!
//! - **Native**: the provider emits reasoning in a dedicated field; the
//!   extractor inserts a single [`SemanticEvent::EndOfReason`] before the
//!   first answer delta.
//! - **Tag sniff**: reasoning arrives inline as `<think>…</think>` inside
//!   the normal content stream. Detection runs over accumulated deltas, so
//!   a tag split across two deltas is still recognized; a possible partial
//!   tag at the end of a delta is held back until the next delta decides it.
//!
//! Invariants: at most one `EndOfReason` per call, never followed by another
//! `Reasoning` event; empty deltas are never yielded.

use crate::stream::SemanticEvent;

const THINK_OPEN: &str = "<think>";
const THINK_CLOSE: &str = "</think>";

/// How reasoning is carried by the upstream provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMode {
    Native,
    TagSniff,
}

impl ExtractionMode {
    pub fn for_origin(is_origin_reasoning: bool) -> Self {
        if is_origin_reasoning {
            Self::Native
        } else {
            Self::TagSniff
        }
    }
}

/// Per-request extractor state.
#[derive(Debug)]
pub struct ReasoningExtractor {
    mode: ExtractionMode,
    inside_think: bool,
    end_emitted: bool,
    done: bool,
    /// Undecided tail of the previous delta (possible partial tag).
    carry: String,
}

impl ReasoningExtractor {
    pub fn new(mode: ExtractionMode) -> Self {
        Self {
            mode,
            inside_think: false,
            end_emitted: false,
            done: false,
            carry: String::new(),
        }
    }

    /// Feed one adapter event, producing zero or more normalized events.
    pub fn push(&mut self, event: SemanticEvent) -> Vec<SemanticEvent> {
        if self.done {
            return vec![];
        }
        match event {
            SemanticEvent::Reasoning(text) => {
                if text.is_empty() || self.end_emitted {
                    vec![]
                } else {
                    vec![SemanticEvent::Reasoning(text)]
                }
            }
            SemanticEvent::Answer(text) => {
                if text.is_empty() {
                    return vec![];
                }
                match self.mode {
                    ExtractionMode::Native => self.push_native_answer(text),
                    ExtractionMode::TagSniff => self.push_sniffed(text),
                }
            }
            SemanticEvent::EndOfReason => {
                if self.end_emitted {
                    vec![]
                } else {
                    self.end_emitted = true;
                    vec![SemanticEvent::EndOfReason]
                }
            }
            SemanticEvent::Done => {
                self.done = true;
                let mut out = self.flush();
                out.push(SemanticEvent::Done);
                out
            }
        }
    }

    /// Flush any held-back partial tag when the upstream closes without a
    /// terminal event.
    pub fn finish(&mut self) -> Vec<SemanticEvent> {
        self.flush()
    }

    fn flush(&mut self) -> Vec<SemanticEvent> {
        if self.carry.is_empty() {
            return vec![];
        }
        let text = std::mem::take(&mut self.carry);
        if self.inside_think {
            vec![SemanticEvent::Reasoning(text)]
        } else {
            vec![SemanticEvent::Answer(text)]
        }
    }

    fn push_native_answer(&mut self, text: String) -> Vec<SemanticEvent> {
        if self.end_emitted {
            vec![SemanticEvent::Answer(text)]
        } else {
            self.end_emitted = true;
            vec![SemanticEvent::EndOfReason, SemanticEvent::Answer(text)]
        }
    }

    fn push_sniffed(&mut self, text: String) -> Vec<SemanticEvent> {
        if self.end_emitted {
            return vec![SemanticEvent::Answer(text)];
        }

        let mut chunk = std::mem::take(&mut self.carry);
        chunk.push_str(&text);

        if !self.inside_think {
            if let Some(open_at) = chunk.find(THINK_OPEN) {
                self.inside_think = true;
                return self.emit_inside(chunk, open_at);
            }
            if let Some(hold_from) = partial_tag_start(&chunk, THINK_OPEN) {
                let held = chunk.split_off(hold_from);
                self.carry = held;
                if chunk.is_empty() {
                    return vec![];
                }
                return vec![SemanticEvent::Answer(chunk)];
            }
            return vec![SemanticEvent::Answer(chunk)];
        }

        self.emit_inside(chunk, 0)
    }

    /// Emit a chunk that is (at least from `search_from` on) reasoning text,
    /// closing the phase if the closing tag is complete and holding back a
    /// partial closing tag otherwise.
    fn emit_inside(&mut self, mut chunk: String, search_from: usize) -> Vec<SemanticEvent> {
        if chunk[search_from..].contains(THINK_CLOSE) {
            return self.close_think(chunk);
        }
        if let Some(hold_from) = partial_tag_start(&chunk, THINK_CLOSE) {
            let held = chunk.split_off(hold_from);
            self.carry = held;
            if chunk.is_empty() {
                return vec![];
            }
            return vec![SemanticEvent::Reasoning(chunk)];
        }
        vec![SemanticEvent::Reasoning(chunk)]
    }

    fn close_think(&mut self, chunk: String) -> Vec<SemanticEvent> {
        self.inside_think = false;
        self.end_emitted = true;
        // The empty answer acts as the phase-handoff marker downstream.
        vec![
            SemanticEvent::Reasoning(chunk),
            SemanticEvent::EndOfReason,
            SemanticEvent::Answer(String::new()),
        ]
    }
}

/// Start index of the longest suffix of `s` that is a proper prefix of
/// `tag`, i.e. text that may become a tag once the next delta arrives.
fn partial_tag_start(s: &str, tag: &str) -> Option<usize> {
    let max_len = tag.len().saturating_sub(1).min(s.len());
    for take in (1..=max_len).rev() {
        let start = s.len() - take;
        if !s.is_char_boundary(start) {
            continue;
        }
        if tag.starts_with(&s[start..]) {
            return Some(start);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drive(extractor: &mut ReasoningExtractor, events: Vec<SemanticEvent>) -> Vec<SemanticEvent> {
        let mut out: Vec<SemanticEvent> = events
            .into_iter()
            .flat_map(|e| extractor.push(e))
            .collect();
        out.extend(extractor.finish());
        out
    }

    fn reasoning(text: &str) -> SemanticEvent {
        SemanticEvent::Reasoning(text.into())
    }

    fn answer(text: &str) -> SemanticEvent {
        SemanticEvent::Answer(text.into())
    }

    #[test]
    fn native_mode_marks_end_before_first_answer() {
        let mut ex = ReasoningExtractor::new(ExtractionMode::Native);
        let out = drive(
            &mut ex,
            vec![reasoning("Two plus two"), reasoning(" is four."), answer("4")],
        );
        assert_eq!(
            out,
            vec![
                reasoning("Two plus two"),
                reasoning(" is four."),
                SemanticEvent::EndOfReason,
                answer("4"),
            ]
        );
    }

    #[test]
    fn native_mode_emits_one_end_marker() {
        let mut ex = ReasoningExtractor::new(ExtractionMode::Native);
        let out = drive(&mut ex, vec![reasoning("a"), answer("b"), answer("c")]);
        let ends = out
            .iter()
            .filter(|e| matches!(e, SemanticEvent::EndOfReason))
            .count();
        assert_eq!(ends, 1);
    }

    #[test]
    fn native_mode_answer_without_reasoning_still_ends_reason_phase() {
        let mut ex = ReasoningExtractor::new(ExtractionMode::Native);
        let out = drive(&mut ex, vec![answer("hi")]);
        assert_eq!(out, vec![SemanticEvent::EndOfReason, answer("hi")]);
    }

    #[test]
    fn empty_deltas_are_skipped() {
        let mut ex = ReasoningExtractor::new(ExtractionMode::Native);
        assert!(ex.push(reasoning("")).is_empty());
        let mut ex = ReasoningExtractor::new(ExtractionMode::TagSniff);
        assert!(ex.push(answer("")).is_empty());
    }

    #[test]
    fn sniff_single_chunk_pair_yields_one_reasoning_and_handoff() {
        let mut ex = ReasoningExtractor::new(ExtractionMode::TagSniff);
        let out = drive(&mut ex, vec![answer("<think>hmm</think>")]);
        assert_eq!(
            out,
            vec![
                reasoning("<think>hmm</think>"),
                SemanticEvent::EndOfReason,
                answer(""),
            ]
        );
    }

    #[test]
    fn sniff_open_tag_split_across_deltas() {
        let mut ex = ReasoningExtractor::new(ExtractionMode::TagSniff);
        let out = drive(
            &mut ex,
            vec![answer("<thi"), answer("nk>hmm"), answer("</think>")],
        );
        assert_eq!(
            out,
            vec![
                reasoning("<think>hmm"),
                reasoning("</think>"),
                SemanticEvent::EndOfReason,
                answer(""),
            ]
        );
        let ends = out
            .iter()
            .filter(|e| matches!(e, SemanticEvent::EndOfReason))
            .count();
        assert_eq!(ends, 1);
    }

    #[test]
    fn sniff_close_tag_split_across_deltas() {
        let mut ex = ReasoningExtractor::new(ExtractionMode::TagSniff);
        let out = drive(
            &mut ex,
            vec![answer("<think>hmm</th"), answer("ink>done")],
        );
        assert_eq!(
            out,
            vec![
                reasoning("<think>hmm"),
                reasoning("</think>done"),
                SemanticEvent::EndOfReason,
                answer(""),
            ]
        );
    }

    #[test]
    fn sniff_plain_text_passes_through_as_answer() {
        let mut ex = ReasoningExtractor::new(ExtractionMode::TagSniff);
        let out = drive(&mut ex, vec![answer("hello"), answer(" world")]);
        assert_eq!(out, vec![answer("hello"), answer(" world")]);
    }

    #[test]
    fn sniff_reasoning_concatenation_is_contained_in_input() {
        let inputs = ["pre <think>a", "b", "c</think> post"];
        let mut ex = ReasoningExtractor::new(ExtractionMode::TagSniff);
        let raw: String = inputs.concat();
        let out = drive(&mut ex, inputs.iter().map(|s| answer(s)).collect());
        let reasoning_text: String = out
            .iter()
            .filter_map(|e| match e {
                SemanticEvent::Reasoning(t) => Some(t.as_str()),
                _ => None,
            })
            .collect();
        assert!(raw.contains(reasoning_text.trim_end_matches(" post")));
        // Everything between the tags ended up in the reasoning stream.
        assert!(reasoning_text.contains("<think>a"));
        assert!(reasoning_text.contains("b"));
        assert!(reasoning_text.contains("c</think>"));
    }

    #[test]
    fn sniff_no_reasoning_after_end_marker() {
        let mut ex = ReasoningExtractor::new(ExtractionMode::TagSniff);
        let out = drive(
            &mut ex,
            vec![answer("<think>a</think>"), answer("<think>again")],
        );
        let end_at = out
            .iter()
            .position(|e| matches!(e, SemanticEvent::EndOfReason))
            .expect("end marker");
        assert!(
            out[end_at + 1..]
                .iter()
                .all(|e| !matches!(e, SemanticEvent::Reasoning(_)))
        );
    }

    #[test]
    fn sniff_false_partial_tag_is_released() {
        let mut ex = ReasoningExtractor::new(ExtractionMode::TagSniff);
        let out = drive(&mut ex, vec![answer("a < b"), answer("and c")]);
        let text: String = out
            .iter()
            .filter_map(|e| match e {
                SemanticEvent::Answer(t) => Some(t.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(text, "a < band c");
    }

    #[test]
    fn done_terminates_and_flushes_carry() {
        let mut ex = ReasoningExtractor::new(ExtractionMode::TagSniff);
        let mut out = ex.push(answer("tail <thi"));
        out.extend(ex.push(SemanticEvent::Done));
        assert_eq!(
            out,
            vec![answer("tail "), answer("<thi"), SemanticEvent::Done]
        );
        // Terminated: further input is ignored.
        assert!(ex.push(answer("late")).is_empty());
    }

    #[test]
    fn extraction_is_deterministic_across_runs() {
        let trace = vec![
            answer("pre "),
            answer("<thi"),
            answer("nk>a"),
            answer("b</think>"),
            answer("post"),
            SemanticEvent::Done,
        ];
        let mut first = ReasoningExtractor::new(ExtractionMode::TagSniff);
        let mut second = ReasoningExtractor::new(ExtractionMode::TagSniff);
        let out_first = drive(&mut first, trace.clone());
        let out_second = drive(&mut second, trace);
        assert_eq!(out_first, out_second);
    }

    #[test]
    fn partial_tag_start_finds_longest_suffix() {
        assert_eq!(partial_tag_start("abc<thi", "<think>"), Some(3));
        assert_eq!(partial_tag_start("<", "<think>"), Some(0));
        assert_eq!(partial_tag_start("abc", "<think>"), None);
        // A full tag is not "partial".
        assert_eq!(partial_tag_start("x<think>", "<think>"), None);
    }
}

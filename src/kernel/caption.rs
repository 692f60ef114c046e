//! Caption pacing.
//!
//! Interviewer text arrives in bursts of arbitrary size. Words are queued as
//! they arrive and revealed one per interval while the AI is speaking, on a
//! single line of at most `max_line_words` words. A full line is replaced,
//! never wrapped.

use std::collections::VecDeque;
use tracing::debug;

use crate::config::CaptionConfig;
use crate::kernel::state::TurnState;
use crate::kernel::time::Millis;
use crate::kernel::timer::{Deadline, Interval};

pub struct CaptionPacer {
    config: CaptionConfig,
    queue: VecDeque<String>,
    line: Vec<String>,
    ticker: Interval,
    clear: Deadline,
    revealing: bool,
}

impl CaptionPacer {
    pub fn new(config: CaptionConfig) -> Self {
        let ticker = Interval::new(config.word_interval_ms);
        Self {
            config,
            queue: VecDeque::new(),
            line: Vec::new(),
            ticker,
            clear: Deadline::new(),
            revealing: false,
        }
    }

    /// Splits a burst on whitespace and queues the words. Returns how many.
    pub fn push_text(&mut self, chunk: &str) -> usize {
        let before = self.queue.len();
        self.queue
            .extend(chunk.split_whitespace().map(str::to_string));
        self.queue.len() - before
    }

    /// Starts revealing on entry to AI_SPEAKING; on exit stops the ticker and
    /// schedules clearing of whatever is left.
    pub fn sync(&mut self, state: TurnState, now: Millis) {
        let speaking = state == TurnState::AiSpeaking;
        if speaking && !self.revealing {
            self.revealing = true;
            self.clear.cancel();
            self.ticker.start(now);
        } else if !speaking && self.revealing {
            self.revealing = false;
            self.ticker.stop();
            if !self.line.is_empty() || !self.queue.is_empty() {
                self.clear.arm(now, self.config.clear_delay_ms);
            }
        }
    }

    pub fn next_tick(&self) -> Option<Millis> {
        self.ticker.next_fire()
    }

    pub fn clear_deadline(&self) -> Option<Millis> {
        self.clear.due()
    }

    /// Ticker fire: reveals at most one word. Returns the new line if it changed.
    pub fn on_tick(&mut self, now: Millis) -> Option<String> {
        self.ticker.poll(now)?;
        let word = self.queue.pop_front()?;
        if self.line.len() >= self.config.max_line_words {
            self.line.clear();
        }
        self.line.push(word);
        Some(self.line())
    }

    /// Clear-delay fire. Returns true if anything was removed.
    pub fn on_clear(&mut self, now: Millis) -> bool {
        if self.clear.poll(now).is_none() {
            return false;
        }
        self.clear_now()
    }

    /// Drops the line and the queue immediately (barge-in, disconnect).
    pub fn clear_now(&mut self) -> bool {
        self.clear.cancel();
        let had_content = !self.line.is_empty() || !self.queue.is_empty();
        if had_content {
            debug!(queued = self.queue.len(), "caption cleared");
        }
        self.line.clear();
        self.queue.clear();
        had_content
    }

    /// Cancels every timer and drops all text.
    pub fn reset(&mut self) -> bool {
        self.ticker.stop();
        self.revealing = false;
        self.clear_now()
    }

    pub fn line(&self) -> String {
        self.line.join(" ")
    }

    pub fn line_words(&self) -> usize {
        self.line.len()
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn is_revealing(&self) -> bool {
        self.revealing
    }
}

/// Light cosmetic fix-ups for display: capitalised first letter, standalone
/// `i` as `I`, and a space after `.`, `,` or `?` when a letter follows.
pub fn polish(text: &str) -> String {
    let mut spaced = String::with_capacity(text.len() + 8);
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        spaced.push(c);
        if matches!(c, '.' | ',' | '?') {
            if let Some(next) = chars.peek() {
                if next.is_alphabetic() {
                    spaced.push(' ');
                }
            }
        }
    }

    let words: Vec<String> = spaced
        .split(' ')
        .map(|w| if w == "i" { "I".to_string() } else { w.to_string() })
        .collect();
    let joined = words.join(" ");

    let mut out = String::with_capacity(joined.len());
    let mut chars = joined.chars();
    if let Some(first) = chars.next() {
        out.extend(first.to_uppercase());
        out.push_str(chars.as_str());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polish_fixes_common_issues() {
        assert_eq!(polish("i think so,yes i do"), "I think so, yes I do");
        assert_eq!(polish("what?okay."), "What? okay.");
        assert_eq!(polish(""), "");
    }

    #[test]
    fn push_text_splits_on_whitespace() {
        let mut pacer = CaptionPacer::new(CaptionConfig::default());
        assert_eq!(pacer.push_text("Tell "), 1);
        assert_eq!(pacer.push_text("  me about\nyourself "), 3);
        assert_eq!(pacer.push_text("   "), 0);
        assert_eq!(pacer.queued(), 4);
    }
}

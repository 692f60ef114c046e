use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Interviewer,
    Candidate,
}

/// One contiguous block of speech from a single party.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utterance {
    pub id: u64,
    pub role: Role,
    pub text: String,
    /// Interviewer utterances stay open while chunks stream in.
    pub open: bool,
}

/// Ordered, append-only record of the conversation.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    utterances: Vec<Utterance>,
    next_id: u64,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends to the open interviewer utterance, or opens a new one.
    pub fn append_interviewer(&mut self, chunk: &str) -> &Utterance {
        let extend = matches!(
            self.utterances.last(),
            Some(last) if last.role == Role::Interviewer && last.open
        );
        if !extend {
            self.push(Role::Interviewer, chunk.to_string(), true);
        } else if let Some(last) = self.utterances.last_mut() {
            last.text.push_str(chunk);
        }
        &self.utterances[self.utterances.len() - 1]
    }

    /// Adds a finished candidate utterance. Closes any open interviewer one.
    pub fn add_candidate(&mut self, text: &str) -> &Utterance {
        self.close_open();
        self.push(Role::Candidate, text.to_string(), false);
        &self.utterances[self.utterances.len() - 1]
    }

    /// Closes the trailing open utterance. Returns it if one was open.
    pub fn close_open(&mut self) -> Option<&Utterance> {
        let last = self.utterances.last_mut()?;
        if !last.open {
            return None;
        }
        last.open = false;
        Some(&*last)
    }

    fn push(&mut self, role: Role, text: String, open: bool) {
        self.next_id += 1;
        self.utterances.push(Utterance {
            id: self.next_id,
            role,
            text,
            open,
        });
    }

    pub fn utterances(&self) -> &[Utterance] {
        &self.utterances
    }

    pub fn last(&self) -> Option<&Utterance> {
        self.utterances.last()
    }

    pub fn len(&self) -> usize {
        self.utterances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.utterances.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_merge_into_open_interviewer_utterance() {
        let mut t = Transcript::new();
        t.append_interviewer("Tell ");
        t.append_interviewer("me ");
        t.append_interviewer("about yourself");
        assert_eq!(t.len(), 1);
        assert_eq!(t.utterances()[0].text, "Tell me about yourself");
        assert!(t.utterances()[0].open);
    }

    #[test]
    fn candidate_reply_closes_interviewer_turn() {
        let mut t = Transcript::new();
        t.append_interviewer("Hello.");
        t.add_candidate("Hi there");
        t.append_interviewer("Next question");
        assert_eq!(t.len(), 3);
        assert!(!t.utterances()[0].open);
        assert_eq!(t.utterances()[1].role, Role::Candidate);
        assert_eq!(t.utterances()[2].text, "Next question");
    }

    #[test]
    fn closed_interviewer_utterance_is_not_extended() {
        let mut t = Transcript::new();
        t.append_interviewer("First.");
        assert!(t.close_open().is_some());
        t.append_interviewer("Second.");
        assert_eq!(t.len(), 2);
        assert_eq!(t.utterances()[0].text, "First.");
    }
}

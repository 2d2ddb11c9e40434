use crate::validation::MESSAGE_MAX_CHARS;

/// Optional annotation attached to a tip. Input past the character budget is
/// truncated, so the stored text never exceeds it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageEditor {
    text: String,
}

impl MessageEditor {
    pub fn set_text(&mut self, text: &str) {
        self.text = text.chars().take(MESSAGE_MAX_CHARS).collect();
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn remaining(&self) -> usize {
        MESSAGE_MAX_CHARS - self.len()
    }

    pub fn as_option(&self) -> Option<&str> {
        match self.text.trim() {
            "" => None,
            _ => Some(&self.text),
        }
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }
}

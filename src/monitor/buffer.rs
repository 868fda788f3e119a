/// Accumulated text for one output stream of a monitored process.
///
/// Grows without bound between check-ins; `trim_to_tail` discards the
/// oldest content so at most `max_chars` characters are retained.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OutputBuffer {
    text: String,
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &str) {
        self.text.push_str(chunk);
    }

    /// Keep only the last `max_chars` characters.
    pub fn trim_to_tail(&mut self, max_chars: usize) {
        let total = self.text.chars().count();
        if total <= max_chars {
            return;
        }
        let skip = total - max_chars;
        let cut = self
            .text
            .char_indices()
            .nth(skip)
            .map(|(idx, _)| idx)
            .unwrap_or(self.text.len());
        self.text.drain(..cut);
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len_chars(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

/// True when `text` has something besides whitespace in it.
pub fn has_content(text: &str) -> bool {
    !text.trim().is_empty()
}

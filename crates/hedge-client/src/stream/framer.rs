//! Line framing over decoded text

/// Split `buffered + incoming` into complete lines and the unterminated rest.
///
/// Lines are returned without their `\n` terminator. A trailing `\r` is left
/// in place; frame parsing trims it.
pub fn split_lines(buffered: &str, incoming: &str) -> (Vec<String>, String) {
    let mut combined = String::with_capacity(buffered.len() + incoming.len());
    combined.push_str(buffered);
    combined.push_str(incoming);

    match combined.rfind('\n') {
        Some(last) => {
            let remainder = combined[last + 1..].to_string();
            let lines = combined[..last].split('\n').map(str::to_string).collect();
            (lines, remainder)
        }
        None => (Vec::new(), combined),
    }
}

/// Holds the partial line carried between chunks
#[derive(Debug, Default)]
pub struct LineFramer {
    pending: String,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed decoded text and take every line it completes.
    ///
    /// The pending tail never holds a `\n`, so only `text` is scanned and
    /// each byte is copied into the buffer once.
    pub fn push(&mut self, text: &str) -> Vec<String> {
        let Some(last) = text.rfind('\n') else {
            self.pending.push_str(text);
            return Vec::new();
        };
        self.pending.push_str(&text[..last]);
        let lines = self.pending.split('\n').map(str::to_string).collect();
        self.pending.clear();
        self.pending.push_str(&text[last + 1..]);
        lines
    }

    /// Take the unterminated tail at end of stream, if any
    pub fn take_remainder(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.pending))
        }
    }

    pub fn pending(&self) -> &str {
        &self.pending
    }
}

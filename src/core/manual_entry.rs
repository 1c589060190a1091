//! Manual code entry
//!
//! The fallback input path when the camera is unavailable or the user prefers
//! typing. Codes are trimmed and uppercased; nothing beyond non-emptiness is
//! validated here since payload interpretation belongs to the caller.

use crate::core::error::ManualEntryError;

/// Normalize a typed code: trim surrounding whitespace and uppercase
pub fn normalize_code(input: &str) -> Result<String, ManualEntryError> {
    let code = input.trim().to_uppercase();
    if code.is_empty() {
        return Err(ManualEntryError::Empty);
    }
    Ok(code)
}

/// Text buffer behind the manual-entry field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManualEntry {
    buffer: String,
}

impl ManualEntry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the buffer contents (mirrors a text field's change event)
    pub fn set_text(&mut self, text: &str) {
        self.buffer = text.to_string();
    }

    pub fn text(&self) -> &str {
        &self.buffer
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Whether the submit button should be enabled
    pub fn can_submit(&self) -> bool {
        !self.buffer.trim().is_empty()
    }

    /// Normalized code for the current buffer
    pub fn submit(&self) -> Result<String, ManualEntryError> {
        normalize_code(&self.buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_uppercases_and_trims() {
        assert_eq!(normalize_code("vip001").unwrap(), "VIP001");
        assert_eq!(normalize_code("  abc-12 \n").unwrap(), "ABC-12");
    }

    #[test]
    fn test_empty_codes_rejected() {
        assert_eq!(normalize_code(""), Err(ManualEntryError::Empty));
        assert_eq!(normalize_code("   \t"), Err(ManualEntryError::Empty));
    }

    #[test]
    fn test_buffer() {
        let mut entry = ManualEntry::new();
        assert!(!entry.can_submit());

        entry.set_text(" table7 ");
        assert!(entry.can_submit());
        assert_eq!(entry.text(), " table7 ");
        assert_eq!(entry.submit().unwrap(), "TABLE7");

        entry.clear();
        assert!(entry.submit().is_err());
    }
}

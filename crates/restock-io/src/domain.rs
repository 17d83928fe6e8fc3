//! Domain types for restock-io.

use crate::IoError;

/// A validated base name for output files.
///
/// Must match `[a-zA-Z0-9_-]+`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputName(String);

impl OutputName {
    /// Parse and validate an output name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidOutputName`] if the name is empty or
    /// contains characters outside `[a-zA-Z0-9_-]`.
    pub fn new(name: String) -> Result<Self, IoError> {
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(IoError::InvalidOutputName { name });
        }
        Ok(Self(name))
    }

    /// Return the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name for an artifact: `{name}_{suffix}`.
    pub(crate) fn file_name(&self, suffix: &str) -> String {
        format!("{}_{suffix}", self.0)
    }
}

impl std::fmt::Display for OutputName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_name_valid() {
        let name = OutputName::new("apotek-2024_q3".to_string()).unwrap();
        assert_eq!(name.as_str(), "apotek-2024_q3");
        assert_eq!(name.file_name("tree.dot"), "apotek-2024_q3_tree.dot");
    }

    #[test]
    fn output_name_rejects_empty() {
        let name = OutputName::new(String::new());
        assert!(matches!(name, Err(IoError::InvalidOutputName { .. })));
    }

    #[test]
    fn output_name_rejects_path_separators() {
        for bad in ["../escape", "a/b", "stock list"] {
            let name = OutputName::new(bad.to_string());
            assert!(matches!(name, Err(IoError::InvalidOutputName { .. })), "{bad}");
        }
    }
}

//! The backend turns a validated document into source text for a GPU shading
//! language. It never re-checks anything: the attachments recorded during
//! validation are trusted as they are, and whatever failed validation is
//! emitted as a best-effort placeholder.

pub mod targets;

#[derive(Debug, Clone)]
pub struct TranspileOptions {
    /// One level of indentation
    pub indent: String,
    /// Start the output with a generated-by comment
    pub header: bool,
}

impl Default for TranspileOptions {
    fn default() -> Self {
        Self {
            indent: "    ".to_string(),
            header: true,
        }
    }
}

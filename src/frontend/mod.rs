//! The frontend turns source text into a concrete syntax tree. Nothing here
//! knows about types or scopes: the lexer produces tokens, the parser arranges
//! them into generic [`cst::Node`] records, and the middle takes it from there.

use std::path::PathBuf;

use colored::Colorize;

pub use self::lexer::Span;

pub mod cst;
pub mod lexer;
pub mod parser;

#[derive(Debug)]
pub struct SourceFile {
    pub contents: String,
    pub origin: SourceFileOrigin,
}

impl SourceFile {
    pub fn from_memory(contents: impl Into<String>) -> Self {
        Self {
            contents: contents.into(),
            origin: SourceFileOrigin::Memory,
        }
    }

    pub fn value_of_span(&self, span: Span) -> &str {
        &self.contents[span.start..span.end]
    }

    /// 1-based line number of a byte offset
    pub fn row_for_position(&self, position: usize) -> usize {
        let position = position.min(self.contents.len());

        self.contents[..position].matches('\n').count() + 1
    }

    /// 1-based column of a byte offset
    pub fn column_for_position(&self, position: usize) -> usize {
        let position = position.min(self.contents.len());
        let line_start = self.contents[..position]
            .rfind('\n')
            .map(|n| n + 1)
            .unwrap_or(0);

        position - line_start + 1
    }

    pub fn format_span_position(&self, span: Span) -> String {
        format!(
            "{}:{}:{}",
            self.origin,
            self.row_for_position(span.start),
            self.column_for_position(span.start)
        )
    }

    /// Renders the line containing the start of `span` with the spanned range
    /// underlined. Spans crossing a line break are only underlined up to the
    /// end of their first line.
    pub fn highlight_span(&self, span: Span) -> String {
        let row = self.row_for_position(span.start);
        let column = self.column_for_position(span.start);

        let line = self.contents.lines().nth(row - 1).unwrap_or_default();
        let underline_length = span
            .end
            .saturating_sub(span.start)
            .min(line.len().saturating_sub(column - 1))
            .max(1);

        let gutter = format!("{row} | ");

        format!(
            "{}{}\n{}{}",
            gutter.blue(),
            line,
            " ".repeat(gutter.len() + column - 1),
            "^".repeat(underline_length).red()
        )
    }
}

#[derive(Debug)]
pub enum SourceFileOrigin {
    Memory,
    File(PathBuf),
}

impl core::fmt::Display for SourceFileOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceFileOrigin::Memory => f.write_str("<memory>"),
            SourceFileOrigin::File(path) => f.write_fmt(format_args!("{}", path.display())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_and_columns_are_one_based() {
        let source = SourceFile::from_memory("const a = 1;\nconst b = 2;\n");

        assert_eq!(source.row_for_position(0), 1);
        assert_eq!(source.column_for_position(0), 1);
        assert_eq!(source.row_for_position(19), 2);
        assert_eq!(source.column_for_position(19), 7);
        assert_eq!(source.format_span_position(Span::new(19, 20)), "<memory>:2:7");
    }

    #[test]
    fn test_highlight_span_underlines_the_range() {
        let source = SourceFile::from_memory("let value = 5.0;");

        let highlighted = strip_ansi_escapes::strip_str(source.highlight_span(Span::new(4, 9)));

        assert_eq!(highlighted, "1 | let value = 5.0;\n        ^^^^^");
    }
}

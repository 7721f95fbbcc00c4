//! Re-renders text containing ANSI SGR escape sequences as plain text, HTML or Markdown.
//!
//! ```
//! let html = ansi_render::to_html(b"\x1b[31merror:\x1b[0m disk full");
//! assert_eq!(html.0, "<span style=\"color:#cd0000\">error:</span> disk full");
//! ```
mod decoder;
mod definitions;
mod parser;
mod render;
mod tables;

pub use definitions::{OutputKind, ParseOutputKindError};
pub use parser::AnsiConverter;

/// Strips all escape sequences.
pub fn to_plain_text(input: &[u8]) -> String {
    convert(OutputKind::PlainText, input)
}

/// Converts to HTML in class mode; returns the markup and the style sheet it needs.
pub fn to_html(input: &[u8]) -> (String, String) {
    let mut converter = AnsiConverter::new(OutputKind::Html);
    converter.write(input);
    let html = converter.read();
    (html, converter.styles(false))
}

/// Converts to Markdown, keeping bold and italic.
pub fn to_markdown(input: &[u8]) -> String {
    convert(OutputKind::Markdown, input)
}

fn convert(kind: OutputKind, input: &[u8]) -> String {
    let mut converter = AnsiConverter::new(kind);
    converter.write(input);
    converter.read()
}

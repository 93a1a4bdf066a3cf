//! Boundary with the free-text program parser.
//!
//! Turning prose into an [`ImportDoc`] happens in an external service. The
//! core only consumes its output through [`TemplateParser`].

use crate::{ImportDoc, Result};

/// Turns a program description into a compressed import document.
///
/// `Ok(None)` means the parser understood the request but produced no
/// program; callers treat that as a failed import.
pub trait TemplateParser {
    fn parse(&self, text: &str) -> Result<Option<ImportDoc>>;
}

/// Reads the compressed JSON produced by the external parser.
///
/// Language-model output is often wrapped in a Markdown code fence, which is
/// stripped before decoding. Empty input and a bare `null` yield `None`.
#[derive(Clone, Copy, Debug, Default)]
pub struct CompressedJsonParser;

impl TemplateParser for CompressedJsonParser {
    fn parse(&self, text: &str) -> Result<Option<ImportDoc>> {
        let body = strip_code_fence(text);
        if body.is_empty() || body == "null" {
            tracing::warn!("Parser returned no program");
            return Ok(None);
        }

        let doc: Option<ImportDoc> = serde_json::from_str(body)?;
        if let Some(ref doc) = doc {
            tracing::debug!(
                "Parsed import document with {} templates and {} blocks",
                doc.templates.len(),
                doc.blocks.len()
            );
        }
        Ok(doc)
    }
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening fence line
    let rest = rest.find('\n').map_or("", |idx| &rest[idx + 1..]);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_json() {
        let doc = CompressedJsonParser
            .parse(r#"{"n": "Base", "b": []}"#)
            .unwrap()
            .unwrap();
        assert_eq!(doc.name.as_deref(), Some("Base"));
    }

    #[test]
    fn test_parse_fenced_json() {
        let text = "```json\n{\"n\": \"Fenced\"}\n```\n";
        let doc = CompressedJsonParser.parse(text).unwrap().unwrap();
        assert_eq!(doc.name.as_deref(), Some("Fenced"));
    }

    #[test]
    fn test_null_and_empty_yield_none() {
        assert!(CompressedJsonParser.parse("null").unwrap().is_none());
        assert!(CompressedJsonParser.parse("  \n").unwrap().is_none());
        assert!(CompressedJsonParser.parse("```json\nnull\n```").unwrap().is_none());
    }

    #[test]
    fn test_bad_cells_do_not_reject_document() {
        let text = r#"{
            "n": "Loose",
            "t": { "t1": { "n": "Push", "d": "Mon",
                           "e": [["Bench Press", 3, 8, 10, 70, 8], [42, 3]] } },
            "b": [ { "n": "Strength", "s": [ { "w": ["1"], "r": ["t1"] } ] } ]
        }"#;

        let doc = CompressedJsonParser.parse(text).unwrap().unwrap();
        assert_eq!(doc.name.as_deref(), Some("Loose"));
        let rows: Vec<_> = doc.templates["t1"].rows().collect();
        assert!(rows[0].is_ok());
        assert!(rows[1].is_err());
        let weeks: Vec<_> = doc.blocks[0].schedule[0].week_numbers().collect();
        assert_eq!(weeks, vec![Ok(1)]);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        assert!(CompressedJsonParser.parse("{ not json").is_err());
    }
}

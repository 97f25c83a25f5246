//! Header extraction shared by templates and pages.
//!
//! Both file kinds are laid out as a YAML header, a line holding only the
//! `====` separator, and a body.

use serde::de::DeserializeOwned;

/// Marker line separating the header from the body.
pub const SEPARATOR: &str = "====";

/// Split a document into its raw header and trimmed body.
///
/// Exactly one separator line is accepted.
pub fn split_document(source: &str) -> Result<(&str, &str), HeaderError> {
    let mut found: Option<(usize, usize)> = None;
    let mut count = 0;
    let mut offset = 0;

    for line in source.split_inclusive('\n') {
        if line.trim() == SEPARATOR {
            count += 1;
            if found.is_none() {
                found = Some((offset, offset + line.len()));
            }
        }
        offset += line.len();
    }

    match (found, count) {
        (None, _) => Err(HeaderError::Missing),
        (Some((start, end)), 1) => Ok((&source[..start], source[end..].trim())),
        (Some(_), n) => Err(HeaderError::Ambiguous(n)),
    }
}

/// Deserialize a header block, treating an empty block as all defaults.
pub fn parse_header<H>(header: &str) -> Result<H, HeaderError>
where
    H: DeserializeOwned + Default,
{
    if header.trim().is_empty() {
        return Ok(H::default());
    }

    serde_yaml::from_str(header).map_err(|e| HeaderError::InvalidYaml(e.to_string()))
}

/// Split a document and deserialize its header in one step.
pub fn parse_document<H>(source: &str) -> Result<(H, &str), HeaderError>
where
    H: DeserializeOwned + Default,
{
    let (header, body) = split_document(source)?;
    Ok((parse_header(header)?, body))
}

/// Errors that can occur when splitting or parsing a header.
#[derive(Debug, thiserror::Error)]
pub enum HeaderError {
    #[error("header missing - no `====` separator line")]
    Missing,

    #[error("header missing - expected one `====` separator line, found {0}")]
    Ambiguous(usize),

    #[error("Invalid YAML in header: {0}")]
    InvalidYaml(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct Header {
        #[serde(default)]
        name: String,
    }

    #[test]
    fn splits_header_and_body() {
        let source = "name: Main\n====\n\n<html>{{ content }}</html>\n\n";

        let (header, body) = split_document(source).unwrap();

        assert_eq!(header, "name: Main\n");
        assert_eq!(body, "<html>{{ content }}</html>");
    }

    #[test]
    fn separator_may_carry_surrounding_whitespace() {
        let (header, body) = split_document("name: A\n  ====  \r\nbody").unwrap();

        assert_eq!(header, "name: A\n");
        assert_eq!(body, "body");
    }

    #[test]
    fn separator_inside_a_line_does_not_count() {
        let result = split_document("name: A\nfoo ==== bar\n");

        assert!(matches!(result, Err(HeaderError::Missing)));
    }

    #[test]
    fn errors_without_separator() {
        let result = split_document("name: Main\n<html></html>");

        assert!(matches!(result, Err(HeaderError::Missing)));
    }

    #[test]
    fn errors_on_repeated_separator() {
        let result = split_document("name: A\n====\nbody\n====\nmore");

        assert!(matches!(result, Err(HeaderError::Ambiguous(2))));
    }

    #[test]
    fn empty_header_uses_defaults() {
        let (header, body): (Header, _) = parse_document("====\n# Hello").unwrap();

        assert_eq!(header, Header::default());
        assert_eq!(body, "# Hello");
    }

    #[test]
    fn parses_header_fields() {
        let (header, _): (Header, _) = parse_document("name: Main\n====\n").unwrap();

        assert_eq!(header.name, "Main");
    }

    #[test]
    fn errors_on_invalid_yaml() {
        let result: Result<(Header, &str), _> = parse_document("name: [oops\n====\nbody");

        assert!(matches!(result, Err(HeaderError::InvalidYaml(_))));
    }
}

//! SKILL.md parsing: header/body split, header validation, heading outline and
//! section extraction.

use std::fmt::Write;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::SkillError;
use crate::types::Header;

const DELIMITER: &str = "---";

/// Lines read past the opening delimiter before metadata-only parsing gives up.
const MAX_HEADER_LINES: usize = 100;

const MAX_HEADING_LEVEL: usize = 6;

/// A heading line found in a markdown body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadingNode<'a> {
    pub level: usize,
    pub label: &'a str,
    /// Zero-based line index in the body.
    pub line: usize,
}

/// Parse a heading line: 1-6 leading `#` after optional indentation.
#[must_use]
pub fn parse_heading(line: &str, index: usize) -> Option<HeadingNode<'_>> {
    let trimmed = line.trim_start();
    let level = trimmed.bytes().take_while(|&b| b == b'#').count();
    if level == 0 || level > MAX_HEADING_LEVEL {
        return None;
    }
    Some(HeadingNode {
        level,
        label: trimmed[level..].trim(),
        line: index,
    })
}

/// All headings of a body in document order.
pub fn headings(body: &str) -> impl Iterator<Item = HeadingNode<'_>> {
    body.lines()
        .enumerate()
        .filter_map(|(i, line)| parse_heading(line, i))
}

/// Split a document into its raw header block and trimmed body.
///
/// # Errors
///
/// Returns [`SkillError::InvalidFormat`] if the document does not open with a
/// `---` line or the closing delimiter is missing.
pub fn split_frontmatter(content: &str) -> Result<(String, String), SkillError> {
    let mut lines = content.lines().skip_while(|l| l.trim().is_empty());

    match lines.next() {
        Some(first) if first.trim() == DELIMITER => {}
        _ => {
            return Err(SkillError::InvalidFormat(
                "document must start with a '---' line".into(),
            ));
        }
    }

    let mut header = Vec::new();
    let mut closed = false;
    for line in lines.by_ref() {
        if line.trim() == DELIMITER {
            closed = true;
            break;
        }
        header.push(line);
    }

    if !closed {
        return Err(SkillError::InvalidFormat(
            "missing closing '---' delimiter".into(),
        ));
    }

    let body = lines.collect::<Vec<_>>().join("\n");
    Ok((header.join("\n"), body.trim().to_owned()))
}

/// Deserialize and validate a raw header block.
///
/// # Errors
///
/// Returns [`SkillError::InvalidFormat`] for malformed YAML, otherwise the
/// validation error from [`Header::validate`].
pub fn parse_header(block: &str) -> Result<Header, SkillError> {
    if block.trim().is_empty() {
        return Err(SkillError::MissingField("name"));
    }
    let header: Header = serde_yaml::from_str(block)
        .map_err(|e| SkillError::InvalidFormat(format!("invalid YAML header: {e}")))?;
    header.validate()?;
    Ok(header)
}

/// Parse a full document into its validated header and body.
///
/// # Errors
///
/// Returns an error if the delimiters are malformed or the header is invalid.
pub fn parse_document(content: &str) -> Result<(Header, String), SkillError> {
    let (block, body) = split_frontmatter(content)?;
    let header = parse_header(&block)?;
    Ok((header, body))
}

/// Read and parse a SKILL.md file. Invalid UTF-8 is replaced, not rejected.
///
/// # Errors
///
/// Returns an error if the file cannot be read or fails to parse.
pub fn parse_file(path: &Path) -> Result<(Header, String), SkillError> {
    let bytes = std::fs::read(path)?;
    parse_document(&String::from_utf8_lossy(&bytes))
}

/// Parse only the header of a SKILL.md file, stopping at the closing delimiter.
///
/// # Errors
///
/// Returns [`SkillError::InvalidFormat`] when the opening delimiter is missing,
/// the file ends before the closing one, or more than 100 lines pass without it.
pub fn parse_metadata_only(path: &Path) -> Result<Header, SkillError> {
    let reader = BufReader::new(File::open(path)?);
    let mut lines = reader.split(b'\n').map(|line| line.map(decode_line));

    loop {
        match lines.next().transpose()? {
            Some(line) if line.trim().is_empty() => {}
            Some(line) if line.trim() == DELIMITER => break,
            _ => {
                return Err(SkillError::InvalidFormat(
                    "document must start with a '---' line".into(),
                ));
            }
        }
    }

    let mut block = String::new();
    let mut read = 0;
    loop {
        let Some(line) = lines.next().transpose()? else {
            return Err(SkillError::InvalidFormat(
                "missing closing '---' delimiter".into(),
            ));
        };
        if line.trim() == DELIMITER {
            break;
        }
        read += 1;
        if read > MAX_HEADER_LINES {
            return Err(SkillError::InvalidFormat(format!(
                "no closing '---' delimiter within {MAX_HEADER_LINES} lines"
            )));
        }
        block.push_str(&line);
        block.push('\n');
    }

    parse_header(&block)
}

/// Lossy line decoding matching [`parse_file`], so both paths see the same header.
fn decode_line(bytes: Vec<u8>) -> String {
    let mut line = String::from_utf8(bytes)
        .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned());
    if line.ends_with('\r') {
        line.pop();
    }
    line
}

/// Flattened heading outline: one line per heading, indented two spaces per
/// level below 1. Empty when the body has no headings.
#[must_use]
pub fn extract_outline(body: &str) -> String {
    let mut out = String::new();
    for (i, line) in body.lines().enumerate() {
        let Some(heading) = parse_heading(line, i) else {
            continue;
        };
        if !out.is_empty() {
            out.push('\n');
        }
        let _ = write!(
            out,
            "{:indent$}{}",
            "",
            line.trim(),
            indent = 2 * (heading.level - 1)
        );
    }
    out
}

/// Extract the first section whose heading label matches `heading`
/// (case-insensitive), including nested deeper headings and stopping before
/// the next heading of the same or higher level. Empty when nothing matches.
#[must_use]
pub fn extract_section(body: &str, heading: &str) -> String {
    let wanted = heading.trim().to_lowercase();
    let mut section: Vec<&str> = Vec::new();
    let mut level = None;

    for (i, line) in body.lines().enumerate() {
        let node = parse_heading(line, i);
        match (level, node) {
            (Some(l), Some(node)) if node.level <= l => break,
            (Some(_), _) => section.push(line),
            (None, Some(node)) if node.label.to_lowercase() == wanted => {
                level = Some(node.level);
                section.push(line);
            }
            (None, _) => {}
        }
    }

    section.join("\n").trim().to_owned()
}

//! Removal of a leading heading that repeats the page title.
//!
//! The rewrite pipeline calls this only in the pass that converts a page's
//! front matter. Stripping is not idempotent on its own.

use std::path::Path;

use pulldown_cmark::{Event, Options, Parser, Tag};

use crate::frontmatter::{split_block, yaml_title, YAML_DELIMITER};
use crate::OperationError;

/// Drop the body's first heading when its text equals the front matter
/// `title`, along with one blank line following it.
pub fn strip_redundant_heading(content: &str, path: &Path) -> Result<String, OperationError> {
    let Some(title) = yaml_title(content, path)? else {
        return Ok(content.to_string());
    };
    let Some(block) = split_block(content, YAML_DELIMITER, path)? else {
        return Ok(content.to_string());
    };
    let body_start = content.len() - block.rest.len();
    let body = block.rest;

    let Some((range, text)) = first_heading(body) else {
        return Ok(content.to_string());
    };
    if text.trim() != title.trim() {
        return Ok(content.to_string());
    }

    let start = body[..range.start].rfind('\n').map_or(0, |idx| idx + 1);
    let mut end = line_end(body, range.end.saturating_sub(1).max(range.start));
    let next = line_end(body, end);
    if end < body.len() && body[end..next].trim().is_empty() {
        end = next;
    }

    let mut stripped = String::with_capacity(content.len());
    stripped.push_str(&content[..body_start + start]);
    stripped.push_str(&body[end..]);
    Ok(stripped)
}

fn first_heading(body: &str) -> Option<(std::ops::Range<usize>, String)> {
    let parser = Parser::new_ext(body, Options::all());
    let mut start: Option<std::ops::Range<usize>> = None;
    let mut text = String::new();

    for (event, range) in parser.into_offset_iter() {
        match event {
            Event::Start(Tag::Heading(..)) if start.is_none() => start = Some(range),
            Event::Text(fragment) | Event::Code(fragment) if start.is_some() => {
                text.push_str(&fragment)
            }
            Event::End(Tag::Heading(..)) if start.is_some() => break,
            _ => {}
        }
    }
    start.map(|range| (range, text))
}

/// Offset just past the newline ending the line that contains `byte`.
fn line_end(text: &str, byte: usize) -> usize {
    if byte >= text.len() {
        return text.len();
    }
    text[byte..]
        .find('\n')
        .map_or(text.len(), |idx| byte + idx + 1)
}

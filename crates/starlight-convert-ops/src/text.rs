use regex::{Captures, Regex};

/// Compute byte offsets for the start of each line within the provided contents.
pub(crate) fn compute_line_offsets(contents: &str) -> Vec<usize> {
    let mut offsets = Vec::new();
    offsets.push(0);
    for (idx, ch) in contents.char_indices() {
        if ch == '\n' {
            offsets.push(idx + 1);
        }
    }
    offsets
}

/// Convert a byte offset into a 1-based line number using the provided offsets.
pub(crate) fn byte_to_line(byte: usize, offsets: &[usize]) -> usize {
    match offsets.binary_search(&byte) {
        Ok(idx) => idx + 1,
        Err(idx) => idx,
    }
}

/// The full line containing `byte`, without its terminator.
pub(crate) fn line_at(contents: &str, byte: usize) -> &str {
    let start = contents[..byte].rfind('\n').map_or(0, |idx| idx + 1);
    let end = contents[byte..]
        .find('\n')
        .map_or(contents.len(), |idx| byte + idx);
    contents[start..end].trim_end_matches('\r')
}

/// Like [`Regex::replace_all`], but the replacement may fail and abort the rewrite.
pub(crate) fn try_replace_all<E>(
    pattern: &Regex,
    text: &str,
    mut replacement: impl FnMut(&Captures<'_>) -> Result<String, E>,
) -> Result<String, E> {
    let mut output = String::with_capacity(text.len());
    let mut last = 0;
    for captures in pattern.captures_iter(text) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        output.push_str(&text[last..whole.start()]);
        output.push_str(&replacement(&captures)?);
        last = whole.end();
    }
    output.push_str(&text[last..]);
    Ok(output)
}

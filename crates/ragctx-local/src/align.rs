//! Recover the page paragraphs a search snippet was cut from.
//!
//! Search engines join non-adjacent excerpts with `...`. Each excerpt that is long enough to
//! be distinctive is located verbatim in the page and widened to its enclosing line.

/// Fragments with this many words or fewer are too generic to anchor a match.
pub const MIN_FRAGMENT_WORDS: usize = 5;

/// Split a snippet on `...`, keeping trimmed fragments of more than [`MIN_FRAGMENT_WORDS`] words.
pub fn snippet_fragments(snippet: &str) -> Vec<&str> {
    snippet
        .split("...")
        .map(str::trim)
        .filter(|s| s.split_whitespace().count() > MIN_FRAGMENT_WORDS)
        .collect()
}

/// Paragraphs of `doc` containing the snippet fragments, deduplicated, joined by `\n`.
pub fn collect_context(snippet: &str, doc: &str) -> String {
    let fragments = snippet_fragments(snippet);
    if fragments.is_empty() || doc.is_empty() {
        return String::new();
    }
    // Same byte length as `doc`, so offsets carry over.
    let flat = doc.replace('\n', " ");
    let bytes = doc.as_bytes();

    let mut paras: Vec<&str> = Vec::new();
    for frag in fragments {
        let Some(pos) = flat.find(frag) else {
            continue;
        };
        let mut start = pos;
        while start > 0 && bytes[start] != b'\n' {
            start -= 1;
        }
        let mut end = pos + frag.len();
        while end < bytes.len() && bytes[end] != b'\n' {
            end += 1;
        }
        let para = doc[start..end].trim();
        if !paras.contains(&para) {
            paras.push(para);
        }
    }
    paras.join("\n")
}

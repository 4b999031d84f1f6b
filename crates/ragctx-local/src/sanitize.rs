//! Query normalization.
//!
//! Not applied on the search path unless the pipeline asks for it.

use regex::Regex;
use std::sync::LazyLock;

static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s]").unwrap());
static CONTROL_WS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\t\r\f\v\n]").unwrap());
static WS_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Replace punctuation and control whitespace with spaces, collapse runs, trim.
pub fn sanitize_query(query: &str) -> String {
    let s = NON_WORD.replace_all(query, " ");
    let s = CONTROL_WS.replace_all(&s, " ");
    WS_RUN.replace_all(&s, " ").trim().to_string()
}

//! Turn per-item outcomes into the ordered context list.

use crate::pipeline::PipelineMode;
use ragctx_core::{Context, ContextDocument, FetchOutcome, SearchResultItem};

pub const DEFAULT_TITLE: &str = "No title.";
pub const NO_SNIPPET: &str = "[NO_SNIPPET] Search result has no description";
pub const DIRECT_EMPTY: &str = "No snippet available.";
pub const RENDER_EMPTY: &str = "[ERROR] No summary generated";

const FILTERED_PREVIEW_CHARS: usize = 80;

/// Placeholder for an item whose outcome carried no text.
pub fn placeholder(mode: PipelineMode, item: &SearchResultItem) -> String {
    match mode {
        PipelineMode::SnippetOnly => match item.snippet.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => {
                let preview: String = s.chars().take(FILTERED_PREVIEW_CHARS).collect();
                format!("[FILTERED_OUT] Snippet too short: {preview}")
            }
            _ => NO_SNIPPET.to_string(),
        },
        PipelineMode::Direct => DIRECT_EMPTY.to_string(),
        PipelineMode::Render => RENDER_EMPTY.to_string(),
    }
}

/// Raw context text for one outcome, before placeholders are applied.
fn raw_context(item: &SearchResultItem, outcome: FetchOutcome) -> String {
    match outcome {
        FetchOutcome::Content(c) => c.trim().to_string(),
        FetchOutcome::Miss => String::new(),
        FetchOutcome::Failed(f) => {
            let mut s = f.to_string();
            let link = item.link_str().trim();
            if !link.is_empty() && !s.contains(link) {
                s.push_str("\nURL: ");
                s.push_str(link);
            }
            s
        }
    }
}

/// Build one context, or `None` when the item has neither a title nor any context text.
pub fn build_context(
    mode: PipelineMode,
    item: &SearchResultItem,
    outcome: FetchOutcome,
) -> Option<Context> {
    let title = item.title_str().trim();
    let context = raw_context(item, outcome);
    if title.is_empty() && context.is_empty() {
        return None;
    }
    Some(Context {
        title: if title.is_empty() {
            DEFAULT_TITLE.to_string()
        } else {
            title.to_string()
        },
        contents: if context.is_empty() {
            placeholder(mode, item)
        } else {
            context
        },
    })
}

/// Pair items with outcomes by index. Output keeps input order and never grows.
pub fn assemble(
    mode: PipelineMode,
    items: &[SearchResultItem],
    outcomes: Vec<FetchOutcome>,
) -> Vec<ContextDocument> {
    items
        .iter()
        .zip(outcomes)
        .filter_map(|(item, outcome)| build_context(mode, item, outcome))
        .map(Context::into_document)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use ragctx_core::FailureKind;

    fn item(title: Option<&str>, link: Option<&str>, snippet: Option<&str>) -> SearchResultItem {
        SearchResultItem {
            title: title.map(str::to_string),
            link: link.map(str::to_string),
            snippet: snippet.map(str::to_string),
        }
    }

    #[test]
    fn direct_miss_uses_direct_placeholder() {
        let docs = assemble(
            PipelineMode::Direct,
            &[item(Some("Example"), Some("http://x"), Some("a b c"))],
            vec![FetchOutcome::Miss],
        );
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].contents(), "\"Example\"\nNo snippet available.");
    }

    #[test]
    fn snippet_only_distinguishes_absent_from_filtered() {
        let absent = item(Some("T"), None, None);
        assert_eq!(placeholder(PipelineMode::SnippetOnly, &absent), NO_SNIPPET);

        let short = item(Some("T"), None, Some("one two three"));
        assert_eq!(
            placeholder(PipelineMode::SnippetOnly, &short),
            "[FILTERED_OUT] Snippet too short: one two three"
        );

        let long = "x".repeat(200);
        let p = placeholder(PipelineMode::SnippetOnly, &item(None, None, Some(&long)));
        assert_eq!(p, format!("[FILTERED_OUT] Snippet too short: {}", "x".repeat(80)));
    }

    #[test]
    fn render_empty_summary_placeholder() {
        let docs = assemble(
            PipelineMode::Render,
            &[item(None, Some("https://a/"), None)],
            vec![FetchOutcome::Content("   ".into())],
        );
        assert!(docs.is_empty(), "no title and no context: {docs:?}");

        let docs = assemble(
            PipelineMode::Render,
            &[item(Some("T"), Some("https://a/"), None)],
            vec![FetchOutcome::Content(String::new())],
        );
        assert_eq!(docs[0].contents(), "\"T\"\n[ERROR] No summary generated");
    }

    #[test]
    fn failures_get_url_appended_once() {
        let it = item(None, Some("https://a.example/p"), None);
        let without = FetchOutcome::failed(FailureKind::FetchFailed, "gave up after 3 attempts: x");
        let docs = assemble(PipelineMode::Render, &[it.clone()], vec![without]);
        assert_eq!(
            docs[0].contents(),
            "\"No title.\"\n[FETCH_FAILED] gave up after 3 attempts: x\nURL: https://a.example/p"
        );

        let with = FetchOutcome::failed(
            FailureKind::SummaryFailed,
            "https://a.example/p: llm failed: HTTP 429",
        );
        let docs = assemble(PipelineMode::Render, &[it], vec![with]);
        assert_eq!(
            docs[0].contents(),
            "\"No title.\"\n[SUMMARY_FAILED] https://a.example/p: llm failed: HTTP 429"
        );
    }

    #[test]
    fn untitled_items_with_content_keep_default_title() {
        let docs = assemble(
            PipelineMode::SnippetOnly,
            &[item(Some("  "), None, Some("s"))],
            vec![FetchOutcome::Content("body".into())],
        );
        assert_eq!(docs[0].contents(), "\"No title.\"\nbody");
    }

    fn arb_item() -> impl Strategy<Value = (SearchResultItem, FetchOutcome)> {
        let opt = || proptest::option::of("[a-z ]{0,6}");
        (opt(), opt(), opt(), 0u8..3, "[a-z ]{0,6}").prop_map(|(t, l, s, k, body)| {
            let outcome = match k {
                0 => FetchOutcome::Content(body),
                1 => FetchOutcome::Miss,
                _ => FetchOutcome::failed(FailureKind::FetchError, body),
            };
            (
                SearchResultItem {
                    title: t,
                    link: l,
                    snippet: s,
                },
                outcome,
            )
        })
    }

    fn arb_tagged() -> impl Strategy<Value = (bool, u8, String)> {
        (any::<bool>(), 0u8..3, "[a-z ]{0,4}")
    }

    proptest! {
        #[test]
        fn output_is_an_ordered_subsequence(pairs in proptest::collection::vec(arb_item(), 0..12)) {
            let (items, outcomes): (Vec<_>, Vec<_>) = pairs.into_iter().unzip();
            let expected: Vec<ContextDocument> = items
                .iter()
                .zip(outcomes.clone())
                .filter_map(|(i, o)| build_context(PipelineMode::Direct, i, o))
                .map(Context::into_document)
                .collect();
            let docs = assemble(PipelineMode::Direct, &items, outcomes);
            prop_assert!(docs.len() <= items.len());
            prop_assert_eq!(&docs, &expected);
            for d in &docs {
                prop_assert!(d.contents().starts_with('"'));
                prop_assert!(!d.contents().starts_with("\"\"\n"));
            }
        }

        #[test]
        fn kept_items_appear_in_input_order(specs in proptest::collection::vec(arb_tagged(), 0..16)) {
            // Titled items carry their input index; untitled ones carry it in the body.
            let mut items = Vec::new();
            let mut outcomes = Vec::new();
            let mut expected_kept = Vec::new();
            for (idx, (titled, kind, body)) in specs.iter().enumerate() {
                let tag = format!("#{idx}");
                items.push(SearchResultItem {
                    title: titled.then(|| tag.clone()),
                    link: None,
                    snippet: None,
                });
                let outcome = match kind {
                    0 if body.trim().is_empty() => FetchOutcome::Content(String::new()),
                    0 => FetchOutcome::Content(format!("{tag} {body}")),
                    1 => FetchOutcome::Miss,
                    _ => FetchOutcome::failed(FailureKind::FetchError, tag.clone()),
                };
                let has_context = match &outcome {
                    FetchOutcome::Content(c) => !c.trim().is_empty(),
                    FetchOutcome::Miss => false,
                    FetchOutcome::Failed(_) => true,
                };
                if *titled || has_context {
                    expected_kept.push(idx);
                }
                outcomes.push(outcome);
            }

            let docs = assemble(PipelineMode::Direct, &items, outcomes);
            let seen: Vec<usize> = docs
                .iter()
                .map(|d| {
                    let c = d.contents();
                    let at = c.find('#').expect("every kept doc carries its tag");
                    c[at + 1..]
                        .chars()
                        .take_while(|ch| ch.is_ascii_digit())
                        .collect::<String>()
                        .parse()
                        .expect("tag index")
                })
                .collect();
            prop_assert_eq!(&seen, &expected_kept);
            prop_assert!(seen.windows(2).all(|w| w[0] < w[1]));
        }
    }
}

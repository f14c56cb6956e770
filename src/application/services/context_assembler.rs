use serde::{Deserialize, Serialize};

use crate::domain::Document;

const SEGMENT_SEPARATOR: &str = "\n";

/// Upper bound on the assembled context, in characters.
///
/// `max_chars: None` keeps every document in the context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextBudget {
    pub max_chars: Option<usize>,
}

impl ContextBudget {
    pub const fn unbounded() -> Self {
        Self { max_chars: None }
    }

    pub const fn chars(max_chars: usize) -> Self {
        Self {
            max_chars: Some(max_chars),
        }
    }
}

/// Context text plus a record of which documents made it in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssembledContext {
    pub text: String,
    pub included: usize,
    pub skipped: usize,
}

/// Concatenate every document into one context block, preserving order.
pub fn assemble_context(documents: &[Document]) -> String {
    documents
        .iter()
        .map(segment)
        .collect::<Vec<_>>()
        .join(SEGMENT_SEPARATOR)
}

/// Assemble a context that respects `budget`.
///
/// Documents for which `is_relevant` holds are admitted first, then the
/// rest, each group in corpus order. A segment that would overflow the
/// budget is skipped whole; smaller documents after it may still fit.
pub fn assemble_with_budget<F>(
    documents: &[Document],
    budget: ContextBudget,
    is_relevant: F,
) -> AssembledContext
where
    F: Fn(&Document) -> bool,
{
    let Some(max_chars) = budget.max_chars else {
        return AssembledContext {
            text: assemble_context(documents),
            included: documents.len(),
            skipped: 0,
        };
    };

    let (relevant, rest): (Vec<&Document>, Vec<&Document>) =
        documents.iter().partition(|doc| is_relevant(*doc));

    let separator_chars = SEGMENT_SEPARATOR.chars().count();
    let mut segments: Vec<String> = Vec::new();
    let mut used = 0usize;
    let mut skipped = 0usize;

    for doc in relevant.into_iter().chain(rest) {
        let candidate = segment(doc);
        let cost = candidate.chars().count()
            + if segments.is_empty() {
                0
            } else {
                separator_chars
            };

        if used + cost > max_chars {
            skipped += 1;
            continue;
        }

        used += cost;
        segments.push(candidate);
    }

    AssembledContext {
        included: segments.len(),
        text: segments.join(SEGMENT_SEPARATOR),
        skipped,
    }
}

fn segment(doc: &Document) -> String {
    format!("Document: {}\nContent: {}\n---", doc.name, doc.content)
}

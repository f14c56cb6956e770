use ahash::AHashSet;
use serde::{Deserialize, Serialize};

use crate::domain::{Document, SourceAttribution};

/// Maximum number of sources attached to an answer.
pub const MAX_SOURCES: usize = 5;
/// Confidence assigned to every matched source in [`ConfidenceMode::Fixed`].
pub const FIXED_CONFIDENCE: f32 = 0.8;
/// Length of the content preview, in characters.
pub const EXCERPT_CHARS: usize = 200;
pub const EXCERPT_MARKER: &str = "...";

/// Tokens this short are treated as stop-words ("the", "and", "is").
const MAX_STOP_WORD_CHARS: usize = 3;

/// How a matched document's confidence is derived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConfidenceMode {
    /// Every match scores [`FIXED_CONFIDENCE`]; sources keep corpus order.
    #[default]
    Fixed,
    /// Score by the share of query tokens found in the document and rank
    /// by that score. This changes ranking relative to `Fixed`.
    TermOverlap,
}

/// Lower-cased query terms that take part in matching.
///
/// Splits on whitespace, trims surrounding punctuation and drops stop-word
/// sized tokens. Duplicates are removed, first occurrence wins.
pub fn query_tokens(query: &str) -> Vec<String> {
    let mut seen = AHashSet::new();
    query
        .to_lowercase()
        .split_whitespace()
        .map(|raw| raw.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|token| token.chars().count() > MAX_STOP_WORD_CHARS)
        .filter(|token| seen.insert(token.to_string()))
        .map(str::to_string)
        .collect()
}

/// Number of distinct `tokens` contained (as substrings) in the document.
pub fn matched_tokens(tokens: &[String], doc: &Document) -> usize {
    if tokens.is_empty() {
        return 0;
    }
    let haystack = doc.content.to_lowercase();
    tokens
        .iter()
        .filter(|token| haystack.contains(token.as_str()))
        .count()
}

/// Rank the documents that look like sources for `query`.
///
/// At most [`MAX_SOURCES`] entries are returned. The result is independent of
/// whatever the answer generator actually cited.
pub fn score_sources(
    query: &str,
    documents: &[Document],
    mode: ConfidenceMode,
) -> Vec<SourceAttribution> {
    let tokens = query_tokens(query);
    if tokens.is_empty() {
        return Vec::new();
    }

    let mut candidates: Vec<(&Document, f32)> = documents
        .iter()
        .filter_map(|doc| {
            let hits = matched_tokens(&tokens, doc);
            (hits > 0).then(|| (doc, confidence_for(mode, hits, tokens.len())))
        })
        .collect();

    if mode == ConfidenceMode::TermOverlap {
        // sort_by is stable, ties keep corpus order
        candidates.sort_by(|a, b| b.1.total_cmp(&a.1));
    }

    candidates
        .into_iter()
        .take(MAX_SOURCES)
        .map(|(doc, confidence)| SourceAttribution {
            document_id: doc.id,
            document_name: doc.name.clone(),
            relevant_text: excerpt(&doc.content),
            confidence,
        })
        .collect()
}

/// Preview of the first [`EXCERPT_CHARS`] characters plus a marker.
pub fn excerpt(content: &str) -> String {
    let mut preview: String = content.chars().take(EXCERPT_CHARS).collect();
    preview.push_str(EXCERPT_MARKER);
    preview
}

fn confidence_for(mode: ConfidenceMode, hits: usize, total: usize) -> f32 {
    match mode {
        ConfidenceMode::Fixed => FIXED_CONFIDENCE,
        ConfidenceMode::TermOverlap => {
            let share = hits as f32 / total.max(1) as f32;
            (0.5 + 0.5 * share).clamp(0.0, 1.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Visibility;

    fn doc(name: &str, content: &str) -> Document {
        Document::new(name, content, "txt", "p1", "alice", Visibility::Private)
    }

    #[test]
    fn tokens_drop_short_words_and_punctuation() {
        assert_eq!(query_tokens("What is the budget?"), vec!["what", "budget"]);
        assert!(query_tokens("is it ok").is_empty());
        assert!(query_tokens("   ").is_empty());
    }

    #[test]
    fn tokens_are_deduplicated() {
        assert_eq!(query_tokens("Plan PLAN plan, roadmap"), vec!["plan", "roadmap"]);
    }

    #[test]
    fn budget_question_finds_budget_document() {
        let docs = vec![doc("Budget.txt", "Total budget is $5000 for Q1")];

        let sources = score_sources("What is the budget?", &docs, ConfidenceMode::Fixed);

        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].document_name, "Budget.txt");
        assert_eq!(sources[0].document_id, docs[0].id);
        assert_eq!(sources[0].confidence, 0.8);
    }

    #[test]
    fn matching_is_substring_containment() {
        let docs = vec![doc("Budgets.txt", "Quarterly BUDGETING notes")];

        let sources = score_sources("budget", &docs, ConfidenceMode::Fixed);

        assert_eq!(sources.len(), 1);
    }

    #[test]
    fn stop_word_only_query_has_no_sources() {
        let docs = vec![doc("Notes.txt", "Meeting went well")];

        assert!(score_sources("is it ok", &docs, ConfidenceMode::Fixed).is_empty());
    }

    #[test]
    fn non_matching_documents_never_appear() {
        let docs = vec![
            doc("Budget.txt", "Total budget is $5000"),
            doc("Recipe.txt", "Flour and water"),
        ];

        let sources = score_sources("budget totals", &docs, ConfidenceMode::Fixed);

        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].document_name, "Budget.txt");
    }

    #[test]
    fn sources_are_capped_in_corpus_order() {
        let docs: Vec<Document> = (0..10)
            .map(|i| doc(&format!("doc-{i}.txt"), "the project status"))
            .collect();

        let sources = score_sources("project", &docs, ConfidenceMode::Fixed);

        let names: Vec<&str> = sources.iter().map(|s| s.document_name.as_str()).collect();
        assert_eq!(
            names,
            vec!["doc-0.txt", "doc-1.txt", "doc-2.txt", "doc-3.txt", "doc-4.txt"]
        );
        assert!(sources.iter().all(|s| s.confidence == FIXED_CONFIDENCE));
    }

    #[test]
    fn excerpt_is_first_200_chars_plus_marker() {
        let long = "a".repeat(150) + &"b".repeat(150) + " budget";
        let docs = vec![doc("Long.txt", &long)];

        let sources = score_sources("budget", &docs, ConfidenceMode::Fixed);

        let expected: String = long.chars().take(200).collect::<String>() + "...";
        assert_eq!(sources[0].relevant_text, expected);
        assert!(!sources[0].relevant_text.contains("budget"));
    }

    #[test]
    fn excerpt_marks_short_content_too() {
        assert_eq!(excerpt("short"), "short...");
        assert_eq!(excerpt("héllo wörld").chars().count(), 14);
    }

    #[test]
    fn term_overlap_ranks_fuller_matches_first() {
        let docs = vec![
            doc("Partial.txt", "budget only"),
            doc("Full.txt", "budget forecast for the quarter"),
        ];

        let sources = score_sources("budget forecast", &docs, ConfidenceMode::TermOverlap);

        assert_eq!(sources[0].document_name, "Full.txt");
        assert_eq!(sources[0].confidence, 1.0);
        assert_eq!(sources[1].confidence, 0.75);
    }
}

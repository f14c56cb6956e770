use std::sync::Arc;

use parking_lot::RwLock;

use crate::domain::SearchResult;

/// Holder for the most recent successful answer.
///
/// Results are swapped in whole behind an `Arc`, so readers see either the
/// previous result or the new one, never a mix.
#[derive(Default)]
pub struct ResultSlot {
    current: RwLock<Option<Arc<SearchResult>>>,
}

impl ResultSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, result: SearchResult) -> Arc<SearchResult> {
        let shared = Arc::new(result);
        *self.current.write() = Some(Arc::clone(&shared));
        shared
    }

    pub fn latest(&self) -> Option<Arc<SearchResult>> {
        self.current.read().clone()
    }

    pub fn clear(&self) {
        *self.current.write() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(answer: &str) -> SearchResult {
        SearchResult {
            answer: answer.into(),
            sources: Vec::new(),
        }
    }

    #[test]
    fn publish_replaces_previous_result() {
        let slot = ResultSlot::new();
        assert!(slot.latest().is_none());

        let first = slot.publish(result("first"));
        let held = slot.latest().unwrap();
        slot.publish(result("second"));

        assert_eq!(held.answer, "first");
        assert!(Arc::ptr_eq(&first, &held));
        assert_eq!(slot.latest().unwrap().answer, "second");

        slot.clear();
        assert!(slot.latest().is_none());
    }
}

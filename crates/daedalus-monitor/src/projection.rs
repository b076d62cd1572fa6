use std::collections::HashSet;

use crate::event::{StreamEvent, TokenUsage};

/// What a single `ViewState::project` call changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Projection {
    /// The event was new and appended to the log.
    pub appended: bool,
    /// The author started a new stage entry.
    pub stage_entered: bool,
}

/// Event log and stage sequence for one run.
///
/// Both collections are append-only; a new run starts from a fresh value.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct ViewState {
    events: Vec<StreamEvent>,
    stages: Vec<String>,
    #[serde(skip)]
    seen_ids: HashSet<String>,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one event.
    ///
    /// An event whose id is already logged is dropped entirely, so it does
    /// not touch the stage sequence either.
    pub fn project(&mut self, event: StreamEvent) -> Projection {
        if self.seen_ids.contains(&event.id) {
            return Projection::default();
        }
        let stage_entered = self.stages.last() != Some(&event.author);
        if stage_entered {
            self.stages.push(event.author.clone());
        }
        self.seen_ids.insert(event.id.clone());
        self.events.push(event);
        Projection {
            appended: true,
            stage_entered,
        }
    }

    pub fn events(&self) -> &[StreamEvent] {
        &self.events
    }

    pub fn stages(&self) -> &[String] {
        &self.stages
    }

    /// Stage currently running (last author seen).
    pub fn current_stage(&self) -> Option<&str> {
        self.stages.last().map(String::as_str)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seen_ids.contains(id)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Token usage summed over every logged event.
    pub fn total_usage(&self) -> TokenUsage {
        self.events
            .iter()
            .fold(TokenUsage::default(), |acc, e| acc.saturating_add(e.usage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: &str, author: &str) -> StreamEvent {
        StreamEvent {
            id: id.to_string(),
            author: author.to_string(),
            model_version: "unknown".into(),
            usage: TokenUsage::default(),
            title: format!("{author} {id}"),
        }
    }

    #[test]
    fn duplicate_id_keeps_first_entry() {
        let mut view = ViewState::new();
        let first = event("1", "a");
        let mut second = event("1", "b");
        second.title = "replacement".into();

        assert!(view.project(first.clone()).appended);
        assert_eq!(view.project(second), Projection::default());
        assert_eq!(view.events(), &[first]);
        assert_eq!(view.stages(), &["a".to_string()]);
    }

    #[test]
    fn consecutive_authors_collapse() {
        let mut view = ViewState::new();
        for (id, author) in [("1", "A"), ("2", "A"), ("3", "B"), ("4", "A")] {
            view.project(event(id, author));
        }
        assert_eq!(view.stages(), &["A", "B", "A"]);
        assert_eq!(view.events().len(), 4);
        assert_eq!(view.current_stage(), Some("A"));
    }

    #[test]
    fn projection_reports_stage_changes() {
        let mut view = ViewState::new();
        assert_eq!(
            view.project(event("1", "A")),
            Projection {
                appended: true,
                stage_entered: true
            }
        );
        assert_eq!(
            view.project(event("2", "A")),
            Projection {
                appended: true,
                stage_entered: false
            }
        );
    }

    #[test]
    fn total_usage_sums_log() {
        let mut view = ViewState::new();
        let mut a = event("1", "A");
        a.usage = TokenUsage {
            prompt_tokens: 10,
            candidate_tokens: 2,
            thought_tokens: 1,
        };
        let mut b = event("2", "B");
        b.usage = TokenUsage {
            prompt_tokens: 5,
            candidate_tokens: 0,
            thought_tokens: 4,
        };
        view.project(a.clone());
        view.project(b);
        view.project(a);
        assert_eq!(
            view.total_usage(),
            TokenUsage {
                prompt_tokens: 15,
                candidate_tokens: 2,
                thought_tokens: 5
            }
        );
    }
}

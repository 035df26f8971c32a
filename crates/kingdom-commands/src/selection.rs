//! Interactive target selection.
//!
//! Some handlers need the player to pick among options (which hexes to
//! abandon, which equipment to grant). They describe the choice as a
//! [`SelectionRequest`] and await a [`TargetSelector`]. A `None` answer is a
//! cancellation and makes the whole prepare return `None`.

use std::collections::VecDeque;
use std::future::Future;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::CommandError;

/// A choice offered to the player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionRequest {
    /// What is being chosen.
    pub prompt: String,
    /// Human-readable options, indexed from zero.
    pub options: Vec<String>,
    /// How many options to pick.
    pub count: usize,
}

impl SelectionRequest {
    /// Check an answer: indices must be in range and distinct, and at most
    /// `count` of them. Returns the indices in the order given.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::InvalidSelection`] for an out-of-range or
    /// repeated index, too many indices, or an empty answer.
    pub fn validate(&self, indices: Vec<usize>) -> Result<Vec<usize>, CommandError> {
        if indices.is_empty() {
            return Err(CommandError::InvalidSelection(format!("nothing chosen for {:?}", self.prompt)));
        }
        if indices.len() > self.count {
            return Err(CommandError::InvalidSelection(format!(
                "{} chosen, at most {} allowed",
                indices.len(),
                self.count
            )));
        }
        let mut seen = Vec::with_capacity(indices.len());
        for index in indices {
            if index >= self.options.len() {
                return Err(CommandError::InvalidSelection(format!("index {index} out of range")));
            }
            if seen.contains(&index) {
                return Err(CommandError::InvalidSelection(format!("index {index} chosen twice")));
            }
            seen.push(index);
        }
        Ok(seen)
    }
}

/// Something that answers [`SelectionRequest`]s: a UI, a script, a bot.
pub trait TargetSelector: Send + Sync {
    /// Pick option indices, or `None` to cancel.
    fn choose(&self, request: &SelectionRequest) -> impl Future<Output = Option<Vec<usize>>> + Send;
}

/// Always takes the first `count` options. Used by automated turns.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstChoiceSelector;

impl TargetSelector for FirstChoiceSelector {
    async fn choose(&self, request: &SelectionRequest) -> Option<Vec<usize>> {
        let take = request.count.min(request.options.len());
        Some((0..take).collect())
    }
}

/// Replays a fixed list of answers, then cancels.
#[derive(Debug, Default)]
pub struct ScriptedSelector {
    answers: Mutex<VecDeque<Option<Vec<usize>>>>,
}

impl ScriptedSelector {
    /// Selector that returns `answers` in order.
    pub fn new(answers: impl IntoIterator<Item = Option<Vec<usize>>>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
        }
    }
}

impl TargetSelector for ScriptedSelector {
    async fn choose(&self, request: &SelectionRequest) -> Option<Vec<usize>> {
        let answer = self.answers.lock().await.pop_front().flatten();
        debug!(prompt = %request.prompt, ?answer, "scripted selection");
        answer
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn request(options: usize, count: usize) -> SelectionRequest {
        SelectionRequest {
            prompt: "Pick".to_owned(),
            options: (0..options).map(|i| format!("option {i}")).collect(),
            count,
        }
    }

    #[test]
    fn validate_rejects_bad_answers() {
        let req = request(3, 2);
        assert_eq!(req.validate(vec![2, 0]).unwrap(), vec![2, 0]);
        assert!(req.validate(vec![]).is_err());
        assert!(req.validate(vec![3]).is_err());
        assert!(req.validate(vec![1, 1]).is_err());
        assert!(req.validate(vec![0, 1, 2]).is_err());
    }

    #[tokio::test]
    async fn first_choice_takes_leading_options() {
        let answer = FirstChoiceSelector.choose(&request(2, 5)).await;
        assert_eq!(answer, Some(vec![0, 1]));
    }

    #[tokio::test]
    async fn scripted_selector_cancels_when_exhausted() {
        let selector = ScriptedSelector::new([Some(vec![1]), None]);
        assert_eq!(selector.choose(&request(2, 1)).await, Some(vec![1]));
        assert_eq!(selector.choose(&request(2, 1)).await, None);
        assert_eq!(selector.choose(&request(2, 1)).await, None);
    }
}

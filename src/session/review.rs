use serde::{Deserialize, Serialize};

use crate::models::Trial;

/// Swipe direction for the trial under review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Accept,
    Reject,
}

/// Review cursor over a ranked list plus the accepted/rejected buckets
#[derive(Debug, Clone, Default)]
pub struct ReviewQueue {
    cursor: usize,
    accepted: Vec<Trial>,
    rejected: Vec<Trial>,
}

/// Cursor position and bucket sizes after an `advance`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReviewProgress {
    pub cursor: usize,
    pub accepted: usize,
    pub rejected: usize,
    /// Whether the call moved a trial into a bucket
    pub moved: bool,
}

impl ReviewQueue {
    /// Back to the first trial with empty buckets
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.accepted.clear();
        self.rejected.clear();
    }

    /// File the trial under the cursor and step past it.
    ///
    /// No-op once the cursor has run off the end of `trials`.
    pub fn advance(&mut self, trials: &[Trial], direction: Direction) -> ReviewProgress {
        let moved = match trials.get(self.cursor) {
            Some(trial) => {
                match direction {
                    Direction::Accept => self.accepted.push(trial.clone()),
                    Direction::Reject => self.rejected.push(trial.clone()),
                }
                self.cursor += 1;
                true
            }
            None => false,
        };

        ReviewProgress { moved, ..self.progress() }
    }

    pub fn progress(&self) -> ReviewProgress {
        ReviewProgress {
            cursor: self.cursor,
            accepted: self.accepted.len(),
            rejected: self.rejected.len(),
            moved: false,
        }
    }

    pub fn current<'a>(&self, trials: &'a [Trial]) -> Option<&'a Trial> {
        trials.get(self.cursor)
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn accepted(&self) -> &[Trial] {
        &self.accepted
    }

    pub fn rejected(&self) -> &[Trial] {
        &self.rejected
    }
}

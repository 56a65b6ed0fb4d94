use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a question stands in its publication window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Eligibility {
    /// Not visible yet.
    NotYetPublished,
    /// Visible and accepting votes.
    OpenForVoting,
    /// Visible, but voting has ended.
    Closed,
}

impl Eligibility {
    /// Evaluate the window `[publish_at, end_at]` at time `now`.
    ///
    /// Both ends are inclusive. Without an `end_at`, a published question stays
    /// open forever. An `end_at` earlier than `publish_at` leaves the question
    /// closed from the moment it is published.
    pub fn evaluate(
        publish_at: DateTime<Utc>,
        end_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        if now < publish_at {
            Self::NotYetPublished
        } else if end_at.map_or(false, |end_at| now > end_at) {
            Self::Closed
        } else {
            Self::OpenForVoting
        }
    }

    /// Can the question be seen?
    pub fn is_published(self) -> bool {
        self != Self::NotYetPublished
    }

    /// Can the question be voted on?
    pub fn can_vote(self) -> bool {
        self == Self::OpenForVoting
    }
}

impl Display for Eligibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::NotYetPublished => "This question has not been published yet.",
            Self::OpenForVoting => "This question is open for voting.",
            Self::Closed => "Voting on this question has ended.",
        })
    }
}

use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

use super::choice::Choice;

/// Core vote data, as stored in the database.
///
/// `question_id` always mirrors the question of `choice_id`; it exists so that
/// the store can enforce a single vote per `(voter_id, question_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCore {
    pub voter_id: Id,
    pub choice_id: Id,
    pub question_id: Id,
}

impl VoteCore {
    /// A vote by the given voter for the given choice.
    pub fn new(voter_id: Id, choice: &Choice) -> Self {
        Self {
            voter_id,
            choice_id: choice.id,
            question_id: choice.question_id,
        }
    }
}

/// A vote without an ID.
pub type NewVote = VoteCore;

/// A vote from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub vote: VoteCore,
}

impl Deref for Vote {
    type Target = VoteCore;

    fn deref(&self) -> &Self::Target {
        &self.vote
    }
}

impl DerefMut for Vote {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.vote
    }
}

//! Casting votes: one vote per user per question, replaced on every new vote.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::error::{Error, Result};
use crate::model::{
    db::{choice::Choice, vote::NewVote, vote::Vote},
    mongodb::Id,
    store::VoteStore,
};

/// How many times a vote is attempted when racing other requests from the
/// same voter.
pub const MAX_UPSERT_ATTEMPTS: usize = 3;

/// A vote that was stored, with the choice it is for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CastVote {
    pub vote: Vote,
    pub choice: Choice,
}

/// Why a vote was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("You must be signed in to vote.")]
    Unauthenticated,
    #[error("Question with ID '{0}' does not exist.")]
    NotFound(Id),
    #[error("This question is not open for voting.")]
    VotingClosed,
    #[error("You didn't select a choice.")]
    InvalidChoice,
}

/// The result of casting a vote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteOutcome {
    /// The voter's first vote on the question.
    Recorded(CastVote),
    /// The voter's previous vote now points at the new choice.
    Updated(CastVote),
    Rejected(Rejection),
}

impl From<Rejection> for VoteOutcome {
    fn from(rejection: Rejection) -> Self {
        Self::Rejected(rejection)
    }
}

/// Cast `voter`'s vote for `choice_id` on `question_id`, replacing any vote
/// they already have on that question.
///
/// Checks happen in order: signed in, question exists, question open at
/// `now`, choice belongs to question. Store failures are errors; everything
/// else is an outcome.
pub async fn cast_vote<S>(
    store: &S,
    voter: Option<Id>,
    question_id: Id,
    choice_id: Option<Id>,
    now: DateTime<Utc>,
) -> Result<VoteOutcome>
where
    S: VoteStore + ?Sized,
{
    let Some(voter) = voter else {
        return Ok(Rejection::Unauthenticated.into());
    };
    let Some(question) = store.question(question_id).await? else {
        return Ok(Rejection::NotFound(question_id).into());
    };
    if !question.eligibility(now).can_vote() {
        return Ok(Rejection::VotingClosed.into());
    }
    let choice = match choice_id {
        Some(choice_id) => store.choice(question.id, choice_id).await?,
        None => None,
    };
    let Some(choice) = choice else {
        return Ok(Rejection::InvalidChoice.into());
    };

    for attempt in 1..=MAX_UPSERT_ATTEMPTS {
        if let Some(vote) = store.find_vote(voter, question.id).await? {
            let vote = store.update_vote(&vote, &choice).await?;
            debug!("Updated vote {} to choice {}", vote.id, choice.id);
            return Ok(VoteOutcome::Updated(CastVote { vote, choice }));
        }

        match store.create_vote(NewVote::new(voter, &choice)).await {
            Ok(vote) => {
                debug!("Recorded vote {} for choice {}", vote.id, choice.id);
                return Ok(VoteOutcome::Recorded(CastVote { vote, choice }));
            }
            // Another request by the same voter got there first; go round
            // again and update its vote instead.
            Err(Error::AlreadyExists(_)) => {
                debug!("Vote by {voter} on {question_id} raced on attempt {attempt}");
            }
            Err(e) => return Err(e),
        }
    }

    Err(Error::Storage(format!(
        "Gave up recording vote by {voter} on question {question_id} after {MAX_UPSERT_ATTEMPTS} attempts"
    )))
}

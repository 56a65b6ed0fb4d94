use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::model::{
    db::{
        choice::{Choice, NewChoice},
        question::{NewQuestion, Question},
        user::{NewUser, User},
        vote::{NewVote, Vote},
    },
    mongodb::Id,
};

/// The storage needed to cast a vote.
#[rocket::async_trait]
pub trait VoteStore: Send + Sync {
    /// Get a question by ID.
    async fn question(&self, id: Id) -> Result<Option<Question>>;

    /// Get a choice by ID, only if it belongs to the given question.
    async fn choice(&self, question_id: Id, id: Id) -> Result<Option<Choice>>;

    /// Get the vote of the given voter on the given question.
    async fn find_vote(&self, voter_id: Id, question_id: Id) -> Result<Option<Vote>>;

    /// Store a new vote.
    ///
    /// Fails with [`crate::error::Error::AlreadyExists`] if the voter already
    /// has a vote on the same question.
    async fn create_vote(&self, vote: NewVote) -> Result<Vote>;

    /// Point an existing vote at a different choice of the same question.
    async fn update_vote(&self, vote: &Vote, choice: &Choice) -> Result<Vote>;
}

/// Question and choice management, plus tallies.
#[rocket::async_trait]
pub trait QuestionStore: Send + Sync {
    /// Questions published at or before `now`, newest first, at most `limit`.
    async fn published_questions(&self, now: DateTime<Utc>, limit: usize)
        -> Result<Vec<Question>>;

    /// Every question, newest first.
    async fn questions(&self) -> Result<Vec<Question>>;

    /// Store a new question along with its initial choices.
    async fn insert_question(
        &self,
        question: NewQuestion,
        choices: Vec<String>,
    ) -> Result<(Question, Vec<Choice>)>;

    /// Replace the text and dates of an existing question.
    async fn update_question(&self, question: &Question) -> Result<()>;

    /// Delete a question with its choices and votes. Returns false if there was
    /// no such question.
    async fn delete_question(&self, id: Id) -> Result<bool>;

    /// The choices of a question, in insertion order.
    async fn choices(&self, question_id: Id) -> Result<Vec<Choice>>;

    /// Add a choice to an existing question.
    async fn insert_choice(&self, choice: NewChoice) -> Result<Choice>;

    /// Delete a choice of a question with its votes. Returns false if there was
    /// no such choice.
    async fn delete_choice(&self, question_id: Id, id: Id) -> Result<bool>;

    /// Number of votes currently pointing at a choice.
    async fn count_votes(&self, choice_id: Id) -> Result<u64>;

    /// Number of votes on a question.
    async fn count_question_votes(&self, question_id: Id) -> Result<u64>;
}

/// User accounts.
#[rocket::async_trait]
pub trait UserStore: Send + Sync {
    async fn user(&self, id: Id) -> Result<Option<User>>;

    async fn user_by_name(&self, username: &str) -> Result<Option<User>>;

    /// Store a new user.
    ///
    /// Fails with [`crate::error::Error::AlreadyExists`] if the username is taken.
    async fn insert_user(&self, user: NewUser) -> Result<User>;

    async fn count_admins(&self) -> Result<u64>;
}

/// Everything the server needs from storage.
pub trait PollStore: VoteStore + QuestionStore + UserStore {}

impl<T> PollStore for T where T: VoteStore + QuestionStore + UserStore {}

/// The store held in managed state.
pub type Store = Arc<dyn PollStore>;

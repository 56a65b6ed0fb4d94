//! The documents returned by the polls and login pages.

use rocket::request::FlashMessage;
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

use super::{
    question::{ChoiceDescription, QuestionSummary},
    ApiId,
};

/// A one-off message carried over a redirect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// `success`, `warning` or `error`.
    pub kind: String,
    pub text: String,
}

impl From<FlashMessage<'_>> for Message {
    fn from(flash: FlashMessage<'_>) -> Self {
        Self {
            kind: flash.kind().to_string(),
            text: flash.message().to_string(),
        }
    }
}

/// The polls index: the latest published questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexPage {
    pub latest_questions: Vec<QuestionSummary>,
    pub message: Option<Message>,
}

/// A question open for voting, with its choices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDetail {
    pub question: QuestionSummary,
    pub choices: Vec<ChoiceDescription>,
    /// The choice the caller currently votes for, if signed in and voted.
    pub selected_choice: Option<ApiId>,
    pub message: Option<Message>,
}

/// The login page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginPage {
    /// Where to go after signing in.
    pub next: Option<String>,
    pub message: Option<Message>,
}

/// A submitted vote. A missing choice is a valid submission that gets rejected.
#[derive(Debug, Clone, FromForm)]
pub struct VoteForm {
    pub choice: Option<Id>,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    common::eligibility::Eligibility,
    db::{
        choice::Choice,
        question::{NewQuestion, Question},
    },
};

use super::ApiId;

/// Question and choice texts are limited to this many characters.
pub const MAX_TEXT_LENGTH: usize = 200;

fn check_text(what: &str, text: &str) -> Result<()> {
    let length = text.trim().chars().count();
    if length == 0 || length > MAX_TEXT_LENGTH {
        return Err(Error::BadRequest(format!(
            "{what} text must be between 1 and {MAX_TEXT_LENGTH} characters"
        )));
    }
    Ok(())
}

/// A question specification, as submitted by an admin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionSpec {
    /// Question text.
    pub text: String,
    /// Publication time. Defaults to the time of submission.
    #[serde(default)]
    pub pub_date: Option<DateTime<Utc>>,
    /// End of voting, if voting ever ends.
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    /// Texts of the initial choices. Ignored when editing a question.
    #[serde(default)]
    pub choices: Vec<String>,
}

impl QuestionSpec {
    /// Check the texts and that the question does not end before it starts.
    pub fn validate(&self) -> Result<()> {
        check_text("Question", &self.text)?;
        for choice in &self.choices {
            check_text("Choice", choice)?;
        }
        if let (Some(pub_date), Some(end_date)) = (self.pub_date, self.end_date) {
            if end_date < pub_date {
                return Err(Error::BadRequest(
                    "Question cannot end before it is published".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Publish at `now` unless told otherwise, validate, and split into the
    /// question to store and its choice texts.
    pub fn into_question(mut self, now: DateTime<Utc>) -> Result<(NewQuestion, Vec<String>)> {
        let pub_date = *self.pub_date.get_or_insert(now);
        self.validate()?;
        let question = NewQuestion {
            text: self.text,
            pub_date,
            end_date: self.end_date,
        };
        Ok((question, self.choices))
    }
}

/// A new choice for an existing question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChoiceSpec {
    pub text: String,
}

impl ChoiceSpec {
    pub fn validate(&self) -> Result<()> {
        check_text("Choice", &self.text)
    }
}

/// A question as listed on the index or to admins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionSummary {
    pub id: ApiId,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub eligibility: Eligibility,
    pub published_recently: bool,
}

impl QuestionSummary {
    pub fn new(question: Question, now: DateTime<Utc>) -> Self {
        Self {
            id: question.id.into(),
            eligibility: question.eligibility(now),
            published_recently: question.was_published_recently(now),
            text: question.question.text,
            pub_date: question.question.pub_date,
            end_date: question.question.end_date,
        }
    }
}

/// A selectable choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceDescription {
    pub id: ApiId,
    pub text: String,
}

impl From<Choice> for ChoiceDescription {
    fn from(choice: Choice) -> Self {
        Self {
            id: choice.id.into(),
            text: choice.choice.text,
        }
    }
}

/// An admin's view of a question, with every choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDescription {
    #[serde(flatten)]
    pub question: QuestionSummary,
    pub choices: Vec<ChoiceDescription>,
}

/// A choice with its tally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceTally {
    pub id: ApiId,
    pub text: String,
    pub votes: u64,
}

/// The results of a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionResults {
    pub question: QuestionSummary,
    pub choices: Vec<ChoiceTally>,
    pub total_votes: u64,
    /// Any message left for the caller, e.g. confirming their vote.
    pub message: Option<super::Message>,
}

#[cfg(test)]
mod examples {
    use chrono::Duration;

    use super::*;

    impl QuestionSpec {
        pub fn example() -> Self {
            Self {
                text: "What's up?".to_string(),
                pub_date: Some(Utc::now() - Duration::days(3)),
                end_date: None,
                choices: vec!["Not much".to_string(), "The sky".to_string()],
            }
        }

        pub fn future_example() -> Self {
            Self {
                text: "Coming soon?".to_string(),
                pub_date: Some(Utc::now() + Duration::days(5)),
                end_date: None,
                choices: vec!["Yes".to_string(), "No".to_string()],
            }
        }

        pub fn closed_example() -> Self {
            Self {
                text: "Too late?".to_string(),
                pub_date: Some(Utc::now() - Duration::days(3)),
                end_date: Some(Utc::now() - Duration::days(1)),
                choices: vec!["Yes".to_string(), "No".to_string()],
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn defaults_pub_date_to_now() {
        let now = Utc::now();
        let spec = QuestionSpec {
            pub_date: None,
            ..QuestionSpec::example()
        };
        let (question, choices) = spec.into_question(now).unwrap();
        assert_eq!(question.pub_date, now);
        assert_eq!(choices.len(), 2);
    }

    #[test]
    fn rejects_bad_text() {
        let empty = QuestionSpec {
            text: "  ".to_string(),
            ..QuestionSpec::example()
        };
        assert!(empty.validate().is_err());

        let long = QuestionSpec {
            text: "?".repeat(MAX_TEXT_LENGTH + 1),
            ..QuestionSpec::example()
        };
        assert!(long.validate().is_err());

        let longest = QuestionSpec {
            text: "?".repeat(MAX_TEXT_LENGTH),
            ..QuestionSpec::example()
        };
        assert!(longest.validate().is_ok());

        let bad_choice = QuestionSpec {
            choices: vec![String::new()],
            ..QuestionSpec::example()
        };
        assert!(bad_choice.validate().is_err());

        assert!(ChoiceSpec { text: "Fine".into() }.validate().is_ok());
        assert!(ChoiceSpec { text: "".into() }.validate().is_err());
    }

    #[test]
    fn rejects_end_before_publication() {
        let now = Utc::now();
        let spec = QuestionSpec {
            pub_date: Some(now),
            end_date: Some(now - Duration::seconds(1)),
            ..QuestionSpec::example()
        };
        assert!(spec.validate().is_err());

        // Also against the defaulted publication time.
        let spec = QuestionSpec {
            pub_date: None,
            end_date: Some(now - Duration::seconds(1)),
            ..QuestionSpec::example()
        };
        assert!(spec.into_question(now).is_err());

        // Ending the instant it starts is allowed.
        let spec = QuestionSpec {
            pub_date: Some(now),
            end_date: Some(now),
            ..QuestionSpec::example()
        };
        assert!(spec.into_question(now).is_ok());
    }
}

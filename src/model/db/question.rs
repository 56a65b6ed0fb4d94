use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Duration, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::{
    common::eligibility::Eligibility,
    mongodb::{optional_bson_datetime, Id},
};

/// Core question data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionCore {
    pub text: String,
    /// When the question becomes visible and open for voting.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub pub_date: DateTime<Utc>,
    /// When voting closes. `None` means the question never closes.
    #[serde(default, with = "optional_bson_datetime")]
    pub end_date: Option<DateTime<Utc>>,
}

impl QuestionCore {
    /// Where this question is in its publication window at the given time.
    pub fn eligibility(&self, now: DateTime<Utc>) -> Eligibility {
        Eligibility::evaluate(self.pub_date, self.end_date, now)
    }

    /// Was this question published within the day before `now`?
    pub fn was_published_recently(&self, now: DateTime<Utc>) -> bool {
        now - Duration::days(1) <= self.pub_date && self.pub_date <= now
    }
}

/// A question without an ID.
pub type NewQuestion = QuestionCore;

/// A question from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub question: QuestionCore,
}

impl Deref for Question {
    type Target = QuestionCore;

    fn deref(&self) -> &Self::Target {
        &self.question
    }
}

impl DerefMut for Question {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.question
    }
}

/// Example data for tests.
#[cfg(test)]
pub mod examples {
    use super::*;

    impl QuestionCore {
        /// Published `days_ago` days before now, never closing.
        pub fn published_example(days_ago: i64) -> Self {
            Self {
                text: format!("Published {days_ago} days ago?"),
                pub_date: Utc::now() - Duration::days(days_ago),
                end_date: None,
            }
        }

        /// Published three days ago, closed one day ago.
        pub fn closed_example() -> Self {
            Self {
                text: "Already closed?".to_string(),
                pub_date: Utc::now() - Duration::days(3),
                end_date: Some(Utc::now() - Duration::days(1)),
            }
        }

        /// Publishes five days from now.
        pub fn future_example() -> Self {
            Self {
                text: "Not out yet?".to_string(),
                pub_date: Utc::now() + Duration::days(5),
                end_date: None,
            }
        }
    }
}

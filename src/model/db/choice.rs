use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// Core choice data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceCore {
    /// The question this choice belongs to.
    pub question_id: Id,
    pub text: String,
}

/// A choice without an ID.
pub type NewChoice = ChoiceCore;

/// A choice from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub choice: ChoiceCore,
}

impl Deref for Choice {
    type Target = ChoiceCore;

    fn deref(&self) -> &Self::Target {
        &self.choice
    }
}

impl DerefMut for Choice {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.choice
    }
}

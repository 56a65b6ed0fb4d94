use std::ops::Deref;

use mongodb::{
    bson::doc, error::Error as DbError, options::IndexOptions, Collection, Database, IndexModel,
};

use crate::model::db::{choice::Choice, question::Question, user::User, vote::Vote};

/// A type that can be directly inserted/read to/from the database.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// `Derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

const QUESTIONS: &str = "questions";
impl MongoCollection for Question {
    const NAME: &'static str = QUESTIONS;
}

const CHOICES: &str = "choices";
impl MongoCollection for Choice {
    const NAME: &'static str = CHOICES;
}

const VOTES: &str = "votes";
impl MongoCollection for Vote {
    const NAME: &'static str = VOTES;
}

const USERS: &str = "users";
impl MongoCollection for User {
    const NAME: &'static str = USERS;
}

/// Ensure that all the required indexes exist on the given database.
///
/// This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    let unique = IndexOptions::builder().unique(true).build();

    // One vote per voter per question.
    let vote_index = IndexModel::builder()
        .keys(doc! {"voter_id": 1, "question_id": 1})
        .options(unique.clone())
        .build();
    let tally_index = IndexModel::builder().keys(doc! {"choice_id": 1}).build();
    Coll::<Vote>::from_db(db)
        .create_indexes([vote_index, tally_index], None)
        .await?;

    // Usernames identify users at login.
    let user_index = IndexModel::builder()
        .keys(doc! {"username": 1})
        .options(unique)
        .build();
    Coll::<User>::from_db(db)
        .create_index(user_index, None)
        .await?;

    let choice_index = IndexModel::builder().keys(doc! {"question_id": 1}).build();
    Coll::<Choice>::from_db(db)
        .create_index(choice_index, None)
        .await?;

    // The index page sorts on publication date.
    let question_index = IndexModel::builder().keys(doc! {"pub_date": -1}).build();
    Coll::<Question>::from_db(db)
        .create_index(question_index, None)
        .await?;

    Ok(())
}

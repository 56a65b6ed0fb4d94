use chrono::{DateTime, Utc};
use mongodb::{
    bson::{self, doc},
    error::Error as DbError,
    options::FindOptions,
    Client, ClientSession, Database,
};
use rocket::futures::TryStreamExt;

use crate::error::{Error, Result};
use crate::model::{
    db::{
        choice::{Choice, NewChoice},
        question::{NewQuestion, Question},
        user::{NewUser, User},
        vote::{NewVote, Vote},
    },
    store::{QuestionStore, UserStore, VoteStore},
};

use super::{ensure_indexes_exist, is_duplicate_key_error, Coll, Id};

/// The production store, backed by MongoDB.
///
/// Cascading deletes run in transactions, so the server must be a replica set
/// or sharded cluster.
pub struct MongoStore {
    client: Client,
    questions: Coll<Question>,
    choices: Coll<Choice>,
    votes: Coll<Vote>,
    users: Coll<User>,
}

impl MongoStore {
    /// Wrap the given database.
    pub fn new(client: Client, db: &Database) -> Self {
        Self {
            client,
            questions: Coll::from_db(db),
            choices: Coll::from_db(db),
            votes: Coll::from_db(db),
            users: Coll::from_db(db),
        }
    }

    /// Connect to the database at `uri` and make sure its indexes exist.
    pub async fn connect(uri: &str, db_name: &str) -> Result<Self, DbError> {
        let client = Client::with_uri_str(uri).await?;
        let db = client.database(db_name);
        ensure_indexes_exist(&db).await?;
        Ok(Self::new(client, &db))
    }

    async fn transaction(&self) -> Result<ClientSession> {
        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;
        Ok(session)
    }

    fn newest_first(limit: Option<usize>) -> FindOptions {
        FindOptions::builder()
            .sort(doc! {"pub_date": -1, "_id": -1})
            .limit(limit.map(|limit| limit as i64))
            .build()
    }
}

#[rocket::async_trait]
impl VoteStore for MongoStore {
    async fn question(&self, id: Id) -> Result<Option<Question>> {
        Ok(self.questions.find_one(id.as_doc(), None).await?)
    }

    async fn choice(&self, question_id: Id, id: Id) -> Result<Option<Choice>> {
        let filter = doc! {"_id": id, "question_id": question_id};
        Ok(self.choices.find_one(filter, None).await?)
    }

    async fn find_vote(&self, voter_id: Id, question_id: Id) -> Result<Option<Vote>> {
        let filter = doc! {"voter_id": voter_id, "question_id": question_id};
        Ok(self.votes.find_one(filter, None).await?)
    }

    async fn create_vote(&self, vote: NewVote) -> Result<Vote> {
        let vote = Vote {
            id: Id::new(),
            vote,
        };
        match self.votes.insert_one(&vote, None).await {
            Ok(_) => Ok(vote),
            Err(err) if is_duplicate_key_error(&err) => Err(Error::AlreadyExists(format!(
                "Vote by {} on question {}",
                vote.voter_id, vote.question_id
            ))),
            Err(err) => Err(err.into()),
        }
    }

    async fn update_vote(&self, vote: &Vote, choice: &Choice) -> Result<Vote> {
        let update = doc! {"$set": {"choice_id": choice.id}};
        let result = self.votes.update_one(vote.id.as_doc(), update, None).await?;
        if result.matched_count == 0 {
            return Err(Error::not_found("Vote", vote.id));
        }
        let mut vote = vote.clone();
        vote.choice_id = choice.id;
        Ok(vote)
    }
}

#[rocket::async_trait]
impl QuestionStore for MongoStore {
    async fn published_questions(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Question>> {
        // A limit of zero means "no limit" to MongoDB.
        if limit == 0 {
            return Ok(Vec::new());
        }
        let filter = doc! {"pub_date": {"$lte": bson::DateTime::from_chrono(now)}};
        let questions = self
            .questions
            .find(filter, Self::newest_first(Some(limit)))
            .await?
            .try_collect()
            .await?;
        Ok(questions)
    }

    async fn questions(&self) -> Result<Vec<Question>> {
        let questions = self
            .questions
            .find(None, Self::newest_first(None))
            .await?
            .try_collect()
            .await?;
        Ok(questions)
    }

    async fn insert_question(
        &self,
        question: NewQuestion,
        choices: Vec<String>,
    ) -> Result<(Question, Vec<Choice>)> {
        let question = Question {
            id: Id::new(),
            question,
        };
        let choices: Vec<_> = choices
            .into_iter()
            .map(|text| Choice {
                id: Id::new(),
                choice: NewChoice {
                    question_id: question.id,
                    text,
                },
            })
            .collect();

        let mut session = self.transaction().await?;
        self.questions
            .insert_one_with_session(&question, None, &mut session)
            .await?;
        if !choices.is_empty() {
            self.choices
                .insert_many_with_session(&choices, None, &mut session)
                .await?;
        }
        session.commit_transaction().await?;

        Ok((question, choices))
    }

    async fn update_question(&self, question: &Question) -> Result<()> {
        let result = self
            .questions
            .replace_one(question.id.as_doc(), question, None)
            .await?;
        if result.matched_count == 0 {
            return Err(Error::not_found("Question", question.id));
        }
        Ok(())
    }

    async fn delete_question(&self, id: Id) -> Result<bool> {
        let mut session = self.transaction().await?;
        let deleted = self
            .questions
            .delete_one_with_session(id.as_doc(), None, &mut session)
            .await?
            .deleted_count;
        if deleted == 0 {
            session.abort_transaction().await?;
            return Ok(false);
        }
        let of_question = doc! {"question_id": id};
        self.choices
            .delete_many_with_session(of_question.clone(), None, &mut session)
            .await?;
        self.votes
            .delete_many_with_session(of_question, None, &mut session)
            .await?;
        session.commit_transaction().await?;
        Ok(true)
    }

    async fn choices(&self, question_id: Id) -> Result<Vec<Choice>> {
        let options = FindOptions::builder().sort(doc! {"_id": 1}).build();
        let choices = self
            .choices
            .find(doc! {"question_id": question_id}, options)
            .await?
            .try_collect()
            .await?;
        Ok(choices)
    }

    async fn insert_choice(&self, choice: NewChoice) -> Result<Choice> {
        if self.question(choice.question_id).await?.is_none() {
            return Err(Error::not_found("Question", choice.question_id));
        }
        let choice = Choice {
            id: Id::new(),
            choice,
        };
        self.choices.insert_one(&choice, None).await?;
        Ok(choice)
    }

    async fn delete_choice(&self, question_id: Id, id: Id) -> Result<bool> {
        let mut session = self.transaction().await?;
        let deleted = self
            .choices
            .delete_one_with_session(
                doc! {"_id": id, "question_id": question_id},
                None,
                &mut session,
            )
            .await?
            .deleted_count;
        if deleted == 0 {
            session.abort_transaction().await?;
            return Ok(false);
        }
        self.votes
            .delete_many_with_session(doc! {"choice_id": id}, None, &mut session)
            .await?;
        session.commit_transaction().await?;
        Ok(true)
    }

    async fn count_votes(&self, choice_id: Id) -> Result<u64> {
        Ok(self
            .votes
            .count_documents(doc! {"choice_id": choice_id}, None)
            .await?)
    }

    async fn count_question_votes(&self, question_id: Id) -> Result<u64> {
        Ok(self
            .votes
            .count_documents(doc! {"question_id": question_id}, None)
            .await?)
    }
}

#[rocket::async_trait]
impl UserStore for MongoStore {
    async fn user(&self, id: Id) -> Result<Option<User>> {
        Ok(self.users.find_one(id.as_doc(), None).await?)
    }

    async fn user_by_name(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .find_one(doc! {"username": username}, None)
            .await?)
    }

    async fn insert_user(&self, user: NewUser) -> Result<User> {
        let user = User {
            id: Id::new(),
            user,
        };
        match self.users.insert_one(&user, None).await {
            Ok(_) => Ok(user),
            Err(err) if is_duplicate_key_error(&err) => {
                Err(Error::AlreadyExists(format!("User '{}'", user.username)))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn count_admins(&self) -> Result<u64> {
        // `Rights::Admin` is stored as its discriminant.
        Ok(self.users.count_documents(doc! {"rights": 1}, None).await?)
    }
}

/// These need a MongoDB replica set; point `POLLS_TEST_DB_URI` at one and run
/// with `--ignored`.
#[cfg(test)]
mod tests {
    use std::future::Future;

    use super::*;
    use crate::model::api::auth::{Credentials, Rights};

    async fn with_store<F, Fut>(test: F)
    where
        F: FnOnce(MongoStore) -> Fut,
        Fut: Future<Output = ()>,
    {
        let uri = std::env::var("POLLS_TEST_DB_URI")
            .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
        let db_name = format!("polls_test_{}", rand::random::<u32>());
        let store = MongoStore::connect(&uri, &db_name).await.unwrap();
        let db = store.client.database(&db_name);
        test(store).await;
        db.drop(None).await.unwrap();
    }

    #[rocket::async_test]
    #[ignore]
    async fn unique_vote_index() {
        with_store(|store| async move {
            let (_, choices) = store
                .insert_question(
                    NewQuestion::published_example(1),
                    vec!["a".into(), "b".into()],
                )
                .await
                .unwrap();
            let voter = Id::new();
            let vote = store
                .create_vote(NewVote::new(voter, &choices[0]))
                .await
                .unwrap();
            let duplicate = store.create_vote(NewVote::new(voter, &choices[1])).await;
            assert!(matches!(duplicate, Err(Error::AlreadyExists(_))));

            let vote = store.update_vote(&vote, &choices[1]).await.unwrap();
            let found = store
                .find_vote(voter, choices[1].question_id)
                .await
                .unwrap();
            assert_eq!(found, Some(vote));
        })
        .await;
    }

    #[rocket::async_test]
    #[ignore]
    async fn published_order_and_cascade() {
        with_store(|store| async move {
            let now = Utc::now();
            for days_ago in [4, 1, 3] {
                store
                    .insert_question(NewQuestion::published_example(days_ago), vec!["x".into()])
                    .await
                    .unwrap();
            }
            store
                .insert_question(NewQuestion::future_example(), vec![])
                .await
                .unwrap();

            let latest = store.published_questions(now, 2).await.unwrap();
            assert_eq!(latest.len(), 2);
            assert!(latest[0].pub_date > latest[1].pub_date);
            assert!(store.published_questions(now, 0).await.unwrap().is_empty());

            let question = latest[0].clone();
            let choices = store.choices(question.id).await.unwrap();
            store
                .create_vote(NewVote::new(Id::new(), &choices[0]))
                .await
                .unwrap();
            assert_eq!(store.count_votes(choices[0].id).await.unwrap(), 1);

            assert!(store.delete_question(question.id).await.unwrap());
            assert!(store.choices(question.id).await.unwrap().is_empty());
            assert_eq!(store.count_question_votes(question.id).await.unwrap(), 0);
        })
        .await;
    }

    #[rocket::async_test]
    #[ignore]
    async fn unique_usernames() {
        with_store(|store| async move {
            let admin = Credentials::example_admin()
                .into_user(Rights::Admin)
                .unwrap();
            store.insert_user(admin.clone()).await.unwrap();
            assert!(matches!(
                store.insert_user(admin).await,
                Err(Error::AlreadyExists(_))
            ));
            assert_eq!(store.count_admins().await.unwrap(), 1);
        })
        .await;
    }
}

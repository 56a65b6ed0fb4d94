use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rocket::tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::model::{
    db::{
        choice::{Choice, NewChoice},
        question::{NewQuestion, Question},
        user::{NewUser, User},
        vote::{NewVote, Vote},
    },
    mongodb::Id,
    store::{QuestionStore, UserStore, VoteStore},
};

#[derive(Default)]
struct Tables {
    questions: BTreeMap<Id, Question>,
    choices: BTreeMap<Id, Choice>,
    votes: BTreeMap<Id, Vote>,
    users: BTreeMap<Id, User>,
}

/// A process-local store, used when no database is configured and in tests.
///
/// Enforces the same uniqueness rules as the MongoDB indexes. IDs are
/// generated in increasing order, so iteration follows insertion order.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first(questions: &mut [Question]) {
    questions.sort_by(|a, b| b.pub_date.cmp(&a.pub_date).then(b.id.cmp(&a.id)));
}

#[rocket::async_trait]
impl VoteStore for MemoryStore {
    async fn question(&self, id: Id) -> Result<Option<Question>> {
        Ok(self.tables.lock().await.questions.get(&id).cloned())
    }

    async fn choice(&self, question_id: Id, id: Id) -> Result<Option<Choice>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .choices
            .get(&id)
            .filter(|choice| choice.question_id == question_id)
            .cloned())
    }

    async fn find_vote(&self, voter_id: Id, question_id: Id) -> Result<Option<Vote>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .votes
            .values()
            .find(|vote| vote.voter_id == voter_id && vote.question_id == question_id)
            .cloned())
    }

    async fn create_vote(&self, vote: NewVote) -> Result<Vote> {
        let mut tables = self.tables.lock().await;
        if tables
            .votes
            .values()
            .any(|v| v.voter_id == vote.voter_id && v.question_id == vote.question_id)
        {
            return Err(Error::AlreadyExists(format!(
                "Vote by {} on question {}",
                vote.voter_id, vote.question_id
            )));
        }
        let vote = Vote {
            id: Id::new(),
            vote,
        };
        tables.votes.insert(vote.id, vote.clone());
        Ok(vote)
    }

    async fn update_vote(&self, vote: &Vote, choice: &Choice) -> Result<Vote> {
        let mut tables = self.tables.lock().await;
        let stored = tables
            .votes
            .get_mut(&vote.id)
            .ok_or_else(|| Error::not_found("Vote", vote.id))?;
        stored.choice_id = choice.id;
        Ok(stored.clone())
    }
}

#[rocket::async_trait]
impl QuestionStore for MemoryStore {
    async fn published_questions(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Question>> {
        let tables = self.tables.lock().await;
        let mut questions: Vec<_> = tables
            .questions
            .values()
            .filter(|question| question.pub_date <= now)
            .cloned()
            .collect();
        newest_first(&mut questions);
        questions.truncate(limit);
        Ok(questions)
    }

    async fn questions(&self) -> Result<Vec<Question>> {
        let tables = self.tables.lock().await;
        let mut questions: Vec<_> = tables.questions.values().cloned().collect();
        newest_first(&mut questions);
        Ok(questions)
    }

    async fn insert_question(
        &self,
        question: NewQuestion,
        choices: Vec<String>,
    ) -> Result<(Question, Vec<Choice>)> {
        let mut tables = self.tables.lock().await;
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
        tables.questions.insert(question.id, question.clone());
        for choice in &choices {
            tables.choices.insert(choice.id, choice.clone());
        }
        Ok((question, choices))
    }

    async fn update_question(&self, question: &Question) -> Result<()> {
        let mut tables = self.tables.lock().await;
        let stored = tables
            .questions
            .get_mut(&question.id)
            .ok_or_else(|| Error::not_found("Question", question.id))?;
        *stored = question.clone();
        Ok(())
    }

    async fn delete_question(&self, id: Id) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        if tables.questions.remove(&id).is_none() {
            return Ok(false);
        }
        tables.choices.retain(|_, choice| choice.question_id != id);
        tables.votes.retain(|_, vote| vote.question_id != id);
        Ok(true)
    }

    async fn choices(&self, question_id: Id) -> Result<Vec<Choice>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .choices
            .values()
            .filter(|choice| choice.question_id == question_id)
            .cloned()
            .collect())
    }

    async fn insert_choice(&self, choice: NewChoice) -> Result<Choice> {
        let mut tables = self.tables.lock().await;
        if !tables.questions.contains_key(&choice.question_id) {
            return Err(Error::not_found("Question", choice.question_id));
        }
        let choice = Choice {
            id: Id::new(),
            choice,
        };
        tables.choices.insert(choice.id, choice.clone());
        Ok(choice)
    }

    async fn delete_choice(&self, question_id: Id, id: Id) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        match tables.choices.get(&id) {
            Some(choice) if choice.question_id == question_id => {}
            _ => return Ok(false),
        }
        tables.choices.remove(&id);
        tables.votes.retain(|_, vote| vote.choice_id != id);
        Ok(true)
    }

    async fn count_votes(&self, choice_id: Id) -> Result<u64> {
        let tables = self.tables.lock().await;
        Ok(tables
            .votes
            .values()
            .filter(|vote| vote.choice_id == choice_id)
            .count() as u64)
    }

    async fn count_question_votes(&self, question_id: Id) -> Result<u64> {
        let tables = self.tables.lock().await;
        Ok(tables
            .votes
            .values()
            .filter(|vote| vote.question_id == question_id)
            .count() as u64)
    }
}

#[rocket::async_trait]
impl UserStore for MemoryStore {
    async fn user(&self, id: Id) -> Result<Option<User>> {
        Ok(self.tables.lock().await.users.get(&id).cloned())
    }

    async fn user_by_name(&self, username: &str) -> Result<Option<User>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .values()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn insert_user(&self, user: NewUser) -> Result<User> {
        let mut tables = self.tables.lock().await;
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(Error::AlreadyExists(format!("User '{}'", user.username)));
        }
        let user = User {
            id: Id::new(),
            user,
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn count_admins(&self) -> Result<u64> {
        let tables = self.tables.lock().await;
        Ok(tables.users.values().filter(|user| user.is_admin()).count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::model::{api::auth::Credentials, api::auth::Rights};

    #[rocket::async_test]
    async fn published_questions_newest_first() {
        let store = MemoryStore::new();
        let now = Utc::now();
        for days_ago in [3, 1, 10, 2, 5, 7] {
            store
                .insert_question(NewQuestion::published_example(days_ago), vec![])
                .await
                .unwrap();
        }
        store
            .insert_question(NewQuestion::future_example(), vec![])
            .await
            .unwrap();

        let latest = store.published_questions(now, 5).await.unwrap();
        assert_eq!(latest.len(), 5);
        assert!(latest.iter().all(|q| q.pub_date <= now));
        assert!(latest.windows(2).all(|w| w[0].pub_date >= w[1].pub_date));
        assert!(latest[0].pub_date > now - Duration::days(2));
        assert!(store.published_questions(now, 0).await.unwrap().is_empty());

        // Unpublished questions are still there for admins.
        assert_eq!(store.questions().await.unwrap().len(), 7);
    }

    #[rocket::async_test]
    async fn one_vote_per_voter_and_question() {
        let store = MemoryStore::new();
        let (question, choices) = store
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

        // A different voter is fine.
        store
            .create_vote(NewVote::new(Id::new(), &choices[1]))
            .await
            .unwrap();

        let updated = store.update_vote(&vote, &choices[1]).await.unwrap();
        assert_eq!(updated.choice_id, choices[1].id);
        assert_eq!(store.count_votes(choices[0].id).await.unwrap(), 0);
        assert_eq!(store.count_votes(choices[1].id).await.unwrap(), 2);
        assert_eq!(store.count_question_votes(question.id).await.unwrap(), 2);
    }

    #[rocket::async_test]
    async fn choice_must_belong_to_question() {
        let store = MemoryStore::new();
        let (first, first_choices) = store
            .insert_question(NewQuestion::published_example(1), vec!["a".into()])
            .await
            .unwrap();
        let (second, _) = store
            .insert_question(NewQuestion::published_example(2), vec!["b".into()])
            .await
            .unwrap();

        let choice_id = first_choices[0].id;
        assert!(store.choice(first.id, choice_id).await.unwrap().is_some());
        assert!(store.choice(second.id, choice_id).await.unwrap().is_none());
        assert!(!store.delete_choice(second.id, choice_id).await.unwrap());
    }

    #[rocket::async_test]
    async fn deletes_cascade() {
        let store = MemoryStore::new();
        let (question, choices) = store
            .insert_question(
                NewQuestion::published_example(1),
                vec!["a".into(), "b".into()],
            )
            .await
            .unwrap();
        let (other, other_choices) = store
            .insert_question(NewQuestion::published_example(1), vec!["c".into()])
            .await
            .unwrap();
        let voter = Id::new();
        store
            .create_vote(NewVote::new(voter, &choices[0]))
            .await
            .unwrap();
        store
            .create_vote(NewVote::new(Id::new(), &choices[1]))
            .await
            .unwrap();
        store
            .create_vote(NewVote::new(voter, &other_choices[0]))
            .await
            .unwrap();

        assert!(store.delete_choice(question.id, choices[1].id).await.unwrap());
        assert_eq!(store.count_question_votes(question.id).await.unwrap(), 1);

        assert!(store.delete_question(question.id).await.unwrap());
        assert!(!store.delete_question(question.id).await.unwrap());
        assert!(store.choices(question.id).await.unwrap().is_empty());
        assert!(store.find_vote(voter, question.id).await.unwrap().is_none());

        // The other question is untouched.
        assert!(store.find_vote(voter, other.id).await.unwrap().is_some());
        assert_eq!(store.choices(other.id).await.unwrap().len(), 1);
    }

    #[rocket::async_test]
    async fn unique_usernames() {
        let store = MemoryStore::new();
        let user = Credentials::example_voter()
            .into_user(Rights::Voter)
            .unwrap();
        let stored = store.insert_user(user.clone()).await.unwrap();
        assert!(matches!(
            store.insert_user(user).await,
            Err(Error::AlreadyExists(_))
        ));
        assert_eq!(
            store.user_by_name("voter").await.unwrap(),
            Some(stored.clone())
        );
        assert_eq!(store.user(stored.id).await.unwrap(), Some(stored));
        assert_eq!(store.count_admins().await.unwrap(), 0);
    }
}

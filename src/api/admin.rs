use chrono::Utc;
use rocket::{serde::json::Json, Route, State};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            auth::{Admin, AuthToken},
            question::{
                ChoiceDescription, ChoiceSpec, QuestionDescription, QuestionSpec, QuestionSummary,
            },
        },
        db::{
            choice::{Choice, NewChoice},
            question::Question,
        },
        mongodb::Id,
        store::{QuestionStore, Store, VoteStore},
    },
};

pub fn routes() -> Vec<Route> {
    routes![
        get_questions,
        create_question,
        modify_question,
        delete_question,
        add_choice,
        delete_choice,
    ]
}

fn describe(question: Question, choices: Vec<Choice>) -> QuestionDescription {
    QuestionDescription {
        question: QuestionSummary::new(question, Utc::now()),
        choices: choices.into_iter().map(Into::into).collect(),
    }
}

#[get("/admin/questions")]
async fn get_questions(
    _token: AuthToken<Admin>,
    store: &State<Store>,
) -> Result<Json<Vec<QuestionDescription>>> {
    let mut descriptions = Vec::new();
    for question in store.questions().await? {
        let choices = store.choices(question.id).await?;
        descriptions.push(describe(question, choices));
    }
    Ok(Json(descriptions))
}

#[post("/admin/questions", data = "<spec>", format = "json")]
async fn create_question(
    _token: AuthToken<Admin>,
    spec: Json<QuestionSpec>,
    store: &State<Store>,
) -> Result<Json<QuestionDescription>> {
    let (question, choices) = spec.into_inner().into_question(Utc::now())?;
    let (question, choices) = store.insert_question(question, choices).await?;
    info!("Created question {}", question.id);
    Ok(Json(describe(question, choices)))
}

/// Replace the text and dates of a question. Choices are left alone.
#[put("/admin/questions/<question_id>", data = "<spec>", format = "json")]
async fn modify_question(
    _token: AuthToken<Admin>,
    question_id: Id,
    spec: Json<QuestionSpec>,
    store: &State<Store>,
) -> Result<Json<QuestionDescription>> {
    let mut question = store
        .question(question_id)
        .await?
        .ok_or_else(|| Error::not_found("Question", question_id))?;

    let spec = QuestionSpec {
        choices: Vec::new(),
        ..spec.into_inner()
    };
    let (updated, _) = spec.into_question(Utc::now())?;
    question.question = updated;
    store.update_question(&question).await?;

    let choices = store.choices(question.id).await?;
    Ok(Json(describe(question, choices)))
}

#[delete("/admin/questions/<question_id>")]
async fn delete_question(
    _token: AuthToken<Admin>,
    question_id: Id,
    store: &State<Store>,
) -> Result<()> {
    if !store.delete_question(question_id).await? {
        return Err(Error::not_found("Question", question_id));
    }
    info!("Deleted question {question_id}");
    Ok(())
}

#[post("/admin/questions/<question_id>/choices", data = "<spec>", format = "json")]
async fn add_choice(
    _token: AuthToken<Admin>,
    question_id: Id,
    spec: Json<ChoiceSpec>,
    store: &State<Store>,
) -> Result<Json<ChoiceDescription>> {
    spec.validate()?;
    let choice = store
        .insert_choice(NewChoice {
            question_id,
            text: spec.into_inner().text,
        })
        .await?;
    Ok(Json(choice.into()))
}

#[delete("/admin/questions/<question_id>/choices/<choice_id>")]
async fn delete_choice(
    _token: AuthToken<Admin>,
    question_id: Id,
    choice_id: Id,
    store: &State<Store>,
) -> Result<()> {
    if !store.delete_choice(question_id, choice_id).await? {
        return Err(Error::not_found("Choice", choice_id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::Client,
        serde::json::serde_json::json,
    };

    use super::*;
    use crate::model::{
        api::auth::{Credentials, Rights},
        common::eligibility::Eligibility,
        db::vote::NewVote,
        store::UserStore,
    };

    async fn create(client: &Client, spec: &QuestionSpec) -> QuestionDescription {
        let response = client
            .post(uri!(create_question))
            .header(ContentType::JSON)
            .body(json!(spec).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        response.into_json().await.unwrap()
    }

    #[backend_test(admin)]
    async fn create_and_list(client: Client) {
        let open = create(&client, &QuestionSpec::example()).await;
        let future = create(&client, &QuestionSpec::future_example()).await;
        let closed = create(&client, &QuestionSpec::closed_example()).await;

        assert_eq!(open.question.eligibility, Eligibility::OpenForVoting);
        assert_eq!(open.choices.len(), 2);
        assert_eq!(future.question.eligibility, Eligibility::NotYetPublished);
        assert_eq!(closed.question.eligibility, Eligibility::Closed);

        let listed: Vec<QuestionDescription> = client
            .get(uri!(get_questions))
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        let ids: Vec<_> = listed.iter().map(|q| q.question.id).collect();
        assert_eq!(ids, [future.question.id, closed.question.id, open.question.id]);
    }

    #[backend_test(admin)]
    async fn create_invalid(client: Client) {
        let specs = [
            QuestionSpec {
                text: String::new(),
                ..QuestionSpec::example()
            },
            QuestionSpec {
                end_date: Some(Utc::now() - chrono::Duration::days(10)),
                ..QuestionSpec::example()
            },
        ];
        for spec in specs {
            let response = client
                .post(uri!(create_question))
                .header(ContentType::JSON)
                .body(json!(spec).to_string())
                .dispatch()
                .await;
            assert_eq!(response.status(), Status::BadRequest);
        }

        let listed: Vec<QuestionDescription> = client
            .get(uri!(get_questions))
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert!(listed.is_empty());
    }

    #[backend_test(admin)]
    async fn modify(client: Client) {
        let created = create(&client, &QuestionSpec::future_example()).await;

        let spec = QuestionSpec {
            text: "Out now?".to_string(),
            pub_date: None,
            ..QuestionSpec::future_example()
        };
        let response = client
            .put(uri!(modify_question(*created.question.id)))
            .header(ContentType::JSON)
            .body(json!(spec).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let modified: QuestionDescription = response.into_json().await.unwrap();
        assert_eq!(modified.question.text, "Out now?");
        assert_eq!(modified.question.eligibility, Eligibility::OpenForVoting);
        assert_eq!(modified.choices, created.choices);

        let response = client
            .put(uri!(modify_question(Id::new())))
            .header(ContentType::JSON)
            .body(json!(spec).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::NotFound);
    }

    #[backend_test(admin)]
    async fn delete_cascades(client: Client, store: Store) {
        let created = create(&client, &QuestionSpec::example()).await;
        let question_id = *created.question.id;
        let choice = store
            .choice(question_id, *created.choices[0].id)
            .await
            .unwrap()
            .unwrap();
        store
            .create_vote(NewVote::new(Id::new(), &choice))
            .await
            .unwrap();

        let response = client
            .delete(uri!(delete_question(question_id)))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        assert!(store.question(question_id).await.unwrap().is_none());
        assert!(store.choices(question_id).await.unwrap().is_empty());
        assert_eq!(store.count_votes(choice.id).await.unwrap(), 0);

        let response = client
            .delete(uri!(delete_question(question_id)))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::NotFound);
    }

    #[backend_test(admin)]
    async fn manage_choices(client: Client, store: Store) {
        let created = create(&client, &QuestionSpec::example()).await;
        let question_id = *created.question.id;

        let response = client
            .post(uri!(add_choice(question_id)))
            .header(ContentType::JSON)
            .body(json!({"text": "Something else"}).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let added: ChoiceDescription = response.into_json().await.unwrap();
        assert_eq!(store.choices(question_id).await.unwrap().len(), 3);

        let response = client
            .post(uri!(add_choice(Id::new())))
            .header(ContentType::JSON)
            .body(json!({"text": "Nowhere"}).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::NotFound);

        let voted = store.choice(question_id, *added.id).await.unwrap().unwrap();
        store
            .create_vote(NewVote::new(Id::new(), &voted))
            .await
            .unwrap();
        let response = client
            .delete(uri!(delete_choice(question_id, *added.id)))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        assert_eq!(store.choices(question_id).await.unwrap().len(), 2);
        assert_eq!(store.count_question_votes(question_id).await.unwrap(), 0);

        let response = client
            .delete(uri!(delete_choice(question_id, *added.id)))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::NotFound);
    }

    #[backend_test(voter)]
    async fn voters_cannot_administer(client: Client) {
        let response = client.get(uri!(get_questions)).dispatch().await;
        assert_eq!(response.status(), Status::NotFound);

        let response = client
            .post(uri!(create_question))
            .header(ContentType::JSON)
            .body(json!(QuestionSpec::example()).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::NotFound);
    }

    #[backend_test]
    async fn deleted_admin_loses_access(client: Client, store: Store) {
        // A token for an admin that was never stored.
        let ghost = crate::model::db::user::User {
            id: Id::new(),
            user: Credentials::example_admin()
                .into_user(Rights::Admin)
                .unwrap(),
        };
        let config = client.rocket().state::<crate::config::Config>().unwrap();
        let cookie = AuthToken::<Admin>::new(&ghost).into_cookie(config).unwrap();

        let response = client
            .get(uri!(get_questions))
            .cookie(cookie)
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::NotFound);
        assert!(store.user(ghost.id).await.unwrap().is_none());
    }
}

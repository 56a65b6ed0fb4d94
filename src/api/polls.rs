use std::path::PathBuf;

use chrono::Utc;
use rocket::{
    form::Form,
    request::FlashMessage,
    response::{Flash, Redirect},
    serde::json::Json,
    Route, State,
};

use crate::{
    config::Config,
    error::Result,
    model::{
        api::{
            auth::{AuthToken, Voter},
            page::{IndexPage, QuestionDetail, VoteForm},
            question::{ChoiceTally, QuestionResults, QuestionSummary},
            Message,
        },
        common::eligibility::Eligibility,
        mongodb::Id,
        store::{QuestionStore, Store, VoteStore},
    },
    voting::{cast_vote, Rejection, VoteOutcome},
};

use super::Page;

pub fn routes() -> Vec<Route> {
    routes![root, index, detail, results, vote, unknown, unknown_post]
}

fn missing(question_id: impl std::fmt::Display) -> Flash<Redirect> {
    Flash::error(
        Redirect::to(uri!(index)),
        format!("Question with ID '{question_id}' does not exist."),
    )
}

#[get("/")]
pub fn root() -> Redirect {
    Redirect::to(uri!(index))
}

#[get("/polls")]
pub async fn index(
    store: &State<Store>,
    config: &State<Config>,
    flash: Option<FlashMessage<'_>>,
) -> Result<Json<IndexPage>> {
    let now = Utc::now();
    let latest_questions = store
        .published_questions(now, config.index_size())
        .await?
        .into_iter()
        .map(|question| QuestionSummary::new(question, now))
        .collect();
    Ok(Json(IndexPage {
        latest_questions,
        message: flash.map(Message::from),
    }))
}

#[get("/polls/<question_id>")]
pub async fn detail(
    question_id: Id,
    token: Option<AuthToken<Voter>>,
    store: &State<Store>,
    flash: Option<FlashMessage<'_>>,
) -> Result<Page<QuestionDetail>> {
    let now = Utc::now();
    let Some(question) = store.question(question_id).await? else {
        return Ok(Err(missing(question_id)));
    };
    let eligibility = question.eligibility(now);
    if !eligibility.can_vote() {
        return Ok(Err(Flash::warning(
            Redirect::to(uri!(index)),
            eligibility.to_string(),
        )));
    }

    let choices = store.choices(question.id).await?;
    let selected_choice = match token {
        Some(token) => store
            .find_vote(token.id, question.id)
            .await?
            .map(|vote| vote.choice_id.into()),
        None => None,
    };

    Ok(Ok(Json(QuestionDetail {
        question: QuestionSummary::new(question, now),
        choices: choices.into_iter().map(Into::into).collect(),
        selected_choice,
        message: flash.map(Message::from),
    })))
}

#[get("/polls/<question_id>/results")]
pub async fn results(
    question_id: Id,
    store: &State<Store>,
    flash: Option<FlashMessage<'_>>,
) -> Result<Page<QuestionResults>> {
    let now = Utc::now();
    let Some(question) = store.question(question_id).await? else {
        return Ok(Err(missing(question_id)));
    };
    if question.eligibility(now) == Eligibility::NotYetPublished {
        return Ok(Err(Flash::warning(
            Redirect::to(uri!(index)),
            Eligibility::NotYetPublished.to_string(),
        )));
    }

    let mut choices = Vec::new();
    for choice in store.choices(question.id).await? {
        let votes = store.count_votes(choice.id).await?;
        choices.push(ChoiceTally {
            id: choice.id.into(),
            text: choice.choice.text,
            votes,
        });
    }
    let total_votes = store.count_question_votes(question.id).await?;

    Ok(Ok(Json(QuestionResults {
        question: QuestionSummary::new(question, now),
        choices,
        total_votes,
        message: flash.map(Message::from),
    })))
}

#[post("/polls/<question_id>/vote", data = "<form>")]
pub async fn vote(
    question_id: Id,
    form: Form<VoteForm>,
    token: Option<AuthToken<Voter>>,
    store: &State<Store>,
) -> Result<Flash<Redirect>> {
    let voter = token.map(|token| token.id);
    let outcome = cast_vote(&***store, voter, question_id, form.choice, Utc::now()).await?;

    Ok(match outcome {
        VoteOutcome::Recorded(_) => Flash::success(
            Redirect::to(uri!(results(question_id))),
            "Your vote has been recorded.",
        ),
        VoteOutcome::Updated(_) => Flash::success(
            Redirect::to(uri!(results(question_id))),
            "Your vote has been updated.",
        ),
        VoteOutcome::Rejected(rejection @ Rejection::Unauthenticated) => {
            let next = uri!(detail(question_id));
            Flash::warning(
                Redirect::to(format!("/auth/login?next={next}")),
                rejection.to_string(),
            )
        }
        VoteOutcome::Rejected(Rejection::NotFound(id)) => missing(id),
        VoteOutcome::Rejected(rejection @ Rejection::VotingClosed) => {
            Flash::warning(Redirect::to(uri!(index)), rejection.to_string())
        }
        VoteOutcome::Rejected(rejection @ Rejection::InvalidChoice) => Flash::error(
            Redirect::to(uri!(detail(question_id))),
            rejection.to_string(),
        ),
    })
}

/// Anything under `/polls` that isn't a question, such as a malformed ID.
#[get("/polls/<path..>", rank = 20)]
pub fn unknown(path: PathBuf) -> Flash<Redirect> {
    missing(path.display())
}

#[post("/polls/<path..>", rank = 20)]
pub fn unknown_post(path: PathBuf) -> Flash<Redirect> {
    missing(path.display())
}

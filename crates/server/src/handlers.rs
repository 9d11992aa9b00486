use axum::{
    Form,
    extract::{Path, State},
    http::HeaderMap,
    response::Response,
};
use chrono::Utc;
use tracing::info;

use crate::{
    AppState,
    auth::{self, HOME_PATH},
    db,
    error::AppError,
    messages::{self, Message},
    models::{DetailPage, IndexPage, Question, ResultsPage, VoteForm},
};

/// How many questions the index lists.
pub const INDEX_LIMIT: i64 = 5;

const QUESTION_MISSING: &str = "This question does not exist.";
const DETAIL_CLOSED: &str = "This page doesn't allow voting.";
const VOTE_CLOSED: &str = "This question does not allow voting.";
const NO_CHOICE: &str = "You didn't select a choice.";

/// Ids that are not numbers, or do not fit an `i64`, name no question.
pub fn parse_id(raw: &str) -> Option<i64> {
    raw.parse().ok()
}

pub fn detail_path(question_id: i64) -> String {
    format!("/polls/{question_id}/")
}

pub fn vote_path(question_id: i64) -> String {
    format!("/polls/{question_id}/vote/")
}

pub fn results_path(question_id: i64) -> String {
    format!("/polls/{question_id}/results/")
}

pub async fn index(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let now = Utc::now();
    let questions = db::latest_published(&state.db, now, INDEX_LIMIT).await?;
    let latest_question_list: Vec<_> = questions.iter().map(|q| q.summary(now)).collect();

    Ok(messages::page(&headers, |messages| IndexPage {
        latest_question_list,
        messages,
    }))
}

pub async fn detail(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let now = Utc::now();
    let Some(question) = find_question(&state, &raw_id).await? else {
        return Ok(messages::redirect(&headers, HOME_PATH, Message::error(QUESTION_MISSING)));
    };

    if !question.can_vote(now) {
        return Ok(messages::redirect(&headers, HOME_PATH, Message::error(DETAIL_CLOSED)));
    }

    let choices = db::choices_for(&state.db, question.id).await?;

    let choice_voted = match auth::current_user(&state, &headers).await? {
        Some(user) => db::find_vote(&state.db, user.id, question.id)
            .await?
            .and_then(|vote| choices.iter().find(|c| c.id == vote.choice_id))
            .map(|c| c.choice_text.clone()),
        None => None,
    };

    Ok(messages::page(&headers, |messages| DetailPage {
        question: question.summary(now),
        choices,
        choice_voted,
        messages,
    }))
}

pub async fn vote(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    headers: HeaderMap,
    form: Option<Form<VoteForm>>,
) -> Result<Response, AppError> {
    let Some(question_id) = parse_id(&raw_id) else {
        return Ok(messages::redirect(&headers, HOME_PATH, Message::error(QUESTION_MISSING)));
    };
    let Some(user) = auth::current_user(&state, &headers).await? else {
        return Ok(auth::login_redirect(&vote_path(question_id)));
    };

    let now = Utc::now();
    let Some(question) = db::find_question(&state.db, question_id).await? else {
        return Ok(messages::redirect(&headers, HOME_PATH, Message::error(QUESTION_MISSING)));
    };

    if !question.can_vote(now) {
        return Ok(messages::redirect(&headers, HOME_PATH, Message::error(VOTE_CLOSED)));
    }

    let selected = form
        .and_then(|Form(form)| form.choice)
        .and_then(|raw| raw.trim().parse::<i64>().ok());
    let choice = match selected {
        Some(choice_id) => db::find_choice(&state.db, question.id, choice_id).await?,
        None => None,
    };
    let Some(choice) = choice else {
        return Ok(messages::redirect(
            &headers,
            &detail_path(question.id),
            Message::error(NO_CHOICE),
        ));
    };

    db::record_vote(&state.db, user.id, &choice, now).await?;
    info!(
        username = %user.username,
        question_id = question.id,
        choice_id = choice.id,
        "Vote recorded"
    );

    Ok(messages::redirect(
        &headers,
        &results_path(question.id),
        Message::success(format!(
            "Your vote for {} has been saved.",
            question.question_text
        )),
    ))
}

/// A plain GET on the vote URL, typically the `next` hop after logging in,
/// submits nothing: it goes back to the detail page like an empty form.
pub async fn vote_page(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let Some(question_id) = parse_id(&raw_id) else {
        return Ok(messages::redirect(&headers, HOME_PATH, Message::error(QUESTION_MISSING)));
    };
    if auth::current_user(&state, &headers).await?.is_none() {
        return Ok(auth::login_redirect(&vote_path(question_id)));
    }

    let Some(question) = db::find_question(&state.db, question_id).await? else {
        return Ok(messages::redirect(&headers, HOME_PATH, Message::error(QUESTION_MISSING)));
    };
    if !question.can_vote(Utc::now()) {
        return Ok(messages::redirect(&headers, HOME_PATH, Message::error(VOTE_CLOSED)));
    }

    Ok(messages::redirect(
        &headers,
        &detail_path(question.id),
        Message::error(NO_CHOICE),
    ))
}

pub async fn results(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let now = Utc::now();
    let question = find_question(&state, &raw_id)
        .await?
        .filter(|q| q.is_published(now));
    let Some(question) = question else {
        return Ok(messages::redirect(&headers, HOME_PATH, Message::error(QUESTION_MISSING)));
    };

    let choices = db::tally(&state.db, question.id).await?;
    let total_votes: i64 = choices.iter().map(|c| c.votes).sum();

    Ok(messages::page(&headers, |messages| ResultsPage {
        question: question.summary(now),
        choices,
        total_votes,
        messages,
    }))
}

async fn find_question(
    state: &AppState,
    raw_id: &str,
) -> Result<Option<Question>, AppError> {
    match parse_id(raw_id) {
        Some(id) => Ok(db::find_question(&state.db, id).await?),
        None => Ok(None),
    }
}

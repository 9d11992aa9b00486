use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::messages::Message;

// ===== Records =====

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Question {
    pub id: i64,
    pub question_text: String,
    pub pub_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
}

impl Question {
    /// A question becomes visible once its publication date has passed.
    pub fn is_published(&self, now: DateTime<Utc>) -> bool {
        self.pub_date <= now
    }

    /// Voting is open from `pub_date` through `end_date`, both inclusive.
    /// A question without an end date stays open forever.
    pub fn can_vote(&self, now: DateTime<Utc>) -> bool {
        self.is_published(now) && self.end_date.is_none_or(|end| now <= end)
    }

    pub fn was_published_recently(&self, now: DateTime<Utc>) -> bool {
        now - Duration::days(1) <= self.pub_date && self.pub_date <= now
    }

    pub fn summary(&self, now: DateTime<Utc>) -> QuestionSummary {
        QuestionSummary {
            id: self.id,
            question_text: self.question_text.clone(),
            pub_date: self.pub_date,
            end_date: self.end_date,
            was_published_recently: self.was_published_recently(now),
            can_vote: self.can_vote(now),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Choice {
    pub id: i64,
    pub question_id: i64,
    pub choice_text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Vote {
    pub id: i64,
    pub user_id: i64,
    pub question_id: i64,
    pub choice_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub date_joined: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ChoiceTally {
    pub id: i64,
    pub choice_text: String,
    pub votes: i64,
}

// ===== Forms =====

#[derive(Debug, Default, Deserialize)]
pub struct VoteForm {
    #[serde(default)]
    pub choice: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SignupForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password1: String,
    #[serde(default)]
    pub password2: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

// ===== Pages =====

#[derive(Debug, Serialize)]
pub struct QuestionSummary {
    pub id: i64,
    pub question_text: String,
    pub pub_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub was_published_recently: bool,
    pub can_vote: bool,
}

#[derive(Debug, Serialize)]
pub struct IndexPage {
    pub latest_question_list: Vec<QuestionSummary>,
    pub messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
pub struct DetailPage {
    pub question: QuestionSummary,
    pub choices: Vec<Choice>,
    pub choice_voted: Option<String>,
    pub messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
pub struct ResultsPage {
    pub question: QuestionSummary,
    pub choices: Vec<ChoiceTally>,
    pub total_votes: i64,
    pub messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
pub struct FormPage {
    pub form: &'static str,
    pub fields: &'static [&'static str],
    pub next: Option<String>,
    pub messages: Vec<Message>,
}

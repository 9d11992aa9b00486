use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub level: String,
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuestionSummary {
    pub id: i64,
    pub question_text: String,
    pub was_published_recently: bool,
    pub can_vote: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub id: i64,
    pub choice_text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceTally {
    pub choice_text: String,
    pub votes: i64,
}

#[derive(Debug, Deserialize)]
pub struct IndexPage {
    pub latest_question_list: Vec<QuestionSummary>,
    #[serde(default)]
    pub messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
pub struct DetailPage {
    pub question: QuestionSummary,
    pub choices: Vec<Choice>,
    pub choice_voted: Option<String>,
    #[serde(default)]
    pub messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
pub struct ResultsPage {
    pub question: QuestionSummary,
    pub choices: Vec<ChoiceTally>,
    pub total_votes: i64,
    #[serde(default)]
    pub messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
pub struct FormErrors {
    pub errors: BTreeMap<String, Vec<String>>,
}

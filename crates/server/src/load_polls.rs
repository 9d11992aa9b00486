//! Loads poll questions and their choices from a JSON file.
//!
//! ```json
//! [
//!   {
//!     "question_text": "What's new?",
//!     "pub_date": "2024-06-01T00:00:00Z",
//!     "end_date": null,
//!     "choices": ["Not much", "The sky"]
//!   }
//! ]
//! ```
//!
//! `pub_date` defaults to now. Questions whose text already exists are skipped.

use std::env;

use anyhow::{Context, bail};
use chrono::{DateTime, Utc};
use polls::{config::Config, db};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct PollEntry {
    question_text: String,
    pub_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    choices: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let path = env::args().nth(1).unwrap_or_else(|| "polls.json".to_string());
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {path} - make sure it exists!"))?;
    let entries: Vec<PollEntry> =
        serde_json::from_str(&content).with_context(|| format!("Malformed {path}"))?;

    for entry in &entries {
        let text = entry.question_text.trim();
        if text.is_empty() || text.chars().count() > 200 {
            bail!("Question text must be 1-200 characters: {:?}", entry.question_text);
        }
        if let Some(choice) = entry.choices.iter().find(|c| c.trim().is_empty() || c.chars().count() > 200) {
            bail!("Choice text must be 1-200 characters: {choice:?}");
        }
    }

    let config = Config::load()?;
    let pool = db::connect(&config.database_url, config.max_connections).await?;
    println!("Connected to database!");

    let mut count = 0;
    let mut skipped = 0;

    for entry in entries {
        let text = entry.question_text.trim();

        if db::question_exists(&pool, text).await? {
            println!("⊘ Skipped (duplicate): {text}");
            skipped += 1;
            continue;
        }

        let pub_date = entry.pub_date.unwrap_or_else(Utc::now);
        let mut tx = pool.begin().await?;
        let question_id = db::create_question(&mut *tx, text, pub_date, entry.end_date).await?;
        for choice in &entry.choices {
            db::create_choice(&mut *tx, question_id, choice.trim()).await?;
        }
        tx.commit().await?;

        count += 1;
        println!("✓ Loaded: {text} ({} choices)", entry.choices.len());
    }

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✓ Successfully loaded {count} new polls!");
    if skipped > 0 {
        println!("⊘ Skipped {skipped} duplicate polls");
    }
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");

    Ok(())
}

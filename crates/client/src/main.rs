mod models;

use colored::*;
use models::*;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::env;
use std::io::{self, Write};

const DEFAULT_BACKEND_URL: &str = "http://localhost:3000";
const BAR_WIDTH: usize = 30;

// ===== Main =====

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let backend = env::var("POLLS_URL").unwrap_or_else(|_| DEFAULT_BACKEND_URL.to_string());

    println!("{}", "=".repeat(60).bright_cyan());
    println!("{}", "    🗳️  POLLS 🗳️".bright_yellow().bold());
    println!("{}", "=".repeat(60).bright_cyan());
    println!();

    // Cookies carry both the session and flash messages across redirects.
    let client = Client::builder().cookie_store(true).build()?;

    if let Err(e) = authenticate(&client, &backend).await {
        eprintln!("{} {}", "❌ Authentication failed:".red().bold(), e);
        return Ok(());
    }

    println!("{}", "✅ Logged in!".green().bold());
    println!();

    voting_loop(&client, &backend).await
}

// ===== Authentication =====

async fn authenticate(client: &Client, backend: &str) -> anyhow::Result<()> {
    loop {
        let mode = prompt("[L]ogin or [S]ign up?")?.to_lowercase();
        let signup = match mode.as_str() {
            "l" | "login" => false,
            "s" | "signup" | "sign up" => true,
            _ => {
                println!("{}", "Invalid choice. Please try again.".red());
                continue;
            }
        };

        let username = prompt("Username:")?;
        let password = prompt("Password:")?;

        let response = if signup {
            let confirm = prompt("Password (again):")?;
            client
                .post(format!("{backend}/signup/"))
                .form(&[
                    ("username", username.as_str()),
                    ("password1", password.as_str()),
                    ("password2", confirm.as_str()),
                ])
                .send()
                .await?
        } else {
            client
                .post(format!("{backend}/accounts/login/"))
                .form(&[("username", username.as_str()), ("password", password.as_str())])
                .send()
                .await?
        };

        if response.status() == StatusCode::BAD_REQUEST {
            let form: FormErrors = response.json().await?;
            for (field, errors) in form.errors {
                for error in errors {
                    println!("{} {}", format!("{field}:").yellow(), error.red());
                }
            }
            println!();
            continue;
        }

        let page: IndexPage = parse(response).await?;
        show_messages(&page.messages);
        return Ok(());
    }
}

// ===== Voting Loop =====

async fn voting_loop(client: &Client, backend: &str) -> anyhow::Result<()> {
    loop {
        let response = client.get(format!("{backend}/polls/")).send().await?;
        let page: IndexPage = parse(response).await?;
        show_messages(&page.messages);

        if page.latest_question_list.is_empty() {
            println!("{}", "No polls are available.".yellow());
            return Ok(());
        }

        println!("{}", "━".repeat(60).bright_black());
        println!("{}", "LATEST POLLS:".bright_yellow().bold());
        for (i, question) in page.latest_question_list.iter().enumerate() {
            let mut line = format!(
                "{}. {}",
                (i + 1).to_string().bright_cyan(),
                question.question_text.bright_white().bold()
            );
            if question.was_published_recently {
                line.push_str(&format!(" {}", "new".green()));
            }
            if !question.can_vote {
                line.push_str(&format!(" {}", "(closed)".bright_black()));
            }
            println!("{line}");
        }
        println!();
        println!("{}", "Pick a poll number, [Q]uit".bright_black());

        let input = prompt(">")?.to_lowercase();
        if input == "q" || input == "quit" {
            println!();
            println!("{}", "Thanks for voting! 👋".bright_cyan().bold());
            return Ok(());
        }

        let Some(question) = pick(&input, &page.latest_question_list) else {
            println!("{}", "Invalid choice. Please try again.".red());
            continue;
        };

        if question.can_vote {
            vote_on(client, backend, question.id).await?;
        } else {
            show_results(client, backend, question.id).await?;
        }
    }
}

async fn vote_on(client: &Client, backend: &str, question_id: i64) -> anyhow::Result<()> {
    let detail_path = format!("/polls/{question_id}/");
    let response = client.get(format!("{backend}{detail_path}")).send().await?;

    // A closed or missing question redirects back to the index.
    if response.url().path() != detail_path {
        let page: IndexPage = parse(response).await?;
        show_messages(&page.messages);
        return Ok(());
    }

    let page: DetailPage = parse(response).await?;
    show_messages(&page.messages);

    println!();
    println!("{}", page.question.question_text.bright_white().bold());
    for (i, choice) in page.choices.iter().enumerate() {
        let marker = if page.choice_voted.as_deref() == Some(choice.choice_text.as_str()) {
            " ← your vote".green().to_string()
        } else {
            String::new()
        };
        println!("  {}. {}{}", (i + 1).to_string().bright_cyan(), choice.choice_text, marker);
    }
    println!();
    println!("{}", "Pick a choice number, [R]esults, [B]ack".bright_black());

    let input = prompt(">")?.to_lowercase();
    match input.as_str() {
        "b" | "back" => return Ok(()),
        "r" | "results" => return show_results(client, backend, question_id).await,
        _ => {}
    }

    // An unknown number still posts, so the server answers with its own error.
    let choice = pick(&input, &page.choices)
        .map(|choice| choice.id.to_string())
        .unwrap_or_default();

    let response = client
        .post(format!("{backend}/polls/{question_id}/vote/"))
        .form(&[("choice", choice.as_str())])
        .send()
        .await?;

    if response.url().path().ends_with("/results/") {
        let page: ResultsPage = parse(response).await?;
        print_results(&page);
    } else if response.url().path() == detail_path {
        let page: DetailPage = parse(response).await?;
        show_messages(&page.messages);
    } else {
        let page: IndexPage = parse(response).await?;
        show_messages(&page.messages);
    }

    Ok(())
}

async fn show_results(client: &Client, backend: &str, question_id: i64) -> anyhow::Result<()> {
    let response = client
        .get(format!("{backend}/polls/{question_id}/results/"))
        .send()
        .await?;

    if !response.url().path().ends_with("/results/") {
        let page: IndexPage = parse(response).await?;
        show_messages(&page.messages);
        return Ok(());
    }

    let page: ResultsPage = parse(response).await?;
    print_results(&page);
    Ok(())
}

// ===== Output =====

fn print_results(page: &ResultsPage) {
    show_messages(&page.messages);

    println!();
    println!("{}", "=".repeat(60).bright_cyan());
    println!("{}", "    📊 RESULTS".bright_yellow().bold());
    println!("{}", page.question.question_text.bright_white().bold());
    println!("{}", "=".repeat(60).bright_cyan());
    println!();

    for choice in &page.choices {
        println!(
            "{:<24} {} {}",
            choice.choice_text,
            bar(choice.votes, page.total_votes, BAR_WIDTH).green(),
            choice.votes.to_string().yellow()
        );
    }

    println!();
    println!(
        "{} {}",
        "Total votes:".bright_black(),
        page.total_votes.to_string().bright_cyan()
    );
    println!();
}

fn show_messages(messages: &[Message]) {
    for message in messages {
        match message.level.as_str() {
            "success" => println!("{}", format!("✓ {}", message.text).green()),
            "error" => println!("{}", format!("✗ {}", message.text).red()),
            _ => println!("{}", format!("→ {}", message.text).yellow()),
        }
    }
}

/// A horizontal bar `width` cells wide, filled in proportion to `votes / total`.
fn bar(votes: i64, total: i64, width: usize) -> String {
    let filled = if total <= 0 {
        0
    } else {
        ((votes.max(0) as f64 / total as f64) * width as f64).round() as usize
    };
    let filled = filled.min(width);
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

// ===== Input =====

fn prompt(label: &str) -> anyhow::Result<String> {
    print!("{} ", label.bright_green().bold());
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

/// One-based menu selection.
fn pick<'a, T>(input: &str, items: &'a [T]) -> Option<&'a T> {
    let index: usize = input.trim().parse().ok()?;
    index.checked_sub(1).and_then(|i| items.get(i))
}

// ===== API Calls =====

async fn parse<T: DeserializeOwned>(response: Response) -> anyhow::Result<T> {
    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().await?;
        anyhow::bail!("API error ({}): {}", status, text);
    }

    Ok(response.json().await?)
}

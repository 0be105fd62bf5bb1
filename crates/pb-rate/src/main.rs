use std::io::{self, Write};

use clap::Parser;
use colored::Colorize;
use serde::Deserialize;

#[derive(Debug, Parser)]
#[command(name = "pb-rate", about = "Interactive rating client for pairbench")]
struct Args {
    #[arg(long, default_value = "http://localhost:8080")]
    api_base: String,
    /// Rater identifier; prompted for interactively when omitted.
    #[arg(long)]
    user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SessionView {
    token: String,
    phase: String,
    total: usize,
    position: usize,
    scored: usize,
    sample: Option<SampleView>,
    can_back: bool,
    can_skip: bool,
    can_submit: bool,
}

#[derive(Debug, Deserialize)]
struct SampleView {
    instruction: String,
    image1: String,
    image2: String,
    pair: String,
    selected_score: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

fn prompt_line(prompt: &str) -> io::Result<Option<String>> {
    print!("{prompt}");
    io::stdout().flush()?;

    let mut input = String::new();
    match io::stdin().read_line(&mut input) {
        Ok(0) => Ok(None),
        Ok(_) => Ok(Some(input.trim().to_owned())),
        Err(err) => Err(err),
    }
}

async fn parse_view(response: reqwest::Response) -> Result<SessionView, String> {
    if response.status().is_success() {
        response
            .json::<SessionView>()
            .await
            .map_err(|err| format!("failed to decode session view: {err}"))
    } else {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorEnvelope>(&body)
            .map(|v| v.error.message)
            .unwrap_or_else(|_| body);
        Err(format!("{status}: {message}"))
    }
}

async fn post_event(
    client: &reqwest::Client,
    api_base: &str,
    token: &str,
    event: &str,
    body: Option<serde_json::Value>,
) -> Result<SessionView, String> {
    let mut req = client.post(format!("{api_base}/v1/sessions/{token}/{event}"));
    if let Some(body) = body {
        req = req.json(&body);
    }
    let response = req
        .send()
        .await
        .map_err(|err| format!("connection error: {err}"))?;
    parse_view(response).await
}

fn show_view(view: &SessionView) {
    println!();
    println!(
        "{}",
        format!(
            "Sample {} of {} ({} scored)",
            view.position, view.total, view.scored
        )
        .bright_cyan()
    );

    let Some(sample) = view.sample.as_ref() else {
        return;
    };

    println!();
    println!("{}", sample.instruction);
    println!("{} {}", "Image 1:".bold(), sample.image1);
    println!("{} {}", "Image 2:".bold(), sample.image2);
    println!("{} {}", "Pair:".bold(), sample.pair);
    if let Some(score) = sample.selected_score {
        println!("{}", format!("Previously selected score: {score}").yellow());
    }
}

fn show_actions(view: &SessionView) -> String {
    let mut actions = vec!["[1-10] score".to_owned()];
    if view.can_back {
        actions.push("[b]ack".to_owned());
    }
    if view.can_skip {
        actions.push("s[k]ip".to_owned());
    }
    if view.can_submit {
        actions.push("[s]ubmit".to_owned());
    }
    actions.push("[r]estart".to_owned());
    actions.push("[q]uit".to_owned());
    format!("{}: ", actions.join(" / "))
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let api_base = args.api_base.trim_end_matches('/').to_owned();
    let client = reqwest::Client::new();

    println!("{}", "pairbench — human evaluation".bright_green().bold());

    let response = match client.post(format!("{api_base}/v1/sessions")).send().await {
        Ok(resp) => resp,
        Err(err) => {
            eprintln!(
                "{}",
                format!("Connection error: {err}. Please check --api-base and server status.")
                    .red()
            );
            return;
        }
    };
    let mut view = match parse_view(response).await {
        Ok(view) => view,
        Err(err) => {
            eprintln!("{}", format!("Error: failed to create session: {err}").red());
            return;
        }
    };
    let token = view.token.clone();

    let user_id = match args.user_id {
        Some(user_id) => user_id,
        None => loop {
            match prompt_line("Enter your name or ID: ") {
                Ok(Some(value)) if !value.is_empty() => break value,
                Ok(Some(_)) => eprintln!("{}", "A non-empty identifier is required.".yellow()),
                Ok(None) => {
                    println!();
                    return;
                }
                Err(err) => {
                    eprintln!("{}", format!("Error: failed to read input: {err}").red());
                    return;
                }
            }
        },
    };

    view = match post_event(
        &client,
        &api_base,
        &token,
        "begin",
        Some(serde_json::json!({ "user_id": user_id })),
    )
    .await
    {
        Ok(view) => view,
        Err(err) => {
            eprintln!("{}", format!("Error: failed to start session: {err}").red());
            return;
        }
    };

    loop {
        show_view(&view);

        let input = match prompt_line(&show_actions(&view)) {
            Ok(Some(value)) => value,
            Ok(None) => {
                println!();
                return;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: failed to read input: {err}").red());
                return;
            }
        };
        if input.is_empty() {
            continue;
        }

        let result = match input.to_ascii_lowercase().as_str() {
            "q" => {
                println!("{}", "Session abandoned.".yellow());
                return;
            }
            "b" => post_event(&client, &api_base, &token, "back", None).await,
            "k" => post_event(&client, &api_base, &token, "skip", None).await,
            "r" => post_event(&client, &api_base, &token, "restart", None).await,
            "s" => post_event(&client, &api_base, &token, "submit", None).await,
            other => match other.parse::<u8>() {
                Ok(score) => {
                    post_event(
                        &client,
                        &api_base,
                        &token,
                        "score",
                        Some(serde_json::json!({ "score": score })),
                    )
                    .await
                }
                Err(_) => {
                    eprintln!(
                        "{}",
                        "Please enter a score from 1 to 10, or b, k, r, s, q.".yellow()
                    );
                    continue;
                }
            },
        };

        match result {
            Ok(next) => {
                if next.phase == "submitted" {
                    println!(
                        "{}",
                        format!("Thanks! {} responses have been recorded.", next.scored)
                            .bright_green()
                    );
                    return;
                }
                view = next;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {err}").red());
            }
        }
    }
}

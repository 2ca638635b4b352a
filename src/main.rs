use lambda_http::{run, service_fn, Error};
use reqwest::Client as ReqwestClient;
use std::env;
use teloxide::prelude::*;
use teloxide::types::UpdateKind;
use teloxide::utils::command::BotCommands;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

mod apis;
mod commands;
mod config;
mod history;
mod prompt;
mod sigils;
mod storage;
mod utils;

use apis::GeminiClient;
use commands::{handle_command, AppState, BotCommand};
use history::History;
use storage::ConfigStore;
use utils::{message_text, parse_webhook};

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_target(false)
        .with_env_filter(EnvFilter::new("sigilcraft_bot=debug"))
        .init();

    info!("Starting the SigilCraft bot");

    // Setup telegram bot (we do it here because this place is a cold start)
    let bot = Bot::new(env::var("TELEGRAM_BOT_TOKEN").expect("TELEGRAM_BOT_TOKEN not set!"));
    info!("Telegram bot initialized");

    let client = ReqwestClient::new();
    let state = AppState {
        gemini: GeminiClient::new(
            client,
            env::var("GEMINI_API_KEY").expect("GEMINI_API_KEY not set!"),
        ),
        store: ConfigStore::from_env(),
        history: History::new(),
    };
    info!("Gemini client and chat state initialized");

    // Set commands
    let res = bot.set_my_commands(BotCommand::bot_commands()).await;

    match res {
        Ok(_) => info!("Bot commands set successfully"),
        Err(e) => warn!("Failed to set commands: {:?}", e),
    }

    // Run the Lambda function
    info!("Starting Lambda function");
    run(service_fn(|req| handler(req, &bot, &state))).await
}

async fn handler(
    req: lambda_http::Request,
    bot: &Bot,
    state: &AppState,
) -> Result<lambda_http::Response<String>, lambda_http::Error> {
    debug!("Received a new request");

    // Parse JSON webhook
    let bot = bot.clone();

    let update = match parse_webhook(req).await {
        Ok(message) => {
            debug!("Successfully parsed webhook");
            message
        }
        Err(e) => {
            error!("Failed to parse webhook: {:?}", e);
            return Ok(lambda_http::Response::builder()
                .status(400)
                .body("Failed to parse webhook".into())
                .unwrap());
        }
    };

    // Handle commands (the command may ride in a photo caption)
    if let UpdateKind::Message(message) = &update.kind {
        if let Some(text) = message_text(message) {
            debug!("Received message: {}", text);
            if let Ok(command) = BotCommand::parse(text, bot.get_me().await.unwrap().username()) {
                info!("Parsed command: {:?}", command);
                return handle_command(bot.clone(), message, command, state).await;
            }
        }
    }

    debug!("No command found in the message");

    Ok(lambda_http::Response::builder()
        .status(200)
        .body(String::new())
        .unwrap())
}

use teloxide::payloads::{SendMessageSetters, SendPhotoSetters};
use teloxide::prelude::*;
use teloxide::types::{ChatAction, InputFile, Message, ReplyParameters};
use teloxide::utils::command::BotCommands;
use tracing::{info, warn};

use crate::apis::{GeminiClient, GenerationError};
use crate::config::{ReferenceImage, SigilConfig};
use crate::history::{History, HistoryEntry};
use crate::prompt;
use crate::sigils;
use crate::storage::ConfigStore;
use crate::utils::{download_and_encode_image, get_image_from_message, reply_text};

#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(
    rename_rule = "lowercase",
    description = "SigilCraft: collectible sigil cards, forged in chat"
)]
pub enum BotCommand {
    #[command(description = "display this text")]
    Help,
    #[command(description = "welcome message")]
    Start,
    #[command(description = "forge a card, e.g. /sigil rising phoenix", alias = "s")]
    Sigil(String),
    #[command(description = "canon symbols: /canon for the list, /canon <id> to pick one", alias = "c")]
    Canon(String),
    #[command(description = "forge a random canon symbol", alias = "r")]
    Random,
    #[command(description = "change a setting: /set <param> <value>")]
    Set(String),
    #[command(description = "show current settings")]
    Config,
    #[command(description = "reset settings to defaults")]
    Reset,
    #[command(description = "recent results in this chat", alias = "h")]
    History,
}

/// Everything a webhook invocation needs besides the bot itself.
pub struct AppState {
    pub gemini: GeminiClient,
    pub store: ConfigStore,
    pub history: History,
}

pub async fn handle_command(
    bot: Bot,
    message: &Message,
    command: BotCommand,
    state: &AppState,
) -> Result<lambda_http::Response<String>, lambda_http::Error> {
    info!("Handling command: {:?}", command);
    let chat_id = message.chat.id;

    match command {
        BotCommand::Help => {
            bot.send_message(chat_id, BotCommand::descriptions().to_string())
                .await?;
        }
        BotCommand::Start => {
            let start_text = r#"
Welcome to SigilCraft! I forge collectible sigil cards from your settings.
  /sigil <subject> - forge a card (attach or reply to a photo to use it as reference)
  /canon - browse the 66-symbol canon, /canon <id> to pick one
  /random - forge a random canon symbol
  /set <param> <value> - tune element, style, color, glow and more
  /config - see the current settings
"#;
            bot.send_message(chat_id, start_text)
                .reply_parameters(ReplyParameters::new(message.id))
                .await?;
        }
        BotCommand::Sigil(args) => {
            let mut config = state.store.load(chat_id.0).await;
            let subject = args.trim();
            if !subject.is_empty() {
                config.subject = subject.to_string();
            } else if let Some(text) = reply_text(message) {
                let text = text.trim().to_string();
                if !text.is_empty() {
                    config.subject = text;
                }
            }
            if config.subject.trim().is_empty() {
                bot.send_message(
                    chat_id,
                    "Give me a subject: /sigil <subject>, or reply to a message with one.",
                )
                .reply_parameters(ReplyParameters::new(message.id))
                .await?;
                return done();
            }
            if let Err(e) = state.store.save(chat_id.0, &config).await {
                warn!("failed to persist config for chat {chat_id}: {e:?}");
            }

            if let Some(photo) = get_image_from_message(message) {
                match download_and_encode_image(&bot, &photo).await {
                    Ok(data) => {
                        config.reference_image = Some(ReferenceImage {
                            mime_type: "image/jpeg".to_string(),
                            data,
                        });
                    }
                    Err(e) => warn!("could not fetch the reference image: {e:?}"),
                }
            }

            forge(&bot, message, state, config).await?;
        }
        BotCommand::Canon(args) => {
            let args = args.trim();
            if args.is_empty() {
                bot.send_message(chat_id, sigils::listing())
                    .reply_parameters(ReplyParameters::new(message.id))
                    .await?;
                return done();
            }
            let template = args.parse::<u16>().ok().and_then(sigils::find);
            match template {
                Some(template) => {
                    let mut config = state.store.load(chat_id.0).await;
                    config.apply_template(template);
                    if let Err(e) = state.store.save(chat_id.0, &config).await {
                        warn!("failed to persist config for chat {chat_id}: {e:?}");
                    }
                    bot.send_message(
                        chat_id,
                        format!(
                            "{} ({}) selected: {}. Forge it with /sigil.",
                            template.name, template.element, template.motif
                        ),
                    )
                    .reply_parameters(ReplyParameters::new(message.id))
                    .await?;
                }
                None => {
                    bot.send_message(chat_id, format!("No canon symbol '{args}'. Ids run 1-66, see /canon."))
                        .reply_parameters(ReplyParameters::new(message.id))
                        .await?;
                }
            }
        }
        BotCommand::Random => {
            let template = sigils::random();
            let mut config = state.store.load(chat_id.0).await;
            config.apply_template(template);
            if let Err(e) = state.store.save(chat_id.0, &config).await {
                warn!("failed to persist config for chat {chat_id}: {e:?}");
            }
            info!("random canon pick: {} (#{})", template.name, template.id);
            forge(&bot, message, state, config).await?;
        }
        BotCommand::Set(args) => {
            let args = args.trim();
            let Some((param, value)) = args.split_once(' ') else {
                bot.send_message(
                    chat_id,
                    "Usage: /set <param> <value>\nParameters: subject, element, style, color, mono, thickness, glow, size, position, text, collection, label",
                )
                .reply_parameters(ReplyParameters::new(message.id))
                .await?;
                return done();
            };
            let mut config = state.store.load(chat_id.0).await;
            match config.apply_setting(param, value) {
                Ok(confirmation) => {
                    if let Err(e) = state.store.save(chat_id.0, &config).await {
                        warn!("failed to persist config for chat {chat_id}: {e:?}");
                    }
                    bot.send_message(chat_id, confirmation)
                        .reply_parameters(ReplyParameters::new(message.id))
                        .await?;
                }
                Err(problem) => {
                    bot.send_message(chat_id, problem)
                        .reply_parameters(ReplyParameters::new(message.id))
                        .await?;
                }
            }
        }
        BotCommand::Config => {
            let config = state.store.load(chat_id.0).await;
            bot.send_message(chat_id, config.summary())
                .reply_parameters(ReplyParameters::new(message.id))
                .await?;
        }
        BotCommand::Reset => {
            if let Err(e) = state.store.save(chat_id.0, &SigilConfig::default()).await {
                warn!("failed to persist config for chat {chat_id}: {e:?}");
            }
            bot.send_message(chat_id, "Settings reset to defaults.")
                .reply_parameters(ReplyParameters::new(message.id))
                .await?;
        }
        BotCommand::History => {
            let Some(latest) = state.history.latest(chat_id.0).await else {
                bot.send_message(chat_id, "Nothing forged in this chat yet. Try /sigil.")
                    .reply_parameters(ReplyParameters::new(message.id))
                    .await?;
                return done();
            };
            let entries = state.history.recent(chat_id.0).await;
            let subjects: Vec<&str> = entries.iter().map(|e| e.subject.as_str()).collect();
            match latest.result.bytes() {
                Ok(bytes) => {
                    bot.send_photo(chat_id, InputFile::memory(bytes))
                        .caption(format!(
                            "Most recent of {}: {}",
                            subjects.join(", "),
                            latest.subject
                        ))
                        .reply_parameters(ReplyParameters::new(message.id))
                        .await?;
                }
                Err(e) => {
                    warn!("stored history entry is unreadable: {e}");
                    bot.send_message(chat_id, format!("Recent subjects: {}", subjects.join(", ")))
                        .reply_parameters(ReplyParameters::new(message.id))
                        .await?;
                }
            }
        }
    }

    done()
}

/// The generation flow: compile, dispatch, deliver. Every failure path
/// replies and returns, so the chat is never left hanging.
async fn forge(
    bot: &Bot,
    message: &Message,
    state: &AppState,
    config: SigilConfig,
) -> Result<(), lambda_http::Error> {
    let chat_id = message.chat.id;
    let compiled = prompt::compile(&config);

    let status_message = bot
        .send_message(chat_id, format!("Forging \"{}\"...", config.subject))
        .reply_parameters(ReplyParameters::new(message.id))
        .disable_notification(true)
        .await?;
    bot.send_chat_action(chat_id, ChatAction::UploadPhoto)
        .await?;

    match state.gemini.generate(&compiled).await {
        Ok(result) => match result.bytes() {
            Ok(bytes) => {
                bot.send_photo(chat_id, InputFile::memory(bytes))
                    .caption(config.subject.clone())
                    .reply_parameters(ReplyParameters::new(message.id))
                    .await?;
                state
                    .history
                    .push(
                        chat_id.0,
                        HistoryEntry {
                            subject: config.subject.clone(),
                            result,
                        },
                    )
                    .await;
                bot.delete_message(status_message.chat.id, status_message.id)
                    .await?;
            }
            Err(e) => {
                bot.edit_message_text(
                    status_message.chat.id,
                    status_message.id,
                    describe_error(&e),
                )
                .await?;
            }
        },
        Err(e) => {
            bot.edit_message_text(status_message.chat.id, status_message.id, describe_error(&e))
                .await?;
        }
    }

    Ok(())
}

/// Chat-facing wording per error class. Auth failures carry the hint the
/// operator actually needs.
fn describe_error(err: &GenerationError) -> String {
    match err {
        GenerationError::Auth(message) => format!(
            "The image service rejected the credentials: {message}\nCheck the GEMINI_API_KEY configured for this bot."
        ),
        GenerationError::Transient { status, message } => format!(
            "The image service is struggling right now (status {status}: {message}). I already retried a few times, please try again in a minute."
        ),
        GenerationError::EmptyResult => {
            "The request went through, but no image came back: the service declined this prompt. Try different wording.".to_string()
        }
        GenerationError::Unknown(message) => format!("Generation failed: {message}"),
    }
}

fn done() -> Result<lambda_http::Response<String>, lambda_http::Error> {
    Ok(lambda_http::Response::builder()
        .status(200)
        .body(String::new())
        .unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_wording_matches_the_class() {
        let auth = describe_error(&GenerationError::Auth("key expired".into()));
        assert!(auth.contains("GEMINI_API_KEY"));

        let transient = describe_error(&GenerationError::Transient {
            status: 429,
            message: "quota".into(),
        });
        assert!(transient.contains("429"));

        let empty = describe_error(&GenerationError::EmptyResult);
        assert!(empty.contains("no image"));
    }
}

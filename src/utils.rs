use anyhow::anyhow;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use lambda_http::Body;
use teloxide::net::Download;
use teloxide::prelude::Requester;
use teloxide::types::{Message, PhotoSize, Update};
use teloxide::Bot;
use tracing::debug;

/// Parses the Telegram webhook body into an `Update`.
pub async fn parse_webhook(input: lambda_http::Request) -> Result<Update, lambda_http::Error> {
    let body = input.body();
    let body_str = match body {
        Body::Text(text) => text,
        not_text => {
            return Err(anyhow!("expected a text webhook body, got {not_text:?}").into());
        }
    };
    let update: Update = serde_json::from_str(body_str)?;
    Ok(update)
}

/// Command text of a message: plain text, or the caption when the command
/// arrived attached to a photo.
pub fn message_text(message: &Message) -> Option<&str> {
    message.text().or_else(|| message.caption())
}

/// Subject fallback: the text of the message being replied to.
pub fn reply_text(message: &Message) -> Option<String> {
    message
        .reply_to_message()
        .and_then(|reply| message_text(reply).map(ToOwned::to_owned))
}

/// The largest photo attached to the message or to the message it replies to.
pub fn get_image_from_message(message: &Message) -> Option<PhotoSize> {
    if let Some(photos) = message.photo() {
        debug!("image found in the message");
        return photos.last().cloned();
    }
    if let Some(photos) = message.reply_to_message().and_then(|reply| reply.photo()) {
        debug!("image found in the reply message");
        return photos.last().cloned();
    }
    None
}

pub async fn download_and_encode_image(
    bot: &Bot,
    photo: &PhotoSize,
) -> Result<String, anyhow::Error> {
    let mut buf = Vec::new();
    let path = bot.get_file(photo.file.id.clone()).await?.path;
    bot.download_file(&path, &mut buf).await?;
    debug!("downloaded reference image ({} bytes)", buf.len());
    Ok(BASE64.encode(&buf))
}

use std::env;
use std::path::PathBuf;

use anyhow::Result;
use tokio::fs;
use tracing::{debug, warn};

use crate::config::SigilConfig;

/// File-backed per-chat configuration blobs. Anything that goes wrong on
/// read degrades to the default configuration instead of failing the chat.
pub struct ConfigStore {
    dir: PathBuf,
}

impl ConfigStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn from_env() -> Self {
        let dir = env::var("SIGIL_DATA_DIR").unwrap_or_else(|_| "/tmp/sigilcraft".to_string());
        Self::new(dir)
    }

    fn path_for(&self, chat_id: i64) -> PathBuf {
        self.dir.join(format!("{chat_id}.json"))
    }

    pub async fn load(&self, chat_id: i64) -> SigilConfig {
        let path = self.path_for(chat_id);
        match fs::read_to_string(&path).await {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(config) => config,
                Err(e) => {
                    warn!("config blob at {} is corrupt ({e}), using defaults", path.display());
                    SigilConfig::default()
                }
            },
            Err(_) => {
                debug!("no stored config for chat {chat_id}, using defaults");
                SigilConfig::default()
            }
        }
    }

    /// Writes via a temp file and rename; a single writer per chat is
    /// assumed (Telegram delivers a chat's updates sequentially).
    pub async fn save(&self, chat_id: i64, config: &SigilConfig) -> Result<()> {
        fs::create_dir_all(&self.dir).await?;
        let tmp = self.dir.join(format!("{chat_id}.json.tmp"));
        fs::write(&tmp, serde_json::to_vec_pretty(config)?).await?;
        fs::rename(&tmp, self.path_for(chat_id)).await?;
        Ok(())
    }
}

//! Read-only user actions layered over the engine: clipboard export and config viewing.
//! None of these touch the profile store.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::engine::Engine;
use crate::gateway::Gateway;
use crate::ids::ProfileName;
use crate::metadata::{annotate, AnnotatedEntry};
use crate::notify::{Notice, NotificationSink};
use crate::parsed::{parse_config_text, ParsedConfig};

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("clipboard unavailable: {0}")]
    Unavailable(String),
    #[error("clipboard operation failed: {0}")]
    Failed(String),
}

#[async_trait]
pub trait Clipboard: Send + Sync {
    async fn write_text(&self, text: &str) -> Result<(), ClipboardError>;
    async fn read_text(&self) -> Result<String, ClipboardError>;
}

/// A configuration file ready to be shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigDocument {
    pub title: String,
    pub body: String,
    /// `None` for the global configuration.
    pub profile: Option<ProfileName>,
}

impl ConfigDocument {
    pub fn entries(&self) -> ParsedConfig {
        parse_config_text(&self.body)
    }

    pub fn annotated(&self) -> Vec<AnnotatedEntry> {
        annotate(&self.entries())
    }
}

const NO_GLOBAL_CONFIG: &str = "No global configuration found";

impl<G: Gateway, N: NotificationSink> Engine<G, N> {
    /// Copies the launch options for `profile` and reads them back. A read-back mismatch is
    /// still a successful copy, just not a verified one.
    pub async fn copy_steam_command(
        &self,
        profile: &ProfileName,
        clipboard: &impl Clipboard,
    ) -> bool {
        let command = match self.gateway().get_steam_command(profile).await {
            Ok(command) => command,
            Err(error) => {
                log::error!("steam command for {profile} unavailable: {error}");
                self.sink().notify(Notice::error(
                    "Error",
                    format!("Failed to copy Steam command: {error}"),
                ));
                return false;
            }
        };

        if let Err(error) = clipboard.write_text(&command).await {
            log::error!("writing steam command to clipboard failed: {error}");
            self.sink().notify(Notice::error(
                "Error",
                format!("Failed to copy Steam command: {error}"),
            ));
            return false;
        }

        let verified = match clipboard.read_text().await {
            Ok(text) => text == command,
            Err(error) => {
                log::debug!("clipboard read-back failed: {error}");
                false
            }
        };
        let body = if verified {
            "Steam command copied to clipboard (verified)"
        } else {
            "Steam command copied to clipboard"
        };
        self.sink().notify(Notice::success("Copied!", body));
        true
    }

    pub async fn view_profile_config(&self, profile: &ProfileName) -> Option<ConfigDocument> {
        match self.get_profile_config(profile).await {
            Ok(body) => Some(ConfigDocument {
                title: format!("Profile Configuration: {profile}"),
                body,
                profile: Some(profile.clone()),
            }),
            Err(error) => {
                log::error!("loading config for {profile} failed: {error}");
                self.sink().notify(Notice::error(
                    "Error",
                    format!("Failed to load profile configuration: {error}"),
                ));
                None
            }
        }
    }

    pub async fn view_global_config(&self) -> Option<ConfigDocument> {
        match self.get_global_config().await {
            Ok(body) => {
                let body = if body.trim().is_empty() {
                    NO_GLOBAL_CONFIG.to_owned()
                } else {
                    body
                };
                Some(ConfigDocument {
                    title: "Global vkBasalt Configuration".to_owned(),
                    body,
                    profile: None,
                })
            }
            Err(error) => {
                log::error!("loading global config failed: {error}");
                self.sink().notify(Notice::error(
                    "Error",
                    format!("Failed to load global configuration: {error}"),
                ));
                None
            }
        }
    }
}

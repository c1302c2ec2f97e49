use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::{broadcast, mpsc};

use vkdeck_core::metadata::{annotate, AnnotatedEntry};
use vkdeck_core::{
    ChannelSink, Clipboard, ConfigDocument, Engine, Gateway, Intent, Notice, Patch, Profile,
    ProfileName,
};

use crate::bridge::UiCommand;
use crate::error::AppError;

/// Everything the UI needs to render the profile list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateView {
    pub revision: u64,
    pub ready: bool,
    pub loading: bool,
    pub launch_activation_enabled: bool,
    pub launch_toggle_in_flight: bool,
    pub active_profile: Option<ProfileName>,
    pub global_tagged: bool,
    pub needs_maintenance: bool,
    pub profiles: Vec<Profile>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UiEvent {
    Patch(Patch),
    State(StateView),
    Notice(Notice),
    Config(ConfigDocument),
    Parsed {
        profile: ProfileName,
        entries: Vec<AnnotatedEntry>,
    },
    Error {
        message: String,
    },
}

pub struct AppRuntime<G: Gateway, C: Clipboard> {
    engine: Engine<G, ChannelSink>,
    notices: mpsc::UnboundedReceiver<Notice>,
    patches: broadcast::Receiver<Patch>,
    clipboard: C,
}

impl<G: Gateway, C: Clipboard> AppRuntime<G, C> {
    /// Returns once the first refresh has settled; a failed load is queued as a notice.
    /// Patches from the first load are not replayed, the first state event covers them.
    pub async fn bootstrap(gateway: G, clipboard: C) -> Self {
        let (sink, notices) = ChannelSink::new();
        let engine = Engine::initialize(gateway, sink).await;
        let patches = engine.subscribe();
        log::info!(
            "loaded {} profiles at revision {}",
            engine.state().profiles.len(),
            engine.revision()
        );
        Self {
            engine,
            notices,
            patches,
            clipboard,
        }
    }

    #[cfg(test)]
    pub fn engine(&self) -> &Engine<G, ChannelSink> {
        &self.engine
    }

    pub fn revision(&self) -> u64 {
        self.engine.revision()
    }

    /// Reads commands line by line and answers each with zero or more event lines.
    pub async fn run<R, W>(mut self, reader: R, mut writer: W) -> Result<(), AppError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let events = match UiCommand::parse(line) {
                Ok(command) => self.handle_ui_command(command).await,
                Err(error) => {
                    log::warn!("ignoring malformed ui command: {error}");
                    vec![UiEvent::Error {
                        message: format!("invalid command: {error}"),
                    }]
                }
            };
            for event in &events {
                let mut encoded = serde_json::to_string(event)?;
                encoded.push('\n');
                writer.write_all(encoded.as_bytes()).await?;
            }
            writer.flush().await?;
        }
        log::info!("ui stream closed");
        Ok(())
    }

    pub async fn handle_ui_command(&mut self, command: UiCommand) -> Vec<UiEvent> {
        self.handle_intent(command.into_intent()).await
    }

    pub async fn handle_intent(&mut self, intent: Intent) -> Vec<UiEvent> {
        log::debug!("handling {}", intent.name());
        let publishes_state = intent.mutates_state() || intent == Intent::UiReady;
        let mut events = Vec::new();

        match intent {
            Intent::UiReady => self.engine.ready().await,
            Intent::Refresh => {
                self.engine.refresh().await;
            }
            Intent::Activate { profile } => {
                self.engine.activate(profile).await;
            }
            Intent::Reset => {
                self.engine.reset().await;
            }
            Intent::SetLaunchActivation { enabled } => {
                self.engine.toggle_launch_activation(enabled).await;
            }
            Intent::PatchProfiles => {
                self.engine.patch_profiles().await;
            }
            Intent::CopySteamCommand { profile } => {
                self.engine
                    .copy_steam_command(&profile, &self.clipboard)
                    .await;
            }
            Intent::ViewProfileConfig { profile } => {
                if let Some(document) = self.engine.view_profile_config(&profile).await {
                    events.push(UiEvent::Config(document));
                }
            }
            Intent::ViewGlobalConfig => {
                if let Some(document) = self.engine.view_global_config().await {
                    events.push(UiEvent::Config(document));
                }
            }
            Intent::InspectProfileConfig { profile } => {
                let parsed = self.engine.get_parsed_profile_config(&profile).await;
                events.push(UiEvent::Parsed {
                    profile,
                    entries: annotate(&parsed),
                });
            }
        }

        self.drain_patches(&mut events);
        if publishes_state {
            events.push(UiEvent::State(self.state_view()));
        }
        while let Ok(notice) = self.notices.try_recv() {
            events.push(UiEvent::Notice(notice));
        }
        events
    }

    fn drain_patches(&mut self, events: &mut Vec<UiEvent>) {
        loop {
            match self.patches.try_recv() {
                Ok(patch) => events.push(UiEvent::Patch(patch)),
                // The state event that follows is complete, so dropped patches only cost detail.
                Err(TryRecvError::Lagged(skipped)) => {
                    log::warn!("ui fell {skipped} patches behind");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
    }

    pub fn state_view(&self) -> StateView {
        let snapshot = self.engine.snapshot();
        let state = snapshot.state;
        StateView {
            revision: snapshot.revision,
            ready: state.is_ready(),
            loading: state.loading,
            launch_activation_enabled: state.global.launch_activation_enabled,
            launch_toggle_in_flight: state.launch_toggle_in_flight,
            active_profile: state.global.active_profile.clone(),
            global_tagged: state.global.global_tagged,
            needs_maintenance: state.needs_maintenance(),
            profiles: state.profile_views(),
        }
    }
}

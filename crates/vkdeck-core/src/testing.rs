//! In-memory backend and notice recorder for tests, shared with downstream crates through the
//! `testing` feature.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::gateway::{methods, Gateway, GatewayError};
use crate::ids::ProfileName;
use crate::notify::{Notice, NoticeKind, NotificationSink};
use crate::parsed::{parse_config_text, ParsedConfig};

/// What the fake backend believes is on disk.
#[derive(Debug, Clone, Default)]
pub struct Backend {
    pub profiles: Vec<ProfileName>,
    pub tags: BTreeMap<ProfileName, bool>,
    pub active: Option<ProfileName>,
    pub global_tagged: bool,
    pub launch_activation_enabled: bool,
    pub configs: BTreeMap<ProfileName, String>,
    pub global_config: String,
    pub parsed: BTreeMap<ProfileName, ParsedConfig>,
}

#[derive(Default)]
struct Faults {
    failing: BTreeSet<&'static str>,
    refusing: BTreeSet<&'static str>,
    holds: BTreeMap<&'static str, Arc<Notify>>,
    calls: BTreeMap<&'static str, usize>,
}

/// Behaves like a small but honest backend: activation of an unknown profile is refused,
/// repair reports whether it changed anything, and every call is counted.
#[derive(Default)]
pub struct MockGateway {
    backend: Mutex<Backend>,
    faults: Mutex<Faults>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(self, name: &str, tagged: bool) -> Self {
        {
            let mut backend = self.backend.lock();
            backend.profiles.push(ProfileName::from(name));
            backend.tags.insert(ProfileName::from(name), tagged);
        }
        self
    }

    pub fn with_active(self, name: &str) -> Self {
        self.backend.lock().active = Some(ProfileName::from(name));
        self
    }

    pub fn with_global_tagged(self, tagged: bool) -> Self {
        self.backend.lock().global_tagged = tagged;
        self
    }

    pub fn with_launch_activation(self, enabled: bool) -> Self {
        self.backend.lock().launch_activation_enabled = enabled;
        self
    }

    pub fn with_config(self, name: &str, text: &str) -> Self {
        self.backend
            .lock()
            .configs
            .insert(ProfileName::from(name), text.to_owned());
        self
    }

    pub fn with_global_config(self, text: &str) -> Self {
        self.backend.lock().global_config = text.to_owned();
        self
    }

    pub fn backend(&self) -> Backend {
        self.backend.lock().clone()
    }

    pub fn edit(&self, change: impl FnOnce(&mut Backend)) {
        change(&mut self.backend.lock());
    }

    /// Makes `method` raise a transport error until [`MockGateway::recover`].
    pub fn fail(&self, method: &'static str) {
        self.faults.lock().failing.insert(method);
    }

    /// Makes a boolean `method` answer `false`.
    pub fn refuse(&self, method: &'static str) {
        self.faults.lock().refusing.insert(method);
    }

    pub fn recover(&self, method: &'static str) {
        let mut faults = self.faults.lock();
        faults.failing.remove(method);
        faults.refusing.remove(method);
    }

    /// Parks every call to `method` until the returned handle is notified once per call.
    pub fn hold(&self, method: &'static str) -> Arc<Notify> {
        self.faults
            .lock()
            .holds
            .entry(method)
            .or_insert_with(|| Arc::new(Notify::new()))
            .clone()
    }

    pub fn calls(&self, method: &str) -> usize {
        self.faults.lock().calls.get(method).copied().unwrap_or(0)
    }

    async fn enter(&self, method: &'static str) -> Result<(), GatewayError> {
        let gate = {
            let mut faults = self.faults.lock();
            *faults.calls.entry(method).or_insert(0) += 1;
            faults.holds.get(method).cloned()
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.faults.lock().failing.contains(method) {
            return Err(GatewayError::Transport {
                method,
                message: "connection reset".to_owned(),
            });
        }
        Ok(())
    }

    fn refusing(&self, method: &'static str) -> bool {
        self.faults.lock().refusing.contains(method)
    }
}

#[async_trait]
impl Gateway for MockGateway {
    async fn list_profiles(&self) -> Result<Vec<ProfileName>, GatewayError> {
        self.enter(methods::LIST_PROFILES).await?;
        Ok(self.backend.lock().profiles.clone())
    }

    async fn get_active_profile(&self) -> Result<Option<ProfileName>, GatewayError> {
        self.enter(methods::GET_ACTIVE_PROFILE).await?;
        Ok(self.backend.lock().active.clone())
    }

    async fn check_profile_tags(&self) -> Result<BTreeMap<ProfileName, bool>, GatewayError> {
        self.enter(methods::CHECK_PROFILE_TAGS).await?;
        Ok(self.backend.lock().tags.clone())
    }

    async fn is_global_profile_tagged(&self) -> Result<bool, GatewayError> {
        self.enter(methods::IS_GLOBAL_PROFILE_TAGGED).await?;
        Ok(self.backend.lock().global_tagged)
    }

    async fn get_enable_on_launch_status(&self) -> Result<bool, GatewayError> {
        self.enter(methods::GET_ENABLE_ON_LAUNCH_STATUS).await?;
        Ok(self.backend.lock().launch_activation_enabled)
    }

    async fn activate_profile_globally(&self, profile: &ProfileName) -> Result<bool, GatewayError> {
        self.enter(methods::ACTIVATE_PROFILE_GLOBALLY).await?;
        if self.refusing(methods::ACTIVATE_PROFILE_GLOBALLY) {
            return Ok(false);
        }
        let mut backend = self.backend.lock();
        if !backend.profiles.contains(profile) {
            return Ok(false);
        }
        backend.active = Some(profile.clone());
        Ok(true)
    }

    async fn reset_profile(&self) -> Result<bool, GatewayError> {
        self.enter(methods::RESET_PROFILE).await?;
        if self.refusing(methods::RESET_PROFILE) {
            return Ok(false);
        }
        self.backend.lock().active = None;
        Ok(true)
    }

    async fn patch_untagged_profiles(&self) -> Result<bool, GatewayError> {
        self.enter(methods::PATCH_UNTAGGED_PROFILES).await?;
        if self.refusing(methods::PATCH_UNTAGGED_PROFILES) {
            return Ok(false);
        }
        let mut backend = self.backend.lock();
        let mut repaired = false;
        for tagged in backend.tags.values_mut() {
            if !*tagged {
                *tagged = true;
                repaired = true;
            }
        }
        if backend.active.is_some() && !backend.global_tagged {
            backend.global_tagged = true;
            repaired = true;
        }
        Ok(repaired)
    }

    async fn set_enable_on_launch(&self, enabled: bool) -> Result<bool, GatewayError> {
        self.enter(methods::SET_ENABLE_ON_LAUNCH).await?;
        if self.refusing(methods::SET_ENABLE_ON_LAUNCH) {
            return Ok(false);
        }
        self.backend.lock().launch_activation_enabled = enabled;
        Ok(true)
    }

    async fn get_steam_command(&self, profile: &ProfileName) -> Result<String, GatewayError> {
        self.enter(methods::GET_STEAM_COMMAND).await?;
        Ok(format!(
            "ENABLE_VKBASALT=1 VKBASALT_CONFIG_FILE=~/.config/vkBasalt/{profile}.conf %command%"
        ))
    }

    async fn get_global_config(&self) -> Result<String, GatewayError> {
        self.enter(methods::GET_GLOBAL_CONFIG).await?;
        Ok(self.backend.lock().global_config.clone())
    }

    async fn get_profile_config(&self, profile: &ProfileName) -> Result<String, GatewayError> {
        self.enter(methods::GET_PROFILE_CONFIG).await?;
        Ok(self
            .backend
            .lock()
            .configs
            .get(profile)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_parsed_profile_config(
        &self,
        profile: &ProfileName,
    ) -> Result<Option<ParsedConfig>, GatewayError> {
        self.enter(methods::GET_PARSED_PROFILE_CONFIG).await?;
        let backend = self.backend.lock();
        if let Some(parsed) = backend.parsed.get(profile) {
            return Ok(Some(parsed.clone()));
        }
        Ok(backend.configs.get(profile).map(|text| parse_config_text(text)))
    }
}

/// Keeps every notice for later assertions. Clones share one log.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    notices: Arc<Mutex<Vec<Notice>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }

    pub fn take(&self) -> Vec<Notice> {
        std::mem::take(&mut *self.notices.lock())
    }

    pub fn last(&self) -> Option<Notice> {
        self.notices.lock().last().cloned()
    }

    pub fn count(&self, kind: NoticeKind) -> usize {
        self.notices
            .lock()
            .iter()
            .filter(|notice| notice.kind == kind)
            .count()
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, notice: Notice) {
        self.notices.lock().push(notice);
    }
}

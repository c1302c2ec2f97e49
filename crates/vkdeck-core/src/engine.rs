use std::collections::BTreeMap;

use parking_lot::Mutex;
use tokio::sync::{broadcast, watch, Mutex as AsyncMutex};

use crate::gateway::{Gateway, GatewayError};
use crate::ids::ProfileName;
use crate::notify::{Notice, NotificationSink};
use crate::outcome::{Outcome, RefreshSnapshot};
use crate::parsed::ParsedConfig;
use crate::patch::{Patch, Snapshot};
use crate::reducer::{apply_outcome, ReduceError};
use crate::state::ProfileState;

const PATCH_CHANNEL_CAPACITY: usize = 64;

/// How a user-triggered operation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationOutcome {
    Applied,
    /// The backend answered `false`.
    Refused,
    /// The call itself failed.
    Faulted,
    /// Repair found nothing to repair.
    NothingToDo,
    /// A launch toggle was already pending.
    Busy,
}

impl OperationOutcome {
    pub fn is_success(self) -> bool {
        matches!(self, Self::Applied | Self::NothingToDo)
    }
}

struct Store {
    state: ProfileState,
    revision: u64,
}

pub struct Engine<G: Gateway, N: NotificationSink> {
    gateway: G,
    sink: N,
    store: Mutex<Store>,
    // Serializes every store-mutating operation, refresh included.
    queue: AsyncMutex<()>,
    patches: broadcast::Sender<Patch>,
    ready: watch::Sender<bool>,
}

impl<G: Gateway, N: NotificationSink> Engine<G, N> {
    /// An empty store in the loading state. Nothing is fetched until [`Engine::refresh`] or
    /// [`Engine::initialize`].
    pub fn new(gateway: G, sink: N) -> Self {
        let (patches, _) = broadcast::channel(PATCH_CHANNEL_CAPACITY);
        let (ready, _) = watch::channel(false);
        Self {
            gateway,
            sink,
            store: Mutex::new(Store {
                state: ProfileState::default(),
                revision: 0,
            }),
            queue: AsyncMutex::new(()),
            patches,
            ready,
        }
    }

    /// Builds the engine and settles the first refresh before handing it out. A failed first
    /// load still yields a ready (empty) engine and an error notice.
    pub async fn initialize(gateway: G, sink: N) -> Self {
        let engine = Self::new(gateway, sink);
        {
            let _queue = engine.queue.lock().await;
            if let Err(error) = engine.reconcile().await {
                engine.report_refresh_failure(&error);
            }
        }
        engine
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn revision(&self) -> u64 {
        self.store.lock().revision
    }

    pub fn state(&self) -> ProfileState {
        self.store.lock().state.clone()
    }

    pub fn snapshot(&self) -> Snapshot {
        let store = self.store.lock();
        Snapshot {
            state: store.state.clone(),
            revision: store.revision,
        }
    }

    pub fn needs_maintenance(&self) -> bool {
        self.store.lock().state.needs_maintenance()
    }

    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    /// Resolves once the first refresh has settled.
    pub async fn ready(&self) {
        let mut rx = self.ready.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|ready| *ready).await;
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Patch> {
        self.patches.subscribe()
    }

    pub async fn refresh(&self) -> OperationOutcome {
        let _queue = self.queue.lock().await;
        match self.reconcile().await {
            Ok(()) => {
                let count = self.store.lock().state.profiles.len();
                self.sink.notify(Notice::success(
                    "Profiles refreshed",
                    format!("Loaded {count} vkBasalt profiles"),
                ));
                OperationOutcome::Applied
            }
            Err(error) => {
                self.report_refresh_failure(&error);
                OperationOutcome::Faulted
            }
        }
    }

    /// Does not check `profile` against the store; the backend decides.
    pub async fn activate(&self, profile: impl Into<ProfileName>) -> OperationOutcome {
        let profile = profile.into();
        let _queue = self.queue.lock().await;

        match self.gateway.activate_profile_globally(&profile).await {
            Ok(true) => {
                // Tags and the global tag are not re-fetched; they may be stale until the
                // next refresh.
                self.commit(Outcome::Activated(profile.clone()));
                log::info!("activated profile {profile}");
                self.sink.notify(Notice::success(
                    "Success",
                    format!("Activated profile: {profile}"),
                ));
                OperationOutcome::Applied
            }
            Ok(false) => {
                log::warn!("backend refused to activate profile {profile}");
                self.sink.notify(Notice::error(
                    "Activation refused",
                    format!("Failed to activate profile: {profile}"),
                ));
                OperationOutcome::Refused
            }
            Err(error) => {
                log::error!("activating profile {profile} failed: {error}");
                self.sink.notify(Notice::error(
                    "Activation error",
                    format!("Could not activate profile {profile}: {error}"),
                ));
                OperationOutcome::Faulted
            }
        }
    }

    pub async fn reset(&self) -> OperationOutcome {
        let _queue = self.queue.lock().await;

        match self.gateway.reset_profile().await {
            Ok(true) => {
                self.commit(Outcome::Reset);
                log::info!("vkBasalt disabled globally");
                self.sink.notify(Notice::success("Success", "vkBasalt disabled"));
                OperationOutcome::Applied
            }
            Ok(false) => {
                log::warn!("backend refused to reset the global profile");
                self.sink
                    .notify(Notice::error("Reset refused", "Failed to reset profile"));
                OperationOutcome::Refused
            }
            Err(error) => {
                log::error!("resetting the global profile failed: {error}");
                self.sink.notify(Notice::error(
                    "Reset error",
                    format!("Could not reset profile: {error}"),
                ));
                OperationOutcome::Faulted
            }
        }
    }

    pub async fn toggle_launch_activation(&self, enabled: bool) -> OperationOutcome {
        let _guard = match LaunchToggleGuard::acquire(self) {
            Ok(guard) => guard,
            Err(error) => {
                log::warn!("launch activation change rejected: {error}");
                self.sink.notify(Notice::error(
                    "Busy",
                    "A launch setting change is already in progress",
                ));
                return OperationOutcome::Busy;
            }
        };
        let _queue = self.queue.lock().await;

        match self.gateway.set_enable_on_launch(enabled).await {
            Ok(true) => {
                self.commit(Outcome::LaunchActivationSet(enabled));
                log::info!("launch activation set to {enabled}");
                let (title, verb) = if enabled {
                    ("Enabled", "will")
                } else {
                    ("Disabled", "won't")
                };
                self.sink.notify(Notice::success(
                    title,
                    format!("vkBasalt {verb} launch automatically with games"),
                ));
                OperationOutcome::Applied
            }
            Ok(false) => {
                log::warn!("backend refused to set launch activation to {enabled}");
                self.sink.notify(Notice::error(
                    "Launch setting refused",
                    "Failed to change enable on launch setting",
                ));
                OperationOutcome::Refused
            }
            Err(error) => {
                log::error!("setting launch activation to {enabled} failed: {error}");
                self.sink.notify(Notice::error(
                    "Launch setting error",
                    format!("Could not change enable on launch setting: {error}"),
                ));
                OperationOutcome::Faulted
            }
        }
    }

    /// Repairs untagged profiles, then re-reads everything: the backend only says whether it
    /// acted, not what the tags are now.
    pub async fn patch_profiles(&self) -> OperationOutcome {
        let _queue = self.queue.lock().await;

        match self.gateway.patch_untagged_profiles().await {
            Ok(true) => {
                log::info!("untagged profiles repaired, reconciling");
                match self.reconcile().await {
                    Ok(()) => {
                        self.sink
                            .notify(Notice::success("Success", "Profile tags updated"));
                        OperationOutcome::Applied
                    }
                    Err(error) => {
                        log::error!("reload after tag repair failed: {error}");
                        self.sink.notify(Notice::error(
                            "Reload failed",
                            format!("Profile tags were updated but reloading failed: {error}"),
                        ));
                        OperationOutcome::Faulted
                    }
                }
            }
            Ok(false) => {
                log::debug!("tag repair found nothing to do");
                self.sink
                    .notify(Notice::info("Info", "No profiles needed patching"));
                OperationOutcome::NothingToDo
            }
            Err(error) => {
                log::error!("tag repair failed: {error}");
                self.sink.notify(Notice::error(
                    "Repair error",
                    format!("Failed to patch profile tags: {error}"),
                ));
                OperationOutcome::Faulted
            }
        }
    }

    pub async fn get_profile_config(&self, profile: &ProfileName) -> Result<String, GatewayError> {
        self.gateway.get_profile_config(profile).await
    }

    pub async fn get_global_config(&self) -> Result<String, GatewayError> {
        self.gateway.get_global_config().await
    }

    /// Never fails the caller: a missing or undecodable config reads as empty.
    pub async fn get_parsed_profile_config(&self, profile: &ProfileName) -> ParsedConfig {
        match self.gateway.get_parsed_profile_config(profile).await {
            Ok(parsed) => parsed.unwrap_or_default(),
            Err(error) => {
                log::warn!("parsed config for {profile} unavailable: {error}");
                ParsedConfig::new()
            }
        }
    }

    pub(crate) fn sink(&self) -> &N {
        &self.sink
    }

    /// Fan-out/fan-in over the five reads. The store changes only if all five succeed.
    /// Caller must hold `queue`.
    async fn reconcile(&self) -> Result<(), GatewayError> {
        let refresh = RefreshGuard::start(self);

        let (profiles, active, tags, global_tagged, launch) = tokio::join!(
            self.gateway.list_profiles(),
            self.gateway.get_active_profile(),
            self.gateway.check_profile_tags(),
            self.gateway.is_global_profile_tagged(),
            self.gateway.get_enable_on_launch_status(),
        );

        refresh.finish(collect_snapshot(
            profiles,
            active,
            tags,
            global_tagged,
            launch,
        ))
    }

    fn report_refresh_failure(&self, error: &GatewayError) {
        log::error!("refresh failed, keeping previous snapshot: {error}");
        self.sink.notify(Notice::error(
            "Error",
            format!("Failed to load vkBasalt profiles: {error}"),
        ));
    }

    fn try_commit(&self, outcome: Outcome) -> Result<Patch, ReduceError> {
        let mut store = self.store.lock();
        let from_revision = store.revision;
        let ops = apply_outcome(&mut store.state, outcome)?;

        let to_revision = if ops.is_empty() {
            from_revision
        } else {
            from_revision + 1
        };
        store.revision = to_revision;
        drop(store);

        let patch = Patch {
            ops,
            from_revision,
            to_revision,
        };
        if !patch.ops.is_empty() {
            log::debug!("revision {from_revision} -> {to_revision}: {:?}", patch.ops);
            // No subscribers is fine.
            let _ = self.patches.send(patch.clone());
        }
        Ok(patch)
    }

    // Only the launch toggle start can be rejected; everything else always folds.
    fn commit(&self, outcome: Outcome) {
        if let Err(error) = self.try_commit(outcome) {
            log::error!("state transition rejected: {error}");
        }
    }
}

// Every failed read is logged; the first one in field order is returned.
fn collect_snapshot(
    profiles: Result<Vec<ProfileName>, GatewayError>,
    active_profile: Result<Option<ProfileName>, GatewayError>,
    tags: Result<BTreeMap<ProfileName, bool>, GatewayError>,
    global_tagged: Result<bool, GatewayError>,
    launch_activation_enabled: Result<bool, GatewayError>,
) -> Result<RefreshSnapshot, GatewayError> {
    let failures = [
        profiles.as_ref().err(),
        active_profile.as_ref().err(),
        tags.as_ref().err(),
        global_tagged.as_ref().err(),
        launch_activation_enabled.as_ref().err(),
    ];
    for error in failures.into_iter().flatten() {
        log::error!("refresh read failed: {error}");
    }

    Ok(RefreshSnapshot {
        profiles: profiles?,
        active_profile: active_profile?,
        tags: tags?,
        global_tagged: global_tagged?,
        launch_activation_enabled: launch_activation_enabled?,
    })
}

/// Keeps `loading` honest: a refresh dropped before it settles folds as a failed one.
struct RefreshGuard<'a, G: Gateway, N: NotificationSink> {
    engine: &'a Engine<G, N>,
    settled: bool,
}

impl<'a, G: Gateway, N: NotificationSink> RefreshGuard<'a, G, N> {
    fn start(engine: &'a Engine<G, N>) -> Self {
        engine.commit(Outcome::RefreshStarted);
        Self {
            engine,
            settled: false,
        }
    }

    fn finish(
        mut self,
        fetched: Result<RefreshSnapshot, GatewayError>,
    ) -> Result<(), GatewayError> {
        self.settled = true;
        let result = match fetched {
            Ok(snapshot) => {
                if let Some(active) = &snapshot.active_profile {
                    if !snapshot.profiles.contains(active) {
                        log::debug!("active profile {active} is not in the listed profiles");
                    }
                }
                self.engine.commit(Outcome::RefreshCompleted(snapshot));
                Ok(())
            }
            Err(error) => {
                self.engine.commit(Outcome::RefreshFailed);
                Err(error)
            }
        };
        self.engine.ready.send_replace(true);
        result
    }
}

impl<G: Gateway, N: NotificationSink> Drop for RefreshGuard<'_, G, N> {
    fn drop(&mut self) {
        if !self.settled {
            log::warn!("refresh abandoned before all reads settled");
            self.engine.commit(Outcome::RefreshFailed);
            self.engine.ready.send_replace(true);
        }
    }
}

/// Holds `launch_toggle_in_flight` for as long as it lives, including across cancellation.
struct LaunchToggleGuard<'a, G: Gateway, N: NotificationSink> {
    engine: &'a Engine<G, N>,
}

impl<'a, G: Gateway, N: NotificationSink> LaunchToggleGuard<'a, G, N> {
    fn acquire(engine: &'a Engine<G, N>) -> Result<Self, ReduceError> {
        engine.try_commit(Outcome::LaunchToggleStarted)?;
        Ok(Self { engine })
    }
}

impl<G: Gateway, N: NotificationSink> Drop for LaunchToggleGuard<'_, G, N> {
    fn drop(&mut self) {
        self.engine.commit(Outcome::LaunchToggleSettled);
    }
}

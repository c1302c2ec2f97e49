use std::collections::BTreeMap;

use crate::ids::ProfileName;

/// Everything one refresh fetched. Only ever built from five successful reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshSnapshot {
    pub profiles: Vec<ProfileName>,
    pub active_profile: Option<ProfileName>,
    pub tags: BTreeMap<ProfileName, bool>,
    pub global_tagged: bool,
    pub launch_activation_enabled: bool,
}

/// A backend-confirmed fact to fold into the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    RefreshStarted,
    RefreshCompleted(RefreshSnapshot),
    RefreshFailed,
    Activated(ProfileName),
    Reset,
    LaunchToggleStarted,
    LaunchActivationSet(bool),
    LaunchToggleSettled,
}

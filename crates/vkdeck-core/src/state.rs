use std::collections::BTreeMap;

use serde::Serialize;

use crate::ids::ProfileName;

/// Row-level view of one profile, derived from [`ProfileState`] on demand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Profile {
    pub name: ProfileName,
    pub tagged: bool,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GlobalProfileState {
    /// `None` means vkBasalt is disabled globally.
    pub active_profile: Option<ProfileName>,
    /// Only meaningful while `active_profile` is set.
    pub global_tagged: bool,
    pub launch_activation_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileState {
    /// Backend order, never re-sorted.
    pub profiles: Vec<ProfileName>,
    /// Descriptive only. May name profiles missing from `profiles` (or miss some) until the
    /// next refresh.
    pub tags: BTreeMap<ProfileName, bool>,
    pub global: GlobalProfileState,
    pub loading: bool,
    pub launch_toggle_in_flight: bool,
    #[serde(skip)]
    synced: bool,
}

impl Default for ProfileState {
    fn default() -> Self {
        Self {
            profiles: Vec::new(),
            tags: BTreeMap::new(),
            global: GlobalProfileState::default(),
            loading: true,
            launch_toggle_in_flight: false,
            synced: false,
        }
    }
}

impl ProfileState {
    /// True once the first refresh has settled, whichever way it went.
    pub fn is_ready(&self) -> bool {
        self.synced && !self.loading
    }

    pub fn active_profile(&self) -> Option<&ProfileName> {
        self.global.active_profile.as_ref()
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.global
            .active_profile
            .as_ref()
            .is_some_and(|active| active.as_str() == name)
    }

    /// Profiles without a tag entry render as untagged.
    pub fn is_tagged(&self, name: &str) -> bool {
        self.tags.get(name).copied().unwrap_or(false)
    }

    pub fn profile_views(&self) -> Vec<Profile> {
        self.profiles
            .iter()
            .map(|name| Profile {
                name: name.clone(),
                tagged: self.is_tagged(name.as_str()),
                is_active: self.is_active(name.as_str()),
            })
            .collect()
    }

    pub fn needs_maintenance(&self) -> bool {
        needs_maintenance(self)
    }

    pub(crate) fn mark_synced(&mut self) {
        self.synced = true;
    }
}

/// An untagged global config is only a defect while some profile is applied globally.
pub fn needs_maintenance(state: &ProfileState) -> bool {
    let untagged_profile = state.tags.values().any(|tagged| !tagged);
    let untagged_global = state.global.active_profile.is_some() && !state.global.global_tagged;
    untagged_profile || untagged_global
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::{needs_maintenance, GlobalProfileState, ProfileState};
    use crate::ids::ProfileName;

    fn state_with(
        profiles: &[&str],
        tags: &[(&str, bool)],
        active: Option<&str>,
        global_tagged: bool,
    ) -> ProfileState {
        ProfileState {
            profiles: profiles.iter().map(|name| ProfileName::from(*name)).collect(),
            tags: tags
                .iter()
                .map(|(name, tagged)| (ProfileName::from(*name), *tagged))
                .collect::<BTreeMap<_, _>>(),
            global: GlobalProfileState {
                active_profile: active.map(ProfileName::from),
                global_tagged,
                launch_activation_enabled: false,
            },
            loading: false,
            ..ProfileState::default()
        }
    }

    #[test]
    fn fresh_store_is_loading_and_not_ready() {
        let state = ProfileState::default();
        assert!(state.loading);
        assert!(!state.is_ready());
        assert!(!state.launch_toggle_in_flight);
    }

    #[test]
    fn untagged_profile_needs_maintenance() {
        let state = state_with(&["A", "B"], &[("A", true), ("B", false)], Some("A"), true);
        assert!(needs_maintenance(&state));
    }

    #[test]
    fn untagged_global_is_irrelevant_without_active_profile() {
        let state = state_with(&["A"], &[("A", true)], None, false);
        assert!(!needs_maintenance(&state));
    }

    #[test]
    fn untagged_global_with_active_profile_needs_maintenance() {
        let state = state_with(&["A"], &[("A", true)], Some("A"), false);
        assert!(needs_maintenance(&state));
    }

    #[test]
    fn empty_store_needs_no_maintenance() {
        let state = state_with(&[], &[], None, false);
        assert!(!needs_maintenance(&state));
        assert!(!state.needs_maintenance());
    }

    #[test]
    fn everything_tagged_needs_no_maintenance() {
        let state = state_with(&["A", "B"], &[("A", true), ("B", true)], Some("B"), true);
        assert!(!needs_maintenance(&state));
    }

    #[test]
    fn profile_views_keep_backend_order_and_derive_flags() {
        let state = state_with(&["Zeta", "Alpha"], &[("Alpha", true)], Some("Zeta"), true);

        let views = state.profile_views();

        assert_eq!(views.len(), 2);
        assert_eq!(views[0].name.as_str(), "Zeta");
        assert!(views[0].is_active);
        assert!(!views[0].tagged, "missing tag entry renders as untagged");
        assert_eq!(views[1].name.as_str(), "Alpha");
        assert!(!views[1].is_active);
        assert!(views[1].tagged);
    }

    #[test]
    fn active_profile_outside_list_never_matches_a_row() {
        let state = state_with(&["A", "B"], &[("A", true), ("B", true)], Some("Gone"), true);

        assert!(!state.profiles.contains(&ProfileName::from("Gone")));
        assert!(state.profile_views().iter().all(|profile| !profile.is_active));
        assert!(!needs_maintenance(&state));
    }
}

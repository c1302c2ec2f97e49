use thiserror::Error;

use crate::outcome::{Outcome, RefreshSnapshot};
use crate::patch::PatchOp;
use crate::state::ProfileState;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReduceError {
    #[error("a launch activation change is already in flight")]
    LaunchToggleInFlight,
}

pub fn apply_outcome(
    state: &mut ProfileState,
    outcome: Outcome,
) -> Result<Vec<PatchOp>, ReduceError> {
    let mut ops = Vec::new();

    match outcome {
        Outcome::RefreshStarted => set_loading(state, true, &mut ops),
        Outcome::RefreshCompleted(snapshot) => {
            apply_snapshot(state, snapshot, &mut ops);
            set_loading(state, false, &mut ops);
            state.mark_synced();
        }
        Outcome::RefreshFailed => {
            set_loading(state, false, &mut ops);
            state.mark_synced();
        }
        Outcome::Activated(profile) => {
            if state.global.active_profile.as_ref() != Some(&profile) {
                state.global.active_profile = Some(profile.clone());
                ops.push(PatchOp::SetActiveProfile {
                    profile: Some(profile),
                });
            }
        }
        Outcome::Reset => {
            if state.global.active_profile.take().is_some() {
                ops.push(PatchOp::SetActiveProfile { profile: None });
            }
        }
        Outcome::LaunchToggleStarted => {
            if state.launch_toggle_in_flight {
                return Err(ReduceError::LaunchToggleInFlight);
            }
            state.launch_toggle_in_flight = true;
            ops.push(PatchOp::SetLaunchToggleInFlight { in_flight: true });
        }
        Outcome::LaunchActivationSet(enabled) => {
            if state.global.launch_activation_enabled != enabled {
                state.global.launch_activation_enabled = enabled;
                ops.push(PatchOp::SetLaunchActivation { enabled });
            }
        }
        Outcome::LaunchToggleSettled => {
            if state.launch_toggle_in_flight {
                state.launch_toggle_in_flight = false;
                ops.push(PatchOp::SetLaunchToggleInFlight { in_flight: false });
            }
        }
    }

    Ok(ops)
}

// All five fields land in the same call; callers never see a half-applied refresh.
fn apply_snapshot(state: &mut ProfileState, snapshot: RefreshSnapshot, ops: &mut Vec<PatchOp>) {
    let RefreshSnapshot {
        profiles,
        active_profile,
        tags,
        global_tagged,
        launch_activation_enabled,
    } = snapshot;

    if state.profiles != profiles {
        state.profiles = profiles.clone();
        ops.push(PatchOp::ReplaceProfiles { profiles });
    }
    if state.tags != tags {
        state.tags = tags.clone();
        ops.push(PatchOp::ReplaceTags { tags });
    }
    if state.global.active_profile != active_profile {
        state.global.active_profile = active_profile.clone();
        ops.push(PatchOp::SetActiveProfile {
            profile: active_profile,
        });
    }
    if state.global.global_tagged != global_tagged {
        state.global.global_tagged = global_tagged;
        ops.push(PatchOp::SetGlobalTagged {
            tagged: global_tagged,
        });
    }
    if state.global.launch_activation_enabled != launch_activation_enabled {
        state.global.launch_activation_enabled = launch_activation_enabled;
        ops.push(PatchOp::SetLaunchActivation {
            enabled: launch_activation_enabled,
        });
    }
}

fn set_loading(state: &mut ProfileState, loading: bool, ops: &mut Vec<PatchOp>) {
    if state.loading != loading {
        state.loading = loading;
        ops.push(PatchOp::SetLoading { loading });
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::{apply_outcome, ReduceError};
    use crate::ids::ProfileName;
    use crate::outcome::{Outcome, RefreshSnapshot};
    use crate::patch::PatchOp;
    use crate::state::ProfileState;

    fn snapshot() -> RefreshSnapshot {
        RefreshSnapshot {
            profiles: vec!["A".into(), "B".into()],
            active_profile: Some("A".into()),
            tags: BTreeMap::from([(ProfileName::from("A"), true), (ProfileName::from("B"), false)]),
            global_tagged: true,
            launch_activation_enabled: true,
        }
    }

    fn synced_state() -> ProfileState {
        let mut state = ProfileState::default();
        apply_outcome(&mut state, Outcome::RefreshCompleted(snapshot()))
            .expect("refresh should apply");
        state
    }

    #[test]
    fn completed_refresh_overwrites_every_field_and_clears_loading() {
        let mut state = ProfileState::default();

        let ops = apply_outcome(&mut state, Outcome::RefreshCompleted(snapshot()))
            .expect("refresh should apply");

        assert_eq!(state.profiles, vec![ProfileName::from("A"), ProfileName::from("B")]);
        assert_eq!(state.tags.get("B"), Some(&false));
        assert_eq!(state.global.active_profile, Some(ProfileName::from("A")));
        assert!(state.global.global_tagged);
        assert!(state.global.launch_activation_enabled);
        assert!(!state.loading);
        assert!(state.is_ready());
        assert_eq!(ops.len(), 6);
        assert_eq!(ops.last(), Some(&PatchOp::SetLoading { loading: false }));
    }

    #[test]
    fn identical_refresh_only_toggles_loading() {
        let mut state = synced_state();
        apply_outcome(&mut state, Outcome::RefreshStarted).expect("start should apply");

        let ops = apply_outcome(&mut state, Outcome::RefreshCompleted(snapshot()))
            .expect("refresh should apply");

        assert_eq!(ops, vec![PatchOp::SetLoading { loading: false }]);
    }

    #[test]
    fn failed_refresh_keeps_snapshot_and_clears_loading() {
        let mut state = synced_state();
        apply_outcome(&mut state, Outcome::RefreshStarted).expect("start should apply");
        let before = state.clone();

        let ops = apply_outcome(&mut state, Outcome::RefreshFailed).expect("failure should apply");

        assert_eq!(ops, vec![PatchOp::SetLoading { loading: false }]);
        assert!(!state.loading);
        assert_eq!(state.profiles, before.profiles);
        assert_eq!(state.tags, before.tags);
        assert_eq!(state.global, before.global);
    }

    #[test]
    fn first_refresh_failure_still_marks_store_ready() {
        let mut state = ProfileState::default();
        apply_outcome(&mut state, Outcome::RefreshFailed).expect("failure should apply");
        assert!(state.is_ready());
        assert!(state.profiles.is_empty());
    }

    #[test]
    fn activation_patches_only_the_active_profile() {
        let mut state = synced_state();
        let tags_before = state.tags.clone();

        let ops = apply_outcome(&mut state, Outcome::Activated("B".into()))
            .expect("activation should apply");

        assert_eq!(state.global.active_profile, Some(ProfileName::from("B")));
        assert_eq!(state.tags, tags_before);
        assert_eq!(
            ops,
            vec![PatchOp::SetActiveProfile {
                profile: Some("B".into())
            }]
        );
    }

    #[test]
    fn activating_current_profile_is_noop() {
        let mut state = synced_state();
        let ops = apply_outcome(&mut state, Outcome::Activated("A".into()))
            .expect("activation should apply");
        assert!(ops.is_empty());
    }

    #[test]
    fn reset_clears_active_profile_but_not_tags() {
        let mut state = synced_state();

        let ops = apply_outcome(&mut state, Outcome::Reset).expect("reset should apply");

        assert_eq!(state.global.active_profile, None);
        assert!(state.global.global_tagged);
        assert_eq!(state.tags.len(), 2);
        assert_eq!(ops, vec![PatchOp::SetActiveProfile { profile: None }]);
    }

    #[test]
    fn overlapping_launch_toggle_is_rejected() {
        let mut state = synced_state();
        apply_outcome(&mut state, Outcome::LaunchToggleStarted).expect("first toggle starts");

        let result = apply_outcome(&mut state, Outcome::LaunchToggleStarted);

        assert_eq!(result, Err(ReduceError::LaunchToggleInFlight));
        assert!(state.launch_toggle_in_flight);
    }

    #[test]
    fn launch_toggle_settles_and_sets_flag() {
        let mut state = synced_state();
        apply_outcome(&mut state, Outcome::LaunchToggleStarted).expect("toggle starts");

        let set_ops = apply_outcome(&mut state, Outcome::LaunchActivationSet(false))
            .expect("flag should apply");
        let settle_ops =
            apply_outcome(&mut state, Outcome::LaunchToggleSettled).expect("toggle settles");

        assert!(!state.global.launch_activation_enabled);
        assert!(!state.launch_toggle_in_flight);
        assert_eq!(set_ops, vec![PatchOp::SetLaunchActivation { enabled: false }]);
        assert_eq!(
            settle_ops,
            vec![PatchOp::SetLaunchToggleInFlight { in_flight: false }]
        );
    }
}

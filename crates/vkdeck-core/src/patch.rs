use std::collections::BTreeMap;

use serde::Serialize;

use crate::ids::ProfileName;
use crate::state::ProfileState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub state: ProfileState,
    pub revision: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Patch {
    pub ops: Vec<PatchOp>,
    pub from_revision: u64,
    pub to_revision: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PatchOp {
    ReplaceProfiles {
        profiles: Vec<ProfileName>,
    },
    ReplaceTags {
        tags: BTreeMap<ProfileName, bool>,
    },
    SetActiveProfile {
        profile: Option<ProfileName>,
    },
    SetGlobalTagged {
        tagged: bool,
    },
    SetLaunchActivation {
        enabled: bool,
    },
    SetLoading {
        loading: bool,
    },
    SetLaunchToggleInFlight {
        in_flight: bool,
    },
}

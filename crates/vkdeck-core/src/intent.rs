use crate::ids::ProfileName;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    UiReady,
    Refresh,
    Activate {
        profile: ProfileName,
    },
    Reset,
    SetLaunchActivation {
        enabled: bool,
    },
    PatchProfiles,
    CopySteamCommand {
        profile: ProfileName,
    },
    ViewProfileConfig {
        profile: ProfileName,
    },
    ViewGlobalConfig,
    InspectProfileConfig {
        profile: ProfileName,
    },
}

impl Intent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::UiReady => "ui_ready",
            Self::Refresh => "refresh",
            Self::Activate { .. } => "activate",
            Self::Reset => "reset",
            Self::SetLaunchActivation { .. } => "set_launch_activation",
            Self::PatchProfiles => "patch_profiles",
            Self::CopySteamCommand { .. } => "copy_steam_command",
            Self::ViewProfileConfig { .. } => "view_profile_config",
            Self::ViewGlobalConfig => "view_global_config",
            Self::InspectProfileConfig { .. } => "inspect_profile_config",
        }
    }

    /// Whether handling this intent can change the profile store.
    pub fn mutates_state(&self) -> bool {
        matches!(
            self,
            Self::Refresh
                | Self::Activate { .. }
                | Self::Reset
                | Self::SetLaunchActivation { .. }
                | Self::PatchProfiles
        )
    }
}

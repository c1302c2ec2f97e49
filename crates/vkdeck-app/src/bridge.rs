use serde::Deserialize;
use vkdeck_core::{Intent, ProfileName};

/// One line from the UI, e.g. `{"command":"activate","profile":"Sharp"}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum UiCommand {
    UiReady,
    Refresh,
    Activate { profile: String },
    Reset,
    SetLaunchActivation { enabled: bool },
    PatchProfiles,
    CopySteamCommand { profile: String },
    ViewProfileConfig { profile: String },
    ViewGlobalConfig,
    ParsedProfileConfig { profile: String },
}

impl UiCommand {
    pub fn parse(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }

    pub fn into_intent(self) -> Intent {
        match self {
            Self::UiReady => Intent::UiReady,
            Self::Refresh => Intent::Refresh,
            Self::Activate { profile } => Intent::Activate {
                profile: ProfileName::from(profile),
            },
            Self::Reset => Intent::Reset,
            Self::SetLaunchActivation { enabled } => Intent::SetLaunchActivation { enabled },
            Self::PatchProfiles => Intent::PatchProfiles,
            Self::CopySteamCommand { profile } => Intent::CopySteamCommand {
                profile: ProfileName::from(profile),
            },
            Self::ViewProfileConfig { profile } => Intent::ViewProfileConfig {
                profile: ProfileName::from(profile),
            },
            Self::ViewGlobalConfig => Intent::ViewGlobalConfig,
            Self::ParsedProfileConfig { profile } => Intent::InspectProfileConfig {
                profile: ProfileName::from(profile),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use vkdeck_core::Intent;

    use super::UiCommand;

    #[test]
    fn parses_tagged_commands() {
        assert_eq!(
            UiCommand::parse(r#"{"command":"activate","profile":"Sharp"}"#).expect("valid"),
            UiCommand::Activate {
                profile: "Sharp".to_owned()
            }
        );
        assert_eq!(
            UiCommand::parse(r#"{"command":"set_launch_activation","enabled":false}"#)
                .expect("valid"),
            UiCommand::SetLaunchActivation { enabled: false }
        );
        assert_eq!(
            UiCommand::parse(r#"{"command":"view_global_config"}"#).expect("valid"),
            UiCommand::ViewGlobalConfig
        );
    }

    #[test]
    fn rejects_unknown_or_incomplete_commands() {
        assert!(UiCommand::parse(r#"{"command":"delete_everything"}"#).is_err());
        assert!(UiCommand::parse(r#"{"command":"activate"}"#).is_err());
        assert!(UiCommand::parse("not json").is_err());
    }

    #[test]
    fn parsed_config_maps_to_inspect_intent() {
        let intent = UiCommand::ParsedProfileConfig {
            profile: "Soft".to_owned(),
        }
        .into_intent();

        assert_eq!(
            intent,
            Intent::InspectProfileConfig {
                profile: "Soft".into()
            }
        );
        assert!(!intent.mutates_state());
        assert!(UiCommand::PatchProfiles.into_intent().mutates_state());
    }
}

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::ids::ProfileName;
use crate::parsed::ParsedConfig;

/// Backend method names, as the host exposes them.
pub mod methods {
    pub const LIST_PROFILES: &str = "list_profiles";
    pub const GET_ACTIVE_PROFILE: &str = "get_active_profile";
    pub const CHECK_PROFILE_TAGS: &str = "check_profile_tags";
    pub const IS_GLOBAL_PROFILE_TAGGED: &str = "is_global_profile_tagged";
    pub const GET_ENABLE_ON_LAUNCH_STATUS: &str = "get_enable_on_launch_status";
    pub const ACTIVATE_PROFILE_GLOBALLY: &str = "activate_profile_globally";
    pub const RESET_PROFILE: &str = "reset_profile";
    pub const PATCH_UNTAGGED_PROFILES: &str = "patch_untagged_profiles";
    pub const SET_ENABLE_ON_LAUNCH: &str = "set_enable_on_launch";
    pub const GET_STEAM_COMMAND: &str = "get_steam_command";
    pub const GET_GLOBAL_CONFIG: &str = "get_global_config";
    pub const GET_PROFILE_CONFIG: &str = "get_profile_config";
    pub const GET_PARSED_PROFILE_CONFIG: &str = "get_parsed_profile_config";
}

/// A call that did not produce a usable answer. A logical `false` is never one of these.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("transport failure calling {method}: {message}")]
    Transport {
        method: &'static str,
        message: String,
    },

    #[error("could not decode {method} result: {source}")]
    Decode {
        method: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("backend raised an error in {method}: {message}")]
    Backend {
        method: &'static str,
        message: String,
    },

    #[error("{method} timed out after {after:?}")]
    Timeout {
        method: &'static str,
        after: Duration,
    },

    #[error("backend connection closed")]
    Closed,
}

#[async_trait]
pub trait Gateway: Send + Sync {
    async fn list_profiles(&self) -> Result<Vec<ProfileName>, GatewayError>;

    async fn get_active_profile(&self) -> Result<Option<ProfileName>, GatewayError>;

    async fn check_profile_tags(&self) -> Result<BTreeMap<ProfileName, bool>, GatewayError>;

    async fn is_global_profile_tagged(&self) -> Result<bool, GatewayError>;

    async fn get_enable_on_launch_status(&self) -> Result<bool, GatewayError>;

    async fn activate_profile_globally(&self, profile: &ProfileName) -> Result<bool, GatewayError>;

    async fn reset_profile(&self) -> Result<bool, GatewayError>;

    /// `true` only when at least one repair was performed.
    async fn patch_untagged_profiles(&self) -> Result<bool, GatewayError>;

    async fn set_enable_on_launch(&self, enabled: bool) -> Result<bool, GatewayError>;

    async fn get_steam_command(&self, profile: &ProfileName) -> Result<String, GatewayError>;

    async fn get_global_config(&self) -> Result<String, GatewayError>;

    async fn get_profile_config(&self, profile: &ProfileName) -> Result<String, GatewayError>;

    /// `None` when the profile has nothing parseable.
    async fn get_parsed_profile_config(
        &self,
        profile: &ProfileName,
    ) -> Result<Option<ParsedConfig>, GatewayError>;
}

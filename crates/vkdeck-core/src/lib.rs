pub mod actions;
pub mod engine;
pub mod gateway;
pub mod ids;
pub mod intent;
pub mod metadata;
pub mod notify;
pub mod outcome;
pub mod parsed;
pub mod patch;
pub mod reducer;
pub mod rpc;
pub mod state;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use actions::{Clipboard, ClipboardError, ConfigDocument};
pub use engine::{Engine, OperationOutcome};
pub use gateway::{Gateway, GatewayError};
pub use ids::ProfileName;
pub use intent::Intent;
pub use notify::{ChannelSink, Notice, NoticeKind, NotificationSink};
pub use outcome::{Outcome, RefreshSnapshot};
pub use parsed::{parse_config_text, ConfigValue, ParsedConfig};
pub use patch::{Patch, PatchOp, Snapshot};
pub use reducer::ReduceError;
pub use rpc::{RpcGateway, Transport};
pub use state::{needs_maintenance, GlobalProfileState, Profile, ProfileState};

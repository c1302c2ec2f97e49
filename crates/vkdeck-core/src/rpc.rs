use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::gateway::{methods, Gateway, GatewayError};
use crate::ids::ProfileName;
use crate::parsed::ParsedConfig;

/// Moves one named call with positional arguments across the host boundary.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn call(&self, method: &'static str, params: Vec<Value>) -> Result<Value, GatewayError>;
}

/// [`Gateway`] over any [`Transport`], decoding results with serde.
pub struct RpcGateway<T> {
    transport: T,
    timeout: Option<Duration>,
}

impl<T: Transport> RpcGateway<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            timeout: None,
        }
    }

    /// Bounds every call; a hung backend then surfaces as [`GatewayError::Timeout`].
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn invoke<R: DeserializeOwned>(
        &self,
        method: &'static str,
        params: Vec<Value>,
    ) -> Result<R, GatewayError> {
        log::debug!("rpc call {method} ({} args)", params.len());
        let call = self.transport.call(method, params);
        let value = match self.timeout {
            Some(after) => tokio::time::timeout(after, call)
                .await
                .map_err(|_| GatewayError::Timeout { method, after })??,
            None => call.await?,
        };
        serde_json::from_value(value).map_err(|source| GatewayError::Decode { method, source })
    }
}

#[async_trait]
impl<T: Transport> Gateway for RpcGateway<T> {
    async fn list_profiles(&self) -> Result<Vec<ProfileName>, GatewayError> {
        self.invoke(methods::LIST_PROFILES, Vec::new()).await
    }

    async fn get_active_profile(&self) -> Result<Option<ProfileName>, GatewayError> {
        self.invoke(methods::GET_ACTIVE_PROFILE, Vec::new()).await
    }

    async fn check_profile_tags(&self) -> Result<BTreeMap<ProfileName, bool>, GatewayError> {
        self.invoke(methods::CHECK_PROFILE_TAGS, Vec::new()).await
    }

    async fn is_global_profile_tagged(&self) -> Result<bool, GatewayError> {
        self.invoke(methods::IS_GLOBAL_PROFILE_TAGGED, Vec::new())
            .await
    }

    async fn get_enable_on_launch_status(&self) -> Result<bool, GatewayError> {
        self.invoke(methods::GET_ENABLE_ON_LAUNCH_STATUS, Vec::new())
            .await
    }

    async fn activate_profile_globally(&self, profile: &ProfileName) -> Result<bool, GatewayError> {
        self.invoke(methods::ACTIVATE_PROFILE_GLOBALLY, vec![json!(profile)])
            .await
    }

    async fn reset_profile(&self) -> Result<bool, GatewayError> {
        self.invoke(methods::RESET_PROFILE, Vec::new()).await
    }

    async fn patch_untagged_profiles(&self) -> Result<bool, GatewayError> {
        self.invoke(methods::PATCH_UNTAGGED_PROFILES, Vec::new())
            .await
    }

    async fn set_enable_on_launch(&self, enabled: bool) -> Result<bool, GatewayError> {
        self.invoke(methods::SET_ENABLE_ON_LAUNCH, vec![json!(enabled)])
            .await
    }

    async fn get_steam_command(&self, profile: &ProfileName) -> Result<String, GatewayError> {
        self.invoke(methods::GET_STEAM_COMMAND, vec![json!(profile)])
            .await
    }

    async fn get_global_config(&self) -> Result<String, GatewayError> {
        let config: Option<String> = self.invoke(methods::GET_GLOBAL_CONFIG, Vec::new()).await?;
        Ok(config.unwrap_or_default())
    }

    async fn get_profile_config(&self, profile: &ProfileName) -> Result<String, GatewayError> {
        let config: Option<String> = self
            .invoke(methods::GET_PROFILE_CONFIG, vec![json!(profile)])
            .await?;
        Ok(config.unwrap_or_default())
    }

    async fn get_parsed_profile_config(
        &self,
        profile: &ProfileName,
    ) -> Result<Option<ParsedConfig>, GatewayError> {
        self.invoke(methods::GET_PARSED_PROFILE_CONFIG, vec![json!(profile)])
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::time::Duration;

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::{json, Value};

    use super::{RpcGateway, Transport};
    use crate::gateway::{methods, Gateway, GatewayError};
    use crate::ids::ProfileName;
    use crate::parsed::ConfigValue;

    #[derive(Default)]
    struct CannedTransport {
        replies: BTreeMap<&'static str, Value>,
        calls: Mutex<Vec<(&'static str, Vec<Value>)>>,
        hang: bool,
    }

    impl CannedTransport {
        fn with(mut self, method: &'static str, reply: Value) -> Self {
            self.replies.insert(method, reply);
            self
        }
    }

    #[async_trait]
    impl Transport for CannedTransport {
        async fn call(
            &self,
            method: &'static str,
            params: Vec<Value>,
        ) -> Result<Value, GatewayError> {
            self.calls.lock().push((method, params));
            if self.hang {
                std::future::pending::<()>().await;
            }
            self.replies
                .get(method)
                .cloned()
                .ok_or_else(|| GatewayError::Backend {
                    method,
                    message: "no such method".to_owned(),
                })
        }
    }

    #[tokio::test]
    async fn decodes_typed_results_and_sends_positional_args() {
        let transport = CannedTransport::default()
            .with(methods::LIST_PROFILES, json!(["Sharp", "Soft"]))
            .with(methods::GET_ACTIVE_PROFILE, Value::Null)
            .with(methods::ACTIVATE_PROFILE_GLOBALLY, json!(true));
        let gateway = RpcGateway::new(transport);

        let profiles = gateway.list_profiles().await.expect("list should decode");
        let active = gateway
            .get_active_profile()
            .await
            .expect("active should decode");
        let activated = gateway
            .activate_profile_globally(&ProfileName::from("Soft"))
            .await
            .expect("activate should decode");

        assert_eq!(profiles, vec![ProfileName::from("Sharp"), ProfileName::from("Soft")]);
        assert_eq!(active, None);
        assert!(activated);
        let calls = gateway.transport().calls.lock();
        assert_eq!(calls[2].0, methods::ACTIVATE_PROFILE_GLOBALLY);
        assert_eq!(calls[2].1, vec![json!("Soft")]);
    }

    #[tokio::test]
    async fn wrong_shape_is_a_decode_error() {
        let transport = CannedTransport::default().with(methods::CHECK_PROFILE_TAGS, json!([1, 2]));
        let gateway = RpcGateway::new(transport);

        let result = gateway.check_profile_tags().await;

        assert!(matches!(
            result,
            Err(GatewayError::Decode { method, .. }) if method == methods::CHECK_PROFILE_TAGS
        ));
    }

    #[tokio::test]
    async fn null_config_text_reads_as_empty() {
        let transport = CannedTransport::default().with(methods::GET_GLOBAL_CONFIG, Value::Null);
        let gateway = RpcGateway::new(transport);

        let config = gateway.get_global_config().await.expect("null is tolerated");

        assert_eq!(config, "");
    }

    #[tokio::test]
    async fn parsed_config_decodes_mixed_values() {
        let transport = CannedTransport::default().with(
            methods::GET_PARSED_PROFILE_CONFIG,
            json!({"casSharpness": 0.4, "effects": "cas"}),
        );
        let gateway = RpcGateway::new(transport);

        let parsed = gateway
            .get_parsed_profile_config(&ProfileName::from("Sharp"))
            .await
            .expect("parsed config should decode")
            .expect("parsed config should be present");

        assert_eq!(parsed.get("casSharpness"), Some(&ConfigValue::Float(0.4)));
    }

    #[tokio::test(start_paused = true)]
    async fn hung_call_times_out() {
        let transport = CannedTransport {
            hang: true,
            ..CannedTransport::default()
        };
        let gateway = RpcGateway::new(transport).with_timeout(Duration::from_secs(5));

        let result = gateway.set_enable_on_launch(true).await;

        assert!(matches!(
            result,
            Err(GatewayError::Timeout { method, after })
                if method == methods::SET_ENABLE_ON_LAUNCH && after == Duration::from_secs(5)
        ));
    }
}

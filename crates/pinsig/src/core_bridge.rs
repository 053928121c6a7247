//! Request/response boundary to the external credential core
//!
//! The core is reached through a single call taking a function name and a
//! JSON request, returning a JSON [`CoreResult`] envelope. Payloads are
//! passed through without interpretation.

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Response envelope of the credential core
///
/// An empty `error` with a value present is success. The value is carried
/// base64 encoded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreResult {
    /// Opaque response payload
    #[serde(default, with = "base64_option", skip_serializing_if = "Option::is_none")]
    pub value: Option<Vec<u8>>,

    /// Error message, empty on success
    #[serde(default)]
    pub error: String,
}

impl CoreResult {
    /// Create a successful result
    pub fn success(value: impl Into<Vec<u8>>) -> Self {
        Self {
            value: Some(value.into()),
            error: String::new(),
        }
    }

    /// Create a failed result
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            value: None,
            error: error.into(),
        }
    }

    /// Turn the envelope into the payload or an [`Error::Core`]
    pub fn into_result(self) -> Result<Vec<u8>> {
        if !self.error.is_empty() {
            return Err(Error::Core(self.error));
        }
        self.value
            .ok_or_else(|| Error::Core("response carries neither value nor error".to_string()))
    }
}

/// The external credential core
pub trait CredentialCore: Send + Sync {
    /// Invoke `function` with a JSON request, returning a JSON [`CoreResult`]
    fn call(&self, function: &str, request: &[u8]) -> Vec<u8>;
}

/// Invoke a core function with raw request bytes, returning the raw payload
pub fn invoke_raw(core: &dyn CredentialCore, function: &str, request: &[u8]) -> Result<Vec<u8>> {
    tracing::debug!(function, request_len = request.len(), "Calling credential core");
    let response = core.call(function, request);
    let result: CoreResult = serde_json::from_slice(&response)?;
    result.into_result()
}

/// Invoke a core function with a JSON request and decode the JSON payload
pub fn invoke<Req, Resp>(core: &dyn CredentialCore, function: &str, request: &Req) -> Result<Resp>
where
    Req: Serialize,
    Resp: DeserializeOwned,
{
    let request = serde_json::to_vec(request)?;
    let value = invoke_raw(core, function, &request)?;
    Ok(serde_json::from_slice(&value)?)
}

/// Serde helper for optional base64 encoded byte payloads
mod base64_option {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match bytes {
            Some(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .map(|s| STANDARD.decode(s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Echoes the request back, or fails for unknown functions
    struct EchoCore;

    impl CredentialCore for EchoCore {
        fn call(&self, function: &str, request: &[u8]) -> Vec<u8> {
            let result = match function {
                "echo" => CoreResult::success(request),
                "empty" => CoreResult::default(),
                "garbage" => return b"not json".to_vec(),
                other => CoreResult::failure(format!("unknown function {}", other)),
            };
            serde_json::to_vec(&result).unwrap()
        }
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Attributes {
        name: String,
        valid: bool,
    }

    #[test]
    fn test_typed_round_trip() {
        let request = Attributes {
            name: "holder".to_string(),
            valid: true,
        };
        let response: Attributes = invoke(&EchoCore, "echo", &request).unwrap();
        assert_eq!(response, request);
    }

    #[test]
    fn test_value_is_base64() {
        let encoded = serde_json::to_value(CoreResult::success(b"hi".to_vec())).unwrap();
        assert_eq!(encoded, json!({"value": "aGk=", "error": ""}));

        let decoded: CoreResult = serde_json::from_value(json!({"value": "aGk="})).unwrap();
        assert_eq!(decoded.into_result().unwrap(), b"hi");
    }

    #[test]
    fn test_core_errors() {
        match invoke_raw(&EchoCore, "verify", b"{}") {
            Err(Error::Core(message)) => assert_eq!(message, "unknown function verify"),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(matches!(
            invoke_raw(&EchoCore, "empty", b"{}"),
            Err(Error::Core(_))
        ));
        assert!(matches!(
            invoke_raw(&EchoCore, "garbage", b"{}"),
            Err(Error::Json(_))
        ));
    }
}

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Name of the claim carrying the tenant identifier.
pub const REALM_CLAIM: &str = "realm";

/// Claims decoded from a bearer token.
///
/// `realm` is guaranteed non-empty; `payload` holds the complete claim set,
/// including `realm` itself.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenClaims {
    pub realm: String,
    pub payload: Map<String, Value>,
}

impl TokenClaims {
    /// Builds claims from a decoded claim set.
    ///
    /// Returns `None` when the `realm` claim is absent, not a string, or empty.
    #[must_use]
    pub fn from_payload(payload: Map<String, Value>) -> Option<Self> {
        let realm = payload
            .get(REALM_CLAIM)
            .and_then(Value::as_str)
            .filter(|realm| !realm.is_empty())?
            .to_string();
        Some(Self { realm, payload })
    }
}

/// Opaque decision returned by the gatekeeper on a successful validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyDecision(pub Value);

impl PolicyDecision {
    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

impl From<Value> for PolicyDecision {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

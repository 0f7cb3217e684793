use crate::error::ClientError;
use serde::Deserialize;
use serde_json::Value;

/// Locator for one resource instance, taken from a response's `metadata.selfLink`.
///
/// Held for the lifetime of a scenario iteration and used for every read, update and delete
/// against the instance. Meaningless once the resource has been deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRef(String);

impl ResourceRef {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque optimistic-concurrency token from `metadata.resourceVersion`.
///
/// Must be re-read immediately before each update and echoed back in the update payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceVersion(String);

impl ResourceVersion {
    pub fn new(version: impl Into<String>) -> Self {
        Self(version.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum AllocationState {
    Allocated,
    UnAllocated,
    /// Anything the server reports before reaching a terminal state.
    #[serde(other)]
    Pending,
}

impl AllocationState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AllocationState::Allocated | AllocationState::UnAllocated)
    }
}

/// Partial view of a resource's reconciled state.
///
/// Either field may be missing while the backend is still converging. An absent field never
/// matches any target value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ObservedStatus {
    #[serde(rename = "readyReplicas")]
    pub ready_replicas: Option<u32>,
    pub state: Option<AllocationState>,
}

/// A decoded API response document.
///
/// The payload is kept as a generic attribute mapping; accessors pull out the handful of
/// fields the harness consumes and report a [ClientError::Decode] when a required field is
/// missing.
#[derive(Debug, Clone)]
pub struct ResourceDocument {
    raw: Value,
}

impl ResourceDocument {
    pub fn from_value(raw: Value) -> Self {
        Self { raw }
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn name(&self) -> Result<&str, ClientError> {
        self.metadata_str("name")
    }

    pub fn self_link(&self) -> Result<ResourceRef, ClientError> {
        self.metadata_str("selfLink").map(ResourceRef::new)
    }

    pub fn resource_version(&self) -> Result<ResourceVersion, ClientError> {
        self.metadata_str("resourceVersion").map(ResourceVersion::new)
    }

    /// `Ok(None)` when the resource carries no status yet. That is the normal not-yet-reconciled
    /// state, not an error.
    pub fn status(&self) -> Result<Option<ObservedStatus>, ClientError> {
        match self.raw.get("status") {
            None | Some(Value::Null) => Ok(None),
            Some(status) => serde_json::from_value(status.clone())
                .map(Some)
                .map_err(|e| ClientError::Decode(format!("Malformed status: {e}"))),
        }
    }

    fn metadata_str(&self, field: &str) -> Result<&str, ClientError> {
        self.raw
            .get("metadata")
            .and_then(|m| m.get(field))
            .and_then(Value::as_str)
            .ok_or_else(|| ClientError::Decode(format!("Response is missing metadata.{field}")))
    }
}

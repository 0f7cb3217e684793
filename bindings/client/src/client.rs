use crate::error::ClientError;
use crate::resource::{ResourceDocument, ResourceRef, ResourceVersion};
use serde_json::Value;
use url::Url;

/// The result of an update against a versioned resource.
///
/// A stale `resourceVersion` is a normal, recoverable outcome. The caller decides whether to
/// retry with a fresh version or abandon the step.
#[derive(Debug)]
pub enum UpdateOutcome {
    Applied(ResourceDocument),
    Stale,
}

/// Typed wrapper over the target API's HTTP verbs.
///
/// Cheap to clone; all clones share one connection pool. Resource paths are absolute
/// (`/apis/...`), resolved against the configured base URL.
#[derive(Debug, Clone)]
pub struct ResourceClient {
    http: reqwest::Client,
    base: Url,
}

impl ResourceClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Ok(Self {
            http: reqwest::Client::new(),
            base: Url::parse(base_url)?,
        })
    }

    /// POST a declarative spec document. Returns the created resource's document, which
    /// carries the server-assigned name, locator and version.
    pub async fn create(&self, path: &str, body: &Value) -> Result<ResourceDocument, ClientError> {
        let response = self
            .http
            .post(self.url_for(path)?)
            .json(body)
            .send()
            .await
            .map_err(|e| ClientError::transport(path, e))?;

        decode(path, response).await
    }

    pub async fn read(&self, resource: &ResourceRef) -> Result<ResourceDocument, ClientError> {
        let path = resource.as_str();
        let response = self
            .http
            .get(self.url_for(path)?)
            .send()
            .await
            .map_err(|e| ClientError::transport(path, e))?;

        decode(path, response).await
    }

    /// PUT an update payload carrying a `resourceVersion`. A server-side version conflict is
    /// reported as [UpdateOutcome::Stale], not as an error.
    pub async fn update(
        &self,
        resource: &ResourceRef,
        body: &Value,
    ) -> Result<UpdateOutcome, ClientError> {
        let path = resource.as_str();
        let response = self
            .http
            .put(self.url_for(path)?)
            .json(body)
            .send()
            .await
            .map_err(|e| ClientError::transport(path, e))?;

        if response.status() == reqwest::StatusCode::CONFLICT {
            return Ok(UpdateOutcome::Stale);
        }

        decode(path, response).await.map(UpdateOutcome::Applied)
    }

    pub async fn delete(&self, resource: &ResourceRef) -> Result<(), ClientError> {
        let path = resource.as_str();
        let response = self
            .http
            .delete(self.url_for(path)?)
            .send()
            .await
            .map_err(|e| ClientError::transport(path, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::UnexpectedStatus {
                status: status.as_u16(),
                path: path.to_string(),
            });
        }

        Ok(())
    }

    /// Update with a freshly read `resourceVersion`, retrying exactly once if the server
    /// rejects the version as stale.
    ///
    /// `build` receives the current version and produces the full update payload. If the
    /// retry is also stale the caller gets [UpdateOutcome::Stale] back and should abandon
    /// the step.
    pub async fn update_with_retry(
        &self,
        resource: &ResourceRef,
        build: impl Fn(&ResourceVersion) -> Value,
    ) -> Result<UpdateOutcome, ClientError> {
        let version = self.read(resource).await?.resource_version()?;
        match self.update(resource, &build(&version)).await? {
            UpdateOutcome::Stale => {
                log::debug!("Version {} was stale for {resource}, retrying with a fresh read", version.as_str());
                let version = self.read(resource).await?.resource_version()?;
                self.update(resource, &build(&version)).await
            }
            applied => Ok(applied),
        }
    }

    fn url_for(&self, path: &str) -> Result<Url, ClientError> {
        self.base.join(path).map_err(ClientError::from)
    }
}

async fn decode(path: &str, response: reqwest::Response) -> Result<ResourceDocument, ClientError> {
    let status = response.status();
    if !status.is_success() {
        return Err(ClientError::UnexpectedStatus {
            status: status.as_u16(),
            path: path.to_string(),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| ClientError::transport(path, e))?;

    serde_json::from_slice(&bytes)
        .map(ResourceDocument::from_value)
        .map_err(|e| ClientError::Decode(format!("Response from {path} is not valid JSON: {e}")))
}

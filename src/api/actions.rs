//! API actions for the login journey

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{extract_token, ApiClient};
use crate::scenario::{Action, StepFailure};

/// POST the credentials to the login endpoint and keep the returned token
pub struct Authenticate {
    pub path: String,
    pub email: String,
    pub password: String,
}

/// GET a protected endpoint without a token; it must refuse with 4xx or 5xx
pub struct RejectsAnonymous {
    pub path: String,
}

/// GET an endpoint with the session token; it must answer 2xx with JSON
pub struct FetchAuthenticated {
    pub path: String,
}

async fn require_token(client: &ApiClient) -> Result<(), StepFailure> {
    match client.token().await {
        Some(_) => Ok(()),
        None => Err(StepFailure::assertion(
            "no session token; the login step did not authenticate",
        )),
    }
}

#[async_trait]
impl Action<ApiClient> for Authenticate {
    fn describe(&self) -> String {
        format!("POST {} as {}", self.path, self.email)
    }

    async fn perform(&self, client: &ApiClient) -> Result<(), StepFailure> {
        let body = json!({ "email": self.email, "password": self.password });
        let response = client.post_json(&self.path, &body).await?;

        let token = extract_token(&response).ok_or_else(|| {
            StepFailure::assertion("login succeeded but the response carried no session token")
        })?;
        tracing::debug!("Authenticated as {}", self.email);
        client.set_token(token).await;
        Ok(())
    }
}

#[async_trait]
impl Action<ApiClient> for RejectsAnonymous {
    fn describe(&self) -> String {
        format!("GET {} without a token", self.path)
    }

    async fn perform(&self, client: &ApiClient) -> Result<(), StepFailure> {
        let status = client.anonymous_status(&self.path).await?;
        if status >= 400 {
            tracing::debug!("{} refused an anonymous request with {}", self.path, status);
            return Ok(());
        }
        Err(StepFailure::assertion(format!(
            "{} answered {} to a request without a token",
            self.path, status
        )))
    }
}

#[async_trait]
impl Action<ApiClient> for FetchAuthenticated {
    fn describe(&self) -> String {
        format!("GET {} with session token", self.path)
    }

    async fn perform(&self, client: &ApiClient) -> Result<(), StepFailure> {
        require_token(client).await?;
        let body = client.get_json(&self.path).await?;
        if let Some(items) = listed_items(&body) {
            tracing::info!("{} returned {} item(s)", self.path, items);
        }
        Ok(())
    }
}

/// Length of a list response, bare or wrapped in `data`
fn listed_items(body: &Value) -> Option<usize> {
    body.as_array()
        .or_else(|| body.get("data").and_then(Value::as_array))
        .map(Vec::len)
}

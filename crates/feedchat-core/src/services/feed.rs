use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::ServiceClient;
use crate::error::{AuthError, FetchError, SubmitError, INVALID_CREDENTIALS};
use crate::feed::ImageFile;

#[derive(Serialize)]
struct TokenForm<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

/// One entry of the `/feed` listing as the service sends it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeedItem {
    pub username: String,
    pub image: String,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Client for the identity/feed service.
#[derive(Clone, Debug)]
pub struct FeedService {
    client: ServiceClient,
}

impl FeedService {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: ServiceClient::new(base_url, timeout)?,
        })
    }

    pub fn client(&self) -> &ServiceClient {
        &self.client
    }

    pub(crate) fn client_mut(&mut self) -> &mut ServiceClient {
        &mut self.client
    }

    pub fn base_url(&self) -> &str {
        self.client.base_url()
    }

    /// `POST /token` with URL-encoded credentials; returns the issued token.
    pub async fn request_token(&self, username: &str, password: &str) -> Result<String, AuthError> {
        let response = self
            .client
            .request(Method::POST, "/token")
            .form(&TokenForm { username, password })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            let detail = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v.get("detail").and_then(Value::as_str).map(str::to_string))
                .filter(|d| !d.trim().is_empty());
            return Err(AuthError::Rejected(
                detail.unwrap_or_else(|| INVALID_CREDENTIALS.to_string()),
            ));
        }

        let token: TokenResponse = serde_json::from_str(&body).map_err(|_| AuthError::MissingToken)?;
        token
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingToken)
    }

    /// `GET /feed`. Media locators are returned exactly as the service sent them.
    pub async fn fetch_feed(&self) -> Result<Vec<FeedItem>, FetchError> {
        let response = self.client.request(Method::GET, "/feed").send().await?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// `POST /post` as multipart. The image part is omitted when there is no
    /// image; the caption part is always sent, even when empty.
    pub async fn create_post(&self, caption: &str, image: Option<&ImageFile>) -> Result<(), SubmitError> {
        let mut form = Form::new();

        if let Some(image) = image {
            let bytes = tokio::fs::read(image.path())
                .await
                .map_err(|source| SubmitError::Image {
                    path: image.path().to_path_buf(),
                    source,
                })?;
            let part = Part::bytes(bytes)
                .file_name(image.file_name().to_string())
                .mime_str(image.mime())
                .map_err(|_| SubmitError::UnsupportedImage(image.mime().to_string()))?;
            form = form.part("image", part);
        }
        form = form.text("caption", caption.to_string());

        let response = self
            .client
            .request(Method::POST, "/post")
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SubmitError::Status(response.status()));
        }
        Ok(())
    }
}

use std::time::Duration;

use reqwest::Method;
use serde::Serialize;
use serde_json::Value;

use crate::client::ServiceClient;
use crate::error::ChatError;

#[derive(Serialize)]
struct ChatRequestBody<'a> {
    message: &'a str,
    username: &'a str,
}

/// Client for the chat assistant service.
#[derive(Clone, Debug)]
pub struct ChatService {
    client: ServiceClient,
}

impl ChatService {
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

    /// `POST /chat`. Succeeds only with a 2xx status and a JSON body holding a
    /// non-empty `response` string.
    pub async fn send_message(&self, message: &str, username: &str) -> Result<String, ChatError> {
        let response = self
            .client
            .request(Method::POST, "/chat")
            .json(&ChatRequestBody { message, username })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let service_error = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
                .filter(|e| !e.trim().is_empty());
            return Err(match service_error {
                Some(message) => ChatError::Service {
                    status: status.as_u16(),
                    message,
                },
                None => ChatError::Status(status.as_u16()),
            });
        }

        let json: Value = serde_json::from_str(&body).map_err(|_| ChatError::InvalidFormat)?;
        json.get("response")
            .and_then(Value::as_str)
            .filter(|r| !r.is_empty())
            .map(str::to_string)
            .ok_or(ChatError::InvalidFormat)
    }
}

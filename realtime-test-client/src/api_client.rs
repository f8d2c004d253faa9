use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::{json, Value};

pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    /// Post a message into a conversation. The backend answers the sender
    /// with a `message-sent` event and every other participant with
    /// `message-received`.
    pub async fn send_message(
        &self,
        token: &str,
        conversation_id: &str,
        body: &str,
    ) -> Result<Value> {
        let url = format!(
            "{}/conversations/{}/messages",
            self.base_url, conversation_id
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&json!({
                "body": body,
            }))
            .send()
            .await
            .context("Failed to send message")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response body".to_string());
            anyhow::bail!("Failed to send message: {} - Response: {}", status, body);
        }

        let api_response: Value = response.json().await.context("Failed to parse response")?;

        // Extract the data from ApiResponse wrapper
        api_response["data"]
            .as_object()
            .context("No data object in response")
            .map(|obj| Value::Object(obj.clone()))
    }

    /// Share a reminder with another user, provoking a `reminder-shared`
    /// event on their channel.
    pub async fn share_reminder(
        &self,
        token: &str,
        recipient_user_id: &str,
        title: &str,
    ) -> Result<Value> {
        let url = format!("{}/reminders", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&json!({
                "title": title,
                "shared_with": [recipient_user_id],
            }))
            .send()
            .await
            .context("Failed to share reminder")?;

        if !response.status().is_success() {
            anyhow::bail!("Failed to share reminder: {}", response.status());
        }

        let api_response: Value = response.json().await.context("Failed to parse response")?;

        // Extract the data from ApiResponse wrapper
        api_response["data"]
            .as_object()
            .context("No data object in response")
            .map(|obj| Value::Object(obj.clone()))
    }
}

use {
    crate::domain::{error::PipelineError, notify::Notifier, receipt::NewReceipt},
    std::{future::Future, pin::Pin, time::Duration},
};

/// One outbound JSON call with its own deadline. Timeout and transport
/// errors collapse into `PipelineError::Notification` so callers have a
/// single failure channel to catch.
pub async fn post_json(
    client: &reqwest::Client,
    url: &str,
    body: &serde_json::Value,
    timeout: Duration,
) -> Result<serde_json::Value, PipelineError> {
    let send = client.post(url).json(body).send();
    let response = tokio::time::timeout(timeout, send)
        .await
        .map_err(|_| PipelineError::Notification(format!("timeout after {timeout:?} calling {url}")))?
        .map_err(|e| PipelineError::Notification(e.to_string()))?;

    let response = response
        .error_for_status()
        .map_err(|e| PipelineError::Notification(e.to_string()))?;

    let json = tokio::time::timeout(timeout, response.json::<serde_json::Value>())
        .await
        .map_err(|_| PipelineError::Notification(format!("timeout reading body from {url}")))?
        .map_err(|e| PipelineError::Notification(e.to_string()))?;

    Ok(json)
}

/// Posts a payment summary to the configured alert endpoint.
pub struct HttpNotifier {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpNotifier {
    pub fn new(url: String, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            timeout,
        }
    }
}

impl Notifier for HttpNotifier {
    fn notify_payment(
        &self,
        receipt: &NewReceipt,
    ) -> Pin<Box<dyn Future<Output = Result<(), PipelineError>> + Send + '_>> {
        let body = serde_json::json!({
            "reference": receipt.reference_id,
            "order_code": receipt.order_code,
            "amount": receipt.amount.units(),
            "sender": receipt.sender,
            "paid_at": receipt.paid_at.to_rfc3339(),
        });
        Box::pin(async move {
            post_json(&self.client, &self.url, &body, self.timeout).await?;
            Ok(())
        })
    }
}

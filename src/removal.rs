use std::time::Duration;

use bytes::Bytes;
use tracing::debug;

/// Client for the external ML background-removal service. The service is a
/// black box contract-wise: it takes an image and an output format over
/// multipart and answers with the processed image bytes.
pub struct RemovalClient {
    client: reqwest::Client,
    endpoint: String,
}

impl RemovalClient {
    pub fn new(endpoint: String) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Delegate one image. Any transport or non-success response is an
    /// upstream failure; the caller maps it to a 502-class outcome.
    pub async fn remove_background(
        &self,
        filename: String,
        image: Bytes,
        output_format: &str,
    ) -> anyhow::Result<Bytes> {
        debug!(endpoint = %self.endpoint, %filename, output_format, "Delegating background removal");

        let part = reqwest::multipart::Part::bytes(image.to_vec()).file_name(filename);
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("output_format", output_format.to_string());

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.bytes().await?)
    }
}

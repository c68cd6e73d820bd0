//! HTTP probe implementation.

use std::time::Duration;

use super::{HttpCheck, ProbeError};

/// reqwest-backed [`HttpCheck`].
///
/// Redirects are not followed, so a 301/302/307 from the target is what
/// gets classified.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| ProbeError::Config(e.to_string()))?;

        Ok(Self { client, timeout })
    }
}

impl HttpCheck for HttpClient {
    async fn get_status(&self, url: &str) -> Result<u16, ProbeError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                ProbeError::Timeout(self.timeout)
            } else {
                ProbeError::Network(e.to_string())
            }
        })?;

        Ok(response.status().as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_http_probe_invalid_url() {
        let client = HttpClient::new(Duration::from_millis(100)).unwrap();
        let result = client.get_status("http://256.256.256.256").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_http_probe_malformed_url() {
        let client = HttpClient::new(Duration::from_millis(100)).unwrap();
        let result = client.get_status("not a url").await;
        assert!(matches!(result, Err(ProbeError::Network(_))));
    }
}

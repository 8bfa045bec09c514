//! Client for the driver directory service, which owns driver identity,
//! location, and availability. Calls are plain HTTP with a bounded timeout
//! and a small fixed-delay retry; exponential backoff is deliberately not
//! used here.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use crate::models::driver::{Driver, ListDriversResponse};

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("driver directory request failed: {0}")]
    Transport(String),

    #[error("driver directory returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// Optional filters for listing available drivers.
#[derive(Debug, Clone, Default)]
pub struct DriverFilter {
    pub vehicle_type: Option<String>,
}

/// Seam over the driver directory so the engine and handlers can be
/// exercised without a network.
#[async_trait]
pub trait DriverDirectory: Send + Sync {
    /// Drivers the directory reports as available, already filtered
    /// server-side; availability is not re-checked client-side.
    async fn list_available(&self, filter: &DriverFilter) -> Result<Vec<Driver>, DirectoryError>;

    async fn get_driver(&self, driver_id: &str) -> Result<Driver, DirectoryError>;

    async fn set_availability(
        &self,
        driver_id: &str,
        is_available: bool,
    ) -> Result<(), DirectoryError>;
}

pub struct HttpDriverDirectory {
    client: reqwest::Client,
    base_url: String,
    retries: u32,
    retry_delay: Duration,
}

impl HttpDriverDirectory {
    pub fn new(
        base_url: String,
        timeout: Duration,
        retries: u32,
        retry_delay: Duration,
    ) -> Result<Self, DirectoryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| DirectoryError::Transport(format!("failed to build client: {err}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            retries,
            retry_delay,
        })
    }

    /// Sends a request, retrying transport errors and 5xx responses with a
    /// fixed delay. Non-5xx responses are returned to the caller as-is.
    async fn send_with_retry<F>(&self, build: F) -> Result<reqwest::Response, DirectoryError>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut attempt: u32 = 0;
        loop {
            let outcome: Result<reqwest::Response, DirectoryError> = match build().send().await {
                Ok(response) if response.status().is_server_error() => {
                    Err(DirectoryError::Status {
                        status: response.status().as_u16(),
                        body: response.text().await.unwrap_or_default(),
                    })
                }
                Ok(response) => return Ok(response),
                Err(err) => Err(DirectoryError::Transport(err.to_string())),
            };

            let err = outcome.unwrap_err();
            if attempt >= self.retries {
                return Err(err);
            }
            attempt += 1;
            debug!(attempt, max = self.retries, error = %err, "retrying driver directory request");
            tokio::time::sleep(self.retry_delay).await;
        }
    }
}

async fn status_error(response: reqwest::Response) -> DirectoryError {
    DirectoryError::Status {
        status: response.status().as_u16(),
        body: response.text().await.unwrap_or_default(),
    }
}

#[async_trait]
impl DriverDirectory for HttpDriverDirectory {
    async fn list_available(&self, filter: &DriverFilter) -> Result<Vec<Driver>, DirectoryError> {
        let url = format!("{}/all", self.base_url);
        let mut query: Vec<(&str, String)> = vec![("isAvailable", "true".to_string())];
        if let Some(vehicle_type) = &filter.vehicle_type {
            query.push(("vehicleType", vehicle_type.clone()));
        }

        let response = self
            .send_with_retry(|| self.client.get(&url).query(&query))
            .await?;
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let body: ListDriversResponse = response
            .json()
            .await
            .map_err(|err| DirectoryError::Transport(format!("invalid driver list: {err}")))?;
        Ok(body.drivers)
    }

    async fn get_driver(&self, driver_id: &str) -> Result<Driver, DirectoryError> {
        let url = format!("{}/{driver_id}", self.base_url);

        let response = self.send_with_retry(|| self.client.get(&url)).await?;
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        response
            .json()
            .await
            .map_err(|err| DirectoryError::Transport(format!("invalid driver record: {err}")))
    }

    async fn set_availability(
        &self,
        driver_id: &str,
        is_available: bool,
    ) -> Result<(), DirectoryError> {
        let url = format!("{}/{driver_id}/availability", self.base_url);
        let body = json!({ "isAvailable": is_available });

        let response = self
            .send_with_retry(|| self.client.put(&url).json(&body))
            .await?;
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::{DirectoryError, DriverDirectory, DriverFilter, HttpDriverDirectory};

    fn directory(base_url: String, retries: u32) -> HttpDriverDirectory {
        HttpDriverDirectory::new(
            base_url,
            Duration::from_secs(2),
            retries,
            Duration::from_millis(10),
        )
        .unwrap()
    }

    fn driver_json(id: &str) -> serde_json::Value {
        json!({
            "id": id,
            "firstName": "Nimal",
            "lastName": "Perera",
            "currentLocation": { "coordinates": [79.86, 6.93] },
            "isAvailable": true
        })
    }

    #[tokio::test]
    async fn list_available_sends_availability_filter() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/driver/all"))
            .and(query_param("isAvailable", "true"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "drivers": [driver_json("d1")] })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let directory = directory(format!("{}/driver", server.uri()), 0);
        let drivers = directory
            .list_available(&DriverFilter::default())
            .await
            .unwrap();

        assert_eq!(drivers.len(), 1);
        assert_eq!(drivers[0].id, "d1");
    }

    #[tokio::test]
    async fn retries_server_errors_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/driver/all"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/driver/all"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "drivers": [] })))
            .expect(1)
            .mount(&server)
            .await;

        let directory = directory(format!("{}/driver", server.uri()), 3);
        let drivers = directory
            .list_available(&DriverFilter::default())
            .await
            .unwrap();
        assert!(drivers.is_empty());
    }

    #[tokio::test]
    async fn gives_up_after_the_configured_retries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/driver/all"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let directory = directory(format!("{}/driver", server.uri()), 2);
        let err = directory
            .list_available(&DriverFilter::default())
            .await
            .unwrap_err();

        assert!(matches!(err, DirectoryError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn set_availability_puts_the_expected_body() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/driver/d1/availability"))
            .and(body_json(json!({ "isAvailable": false })))
            .respond_with(ResponseTemplate::new(200).set_body_json(driver_json("d1")))
            .expect(1)
            .mount(&server)
            .await;

        let directory = directory(format!("{}/driver", server.uri()), 0);
        directory.set_availability("d1", false).await.unwrap();
    }

    #[tokio::test]
    async fn unknown_driver_is_a_status_error_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/driver/ghost"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let directory = directory(format!("{}/driver", server.uri()), 3);
        let err = directory.get_driver("ghost").await.unwrap_err();
        assert!(matches!(err, DirectoryError::Status { status: 404, .. }));
    }
}

//! HTTP client for the printer's status endpoints.

use crate::config::PrinterSettings;
use crate::error::Error;
use crate::status::{JobStatus, PrinterSnapshot, Temperatures};
use serde_json::Value;

/// Job state, progress and print time.
pub const STATUS_PATH: &str = "/api/printer";

/// Bed and extruder temperatures.
pub const TEMPERATURE_PATH: &str = "/printer/objects/query?heater_bed&extruder";

const API_KEY_HEADER: &str = "X-Api-Key";

/// Client for the two printer endpoints polled every cycle.
///
/// Each call is one GET; the response is dropped (closing or returning the
/// connection to the pool) before the call returns, on success or failure.
#[derive(Debug, Clone)]
pub struct StatusClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl StatusClient {
    pub fn new(settings: &PrinterSettings) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .map_err(|e| Error::Request(e.to_string()))?;

        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /api/printer`.
    pub async fn fetch_status(&self) -> Result<JobStatus, Error> {
        let body = self.get_json(STATUS_PATH).await?;
        Ok(JobStatus::from_json(&body))
    }

    /// `GET /printer/objects/query?heater_bed&extruder`.
    pub async fn fetch_temperatures(&self) -> Result<Temperatures, Error> {
        let body = self.get_json(TEMPERATURE_PATH).await?;
        Ok(Temperatures::from_json(&body))
    }

    /// Both requests, one after the other. Either failing fails the poll.
    pub async fn poll(&self) -> Result<PrinterSnapshot, Error> {
        let job = self.fetch_status().await?;
        let temps = self.fetch_temperatures().await?;
        Ok(PrinterSnapshot::new(job, temps))
    }

    async fn get_json(&self, path: &str) -> Result<Value, Error> {
        let url = format!("{}{}", self.base_url, path);

        let mut request = self.http.get(&url);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(Error::Api {
                status: response.status().as_u16(),
                url,
            });
        }

        Ok(response.json::<Value>().await?)
    }
}

// Copyright 2025 the thermaview authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! HTTP compute engine client.
//!
//! A thin JSON/REST front for the remote catalog engine. Requests are
//! posted as JSON to `/v1/dates`, `/v1/statistics` and `/v1/sample`;
//! responses deserialize directly into the engine wire types.

use async_trait::async_trait;
use log::debug;
use serde::Deserialize;

use super::{
    ComputeEngine, DateQuery, EngineError, SampleRequest, SceneStats, StatsRequest,
};

/// Compute engine backed by a remote HTTP service.
#[derive(Debug, Clone)]
pub struct HttpEngine {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct DatesResponse {
    dates: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SampleResponse {
    value: Option<f64>,
}

impl HttpEngine {
    /// Create a client for the engine at `base_url` (scheme and host,
    /// no trailing slash required).
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        let base_url = base_url.trim_end_matches('/').to_string();
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    /// The configured endpoint.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<Req, Resp>(&self, path: &str, request: &Req) -> Result<Resp, EngineError>
    where
        Req: serde::Serialize + Sync,
        Resp: for<'de> Deserialize<'de>,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}", url);

        let response = self.client.post(&url).json(request).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::Backend(format!("{}: {}", status, body)));
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl ComputeEngine for HttpEngine {
    async fn distinct_dates(&self, query: &DateQuery) -> Result<Vec<String>, EngineError> {
        let response: DatesResponse = self.post("/v1/dates", query).await?;
        Ok(response.dates)
    }

    async fn scene_statistics(&self, request: &StatsRequest) -> Result<SceneStats, EngineError> {
        self.post("/v1/statistics", request).await
    }

    async fn sample_lst(&self, request: &SampleRequest) -> Result<Option<f64>, EngineError> {
        let response: SampleResponse = self.post("/v1/sample", request).await?;
        Ok(response.value)
    }
}

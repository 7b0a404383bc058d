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

//! Scripted in-memory compute engine.
//!
//! Serves a fixed date list and per-date statistics without any network.
//! Individual statistics responses can be held behind a gate and released
//! on demand, which makes out-of-order completion, the stale-response
//! hazard, reproducible in tests. Also backs the application's offline
//! demo mode.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::oneshot;

use super::{
    ComputeEngine, DateQuery, EngineError, LstPercentiles, RgbBandStats, SampleRequest,
    SceneStats, StatsRequest,
};

/// Handle releasing one held statistics response.
#[derive(Debug)]
pub struct Release(oneshot::Sender<()>);

impl Release {
    /// Let the held response complete.
    pub fn release(self) {
        let _ = self.0.send(());
    }
}

#[derive(Debug)]
enum ScriptedStats {
    Ok(SceneStats),
    Err(String),
}

#[derive(Debug, Default)]
struct Inner {
    dates: Vec<String>,
    stats: HashMap<String, ScriptedStats>,
    samples: HashMap<String, Option<f64>>,
    gates: HashMap<String, oneshot::Receiver<()>>,
    stats_requests: Vec<StatsRequest>,
    sample_requests: Vec<SampleRequest>,
}

/// In-memory [`ComputeEngine`] with scripted responses.
#[derive(Debug, Default)]
pub struct ScriptedEngine {
    inner: Mutex<Inner>,
}

impl ScriptedEngine {
    /// Create an engine serving the given date list.
    #[must_use]
    pub fn new<I, S>(dates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let engine = Self::default();
        engine.inner.lock().unwrap().dates = dates.into_iter().map(Into::into).collect();
        engine
    }

    /// Engine with a plausible season of Landsat revisits for offline use.
    /// One date is scripted as fully obscured to exercise the fallback path.
    #[must_use]
    pub fn demo() -> Self {
        let engine = Self::new([
            "2023-05-16",
            "2023-06-01",
            "2023-06-17",
            "2023-07-03",
            "2023-07-19",
            "2023-08-04",
        ]);
        engine.set_stats(
            "2023-06-17",
            SceneStats {
                lst: Some(LstPercentiles { lo: 58.4, hi: 91.7 }),
                rgb: Some(RgbBandStats {
                    median: [0.126, 0.112, 0.094],
                    std_dev: [0.041, 0.037, 0.033],
                }),
            },
        );
        // Fully clouded scene: neither statistic set can be reduced.
        engine.set_stats("2023-07-19", SceneStats::default());
        engine.set_sample("2023-06-17", Some(74.3));
        engine
    }

    /// Script the statistics response for a date.
    pub fn set_stats(&self, date: &str, stats: SceneStats) {
        self.inner
            .lock()
            .unwrap()
            .stats
            .insert(date.to_string(), ScriptedStats::Ok(stats));
    }

    /// Script a backend failure for a date's statistics.
    pub fn set_stats_error(&self, date: &str, message: &str) {
        self.inner
            .lock()
            .unwrap()
            .stats
            .insert(date.to_string(), ScriptedStats::Err(message.to_string()));
    }

    /// Script the point-sample value for a date.
    pub fn set_sample(&self, date: &str, value: Option<f64>) {
        self.inner
            .lock()
            .unwrap()
            .samples
            .insert(date.to_string(), value);
    }

    /// Hold the next statistics response for `date` until released.
    #[must_use]
    pub fn hold_statistics(&self, date: &str) -> Release {
        let (tx, rx) = oneshot::channel();
        self.inner.lock().unwrap().gates.insert(date.to_string(), rx);
        Release(tx)
    }

    /// Statistics requests received, in request order.
    #[must_use]
    pub fn stats_requests(&self) -> Vec<StatsRequest> {
        self.inner.lock().unwrap().stats_requests.clone()
    }

    /// Point-sample requests received, in request order.
    #[must_use]
    pub fn sample_requests(&self) -> Vec<SampleRequest> {
        self.inner.lock().unwrap().sample_requests.clone()
    }

    fn default_stats(date: &str) -> SceneStats {
        // Deterministic but date-dependent, so navigation visibly changes
        // the derived ranges in the demo.
        let salt = f64::from(date.bytes().map(u32::from).sum::<u32>() % 17);
        SceneStats {
            lst: Some(LstPercentiles {
                lo: 48.0 + salt * 0.5,
                hi: 82.0 + salt * 0.7,
            }),
            rgb: Some(RgbBandStats {
                median: [0.11 + salt * 0.002, 0.10 + salt * 0.002, 0.09 + salt * 0.002],
                std_dev: [0.035, 0.032, 0.03],
            }),
        }
    }
}

#[async_trait]
impl ComputeEngine for ScriptedEngine {
    async fn distinct_dates(&self, _query: &DateQuery) -> Result<Vec<String>, EngineError> {
        Ok(self.inner.lock().unwrap().dates.clone())
    }

    async fn scene_statistics(&self, request: &StatsRequest) -> Result<SceneStats, EngineError> {
        let gate = {
            let mut inner = self.inner.lock().unwrap();
            inner.stats_requests.push(request.clone());
            inner.gates.remove(&request.date)
        };
        if let Some(gate) = gate {
            // Held until the test releases (or drops) the sender.
            let _ = gate.await;
        }

        let inner = self.inner.lock().unwrap();
        match inner.stats.get(&request.date) {
            Some(ScriptedStats::Ok(stats)) => Ok(*stats),
            Some(ScriptedStats::Err(message)) => Err(EngineError::Backend(message.clone())),
            None => Ok(Self::default_stats(&request.date)),
        }
    }

    async fn sample_lst(&self, request: &SampleRequest) -> Result<Option<f64>, EngineError> {
        let mut inner = self.inner.lock().unwrap();
        inner.sample_requests.push(request.clone());
        Ok(inner.samples.get(&request.date).copied().flatten())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::BoundingBox;
    use crate::engine::BandScaling;

    fn stats_request(date: &str) -> StatsRequest {
        StatsRequest {
            date: date.to_string(),
            bounds: BoundingBox {
                west: -77.9,
                south: 42.2,
                east: -75.9,
                north: 43.2,
            },
            lst_scale_m: 90.0,
            rgb_scale_m: 30.0,
            lst_percentiles: (1.0, 99.0),
            rgb_bands: ["SR_B4".into(), "SR_B3".into(), "SR_B2".into()],
            reflectance_scaling: BandScaling {
                scale: 0.000_027_5,
                offset: -0.2,
            },
            thermal_band: "ST_B10".to_string(),
            thermal_scaling: BandScaling {
                scale: 0.003_418_02,
                offset: 149.0,
            },
            display_transform: BandScaling {
                scale: 1.8,
                offset: -459.67,
            },
            landcover_collection: "ESA/WorldCover/v200".to_string(),
            water_class_code: 80,
            max_pixels: 1_000_000_000,
        }
    }

    #[tokio::test]
    async fn test_scripted_stats_and_errors() {
        let engine = ScriptedEngine::new(["2023-06-01"]);
        engine.set_stats_error("2023-06-01", "reduction failed");

        let err = engine
            .scene_statistics(&stats_request("2023-06-01"))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Backend(_)));
    }

    #[tokio::test]
    async fn test_gate_holds_until_release() {
        let engine = std::sync::Arc::new(ScriptedEngine::new(["2023-06-01"]));
        let release = engine.hold_statistics("2023-06-01");

        let task = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.scene_statistics(&stats_request("2023-06-01")).await })
        };

        // The call is parked on the gate, not finished.
        tokio::task::yield_now().await;
        assert!(!task.is_finished());

        release.release();
        let stats = task.await.unwrap().unwrap();
        assert!(stats.lst.is_some());
    }
}

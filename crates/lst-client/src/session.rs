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

//! Full-stack analysis session.
//!
//! Wires the navigation controller, compute engine, layer compositor,
//! legend and persisted navigation state together behind a single event
//! surface: the UI shell feeds [`UiEvent`]s in, the session emits
//! [`SessionEvent`]s out. Remote work runs in spawned tasks that report
//! completions over a channel; [`Session::process_next`] applies each
//! completion through the navigation controller's sequence gate, which is
//! the only place stale responses are decided.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use log::{debug, info, warn};
use tokio::sync::{broadcast, mpsc};

use crate::catalog::{self, BoundingBox, CatalogError, Site};
use crate::config::SessionConfig;
use crate::engine::{ComputeEngine, EngineError, SampleRequest, SceneStats, StatsRequest};
use crate::layers::{ImageRef, LayerStack};
use crate::legend::Legend;
use crate::navigation::{NavigationController, Phase, ShowTicket};
use crate::urlstate::{self, MemoryStore, NavState, StateStore};
use crate::viz::derive_ranges;

/// Diagnostic notice when thermal statistics cannot be computed.
pub const NOTICE_LST_FALLBACK: &str = "Could not compute statistics for the image. \
    It might be fully clouded. Using default LST visualization.";

/// Diagnostic notice when reflectance statistics cannot be computed.
pub const NOTICE_RGB_FALLBACK: &str =
    "Could not compute RGB statistics for the image. Using default RGB visualization.";

/// Snap distance from a map click to a catalog site, degrees.
const SITE_CLICK_TOLERANCE_DEG: f64 = 0.05;

/// Buffer sizes for the completion and event channels.
const COMPLETION_BUFFER: usize = 32;
const EVENT_BUFFER: usize = 64;

/// Events raised by the UI shell.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    /// Map click: starts an analysis when idle, inspects the current
    /// image when displaying.
    MapClicked { lon: f64, lat: f64 },
    /// Slider jumped to an index.
    SliderMoved { index: usize },
    BackClicked,
    ForwardClicked,
    ResetClicked,
    /// Manual legend range edit (raw field text).
    LegendRangeEdited { min: String, max: String },
    /// The viewport stopped moving.
    ViewportIdle { lat: f64, lon: f64, zoom: u8 },
}

/// Legend widget state mirrored to the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegendView {
    pub min_text: String,
    pub max_text: String,
    pub mid_label: String,
}

/// Complete UI-facing state snapshot, emitted after every visible change.
#[derive(Debug, Clone, PartialEq)]
pub struct UiState {
    pub phase: Phase,
    /// "Selected Date: YYYY-MM-DD" while displaying.
    pub date_label: Option<String>,
    /// "Image k of n" while displaying.
    pub image_count_label: Option<String>,
    pub back_enabled: bool,
    pub forward_enabled: bool,
    pub layers: LayerStack,
    pub legend: Option<LegendView>,
}

/// State updates and notices emitted by the session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StateChanged(UiState),
    /// User-visible diagnostic notice (non-fatal).
    Notice(String),
    /// Result of a point inspection against the current image.
    SampleResult {
        lon: f64,
        lat: f64,
        /// Temperature in display units; `None` when the product has no
        /// data at the clicked location.
        value: Option<f64>,
    },
}

struct Completion {
    seq: u64,
    payload: Payload,
}

enum Payload {
    DateList {
        target: Option<String>,
        result: Result<Vec<NaiveDate>, CatalogError>,
    },
    Show {
        date: NaiveDate,
        result: Result<SceneStats, EngineError>,
    },
    Sample {
        lon: f64,
        lat: f64,
        result: Result<Option<f64>, EngineError>,
    },
}

/// An interactive analysis session against a remote compute engine.
pub struct Session {
    engine: Arc<dyn ComputeEngine>,
    config: SessionConfig,
    store: Box<dyn StateStore>,
    nav: NavigationController,
    site: Option<Site>,
    bounds: Option<BoundingBox>,
    zoom: u8,
    layers: LayerStack,
    legend: Option<Legend>,
    current_image: Option<ImageRef>,
    completion_tx: mpsc::Sender<Completion>,
    completion_rx: mpsc::Receiver<Completion>,
    event_tx: broadcast::Sender<SessionEvent>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("site", &self.site)
            .field("phase", self.nav.phase())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Create a session with an in-memory navigation state store.
    #[must_use]
    pub fn new(engine: Arc<dyn ComputeEngine>, config: SessionConfig) -> Self {
        Self::with_store(engine, config, Box::new(MemoryStore::new()))
    }

    /// Create a session persisting navigation state in `store`.
    #[must_use]
    pub fn with_store(
        engine: Arc<dyn ComputeEngine>,
        config: SessionConfig,
        store: Box<dyn StateStore>,
    ) -> Self {
        let (completion_tx, completion_rx) = mpsc::channel(COMPLETION_BUFFER);
        let (event_tx, _) = broadcast::channel(EVENT_BUFFER);
        let zoom = config.default_zoom;
        Self {
            engine,
            config,
            store,
            nav: NavigationController::new(),
            site: None,
            bounds: None,
            zoom,
            layers: LayerStack::empty(),
            legend: None,
            current_image: None,
            completion_tx,
            completion_rx,
            event_tx,
        }
    }

    /// Subscribe to session events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    /// Reconstruct a session from the persisted navigation state.
    ///
    /// Returns true when valid coordinates were found and an analysis was
    /// started; false leaves the default, no-session view.
    pub fn restore(&mut self) -> bool {
        let state = NavState::read(&*self.store);
        let Some((lat, lon)) = state.coordinates() else {
            debug!("No persisted session to restore");
            return false;
        };

        let zoom = state.zoom_level().unwrap_or(self.config.default_zoom);
        let target = state.target_date().map(str::to_string);
        info!("Restoring session at ({:.6}, {:.6})", lat, lon);
        // Restored coordinates are just a point; the catalog is not
        // consulted, matching how the link was written.
        self.start_analysis(Site::custom(lon, lat), target, zoom);
        true
    }

    /// Start an analysis for a site, optionally resolving the nearest
    /// date to `target_date` first.
    pub fn select_site(&mut self, site: Site, target_date: Option<String>) {
        let zoom = self.zoom;
        self.start_analysis(site, target_date, zoom);
    }

    /// Handle one UI event.
    pub fn handle_event(&mut self, event: UiEvent) {
        match event {
            UiEvent::MapClicked { lon, lat } => match self.nav.phase() {
                Phase::Displayed(_) => self.inspect(lon, lat),
                Phase::Idle | Phase::Error(_) => {
                    let site = catalog::site_near(lon, lat, SITE_CLICK_TOLERANCE_DEG)
                        .unwrap_or_else(|| Site::custom(lon, lat));
                    self.select_site(site, None);
                }
                Phase::Loading => {}
            },
            UiEvent::SliderMoved { index } => {
                if let Some(ticket) = self.nav.slide(index) {
                    self.issue_show(ticket);
                }
            }
            UiEvent::BackClicked => {
                if let Some(ticket) = self.nav.advance(-1) {
                    self.issue_show(ticket);
                }
            }
            UiEvent::ForwardClicked => {
                if let Some(ticket) = self.nav.advance(1) {
                    self.issue_show(ticket);
                }
            }
            UiEvent::ResetClicked => self.reset(),
            UiEvent::LegendRangeEdited { min, max } => self.edit_legend(&min, &max),
            UiEvent::ViewportIdle { lat, lon, zoom } => {
                self.zoom = zoom;
                urlstate::write_viewport(&mut *self.store, lat, lon, zoom);
            }
        }
    }

    /// Apply the next completed background request, waiting for one to
    /// land. The session holds a sender for spawning tasks, so the
    /// channel stays open for its lifetime.
    pub async fn process_next(&mut self) {
        if let Some(completion) = self.completion_rx.recv().await {
            self.apply(completion);
        }
    }

    /// Current UI-facing state snapshot.
    #[must_use]
    pub fn ui_state(&self) -> UiState {
        UiState {
            phase: self.nav.phase().clone(),
            date_label: self
                .nav
                .current_date()
                .map(|d| format!("Selected Date: {}", d.format("%Y-%m-%d"))),
            image_count_label: self
                .nav
                .current_index()
                .map(|i| format!("Image {} of {}", i + 1, self.nav.date_count())),
            back_enabled: self.nav.back_enabled(),
            forward_enabled: self.nav.forward_enabled(),
            layers: self.layers.clone(),
            legend: self.legend.as_ref().map(|l| LegendView {
                min_text: l.min_text().to_string(),
                max_text: l.max_text().to_string(),
                mid_label: l.mid_label(),
            }),
        }
    }

    /// The image the inspector samples, owned by the session and updated
    /// only by the latest completed show request.
    #[must_use]
    pub fn current_image(&self) -> Option<&ImageRef> {
        self.current_image.as_ref()
    }

    /// The active site, if a session is running.
    #[must_use]
    pub fn site(&self) -> Option<&Site> {
        self.site.as_ref()
    }

    /// Current viewport zoom level.
    #[must_use]
    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    /// The persisted navigation state as a shareable query string.
    #[must_use]
    pub fn deep_link(&self) -> String {
        NavState::read(&*self.store).to_query()
    }

    /// Tear down the session back to the default view. Responses still in
    /// flight expire against the advanced sequence.
    pub fn reset(&mut self) {
        info!("Resetting to default view");
        self.nav.reset();
        self.site = None;
        self.bounds = None;
        self.layers = LayerStack::empty();
        self.legend = None;
        self.current_image = None;
        self.zoom = self.config.default_zoom;
        urlstate::clear(&mut *self.store);
        self.emit_state();
    }

    fn start_analysis(&mut self, site: Site, target_date: Option<String>, zoom: u8) {
        info!(
            "Starting analysis for '{}' at ({:.6}, {:.6})",
            site.name, site.lon, site.lat
        );
        self.zoom = zoom;
        self.bounds = Some(BoundingBox::around(&site, &self.config));
        self.layers = LayerStack::empty();
        self.legend = None;
        self.current_image = None;

        // The viewport centers on the site; persist the anchor right away
        // so the deep link is valid even before the first image shows.
        urlstate::write_viewport(&mut *self.store, site.lat, site.lon, zoom);

        let seq = self.nav.begin_loading();
        let engine = Arc::clone(&self.engine);
        let config = self.config.clone();
        let tx = self.completion_tx.clone();
        let deadline = self.config.request_timeout_secs;
        let task_site = site.clone();
        self.site = Some(site);

        tokio::spawn(async move {
            let result = with_deadline(
                deadline,
                catalog::fetch_date_list(engine.as_ref(), &config, &task_site),
            )
            .await;
            let _ = tx
                .send(Completion {
                    seq,
                    payload: Payload::DateList {
                        target: target_date,
                        result,
                    },
                })
                .await;
        });

        self.emit_state();
    }

    fn issue_show(&mut self, ticket: ShowTicket) {
        let Some(bounds) = self.bounds else {
            return;
        };
        // The date label and the deep link update at issue time; layers
        // and legend update when the gated response lands.
        urlstate::write_date(&mut *self.store, ticket.date);

        let request = StatsRequest {
            date: ticket.date.format("%Y-%m-%d").to_string(),
            bounds,
            lst_scale_m: self.config.lst_scale_m,
            rgb_scale_m: self.config.rgb_scale_m,
            lst_percentiles: self.config.lst_percentiles,
            rgb_bands: self.config.rgb_bands.clone(),
            reflectance_scaling: self.config.reflectance_scaling(),
            thermal_band: self.config.thermal_band.clone(),
            thermal_scaling: self.config.thermal_scaling(),
            display_transform: self.config.display_transform(),
            landcover_collection: self.config.landcover_collection.clone(),
            water_class_code: self.config.water_class_code,
            max_pixels: self.config.max_pixels,
        };
        let engine = Arc::clone(&self.engine);
        let tx = self.completion_tx.clone();
        let deadline = self.config.request_timeout_secs;
        let date = ticket.date;
        let seq = ticket.seq;

        tokio::spawn(async move {
            let result =
                with_deadline(deadline, async { engine.scene_statistics(&request).await }).await;
            let _ = tx
                .send(Completion {
                    seq,
                    payload: Payload::Show { date, result },
                })
                .await;
        });

        self.emit_state();
    }

    fn inspect(&mut self, lon: f64, lat: f64) {
        let date = match &self.current_image {
            Some(ImageRef::LstProduct { date }) => *date,
            _ => return,
        };
        let request = SampleRequest {
            date: date.format("%Y-%m-%d").to_string(),
            lon,
            lat,
            scale_m: self.config.sample_scale_m,
            thermal_band: self.config.thermal_band.clone(),
            thermal_scaling: self.config.thermal_scaling(),
            display_transform: self.config.display_transform(),
        };
        let engine = Arc::clone(&self.engine);
        let tx = self.completion_tx.clone();
        let deadline = self.config.request_timeout_secs;
        // Tied to the current display: expires when navigation moves on.
        let seq = self.nav.latest_seq();

        tokio::spawn(async move {
            let result = with_deadline(deadline, async { engine.sample_lst(&request).await }).await;
            let _ = tx
                .send(Completion {
                    seq,
                    payload: Payload::Sample { lon, lat, result },
                })
                .await;
        });
    }

    fn edit_legend(&mut self, min: &str, max: &str) {
        let Some(legend) = self.legend.as_mut() else {
            return;
        };
        // Invalid or inverted input keeps the prior valid range, no error.
        if let Some(range) = legend.edit(min, max) {
            debug!("Legend range set to [{:.2}, {:.2}]", range.min, range.max);
            self.layers.set_lst_range(range);
            self.emit_state();
        }
    }

    fn apply(&mut self, completion: Completion) {
        let Completion { seq, payload } = completion;
        match payload {
            Payload::DateList { target, result } => match result {
                Ok(dates) => {
                    let initial = catalog::nearest_index(&dates, target.as_deref());
                    if let Some(ticket) = self.nav.resolved(seq, dates, initial) {
                        self.issue_show(ticket);
                    }
                }
                Err(err) => {
                    if self.nav.fail_loading(seq, err.to_string()) {
                        self.notice(err.to_string());
                        self.emit_state();
                    } else {
                        debug!("Discarding stale date list failure: {}", err);
                    }
                }
            },
            Payload::Show { date, result } => {
                if !self.nav.is_current(seq) {
                    debug!("Discarding stale show response for {}", date);
                    return;
                }
                let stats = match result {
                    Ok(stats) => stats,
                    Err(err) => {
                        // Degrade this step to the fallback ranges.
                        warn!("Statistics request for {} failed: {}", date, err);
                        SceneStats::default()
                    }
                };
                let ranges = derive_ranges(&stats, &self.config);
                if ranges.lst_is_fallback {
                    self.notice(NOTICE_LST_FALLBACK.to_string());
                }
                if ranges.rgb_is_fallback {
                    self.notice(NOTICE_RGB_FALLBACK.to_string());
                }
                self.layers = LayerStack::compose(date, &ranges, &self.config);
                self.legend = Some(Legend::seeded(ranges.lst));
                self.current_image = Some(ImageRef::LstProduct { date });
                self.emit_state();
            }
            Payload::Sample { lon, lat, result } => {
                if !self.nav.is_current(seq) {
                    debug!("Discarding stale sample response");
                    return;
                }
                match result {
                    Ok(value) => {
                        let _ = self.event_tx.send(SessionEvent::SampleResult { lon, lat, value });
                    }
                    Err(err) => {
                        warn!("Sample request failed: {}", err);
                        self.notice(format!("Could not sample the current image: {}", err));
                    }
                }
            }
        }
    }

    fn emit_state(&self) {
        let _ = self.event_tx.send(SessionEvent::StateChanged(self.ui_state()));
    }

    fn notice(&self, message: String) {
        warn!("{}", message);
        let _ = self.event_tx.send(SessionEvent::Notice(message));
    }
}

/// Race a fallible future against the configured deadline; expiry becomes
/// an engine timeout error instead of a request stuck in flight forever.
async fn with_deadline<T, E, F>(deadline_secs: u64, fut: F) -> Result<T, E>
where
    E: From<EngineError>,
    F: Future<Output = Result<T, E>>,
{
    match tokio::time::timeout(Duration::from_secs(deadline_secs), fut).await {
        Ok(result) => result,
        Err(_) => Err(E::from(EngineError::Timeout(deadline_secs))),
    }
}

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

//! Client library for browsing Landsat land-surface-temperature imagery
//! over sites of interest.
//!
//! The library turns a remote imagery catalog and reduction backend into an
//! interactive time-series browser: pick a site, resolve the distinct dates
//! on which imagery exists, then step, slide, or jump through those dates
//! while each scene's display ranges are derived from its own statistics.
//! It is organized in layers that can be used independently or composed:
//!
//! - **Engine layer**: the [`ComputeEngine`] trait plus an HTTP client and
//!   a scripted in-memory engine for tests and offline use
//! - **Catalog layer**: sites of interest, per-session bounding boxes, and
//!   date index resolution
//! - **Visualization layer**: statistics-driven display ranges with
//!   per-set fallbacks, layer composition, and legend editing
//! - **Session layer**: the navigation state machine and the full-stack
//!   [`Session`] that wires everything behind a UI event surface
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use lst_client::{Session, SessionConfig, UiEvent};
//! use lst_client::catalog::find_site;
//! use lst_client::engine::HttpEngine;
//!
//! #[tokio::main]
//! async fn main() {
//!     let engine = Arc::new(HttpEngine::new("http://localhost:8017"));
//!     let mut session = Session::new(engine, SessionConfig::default());
//!
//!     let site = find_site("Greenidge Generation").unwrap();
//!     session.select_site(site, None);
//!     session.handle_event(UiEvent::ForwardClicked);
//!
//!     // Apply completed background requests as they arrive.
//!     loop {
//!         session.process_next().await;
//!     }
//! }
//! ```
//!
//! # Using Individual Layers
//!
//! The catalog and visualization layers are pure and can be driven without
//! a session:
//!
//! ```
//! use lst_client::SessionConfig;
//! use lst_client::catalog::nearest_index;
//! use lst_client::engine::SceneStats;
//! use lst_client::viz::derive_ranges;
//!
//! let config = SessionConfig::default();
//!
//! // A fully obscured scene falls back to the configured ranges.
//! let ranges = derive_ranges(&SceneStats::default(), &config);
//! assert!(ranges.lst_is_fallback);
//!
//! let dates = vec![
//!     chrono::NaiveDate::from_ymd_opt(2023, 6, 1).unwrap(),
//!     chrono::NaiveDate::from_ymd_opt(2023, 6, 17).unwrap(),
//! ];
//! assert_eq!(nearest_index(&dates, Some("2023-06-20")), 1);
//! ```

pub mod catalog;
pub mod config;
pub mod engine;
pub mod layers;
pub mod legend;
pub mod navigation;
pub mod session;
pub mod urlstate;
pub mod viz;

pub use catalog::{BoundingBox, CatalogError, Site};
pub use config::SessionConfig;
pub use engine::{ComputeEngine, EngineError, SceneStats};
pub use layers::{Layer, LayerKind, LayerStack};
pub use legend::Legend;
pub use navigation::{NavigationController, Phase};
pub use session::{Session, SessionEvent, UiEvent, UiState};
pub use urlstate::{MemoryStore, NavState, StateStore};
pub use viz::{LstRange, RgbRange, VizRanges};

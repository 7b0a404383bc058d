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

//! Thermaview: console browser for Landsat land-surface-temperature
//! imagery over sites of interest.

mod config;
mod shell;

use std::io::BufRead;
use std::sync::Arc;

use clap::Parser;
use log::{info, warn};
use tokio::sync::mpsc;

use lst_client::catalog::{self, Site};
use lst_client::engine::{ComputeEngine, HttpEngine, ScriptedEngine};
use lst_client::urlstate::{MemoryStore, NavState};
use lst_client::{Session, SessionEvent};

use config::AppConfig;
use shell::Command;

/// Browse Landsat land-surface-temperature time series per site.
#[derive(Debug, Parser)]
#[command(name = "thermaview", version, about)]
struct Args {
    /// Start with a named catalog site selected
    #[arg(long)]
    site: Option<String>,

    /// Start with a custom location selected, as "lon,lat"
    #[arg(long, conflicts_with = "site")]
    point: Option<String>,

    /// Target date to resolve against the date index, YYYY-MM-DD
    #[arg(long)]
    date: Option<String>,

    /// Restore a session from a shared deep link query string
    #[arg(long, conflicts_with_all = ["site", "point", "date"])]
    url: Option<String>,

    /// Compute engine base URL (overrides the configured endpoint)
    #[arg(long)]
    endpoint: Option<String>,

    /// Run against the built-in scripted engine, no backend needed
    #[arg(long)]
    offline: bool,
}

fn parse_point(point: &str) -> Result<Site, String> {
    let (lon, lat) = point
        .split_once(',')
        .ok_or_else(|| format!("expected lon,lat, got '{}'", point))?;
    let lon = lon
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("bad longitude '{}': {}", lon, e))?;
    let lat = lat
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("bad latitude '{}': {}", lat, e))?;
    Ok(Site::custom(lon, lat))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let app_config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            warn!("Failed to load configuration, using defaults: {}", e);
            AppConfig::default()
        }
    };
    if let Ok(path) = AppConfig::get_config_path() {
        info!("Configuration: {}", path.display());
    }

    let engine: Arc<dyn ComputeEngine> = if args.offline {
        info!("Running offline against the scripted demo engine");
        Arc::new(ScriptedEngine::demo())
    } else {
        let endpoint = args.endpoint.unwrap_or_else(|| app_config.endpoint.clone());
        info!("Compute engine: {}", endpoint);
        Arc::new(HttpEngine::new(endpoint))
    };

    // A shared deep link seeds the navigation state store before restore.
    let mut store = MemoryStore::new();
    if let Some(url) = &args.url {
        NavState::from_query(url).write(&mut store);
    }

    let mut session = Session::with_store(engine, app_config.session_config(), Box::new(store));
    let mut events = session.subscribe();

    println!("thermaview - Landsat surface temperature browser");
    shell::print_sites();
    shell::print_help();

    if args.url.is_some() {
        if !session.restore() {
            warn!("Deep link holds no valid coordinates, starting without a session");
        }
    } else if let Some(name) = &args.site {
        match catalog::find_site(name) {
            Some(site) => session.select_site(site, args.date.clone()),
            None => {
                eprintln!("Unknown site '{}'. 'sites' lists selectable sites.", name);
            }
        }
    } else if let Some(point) = &args.point {
        match parse_point(point) {
            Ok(site) => session.select_site(site, args.date.clone()),
            Err(message) => eprintln!("{}", message),
        }
    }
    drain_events(&mut events, shell::render_event);

    // Stdin is read on a plain thread; lines flow into the async loop.
    let (line_tx, mut line_rx) = mpsc::unbounded_channel::<String>();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if line_tx.send(line).is_err() {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            line = line_rx.recv() => {
                let Some(line) = line else { break };
                if !handle_line(&mut session, &line) {
                    break;
                }
            }
            () = session.process_next() => {}
        }
        drain_events(&mut events, shell::render_event);
    }

    info!("Shutting down");
    Ok(())
}

/// Handle one input line. Returns false on quit.
fn handle_line(session: &mut Session, line: &str) -> bool {
    let command = match shell::parse_command(line) {
        Some(Ok(command)) => command,
        Some(Err(message)) => {
            eprintln!("{}", message);
            return true;
        }
        None => return true,
    };

    match command {
        Command::Select { target, date } => {
            let site = if target.contains(',') {
                parse_point(&target)
            } else {
                catalog::find_site(&target).ok_or_else(|| {
                    format!("Unknown site '{}'. 'sites' lists selectable sites.", target)
                })
            };
            match site {
                Ok(site) => session.select_site(site, date),
                Err(message) => eprintln!("{}", message),
            }
        }
        Command::Ui(event) => session.handle_event(event),
        Command::Sites => shell::print_sites(),
        Command::Url => {
            let link = session.deep_link();
            if link.is_empty() {
                println!("No session to share.");
            } else {
                println!("?{}", link);
            }
        }
        Command::Help => shell::print_help(),
        Command::Quit => return false,
    }
    true
}

fn drain_events(
    events: &mut tokio::sync::broadcast::Receiver<SessionEvent>,
    mut render: impl FnMut(&SessionEvent),
) {
    use tokio::sync::broadcast::error::TryRecvError;

    loop {
        match events.try_recv() {
            Ok(event) => render(&event),
            // A lagged receiver skips to the oldest retained event and
            // keeps draining.
            Err(TryRecvError::Lagged(missed)) => {
                warn!("Dropped {} session events", missed);
            }
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
}

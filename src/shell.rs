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

//! Interactive console shell.
//!
//! Translates typed commands into session UI events and renders session
//! events back as text. The shell holds no session state of its own;
//! everything it prints comes from the state snapshots the session emits.

use lst_client::catalog::SITES;
use lst_client::layers::VizParams;
use lst_client::navigation::Phase;
use lst_client::session::{SessionEvent, UiEvent, UiState};

/// A parsed shell command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Start an analysis for a catalog site name or a "lon,lat" point,
    /// optionally resolving to the nearest date.
    Select {
        target: String,
        date: Option<String>,
    },
    /// Forward to the session as a UI event.
    Ui(UiEvent),
    /// List the selectable sites.
    Sites,
    /// Print the shareable deep link.
    Url,
    Help,
    Quit,
}

/// Parse one input line. Empty lines parse to `None`; anything else is
/// either a command or an error message to show the user.
pub fn parse_command(line: &str) -> Option<Result<Command, String>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "select" => {
            if rest.is_empty() {
                return Some(Err("usage: select <site|lon,lat> [YYYY-MM-DD]".to_string()));
            }
            // A trailing date token peels off as the nearest-date target.
            let (target, date) = match rest.rsplit_once(char::is_whitespace) {
                Some((head, tail)) if looks_like_date(tail) => {
                    (head.trim().to_string(), Some(tail.to_string()))
                }
                _ => (rest.to_string(), None),
            };
            Ok(Command::Select { target, date })
        }
        "click" | "inspect" => parse_lon_lat(rest)
            .map(|(lon, lat)| Command::Ui(UiEvent::MapClicked { lon, lat }))
            .ok_or_else(|| format!("usage: {} <lon> <lat>", word)),
        "back" | "b" => Ok(Command::Ui(UiEvent::BackClicked)),
        "forward" | "f" | "next" => Ok(Command::Ui(UiEvent::ForwardClicked)),
        "goto" => rest
            .parse::<usize>()
            .ok()
            .filter(|n| *n >= 1)
            .map(|n| Command::Ui(UiEvent::SliderMoved { index: n - 1 }))
            .ok_or_else(|| "usage: goto <image number>".to_string()),
        "range" => {
            let mut parts = rest.split_whitespace();
            match (parts.next(), parts.next(), parts.next()) {
                (Some(min), Some(max), None) => Ok(Command::Ui(UiEvent::LegendRangeEdited {
                    min: min.to_string(),
                    max: max.to_string(),
                })),
                _ => Err("usage: range <min> <max>".to_string()),
            }
        }
        "center" => {
            let mut parts = rest.split_whitespace();
            let parsed = (|| {
                let lat = parts.next()?.parse::<f64>().ok()?;
                let lon = parts.next()?.parse::<f64>().ok()?;
                let zoom = parts.next()?.parse::<u8>().ok()?;
                parts.next().is_none().then_some((lat, lon, zoom))
            })();
            parsed
                .map(|(lat, lon, zoom)| Command::Ui(UiEvent::ViewportIdle { lat, lon, zoom }))
                .ok_or_else(|| "usage: center <lat> <lon> <zoom>".to_string())
        }
        "reset" => Ok(Command::Ui(UiEvent::ResetClicked)),
        "sites" => Ok(Command::Sites),
        "url" => Ok(Command::Url),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" | "q" => Ok(Command::Quit),
        other => Err(format!("unknown command: {} (try 'help')", other)),
    };
    Some(command)
}

fn looks_like_date(token: &str) -> bool {
    let bytes = token.as_bytes();
    bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit())
}

fn parse_lon_lat(rest: &str) -> Option<(f64, f64)> {
    let mut parts = rest.split_whitespace();
    let lon = parts.next()?.parse::<f64>().ok()?;
    let lat = parts.next()?.parse::<f64>().ok()?;
    parts.next().is_none().then_some((lon, lat))
}

/// Render one session event to stdout.
pub fn render_event(event: &SessionEvent) {
    match event {
        SessionEvent::StateChanged(state) => render_state(state),
        SessionEvent::Notice(message) => println!("! {}", message),
        SessionEvent::SampleResult { lon, lat, value } => match value {
            Some(value) => println!("LST at ({:.5}, {:.5}): {:.1} F", lon, lat, value),
            None => println!("No data at ({:.5}, {:.5})", lon, lat),
        },
    }
}

fn render_state(state: &UiState) {
    match &state.phase {
        Phase::Idle => println!("No active session. 'sites' lists selectable sites."),
        Phase::Loading => println!("Loading date index..."),
        Phase::Error(message) => println!("Session failed: {}", message),
        Phase::Displayed(_) => {
            if let (Some(date), Some(count)) = (&state.date_label, &state.image_count_label) {
                let back = if state.back_enabled { "<" } else { " " };
                let forward = if state.forward_enabled { ">" } else { " " };
                println!("{} [{}] {} {}", date, count, back, forward);
            }
            for layer in state.layers.iter() {
                match &layer.viz {
                    VizParams::Lst { min, max, .. } => {
                        println!("  {:<16} stretch [{:.2}, {:.2}]", layer.name, min, max);
                    }
                    VizParams::Rgb { min, max } => {
                        println!(
                            "  {:<16} stretch [{:.3}, {:.3}] per channel",
                            layer.name, min[0], max[0]
                        );
                    }
                    VizParams::Color { color } => {
                        println!("  {:<16} color {}", layer.name, color);
                    }
                }
            }
            if let Some(legend) = &state.legend {
                println!(
                    "  legend {} | {} | {}",
                    legend.min_text, legend.mid_label, legend.max_text
                );
            }
        }
    }
}

/// Print the selectable site catalog.
pub fn print_sites() {
    println!("Selectable sites:");
    for site in SITES.iter() {
        println!("  {:<36} ({:.6}, {:.6})", site.name, site.lat, site.lon);
    }
}

/// Print the command reference.
pub fn print_help() {
    println!("Commands:");
    println!("  select <site|lon,lat> [date]  start an analysis");
    println!("  click <lon> <lat>       click the map (select a site, or inspect)");
    println!("  inspect <lon> <lat>     sample the displayed image at a point");
    println!("  back | forward          step through the date index");
    println!("  goto <n>                jump to image n");
    println!("  range <min> <max>       recolor the thermal layer");
    println!("  center <lat> <lon> <z>  move the viewport");
    println!("  sites                   list selectable sites");
    println!("  url                     print the shareable deep link");
    println!("  reset                   tear down the session");
    println!("  quit");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(line: &str) -> Command {
        parse_command(line).unwrap().unwrap()
    }

    #[test]
    fn test_parse_navigation_commands() {
        assert_eq!(parsed("back"), Command::Ui(UiEvent::BackClicked));
        assert_eq!(parsed("f"), Command::Ui(UiEvent::ForwardClicked));
        assert_eq!(parsed("goto 3"), Command::Ui(UiEvent::SliderMoved { index: 2 }));
        assert_eq!(parsed("reset"), Command::Ui(UiEvent::ResetClicked));
    }

    #[test]
    fn test_parse_select_keeps_full_name() {
        assert_eq!(
            parsed("select Greenidge Generation"),
            Command::Select {
                target: "Greenidge Generation".to_string(),
                date: None,
            }
        );
        assert!(parse_command("select").unwrap().is_err());
    }

    #[test]
    fn test_parse_select_with_trailing_date() {
        assert_eq!(
            parsed("select Miliken Station 2023-06-20"),
            Command::Select {
                target: "Miliken Station".to_string(),
                date: Some("2023-06-20".to_string()),
            }
        );
        assert_eq!(
            parsed("select -76.94,42.68 2023-06-20"),
            Command::Select {
                target: "-76.94,42.68".to_string(),
                date: Some("2023-06-20".to_string()),
            }
        );
        // A non-date last word stays part of the site name.
        assert_eq!(
            parsed("select Constellation Nuclear"),
            Command::Select {
                target: "Constellation Nuclear".to_string(),
                date: None,
            }
        );
    }

    #[test]
    fn test_parse_click_and_range() {
        assert_eq!(
            parsed("click -76.94 42.68"),
            Command::Ui(UiEvent::MapClicked {
                lon: -76.94,
                lat: 42.68
            })
        );
        assert_eq!(
            parsed("range 60 80"),
            Command::Ui(UiEvent::LegendRangeEdited {
                min: "60".to_string(),
                max: "80".to_string()
            })
        );
        assert_eq!(
            parsed("inspect -76.95 42.69"),
            Command::Ui(UiEvent::MapClicked {
                lon: -76.95,
                lat: 42.69
            })
        );
        assert!(parse_command("click east west").unwrap().is_err());
        assert!(parse_command("range 60").unwrap().is_err());
    }

    #[test]
    fn test_parse_center() {
        assert_eq!(
            parsed("center 42.7 -76.9 12"),
            Command::Ui(UiEvent::ViewportIdle {
                lat: 42.7,
                lon: -76.9,
                zoom: 12
            })
        );
        assert!(parse_command("center 42.7 -76.9").unwrap().is_err());
    }

    #[test]
    fn test_empty_and_unknown_input() {
        assert!(parse_command("   ").is_none());
        assert!(parse_command("frobnicate").unwrap().is_err());
        // goto is 1-based; zero is rejected.
        assert!(parse_command("goto 0").unwrap().is_err());
    }
}

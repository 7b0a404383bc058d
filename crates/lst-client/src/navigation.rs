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

//! Image navigation state machine.
//!
//! Owns the per-session date list and the index currently shown, and
//! serializes the asynchronous show pipeline behind a monotonically
//! increasing sequence number. Every operation that changes what should be
//! visible (resolving the date list, stepping, sliding, resetting)
//! advances the sequence; a completion may only mutate visible state if it
//! still carries the latest sequence. Superseded completions are stale and
//! must be discarded silently. Reset advances the sequence without issuing
//! anything, so responses in flight at reset time fail the same gate.

use chrono::NaiveDate;
use log::debug;

/// Navigation phase of a session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Phase {
    /// No active session.
    #[default]
    Idle,
    /// Date list fetch in flight.
    Loading,
    /// Navigating; the index is the date currently shown.
    Displayed(usize),
    /// Session could not start (empty catalog or fetch failure).
    Error(String),
}

/// One issued show request: fetch and display the image for `date`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShowTicket {
    /// Sequence number at issue time; completions must present it.
    pub seq: u64,
    /// Index into the session date list.
    pub index: usize,
    /// The calendar day to show.
    pub date: NaiveDate,
}

/// State machine driving slider/back/forward navigation.
#[derive(Debug, Default)]
pub struct NavigationController {
    phase: Phase,
    dates: Vec<NaiveDate>,
    last_issued_seq: u64,
}

impl NavigationController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter `Loading` for a new site selection. Returns the sequence
    /// number the date-list completion must present.
    pub fn begin_loading(&mut self) -> u64 {
        self.dates.clear();
        self.phase = Phase::Loading;
        self.bump()
    }

    /// Complete the date-list fetch and issue the initial show request.
    ///
    /// Returns `None` when the completion is stale (a newer selection or a
    /// reset supersedes it, and the caller drops it on the floor), or when
    /// `dates` is empty, which moves the machine to `Error`.
    pub fn resolved(
        &mut self,
        seq: u64,
        dates: Vec<NaiveDate>,
        initial_index: usize,
    ) -> Option<ShowTicket> {
        if !self.is_current(seq) {
            debug!("Discarding stale date list (seq {} < {})", seq, self.last_issued_seq);
            return None;
        }
        if dates.is_empty() {
            self.phase = Phase::Error("no images found".to_string());
            return None;
        }

        let index = initial_index.min(dates.len() - 1);
        self.dates = dates;
        Some(self.issue(index))
    }

    /// Fail the date-list fetch. Returns false when the failure is stale.
    pub fn fail_loading(&mut self, seq: u64, message: impl Into<String>) -> bool {
        if !self.is_current(seq) {
            return false;
        }
        self.phase = Phase::Error(message.into());
        true
    }

    /// Step back or forward, clamped to the date list. `None` when the
    /// step would not move (already at an end, or not displaying).
    pub fn advance(&mut self, step: i64) -> Option<ShowTicket> {
        let Phase::Displayed(index) = self.phase else {
            return None;
        };
        let last = self.dates.len().checked_sub(1)?;
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_possible_wrap,
            clippy::cast_sign_loss,
            reason = "indices are far below i64::MAX"
        )]
        let target = (index as i64 + step).clamp(0, last as i64) as usize;
        if target == index {
            return None;
        }
        Some(self.issue(target))
    }

    /// Jump directly to an index (slider drag), clamped to the date list.
    /// `None` when already showing that index or not displaying.
    pub fn slide(&mut self, index: usize) -> Option<ShowTicket> {
        let Phase::Displayed(current) = self.phase else {
            return None;
        };
        let last = self.dates.len().checked_sub(1)?;
        let target = index.min(last);
        if target == current {
            return None;
        }
        Some(self.issue(target))
    }

    /// Tear down navigation. Advances the sequence without issuing a show,
    /// so any response still in flight is discarded by the ordinary gate.
    pub fn reset(&mut self) {
        self.bump();
        self.dates.clear();
        self.phase = Phase::Idle;
    }

    /// Gate check: does `seq` still identify the latest issued request?
    #[must_use]
    pub fn is_current(&self, seq: u64) -> bool {
        seq == self.last_issued_seq
    }

    /// The latest issued sequence number. Auxiliary requests tied to the
    /// current display (point inspection) tag themselves with this so
    /// their results expire with it.
    #[must_use]
    pub fn latest_seq(&self) -> u64 {
        self.last_issued_seq
    }

    #[must_use]
    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// The session date list, ascending.
    #[must_use]
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    #[must_use]
    pub fn date_count(&self) -> usize {
        self.dates.len()
    }

    /// Index currently shown, if displaying.
    #[must_use]
    pub fn current_index(&self) -> Option<usize> {
        match self.phase {
            Phase::Displayed(i) => Some(i),
            _ => None,
        }
    }

    /// Date currently shown, if displaying.
    #[must_use]
    pub fn current_date(&self) -> Option<NaiveDate> {
        self.current_index().and_then(|i| self.dates.get(i).copied())
    }

    /// Back is enabled unless showing the first date.
    #[must_use]
    pub fn back_enabled(&self) -> bool {
        matches!(self.phase, Phase::Displayed(i) if i > 0)
    }

    /// Forward is enabled unless showing the last date.
    #[must_use]
    pub fn forward_enabled(&self) -> bool {
        matches!(self.phase, Phase::Displayed(i) if i + 1 < self.dates.len())
    }

    fn bump(&mut self) -> u64 {
        self.last_issued_seq += 1;
        self.last_issued_seq
    }

    fn issue(&mut self, index: usize) -> ShowTicket {
        let seq = self.bump();
        self.phase = Phase::Displayed(index);
        ShowTicket {
            seq,
            index,
            date: self.dates[index],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dates(strs: &[&str]) -> Vec<NaiveDate> {
        strs.iter()
            .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap())
            .collect()
    }

    fn displayed(nav: &mut NavigationController, n: usize) -> ShowTicket {
        let seq = nav.begin_loading();
        let list = dates(&["2023-06-01", "2023-06-17", "2023-07-03"]);
        nav.resolved(seq, list[..n].to_vec(), 0).unwrap()
    }

    #[test]
    fn test_select_resolve_display() {
        let mut nav = NavigationController::new();
        assert_eq!(*nav.phase(), Phase::Idle);

        let seq = nav.begin_loading();
        assert_eq!(*nav.phase(), Phase::Loading);

        let ticket = nav
            .resolved(seq, dates(&["2023-06-01", "2023-06-17"]), 1)
            .unwrap();
        assert_eq!(ticket.index, 1);
        assert_eq!(*nav.phase(), Phase::Displayed(1));
        assert!(nav.is_current(ticket.seq));
    }

    #[test]
    fn test_empty_date_list_is_error() {
        let mut nav = NavigationController::new();
        let seq = nav.begin_loading();
        assert!(nav.resolved(seq, vec![], 0).is_none());
        assert!(matches!(nav.phase(), Phase::Error(_)));
    }

    #[test]
    fn test_advance_clamps_at_both_ends() {
        let mut nav = NavigationController::new();
        displayed(&mut nav, 3);

        // At index 0: back does not move.
        assert!(nav.advance(-1).is_none());
        assert!(!nav.back_enabled());
        assert!(nav.forward_enabled());

        let ticket = nav.advance(1).unwrap();
        assert_eq!(ticket.index, 1);
        assert!(nav.back_enabled());

        let ticket = nav.advance(1).unwrap();
        assert_eq!(ticket.index, 2);
        assert!(!nav.forward_enabled());
        assert!(nav.advance(1).is_none());
    }

    #[test]
    fn test_slide_jumps_directly() {
        let mut nav = NavigationController::new();
        displayed(&mut nav, 3);

        let ticket = nav.slide(2).unwrap();
        assert_eq!(ticket.index, 2);
        // Same index: nothing issued.
        assert!(nav.slide(2).is_none());
        // Out of range clamps to the last index, already shown.
        assert!(nav.slide(99).is_none());
    }

    #[test]
    fn test_stale_completion_is_discarded() {
        let mut nav = NavigationController::new();
        let t1 = displayed(&mut nav, 3);
        let t2 = nav.slide(1).unwrap();
        let t3 = nav.slide(2).unwrap();

        // Rapid scrubbing: only the last issued request may apply, no
        // matter the arrival order.
        assert!(!nav.is_current(t1.seq));
        assert!(nav.is_current(t3.seq));
        assert!(!nav.is_current(t2.seq));
        assert_eq!(nav.current_index(), Some(2));
    }

    #[test]
    fn test_reset_supersedes_in_flight_requests() {
        let mut nav = NavigationController::new();
        let ticket = displayed(&mut nav, 3);

        nav.reset();
        assert_eq!(*nav.phase(), Phase::Idle);
        assert_eq!(nav.date_count(), 0);
        // The show issued before reset fails the gate when it completes.
        assert!(!nav.is_current(ticket.seq));
    }

    #[test]
    fn test_stale_date_list_after_new_selection() {
        let mut nav = NavigationController::new();
        let first = nav.begin_loading();
        // User picks a different site before the first list arrives.
        let second = nav.begin_loading();

        assert!(nav.resolved(first, dates(&["2023-06-01"]), 0).is_none());
        assert!(nav
            .resolved(second, dates(&["2023-06-17"]), 0)
            .is_some());
    }

    #[test]
    fn test_initial_index_clamped() {
        let mut nav = NavigationController::new();
        let seq = nav.begin_loading();
        let ticket = nav.resolved(seq, dates(&["2023-06-01", "2023-06-17"]), 10).unwrap();
        assert_eq!(ticket.index, 1);
    }

    #[test]
    fn test_current_date_tracks_index() {
        let mut nav = NavigationController::new();
        displayed(&mut nav, 3);
        nav.advance(1);
        assert_eq!(
            nav.current_date(),
            Some(NaiveDate::parse_from_str("2023-06-17", "%Y-%m-%d").unwrap())
        );
    }
}

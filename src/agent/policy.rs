//! Routing policy: picks the next step of a run from structured state.
//!
//! The policy is local-first. Queries that look time-sensitive go straight
//! to web search and never touch the local store; everything else consults
//! the local store once and then answers, without ever trying the web.
//! That asymmetry is deliberate. Local documents are assumed stale for
//! recency-sensitive questions, and authoritative otherwise.

use chrono::Datelike;

use crate::core::{Action, AgentState};

/// Default keywords that mark a query as recency-sensitive.
pub const DEFAULT_RECENCY_KEYWORDS: &[&str] = &["current", "latest", "news", "today", "recent"];

/// Default number of calendar years, starting with the current one, whose
/// mention marks a query as recency-sensitive.
pub const DEFAULT_LOOKAHEAD_YEARS: u32 = 5;

/// Heuristic routing policy.
///
/// [`RoutingPolicy::decide`] is pure apart from reading the system clock:
/// the year window is recomputed from the current date on every call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingPolicy {
    keywords: Vec<String>,
    lookahead_years: u32,
}

impl Default for RoutingPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_RECENCY_KEYWORDS.iter().copied(),
            DEFAULT_LOOKAHEAD_YEARS,
        )
    }
}

impl RoutingPolicy {
    /// Creates a policy from a keyword set and a year lookahead.
    ///
    /// Keywords are matched case-insensitively as substrings, so `recent`
    /// also matches `recently`. Blank keywords are dropped.
    #[must_use]
    pub fn new<I, S>(keywords: I, lookahead_years: u32) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self {
            keywords,
            lookahead_years,
        }
    }

    /// Recency keywords (lowercased).
    #[must_use]
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Number of calendar years in the recency window.
    #[must_use]
    pub const fn lookahead_years(&self) -> u32 {
        self.lookahead_years
    }

    /// Chooses the next action for `state` using today's date.
    #[must_use]
    pub fn decide(&self, state: &AgentState) -> Action {
        self.decide_at(state, current_year())
    }

    /// Chooses the next action for `state` as if the current year were
    /// `current_year`.
    #[must_use]
    pub fn decide_at(&self, state: &AgentState, current_year: i32) -> Action {
        let recency = self.is_recency_sensitive_at(&state.query, current_year);

        if !recency && !state.retrieval_attempted() {
            Action::Retrieve
        } else if recency && !state.search_attempted() {
            Action::SearchWeb
        } else {
            Action::Generate
        }
    }

    /// Returns `true` if `query` needs current information, using today's date.
    #[must_use]
    pub fn is_recency_sensitive(&self, query: &str) -> bool {
        self.is_recency_sensitive_at(query, current_year())
    }

    /// Returns `true` if `query` contains a recency keyword or mentions a
    /// year inside the window starting at `current_year`.
    #[must_use]
    pub fn is_recency_sensitive_at(&self, query: &str, current_year: i32) -> bool {
        let lowered = query.to_lowercase();
        if self.keywords.iter().any(|k| lowered.contains(k.as_str())) {
            return true;
        }

        let window_end = current_year.saturating_add_unsigned(self.lookahead_years);
        mentioned_years(query).any(|year| year >= current_year && year < window_end)
    }
}

/// Four-digit runs of ASCII digits in `text`, parsed as years.
///
/// Longer digit runs (`20261`) are not years; a run embedded in letters
/// (`FY2026`) is.
fn mentioned_years(text: &str) -> impl Iterator<Item = i32> + '_ {
    text.split(|c: char| !c.is_ascii_digit())
        .filter(|run| run.len() == 4)
        .filter_map(|run| run.parse().ok())
}

fn current_year() -> i32 {
    chrono::Local::now().year()
}

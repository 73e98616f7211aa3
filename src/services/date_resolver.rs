//! Query intake: turn a question plus an optional hint into a clamped window.
//!
//! Resolution is fail-open. Any completion failure or unparseable answer
//! degrades to the trailing default window instead of aborting the run.

use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::domain::models::{parse_date, DateHint, DateRange, DateResolution, DateType};
use crate::domain::ports::{complete_json, CompletionClient};
use crate::services::prompts;

#[derive(Debug, Deserialize)]
struct RawDateRange {
    #[serde(default)]
    start_date: String,
    #[serde(default)]
    end_date: String,
}

/// Window plus how it was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDates {
    pub range: DateRange,
    pub resolution: DateResolution,
}

pub struct DateResolver {
    client: Arc<dyn CompletionClient>,
    timeout: Duration,
    default_window_days: u32,
}

impl DateResolver {
    pub fn new(client: Arc<dyn CompletionClient>, timeout: Duration, default_window_days: u32) -> Self {
        Self {
            client,
            timeout,
            default_window_days,
        }
    }

    /// Classify a hint. No hint means the resolver infers the kind itself.
    pub fn classify(hint: Option<&DateHint>) -> DateType {
        match hint {
            Some(DateHint::Single { .. }) => DateType::Single,
            Some(DateHint::Period { .. } | DateHint::Exact { .. }) => DateType::Period,
            None => DateType::Auto,
        }
    }

    pub async fn resolve(&self, query: &str, hint: Option<&DateHint>, today: NaiveDate) -> ResolvedDates {
        let date_type = Self::classify(hint);
        let expression = match hint {
            Some(DateHint::Exact { start, end }) => {
                return ResolvedDates {
                    range: DateRange::clamped(*start, *end, today),
                    resolution: DateResolution::Resolved,
                };
            }
            Some(DateHint::Single { origin } | DateHint::Period { origin }) if !origin.trim().is_empty() => {
                origin.as_str()
            }
            _ => query,
        };

        let request = prompts::date_resolution(expression, date_type, today);
        let raw: RawDateRange = match complete_json(self.client.as_ref(), request, self.timeout).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Date resolution failed, using default window");
                return self.fallback(today, format!("completion failed: {e}"));
            }
        };

        let (Some(start), Some(end)) = (parse_date(&raw.start_date), parse_date(&raw.end_date)) else {
            warn!(
                start_date = %raw.start_date,
                end_date = %raw.end_date,
                "Unparseable resolved dates, using default window"
            );
            return self.fallback(
                today,
                format!("unparseable dates: {:?} ~ {:?}", raw.start_date, raw.end_date),
            );
        };

        let range = match date_type {
            DateType::Single => DateRange::clamped(start, start, today),
            DateType::Period | DateType::Auto => DateRange::clamped(start, end, today),
        };
        debug!(date_type = date_type.as_str(), %range, "Resolved date range");

        ResolvedDates {
            range,
            resolution: DateResolution::Resolved,
        }
    }

    fn fallback(&self, today: NaiveDate, reason: String) -> ResolvedDates {
        ResolvedDates {
            range: DateRange::trailing_window(today, self.default_window_days),
            resolution: DateResolution::Degraded { reason },
        }
    }
}

//! `ask`: run one analysis and print its report.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Args;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::adapters::completion::AnthropicCompletionClient;
use crate::adapters::data_provider::{FixtureDataProvider, HttpDataProvider};
use crate::application::{HealthAnalysisAgent, RunRequest};
use crate::cli::output::{create_spinner, output, CommandOutput, ProgressBarExt};
use crate::domain::models::{parse_date, Config, DataProviderConfig, DataProviderKind, DateHint, FinalReport};
use crate::domain::ports::DataProvider;
use crate::infrastructure::config::ConfigLoader;
use crate::services::ToolCatalog;

#[derive(Args, Debug)]
pub struct AskArgs {
    /// Natural-language question about the subject's health data
    pub query: String,

    /// Subject whose data is analysed
    #[arg(short, long)]
    pub subject: i64,

    /// IANA timezone used to determine "today"
    #[arg(long, default_value = "UTC")]
    pub timezone: String,

    /// Date expression known to denote a single day ("yesterday")
    #[arg(long, conflicts_with_all = ["period", "from", "to"])]
    pub date: Option<String>,

    /// Date expression known to denote a period ("last week")
    #[arg(long, conflicts_with_all = ["from", "to"])]
    pub period: Option<String>,

    /// Exact start date (YYYY-MM-DD)
    #[arg(long, requires = "to", value_parser = parse_date_arg)]
    pub from: Option<NaiveDate>,

    /// Exact end date (YYYY-MM-DD)
    #[arg(long, requires = "from", value_parser = parse_date_arg)]
    pub to: Option<NaiveDate>,

    /// Serve tool calls from a fixture file instead of the metrics service
    #[arg(long)]
    pub fixtures: Option<PathBuf>,

    /// Override agent.max_iterations
    #[arg(long)]
    pub max_iterations: Option<u32>,
}

impl AskArgs {
    pub fn date_hint(&self) -> Option<DateHint> {
        if let (Some(start), Some(end)) = (self.from, self.to) {
            return Some(DateHint::Exact { start, end });
        }
        if let Some(origin) = &self.date {
            return Some(DateHint::Single { origin: origin.clone() });
        }
        self.period.clone().map(|origin| DateHint::Period { origin })
    }

    fn run_request(&self) -> RunRequest {
        let request = RunRequest::new(self.query.clone(), self.subject).with_timezone(self.timezone.clone());
        match self.date_hint() {
            Some(hint) => request.with_date_hint(hint),
            None => request,
        }
    }
}

fn parse_date_arg(value: &str) -> Result<NaiveDate, String> {
    parse_date(value).ok_or_else(|| format!("expected YYYY-MM-DD, got '{value}'"))
}

#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct AskOutput {
    pub report: FinalReport,
}

impl CommandOutput for AskOutput {
    fn to_human(&self) -> String {
        let report = &self.report;
        let failed = report.tool_history.iter().filter(|r| !r.is_success()).count();

        let mut lines = vec![
            format!(
                "{} subject {} | {}",
                console::style("Analysis").bold(),
                report.subject_id,
                report.date_range
            ),
            format!(
                "{} iteration(s), {} | {} tool call(s), {} failed",
                report.iterations,
                report.termination.as_str().replace('_', " "),
                report.tool_history.len(),
                failed
            ),
        ];
        if report.date_resolution.is_degraded() {
            lines.push(
                console::style("Could not interpret the dates in the question; used the most recent window instead.")
                    .yellow()
                    .to_string(),
            );
        }
        lines.push(String::new());
        lines.push(report.report.clone());
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.report).unwrap_or_default()
    }
}

fn build_provider(config: &DataProviderConfig, fixtures: Option<&Path>) -> Result<Arc<dyn DataProvider>> {
    let fixture_path = fixtures.or_else(|| match config.kind {
        DataProviderKind::Fixture => config.fixture_path.as_deref(),
        DataProviderKind::Http => None,
    });

    if let Some(path) = fixture_path {
        let provider = FixtureDataProvider::from_file(path)
            .with_context(|| format!("Failed to load fixtures from {}", path.display()))?;
        return Ok(Arc::new(provider));
    }

    let provider = HttpDataProvider::new(config).context("Failed to create metrics service client")?;
    Ok(Arc::new(provider))
}

pub async fn execute(args: AskArgs, mut config: Config, json_mode: bool) -> Result<()> {
    if let Some(max_iterations) = args.max_iterations {
        config.agent.max_iterations = max_iterations;
        ConfigLoader::validate(&config)?;
    }

    let completion = AnthropicCompletionClient::new(&config.completion, &config.rate_limit, &config.retry)
        .context("Failed to create completion client")?;
    let provider = build_provider(&config.data_provider, args.fixtures.as_deref())?;
    let agent = HealthAnalysisAgent::new(Arc::new(completion), provider, ToolCatalog::wearable(), config.agent);

    let cancel = CancellationToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, stopping after the current iteration");
                cancel.cancel();
            }
        })
    };

    let spinner = create_spinner("Analyzing...", json_mode);
    let result = agent.run(args.run_request(), &cancel).await;
    watcher.abort();

    match result {
        Ok(report) => {
            spinner.finish_and_clear();
            output(&AskOutput { report }, json_mode);
            Ok(())
        }
        Err(e) => {
            spinner.finish_error("Analysis failed");
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{DateRange, DateResolution, Termination};
    use uuid::Uuid;

    fn args(extra: &[&str]) -> AskArgs {
        use clap::Parser;

        #[derive(Parser)]
        struct Harness {
            #[command(flatten)]
            ask: AskArgs,
        }

        let mut argv = vec!["ask", "How was my sleep?", "--subject", "7"];
        argv.extend_from_slice(extra);
        Harness::try_parse_from(argv).unwrap().ask
    }

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    #[test]
    fn test_date_hint_variants() {
        assert_eq!(args(&[]).date_hint(), None);
        assert_eq!(
            args(&["--date", "yesterday"]).date_hint(),
            Some(DateHint::Single {
                origin: "yesterday".to_string()
            })
        );
        assert_eq!(
            args(&["--from", "2025-04-01", "--to", "2025-04-07"]).date_hint(),
            Some(DateHint::Exact {
                start: date("2025-04-01"),
                end: date("2025-04-07")
            })
        );
    }

    #[test]
    fn test_invalid_exact_date_rejected() {
        assert!(parse_date_arg("04/01/2025").is_err());
    }

    #[test]
    fn test_fixture_flag_overrides_http_kind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixtures.yaml");
        std::fs::write(&path, "sleep_summary:\n  - payload: {hours: 7}\n").unwrap();

        let config = DataProviderConfig::default();
        assert!(build_provider(&config, Some(&path)).is_ok());
        assert!(build_provider(&config, Some(&dir.path().join("missing.yaml"))).is_err());
    }

    #[test]
    fn test_human_output_flags_degraded_dates() {
        let today = date("2025-04-10");
        let output = AskOutput {
            report: FinalReport {
                run_id: Uuid::new_v4(),
                subject_id: 7,
                query: "How was my sleep?".to_string(),
                date_range: DateRange::trailing_window(today, 7),
                date_resolution: DateResolution::Degraded {
                    reason: "timeout".to_string(),
                },
                plan: vec![],
                focus_areas: vec!["sleep".to_string()],
                user_intent: "sleep quality".to_string(),
                report: "# Sleep\nSteady.".to_string(),
                iterations: 2,
                termination: Termination::IterationLimitReached,
                tool_history: vec![],
                analysis_history: vec![],
            },
        };

        let human = output.to_human();
        assert!(human.contains("2 iteration(s), iteration limit reached"));
        assert!(human.contains("most recent window"));
        assert!(human.ends_with("# Sleep\nSteady."));
        assert_eq!(output.to_json()["termination"], "iteration_limit_reached");
    }
}

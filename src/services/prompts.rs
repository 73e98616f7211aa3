//! Prompt builders for every reasoning step of a run.
//!
//! Each builder returns a ready [`CompletionRequest`]; none of them touch the
//! execution state, so building a prompt twice yields the same request.

use chrono::NaiveDate;

use crate::domain::models::{
    AnalysisDigest, DateRange, DateType, ToolDescriptor, ToolInvocationRecord, ToolPayload,
    DATE_FORMAT,
};
use crate::domain::ports::{CompletionRequest, RequestKind};

/// Fallbacks used when the plan left these blank.
pub const DEFAULT_FOCUS_AREA: &str = "health";
pub const DEFAULT_USER_INTENT: &str = "The user wants to know about their recent health status.";

pub fn date_resolution(query: &str, date_type: DateType, today: NaiveDate) -> CompletionRequest {
    let system = format!(
        r#"You extract the date range a health question is about.
Today is {today}. The question is a "{date_type}" analysis.

date_type meanings:
- "single": a specific day ("April 7", "yesterday", "today"). start_date and end_date must be the same day.
- "period": a whole period ("this month", "last week", "the last 10 days", "March").
- "auto": no explicit expression. Infer single or period from the intent; for general questions use the last 7 days ending today.

Conversion rules:
- "this week" -> Monday of this week ~ today
- "last week" -> Monday ~ Sunday of last week
- "this month" -> the 1st of this month ~ today
- "last month" -> the 1st ~ the last day of last month
- "the last N days" -> N days ago ~ today
- "yesterday" -> today minus one day

start_date must be on or before end_date. Dates use YYYY-MM-DD.

Respond with a single JSON object:
{{"start_date": "YYYY-MM-DD", "end_date": "YYYY-MM-DD"}}"#,
        today = today.format(DATE_FORMAT),
        date_type = date_type.as_str(),
    );

    CompletionRequest::json(RequestKind::DateResolution, system).with_user_message(query)
}

pub fn planning(query: &str, date_range: &DateRange, tools: &[ToolDescriptor]) -> CompletionRequest {
    let system = format!(
        r#"You are an expert analyst of wearable health data. Given the user's question and the available data tools, set out an efficient, executable analysis plan.
Where it helps explain a change or a cause, include goals that compare against the previous day or an earlier period.

Available tools:
{tools}

Tool kinds:
- Summary tools return daily aggregates for a date range (e.g. heart_rate_summary, steps_summary).
- Time-series tools return intraday readings for a single day (e.g. heart_rate_timeseries, stress_timeseries).

Guidelines:
- Identify the key metrics (heart rate, steps, sleep, stress, activity) and the period of interest.
- Prefer summary tools for trends and comparisons; use time-series tools for the detailed pattern of one day.
- State for each goal which data is used, for what and why.
- Keep the plan to the 8-10 most relevant goals.

Respond with a single JSON object:
{{"analysis_plan": ["goal", ...], "focus_areas": ["sleep", ...], "user_intent": "one sentence"}}"#,
        tools = render_tools(tools),
    );

    CompletionRequest::json(RequestKind::Planning, system).with_user_message(format!(
        "Question: {query}\nAnalysis period: {date_range}"
    ))
}

/// Inputs to the tool-selection prompt.
pub struct ToolSelectionContext<'a> {
    pub query: &'a str,
    pub subject_id: i64,
    pub date_range: &'a DateRange,
    pub plan: &'a [String],
    pub tools: &'a [ToolDescriptor],
    pub history: &'a [ToolInvocationRecord],
    pub digests: &'a [AnalysisDigest],
    pub targets: &'a [String],
}

pub fn tool_selection(ctx: &ToolSelectionContext<'_>) -> CompletionRequest {
    let system = format!(
        r#"You choose which data tools to run next.
Never repeat a call that was already executed with the same parameters.

Already executed:
{executed}

Available tools:
{tools}

Use subject_id {subject_id}. Dates use YYYY-MM-DD and must not be after {end}.

Respond with a single JSON object:
{{"tools_to_execute": [{{"name": "heart_rate_summary", "params": {{"subject_id": {subject_id}, "start_date": "{start}", "end_date": "{end}"}}}}]}}"#,
        executed = render_history(ctx.history),
        tools = render_tools(ctx.tools),
        subject_id = ctx.subject_id,
        start = ctx.date_range.start_date.format(DATE_FORMAT),
        end = ctx.date_range.end_date.format(DATE_FORMAT),
    );

    let mut message = format!(
        "Question: {}\nAnalysis period: {}\n\nAnalysis plan:\n{}",
        ctx.query,
        ctx.date_range,
        render_list(ctx.plan)
    );
    if !ctx.digests.is_empty() {
        message.push_str("\n\nPrevious analysis:\n");
        message.push_str(&render_digests(ctx.digests));
    }
    if !ctx.targets.is_empty() {
        message.push_str("\n\nRequested follow-up data:\n");
        message.push_str(&render_list(ctx.targets));
    }

    CompletionRequest::json(RequestKind::ToolSelection, system).with_user_message(message)
}

/// Inputs to the analysis prompt.
pub struct AnalysisContext<'a> {
    pub query: &'a str,
    pub date_range: &'a DateRange,
    pub plan: &'a [String],
    pub tools: &'a [ToolDescriptor],
    pub payloads: &'a [ToolPayload],
    /// Every call attempted this iteration, failed ones included.
    pub records: &'a [ToolInvocationRecord],
    pub digests: &'a [AnalysisDigest],
    pub comment_limit: usize,
}

pub fn analysis(ctx: &AnalysisContext<'_>) -> CompletionRequest {
    let system = format!(
        r#"You are a health expert analysing smartwatch data.
Combine the new tool results with the previous analysis. Look for correlations between metrics and for how one day's activity, sleep and stress affected the next.
Point out anomalies that only show when metrics or adjacent days are compared. If data is missing, say so; never invent data.

Available tools:
{tools}

Decide whether more data is needed. When it is, list concrete targets: a date range for summary tools ("2025-04-01 ~ 2025-04-07 sleep_summary") or a single day for time-series tools ("2025-04-08 stress_timeseries"). Do not request data that was already analysed.

Respond with a single JSON object. Keep each insight comment under {limit} characters.
{{"summary": "...", "insights": [{{"comment": "YYYY-MM-DD - ..."}}], "additional_analysis_needed": false, "additional_analysis_targets": []}}"#,
        tools = render_tools(ctx.tools),
        limit = ctx.comment_limit,
    );

    let mut message = format!(
        "Question: {}\nAnalysis period: {}\n\nAnalysis plan:\n{}\n\nTool results:\n{}",
        ctx.query,
        ctx.date_range,
        render_list(ctx.plan),
        render_payloads(ctx.payloads)
    );
    let failures = render_failures(ctx.records);
    if !failures.is_empty() {
        message.push_str("\n\nFailed calls (no data):\n");
        message.push_str(&failures);
    }
    if !ctx.digests.is_empty() {
        message.push_str("\n\nPrevious analysis:\n");
        message.push_str(&render_digests(ctx.digests));
    }

    CompletionRequest::json(RequestKind::Analysis, system).with_user_message(message)
}

/// Inputs to the report prompt.
pub struct ReportContext<'a> {
    pub query: &'a str,
    pub date_range: &'a DateRange,
    pub focus_areas: &'a [String],
    pub user_intent: &'a str,
    pub digests: &'a [AnalysisDigest],
}

pub fn report(ctx: &ReportContext<'_>) -> CompletionRequest {
    let system = r####"You write the final health analysis report in Markdown for the user.
Write the report body only; never wrap it in a code fence. If data is missing, say so; never invent data.

Guidelines:
1. Title the report after its main topic with a fitting icon (e.g. "# Sleep Analysis Report").
2. Restate the user's intent naturally under "## What you asked".
3. Convert seconds into minutes or hours.
4. Prefer plain words over jargon (HRV may stay).
5. Keep an encouraging, positive tone.
6. Under "## Key insights", group findings by date with "### YYYY-MM-DD" headings in date order, interpreting the metrics of each day together.
7. Under "## Feedback", interpret the overall trend.
8. Under "## How to improve", give 3-5 concrete tips tied to the feedback.
9. End with one or two sentences of encouragement.

Structure:
# [icon] [topic] Analysis Report
## What you asked
## Summary
## Key insights
## Feedback
## How to improve"####;

    let focus = if ctx.focus_areas.is_empty() {
        DEFAULT_FOCUS_AREA.to_string()
    } else {
        ctx.focus_areas.join(", ")
    };
    let intent = if ctx.user_intent.trim().is_empty() {
        DEFAULT_USER_INTENT
    } else {
        ctx.user_intent
    };

    let message = format!(
        "Question: {}\nAnalysis period: {}\nFocus areas: {focus}\nUser intent: {intent}\n\nAnalysis results:\n{}",
        ctx.query,
        ctx.date_range,
        render_digests(ctx.digests)
    );

    CompletionRequest::text(RequestKind::Report, system).with_user_message(message)
}

fn render_tools(tools: &[ToolDescriptor]) -> String {
    serde_json::to_string_pretty(tools).unwrap_or_else(|_| {
        tools
            .iter()
            .map(|t| format!("- {}: {}", t.name, t.description))
            .collect::<Vec<_>>()
            .join("\n")
    })
}

fn render_history(history: &[ToolInvocationRecord]) -> String {
    if history.is_empty() {
        return "(none)".to_string();
    }
    history
        .iter()
        .map(|record| {
            let params = serde_json::to_string(&record.parameters).unwrap_or_default();
            format!(
                "- {} {} - {}",
                record.operation_name,
                params,
                record.outcome_status.as_str()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_list(items: &[String]) -> String {
    if items.is_empty() {
        return "(none)".to_string();
    }
    items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("{}. {item}", i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_payloads(payloads: &[ToolPayload]) -> String {
    if payloads.is_empty() {
        return "(no data returned)".to_string();
    }
    payloads
        .iter()
        .map(|payload| format!("### {}\n{}", payload.call, payload.data))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn render_failures(records: &[ToolInvocationRecord]) -> String {
    records
        .iter()
        .filter(|record| !record.is_success())
        .map(|record| {
            format!(
                "- {}: {}",
                record.call(),
                record.error.as_deref().unwrap_or(record.outcome_status.as_str())
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render analysis digests as numbered sections, oldest first.
pub fn render_digests(digests: &[AnalysisDigest]) -> String {
    digests
        .iter()
        .enumerate()
        .map(|(i, digest)| {
            let mut section = format!("[Analysis {}]\nSummary: {}", i + 1, digest.summary);
            if !digest.insights.is_empty() {
                section.push_str("\nInsights:");
                for insight in &digest.insights {
                    section.push_str("\n- ");
                    section.push_str(insight);
                }
            }
            section
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

//! Analysis plan, per-iteration findings, and the digest shown back to the
//! model on later steps.

use serde::{Deserialize, Serialize};

/// Output of the plan generator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisPlan {
    /// Ordered analysis sub-goals.
    #[serde(default)]
    pub analysis_plan: Vec<String>,
    /// Topic labels (sleep, stress, ...).
    #[serde(default)]
    pub focus_areas: Vec<String>,
    /// One sentence stating what the user wants to know.
    #[serde(default)]
    pub user_intent: String,
}

/// A single dated observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insight {
    #[serde(default)]
    pub comment: String,
}

impl Insight {
    pub fn new(comment: impl Into<String>) -> Self {
        Self {
            comment: comment.into(),
        }
    }
}

/// One iteration's distilled finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub summary: String,
    #[serde(default)]
    pub insights: Vec<Insight>,
    pub continuation_needed: bool,
    /// Free-text descriptions of further data to fetch. Always `None` when
    /// `continuation_needed` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_targets: Option<Vec<String>>,
}

impl AnalysisResult {
    /// Build a result, enforcing that targets only exist alongside a
    /// continuation request.
    pub fn new(
        summary: impl Into<String>,
        insights: Vec<Insight>,
        continuation_needed: bool,
        additional_targets: Option<Vec<String>>,
    ) -> Self {
        let additional_targets = if continuation_needed {
            additional_targets
                .map(|targets| {
                    targets
                        .into_iter()
                        .map(|t| t.trim().to_string())
                        .filter(|t| !t.is_empty())
                        .collect::<Vec<_>>()
                })
                .filter(|targets| !targets.is_empty())
        } else {
            None
        };

        Self {
            summary: summary.into(),
            insights,
            continuation_needed,
            additional_targets,
        }
    }

    pub fn targets(&self) -> &[String] {
        self.additional_targets.as_deref().unwrap_or(&[])
    }
}

/// Summary and truncated insights of one analysis result, as rendered into
/// prompts. Building a digest never mutates the history it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisDigest {
    pub summary: String,
    pub insights: Vec<String>,
}

impl AnalysisDigest {
    pub fn from_history(history: &[AnalysisResult], comment_limit: usize) -> Vec<Self> {
        history
            .iter()
            .map(|result| Self {
                summary: if result.summary.trim().is_empty() {
                    "No summary".to_string()
                } else {
                    result.summary.clone()
                },
                insights: result
                    .insights
                    .iter()
                    .filter(|insight| !insight.comment.trim().is_empty())
                    .map(|insight| truncate_comment(&insight.comment, comment_limit))
                    .collect(),
            })
            .collect()
    }
}

/// Cut `comment` to at most `limit` characters, marking the cut with `...`.
pub fn truncate_comment(comment: &str, limit: usize) -> String {
    if comment.chars().count() <= limit {
        return comment.to_string();
    }
    let keep = limit.saturating_sub(3);
    let mut truncated: String = comment.chars().take(keep).collect();
    truncated.push_str("...");
    truncated
}

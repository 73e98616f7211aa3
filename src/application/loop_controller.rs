//! Loop Controller: the run's state machine as pure functions.
//!
//! `PLANNING -> DISPATCHING -> EXECUTING -> ANALYZING -> (DISPATCHING | REPORTING) -> DONE`,
//! with `FAILED` reachable from any non-terminal phase.

use crate::domain::models::{AnalysisResult, RunPhase, Termination};

/// What to do after an analysis step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopDecision {
    /// Run another dispatch/execute/analyze iteration.
    Continue,
    /// The analyzer asked for nothing more.
    Conclude,
    /// The analyzer wanted more but the iteration cap is reached.
    LimitReached,
}

impl LoopDecision {
    pub fn termination(&self) -> Option<Termination> {
        match self {
            Self::Continue => None,
            Self::Conclude => Some(Termination::Concluded),
            Self::LimitReached => Some(Termination::IterationLimitReached),
        }
    }
}

/// Decide after an analysis step. `loop_count` is the number of completed
/// iterations, including the one just analysed.
pub fn decide(loop_count: u32, max_iterations: u32, latest: Option<&AnalysisResult>) -> LoopDecision {
    let wants_more = latest.is_some_and(|result| result.continuation_needed);
    if !wants_more {
        LoopDecision::Conclude
    } else if loop_count >= max_iterations {
        LoopDecision::LimitReached
    } else {
        LoopDecision::Continue
    }
}

/// Successor of `phase` on the happy path.
pub fn next_phase(
    phase: RunPhase,
    loop_count: u32,
    max_iterations: u32,
    latest: Option<&AnalysisResult>,
) -> RunPhase {
    match phase {
        RunPhase::Planning => RunPhase::Dispatching,
        RunPhase::Dispatching => RunPhase::Executing,
        RunPhase::Executing => RunPhase::Analyzing,
        RunPhase::Analyzing => match decide(loop_count, max_iterations, latest) {
            LoopDecision::Continue => RunPhase::Dispatching,
            LoopDecision::Conclude | LoopDecision::LimitReached => RunPhase::Reporting,
        },
        RunPhase::Reporting | RunPhase::Done => RunPhase::Done,
        RunPhase::Failed => RunPhase::Failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn result(continuation_needed: bool) -> AnalysisResult {
        AnalysisResult::new("s", vec![], continuation_needed, None)
    }

    #[test]
    fn test_linear_phases() {
        assert_eq!(next_phase(RunPhase::Planning, 0, 7, None), RunPhase::Dispatching);
        assert_eq!(next_phase(RunPhase::Dispatching, 0, 7, None), RunPhase::Executing);
        assert_eq!(next_phase(RunPhase::Executing, 0, 7, None), RunPhase::Analyzing);
        assert_eq!(next_phase(RunPhase::Reporting, 3, 7, None), RunPhase::Done);
        assert_eq!(next_phase(RunPhase::Failed, 3, 7, None), RunPhase::Failed);
    }

    #[test]
    fn test_cap_reached_with_continuation() {
        let latest = result(true);
        assert_eq!(decide(6, 7, Some(&latest)), LoopDecision::Continue);
        assert_eq!(decide(7, 7, Some(&latest)), LoopDecision::LimitReached);
        assert_eq!(
            decide(7, 7, Some(&latest)).termination(),
            Some(Termination::IterationLimitReached)
        );
    }

    #[test]
    fn test_missing_analysis_concludes() {
        assert_eq!(decide(1, 7, None), LoopDecision::Conclude);
    }

    proptest! {
        #[test]
        fn prop_no_continuation_never_dispatches(loop_count in 0u32..100, max in 1u32..50) {
            let latest = result(false);
            prop_assert_eq!(
                next_phase(RunPhase::Analyzing, loop_count, max, Some(&latest)),
                RunPhase::Reporting
            );
        }

        #[test]
        fn prop_at_or_over_cap_always_reports(max in 1u32..50, extra in 0u32..10, wants_more: bool) {
            let latest = result(wants_more);
            prop_assert_eq!(
                next_phase(RunPhase::Analyzing, max + extra, max, Some(&latest)),
                RunPhase::Reporting
            );
        }

        #[test]
        fn prop_below_cap_continuation_dispatches(
            (max, loop_count) in (2u32..50).prop_flat_map(|max| (Just(max), 1..max))
        ) {
            let latest = result(true);
            prop_assert_eq!(
                next_phase(RunPhase::Analyzing, loop_count, max, Some(&latest)),
                RunPhase::Dispatching
            );
        }
    }
}

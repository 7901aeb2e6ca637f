use std::time::Duration;

use bento_core::analysis::{AnalysisPolicy, AnalysisResult, Preparation, prepare};

use crate::narrative::{NarrativeError, NarrativeGenerator};

/// Run one daily analysis through the fallback chain.
///
/// parse → empty-check → score → one narrative call → envelope. The
/// narrative call is attempted at most once and bounded by `timeout`; any
/// failure, timeout or blank answer yields the templated backup text with
/// the score computed before the call.
pub async fn analyze_day(
    body: &[u8],
    policy: &AnalysisPolicy,
    narrator: &dyn NarrativeGenerator,
    timeout: Duration,
) -> AnalysisResult {
    let day = match prepare(body, policy) {
        Preparation::Finished {
            result,
            parse_error,
        } => {
            if let Some(reason) = parse_error {
                tracing::debug!(reason = %reason, "analyze-day body unreadable, serving backup text");
            }
            return result;
        }
        Preparation::Scored(day) => day,
    };

    let call = narrator.generate(&day.prompt.instructions, &day.prompt.user_context);
    let narrative = match tokio::time::timeout(timeout, call).await {
        Ok(Ok(text)) if text.trim().is_empty() => Err(NarrativeError::EmptyContent),
        Ok(result) => result,
        Err(_) => Err(NarrativeError::Timeout(timeout)),
    };

    match narrative {
        Ok(text) => day.complete(Some(&text)),
        Err(err) => {
            let result = day.complete(None);
            tracing::warn!(
                error = %err,
                outcome = result.outcome.as_str(),
                model = %narrator.model(),
                score = day.score(),
                goal = day.payload.context.goal_type.as_str(),
                meals = day.payload.meals.len(),
                "Narrative generation failed, serving backup text"
            );
            result
        }
    }
}

#[cfg(test)]
mod tests {
    use bento_core::analysis::AnalysisOutcome;

    use super::*;
    use crate::narrative::stubs::{FailingNarrative, FixedNarrative, SlowNarrative};

    const TIMEOUT: Duration = Duration::from_secs(5);
    const BOBA_AND_SALAD: &str = r#"{
        "context": {"goalType": "fat_loss"},
        "foodLogs": [{"description": "珍奶"}, {"description": "雞胸肉沙拉"}]
    }"#;

    async fn run(body: &str, narrator: &dyn NarrativeGenerator, timeout: Duration) -> AnalysisResult {
        analyze_day(body.as_bytes(), &AnalysisPolicy::default(), narrator, timeout).await
    }

    #[tokio::test]
    async fn narrative_success_is_not_backup() {
        let narrator = FixedNarrative("今天蛋白質很夠，繼續保持！".to_string());
        let result = run(BOBA_AND_SALAD, &narrator, TIMEOUT).await;

        assert!(result.success);
        assert!(!result.degraded);
        assert_eq!(result.score, 65);
        assert_eq!(result.outcome, AnalysisOutcome::ScoredWithAi);
        assert!(result.narrative_text.contains("今天蛋白質很夠，繼續保持！"));
        assert!(result.narrative_text.starts_with("【今日飲食分析｜65 分】"));
    }

    #[tokio::test]
    async fn narrative_failure_keeps_precomputed_score() {
        let result = run(BOBA_AND_SALAD, &FailingNarrative, TIMEOUT).await;

        assert!(result.success);
        assert!(result.degraded);
        assert_eq!(result.score, 65);
        assert_eq!(result.outcome, AnalysisOutcome::ScoredAiFailure);
        assert!(result.narrative_text.contains("65 分"));
    }

    #[tokio::test]
    async fn blank_narrative_is_treated_as_failure() {
        let narrator = FixedNarrative(" \n\t".to_string());
        let result = run(BOBA_AND_SALAD, &narrator, TIMEOUT).await;

        assert!(result.degraded);
        assert_eq!(result.outcome, AnalysisOutcome::ScoredAiFailure);
        assert!(!result.narrative_text.trim().is_empty());
    }

    #[tokio::test]
    async fn slow_narrative_times_out_into_backup() {
        let narrator = SlowNarrative(Duration::from_secs(30));
        let result = run(BOBA_AND_SALAD, &narrator, Duration::from_millis(20)).await;

        assert!(result.degraded);
        assert_eq!(result.score, 65);
        assert_eq!(result.outcome, AnalysisOutcome::ScoredAiFailure);
    }

    #[tokio::test]
    async fn empty_logs_never_call_the_narrator() {
        // A narrator that would hang proves the call is skipped.
        let narrator = SlowNarrative(Duration::from_secs(30));
        let result = run(r#"{"foodLogs": []}"#, &narrator, Duration::from_secs(60)).await;

        assert_eq!(result.score, 50);
        assert!(result.degraded);
        assert_eq!(result.outcome, AnalysisOutcome::EmptyLogs);
    }

    #[tokio::test]
    async fn unparsable_body_gets_parse_failure_backup() {
        let narrator = FixedNarrative("unused".to_string());
        let result = run("{{{{", &narrator, TIMEOUT).await;

        assert!(result.success);
        assert!(result.degraded);
        assert_eq!(result.score, 60);
        assert_eq!(result.outcome, AnalysisOutcome::ParseFailure);
    }

    #[tokio::test]
    async fn identical_input_gives_identical_results() {
        let narrator = FixedNarrative("固定的分析內容".to_string());
        let first = run(BOBA_AND_SALAD, &narrator, TIMEOUT).await;
        let second = run(BOBA_AND_SALAD, &narrator, TIMEOUT).await;
        assert_eq!(first, second);

        let first = run(BOBA_AND_SALAD, &FailingNarrative, TIMEOUT).await;
        let second = run(BOBA_AND_SALAD, &FailingNarrative, TIMEOUT).await;
        assert_eq!(first, second);
    }
}

//! Terminal outcomes of a daily analysis and the response envelope.
//!
//! Every constructor here yields `success = true` and non-empty text; the
//! envelope has no error shape.

use serde::Serialize;
use utoipa::ToSchema;

use crate::context::{Prompt, build_prompt};
use crate::error::PayloadError;
use crate::payload::{NormalizedPayload, parse_payload};
use crate::scoring::{NEUTRAL_SCORE, ScoreBreakdown, ScoringPolicy, score_meals};

/// Score reported when the request body could not be read at all.
pub const DEFAULT_PARSE_FAILURE_SCORE: u8 = 60;

/// Fixed action items attached to every degraded response.
pub const BACKUP_SUGGESTIONS: [&str; 3] = [
    "每天至少 1–2 餐有蛋白質：便利商店的茶葉蛋、無糖豆漿、雞胸肉沙拉都很方便。",
    "至少一餐看得到青菜：買便當時說「飯少一點，多一份青菜」。",
    "含糖飲料盡量壓在 0–1 杯，其餘改成無糖茶或白開水。",
];

/// Which terminal state produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisOutcome {
    ParseFailure,
    EmptyLogs,
    ScoredWithAi,
    ScoredAiFailure,
}

impl AnalysisOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ParseFailure => "parse_failure",
            Self::EmptyLogs => "empty_logs",
            Self::ScoredWithAi => "scored_with_ai",
            Self::ScoredAiFailure => "scored_ai_failure",
        }
    }

    pub fn is_degraded(self) -> bool {
        self != Self::ScoredWithAi
    }
}

/// Response body for `POST /analyze-day`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct AnalysisResult {
    /// Always true; failures are expressed through `isBackup`
    pub success: bool,
    /// Daily score in 0..=100
    pub score: u8,
    /// Narrative text, never empty
    #[serde(rename = "analysisText")]
    pub narrative_text: String,
    /// True when the text came from a fallback template rather than the narrative backend
    #[serde(rename = "isBackup")]
    pub degraded: bool,
    /// Short action items; empty when the narrative already contains them
    pub suggestions: Vec<String>,
    #[serde(skip)]
    pub outcome: AnalysisOutcome,
}

impl AnalysisResult {
    fn degraded(outcome: AnalysisOutcome, score: u8, narrative_text: String) -> Self {
        Self {
            success: true,
            score,
            narrative_text,
            degraded: true,
            suggestions: BACKUP_SUGGESTIONS.iter().map(|s| (*s).to_string()).collect(),
            outcome,
        }
    }

    /// Body was not a JSON object.
    pub fn parse_failure(score: u8) -> Self {
        let text = format!(
            "目前沒有成功收到你的詳細資料，先給你一個簡單的方向：\n\n\
             今天粗略評分約 {score} 分。\n\n\
             你可以先這樣做：\n{}",
            numbered(&BACKUP_SUGGESTIONS)
        );
        Self::degraded(AnalysisOutcome::ParseFailure, score, text)
    }

    /// Body parsed but no meal survived normalization.
    pub fn empty_logs(score: u8) -> Self {
        let text = format!(
            "今天還沒有任何飲食紀錄喔！\n\n\
             請至少記錄一餐（例如早餐吃了什麼、午餐的便當內容），就能幫你算出今天的分數並給出個人化建議。\n\n\
             在那之前，先給你目前的參考分數 {score} 分，以及幾個簡單的方向：\n{}",
            numbered(&BACKUP_SUGGESTIONS)
        );
        Self::degraded(AnalysisOutcome::EmptyLogs, score, text)
    }

    /// Meals were scored but the narrative backend failed, timed out, or returned nothing.
    pub fn narrative_unavailable(score: u8) -> Self {
        let text = format!(
            "目前暫時無法連線到 AI 分析服務，以下是備用的簡單建議：\n\n\
             今天粗略評分約 {score} 分。\n\n\
             你可以先這樣做：\n{}\n\n\
             之後 AI 恢復正常時，就會用你的紀錄做更細的分析。",
            numbered(&BACKUP_SUGGESTIONS)
        );
        Self::degraded(AnalysisOutcome::ScoredAiFailure, score, text)
    }

    /// Narrative backend produced text; `narrative` must be non-blank.
    pub fn with_narrative(score: u8, narrative: &str) -> Self {
        Self {
            success: true,
            score,
            narrative_text: format!("{}\n\n{}", result_header(score), narrative.trim()),
            degraded: false,
            suggestions: Vec::new(),
            outcome: AnalysisOutcome::ScoredWithAi,
        }
    }
}

/// Knobs shared by every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisPolicy {
    pub scoring: ScoringPolicy,
    pub parse_failure_score: u8,
}

impl Default for AnalysisPolicy {
    fn default() -> Self {
        Self {
            scoring: ScoringPolicy::default(),
            parse_failure_score: DEFAULT_PARSE_FAILURE_SCORE,
        }
    }
}

/// A day with at least one meal, scored and ready for the narrative backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredDay {
    pub payload: NormalizedPayload,
    pub breakdown: ScoreBreakdown,
    pub prompt: Prompt,
}

impl ScoredDay {
    pub fn score(&self) -> u8 {
        self.breakdown.score
    }

    /// Close out the analysis with whatever the narrative backend produced.
    /// Blank text counts as no text.
    pub fn complete(&self, narrative: Option<&str>) -> AnalysisResult {
        match narrative.filter(|text| !text.trim().is_empty()) {
            Some(text) => AnalysisResult::with_narrative(self.score(), text),
            None => AnalysisResult::narrative_unavailable(self.score()),
        }
    }
}

/// Deterministic half of the pipeline: parse, empty-check, score, prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum Preparation {
    /// Reached a terminal state without needing the narrative backend.
    Finished {
        result: AnalysisResult,
        parse_error: Option<String>,
    },
    Scored(Box<ScoredDay>),
}

pub fn prepare(body: &[u8], policy: &AnalysisPolicy) -> Preparation {
    match parse_payload(body) {
        Ok(payload) => prepare_payload(payload, policy),
        Err(err) => parse_failure(&err, policy),
    }
}

pub fn prepare_payload(payload: NormalizedPayload, policy: &AnalysisPolicy) -> Preparation {
    if payload.meals.is_empty() {
        return Preparation::Finished {
            result: AnalysisResult::empty_logs(NEUTRAL_SCORE),
            parse_error: None,
        };
    }

    let breakdown = score_meals(payload.context.goal_type, &payload.meals, &policy.scoring);
    let prompt = build_prompt(&payload, &breakdown);
    Preparation::Scored(Box::new(ScoredDay {
        payload,
        breakdown,
        prompt,
    }))
}

fn parse_failure(err: &PayloadError, policy: &AnalysisPolicy) -> Preparation {
    Preparation::Finished {
        result: AnalysisResult::parse_failure(policy.parse_failure_score),
        parse_error: Some(err.to_string()),
    }
}

pub fn result_header(score: u8) -> String {
    format!("【今日飲食分析｜{score} 分】")
}

fn numbered(items: &[&str]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| format!("{}. {item}", index + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

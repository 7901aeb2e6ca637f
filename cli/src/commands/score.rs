use std::path::{Path, PathBuf};

use bento_core::analysis::{AnalysisPolicy, DEFAULT_PARSE_FAILURE_SCORE, Preparation, prepare};
use bento_core::scoring::{KeywordTable, ScoreBand, ScoringMode, ScoringPolicy};
use clap::Args;
use serde_json::{Value, json};

use crate::util::{exit_error, print_json, read_payload};

/// Offline scoring. Never talks to the API or the narrative backend.
#[derive(Args, Clone)]
pub struct ScoreArgs {
    /// Payload file (reads stdin when omitted)
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Scoring mode: keyword or meal_count
    #[arg(long, env = "BENTO_SCORING_MODE", default_value = "keyword")]
    pub scoring_mode: ScoringMode,

    /// Score band as "min-max" (defaults to the mode's band)
    #[arg(long, env = "BENTO_SCORE_BAND")]
    pub band: Option<ScoreBand>,

    /// JSON keyword table replacing the built-in term lists
    #[arg(long, env = "BENTO_KEYWORD_TABLE")]
    pub keyword_table: Option<PathBuf>,

    /// Score reported when the payload cannot be parsed
    #[arg(long, env = "BENTO_PARSE_FAILURE_SCORE", default_value_t = DEFAULT_PARSE_FAILURE_SCORE)]
    pub parse_failure_score: u8,

    /// Include the assembled narrative prompt in the output
    #[arg(long)]
    pub show_prompt: bool,
}

pub fn run(args: ScoreArgs) -> i32 {
    let policy = build_policy(&args);
    let body = read_payload(args.file.as_deref());
    print_json(&report(&body, &policy, args.show_prompt));
    0
}

fn build_policy(args: &ScoreArgs) -> AnalysisPolicy {
    let table = match args.keyword_table.as_deref() {
        Some(path) => load_table(path),
        None => KeywordTable::builtin(),
    };
    AnalysisPolicy {
        scoring: ScoringPolicy {
            mode: args.scoring_mode,
            band: args
                .band
                .unwrap_or_else(|| ScoringPolicy::default_band(args.scoring_mode)),
            table,
            ..ScoringPolicy::default()
        },
        parse_failure_score: args.parse_failure_score.min(100),
    }
}

fn load_table(path: &Path) -> KeywordTable {
    KeywordTable::load(path).unwrap_or_else(|e| {
        exit_error(
            &e.to_string(),
            Some("The table is a JSON object with non-empty protein, vegetable and sugary_drink arrays."),
        )
    })
}

fn report(body: &[u8], policy: &AnalysisPolicy, show_prompt: bool) -> Value {
    match prepare(body, policy) {
        Preparation::Finished {
            result,
            parse_error,
        } => {
            let mut out = json!({
                "outcome": result.outcome.as_str(),
                "score": result.score,
                "result": result,
            });
            if let Some(error) = parse_error {
                out["parse_error"] = json!(error);
            }
            out
        }
        Preparation::Scored(day) => {
            let mut out = json!({
                "outcome": "scored",
                "score": day.score(),
                "goal": day.payload.context.goal_type.as_str(),
                "today_date": day.payload.context.today_date,
                "breakdown": day.breakdown,
                "fallback": day.complete(None),
            });
            if show_prompt {
                out["prompt"] = json!(day.prompt);
            }
            out
        }
    }
}

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use bento_core::analysis::{AnalysisPolicy, DEFAULT_PARSE_FAILURE_SCORE};
use bento_core::scoring::{KeywordTable, ScoreBand, ScoringMode, ScoringPolicy};

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_NARRATIVE_TIMEOUT_SECS: u64 = 20;

/// Startup configuration. Every value has a default and invalid values are
/// logged and replaced, so the service always starts. Narrative credentials
/// are deliberately absent: they are read per call.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub port: u16,
    pub policy: AnalysisPolicy,
    pub narrative_timeout: Duration,
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let port = numeric_setting(&lookup, "PORT", |_: &u16| true, DEFAULT_PORT);

        let narrative_timeout = Duration::from_secs(numeric_setting(
            &lookup,
            "BENTO_NARRATIVE_TIMEOUT_SECS",
            |secs: &u64| *secs > 0,
            DEFAULT_NARRATIVE_TIMEOUT_SECS,
        ));

        let parse_failure_score = numeric_setting(
            &lookup,
            "BENTO_PARSE_FAILURE_SCORE",
            |score: &u8| *score <= 100,
            DEFAULT_PARSE_FAILURE_SCORE,
        );

        Self {
            port,
            policy: AnalysisPolicy {
                scoring: scoring_policy(&lookup),
                parse_failure_score,
            },
            narrative_timeout,
        }
    }
}

/// Read a numeric setting; unset or blank means the default, anything
/// unusable is logged and replaced by the default.
fn numeric_setting<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    in_range: impl Fn(&T) -> bool,
    default: T,
) -> T {
    let Some(raw) = lookup(key).filter(|v| !v.trim().is_empty()) else {
        return default;
    };
    match check_numeric(&raw, in_range) {
        Ok(value) => value,
        Err(reason) => {
            tracing::warn!(setting = key, value = %raw, reason, "Ignoring invalid setting");
            default
        }
    }
}

fn check_numeric<T: FromStr>(raw: &str, in_range: impl Fn(&T) -> bool) -> Result<T, &'static str> {
    let value = raw.trim().parse::<T>().map_err(|_| "not a number")?;
    if in_range(&value) {
        Ok(value)
    } else {
        Err("out of range")
    }
}

fn scoring_policy(lookup: &impl Fn(&str) -> Option<String>) -> ScoringPolicy {
    let mode = match lookup("BENTO_SCORING_MODE") {
        Some(raw) => raw.parse::<ScoringMode>().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "Ignoring BENTO_SCORING_MODE");
            ScoringMode::default()
        }),
        None => ScoringMode::default(),
    };

    let band = match lookup("BENTO_SCORE_BAND") {
        Some(raw) => raw.parse::<ScoreBand>().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "Ignoring BENTO_SCORE_BAND");
            ScoringPolicy::default_band(mode)
        }),
        None => ScoringPolicy::default_band(mode),
    };

    let table = match lookup("BENTO_KEYWORD_TABLE").filter(|p| !p.trim().is_empty()) {
        Some(path) => KeywordTable::load(Path::new(path.trim())).unwrap_or_else(|err| {
            tracing::warn!(error = %err, "Falling back to built-in keyword table");
            KeywordTable::builtin()
        }),
        None => KeywordTable::builtin(),
    };

    ScoringPolicy {
        mode,
        band,
        table,
        ..ScoringPolicy::default()
    }
}

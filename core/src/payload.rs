//! Payload normalization.
//!
//! Mobile clients send whatever shape their version happens to produce:
//! camelCase or snake_case keys, meal lists under different names, numbers
//! as strings. Everything is folded into one typed record set here, with
//! explicit defaults, so nothing downstream touches raw JSON.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::PayloadError;

/// Placeholder used when neither the context nor any meal carries a date.
pub const UNSPECIFIED_DATE: &str = "unspecified";
/// Timezone used when the client does not declare one.
pub const DEFAULT_TIMEZONE: &str = "local";

const MEAL_LIST_KEYS: &[&str] = &["foodLogs", "food_logs", "meals", "mealEntries", "records"];

/// Stated goal for the day. Unknown or missing goals fold to `Maintenance`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GoalType {
    MuscleGain,
    FatLoss,
    #[default]
    Maintenance,
}

impl GoalType {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "muscle_gain" => Self::MuscleGain,
            "fat_loss" => Self::FatLoss,
            _ => Self::Maintenance,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::MuscleGain => "muscle_gain",
            Self::FatLoss => "fat_loss",
            Self::Maintenance => "maintenance",
        }
    }

    /// Label shown to the narrative backend and in fallback text.
    pub fn label(self) -> &'static str {
        match self {
            Self::MuscleGain => "增肌",
            Self::FatLoss => "瘦身",
            Self::Maintenance => "維持體態",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisContext {
    pub goal_type: GoalType,
    /// Raw goal string as submitted, kept for the prompt's "original code" line.
    pub raw_goal: Option<String>,
    pub today_date: String,
    pub timezone: String,
    pub request_type: Option<String>,
}

/// Self-reported profile. Every field is optional; absence only removes
/// the corresponding line from rendered summaries.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserProfile {
    pub age: Option<f64>,
    pub gender: Option<String>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub body_fat_percent: Option<f64>,
    pub target_weight_kg: Option<f64>,
    pub activity_level: Option<String>,
    pub dietary_notes: Option<String>,
    pub country: Option<String>,
    pub lifestyle: Option<String>,
}

impl UserProfile {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MealEntry {
    pub date: Option<String>,
    pub time: Option<String>,
    pub meal_type: String,
    pub description: String,
}

/// Canonical record set produced from one request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedPayload {
    pub context: AnalysisContext,
    pub profile: Option<UserProfile>,
    /// Submission order is kept; it is the client's chronological intent.
    pub meals: Vec<MealEntry>,
}

/// Parse raw request bytes and normalize them.
///
/// Only fails when the bytes are not a JSON object; every other defect is
/// repaired or dropped.
pub fn parse_payload(body: &[u8]) -> Result<NormalizedPayload, PayloadError> {
    let value: Value = serde_json::from_slice(body)?;
    match value {
        Value::Object(map) => Ok(normalize(&map)),
        other => Err(PayloadError::NotAnObject {
            found: json_kind(&other),
        }),
    }
}

pub fn normalize(doc: &Map<String, Value>) -> NormalizedPayload {
    let empty = Map::new();
    let context = doc
        .get("context")
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    let meals = normalize_meals(doc);

    let raw_goal = text_field(context, &["goalType", "goal_type"])
        .or_else(|| text_field(doc, &["goalType", "goal"]));
    let goal_type = raw_goal
        .as_deref()
        .map(GoalType::parse)
        .unwrap_or_default();

    let today_date = text_field(context, &["todayDate", "today_date"])
        .or_else(|| text_field(doc, &["date"]))
        .or_else(|| meals.first().and_then(|meal| meal.date.clone()))
        .unwrap_or_else(|| UNSPECIFIED_DATE.to_string());

    let timezone =
        text_field(context, &["timezone"]).unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());

    let request_type = text_field(doc, &["requestType", "request_type"]);

    let profile = ["userProfile", "user_profile"]
        .iter()
        .find_map(|key| doc.get(*key).and_then(Value::as_object))
        .map(normalize_profile);

    NormalizedPayload {
        context: AnalysisContext {
            goal_type,
            raw_goal,
            today_date,
            timezone,
            request_type,
        },
        profile,
        meals,
    }
}

fn normalize_meals(doc: &Map<String, Value>) -> Vec<MealEntry> {
    let Some(items) = MEAL_LIST_KEYS
        .iter()
        .find_map(|key| doc.get(*key).and_then(Value::as_array))
    else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|entry| {
            let description = text_field(entry, &["description"])?;
            Some(MealEntry {
                date: text_field(entry, &["date"]),
                time: text_field(entry, &["time"]),
                meal_type: text_field(entry, &["mealType", "meal_type"]).unwrap_or_default(),
                description,
            })
        })
        .collect()
}

fn normalize_profile(raw: &Map<String, Value>) -> UserProfile {
    UserProfile {
        age: number_field(raw, &["age"]),
        gender: text_field(raw, &["gender"]),
        height_cm: number_field(raw, &["heightCm", "height_cm"]),
        weight_kg: number_field(raw, &["weightKg", "weight_kg"]),
        body_fat_percent: number_field(raw, &["bodyFatPercent", "body_fat", "bodyFat"]),
        target_weight_kg: number_field(raw, &["targetWeightKg", "target_weight_kg"]),
        activity_level: text_field(raw, &["activityLevel", "activity_level"]),
        dietary_notes: text_field(raw, &["dietaryNotes", "special_diet", "specialDiet"]),
        country: text_field(raw, &["country", "location"]),
        lifestyle: text_field(raw, &["lifestyle"]),
    }
}

/// First non-blank string under any of `keys`, trimmed.
fn text_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        obj.get(*key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    })
}

/// First finite number under any of `keys`; numeric strings are accepted.
fn number_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| {
        let parsed = match obj.get(*key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        parsed.filter(|n| n.is_finite())
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

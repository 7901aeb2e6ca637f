//! Deterministic heuristic scoring.
//!
//! The score is deliberately shallow: every point can be traced to a
//! keyword match (or, in the meal-count policy, to the number of meals) so
//! generated narrative can cite it without contradicting itself.

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PolicyError;
use crate::payload::{GoalType, MealEntry};

/// Score returned for a day with nothing logged.
pub const NEUTRAL_SCORE: u8 = 50;

const BUILTIN_PROTEIN_TERMS: &[&str] = &[
    "雞胸", "雞肉", "雞腿", "茶葉蛋", "蛋", "豆漿", "豆腐", "豆干", "魚", "鮭魚", "鯖魚", "牛肉",
    "豬肉", "蝦", "優格", "牛奶", "毛豆", "chicken", "egg", "tofu", "fish", "salmon", "tuna",
    "beef", "pork", "shrimp", "yogurt", "milk", "protein", "soy",
];

const BUILTIN_VEGETABLE_TERMS: &[&str] = &[
    "青菜", "蔬菜", "沙拉", "燙青菜", "花椰菜", "高麗菜", "菠菜", "地瓜葉", "空心菜", "番茄",
    "小黃瓜", "菇", "salad", "vegetable", "veggie", "greens", "broccoli", "spinach", "cabbage",
    "tomato", "kale",
];

const BUILTIN_SUGARY_DRINK_TERMS: &[&str] = &[
    "珍奶", "珍珠奶茶", "奶茶", "手搖", "含糖", "全糖", "半糖", "汽水", "可樂", "果汁", "多多",
    "bubble tea", "boba", "milk tea", "soda", "cola", "juice", "sweet tea", "frappuccino",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FoodCategory {
    Protein,
    Vegetable,
    SugaryDrink,
}

impl FoodCategory {
    pub const ALL: [FoodCategory; 3] = [Self::Protein, Self::Vegetable, Self::SugaryDrink];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Protein => "protein",
            Self::Vegetable => "vegetable",
            Self::SugaryDrink => "sugary_drink",
        }
    }
}

/// On-disk shape of a keyword table.
#[derive(Debug, Deserialize)]
struct KeywordTableFile {
    #[serde(default)]
    protein: Vec<String>,
    #[serde(default)]
    vegetable: Vec<String>,
    #[serde(default)]
    sugary_drink: Vec<String>,
}

/// Term → category classification. Terms are stored lower-cased and
/// matched as case-insensitive substrings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordTable {
    terms: Vec<(String, FoodCategory)>,
}

impl Default for KeywordTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl KeywordTable {
    pub fn builtin() -> Self {
        let mut table = Self { terms: Vec::new() };
        table.extend(FoodCategory::Protein, BUILTIN_PROTEIN_TERMS.iter().copied());
        table.extend(FoodCategory::Vegetable, BUILTIN_VEGETABLE_TERMS.iter().copied());
        table.extend(
            FoodCategory::SugaryDrink,
            BUILTIN_SUGARY_DRINK_TERMS.iter().copied(),
        );
        table
    }

    /// Build a table from `{"protein": [...], "vegetable": [...], "sugary_drink": [...]}`.
    pub fn from_json(raw: &str, origin: &str) -> Result<Self, PolicyError> {
        let file: KeywordTableFile =
            serde_json::from_str(raw).map_err(|source| PolicyError::TableFormat {
                path: origin.to_string(),
                source,
            })?;

        let mut table = Self { terms: Vec::new() };
        table.extend(FoodCategory::Protein, file.protein.iter().map(String::as_str));
        table.extend(FoodCategory::Vegetable, file.vegetable.iter().map(String::as_str));
        table.extend(
            FoodCategory::SugaryDrink,
            file.sugary_drink.iter().map(String::as_str),
        );

        for category in FoodCategory::ALL {
            if table.terms_for(category).next().is_none() {
                return Err(PolicyError::EmptyCategory(category.as_str()));
            }
        }
        Ok(table)
    }

    pub fn load(path: &Path) -> Result<Self, PolicyError> {
        let origin = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|source| PolicyError::TableIo {
            path: origin.clone(),
            source,
        })?;
        Self::from_json(&raw, &origin)
    }

    fn extend<'a>(&mut self, category: FoodCategory, terms: impl Iterator<Item = &'a str>) {
        for term in terms {
            let normalized = term.trim().to_lowercase();
            if normalized.is_empty() {
                continue;
            }
            if !self
                .terms
                .iter()
                .any(|(existing, cat)| *cat == category && *existing == normalized)
            {
                self.terms.push((normalized, category));
            }
        }
    }

    pub fn terms_for(&self, category: FoodCategory) -> impl Iterator<Item = &str> {
        self.terms
            .iter()
            .filter(move |(_, cat)| *cat == category)
            .map(|(term, _)| term.as_str())
    }

    /// Which categories occur anywhere in `buffer` (expected lower-cased).
    pub fn classify(&self, buffer: &str) -> CategoryMatches {
        let mut matches = CategoryMatches::default();
        for (term, category) in &self.terms {
            if !buffer.contains(term.as_str()) {
                continue;
            }
            match category {
                FoodCategory::Protein => matches.protein = true,
                FoodCategory::Vegetable => matches.vegetable = true,
                FoodCategory::SugaryDrink => matches.sugary_drink = true,
            }
        }
        matches
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategoryMatches {
    pub protein: bool,
    pub vegetable: bool,
    pub sugary_drink: bool,
}

impl CategoryMatches {
    pub fn matched(&self) -> Vec<FoodCategory> {
        FoodCategory::ALL
            .into_iter()
            .filter(|category| match category {
                FoodCategory::Protein => self.protein,
                FoodCategory::Vegetable => self.vegetable,
                FoodCategory::SugaryDrink => self.sugary_drink,
            })
            .collect()
    }
}

/// Inclusive clamp range applied to the final score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScoreBand {
    pub min: u8,
    pub max: u8,
}

impl ScoreBand {
    pub const FULL: ScoreBand = ScoreBand { min: 0, max: 100 };
    pub const MEAL_COUNT: ScoreBand = ScoreBand { min: 30, max: 95 };

    pub fn new(min: u8, max: u8) -> Result<Self, PolicyError> {
        if min > max || max > 100 {
            return Err(PolicyError::InvalidBand {
                raw: format!("{min}-{max}"),
                reason: "expected 0 <= min <= max <= 100".to_string(),
            });
        }
        Ok(Self { min, max })
    }

    pub fn clamp(self, raw: i32) -> u8 {
        // Fields are public, so re-establish min <= max <= 100 before clamping.
        let max = i32::from(self.max.min(100));
        let min = i32::from(self.min).min(max);
        raw.clamp(min, max) as u8
    }
}

impl FromStr for ScoreBand {
    type Err = PolicyError;

    /// Parses `"min-max"`, e.g. `"40-95"`.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| PolicyError::InvalidBand {
            raw: raw.to_string(),
            reason: reason.to_string(),
        };
        let (min, max) = raw
            .trim()
            .split_once('-')
            .ok_or_else(|| invalid("expected the form min-max"))?;
        let min = min
            .trim()
            .parse::<u8>()
            .map_err(|_| invalid("min is not an integer in 0..=255"))?;
        let max = max
            .trim()
            .parse::<u8>()
            .map_err(|_| invalid("max is not an integer in 0..=255"))?;
        Self::new(min, max).map_err(|_| invalid("expected 0 <= min <= max <= 100"))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMode {
    /// Keyword-driven score (canonical).
    #[default]
    Keyword,
    /// Score driven by the number of logged meals only.
    MealCount,
}

impl FromStr for ScoringMode {
    type Err = PolicyError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_lowercase().as_str() {
            "keyword" | "keywords" => Ok(Self::Keyword),
            "meal_count" | "meal-count" | "mealcount" => Ok(Self::MealCount),
            other => Err(PolicyError::UnknownMode(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScoreWeights {
    pub base: i32,
    pub protein_bonus: i32,
    pub vegetable_bonus: i32,
    pub sugary_penalty: i32,
    pub muscle_gain_protein_bonus: i32,
    pub fat_loss_sugary_penalty: i32,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            base: 60,
            protein_bonus: 10,
            vegetable_bonus: 10,
            sugary_penalty: 10,
            muscle_gain_protein_bonus: 5,
            fat_loss_sugary_penalty: 5,
        }
    }
}

/// Everything that shapes a score, in one place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoringPolicy {
    pub mode: ScoringMode,
    pub band: ScoreBand,
    pub table: KeywordTable,
    pub weights: ScoreWeights,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            mode: ScoringMode::Keyword,
            band: ScoreBand::FULL,
            table: KeywordTable::builtin(),
            weights: ScoreWeights::default(),
        }
    }
}

impl ScoringPolicy {
    /// The meal-count policy with its customary [30, 95] band.
    pub fn meal_count() -> Self {
        Self {
            mode: ScoringMode::MealCount,
            band: ScoreBand::MEAL_COUNT,
            ..Self::default()
        }
    }

    pub fn default_band(mode: ScoringMode) -> ScoreBand {
        match mode {
            ScoringMode::Keyword => ScoreBand::FULL,
            ScoringMode::MealCount => ScoreBand::MEAL_COUNT,
        }
    }
}

/// Score plus the evidence behind it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreBreakdown {
    pub score: u8,
    pub mode: ScoringMode,
    pub meal_count: usize,
    pub matches: CategoryMatches,
    /// Goal-specific adjustment that was applied (0 when none).
    pub goal_adjustment: i32,
}

/// Score a day's meals under `policy`. Pure and deterministic.
pub fn score_meals(goal: GoalType, meals: &[MealEntry], policy: &ScoringPolicy) -> ScoreBreakdown {
    let buffer = meals
        .iter()
        .map(|meal| meal.description.to_lowercase())
        .collect::<Vec<_>>()
        .join("\n");
    let matches = policy.table.classify(&buffer);

    if meals.is_empty() {
        return ScoreBreakdown {
            score: NEUTRAL_SCORE,
            mode: policy.mode,
            meal_count: 0,
            matches,
            goal_adjustment: 0,
        };
    }

    let (raw, goal_adjustment) = match policy.mode {
        ScoringMode::Keyword => keyword_score(goal, matches, &policy.weights),
        ScoringMode::MealCount => meal_count_score(goal, meals.len()),
    };

    ScoreBreakdown {
        score: policy.band.clamp(raw),
        mode: policy.mode,
        meal_count: meals.len(),
        matches,
        goal_adjustment,
    }
}

fn keyword_score(goal: GoalType, matches: CategoryMatches, weights: &ScoreWeights) -> (i32, i32) {
    let mut raw = weights.base;
    if matches.protein {
        raw += weights.protein_bonus;
    }
    if matches.vegetable {
        raw += weights.vegetable_bonus;
    }
    if matches.sugary_drink {
        raw -= weights.sugary_penalty;
    }

    let goal_adjustment = match goal {
        GoalType::MuscleGain if matches.protein => weights.muscle_gain_protein_bonus,
        GoalType::FatLoss if matches.sugary_drink => -weights.fat_loss_sugary_penalty,
        _ => 0,
    };
    (raw + goal_adjustment, goal_adjustment)
}

fn meal_count_score(goal: GoalType, meal_count: usize) -> (i32, i32) {
    // min(4) keeps the cast trivially in range.
    let counted = meal_count.min(4) as i32;
    let raw = 50 + counted * 10;
    let goal_adjustment = if goal == GoalType::FatLoss && meal_count >= 5 {
        -10
    } else {
        0
    };
    (raw + goal_adjustment, goal_adjustment)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meals(descriptions: &[&str]) -> Vec<MealEntry> {
        descriptions
            .iter()
            .map(|description| MealEntry {
                date: None,
                time: None,
                meal_type: String::new(),
                description: (*description).to_string(),
            })
            .collect()
    }

    #[test]
    fn empty_day_is_neutral() {
        let breakdown = score_meals(GoalType::FatLoss, &[], &ScoringPolicy::default());
        assert_eq!(breakdown.score, NEUTRAL_SCORE);
        assert_eq!(breakdown.meal_count, 0);
    }

    #[test]
    fn fat_loss_with_boba_and_chicken_salad_scores_65() {
        let breakdown = score_meals(
            GoalType::FatLoss,
            &meals(&["珍奶", "雞胸肉沙拉"]),
            &ScoringPolicy::default(),
        );
        assert!(breakdown.matches.protein);
        assert!(breakdown.matches.vegetable);
        assert!(breakdown.matches.sugary_drink);
        assert_eq!(breakdown.goal_adjustment, -5);
        assert_eq!(breakdown.score, 65);
    }

    #[test]
    fn muscle_gain_protein_bonus_applies_only_with_protein() {
        let policy = ScoringPolicy::default();
        let with_protein = score_meals(GoalType::MuscleGain, &meals(&["Grilled Chicken"]), &policy);
        assert_eq!(with_protein.score, 75);

        let without = score_meals(GoalType::MuscleGain, &meals(&["白飯"]), &policy);
        assert_eq!(without.score, 60);
        assert_eq!(without.goal_adjustment, 0);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let breakdown = score_meals(
            GoalType::Maintenance,
            &meals(&["SALAD with BOBA"]),
            &ScoringPolicy::default(),
        );
        assert!(breakdown.matches.vegetable);
        assert!(breakdown.matches.sugary_drink);
        assert_eq!(breakdown.score, 60);
    }

    #[test]
    fn unsweetened_drinks_are_not_sugary() {
        let breakdown = score_meals(
            GoalType::FatLoss,
            &meals(&["無糖綠茶", "無糖豆漿"]),
            &ScoringPolicy::default(),
        );
        assert!(!breakdown.matches.sugary_drink);
        assert_eq!(breakdown.score, 70);
    }

    #[test]
    fn score_stays_within_band_for_every_goal_and_mix() {
        let samples: &[&[&str]] = &[
            &["珍奶", "可樂", "汽水"],
            &["雞胸", "沙拉", "蛋", "青菜"],
            &["白飯"],
            &["珍奶", "雞胸肉沙拉", "豆漿", "果汁"],
        ];
        let policies = [
            ScoringPolicy::default(),
            ScoringPolicy::meal_count(),
            ScoringPolicy {
                band: ScoreBand::new(40, 95).expect("band is valid"),
                ..ScoringPolicy::default()
            },
        ];
        for policy in &policies {
            for goal in [GoalType::MuscleGain, GoalType::FatLoss, GoalType::Maintenance] {
                for sample in samples {
                    let score = score_meals(goal, &meals(sample), policy).score;
                    assert!(score >= policy.band.min && score <= policy.band.max);
                    assert!(score <= 100);
                }
            }
        }
    }

    #[test]
    fn heavy_weights_are_clamped() {
        let policy = ScoringPolicy {
            weights: ScoreWeights {
                sugary_penalty: 200,
                ..ScoreWeights::default()
            },
            ..ScoringPolicy::default()
        };
        let breakdown = score_meals(GoalType::FatLoss, &meals(&["可樂"]), &policy);
        assert_eq!(breakdown.score, 0);
    }

    #[test]
    fn meal_count_policy_counts_meals_not_keywords() {
        let policy = ScoringPolicy::meal_count();
        assert_eq!(score_meals(GoalType::Maintenance, &meals(&["珍奶"]), &policy).score, 60);
        assert_eq!(
            score_meals(GoalType::Maintenance, &meals(&["a", "b", "c", "d", "e", "f"]), &policy).score,
            90
        );
        assert_eq!(
            score_meals(GoalType::FatLoss, &meals(&["a", "b", "c", "d", "e"]), &policy).score,
            80
        );
    }

    #[test]
    fn score_band_parses_and_validates() {
        assert_eq!("40-95".parse::<ScoreBand>().ok(), Some(ScoreBand { min: 40, max: 95 }));
        assert_eq!(" 0 - 100 ".parse::<ScoreBand>().ok(), Some(ScoreBand::FULL));
        assert!("95-40".parse::<ScoreBand>().is_err());
        assert!("0-101".parse::<ScoreBand>().is_err());
        assert!("wide".parse::<ScoreBand>().is_err());
    }

    #[test]
    fn scoring_mode_parses_aliases() {
        assert_eq!("meal-count".parse::<ScoringMode>().ok(), Some(ScoringMode::MealCount));
        assert_eq!("Keyword".parse::<ScoringMode>().ok(), Some(ScoringMode::Keyword));
        assert!("random".parse::<ScoringMode>().is_err());
    }

    #[test]
    fn keyword_table_from_json_replaces_builtin_terms() {
        let table = KeywordTable::from_json(
            r#"{"protein": ["Tempeh"], "vegetable": ["okra"], "sugary_drink": ["lemonade"]}"#,
            "inline",
        )
        .expect("table should load");
        let matches = table.classify("tempeh with okra");
        assert!(matches.protein && matches.vegetable && !matches.sugary_drink);
        assert!(!table.classify("雞胸").protein);
    }

    #[test]
    fn keyword_table_rejects_empty_category() {
        let err = KeywordTable::from_json(r#"{"protein": ["egg"], "vegetable": ["kale"]}"#, "inline")
            .expect_err("missing category should fail");
        assert!(matches!(err, PolicyError::EmptyCategory("sugary_drink")));
    }
}

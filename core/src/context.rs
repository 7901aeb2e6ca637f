//! Human-readable rendering of a normalized payload, and the two prompt
//! strings sent to the narrative backend.
//!
//! Nothing here influences the score; the locale hint only changes the
//! wording of the instructions.

use serde::Serialize;

use crate::payload::{GoalType, MealEntry, NormalizedPayload, UNSPECIFIED_DATE, UserProfile};
use crate::scoring::ScoreBreakdown;

pub const NO_PROFILE_LINE: &str = "（未填個人資料）";
pub const NO_MEALS_LINE: &str = "（今天沒有提供任何具體的餐點紀錄）";
const NOT_PROVIDED: &str = "（未提供）";

/// Culture hint selected from the profile's declared region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LocaleHint {
    pub region: &'static str,
    pub hint: &'static str,
}

struct Region {
    /// Matched as case-insensitive substrings.
    names: &'static [&'static str],
    /// Matched when the whole field is the code in any case, or when the
    /// code appears as an upper-case token ("US" in "Austin, US", but not
    /// "us" in "lives with us").
    codes: &'static [&'static str],
    locale: LocaleHint,
}

// Priority order: first match wins.
const REGIONS: &[Region] = &[
    Region {
        names: &["taiwan", "台灣", "臺灣", "taipei", "台北", "臺北", "高雄", "台中", "臺中"],
        codes: &["tw", "twn", "roc"],
        locale: LocaleHint {
            region: "台灣",
            hint: "使用者在台灣：優先推薦便利商店（7-11、全家、萊爾富、OK）、便當店、自助餐、學校福利社與手搖飲店買得到的選項，例如茶葉蛋、無糖豆漿、地瓜、雞胸肉、燙青菜。",
        },
    },
    Region {
        names: &["hong kong", "hongkong", "香港"],
        codes: &["hk", "hkg"],
        locale: LocaleHint {
            region: "香港",
            hint: "使用者在香港：可以推薦茶餐廳（走汁、少飯、加菜）、7-Eleven、OK便利店、街市與兩餸飯的選擇方式。",
        },
    },
    Region {
        names: &["japan", "日本", "tokyo", "東京", "osaka", "大阪"],
        codes: &["jp", "jpn"],
        locale: LocaleHint {
            region: "日本",
            hint: "使用者在日本：可以推薦便利商店（7-Eleven、Lawson、FamilyMart）的沙拉雞胸、溫泉蛋、味噌湯，以及定食屋的均衡套餐。",
        },
    },
    Region {
        names: &["korea", "韓國", "南韓", "seoul", "首爾"],
        codes: &["kr", "kor"],
        locale: LocaleHint {
            region: "韓國",
            hint: "使用者在韓國：可以推薦 CU、GS25 等便利商店的雞胸肉與水煮蛋，以及韓式定食裡的小菜與湯品。",
        },
    },
    Region {
        names: &["singapore", "新加坡"],
        codes: &["sg", "sgp"],
        locale: LocaleHint {
            region: "新加坡",
            hint: "使用者在新加坡：可以推薦小販中心的經濟飯（多選青菜、少肉汁）、海南雞飯去皮、以及 kopi/teh 選 kosong 無糖版本。",
        },
    },
    Region {
        names: &["malaysia", "馬來西亞", "kuala lumpur", "吉隆坡"],
        codes: &["my", "mys"],
        locale: LocaleHint {
            region: "馬來西亞",
            hint: "使用者在馬來西亞：可以推薦經濟飯、mamak 檔的選擇方式（少油少糖、teh o kosong），以及便利商店的即食選項。",
        },
    },
    Region {
        names: &["united states", "美國", "new york", "紐約", "california", "加州"],
        codes: &["us", "usa"],
        locale: LocaleHint {
            region: "美國",
            hint: "使用者在美國：可以推薦超市熟食區、沙拉吧、希臘優格、烤雞，以及快餐店裡比較均衡的點法，份量要提醒可能偏大。",
        },
    },
];

const CITY_LIFE: LocaleHint = LocaleHint {
    region: "都市生活",
    hint: "使用者過著一般的都市生活：優先推薦便利商店、外食餐廳與外送平台上容易買到、價格合理的選項。",
};

const BASE_INSTRUCTIONS: &str = "你是一位親切的營養教練，熟悉外食族與學生的日常飲食。\n\
請用繁體中文回答，口氣友善、實際可行，像學長姐在聊天，不要說教。\n\
\n\
請根據「使用者個人資料」調整建議：年齡、性別、身高體重、體脂率、目標體重、活動量、特殊飲食需求與所在地區。\n\
如果有特殊飲食需求（例如乳糖不耐、素食），務必避開不適合的食材，並主動給出買得到的替代方案。\n\
預算有限，建議要具體、便宜、附近就買得到。\n\
\n\
【很重要】系統已經算好今天的整體分數（0–100），請直接沿用，不要自己重新打分；提到分數時數字必須和系統一致。\n\
\n\
回答結構：\n\
A. 今天大概幾分，引用系統分數並用 2–3 句說明理由。\n\
B. 今天做得不錯的地方（2–4 點）。\n\
C. 今天可以改進的地方（2–4 點），依照目標調整重點。\n\
D. 明天可以怎麼做（3–5 個具體行動），每點都寫出吃什麼、大概份量、去哪裡買。";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormattedContext {
    pub profile_summary: String,
    pub meal_log_summary: String,
    pub locale: LocaleHint,
}

/// The two strings handed to the narrative backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prompt {
    pub instructions: String,
    pub user_context: String,
}

pub fn format_context(payload: &NormalizedPayload) -> FormattedContext {
    FormattedContext {
        profile_summary: profile_summary(payload.profile.as_ref()),
        meal_log_summary: meal_log_summary(&payload.meals),
        locale: locale_hint(payload.profile.as_ref().and_then(|p| p.country.as_deref())),
    }
}

/// Newline-joined list of the profile fields that are present.
pub fn profile_summary(profile: Option<&UserProfile>) -> String {
    let Some(profile) = profile else {
        return NO_PROFILE_LINE.to_string();
    };

    let mut lines = Vec::new();
    if let Some(age) = profile.age {
        lines.push(format!("年齡：{age}"));
    }
    if let Some(gender) = &profile.gender {
        lines.push(format!("性別：{gender}"));
    }
    if let Some(height) = profile.height_cm {
        lines.push(format!("身高：{height} 公分"));
    }
    if let Some(weight) = profile.weight_kg {
        lines.push(format!("體重：{weight} 公斤"));
    }
    if let Some(body_fat) = profile.body_fat_percent {
        lines.push(format!("體脂率：約 {body_fat}%"));
    }
    if let Some(target) = profile.target_weight_kg {
        lines.push(format!("目標體重：{target} 公斤"));
    }
    if let Some(activity) = &profile.activity_level {
        lines.push(format!("活動量：{activity}"));
    }
    if let Some(notes) = &profile.dietary_notes {
        lines.push(format!("特殊飲食需求：{notes}"));
    }
    if let Some(country) = &profile.country {
        lines.push(format!("地點：{country}"));
    }
    if let Some(lifestyle) = &profile.lifestyle {
        lines.push(format!("生活型態：{lifestyle}"));
    }

    if lines.is_empty() {
        NO_PROFILE_LINE.to_string()
    } else {
        lines.join("\n")
    }
}

/// One numbered line per meal: index, date/time when present, meal type, description.
pub fn meal_log_summary(meals: &[MealEntry]) -> String {
    if meals.is_empty() {
        return NO_MEALS_LINE.to_string();
    }

    meals
        .iter()
        .enumerate()
        .map(|(index, meal)| {
            let when = [meal.date.as_deref(), meal.time.as_deref()]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" ");
            let when = if when.is_empty() {
                String::new()
            } else {
                format!("[{when}] ")
            };
            format!(
                "{}. {}{}：{}",
                index + 1,
                when,
                meal_type_label(&meal.meal_type),
                meal.description
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn meal_type_label(raw: &str) -> &str {
    match raw.to_lowercase().as_str() {
        "" => "餐點",
        "breakfast" => "早餐",
        "brunch" => "早午餐",
        "lunch" => "午餐",
        "dinner" => "晚餐",
        "snack" | "snacks" => "點心",
        "drink" | "beverage" => "飲料",
        "late_night" | "supper" => "宵夜",
        _ => raw,
    }
}

pub fn locale_hint(country: Option<&str>) -> LocaleHint {
    let Some(country) = country.map(str::trim).filter(|c| !c.is_empty()) else {
        return CITY_LIFE;
    };
    let lowered = country.to_lowercase();
    let upper_tokens: Vec<&str> = country
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty() && token.chars().all(|c| c.is_ascii_uppercase()))
        .collect();
    let code_matches = |code: &str| {
        lowered == code
            || upper_tokens
                .iter()
                .any(|token| token.eq_ignore_ascii_case(code))
    };

    REGIONS
        .iter()
        .find(|region| {
            region.names.iter().any(|name| lowered.contains(name))
                || region.codes.iter().any(|code| code_matches(code))
        })
        .map(|region| region.locale)
        .unwrap_or(CITY_LIFE)
}

fn goal_emphasis(goal: GoalType) -> &'static str {
    match goal {
        GoalType::MuscleGain => "目標是增肌：多留意蛋白質和總熱量是否足夠，訓練前後的補充時機也可以提醒。",
        GoalType::FatLoss => "目標是瘦身：提醒總量控制與含糖飲料頻率，不要建議極端節食。",
        GoalType::Maintenance => "目標是維持體態：肯定目前的好習慣，提醒避免暴飲暴食。",
    }
}

fn score_evidence(breakdown: &ScoreBreakdown) -> String {
    let yes_no = |hit: bool| if hit { "有" } else { "沒有" };
    let mut lines = vec![
        format!("- 紀錄餐數：{}", breakdown.meal_count),
        format!("- 蛋白質來源：{}", yes_no(breakdown.matches.protein)),
        format!("- 蔬菜：{}", yes_no(breakdown.matches.vegetable)),
        format!("- 含糖飲料：{}", yes_no(breakdown.matches.sugary_drink)),
    ];
    if breakdown.goal_adjustment != 0 {
        lines.push(format!("- 目標調整：{:+}", breakdown.goal_adjustment));
    }
    lines.join("\n")
}

/// Assemble system instructions and user context for one analysis.
pub fn build_prompt(payload: &NormalizedPayload, breakdown: &ScoreBreakdown) -> Prompt {
    let formatted = format_context(payload);
    let goal = payload.context.goal_type;

    let instructions = format!(
        "{}\n\n{}\n\n【在地化提示】\n{}",
        BASE_INSTRUCTIONS,
        goal_emphasis(goal),
        formatted.locale.hint
    );

    let today = if payload.context.today_date == UNSPECIFIED_DATE {
        NOT_PROVIDED
    } else {
        payload.context.today_date.as_str()
    };

    let user_context = format!(
        "[系統評估分數（0–100）]\n{score}\n\n\
         [使用者目標]\n{goal_label}（原始代碼：{raw_goal}）\n\n\
         [所在地區]\n{region}（時區：{timezone}）\n\n\
         [今天日期]\n{today}\n\n\
         [請求類型]\n{request_type}\n\n\
         [使用者個人資料]\n{profile}\n\n\
         [今天的飲食紀錄]\n{meals}\n\n\
         [評分依據]\n{evidence}\n\n\
         請依照上面的資料，給這位使用者真正個人化的飲食分析與具體建議。",
        score = breakdown.score,
        goal_label = goal.label(),
        raw_goal = payload.context.raw_goal.as_deref().unwrap_or(NOT_PROVIDED),
        region = formatted.locale.region,
        timezone = payload.context.timezone,
        request_type = payload.context.request_type.as_deref().unwrap_or(NOT_PROVIDED),
        profile = formatted.profile_summary,
        meals = formatted.meal_log_summary,
        evidence = score_evidence(breakdown),
    );

    Prompt {
        instructions,
        user_context,
    }
}

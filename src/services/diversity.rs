//! Seed-driven creative parameters for parallel drafts.
//!
//! Every function here is pure: the same seed and inputs always give the same plan,
//! which keeps regenerations reproducible and lets tests pin the seed.

use crate::core::model::{GenerationConfig, NarrationStyle, ThemeMeta, TwistType, DEFAULT_PROTAGONIST};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AxisOption {
    pub key: &'static str,
    pub instruction: &'static str,
}

const fn option(key: &'static str, instruction: &'static str) -> AxisOption {
    AxisOption { key, instruction }
}

pub const HOOK_STRATEGIES: &[AxisOption] = &[
    option("in-medias-res", "사건 한가운데서 시작 — 첫 컷부터 이미 곤란한 상황"),
    option("relatable-routine", "누구나 아는 일상 루틴으로 시작 — \"나도 그래\" 공감 유도"),
    option("bold-claim", "자신만만한 선언으로 시작 — 곧 무너질 다짐"),
    option("question", "독자에게 던지는 질문으로 시작"),
    option("tiny-detail", "사소한 물건/소리 하나에 클로즈업하며 시작"),
    option("countdown", "시간 압박(마감, 알람, 약속)으로 시작"),
];

pub const EMOTION_ARCS: &[AxisOption] = &[
    option("hope-crash", "기대 → 좌절 → 자조적 웃음"),
    option("calm-chaos", "평온 → 혼란 → 체념"),
    option("anxiety-relief", "불안 → 최악 상상 → 의외의 안도"),
    option("pride-fall", "뿌듯함 → 방심 → 민망함"),
    option("lonely-warm", "외로움 → 작은 연결 → 따뜻한 여운"),
    option("anger-guilt", "억울함 → 폭발 → 찔림"),
];

pub const PROP_TRACKS: &[AxisOption] = &[
    option("phone", "스마트폰 — 알림/메시지가 컷마다 상황을 바꿈"),
    option("food", "음식 — 라면/커피/간식 상태가 시간 흐름을 보여줌"),
    option("clock", "시계/달력 — 시간 경과를 시각적으로 추적"),
    option("pet", "반려동물 — 주인공 반응을 비추는 거울 역할"),
    option("document", "서류/노트 — 쌓이거나 사라지며 상황을 표현"),
    option("mirror", "거울/창문 반사 — 속마음과 겉모습의 대비"),
];

pub const DIALOGUE_RHYTHMS: &[AxisOption] = &[
    option("short-punchy", "짧고 빠른 대사 (5자 내외), 마지막만 길게"),
    option("build-up", "점점 길어지는 대사, 절정에서 한 단어로 끊기"),
    option("monologue", "속마음 독백 위주, 괄호 대사 적극 활용"),
    option("call-response", "주고받는 티키타카, 상대 대사와 교차"),
];

pub const SPEECH_PROFILES: &[AxisOption] = &[
    option("casual", "친근한 반말, 유행어 한두 개"),
    option("polite", "공손한 존댓말, 속으로는 반말"),
    option("dramatic", "과장된 연극 톤, 감탄사 풍부"),
    option("deadpan", "무표정 담담한 말투, 건조한 유머"),
    option("mumbling", "말끝 흐리기, 말줄임표 자주"),
];

// Per-axis salts keep the axes decorrelated under one seed.
const SALT_HOOK: u32 = 101;
const SALT_ARC: u32 = 211;
const SALT_TWIST: u32 = 307;
const SALT_NARRATION: u32 = 401;
const SALT_PROP: u32 = 503;
const SALT_RHYTHM: u32 = 601;
const SALT_SPEECH: u32 = 701;
const SALT_THEME: u32 = 809;

/// Deterministic score in `[0, 1)` for `(seed + index)`.
pub fn seeded_score(seed: u32, index: usize) -> f64 {
    let x = ((seed as f64) + (index as f64)).sin() * 43758.5453;
    let frac = x - x.floor();
    if frac >= 1.0 {
        0.0
    } else {
        frac
    }
}

/// Shuffles `options` by seeded score and deals them out round-robin.
pub fn assign<T: Clone>(options: &[T], count: usize, seed: u32) -> Vec<T> {
    if options.is_empty() {
        return Vec::new();
    }
    let mut scored: Vec<(f64, &T)> = options
        .iter()
        .enumerate()
        .map(|(i, opt)| (seeded_score(seed, i), opt))
        .collect();
    scored.sort_by(|a, b| a.0.total_cmp(&b.0));

    (0..count)
        .map(|i| scored[i % scored.len()].1.clone())
        .collect()
}

/// Cycles through the pool in order. Never puts the same name on two consecutive
/// drafts when the pool holds at least two names, and continues after the last
/// name of a previous assignment.
pub fn assign_characters(pool: &[String], count: usize, previous: Option<&[String]>) -> Vec<String> {
    let mut unique: Vec<&str> = Vec::new();
    for name in pool.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
        if !unique.contains(&name) {
            unique.push(name);
        }
    }
    if unique.is_empty() {
        return vec![DEFAULT_PROTAGONIST.to_string(); count];
    }

    let start = previous
        .and_then(|prev| prev.last())
        .and_then(|last| unique.iter().position(|n| *n == last.trim()))
        .map_or(0, |pos| pos + 1);

    (0..count)
        .map(|i| unique[(start + i) % unique.len()].to_string())
        .collect()
}

/// Resolves one theme per draft when several are selected.
///
/// Themes arrive in priority order. Each draft scores every theme as
/// `(len - rank) + noise * len` and takes the best one that differs from the
/// previous draft's pick.
pub fn assign_themes(themes: &[ThemeMeta], count: usize, seed: u32) -> Vec<Option<ThemeMeta>> {
    if themes.len() < 2 {
        return vec![None; count];
    }
    let len = themes.len();
    let mut picks: Vec<Option<ThemeMeta>> = Vec::with_capacity(count);
    let mut previous: Option<usize> = None;

    for draft in 0..count {
        let best = (0..len)
            .filter(|rank| Some(*rank) != previous)
            .map(|rank| {
                let noise = seeded_score(seed, draft * len + rank);
                let score = (len - rank) as f64 + noise * len as f64;
                (rank, score)
            })
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(rank, _)| rank)
            .unwrap_or(0);
        previous = Some(best);
        picks.push(Some(themes[best].clone()));
    }
    picks
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DraftAssignment {
    pub character: String,
    pub hook: AxisOption,
    pub arc: AxisOption,
    pub twist: TwistType,
    pub narration: NarrationStyle,
    pub prop_track: AxisOption,
    pub rhythm: AxisOption,
    pub speech: AxisOption,
    pub theme: Option<ThemeMeta>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiversityPlan {
    pub seed: u32,
    pub drafts: Vec<DraftAssignment>,
}

impl DiversityPlan {
    pub fn characters(&self) -> Vec<String> {
        self.drafts.iter().map(|d| d.character.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.drafts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drafts.is_empty()
    }
}

/// Builds the full plan for one attempt.
pub fn plan(config: &GenerationConfig, seed: u32, previous_characters: Option<&[String]>) -> DiversityPlan {
    let count = config.story_count();
    let axis_seed = |salt: u32| seed.wrapping_add(salt.wrapping_mul(1_000));

    let characters = assign_characters(&config.character_pool(), count, previous_characters);
    let hooks = assign(HOOK_STRATEGIES, count, axis_seed(SALT_HOOK));
    let arcs = assign(EMOTION_ARCS, count, axis_seed(SALT_ARC));
    let twists = match config.twist_override {
        Some(twist) => vec![twist; count],
        None => assign(&TwistType::ALL, count, axis_seed(SALT_TWIST)),
    };
    let narrations = match config.narration_override {
        Some(style) => vec![style; count],
        None => assign(&NarrationStyle::ALL, count, axis_seed(SALT_NARRATION)),
    };
    let props = assign(PROP_TRACKS, count, axis_seed(SALT_PROP));
    let rhythms = assign(DIALOGUE_RHYTHMS, count, axis_seed(SALT_RHYTHM));
    let speeches = assign(SPEECH_PROFILES, count, axis_seed(SALT_SPEECH));
    let themes = assign_themes(&config.themes, count, axis_seed(SALT_THEME));

    let drafts = (0..count)
        .map(|i| DraftAssignment {
            character: characters[i].clone(),
            hook: hooks[i],
            arc: arcs[i],
            twist: twists[i],
            narration: narrations[i],
            prop_track: props[i],
            rhythm: rhythms[i],
            speech: speeches[i],
            theme: themes[i].clone(),
        })
        .collect();

    DiversityPlan { seed, drafts }
}

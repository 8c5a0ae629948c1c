use crate::core::error::{GenerationError, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PANELS: usize = 8;
pub const MIN_PANELS: usize = 4;
pub const MAX_PANELS: usize = 16;
pub const DEFAULT_STORY_COUNT: usize = 4;
pub const MAX_STORY_COUNT: usize = 20;
pub const DEFAULT_PROTAGONIST: &str = "주인공";
pub const DIALOG_PLACEHOLDER: &str = "...";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Style {
    pub name: String,
    /// Locale-neutral name, also the key of the font table.
    #[serde(alias = "en")]
    pub label: String,
    #[serde(default)]
    pub chars: Vec<String>,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ThemeCategory {
    #[serde(alias = "심리")]
    Psych,
    #[serde(alias = "감정")]
    Emotion,
    #[serde(alias = "일상")]
    Daily,
    #[serde(alias = "19금")]
    Adult,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ThemeMeta {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Option<ThemeCategory>,
}

impl ThemeMeta {
    pub fn new(key: &str, name: &str, description: &str, category: ThemeCategory) -> Self {
        Self {
            key: key.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            category: Some(category),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ContentTier {
    #[serde(alias = "kid")]
    Kids,
    #[default]
    #[serde(alias = "15")]
    General,
    #[serde(alias = "19")]
    Mature,
    #[serde(alias = "49")]
    Explicit,
}

/// Dialogue language. Anything outside the four known codes is kept verbatim
/// as a free-text language name.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(from = "String", into = "String")]
pub enum DialogLanguage {
    #[default]
    Ko,
    En,
    Ja,
    Zh,
    Custom(String),
}

impl DialogLanguage {
    pub fn code(&self) -> &str {
        match self {
            Self::Ko => "ko",
            Self::En => "en",
            Self::Ja => "ja",
            Self::Zh => "zh",
            Self::Custom(name) => name,
        }
    }

    /// Name used inside backend instructions.
    pub fn display_name(&self) -> String {
        match self {
            Self::Ko => "한국어".to_string(),
            Self::En => "영어 (English)".to_string(),
            Self::Ja => "일본어 (日本語)".to_string(),
            Self::Zh => "중국어 (中文)".to_string(),
            Self::Custom(name) if name.trim().is_empty() => "한국어".to_string(),
            Self::Custom(name) => name.trim().to_string(),
        }
    }
}

impl From<String> for DialogLanguage {
    fn from(s: String) -> Self {
        match s.trim().to_lowercase().as_str() {
            "ko" | "" => Self::Ko,
            "en" => Self::En,
            "ja" => Self::Ja,
            "zh" => Self::Zh,
            _ => Self::Custom(s.trim().to_string()),
        }
    }
}

impl From<&str> for DialogLanguage {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<DialogLanguage> for String {
    fn from(lang: DialogLanguage) -> Self {
        lang.code().to_string()
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TwistType {
    Reality,
    Boomerang,
    Unexpected,
    Timeshift,
    Perspective,
    Irony,
}

impl TwistType {
    pub const ALL: [TwistType; 6] = [
        Self::Reality,
        Self::Boomerang,
        Self::Unexpected,
        Self::Timeshift,
        Self::Perspective,
        Self::Irony,
    ];

    pub fn instruction(&self) -> &'static str {
        match self {
            Self::Reality => "현실 반전 (Reality Check) — 기대와 완전히 다른 현실이 드러나는 반전",
            Self::Boomerang => "자기 부메랑 (Self-Boomerang) — 본인이 한 말이나 행동이 자기에게 돌아오는 반전",
            Self::Unexpected => "예상 밖 반응 (Unexpected Reaction) — 예상과 정반대의 반응이 나오는 반전",
            Self::Timeshift => "시간 역전 (Time Reversal) — 과거와 현재의 대비, 시간 흐름으로 상황이 역전되는 반전",
            Self::Perspective => "관점 전환 (Perspective Shift) — 다른 관점에서 보면 전혀 다른 상황인 반전",
            Self::Irony => "아이러니 (Irony) — 노력의 결과가 정반대이거나, 피하려던 것이 더 심해지는 반전",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum NarrationStyle {
    Emotional,
    Question,
    Proverb,
    BlackHumor,
    Confession,
}

impl NarrationStyle {
    pub const ALL: [NarrationStyle; 5] = [
        Self::Emotional,
        Self::Question,
        Self::Proverb,
        Self::BlackHumor,
        Self::Confession,
    ];

    pub fn instruction(&self) -> &'static str {
        match self {
            Self::Emotional => "감성적 여운 — 독자의 마음을 울리는 서정적인 한 문장",
            Self::Question => "독자에게 질문 — \"당신도 이런 적 있지 않나요?\" 형식의 내레이션",
            Self::Proverb => "격언/속담 — 상황에 딱 맞는 짧은 격언이나 속담으로 마무리",
            Self::BlackHumor => "블랙 유머 — 웃기면서도 씁쓸한 자조적 한마디",
            Self::Confession => "자기 고백 — 캐릭터가 독자에게 직접 말하듯 솔직한 독백",
        }
    }
}

/// Accepts `auto` (or an empty value) as "no override".
fn deserialize_override<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") | Some("auto") => Ok(None),
        Some(value) => T::deserialize(serde::de::value::StrDeserializer::<D::Error>::new(value)).map(Some),
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SerialOptions {
    /// Episodes produced by one batch; replaces the story count.
    pub episode_count: usize,
    #[serde(default = "default_start_episode")]
    pub start_episode: u32,
    #[serde(default)]
    pub previous_summary: String,
}

fn default_start_episode() -> u32 {
    1
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct GenerationConfig {
    #[serde(default)]
    pub style: Option<Style>,
    #[serde(default)]
    pub custom_style: String,

    /// Priority order, most frequently chosen first.
    #[serde(default)]
    pub themes: Vec<ThemeMeta>,
    #[serde(default)]
    pub custom_theme: String,

    #[serde(default)]
    pub panel_count: Option<usize>,
    #[serde(default = "default_story_count")]
    pub story_count: usize,
    #[serde(default)]
    pub language: DialogLanguage,
    #[serde(default)]
    pub tier: ContentTier,

    #[serde(default, deserialize_with = "deserialize_override")]
    pub twist_override: Option<TwistType>,
    #[serde(default, deserialize_with = "deserialize_override")]
    pub narration_override: Option<NarrationStyle>,
    #[serde(default)]
    pub reference_text: String,
    #[serde(default)]
    pub serial: Option<SerialOptions>,
    #[serde(default)]
    pub protagonist_name: Option<String>,
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default = "default_empathy_intensity")]
    pub empathy_intensity: u8,
}

fn default_story_count() -> usize {
    DEFAULT_STORY_COUNT
}
fn default_empathy_intensity() -> u8 {
    3
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            style: None,
            custom_style: String::new(),
            themes: Vec::new(),
            custom_theme: String::new(),
            panel_count: None,
            story_count: DEFAULT_STORY_COUNT,
            language: DialogLanguage::default(),
            tier: ContentTier::default(),
            twist_override: None,
            narration_override: None,
            reference_text: String::new(),
            serial: None,
            protagonist_name: None,
            signature: None,
            empathy_intensity: default_empathy_intensity(),
        }
    }
}

impl GenerationConfig {
    pub fn panel_count(&self) -> usize {
        self.panel_count
            .unwrap_or(DEFAULT_PANELS)
            .clamp(MIN_PANELS, MAX_PANELS)
    }

    /// Number of drafts requested. Serial mode asks for one draft per episode.
    pub fn story_count(&self) -> usize {
        let count = match &self.serial {
            Some(serial) => serial.episode_count,
            None => self.story_count,
        };
        count.clamp(1, MAX_STORY_COUNT)
    }

    pub fn first_episode(&self) -> u32 {
        self.serial.as_ref().map_or(1, |s| s.start_episode.max(1))
    }

    pub fn empathy_intensity(&self) -> u8 {
        self.empathy_intensity.clamp(1, 5)
    }

    pub fn style_name(&self) -> String {
        match &self.style {
            Some(style) => format!("{} ({})", style.name, style.label),
            None if !self.custom_style.trim().is_empty() => self.custom_style.trim().to_string(),
            None => "자유 스타일".to_string(),
        }
    }

    /// Style used for rendering. A custom style becomes a style with an empty pool.
    pub fn effective_style(&self) -> Style {
        match &self.style {
            Some(style) => style.clone(),
            None => Style {
                name: self.custom_style.trim().to_string(),
                label: self.custom_style.trim().to_string(),
                chars: Vec::new(),
                category: None,
            },
        }
    }

    pub fn character_pool(&self) -> Vec<String> {
        if let Some(name) = self.protagonist_name.as_deref().map(str::trim) {
            if !name.is_empty() {
                return vec![name.to_string()];
            }
        }
        let pool: Vec<String> = self
            .style
            .as_ref()
            .map(|s| {
                s.chars
                    .iter()
                    .map(|c| c.trim())
                    .filter(|c| !c.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        if pool.is_empty() {
            vec![DEFAULT_PROTAGONIST.to_string()]
        } else {
            pool
        }
    }

    /// Theme label rendered when no single theme is resolved per draft.
    pub fn theme_label(&self) -> String {
        match self.themes.as_slice() {
            [] => self.custom_theme.trim().to_string(),
            [single] => single.name.clone(),
            many => many.iter().map(|t| t.name.as_str()).collect::<Vec<_>>().join(" / "),
        }
    }

    /// Readiness check, run before any request is built.
    pub fn validate(&self) -> Result<()> {
        if self.style.is_none() && self.custom_style.trim().is_empty() {
            return Err(GenerationError::InvalidConfiguration(
                "no style selected".to_string(),
            ));
        }
        if self.themes.is_empty() && self.custom_theme.trim().is_empty() {
            return Err(GenerationError::InvalidConfiguration(
                "no theme selected".to_string(),
            ));
        }
        Ok(())
    }
}

/// One parsed and normalized story draft.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct StoryRecord {
    pub title: String,
    pub desc: String,
    pub kick: String,
    pub dialog: Vec<String>,
    pub narration: String,
    pub summary: String,
    pub character: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode: Option<u32>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct PanelLayout {
    pub panels: usize,
    pub cols: usize,
    pub rows: usize,
}

const PANEL_LAYOUTS: [PanelLayout; 6] = [
    PanelLayout { panels: 4, cols: 2, rows: 2 },
    PanelLayout { panels: 6, cols: 2, rows: 3 },
    PanelLayout { panels: 8, cols: 2, rows: 4 },
    PanelLayout { panels: 9, cols: 3, rows: 3 },
    PanelLayout { panels: 12, cols: 3, rows: 4 },
    PanelLayout { panels: 16, cols: 4, rows: 4 },
];

impl PanelLayout {
    pub fn for_panels(panels: usize) -> Self {
        if let Some(layout) = PANEL_LAYOUTS.iter().find(|l| l.panels == panels) {
            return *layout;
        }
        let cols = match panels {
            0..=6 => 2,
            7..=9 => 3,
            _ => 4,
        };
        Self {
            panels,
            cols,
            rows: panels.div_ceil(cols),
        }
    }
}

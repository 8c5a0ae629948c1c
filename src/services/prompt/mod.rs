//! Expands an accepted story into the per-panel image prompt document.

mod emotion;
mod fonts;

pub use emotion::Emotion;
pub use fonts::{style_fonts, StyleFonts};

use crate::core::model::{
    ContentTier, DialogLanguage, PanelLayout, StoryRecord, Style, DEFAULT_PROTAGONIST,
    DIALOG_PLACEHOLDER,
};
use fonts::{emotion_font, phase_font, PHASES, SHOUTING_FONT};
use std::fmt::Write;

const CIRCLE_NUMBERS: [&str; 16] = [
    "①", "②", "③", "④", "⑤", "⑥", "⑦", "⑧", "⑨", "⑩", "⑪", "⑫", "⑬", "⑭", "⑮", "⑯",
];
const DIVIDER: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

/// Everything one prompt document is rendered from.
#[derive(Debug, Clone)]
pub struct PromptRequest<'a> {
    pub story: &'a StoryRecord,
    pub style: &'a Style,
    /// Theme label used when the story carries no theme of its own.
    pub theme: &'a str,
    pub layout: PanelLayout,
    pub language: &'a DialogLanguage,
    pub tier: ContentTier,
    /// Outfit per panel index; empty entries keep the default look.
    pub outfits: Option<&'a [String]>,
    pub signature: Option<&'a str>,
}

fn panel_number(idx: usize) -> String {
    CIRCLE_NUMBERS
        .get(idx)
        .map(|n| n.to_string())
        .unwrap_or_else(|| format!("({})", idx + 1))
}

/// Narrative phase (0..=3) of a panel.
pub fn phase_of(idx: usize, total: usize) -> usize {
    let bucket = total.div_ceil(4).max(1);
    (idx / bucket).min(3)
}

/// Dialogue line shown on a panel. The first and last panels take the first and
/// last lines; middle panels map proportionally onto the interior lines.
pub fn dialog_for_panel(idx: usize, total: usize, dialogs: &[String]) -> &str {
    let (Some(first), Some(last)) = (dialogs.first(), dialogs.last()) else {
        return DIALOG_PLACEHOLDER;
    };
    if idx == 0 {
        return first;
    }
    if idx + 1 == total {
        return last;
    }

    let middle: &[String] = if dialogs.len() > 2 {
        &dialogs[1..dialogs.len() - 1]
    } else {
        &[]
    };
    let middle_panels = total.saturating_sub(2);
    if middle_panels == 0 || middle.is_empty() {
        return first;
    }
    let pos = (idx - 1) * middle.len() / middle_panels;
    &middle[pos.min(middle.len() - 1)]
}

pub fn composition(idx: usize, total: usize) -> &'static str {
    if idx == 0 {
        "medium shot, establishing scene, eye-level angle"
    } else if idx + 1 == total {
        "wide shot pulling back, reflective mood, slight low angle"
    } else if idx + 1 == total.div_ceil(2) {
        "dramatic close-up, dutch angle, high contrast lighting"
    } else if idx * 3 < total {
        "medium close-up, slight over-shoulder angle"
    } else if idx * 3 < total * 2 {
        "close-up on expression, tight framing"
    } else {
        "medium shot, reaction framing, natural angle"
    }
}

fn text_rule(language: &DialogLanguage) -> String {
    match language {
        DialogLanguage::Ko => "【⚠️ 한글 필수 규칙 ⚠️】
!!! ALL Korean text MUST be PERFECTLY rendered — zero broken characters !!!
!!! 한글 절대 깨지면 안 됨. 선명하고 깨끗하게. 가독성 최우선 !!!
!!! High-contrast text color against background !!!"
            .to_string(),
        DialogLanguage::En => "【⚠️ English Text Rules ⚠️】
!!! ALL English text MUST be perfectly legible — clean, crisp, no spelling errors !!!
!!! High-contrast text color against background !!!"
            .to_string(),
        DialogLanguage::Ja => "【⚠️ 日本語テキストルール ⚠️】
!!! ALL Japanese text (hiragana/katakana/kanji) MUST be perfectly rendered !!!
!!! 日本語を正確に、読みやすく、鮮明に表示すること !!!
!!! High-contrast text color against background !!!"
            .to_string(),
        DialogLanguage::Zh => "【⚠️ 中文文字规则 ⚠️】
!!! ALL Chinese text MUST be perfectly rendered — clear and readable !!!
!!! 中文必须清晰显示，不得出现乱码 !!!
!!! High-contrast text color against background !!!"
            .to_string(),
        DialogLanguage::Custom(_) => format!(
            "【⚠️ Text Rules ⚠️】
!!! ALL {} text MUST be perfectly rendered and legible — no broken glyphs !!!
!!! High-contrast text color against background !!!",
            language.display_name()
        ),
    }
}

fn script_label(language: &DialogLanguage) -> String {
    match language {
        DialogLanguage::Ko => "한글".to_string(),
        DialogLanguage::En => "English".to_string(),
        DialogLanguage::Ja => "日本語".to_string(),
        DialogLanguage::Zh => "中文".to_string(),
        DialogLanguage::Custom(_) => language.display_name(),
    }
}

fn tier_notice(tier: ContentTier) -> Option<&'static str> {
    match tier {
        ContentTier::Kids => Some(
            "【🧸 콘텐츠 수위】\n미취학 아동용 콘텐츠입니다. 밝고 귀여운 분위기만 표현하고, 폭력/공포/선정적 요소는 절대 넣지 마세요.",
        ),
        ContentTier::General => None,
        ContentTier::Mature => Some(
            "【🔞 콘텐츠 수위】\n이 만화는 19금 콘텐츠입니다. 섹시하고 야한 분위기 연출을 적극적으로 반영하되, 이미지 생성 가능한 범위 내에서 표현하세요.",
        ),
        ContentTier::Explicit => Some(
            "【🔞 콘텐츠 수위】\n이 만화는 49금 콘텐츠입니다. 섹시하고 야한 분위기 연출을 적극적으로 반영하되, 이미지 생성 가능한 범위 내에서 표현하세요.",
        ),
    }
}

fn title_key(title: &str) -> u32 {
    title.chars().fold(0u32, |acc, c| acc.wrapping_add(c as u32))
}

/// Renders the prompt document. Pure: identical requests give identical output.
pub fn synthesize(req: &PromptRequest) -> String {
    let story = req.story;
    let panels = req.layout.panels.max(1);
    let (cols, rows) = (req.layout.cols, req.layout.rows);
    let font = style_fonts(&req.style.label);

    let style_name = if req.style.name.trim().is_empty() {
        "자유 스타일".to_string()
    } else {
        req.style.name.trim().to_string()
    };
    let style_label = if req.style.label.trim().is_empty() {
        style_name.clone()
    } else {
        req.style.label.trim().to_string()
    };
    let character = Some(story.character.trim())
        .filter(|c| !c.is_empty())
        .or_else(|| req.style.chars.first().map(|c| c.trim()).filter(|c| !c.is_empty()))
        .unwrap_or(DEFAULT_PROTAGONIST);
    let theme = story
        .theme
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or(req.theme);
    let signature = req.signature.map(str::trim).filter(|s| !s.is_empty());
    let numbers: String = (0..panels).map(panel_number).collect();
    let twist_idx = panels.div_ceil(2) - 1;
    let last_line = story
        .dialog
        .last()
        .map(String::as_str)
        .unwrap_or(DIALOG_PLACEHOLDER);

    let mut out = format!(
        "=== 공감툰 AI 프롬프트 (나노바나나 프로 전용) ===\n\n\
         【📌 제목 — 첫 컷 상단에 배치】\n\
         메인 제목: \"{title}\" → {title_font}, 크게, 볼드, 중앙 정렬\n\
         부제: \"{desc}\" → {narration_font}, 작게, 연한 색, 제목 아래\n\
         제목 배경: {style_label} 분위기에 맞는 장식 프레임 또는 그라데이션 배너\n\n\
         【🎨 기본 설정】\n\
         • 스타일: {style_name} ({style_label})\n\
         • 주인공: {character} — {style_name} 원작의 시그니처 외형/의상/소품 정확히 재현\n\
         • 주제: [{theme}] {title}\n\
         • 상황: {desc}\n\
         • 그리드: {cols}×{rows} (총 {panels}컷)\n\
         • 반전: {kick}\n\n\
         {text_rule}\n\n",
        title = story.title,
        desc = story.desc,
        kick = story.kick,
        title_font = font.title,
        narration_font = font.narration,
        text_rule = text_rule(req.language),
    );

    if let Some(notice) = tier_notice(req.tier) {
        let _ = writeln!(out, "{}\n", notice);
    }

    let _ = writeln!(
        out,
        "【📐 레이아웃】\n\
         • 1:1 정사각형 전체 이미지, HIGH QUALITY\n\
         • {cols}x{rows} 균등 그리드, 패널 사이 얇은 검정 테두리\n\
         • 각 패널 좌상단: 작은 원형 번호 ({numbers}) — 회색 반투명 원 위에 흰색 숫자\n\
         • 읽기 순서: 좌→우, 상→하\n\n\
         【🔤 폰트 시스템 ({style_name} 전용)】\n\
         • 제목: {title_font}\n\
         • 대사: {dialog_font}\n\
         • 내레이션: {narration_font}\n\
         • 효과음: {effect_font}\n\
         • 감정별 변화: 기쁨→{happy} | 슬픔→{sad} | 놀람→{surprised} | 속마음→{thinking}\n\n\
         【🤖 AI 적극 개입 지시】\n\
         당신은 시니어 공감툰 작가입니다. 각 컷의 기본 대사를 바탕으로:\n\
         1. 캐릭터의 구체적 행동/포즈를 상세 시각화 (손동작, 시선, 몸짓)\n\
         2. 표정을 세밀 묘사 (눈썹 각도, 입꼬리, 눈 크기, 동공)\n\
         3. 배경/환경을 구체 설정 (장소, 소품, 조명, 시간대)\n\
         4. 효과음/시각효과 적극 추가 (땀방울, 번개, 속도선, 꽃잎 등)\n\
         5. 말풍선 크기/모양을 감정에 맞게 변화\n\
         6. 컷 간 시각적 흐름 자연스럽게 연결\n\
         7. {theme} 공감 포인트를 극대화하는 연출\n\n\
         【🎬 컷별 상세 연출】\n",
        title_font = font.title,
        dialog_font = font.dialog,
        narration_font = font.narration,
        effect_font = font.effect,
        happy = emotion_font(Emotion::Happy),
        sad = emotion_font(Emotion::Sad),
        surprised = emotion_font(Emotion::Surprised),
        thinking = emotion_font(Emotion::Thinking),
    );

    for idx in 0..panels {
        let num = panel_number(idx);
        let phase = phase_of(idx, panels);
        let dialog = dialog_for_panel(idx, panels, &story.dialog);
        let is_twist = idx == twist_idx;
        let emotion = Emotion::detect(dialog, phase, is_twist);
        let shot = composition(idx, panels);

        let _ = writeln!(
            out,
            "{DIVIDER}\n[컷 {num}] {} | {}\n{DIVIDER}",
            PHASES[phase],
            phase_font(phase)
        );

        if idx == 0 {
            let _ = writeln!(
                out,
                "📍 구도: {shot}\n\
                 🏷️ 제목: 패널 상단 \"{}\" ({}) + \"{}\" (작게)\n\
                 👤 {character}: 첫 등장 — 시그니처 포즈, 밝은 기대 표정\n\
                 🎭 표정: 눈 반짝, 입꼬리 올라감, 기대에 찬 모습\n\
                 🏠 배경: {theme} 주제의 일상 배경, 따뜻한 색감, 소품 배치\n\
                 💬 대사: \"{dialog}\" → {}\
                 \n  말풍선: 둥근 일반형, {}, 적당 크기\n\
                 ✨ 효과: 톤 설정용 가벼운 이펙트",
                story.title,
                font.title,
                story.desc,
                emotion_font(emotion),
                font.dialog
            );
        } else if idx + 1 == panels {
            let _ = writeln!(
                out,
                "📍 구도: {shot}\n\
                 👤 {character}: 반전 결과 최종 리액션\n\
                 🎭 표정: AI가 {} 결과에 맞는 표정 결정 (체념/허탈/자조적 웃음 등)\n\
                 🏠 배경: 결과가 시각적으로 드러나는 배경 + 소품\n\
                 💬 대사: \"{last_line}\" → {}\
                 \n  말풍선: 감정 변형 말풍선 (울퉁불퉁/떨림 등)\n\
                 📜 내레이션: \"{}\"\
                 \n  → 하단 1/4, 반투명 배경, {}, 본문보다 크게, italic, 강조색",
                story.kick,
                emotion_font(Emotion::Sad),
                story.narration,
                font.narration
            );
            if let Some(sig) = signature {
                let _ = writeln!(out, "✍️ 서명: \"by {}\" → 우하단, 작은 필기체", sig);
            }
        } else if is_twist {
            let kick_emotion = Emotion::detect(&story.kick, 2, false);
            let (sfx_a, sfx_b) = kick_emotion.sound_effect_pair(title_key(&story.title));
            let _ = writeln!(
                out,
                "📍 구도: {shot} ⭐ 핵심 반전!\n\
                 👤 {character}: {} 순간의 극적 포즈!\n\
                 🎭 표정: 최대 리액션 — AI가 극대화 (눈 동그래짐/턱 빠짐/얼굴 일그러짐)\n\
                 🏠 배경: 반전 강조 (집중선/색상 반전/충격파)\n\
                 💬 대사: \"{dialog}\" → {SHOUTING_FONT}\
                 \n  말풍선: 폭발형/찌그러진 말풍선, {effect}, 크게!\n\
                 💥 효과음: \"{sfx_a}\" + \"{sfx_b}\" ({}), {effect}로 크게\n\
                 ✨ 시각효과: 집중선 + 속도선 + 충격 이펙트 + 땀방울",
                story.kick,
                kick_emotion.label(),
                effect = font.effect,
            );
        } else {
            let action = match phase {
                1 => "\n🎬 행동: 점점 빠져드는/몰입하는 동작",
                2 => "\n🎬 행동: 긴장/위기/깨달음으로 전환되는 동작",
                _ => "",
            };
            let _ = writeln!(
                out,
                "📍 구도: {shot}\n\
                 👤 {character}: AI가 흐름에 맞는 구체 행동 결정\
                 \n  (예: 걷기/핸드폰 보기/고개 갸웃/한숨/손짓 등)\n\
                 🎭 표정: {} ({}) — {}\n\
                 🏠 배경: 이전 컷과 연속 + 시간/상황 변화 반영\n\
                 💬 대사: \"{dialog}\" → {}\
                 \n  말풍선: 감정에 맞는 형태, {}{action}",
                emotion.label(),
                PHASES[phase],
                emotion.expression(),
                emotion_font(emotion),
                font.dialog
            );
        }

        if let Some(outfit) = req
            .outfits
            .and_then(|o| o.get(idx))
            .map(|o| o.trim())
            .filter(|o| !o.is_empty())
        {
            let _ = writeln!(out, "👗 의상 (이 컷 전용): {}", outfit);
        }
        let _ = writeln!(out, "🔢 좌상단 {}\n", num);
    }

    let signature_check = signature
        .map(|sig| format!("• 서명 \"by {}\" 필기체\n", sig))
        .unwrap_or_default();
    let _ = write!(
        out,
        "{DIVIDER}\n\n\
         【✅ 최종 체크리스트】\n\
         • {style_label}, cute chibi (2-3 등신)\n\
         • {character} 외형 모든 컷 일관성 (머리색/의상/액세서리)\n\
         • 패널 번호 {numbers} 좌상단 작은 원형\n\
         • 첫 컷 상단: \"{}\" + \"{}\"\n\
         • ⚠️ {} 완벽 렌더링 ⚠️\n\
         • 마지막 컷 하단: \"{}\" 크게\n\
         {signature_check}\
         • 감정 곡선: 밝음→몰입→충격→여운\n\
         • 감정별 다른 폰트 스타일 적용\n\
         • 효과음/이모티콘/집중선 적극 활용",
        story.title,
        story.desc,
        script_label(req.language),
        story.narration
    );
    out
}

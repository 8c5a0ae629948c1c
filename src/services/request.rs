use crate::core::model::{
    ContentTier, DialogLanguage, GenerationConfig, SerialOptions, ThemeCategory,
};
use crate::services::diversity::DiversityPlan;
use std::fmt::Write;

const STORY_SYSTEM_ROLE: &str = "당신은 10년 경력의 공감툰(공감 웹툰) 전문 스토리 작가입니다. \
독자가 \"이거 완전 내 얘기\"라고 느끼는 짧고 강렬한 스토리를 씁니다.";

const EMPATHY_GUIDE: &str = "=== 공감 포인트 가이드 ===
• 구체적인 상황: \"회사에서 힘들다\"가 아니라 \"월요일 9시 1분, 엘리베이터 문이 눈앞에서 닫힘\"
• 속마음과 겉모습의 차이를 적극 활용
• 독자가 캡처해서 친구에게 보내고 싶은 한 컷을 반드시 포함
• 설교나 교훈 금지 — 웃프게, 담담하게";

fn tier_instruction(tier: ContentTier) -> &'static str {
    match tier {
        ContentTier::Kids => "• 수위: 미취학 아동용 — 순수하고 귀여운 내용만. 폭력/무서운 장면/어려운 단어 절대 금지. 밝고 따뜻한 톤 유지.",
        ContentTier::General => "• 수위: 일반 — 일반적인 공감 스토리. 가벼운 유머, 일상 고민, 사회생활 공감. 성적/폭력 표현 자제.",
        ContentTier::Mature => "• 수위: 19금 — 성인 유머와 민망한 상황 연출 가능. 단, 이미지 생성이 가능한 수준으로 유지 (노골적 묘사 금지).",
        ContentTier::Explicit => "• 수위: 49금 — 과감한 성인 상황 설정과 직설적 표현 허용. 단, 이미지 프롬프트는 생성 가능한 범위 내에서 작성.",
    }
}

fn empathy_instruction(level: u8) -> &'static str {
    match level {
        1 => "가볍게 — 피식 웃고 넘어갈 정도",
        2 => "살짝 — 고개를 끄덕일 정도",
        3 => "보통 — \"나도 그래\" 댓글이 달릴 정도",
        4 => "강하게 — 캡처해서 공유하고 싶을 정도",
        _ => "최대 — 읽다가 멈추고 한숨 쉴 정도로 찌르는 공감",
    }
}

/// Intro/rising/twist/ending cut counts for one story.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseCuts {
    pub intro: usize,
    pub rising: usize,
    pub twist: usize,
    pub ending: usize,
}

impl PhaseCuts {
    pub fn total(&self) -> usize {
        self.intro + self.rising + self.twist + self.ending
    }
}

const DEFAULT_RATIOS: (f64, f64, f64) = (0.15, 0.35, 0.30);

fn phase_ratios(category: Option<ThemeCategory>) -> (f64, f64, f64) {
    match category {
        Some(ThemeCategory::Psych) => (0.20, 0.30, 0.30),
        Some(ThemeCategory::Emotion) => (0.20, 0.35, 0.25),
        Some(ThemeCategory::Daily) => (0.15, 0.40, 0.25),
        Some(ThemeCategory::Adult) => (0.15, 0.35, 0.30),
        None => DEFAULT_RATIOS,
    }
}

/// Splits `panel_count` into four phases. Every phase gets at least one cut and
/// the ending absorbs the rounding remainder.
pub fn phase_cuts(panel_count: usize, category: Option<ThemeCategory>) -> PhaseCuts {
    let (intro_r, rising_r, twist_r) = phase_ratios(category);
    let cut = |ratio: f64| ((panel_count as f64 * ratio).round() as usize).max(1);

    let mut phases = [cut(intro_r), cut(rising_r), cut(twist_r)];
    let mut ending = panel_count as isize - phases.iter().sum::<usize>() as isize;

    while ending < 1 {
        let (largest, value) = phases
            .iter()
            .copied()
            .enumerate()
            .max_by_key(|(_, v)| *v)
            .unwrap_or((0, 1));
        if value <= 1 {
            break;
        }
        phases[largest] -= 1;
        ending += 1;
    }

    PhaseCuts {
        intro: phases[0],
        rising: phases[1],
        twist: phases[2],
        ending: ending.max(1) as usize,
    }
}

pub fn system_prompt(language: &DialogLanguage) -> String {
    format!(
        "당신은 공감 웹툰 스토리 전문 작가입니다. 대사는 {}로 작성하세요. \
         JSON 배열 형식으로 응답할 때는 순수 JSON만 출력하세요.",
        language.display_name()
    )
}

const ANTI_REPEAT_RULES: &str = "=== 반복 금지 규칙 ===
1. 스토리끼리 같은 원인 + 소품 + 장소 조합을 절대 재사용하지 마세요.
2. 제목, 첫 대사, 마지막 대사가 다른 스토리와 겹치지 않게 하세요.
3. 같은 반전 구조나 같은 결말 문장을 반복하지 마세요.
4. 배정된 소품은 스토리 전체에서 일관되게 등장해야 합니다.

";

/// Composes the full generation instructions for one attempt.
pub fn build(config: &GenerationConfig, plan: &DiversityPlan) -> String {
    let count = plan.len();
    let panels = config.panel_count();
    let lang = config.language.display_name();
    let category = config.themes.first().and_then(|t| t.category);
    let cuts = phase_cuts(panels, category);
    let intensity = config.empathy_intensity();
    let reference = match config.reference_text.trim() {
        "" => String::new(),
        text => format!("• 참고 자료 (분위기/소재만 참고, 그대로 베끼지 말 것):\n{}\n", text),
    };

    let mut out = format!(
        "{role}\n\
         아래 조건에 맞는 공감툰 스토리를 정확히 {count}개 생성해주세요.\n\n\
         === 조건 ===\n\
         • 만화 스타일: {style}\n\
         • 등장 가능 캐릭터: {pool}\n\
         {themes}\
         • 컷 수: {panels}컷 (각 컷에 대사 1개씩)\n\
         • 대사 언어: {lang} — 모든 dialog, title, desc, kick, narration, summary를 {lang}로 작성\n\
         {tier}\n\
         • 공감 강도: {intensity}/5 — {empathy}\n\
         {reference}\n\
         {guide}\n\n\
         === 기승전결 컷 배분 ({panels}컷) ===\n\
         • 도입 ({intro}컷): 평화로운 일상, 캐릭터 소개, 밝은 분위기\n\
         • 전개 ({rising}컷): 상황에 빠져드는 과정, 점진적 몰입\n\
         • 절정 ({twist}컷): 예상 못한 반전! 가장 임팩트 있는 순간\n\
         • 결말 ({ending}컷): 여운 있는 마무리, 내레이션으로 감성 마무리\n\n\
         === 스토리별 창작 축 배정 (반드시 그대로 따를 것) ===\n",
        role = STORY_SYSTEM_ROLE,
        style = config.style_name(),
        pool = config.character_pool().join(", "),
        themes = theme_conditions(config),
        tier = tier_instruction(config.tier),
        empathy = empathy_instruction(intensity),
        guide = EMPATHY_GUIDE,
        intro = cuts.intro,
        rising = cuts.rising,
        twist = cuts.twist,
        ending = cuts.ending,
    );

    for (i, draft) in plan.drafts.iter().enumerate() {
        let theme = draft
            .theme
            .as_ref()
            .map(|t| format!("\n  - 주제: {} — {}", t.name, t.description))
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "[스토리{}]\
             \n  - 캐릭터: {}{}\
             \n  - 도입 훅: {}\
             \n  - 감정 곡선: {}\
             \n  - 반전 유형: {}\
             \n  - 내레이션 스타일: {}\
             \n  - 소품 연속성: {}\
             \n  - 대사 리듬: {}\
             \n  - 말투: {}",
            i + 1,
            draft.character,
            theme,
            draft.hook.instruction,
            draft.arc.instruction,
            draft.twist.instruction(),
            draft.narration.instruction(),
            draft.prop_track.instruction,
            draft.rhythm.instruction,
            draft.speech.instruction
        );
    }

    out.push_str("\n=== 캐릭터 배정 (character 필드에 정확히 이 이름을 쓸 것) ===\n");
    for (i, draft) in plan.drafts.iter().enumerate() {
        let _ = writeln!(out, "• 스토리{}: {}", i + 1, draft.character);
    }
    out.push('\n');
    out.push_str(ANTI_REPEAT_RULES);

    if let Some(serial) = &config.serial {
        out.push_str(&serial_block(config, serial, count));
    }
    out.push_str(&output_contract(config, plan));
    out
}

fn theme_conditions(config: &GenerationConfig) -> String {
    match config.themes.as_slice() {
        [] => format!("• 공감 주제: {}\n", config.custom_theme.trim()),
        [theme] if theme.description.is_empty() => format!("• 공감 주제: {}\n", theme.name),
        [theme] => format!("• 공감 주제: {} — {}\n", theme.name, theme.description),
        themes => {
            let mut out = String::from("• 공감 주제 (우선순위 순, 스토리별 배정 주제를 따를 것):\n");
            for (rank, theme) in themes.iter().enumerate() {
                let _ = writeln!(out, "  {}. {} — {}", rank + 1, theme.name, theme.description);
            }
            out
        }
    }
}

fn serial_block(config: &GenerationConfig, serial: &SerialOptions, count: usize) -> String {
    let first = config.first_episode();
    let last = first.saturating_add(u32::try_from(count.saturating_sub(1)).unwrap_or(u32::MAX));
    let summary = match serial.previous_summary.trim() {
        "" => String::new(),
        text => format!("• 이전 화 요약: {}\n", text),
    };
    format!(
        "=== 연재 모드 ===\n\
         • 이번 {count}개 스토리는 {first}화부터 {last}화까지 이어지는 연속 에피소드입니다.\n\
         {summary}\
         • 앞 화의 사건, 소품, 인물 관계를 이어받고 캐릭터 성격을 유지하세요.\n\
         • 각 화는 단독으로 읽어도 이해되도록 완결된 반전을 가져야 합니다.\n\
         • title 앞에 \"[N화]\" 형식으로 에피소드 번호를 붙이세요.\n\n"
    )
}

fn output_contract(config: &GenerationConfig, plan: &DiversityPlan) -> String {
    let count = plan.len();
    let panels = config.panel_count();
    let lang = config.language.display_name();
    let example_character = plan
        .drafts
        .first()
        .map(|d| d.character.as_str())
        .unwrap_or_default();
    let dialog_example = (1..=panels)
        .map(|i| format!("\"컷{} 대사\"", i))
        .collect::<Vec<_>>()
        .join(", ");
    let (title_example, episode_field) = if config.serial.is_some() {
        let first = config.first_episode();
        (
            format!("[{}화] 스토리 제목 (짧고 임팩트있게, 5~10자)", first),
            format!("    \"episode\": {},\n", first),
        )
    } else {
        ("스토리 제목 (짧고 임팩트있게, 5~10자)".to_string(), String::new())
    };
    let theme_field = if config.themes.len() > 1 {
        "    \"theme\": \"배정된 주제 이름\",\n"
    } else {
        ""
    };

    format!(
        "=== 출력 형식 ===\n\
         반드시 정확히 {count}개의 객체를 담은 JSON 배열 하나로만 응답하세요.\n\
         모든 텍스트 필드(title, desc, kick, dialog, narration, summary)는 반드시 {lang}로 작성하세요.\n\n\
         [\n  {{\
         \n    \"title\": \"{title_example}\",\
         \n    \"desc\": \"상황 한 줄 설명 (어떤 상황인지 구체적으로)\",\
         \n    \"kick\": \"반전 포인트 + 이모지\",\
         \n    \"dialog\": [{dialog_example}],\
         \n    \"narration\": \"마지막 내레이션 (배정된 내레이션 스타일로 한 문장)\",\
         \n    \"summary\": \"핵심 요약 (가장 공감되는 장면을 한 문장으로)\",\n\
         {theme_field}{episode_field}    \"character\": \"{example_character}\"\
         \n  }}\n]\n\n\
         • 배열 길이는 정확히 {count}개, 스토리 순서는 배정 표 순서와 동일\n\
         • 각 dialog 배열은 정확히 {panels}개의 문자열 (컷마다 1개)\n\
         • character 필드는 캐릭터 배정 표의 이름을 그대로 사용\n\
         • JSON 앞뒤에 설명, 인사말, 마크다운 코드 블록(```)을 절대 붙이지 마세요. 순수 JSON 배열만 출력하세요."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{SerialOptions, Style, ThemeMeta};
    use crate::services::diversity;

    fn burnout_config(count: usize) -> GenerationConfig {
        GenerationConfig {
            style: Some(Style {
                name: "A".to_string(),
                label: "A".to_string(),
                chars: vec!["Kim".to_string(), "Lee".to_string()],
                category: None,
            }),
            themes: vec![ThemeMeta::new(
                "burnout",
                "Burnout",
                "무감각, 동기 상실",
                ThemeCategory::Daily,
            )],
            panel_count: Some(8),
            story_count: count,
            language: DialogLanguage::Ko,
            tier: ContentTier::General,
            ..Default::default()
        }
    }

    #[test]
    fn test_phase_cuts_sum_to_panel_count() {
        let categories = [
            None,
            Some(ThemeCategory::Psych),
            Some(ThemeCategory::Emotion),
            Some(ThemeCategory::Daily),
            Some(ThemeCategory::Adult),
        ];
        for category in categories {
            for panels in 4..=16 {
                let cuts = phase_cuts(panels, category);
                assert_eq!(cuts.total(), panels, "{:?} {}", category, panels);
                assert!(cuts.intro >= 1 && cuts.rising >= 1 && cuts.twist >= 1 && cuts.ending >= 1);
            }
        }
    }

    #[test]
    fn test_phase_cuts_default_ratio() {
        assert_eq!(
            phase_cuts(8, None),
            PhaseCuts { intro: 1, rising: 3, twist: 2, ending: 2 }
        );
    }

    #[test]
    fn test_build_phase_cuts_for_every_batch_size() {
        for count in 2..=20 {
            for panels in 4..=16 {
                let mut config = burnout_config(count);
                config.panel_count = Some(panels);
                let plan = diversity::plan(&config, 99, None);
                let text = build(&config, &plan);
                let cuts = phase_cuts(panels, Some(ThemeCategory::Daily));
                assert_eq!(cuts.total(), panels);
                assert!(text.contains(&format!("• 도입 ({}컷)", cuts.intro)));
                assert!(text.contains(&format!("• 결말 ({}컷)", cuts.ending)));
            }
        }
    }

    #[test]
    fn test_end_to_end_request_scenario() {
        let config = burnout_config(3);
        let plan = diversity::plan(&config, 42, None);
        let text = build(&config, &plan);

        assert!(text.contains("• 컷 수: 8컷"));
        assert!(text.contains("• 스토리1: Kim"));
        assert!(text.contains("• 스토리2: Lee"));
        assert!(text.contains("• 스토리3: Kim"));
        assert!(text.contains("정확히 3개의 객체를 담은 JSON 배열"));
        assert!(text.contains("정확히 8개의 문자열"));
        assert!(text.contains("\"컷8 대사\""));
        assert!(!text.contains("\"컷9 대사\""));
        assert!(text.contains("Burnout — 무감각, 동기 상실"));
        assert!(text.contains("수위: 일반"));
        assert!(!text.contains("연재 모드"));
    }

    #[test]
    fn test_serial_mode_adds_continuity() {
        let mut config = burnout_config(4);
        config.serial = Some(SerialOptions {
            episode_count: 2,
            start_episode: 3,
            previous_summary: "지난 화에서 커피를 쏟았다".to_string(),
        });
        let plan = diversity::plan(&config, 1, None);
        let text = build(&config, &plan);

        assert_eq!(plan.len(), 2);
        assert!(text.contains("3화부터 4화까지"));
        assert!(text.contains("이전 화 요약: 지난 화에서 커피를 쏟았다"));
        assert!(text.contains("[3화]"));
        assert!(text.contains("\"episode\": 3"));
    }

    #[test]
    fn test_serial_range_saturates_at_max_episode() {
        let mut config = burnout_config(4);
        config.serial = Some(SerialOptions {
            episode_count: 3,
            start_episode: u32::MAX,
            previous_summary: String::new(),
        });
        let plan = diversity::plan(&config, 1, None);
        let text = build(&config, &plan);
        assert!(text.contains(&format!("{max}화부터 {max}화까지", max = u32::MAX)));
        assert!(!text.contains("이전 화 요약"));
    }

    #[test]
    fn test_multi_theme_lists_priorities_and_assignments() {
        let mut config = burnout_config(3);
        config.themes.push(ThemeMeta::new("love", "연애", "읽씹 불안", ThemeCategory::Emotion));
        let plan = diversity::plan(&config, 5, None);
        let text = build(&config, &plan);

        assert!(text.contains("우선순위 순"));
        assert!(text.contains("  - 주제: "));
        assert!(text.contains("\"theme\""));
    }

    #[test]
    fn test_missing_theme_and_style_degrade() {
        let config = GenerationConfig {
            custom_theme: "월요병".to_string(),
            ..Default::default()
        };
        let plan = diversity::plan(&config, 0, None);
        let text = build(&config, &plan);
        assert!(text.contains("공감 주제: 월요병"));
        assert!(text.contains("자유 스타일"));
        assert!(text.contains("컷 수: 8컷"));
    }

    #[test]
    fn test_reference_text_and_system_prompt() {
        let mut config = burnout_config(2);
        config.reference_text = "출근길 지하철".to_string();
        config.language = DialogLanguage::En;
        let plan = diversity::plan(&config, 0, None);
        let text = build(&config, &plan);
        assert!(text.contains("참고 자료"));
        assert!(text.contains("출근길 지하철"));
        assert!(system_prompt(&config.language).contains("English"));
    }
}

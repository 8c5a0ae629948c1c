//! Built-in presets the UI offers: themes and a handful of styles.

use crate::core::model::{GenerationConfig, Style, ThemeCategory, ThemeMeta};

pub fn themes() -> Vec<ThemeMeta> {
    use ThemeCategory::*;
    vec![
        ThemeMeta::new("ADHD", "ADHD", "과집중, 산만함, 시간감각 상실", Psych),
        ThemeMeta::new("HSP", "HSP", "고민감성, 감각 과부하, 감정 스펀지", Psych),
        ThemeMeta::new("INFJ", "INFJ", "에너지 방전, 이상주의, 겉바속촉", Psych),
        ThemeMeta::new("내향형", "내향형", "혼자가 편해, 약속 취소 환호", Psych),
        ThemeMeta::new("완벽주의", "완벽주의", "시작 못 함, 끝없는 수정, 비교 지옥", Psych),
        ThemeMeta::new("가면증후군", "가면증후군", "나만 사기꾼 같아, 성공해도 불안", Psych),
        ThemeMeta::new("선택장애", "선택장애", "메뉴 고르기 30분, 결정 후 후회", Psych),
        ThemeMeta::new("사회불안", "사회불안", "발표 공포, 시선 의식, 주문 공포", Emotion),
        ThemeMeta::new("감정조절", "감정조절", "감정 폭발, 분노 조절, 눈물 스위치", Emotion),
        ThemeMeta::new("자존감", "자존감", "자기 비하, 칭찬 거부, 남과 비교", Emotion),
        ThemeMeta::new("연애", "연애", "읽씹 불안, 밀당, 감정 롤러코스터", Emotion),
        ThemeMeta::new("외로움", "외로움", "혼자인 밤, 연락 없는 주말, 공허함", Emotion),
        ThemeMeta::new("번아웃", "번아웃", "무감각, 동기 상실, 만성 피로", Daily),
        ThemeMeta::new("미루기", "미루기", "내일의 나에게 맡기기, 마감 부스터", Daily),
        ThemeMeta::new("수면장애", "수면장애", "불면, 낮밤 전환, 알람 무효", Daily),
        ThemeMeta::new("직장생활", "직장생활", "야근, 눈치, 회의 지옥, 월요병", Daily),
        ThemeMeta::new("시험불안", "시험불안", "벼락치기, 머리 백지, 시험 후 자책", Daily),
        ThemeMeta::new("코딩번아웃", "코딩번아웃", "버그 지옥, 야근, 기술 부채", Daily),
        ThemeMeta::new("썸탈때", "썸 탈 때", "설레는 스킨십, 심쿵 순간, 야릇한 눈빛", Adult),
        ThemeMeta::new("오해받는상황", "오해받는 상황", "엉뚱한 소리로 오해, 민망한 자세 들킴", Adult),
    ]
}

pub fn find_theme(key: &str) -> Option<ThemeMeta> {
    themes().into_iter().find(|t| t.key == key)
}

pub fn styles() -> Vec<Style> {
    let style = |name: &str, label: &str, chars: &[&str]| Style {
        name: name.to_string(),
        label: label.to_string(),
        chars: chars.iter().map(|c| c.to_string()).collect(),
        category: None,
    };
    vec![
        style("도라에몽", "Doraemon", &["도라에몽", "노진구", "이슬이"]),
        style("짱구는 못말려", "Crayon Shin-chan", &["짱구", "철수", "훈이", "맹구"]),
        style("지브리", "Studio Ghibli", &["소녀", "고양이 버스 기사", "숲의 정령"]),
        style("커비", "Kirby style", &["커비", "디디디 대왕", "메타 나이트"]),
        style("산리오", "Sanrio style", &["시나모롤", "쿠로미", "폼폼푸린"]),
        style("심슨 가족", "The Simpsons", &["호머", "바트", "리사"]),
    ]
}

pub fn find_style(label: &str) -> Option<Style> {
    styles().into_iter().find(|s| s.label == label || s.name == label)
}

/// Swaps free-text style and theme entries for the matching presets.
pub fn resolve_presets(config: &mut GenerationConfig) {
    if config.style.is_none() {
        if let Some(style) = find_style(config.custom_style.trim()) {
            config.style = Some(style);
            config.custom_style.clear();
        }
    }
    if config.themes.is_empty() {
        let keys: Vec<&str> = config
            .custom_theme
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .collect();
        let resolved: Vec<ThemeMeta> = keys.iter().filter_map(|k| find_theme(k)).collect();
        if !resolved.is_empty() && resolved.len() == keys.len() {
            config.themes = resolved;
            config.custom_theme.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_presets() {
        let mut config = GenerationConfig {
            custom_style: "Doraemon".to_string(),
            custom_theme: "번아웃, 연애".to_string(),
            ..Default::default()
        };
        resolve_presets(&mut config);
        assert_eq!(config.style.as_ref().unwrap().name, "도라에몽");
        assert_eq!(config.themes.len(), 2);
        assert_eq!(config.themes[1].category, Some(ThemeCategory::Emotion));
        assert!(config.custom_theme.is_empty());

        let mut free = GenerationConfig {
            custom_style: "수채화".to_string(),
            custom_theme: "번아웃, 월요병".to_string(),
            ..Default::default()
        };
        resolve_presets(&mut free);
        assert!(free.style.is_none());
        assert!(free.themes.is_empty());
        assert_eq!(free.custom_theme, "번아웃, 월요병");
    }

    #[test]
    fn test_catalog_lookup() {
        let burnout = find_theme("번아웃").unwrap();
        assert_eq!(burnout.category, Some(ThemeCategory::Daily));
        assert!(find_theme("missing").is_none());

        let kirby = find_style("Kirby style").unwrap();
        assert_eq!(kirby.chars.len(), 3);
        assert!(themes().iter().all(|t| t.category.is_some()));
    }
}

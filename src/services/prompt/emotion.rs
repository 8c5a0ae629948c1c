use regex::Regex;
use std::sync::LazyLock;

static PANIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[!?]{2,}|으악|어어어|헉").expect("valid regex"));
static ANGER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"!{2,}|으악|윽").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Emotion {
    Happy,
    Sad,
    Angry,
    Surprised,
    Thinking,
    Frustrated,
    Guilty,
    Embarrassed,
    Proud,
    Bittersweet,
    Exhausted,
    Panicked,
    Relieved,
    Jealous,
}

fn contains_any(text: &str, words: &[&str]) -> bool {
    words.iter().any(|w| text.contains(w))
}

impl Emotion {
    /// Reads the emotion off a line of dialogue. Rules are ordered; the first match wins.
    pub fn detect(dialog: &str, phase: usize, is_twist: bool) -> Self {
        if is_twist {
            return Self::Surprised;
        }
        if contains_any(dialog, &["억울", "왜 나만"]) {
            return Self::Frustrated;
        }
        if contains_any(dialog, &["찔", "뜨끔", "어..."]) {
            return Self::Guilty;
        }
        if contains_any(dialog, &["민망", "창피", "부끄"]) {
            return Self::Embarrassed;
        }
        if contains_any(dialog, &["뿌듯", "해냈다", "성공"]) {
            return Self::Proud;
        }
        if contains_any(dialog, &["씁쓸", "그래도", "괜찮아"]) {
            return Self::Bittersweet;
        }
        if contains_any(dialog, &["지친", "피곤", "힘들"]) {
            return Self::Exhausted;
        }
        if PANIC.is_match(dialog) {
            return Self::Panicked;
        }
        if contains_any(dialog, &["휴", "다행", "살았다"]) {
            return Self::Relieved;
        }
        if contains_any(dialog, &["부럽", "좋겠다", "질투"]) {
            return Self::Jealous;
        }
        if dialog.contains('!') && dialog.contains('ㅠ') {
            return Self::Sad;
        }
        if ANGER.is_match(dialog) {
            return Self::Angry;
        }
        if dialog.contains("...") {
            return Self::Thinking;
        }
        if dialog.starts_with("(속") || dialog.contains("속마음") {
            return Self::Thinking;
        }
        if contains_any(dialog, &["?!", "뭐", "어?"]) {
            return Self::Surprised;
        }
        match phase {
            0 => Self::Happy,
            3 => Self::Bittersweet,
            _ => Self::Happy,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Happy => "기쁨",
            Self::Sad => "슬픔",
            Self::Angry => "분노",
            Self::Surprised => "놀람",
            Self::Thinking => "생각",
            Self::Frustrated => "억울함",
            Self::Guilty => "찔림",
            Self::Embarrassed => "민망함",
            Self::Proud => "뿌듯함",
            Self::Bittersweet => "씁쓸함",
            Self::Exhausted => "지침",
            Self::Panicked => "패닉",
            Self::Relieved => "안도",
            Self::Jealous => "질투",
        }
    }

    /// Facial expression cue for the image model.
    pub fn expression(&self) -> &'static str {
        match self {
            Self::Happy => "bright smiling face, sparkling eyes, upturned mouth",
            Self::Sad => "teary eyes, downturned mouth, drooping eyebrows",
            Self::Angry => "furrowed brows, clenched teeth, red face, vein pop",
            Self::Surprised => "wide open eyes, dropped jaw, raised eyebrows",
            Self::Thinking => "hand on chin, tilted head, eyes looking up, thought bubble",
            Self::Frustrated => "watery eyes with tight lips, flushed cheeks, trembling",
            Self::Guilty => "avoiding eye contact, cold sweat, stiff posture, nervous smile",
            Self::Embarrassed => "deep red blush, avoiding gaze, hand covering face, steam from head",
            Self::Proud => "chest puffed, satisfied smile, closed eyes, sparkle aura",
            Self::Bittersweet => "half-smile with sad eyes, slight head tilt, wistful gaze",
            Self::Exhausted => "dark circles, droopy eyes, slumped posture, soul leaving body",
            Self::Panicked => "spiral eyes, flailing arms, sweat drops flying, shaking lines",
            Self::Relieved => "exhaling breath, relaxed shoulders, gentle smile, sparkle",
            Self::Jealous => "side-eye glance, pursed lips, dark aura, green tint",
        }
    }

    pub fn sound_effects(&self) -> [&'static str; 4] {
        match self {
            Self::Happy => ["반짝반짝✨", "두근두근💓", "루루루♪", "야호!🎉"],
            Self::Sad => ["뚝뚝💧", "흑흑😢", "시무룩...", "쿨럭..."],
            Self::Angry => ["부글부글🔥", "으드득💢", "꽉!", "부르르💀"],
            Self::Surprised => ["헉!😱", "어?!", "뭐?!💥", "쨘!⚡"],
            Self::Thinking => ["흠...🤔", "음...", "그러니까...", "잠깐💭"],
            Self::Frustrated => ["억울해...😤", "왜 나만!", "끙...", "으으..."],
            Self::Guilty => ["뜨끔!😅", "찔림...", "어...그게...", "쿨럭😰"],
            Self::Embarrassed => ["///// 😳", "아아아!", "창피해...", "(쥐구멍)"],
            Self::Proud => ["후후후😏", "해냈다!✨", "나 좀 멋진데?", "짜잔!🎊"],
            Self::Bittersweet => ["하하...😅", "그래도...", "괜찮아...", "에잇..."],
            Self::Exhausted => ["하아...😩", "피곤...", "(영혼 이탈)", "zzz...💤"],
            Self::Panicked => ["으아악!🚨", "어어어?!", "살려줘!", "큰일났다!"],
            Self::Relieved => ["휴~😌", "살았다...", "다행이야...", "후...😮‍💨"],
            Self::Jealous => ["치...😒", "부럽다...", "좋겠다...", "나는 언제..."],
        }
    }

    /// Two consecutive entries of the sound-effect library, picked by `key`.
    pub fn sound_effect_pair(&self, key: u32) -> (&'static str, &'static str) {
        let library = self.sound_effects();
        let first = key as usize % library.len();
        (library[first], library[(first + 1) % library.len()])
    }
}

use super::emotion::Emotion;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleFonts {
    pub title: &'static str,
    pub dialog: &'static str,
    pub narration: &'static str,
    pub effect: &'static str,
}

const fn fonts(
    title: &'static str,
    dialog: &'static str,
    narration: &'static str,
    effect: &'static str,
) -> StyleFonts {
    StyleFonts {
        title,
        dialog,
        narration,
        effect,
    }
}

pub const GENERIC_FONTS: StyleFonts = fonts(
    "bold display font",
    "clean comic font",
    "elegant serif",
    "impact bold font",
);

const STYLE_FONTS: &[(&str, StyleFonts)] = &[
    ("Demon Slayer chibi", fonts("bold brush stroke calligraphy", "rounded gothic", "elegant serif", "sharp angular impact font")),
    ("Naruto SD style", fonts("bold brush ink calligraphy", "thick rounded sans-serif", "handwritten brush", "explosive jagged font")),
    ("One Piece chibi", fonts("bold adventure display font", "thick comic sans style", "treasure map serif", "bold impact with outline")),
    ("Dragon Ball chibi", fonts("ultra bold display", "thick rounded", "clean serif", "explosive starburst font")),
    ("Pokemon anime", fonts("playful rounded bold", "cute rounded sans-serif", "clean modern sans", "electric spark font")),
    ("Crayon Shin-chan", fonts("childlike crayon handwriting", "messy childlike handwriting", "casual handwritten", "wobbly comic font")),
    ("Doraemon", fonts("friendly rounded bold", "soft rounded sans-serif", "gentle serif", "puffy cloud-like font")),
    ("Spy x Family chibi", fonts("elegant spy thriller font", "clean modern sans-serif", "sophisticated serif", "sharp mission-style font")),
    ("Jujutsu Kaisen chibi", fonts("dark gothic brush", "modern sans-serif", "mystical serif", "cursed energy distorted font")),
    ("Studio Ghibli", fonts("watercolor brush calligraphy", "soft handwritten", "elegant flowing serif", "magical sparkle font")),
    ("Hunter x Hunter", fonts("bold gothic display", "clean rounded", "thin elegant serif", "nen energy glowing font")),
    ("Kirby style", fonts("super cute bubbly font", "round puffy sans-serif", "soft cute handwritten", "star-shaped pop font")),
    ("Slam Dunk", fonts("athletic bold condensed", "strong sans-serif", "sports commentary serif", "basketball scoreboard font")),
    ("Oshi no Ko", fonts("idol sparkle display", "trendy modern sans", "dramatic italic serif", "star glitter font")),
    ("Chainsaw Man", fonts("grungy distressed bold", "rough sans-serif", "dark narrow serif", "blood splatter horror font")),
    ("Attack on Titan chibi", fonts("military stencil bold", "condensed sans-serif", "historical serif", "titan rumble impact font")),
    ("Bleach chibi", fonts("elegant dark calligraphy", "modern sans-serif", "soul society brush", "spiritual energy flowing font")),
    ("Haikyuu", fonts("dynamic sports display", "energetic rounded", "clean modern serif", "volleyball spike impact font")),
    ("Detective Conan", fonts("mystery thriller display", "clean modern sans", "newspaper serif", "magnifying glass reveal font")),
    ("Gintama", fonts("casual messy handwriting", "loose comic font", "sarcastic italic", "comedic explosion font")),
    ("Disney style", fonts("magical fairy tale script", "friendly rounded sans", "storybook serif", "sparkle magic font")),
    ("Pixar style", fonts("3D bold playful font", "modern friendly sans", "warm serif", "popping 3D impact font")),
    ("The Simpsons", fonts("chunky yellow cartoon font", "thick comic sans", "TV narration serif", "doh! explosion font")),
    ("Adventure Time", fonts("wobbly adventure handwriting", "quirky handwritten", "fantasy storybook", "mathematical! pop font")),
    ("SpongeBob", fonts("bubbly underwater font", "bouncy comic sans", "nautical serif", "bubble pop font")),
    ("Powerpuff Girls", fonts("girly pop bold", "cute sans-serif", "narrator dramatic serif", "POW! action font")),
    ("Rick and Morty", fonts("sci-fi distorted font", "messy handwritten", "scientific mono", "portal swirl font")),
    ("Marvel chibi", fonts("heroic bold display", "classic comic book font", "dramatic serif italic", "KAPOW! superhero impact")),
    ("Minions style", fonts("playful banana font", "gibberish cute rounded", "clean sans-serif", "banana split pop font")),
    ("Sanrio style", fonts("adorable rounded pastel", "super cute rounded", "sweet handwritten", "heart sparkle cute font")),
];

/// Fonts keyed by the style's locale-neutral label. Unknown styles get generic fonts.
pub fn style_fonts(label: &str) -> StyleFonts {
    STYLE_FONTS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(label.trim()))
        .map(|(_, fonts)| *fonts)
        .unwrap_or(GENERIC_FONTS)
}

pub const SHOUTING_FONT: &str = "ultra bold expanded font, red/orange, with speed lines";

pub fn emotion_font(emotion: Emotion) -> &'static str {
    match emotion {
        Emotion::Happy | Emotion::Proud | Emotion::Relieved => {
            "bouncy rounded font with slight upward tilt, warm color"
        }
        Emotion::Sad | Emotion::Bittersweet | Emotion::Exhausted | Emotion::Frustrated => {
            "thin drooping font with teardrops, blue-gray tone"
        }
        Emotion::Angry => "bold jagged sharp font, red/dark color, trembling effect",
        Emotion::Panicked => "shaky thin wobbly font, pale color, decreasing size",
        Emotion::Surprised => "large expanding font with exclamation, bold outline",
        Emotion::Thinking => "italic flowing font in thought bubble, lighter opacity",
        Emotion::Guilty | Emotion::Embarrassed => "tiny thin font with dotted outline, light gray",
        Emotion::Jealous => "italic with quotation marks, slightly tilted",
    }
}

pub const PHASES: [&str; 4] = ["도입", "전개", "절정", "결말"];

pub fn phase_font(phase: usize) -> &'static str {
    match phase {
        0 => "clean and inviting font, medium weight, warm neutral tone",
        1 => "slightly dynamic font, medium-bold, engaging rhythm",
        2 => "dramatic bold font with effects, high contrast, maximum impact",
        _ => "reflective serif with warmth, medium weight, gentle closure tone",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_lookup_and_fallback() {
        assert_eq!(style_fonts("Doraemon").effect, "puffy cloud-like font");
        assert_eq!(style_fonts(" kirby STYLE ").title, "super cute bubbly font");
        assert_eq!(style_fonts("watercolor sketch"), GENERIC_FONTS);
        assert_eq!(style_fonts(""), GENERIC_FONTS);
    }
}

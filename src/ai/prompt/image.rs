//! Portrait prompts
//!
//! Each image backend gets its own prompt shape:
//!
//! | Backend | Prompt |
//! |---------|--------|
//! | Pollinations | Short pixel-art story scene, one per image |
//! | Gemini Imagen, Replicate Flux | Long portrait description |
//! | Replicate SDXL | One-line keyword prompt |
//!
//! Visual cues are read off the profile text with simple keyword checks.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::image::SCENE_PROMPT_MAX_CHARS;
use crate::types::{
    EchoPersonality, PartnerProfile, PortraitSubject, ValidationError,
    partner::{CorePersonality, EmotionalSupport, PartnerCommunication},
};

pub const NEGATIVE_PROMPT: &str = "ugly, deformed, noisy, blurry, low quality, jpeg artifacts, \
cartoon, anime, 3d render, doll, plastic, CGI, illustration, \
overly saturated, neon colors, cheerful, happy, smiling broadly, \
text, watermark, signature, logo, username, \
multiple people, cropped face, distorted features, \
poor anatomy, bad proportions, worst quality";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "3:4")]
    Portrait,
    #[serde(rename = "4:3")]
    Landscape,
    #[default]
    #[serde(rename = "9:16")]
    Tall,
    #[serde(rename = "16:9")]
    Wide,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::Portrait => "3:4",
            Self::Landscape => "4:3",
            Self::Tall => "9:16",
            Self::Wide => "16:9",
        }
    }

    /// Pixel size requested from backends that take explicit dimensions
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Self::Tall => (1024, 1824),
            Self::Portrait => (768, 1024),
            Self::Square => (1024, 1024),
            Self::Landscape | Self::Wide => (768, 1024),
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1:1" => Ok(Self::Square),
            "3:4" => Ok(Self::Portrait),
            "4:3" => Ok(Self::Landscape),
            "9:16" => Ok(Self::Tall),
            "16:9" => Ok(Self::Wide),
            other => Err(ValidationError::field(
                "aspectRatio",
                format!("unsupported aspect ratio '{}'", other),
            )),
        }
    }
}

// =============================================================================
// Flux / Imagen
// =============================================================================

/// Detailed portrait prompt for Flux and Imagen
pub fn flux_prompt(subject: PortraitSubject<'_>) -> String {
    match subject {
        PortraitSubject::Partner(partner) => partner_flux_prompt(partner),
        PortraitSubject::Echo(echo) => echo_flux_prompt(echo),
    }
}

fn echo_flux_prompt(echo: &EchoPersonality) -> String {
    let mood = echo
        .keywords
        .iter()
        .take(3)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "Portrait of \"{name}\", a soulful AI persona embodying: {tagline}.

Character essence: {mood}
Emotional depth: {communication}...
Core values: {values}...
Unique trait: {traits}...

Visual style:
- Ethereal, dreamlike atmosphere with soft focus
- Cinematic lighting with gentle glow and rim light
- Color palette: Deep purples, soft pinks, cool blues
- Mood: Introspective, serene, emotionally resonant
- Composition: Medium portrait, eye-level, intimate connection
- Background: Abstract, bokeh, starlight particles

Technical specs:
- Ultra high quality, 8K resolution
- Photorealistic with artistic enhancement
- Soft skin texture, expressive eyes

Avoid: overly cheerful expressions, bright colors, harsh lighting, generic stock photo look",
        name = echo.name,
        tagline = echo.tagline,
        communication = prefix(&echo.communication_style, 60),
        values = prefix(&echo.values, 60),
        traits = prefix(&echo.unique_traits, 60),
    )
}

fn partner_flux_prompt(partner: &PartnerProfile) -> String {
    let traits = partner
        .core_personality
        .primary_traits
        .iter()
        .take(4)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");
    let strengths = partner
        .unique_qualities
        .strengths
        .iter()
        .take(2)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "Portrait of \"{name}\" ({nickname}), an ideal partner embodying: {tagline}.

Character essence: {traits}
Personality vibe: {vibe}
Emotional character: {mood}
Expression style: {expression}
Unique qualities: {strengths}

Visual appearance and atmosphere:
{atmosphere}

Technical specifications:
- Ultra high quality, 8K resolution
- Photorealistic with artistic enhancement
- Soft, natural skin texture, expressive and warm eyes
- Masterpiece quality, intimate portrait composition

Avoid: overly cheerful expressions, bright neon colors, harsh lighting, generic stock photo look, cartoon style",
        name = partner.name,
        nickname = partner.nickname,
        tagline = partner.tagline,
        vibe = partner.vibe,
        mood = emotional_mood(&partner.emotional_support),
        expression = expression_details(&partner.communication_style),
        atmosphere = visual_atmosphere(&partner.core_personality, &partner.vibe),
    )
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

fn emotional_mood(support: &EmotionalSupport) -> &'static str {
    let patterns = [
        support.when_you_anxious.as_str(),
        support.when_you_sad.as_str(),
        support.when_you_happy.as_str(),
        support.daily_support.as_str(),
    ]
    .join(" ")
    .to_lowercase();

    if contains_any(&patterns, &["温柔", "安静", "稳定"]) {
        "gentle and stable presence, calming energy, serene emotional depth"
    } else if contains_any(&patterns, &["活泼", "快乐", "开心"]) {
        "warm and cheerful energy, uplifting presence, joyful spirit"
    } else if contains_any(&patterns, &["理性", "分析", "思考"]) {
        "thoughtful and composed, intelligent expression, calm wisdom"
    } else if contains_any(&patterns, &["细腻", "体贴", "关怀"]) {
        "caring and attentive, empathetic expression, tender warmth"
    } else {
        "emotionally resonant, authentic human expression, soulful presence"
    }
}

fn expression_details(style: &PartnerCommunication) -> String {
    let speaking = style.speaking_pattern.to_lowercase();
    let listening = style.listening_style.to_lowercase();
    let expression = style.expression_style.to_lowercase();

    let mut details = String::from("natural, authentic human expression, ");

    if contains_any(&speaking, &["温和", "轻柔"]) {
        details.push_str("gentle smile, soft and warm eyes, ");
    } else if contains_any(&speaking, &["活泼", "快"]) {
        details.push_str("bright and cheerful expression, sparkling eyes, ");
    } else if contains_any(&speaking, &["认真", "专注"]) {
        details.push_str("serious and thoughtful gaze, focused eyes, ");
    }

    if contains_any(&listening, &["专注", "认真"]) {
        details.push_str("attentive listening posture, ");
    }

    details.push_str(if contains_any(&expression, &["行动", "细节"]) {
        "practical and caring demeanor"
    } else if contains_any(&expression, &["言语", "话语"]) {
        "expressive and communicative presence"
    } else {
        "warm and approachable presence"
    });
    details
}

fn visual_atmosphere(core: &CorePersonality, vibe: &str) -> String {
    let traits = core.primary_traits.join(" ").to_lowercase();
    let attachment = core.attachment_style.to_lowercase();

    let (palette, lighting, mood) =
        if contains_any(&traits, &["温柔", "温暖"]) || attachment.contains("安全") {
            (
                "Warm purples, soft pinks, golden amber accents",
                "warm, soft lighting with golden rim light",
                "warm, comforting, emotionally safe",
            )
        } else if contains_any(&traits, &["冷静", "理性"]) || attachment.contains("回避") {
            (
                "Cool blues, silver grays, soft whites",
                "cool, soft lighting with silver accents",
                "calm, composed, peacefully distant",
            )
        } else if contains_any(&traits, &["活泼", "外向"]) {
            (
                "Vibrant purples, coral pinks, sunset oranges",
                "warm, vibrant lighting with colorful rim light",
                "energetic, warm, emotionally vibrant",
            )
        } else {
            (
                "Deep purples, soft pinks, cool blues",
                "soft cinematic lighting with gentle glow",
                "introspective, serene, emotionally resonant",
            )
        };

    let composition = if contains_any(vibe, &["神秘", "深邃"]) {
        "Medium portrait, slightly elevated angle, mysterious and intriguing"
    } else if contains_any(vibe, &["阳光", "明亮"]) {
        "Medium portrait, eye-level, bright and open connection"
    } else {
        "Medium portrait, eye-level, intimate connection"
    };

    format!(
        "- Ethereal, dreamlike atmosphere with soft focus and depth of field
- {lighting}
- Color palette: {palette}
- Mood: {mood}
- Composition: {composition}
- Background: Abstract, soft bokeh, starlight particles, atmospheric depth"
    )
}

// =============================================================================
// SDXL
// =============================================================================

/// Compact keyword prompt for SDXL
pub fn sdxl_prompt(subject: PortraitSubject<'_>) -> String {
    const STYLE: &str = "ethereal digital art, soft lighting, deep purple and pink tones, \
dreamy atmosphere, high quality, cinematic, introspective mood, 8k, masterpiece";

    match subject {
        PortraitSubject::Partner(partner) => {
            let traits = partner
                .core_personality
                .primary_traits
                .iter()
                .take(2)
                .cloned()
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "Portrait of {}, {}, {}, {}",
                partner.name, partner.vibe, traits, STYLE
            )
        }
        PortraitSubject::Echo(echo) => {
            let mood = echo
                .keywords
                .first()
                .map(String::as_str)
                .unwrap_or("serene");
            format!("Portrait of {}, {} expression, {}", echo.name, mood, STYLE)
        }
    }
}

// =============================================================================
// Pollinations
// =============================================================================

/// Short pixel-art scene prompt; the index cycles through the available scenes
pub fn pollinations_scene_prompt(subject: PortraitSubject<'_>, index: usize) -> String {
    match subject {
        PortraitSubject::Partner(partner) => {
            let scenes = story_scenes(partner);
            let scene = &scenes[index % scenes.len()];
            shorten_scene_prompt(scene)
        }
        PortraitSubject::Echo(echo) => {
            let mood = echo
                .keywords
                .iter()
                .take(2)
                .cloned()
                .collect::<Vec<_>>()
                .join(", ");
            let name = &echo.name;
            let scenes = [
                format!("young adult {name} in modern office, working at desk, {mood}, professional setting, pixel art"),
                format!("young adult {name} in cozy cafe, reading book, {mood}, warm lighting, pixel art"),
                format!("young adult {name} on city street, casual walking, {mood}, urban setting, pixel art"),
                format!("young adult {name} in bookstore, browsing, {mood}, soft lighting, pixel art"),
                format!("young adult {name} in park, enjoying nature, {mood}, outdoor scene, pixel art"),
            ];
            scenes[index % scenes.len()].clone()
        }
    }
}

/// Keep pixel-art prompts short enough for a URL path
fn shorten_scene_prompt(scene: &str) -> String {
    let prompt = format!("Pixel art, {}, mature appearance, 16-bit anime style", scene);
    if prompt.chars().count() <= SCENE_PROMPT_MAX_CHARS {
        return prompt;
    }

    let short = scene
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .take(2)
        .collect::<Vec<_>>()
        .join(", ");
    format!("Pixel art, {}, mature, 16-bit", short)
}

/// Up to five everyday scenes drawn from the partner's lifestyle text
pub fn story_scenes(partner: &PartnerProfile) -> Vec<String> {
    let daily = partner.daily_life_scenes.clone().unwrap_or_default();
    let living = partner.living_together.clone().unwrap_or_default();
    let talents = partner
        .deeper_traits
        .as_ref()
        .map(|d| d.hidden_talents.as_slice())
        .unwrap_or_default();
    let lifestyle = &partner.lifestyle_compatibility;

    let who = format!("{} {}", partner.name, infer_age_group(&partner.age));
    let strengths = partner.unique_qualities.strengths.join(" ").to_lowercase();
    let social = lifestyle.social_style.to_lowercase();
    let rhythm = lifestyle.daily_rhythm.to_lowercase();

    let mut scenes = Vec::with_capacity(5);

    scenes.push(
        if strengths.contains("工作") || social.contains("职场") || rhythm.contains("办公室") {
            format!("{who} in modern office, working at desk with laptop")
        } else if contains_any(&daily.morning_routine, &["教室", "学习"]) {
            format!("{who} in university classroom, studying at desk")
        } else {
            format!("{who} in cozy cafe, working on laptop")
        },
    );

    scenes.push(if contains_any(&daily.quiet_moments, &["图书馆", "书店"]) {
        format!("{who} in bookstore or library, reading quietly")
    } else if daily.quiet_moments.contains("咖啡") {
        format!("{who} in cozy coffee shop, reading book")
    } else if strengths.contains("艺术")
        || talents.iter().any(|t| contains_any(t, &["画", "艺术"]))
    {
        format!("{who} in art studio, painting or drawing")
    } else {
        format!("{who} in park, reading on bench")
    });

    let weekend = &daily.weekend_activity;
    scenes.push(
        if contains_any(&social, &["散步", "公园"]) || weekend.contains("公园") {
            format!("{who} walking in city park, autumn leaves")
        } else if social.contains("购物") || weekend.contains("购物") {
            format!("{who} in shopping district, casual stroll")
        } else if social.contains("运动") || weekend.contains("运动") {
            format!("{who} in gym or sports center, exercising")
        } else if lifestyle.hobby_sharing.contains("电影") || weekend.contains("电影") {
            format!("{who} in cinema lobby, waiting for movie")
        } else {
            format!("{who} on city street, casual walking")
        },
    );

    if !daily.cooking_together.trim().is_empty() || weekend.contains("做饭") {
        scenes.push(format!("{who} in modern kitchen, cooking together"));
    } else if living.morning_scene.contains("早晨") || daily.morning_routine.contains("早晨") {
        scenes.push(format!("{who} in apartment, morning routine"));
    }

    scenes.push(
        if daily.evening_routine.contains("酒吧") || social.contains("酒吧") {
            format!("{who} in cozy bar, evening drink")
        } else if daily.evening_routine.contains("散步") || living.evening_scene.contains("散步")
        {
            format!("{who} on evening street, city lights")
        } else {
            format!("{who} in cozy apartment, evening relaxing")
        },
    );

    scenes
}

/// Age bracket used in scene prompts; never younger than high school
pub fn infer_age_group(age: &str) -> &'static str {
    let age = age.to_lowercase();
    if contains_any(&age, &["高中", "16", "17", "18"]) {
        "high school student"
    } else if contains_any(&age, &["大学", "19", "20", "21", "22"]) {
        "university student"
    } else {
        "young adult"
    }
}

fn prefix(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

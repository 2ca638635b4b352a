//! Turns a [`SigilConfig`] into the natural-language prompt sent to the
//! image service. Pure and total: any config compiles, same config always
//! compiles to the same text.

use crate::config::{ArtStyle, Element, Position, ReferenceImage, SigilConfig};

/// Compiled request payload: the prompt text plus the optional reference
/// image, carried separately so it rides as a binary part and never gets
/// inlined into the text.
#[derive(Clone, Debug, PartialEq)]
pub struct CompiledPrompt {
    pub text: String,
    pub reference_image: Option<ReferenceImage>,
}

pub fn compile(config: &SigilConfig) -> CompiledPrompt {
    let mut lines = Vec::with_capacity(12);

    lines.push(
        "COLLECTIBLE ART SYNTHESIS. Symmetrical collectible artifact card, 1:1 aspect ratio, high resolution."
            .to_string(),
    );
    lines.push(format!("CENTRAL SYMBOL: \"{}\".", config.subject));
    lines.push(format!(
        "COMPOSITION: the symbol sits {} at {}% scale.",
        position_phrase(config.position),
        config.size.min(100),
    ));
    lines.push(format!("ELEMENT: {}.", element_phrase(config.element)));
    lines.push(format!("STYLE: {}.", style_phrase(config.style)));
    lines.push(format!(
        "LINE TREATMENT: {}.",
        THICKNESS_TIERS[tier(config.thickness)]
    ));

    let aura = if config.monochrome {
        "grayscale contrast levels".to_string()
    } else {
        config.color.clone()
    };
    lines.push(format!(
        "LIGHTING: {} (aura expressed as {aura}).",
        GLOW_TIERS[tier(config.glow)]
    ));

    if config.monochrome {
        lines.push(
            "COLOR MODE: STRICT MONOCHROME. High-contrast black and white, sharp ink blacks and pure paper whites. NO colors, NO sepia, NO gray tints."
                .to_string(),
        );
    } else {
        lines.push(format!(
            "COLOR MODE: VIBRANT COLOR. Rich, saturated hues and professional color grading, dominated by {}.",
            config.color
        ));
    }

    if config.allow_text {
        lines.push(
            "TEXT RULES: AI TEXT ALLOWED. Artistic lettering, runic labels or engravings may appear naturally within the artwork."
                .to_string(),
        );
    } else {
        lines.push(
            "TEXT RULES: STRICTLY NO TEXT. Do not include any written words, letters, speech bubbles or typography within the main visual art area. Pure graphics only."
                .to_string(),
        );
    }

    let collection = config.collection_name.trim();
    if config.show_label && !collection.is_empty() {
        lines.push(format!(
            "INSCRIPTION: at the bottom of the card, the word \"{}\" is cleanly engraved into the frame.",
            collection.to_uppercase()
        ));
    } else {
        lines.push("INSCRIPTION: do not add any label text to the frame.".to_string());
    }

    lines.push("TECHNICAL: 8k resolution, crisp textures, dramatic lighting.".to_string());

    CompiledPrompt {
        text: lines.join("\n"),
        reference_image: config.reference_image.clone(),
    }
}

const THICKNESS_TIERS: [&str; 3] = [
    "ultra-fine needle-thin strokes",
    "refined lines with even, deliberate weight",
    "heavy, powerful bold lines",
];

const GLOW_TIERS: [&str; 3] = [
    "a ghostly subtle whisper of energy",
    "a radiant magical atmosphere",
    "an intense pulsating energy aura",
];

/// Shared qualitative tier for the 0..=100 sliders. Thresholds are <34 /
/// 34..=66 / >66; monotonic and gap-free over the whole range.
fn tier(value: u8) -> usize {
    match value.min(100) {
        0..=33 => 0,
        34..=66 => 1,
        _ => 2,
    }
}

fn position_phrase(position: Position) -> &'static str {
    match position {
        Position::Center => "centered in the frame",
        Position::Top => "in the upper third of the frame",
        Position::Bottom => "in the lower third of the frame",
    }
}

fn element_phrase(element: Element) -> &'static str {
    match element {
        Element::Air => "swirling winds, clouds, translucent white trails, feather-light particles",
        Element::Water => "fluid motion, crystalline water, deep blue waves, aquatic ripples, bubbles",
        Element::Fire => "burning embers, intense heat, orange and red flames, volcanic sparks",
        Element::Earth => "rocky textures, brown and green moss, sturdy minerals, cracked ground, roots",
        Element::Ether => "purple mist, divine light, magical essence, shimmering energy, spiritual aura",
        Element::Weave => "interlacing luminous threads, knotwork lattice, woven strands of light, loom-like geometry",
    }
}

fn style_phrase(style: ArtStyle) -> &'static str {
    match style {
        ArtStyle::Cyberpunk => "cyberpunk aesthetic, high tech, low life, neon circuits, holographic projections, metallic textures",
        ArtStyle::Medieval => "gothic medieval, hand-drawn on parchment, ink and quill, illuminated manuscript details",
        ArtStyle::Cosmic => "nebula background, stardust particles, galaxy clusters, celestial geometry, glowing constellations",
        ArtStyle::Ethereal => "soft light, dreamlike, translucent layers, angelic presence, wispy smoke, crystalline textures",
        ArtStyle::DarkAlchemy => "occult symbols, heavy shadows, rusted iron, obsidian, ritualistic atmosphere, dark magical energy",
        ArtStyle::Comic => "retro marvel comic book style, halftone patterns, bold outlines, 60s pop art vibes, cinematic action frames",
        ArtStyle::Solarpunk => "lush greenery, golden sunlight, white ceramic, sustainable tech integration, floral patterns, optimistic future",
        ArtStyle::Void => "infinite darkness, glitch effects, distorted reality, non-euclidean geometry, purple and black hues",
        ArtStyle::Neon => "vibrant synthwave colors, glowing tubes, futuristic city lights, ultra-high contrast, 80s aesthetic",
        ArtStyle::AncientScroll => "weathered papyrus, Egyptian hieroglyphic influences, dusty textures, ancient wisdom vibes",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_is_non_empty_and_deterministic() {
        let config = SigilConfig::default();
        let first = compile(&config);
        let second = compile(&config);
        assert!(!first.text.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn exactly_one_text_clause() {
        for allow_text in [false, true] {
            let config = SigilConfig {
                allow_text,
                ..SigilConfig::default()
            };
            let text = compile(&config).text;
            assert_ne!(
                text.contains("STRICTLY NO TEXT"),
                text.contains("AI TEXT ALLOWED"),
                "text clauses must be mutually exclusive"
            );
        }
    }

    #[test]
    fn monochrome_suppresses_the_aura_color() {
        let config = SigilConfig {
            color: "#ff4400".to_string(),
            monochrome: true,
            ..SigilConfig::default()
        };
        let text = compile(&config).text;
        assert!(!text.contains("#ff4400"));
        assert!(text.contains("STRICT MONOCHROME"));
        assert!(!text.contains("VIBRANT COLOR"));
    }

    #[test]
    fn color_mode_always_names_the_aura_color() {
        let config = SigilConfig {
            color: "#00CED1".to_string(),
            monochrome: false,
            ..SigilConfig::default()
        };
        let text = compile(&config).text;
        assert!(text.contains("#00CED1"));
        assert!(text.contains("VIBRANT COLOR"));
        assert!(!text.contains("STRICT MONOCHROME"));
    }

    #[test]
    fn tiers_are_monotonic_and_cover_the_range() {
        let mut previous = tier(0);
        for value in 0..=100u8 {
            let current = tier(value);
            assert!(current >= previous, "tier must never step down");
            previous = current;
        }
        assert_eq!(tier(0), 0);
        assert_eq!(tier(33), 0);
        assert_eq!(tier(34), 1);
        assert_eq!(tier(66), 1);
        assert_eq!(tier(67), 2);
        assert_eq!(tier(100), 2);
        // out-of-range input saturates instead of panicking
        assert_eq!(tier(u8::MAX), 2);
    }

    #[test]
    fn every_enum_member_maps_to_a_phrase() {
        for element in Element::ALL {
            assert!(!element_phrase(element).is_empty());
        }
        for style in ArtStyle::ALL {
            assert!(!style_phrase(style).is_empty());
        }
    }

    #[test]
    fn reference_image_rides_as_attachment_not_text() {
        let config = SigilConfig {
            reference_image: Some(ReferenceImage {
                mime_type: "image/png".to_string(),
                data: "ZmFrZWJ5dGVz".to_string(),
            }),
            ..SigilConfig::default()
        };
        let compiled = compile(&config);
        assert!(!compiled.text.contains("ZmFrZWJ5dGVz"));
        assert_eq!(compiled.reference_image, config.reference_image);
    }

    #[test]
    fn label_appears_only_when_enabled_with_a_name() {
        let mut config = SigilConfig {
            collection_name: "Chronicles of Aetheris".to_string(),
            show_label: true,
            ..SigilConfig::default()
        };
        assert!(compile(&config).text.contains("CHRONICLES OF AETHERIS"));

        config.show_label = false;
        assert!(!compile(&config).text.contains("CHRONICLES OF AETHERIS"));

        config.show_label = true;
        config.collection_name = "   ".to_string();
        assert!(compile(&config)
            .text
            .contains("do not add any label text"));
    }
}

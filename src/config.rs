use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::sigils::SigilTemplate;

/// Thematic category biasing the generated imagery.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Element {
    Air,
    Water,
    Fire,
    Earth,
    Ether,
    Weave,
}

impl Element {
    pub const ALL: [Element; 6] = [
        Element::Air,
        Element::Water,
        Element::Fire,
        Element::Earth,
        Element::Ether,
        Element::Weave,
    ];

    /// Canonical aura tint for symbols of this element.
    pub fn base_color(self) -> &'static str {
        match self {
            Element::Air => "#87CEEB",
            Element::Water => "#00CED1",
            Element::Fire => "#FF8C00",
            Element::Earth => "#808000",
            Element::Ether => "#FFD700",
            Element::Weave => "#8A2BE2",
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Element::Air => write!(f, "Air"),
            Element::Water => write!(f, "Water"),
            Element::Fire => write!(f, "Fire"),
            Element::Earth => write!(f, "Earth"),
            Element::Ether => write!(f, "Ether"),
            Element::Weave => write!(f, "Weave"),
        }
    }
}

impl FromStr for Element {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "air" => Ok(Element::Air),
            "water" => Ok(Element::Water),
            "fire" => Ok(Element::Fire),
            "earth" => Ok(Element::Earth),
            "ether" | "aether" => Ok(Element::Ether),
            "weave" | "weaving" => Ok(Element::Weave),
            other => Err(format!(
                "unknown element '{other}', expected one of: air, water, fire, earth, ether, weave"
            )),
        }
    }
}

/// Rendering aesthetic for the card artwork.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArtStyle {
    Cyberpunk,
    Medieval,
    Cosmic,
    Ethereal,
    DarkAlchemy,
    Comic,
    Solarpunk,
    Void,
    Neon,
    AncientScroll,
}

impl ArtStyle {
    pub const ALL: [ArtStyle; 10] = [
        ArtStyle::Cyberpunk,
        ArtStyle::Medieval,
        ArtStyle::Cosmic,
        ArtStyle::Ethereal,
        ArtStyle::DarkAlchemy,
        ArtStyle::Comic,
        ArtStyle::Solarpunk,
        ArtStyle::Void,
        ArtStyle::Neon,
        ArtStyle::AncientScroll,
    ];
}

impl fmt::Display for ArtStyle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ArtStyle::Cyberpunk => write!(f, "Cyberpunk"),
            ArtStyle::Medieval => write!(f, "Medieval"),
            ArtStyle::Cosmic => write!(f, "Cosmic"),
            ArtStyle::Ethereal => write!(f, "Ethereal"),
            ArtStyle::DarkAlchemy => write!(f, "Dark Alchemy"),
            ArtStyle::Comic => write!(f, "Comic"),
            ArtStyle::Solarpunk => write!(f, "Solarpunk"),
            ArtStyle::Void => write!(f, "Void"),
            ArtStyle::Neon => write!(f, "Neon"),
            ArtStyle::AncientScroll => write!(f, "Ancient Scroll"),
        }
    }
}

impl FromStr for ArtStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', '_'], "").as_str() {
            "cyberpunk" => Ok(ArtStyle::Cyberpunk),
            "medieval" => Ok(ArtStyle::Medieval),
            "cosmic" => Ok(ArtStyle::Cosmic),
            "ethereal" => Ok(ArtStyle::Ethereal),
            "darkalchemy" | "alchemy" => Ok(ArtStyle::DarkAlchemy),
            "comic" => Ok(ArtStyle::Comic),
            "solarpunk" => Ok(ArtStyle::Solarpunk),
            "void" => Ok(ArtStyle::Void),
            "neon" => Ok(ArtStyle::Neon),
            "ancientscroll" | "scroll" => Ok(ArtStyle::AncientScroll),
            other => Err(format!(
                "unknown style '{other}', expected one of: cyberpunk, medieval, cosmic, ethereal, dark-alchemy, comic, solarpunk, void, neon, ancient-scroll"
            )),
        }
    }
}

/// Placement of the symbol within the card frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Position {
    Center,
    Top,
    Bottom,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Position::Center => write!(f, "Center"),
            Position::Top => write!(f, "Top"),
            Position::Bottom => write!(f, "Bottom"),
        }
    }
}

impl FromStr for Position {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "center" | "centre" => Ok(Position::Center),
            "top" => Ok(Position::Top),
            "bottom" => Ok(Position::Bottom),
            other => Err(format!(
                "unknown position '{other}', expected one of: center, top, bottom"
            )),
        }
    }
}

/// Reference image attached to a generation request. Deliberately never
/// persisted with the rest of the configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReferenceImage {
    pub mime_type: String,
    /// Base64-encoded image bytes.
    pub data: String,
}

/// Per-chat generation parameters. Everything except `reference_image`
/// round-trips through the config store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SigilConfig {
    pub subject: String,
    pub element: Element,
    pub style: ArtStyle,
    pub color: String,
    pub monochrome: bool,
    pub thickness: u8,
    pub glow: u8,
    pub size: u8,
    pub position: Position,
    pub allow_text: bool,
    pub collection_name: String,
    pub show_label: bool,
    #[serde(skip)]
    pub reference_image: Option<ReferenceImage>,
}

impl Default for SigilConfig {
    fn default() -> Self {
        Self {
            subject: "Phoenix".to_string(),
            element: Element::Fire,
            style: ArtStyle::Cyberpunk,
            color: "#ff4400".to_string(),
            monochrome: false,
            thickness: 50,
            glow: 70,
            size: 55,
            position: Position::Center,
            allow_text: false,
            collection_name: String::new(),
            show_label: false,
            reference_image: None,
        }
    }
}

impl SigilConfig {
    /// Applies one `/set <param> <value>` mutation. Numeric sliders are
    /// clamped to 0..=100, enum parameters must name a valid member.
    /// Returns a confirmation line for the chat.
    pub fn apply_setting(&mut self, param: &str, value: &str) -> Result<String, String> {
        let value = value.trim();
        match param.trim().to_lowercase().as_str() {
            "subject" => {
                if value.is_empty() {
                    return Err("subject cannot be empty".to_string());
                }
                self.subject = value.to_string();
                Ok(format!("Subject set to \"{}\"", self.subject))
            }
            "element" => {
                self.element = value.parse()?;
                Ok(format!("Element set to {}", self.element))
            }
            "style" => {
                self.style = value.parse()?;
                Ok(format!("Style set to {}", self.style))
            }
            "color" => {
                if !is_valid_color(value) {
                    return Err(format!(
                        "'{value}' is not a color, expected #rrggbb or a color name"
                    ));
                }
                self.color = value.to_string();
                Ok(format!("Aura color set to {}", self.color))
            }
            "mono" | "monochrome" => {
                self.monochrome = parse_switch(value)?;
                Ok(format!("Monochrome {}", on_off(self.monochrome)))
            }
            "thickness" => {
                self.thickness = parse_percent(value)?;
                Ok(format!("Line thickness set to {}", self.thickness))
            }
            "glow" => {
                self.glow = parse_percent(value)?;
                Ok(format!("Glow set to {}", self.glow))
            }
            "size" => {
                self.size = parse_percent(value)?;
                Ok(format!("Symbol size set to {}", self.size))
            }
            "position" => {
                self.position = value.parse()?;
                Ok(format!("Position set to {}", self.position))
            }
            "text" => {
                self.allow_text = parse_switch(value)?;
                Ok(format!("AI text {}", on_off(self.allow_text)))
            }
            "collection" => {
                self.collection_name = value.to_string();
                if self.collection_name.is_empty() {
                    Ok("Collection name cleared".to_string())
                } else {
                    Ok(format!("Collection set to \"{}\"", self.collection_name))
                }
            }
            "label" => {
                self.show_label = parse_switch(value)?;
                Ok(format!("Frame label {}", on_off(self.show_label)))
            }
            other => Err(format!(
                "unknown parameter '{other}'. Valid parameters: subject, element, style, color, mono, thickness, glow, size, position, text, collection, label"
            )),
        }
    }

    /// Adopts a canon symbol: its motif becomes the subject, its element and
    /// the element's aura color replace the current ones.
    pub fn apply_template(&mut self, template: &SigilTemplate) {
        self.subject = template.motif.to_string();
        self.element = template.element;
        self.color = template.element.base_color().to_string();
    }

    /// The `/config` rendering.
    pub fn summary(&self) -> String {
        let collection = if self.collection_name.is_empty() {
            "—".to_string()
        } else {
            format!(
                "{} (label {})",
                self.collection_name,
                on_off(self.show_label)
            )
        };
        format!(
            "Subject: {}\nElement: {}\nStyle: {}\nAura color: {}\nMonochrome: {}\nThickness: {}\nGlow: {}\nSize: {}\nPosition: {}\nAI text: {}\nCollection: {}",
            self.subject,
            self.element,
            self.style,
            self.color,
            on_off(self.monochrome),
            self.thickness,
            self.glow,
            self.size,
            self.position,
            on_off(self.allow_text),
            collection,
        )
    }
}

fn is_valid_color(value: &str) -> bool {
    if let Some(hex) = value.strip_prefix('#') {
        return hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit());
    }
    !value.is_empty() && value.chars().all(|c| c.is_ascii_alphabetic())
}

fn parse_switch(value: &str) -> Result<bool, String> {
    match value.to_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Ok(true),
        "off" | "false" | "no" | "0" => Ok(false),
        other => Err(format!("expected 'on' or 'off', got '{other}'")),
    }
}

fn parse_percent(value: &str) -> Result<u8, String> {
    let number: i64 = value
        .parse()
        .map_err(|_| format!("expected a number from 0 to 100, got '{value}'"))?;
    Ok(number.clamp(0, 100) as u8)
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sigils;

    #[test]
    fn defaults_are_within_domain() {
        let config = SigilConfig::default();
        assert!(!config.subject.is_empty());
        assert!(config.thickness <= 100);
        assert!(config.glow <= 100);
        assert!(config.size <= 100);
    }

    #[test]
    fn sliders_clamp_to_percent_range() {
        let mut config = SigilConfig::default();
        config.apply_setting("thickness", "250").unwrap();
        assert_eq!(config.thickness, 100);
        config.apply_setting("glow", "-5").unwrap();
        assert_eq!(config.glow, 0);
        config.apply_setting("size", "42").unwrap();
        assert_eq!(config.size, 42);
    }

    #[test]
    fn rejects_unknown_parameter_and_bad_values() {
        let mut config = SigilConfig::default();
        assert!(config.apply_setting("sparkle", "11").is_err());
        assert!(config.apply_setting("element", "plasma").is_err());
        assert!(config.apply_setting("style", "impressionism").is_err());
        assert!(config.apply_setting("color", "#12345").is_err());
        assert!(config.apply_setting("color", "not a color!").is_err());
        assert!(config.apply_setting("mono", "maybe").is_err());
        assert!(config.apply_setting("thickness", "thick").is_err());
        // nothing changed
        assert_eq!(config, SigilConfig::default());
    }

    #[test]
    fn accepts_every_enum_member() {
        let mut config = SigilConfig::default();
        for element in Element::ALL {
            config
                .apply_setting("element", &element.to_string().to_lowercase())
                .unwrap();
            assert_eq!(config.element, element);
        }
        config.apply_setting("style", "dark-alchemy").unwrap();
        assert_eq!(config.style, ArtStyle::DarkAlchemy);
        config.apply_setting("position", "bottom").unwrap();
        assert_eq!(config.position, Position::Bottom);
    }

    #[test]
    fn template_selection_sets_subject_element_and_aura() {
        let mut config = SigilConfig::default();
        let template = sigils::find(12).unwrap();
        config.apply_template(template);
        assert_eq!(config.subject, template.motif);
        assert_eq!(config.element, template.element);
        assert_eq!(config.color, template.element.base_color());
    }

    #[test]
    fn serde_round_trip_drops_reference_image_only() {
        let mut config = SigilConfig::default();
        config.apply_setting("element", "ether").unwrap();
        config.apply_setting("collection", "Chronicles of Aetheris").unwrap();
        config.reference_image = Some(ReferenceImage {
            mime_type: "image/png".to_string(),
            data: "aGVsbG8=".to_string(),
        });

        let raw = serde_json::to_string(&config).unwrap();
        assert!(!raw.contains("aGVsbG8="));
        let restored: SigilConfig = serde_json::from_str(&raw).unwrap();

        let mut expected = config.clone();
        expected.reference_image = None;
        assert_eq!(restored, expected);
    }
}

use std::fmt::Write as _;

use rand::seq::SliceRandom;

use crate::config::Element;

/// One entry of the canon: a named symbol with its drawing motif.
#[derive(Debug, PartialEq, Eq)]
pub struct SigilTemplate {
    pub id: u16,
    pub name: &'static str,
    pub element: Element,
    pub motif: &'static str,
}

const fn t(id: u16, name: &'static str, element: Element, motif: &'static str) -> SigilTemplate {
    SigilTemplate {
        id,
        name,
        element,
        motif,
    }
}

/// The 66-symbol canon, 11 per element.
pub const SIGIL_CANON: &[SigilTemplate] = &[
    // Air (1-11)
    t(1, "Whisper", Element::Air, "Thin curved line splitting into two"),
    t(2, "Gate of Winds", Element::Air, "Parallel vertical lines, vortex center"),
    t(3, "The Signal", Element::Air, "Circle with three radiating rays"),
    t(4, "Feather", Element::Air, "Slightly curved spine with fine diagonal hairs"),
    t(5, "Zephyr", Element::Air, "Spiral infinity shape horizontally stretched"),
    t(6, "Skyward", Element::Air, "Upward arrow with feathered base"),
    t(7, "Breeze", Element::Air, "Three soft horizontal waves"),
    t(8, "Ascent", Element::Air, "Step-like pattern rising to the right"),
    t(9, "Cloud Core", Element::Air, "Double circle with mist-like strokes"),
    t(10, "Gale Strike", Element::Air, "Sharp diagonal jagged line"),
    t(11, "Watcher", Element::Air, "Eye outline with light rays above"),
    // Water (12-22)
    t(12, "Ripple", Element::Water, "Concentric broken circles"),
    t(13, "Deep Tide", Element::Water, "Two heavy interconnected waves"),
    t(14, "Abyss", Element::Water, "Downward spiral fading into darkness"),
    t(15, "Mist Key", Element::Water, "Vertical line with blurred edges"),
    t(16, "The Bond", Element::Water, "Intertwined knot of two lines"),
    t(17, "Current", Element::Water, "Flowing parallel curves"),
    t(18, "Ice Shard", Element::Water, "Sharp angular diamond shape"),
    t(19, "Fountain", Element::Water, "Central line with arcs falling from top"),
    t(20, "Tearline", Element::Water, "Elongated drop shape"),
    t(21, "Vortex", Element::Water, "Rapidly tightening spiral"),
    t(22, "Stillness", Element::Water, "Single thin horizontal line"),
    // Fire (23-33)
    t(23, "The Spark", Element::Fire, "Small cross with split ends"),
    t(24, "The Strike", Element::Fire, "Two colliding diagonal lines"),
    t(25, "Flare", Element::Fire, "Star-like burst with uneven rays"),
    t(26, "Ember", Element::Fire, "Small solid circle with 3 dots around"),
    t(27, "The Clash", Element::Fire, "X-shape with glowing center"),
    t(28, "Solaris", Element::Fire, "Circle within a triangle"),
    t(29, "Scorch", Element::Fire, "Jagged horizontal burn mark line"),
    t(30, "Pyre", Element::Fire, "Vertical line with flame-like branches"),
    t(31, "Ignis", Element::Fire, "V-shape pointing up with dot inside"),
    t(32, "Heatwave", Element::Fire, "Vertical sine wave of light"),
    t(33, "Inferno", Element::Fire, "Heavy vertical column of energy"),
    // Earth (34-44)
    t(34, "Rootmark", Element::Earth, "Y-shape branching downwards"),
    t(35, "Iron Jaw", Element::Earth, "Two heavy horizontal brackets"),
    t(36, "Grain", Element::Earth, "Series of small vertical dashes"),
    t(37, "Mountain", Element::Earth, "Steep triangle with line at base"),
    t(38, "Hollow", Element::Earth, "U-shape holding a dot"),
    t(39, "Anchor", Element::Earth, "T-shape with curved bottom hooks"),
    t(40, "Summit", Element::Earth, "Sharp peak with horizontal bar"),
    t(41, "Crystal", Element::Earth, "Hexagonal outline with internal lines"),
    t(42, "Stone", Element::Earth, "Solid blocky rectangle"),
    t(43, "Clay", Element::Earth, "Soft rounded oval shape"),
    t(44, "Obelisk", Element::Earth, "Tall thin tapering pillar"),
    // Ether (45-55)
    t(45, "Fate Thread", Element::Ether, "Infinite vertical line"),
    t(46, "Void Pulse", Element::Ether, "Black circle with glowing edge"),
    t(47, "Chrono Gate", Element::Ether, "Clockwise rotating arc"),
    t(48, "Spirit", Element::Ether, "Wispy vertical line with loops"),
    t(49, "Nebula", Element::Ether, "Fractal-like branching cloud"),
    t(50, "Astral", Element::Ether, "Point with 8 thin rays"),
    t(51, "Ghost", Element::Ether, "Faded semi-circle"),
    t(52, "Dream", Element::Ether, "Crescent moon with dot above"),
    t(53, "Soul Link", Element::Ether, "Two circles connected by a thin line"),
    t(54, "Pulse", Element::Ether, "Rhythmic heartbeat line"),
    t(55, "First Light", Element::Ether, "Small burst at the center"),
    // Weave (56-66)
    t(56, "Mirror Key", Element::Weave, "Two mirrored vertical L-shapes"),
    t(57, "Pattern", Element::Weave, "Grid of 4 small dots"),
    t(58, "The Knot", Element::Weave, "Celtic-like endless loop"),
    t(59, "Amplifier", Element::Weave, "V-shape with parallel second line"),
    t(60, "Warp", Element::Weave, "Curved lines bending inward"),
    t(61, "Web", Element::Weave, "Radial lines with thin connections"),
    t(62, "Link", Element::Weave, "Two interlocking squares"),
    t(63, "Woven Path", Element::Weave, "Stitched diagonal line"),
    t(64, "Loom", Element::Weave, "Vertical lines crossed by one heavy horizontal"),
    t(65, "Pattern Flow", Element::Weave, "S-shape made of dots"),
    t(66, "Catalyst", Element::Weave, "Explosive burst with a dot center"),
];

pub fn find(id: u16) -> Option<&'static SigilTemplate> {
    SIGIL_CANON.iter().find(|template| template.id == id)
}

pub fn by_element(element: Element) -> impl Iterator<Item = &'static SigilTemplate> {
    SIGIL_CANON
        .iter()
        .filter(move |template| template.element == element)
}

pub fn random() -> &'static SigilTemplate {
    SIGIL_CANON
        .choose(&mut rand::thread_rng())
        .expect("canon table is not empty")
}

/// The `/canon` rendering: every symbol id and name, grouped by element.
pub fn listing() -> String {
    let mut out = String::new();
    for element in Element::ALL {
        let _ = writeln!(out, "— {element} —");
        for template in by_element(element) {
            let _ = writeln!(out, "{:>2}. {}", template.id, template.name);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn canon_holds_eleven_symbols_per_element() {
        assert_eq!(SIGIL_CANON.len(), 66);
        for element in Element::ALL {
            assert_eq!(
                by_element(element).count(),
                11,
                "element {element} is short of symbols"
            );
        }
    }

    #[test]
    fn ids_are_unique_and_dense() {
        let ids: HashSet<u16> = SIGIL_CANON.iter().map(|t| t.id).collect();
        assert_eq!(ids.len(), SIGIL_CANON.len());
        for id in 1..=66 {
            assert!(find(id).is_some(), "id {id} missing from the canon");
        }
        assert!(find(0).is_none());
        assert!(find(67).is_none());
    }

    #[test]
    fn listing_covers_every_element() {
        let listing = listing();
        for element in Element::ALL {
            assert!(listing.contains(&element.to_string()));
        }
        assert!(listing.contains("Catalyst"));
    }
}

//! Highlight color classification.
//!
//! A [`ColorClassifier`] runs one base [`ClassifierPolicy`] and then applies a
//! named, versioned [`OverrideTable`]. All cross-bucket remapping lives in the
//! override table so that changing thresholds can never silently move a color
//! from one category to another.

use std::collections::BTreeMap;

use annorelay_shared::{ClassifierConfig, ClassifierPolicy, ColorBucket, RedHighlight};

/// Zotero's default highlight colors.
const ZOTERO_DEFAULTS: [([u8; 3], ColorBucket); 5] = [
    ([0xff, 0xd4, 0x00], ColorBucket::Yellow),
    ([0xff, 0x66, 0x66], ColorBucket::Red),
    ([0x5f, 0xb2, 0x36], ColorBucket::Green),
    ([0x2e, 0xa8, 0xe5], ColorBucket::Blue),
    ([0xa2, 0x8a, 0xe5], ColorBucket::Purple),
];

// ---------------------------------------------------------------------------
// Encodings
// ---------------------------------------------------------------------------

/// A color as it arrives from a store or from pixel sampling.
#[derive(Debug, Clone, PartialEq)]
pub enum ColorEncoding {
    /// `#rrggbb` or `#rgb`, case-insensitive, `#` optional.
    Hex(String),
    /// Components in `[0, 1]` (when all are ≤ 1.0) or in `[0, 255]`.
    Rgb([f64; 3]),
}

impl ColorEncoding {
    /// Normalize to 8-bit channels. `None` for anything malformed.
    pub fn to_rgb8(&self) -> Option<[u8; 3]> {
        match self {
            Self::Hex(s) => parse_hex(s),
            Self::Rgb(c) => rgb_to_u8(*c),
        }
    }
}

/// Parse `#rrggbb` / `#rgb`; shorthand digits are doubled.
pub fn parse_hex(s: &str) -> Option<[u8; 3]> {
    let digits = s.trim();
    let digits = digits.strip_prefix('#').unwrap_or(digits);
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let expanded: String = match digits.len() {
        3 => digits.chars().flat_map(|c| [c, c]).collect(),
        6 => digits.to_string(),
        _ => return None,
    };
    let channel = |i: usize| u8::from_str_radix(&expanded[i..i + 2], 16).ok();
    Some([channel(0)?, channel(2)?, channel(4)?])
}

fn rgb_to_u8(c: [f64; 3]) -> Option<[u8; 3]> {
    if c.iter().any(|v| !v.is_finite() || *v < 0.0 || *v > 255.0) {
        return None;
    }
    let scale = if c.iter().all(|v| *v <= 1.0) { 255.0 } else { 1.0 };
    let to_u8 = |v: f64| (v * scale).round() as u8;
    Some([to_u8(c[0]), to_u8(c[1]), to_u8(c[2])])
}

/// Lowercase `#rrggbb` form.
pub fn to_hex([r, g, b]: [u8; 3]) -> String {
    format!("#{r:02x}{g:02x}{b:02x}")
}

// ---------------------------------------------------------------------------
// Override tables
// ---------------------------------------------------------------------------

/// Explicit cross-bucket remapping applied after the base policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideTable {
    pub name: String,
    pub version: u32,
    /// Bucket → bucket remaps (e.g. red counted as yellow).
    pub remap: BTreeMap<ColorBucket, ColorBucket>,
    /// Exact colors outside the base policy's reach.
    pub extra_colors: BTreeMap<[u8; 3], ColorBucket>,
}

impl OverrideTable {
    /// No remapping.
    pub fn standard() -> Self {
        Self {
            name: "standard".into(),
            version: 1,
            remap: BTreeMap::new(),
            extra_colors: BTreeMap::new(),
        }
    }

    /// Red/orange highlights counted as methods alongside yellow.
    pub fn orange_as_methods() -> Self {
        Self {
            name: "orange-as-methods".into(),
            version: 1,
            remap: BTreeMap::from([(ColorBucket::Red, ColorBucket::Yellow)]),
            extra_colors: BTreeMap::new(),
        }
    }

    /// Built-in table for the configured red/orange choice.
    pub fn for_red_bucket(choice: RedHighlight) -> Self {
        match choice {
            RedHighlight::Limitations => Self::standard(),
            RedHighlight::Methods => Self::orange_as_methods(),
        }
    }

    /// Add exact `hex -> bucket` entries. Unparseable keys are skipped with a warning.
    pub fn with_extra_colors<'a>(
        mut self,
        colors: impl IntoIterator<Item = (&'a String, &'a ColorBucket)>,
    ) -> Self {
        for (hex, bucket) in colors {
            match parse_hex(hex) {
                Some(rgb) => {
                    self.extra_colors.insert(rgb, *bucket);
                }
                None => tracing::warn!(color = %hex, "ignoring malformed extra color"),
            }
        }
        self
    }

    fn apply(&self, rgb: [u8; 3], base: Option<ColorBucket>) -> Option<ColorBucket> {
        let bucket = self.extra_colors.get(&rgb).copied().or(base)?;
        Some(self.remap.get(&bucket).copied().unwrap_or(bucket))
    }
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

/// One base policy plus one override table, fixed for the classifier's lifetime.
#[derive(Debug, Clone)]
pub struct ColorClassifier {
    policy: ClassifierPolicy,
    overrides: OverrideTable,
}

impl Default for ColorClassifier {
    fn default() -> Self {
        Self::new(ClassifierPolicy::Exact, OverrideTable::standard())
    }
}

impl From<&ClassifierConfig> for ColorClassifier {
    fn from(config: &ClassifierConfig) -> Self {
        let overrides = OverrideTable::for_red_bucket(config.red_bucket)
            .with_extra_colors(config.extra_colors.iter());
        Self::new(config.policy, overrides)
    }
}

impl ColorClassifier {
    pub fn new(policy: ClassifierPolicy, overrides: OverrideTable) -> Self {
        Self { policy, overrides }
    }

    pub fn policy(&self) -> ClassifierPolicy {
        self.policy
    }

    pub fn overrides(&self) -> &OverrideTable {
        &self.overrides
    }

    /// Classify any encoding. `None` means "drop this annotation".
    pub fn classify(&self, color: &ColorEncoding) -> Option<ColorBucket> {
        let rgb = color.to_rgb8()?;
        let base = match self.policy {
            ClassifierPolicy::Exact => exact_bucket(rgb),
            ClassifierPolicy::Heuristic => heuristic_bucket(rgb),
        };
        self.overrides.apply(rgb, base)
    }

    /// Classify a stored hex string.
    pub fn classify_hex(&self, hex: &str) -> Option<ColorBucket> {
        self.classify(&ColorEncoding::Hex(hex.to_string()))
    }
}

fn exact_bucket(rgb: [u8; 3]) -> Option<ColorBucket> {
    ZOTERO_DEFAULTS
        .iter()
        .find(|(known, _)| *known == rgb)
        .map(|(_, bucket)| *bucket)
}

/// Dominant-channel thresholds. Every Zotero default lands in its own bucket;
/// the other Zotero 7 palette entries (orange, magenta, gray) land in none.
fn heuristic_bucket([r, g, b]: [u8; 3]) -> Option<ColorBucket> {
    let (r, g, b) = (i32::from(r), i32::from(g), i32::from(b));
    if r > 200 && g > 190 && b < 100 {
        Some(ColorBucket::Yellow)
    } else if r > 200 && g < 150 && b < 150 && r - g.max(b) > 80 {
        Some(ColorBucket::Red)
    } else if r > 120 && g > 120 && b > 150 && b - r > 40 && r > g {
        Some(ColorBucket::Purple)
    } else if b > 150 && b > g && b > r && r < 120 {
        Some(ColorBucket::Blue)
    } else if g > 120 && g > r && g > b {
        Some(ColorBucket::Green)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULTS: [(&str, ColorBucket); 5] = [
        ("#ffd400", ColorBucket::Yellow),
        ("#5fb236", ColorBucket::Green),
        ("#2ea8e5", ColorBucket::Blue),
        ("#a28ae5", ColorBucket::Purple),
        ("#ff6666", ColorBucket::Red),
    ];

    #[test]
    fn exact_policy_classifies_zotero_defaults() {
        let classifier = ColorClassifier::default();
        for (hex, bucket) in DEFAULTS {
            assert_eq!(classifier.classify_hex(hex), Some(bucket), "{hex}");
            assert_eq!(
                classifier.classify_hex(&hex.to_uppercase()),
                Some(bucket),
                "{hex} uppercase"
            );
        }
    }

    #[test]
    fn exact_policy_drops_unknown_colors() {
        let classifier = ColorClassifier::default();
        for hex in ["#f19837", "#aaaaaa", "#ffd401", "#000", "", "yellow", "#ffd4", "#gggggg"] {
            assert_eq!(classifier.classify_hex(hex), None, "{hex:?}");
        }
    }

    #[test]
    fn shorthand_hex_expands() {
        assert_eq!(parse_hex("#fc0"), Some([0xff, 0xcc, 0x00]));
        assert_eq!(parse_hex("5fb236"), Some([0x5f, 0xb2, 0x36]));
        assert_eq!(to_hex([0x2e, 0xa8, 0xe5]), "#2ea8e5");
    }

    #[test]
    fn rgb_triples_in_both_ranges() {
        let classifier = ColorClassifier::default();
        let green_255 = ColorEncoding::Rgb([95.0, 178.0, 54.0]);
        assert_eq!(classifier.classify(&green_255), Some(ColorBucket::Green));

        let yellow_unit = ColorEncoding::Rgb([1.0, 212.0 / 255.0, 0.0]);
        assert_eq!(classifier.classify(&yellow_unit), Some(ColorBucket::Yellow));

        assert_eq!(classifier.classify(&ColorEncoding::Rgb([300.0, 0.0, 0.0])), None);
        assert_eq!(classifier.classify(&ColorEncoding::Rgb([f64::NAN, 0.0, 0.0])), None);
    }

    #[test]
    fn heuristic_policy_agrees_on_defaults() {
        let classifier = ColorClassifier::new(ClassifierPolicy::Heuristic, OverrideTable::standard());
        for (hex, bucket) in DEFAULTS {
            assert_eq!(classifier.classify_hex(hex), Some(bucket), "{hex}");
        }
        // Near-default shades still land somewhere under the heuristic.
        assert_eq!(classifier.classify_hex("#ffe000"), Some(ColorBucket::Yellow));
        assert_eq!(classifier.classify_hex("#808080"), None);
    }

    #[test]
    fn heuristic_policy_leaves_other_palette_colors_unclassified() {
        let classifier = ColorClassifier::new(ClassifierPolicy::Heuristic, OverrideTable::standard());
        for hex in ["#f19837", "#e56eee", "#aaaaaa"] {
            assert_eq!(classifier.classify_hex(hex), None, "{hex}");
        }
        // Same verdict as the exact policy, so neither policy moves these silently.
        let exact = ColorClassifier::default();
        assert_eq!(exact.classify_hex("#f19837"), None);
        assert_eq!(exact.classify_hex("#e56eee"), None);
    }

    #[test]
    fn palette_colors_need_an_explicit_override_entry() {
        let config = ClassifierConfig {
            policy: ClassifierPolicy::Heuristic,
            extra_colors: BTreeMap::from([("#e56eee".to_string(), ColorBucket::Purple)]),
            ..Default::default()
        };
        let classifier = ColorClassifier::from(&config);
        assert_eq!(classifier.classify_hex("#e56eee"), Some(ColorBucket::Purple));
        assert_eq!(classifier.classify_hex("#f19837"), None);
    }

    #[test]
    fn orange_as_methods_remaps_red_under_both_policies() {
        for policy in [ClassifierPolicy::Exact, ClassifierPolicy::Heuristic] {
            let classifier = ColorClassifier::new(policy, OverrideTable::orange_as_methods());
            assert_eq!(classifier.classify_hex("#ff6666"), Some(ColorBucket::Yellow));
            assert_eq!(classifier.classify_hex("#a28ae5"), Some(ColorBucket::Purple));
        }
    }

    #[test]
    fn classifier_from_config() {
        let config = ClassifierConfig {
            policy: ClassifierPolicy::Exact,
            red_bucket: RedHighlight::Methods,
            extra_colors: BTreeMap::from([
                ("#f19837".to_string(), ColorBucket::Red),
                ("not-a-color".to_string(), ColorBucket::Blue),
            ]),
        };
        let classifier = ColorClassifier::from(&config);
        assert_eq!(classifier.overrides().name, "orange-as-methods");
        assert_eq!(classifier.overrides().extra_colors.len(), 1);
        // Extra colors go through the same remap as base matches.
        assert_eq!(classifier.classify_hex("#f19837"), Some(ColorBucket::Yellow));
    }
}

//! Filament slots and colours

use std::str::FromStr;

/// Number of filament slots on the destination printer
pub const MAX_FILAMENTS: usize = 4;

/// Colour given to padded, unused slots
pub const PLACEHOLDER_COLOUR: &str = "#FFFFFFFF";

/// Material assumed when the source does not name one
pub const DEFAULT_MATERIAL: &str = "PLA";

const FALLBACK_COLOUR: &str = "#000000FF";

/// One filament/colour assignment, referenced by index from paint data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilamentSlot {
    /// 0-based slot index (extruder id minus one)
    pub index: usize,
    /// Material type as declared by the source, e.g. `PLA`
    pub material: String,
    /// Vendor, when the source names a specific one
    pub brand: Option<String>,
    /// Colour as `#RRGGBBAA`
    pub colour: String,
    /// Destination profile id, set by the remapper
    pub profile: Option<String>,
    /// Synthesized slot that no source paint points to
    pub placeholder: bool,
}

impl FilamentSlot {
    /// Create a slot from source data, normalizing the colour
    pub fn new(index: usize, material: impl Into<String>, colour: &str) -> Self {
        let material = material.into();
        let material = if material.trim().is_empty() {
            DEFAULT_MATERIAL.to_string()
        } else {
            material.trim().to_string()
        };
        Self {
            index,
            material,
            brand: None,
            colour: normalize_colour(colour),
            profile: None,
            placeholder: false,
        }
    }

    /// Set the vendor; empty and `Generic` vendors count as unknown
    pub fn with_brand(mut self, brand: Option<&str>) -> Self {
        self.brand = brand
            .map(str::trim)
            .filter(|b| !b.is_empty() && !b.eq_ignore_ascii_case("generic"))
            .map(String::from);
        self
    }

    /// Create an inert white slot
    pub fn placeholder(index: usize, profile: &str) -> Self {
        Self {
            index,
            material: DEFAULT_MATERIAL.to_string(),
            brand: None,
            colour: PLACEHOLDER_COLOUR.to_string(),
            profile: Some(profile.to_string()),
            placeholder: true,
        }
    }
}

/// Ordered filament slots of a project
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilamentList {
    slots: Vec<FilamentSlot>,
}

impl FilamentList {
    /// Create a list, renumbering slots by position
    pub fn new(slots: Vec<FilamentSlot>) -> Self {
        let slots = slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| FilamentSlot { index, ..slot })
            .collect();
        Self { slots }
    }

    /// Slots in order
    pub fn slots(&self) -> &[FilamentSlot] {
        &self.slots
    }

    /// Mutable access to the slots
    pub fn slots_mut(&mut self) -> &mut [FilamentSlot] {
        &mut self.slots
    }

    /// Consume the list
    pub fn into_slots(self) -> Vec<FilamentSlot> {
        self.slots
    }

    /// Number of slots
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether there are no slots
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Slot at `index`
    pub fn get(&self, index: usize) -> Option<&FilamentSlot> {
        self.slots.get(index)
    }

    /// Iterate over the slots
    pub fn iter(&self) -> std::slice::Iter<'_, FilamentSlot> {
        self.slots.iter()
    }
}

impl<'a> IntoIterator for &'a FilamentList {
    type Item = &'a FilamentSlot;
    type IntoIter = std::slice::Iter<'a, FilamentSlot>;

    fn into_iter(self) -> Self::IntoIter {
        self.slots.iter()
    }
}

/// Caller-chosen replacement colour and/or material for one source slot
///
/// Parsed from `N=#RRGGBB`, `N=#RRGGBB:PETG` or `N=:PETG`, with `N` the
/// 1-based filament number shown in slicers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilamentOverride {
    /// 0-based slot index
    pub index: usize,
    /// New colour, normalized
    pub colour: Option<String>,
    /// New material type
    pub material: Option<String>,
}

impl FilamentOverride {
    /// Apply to a slot; the brand is dropped when the material changes
    pub fn apply(&self, slot: &mut FilamentSlot) {
        if let Some(ref colour) = self.colour {
            slot.colour = colour.clone();
        }
        if let Some(ref material) = self.material {
            if !material.eq_ignore_ascii_case(&slot.material) {
                slot.brand = None;
            }
            slot.material = material.clone();
        }
    }
}

impl FromStr for FilamentOverride {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (number, rest) = s
            .split_once('=')
            .ok_or_else(|| format!("expected N=COLOUR[:TYPE], got '{}'", s))?;
        let number: usize = number
            .trim()
            .parse()
            .map_err(|_| format!("invalid filament number '{}'", number))?;
        if number == 0 {
            return Err("filament numbers start at 1".to_string());
        }

        let (colour, material) = match rest.split_once(':') {
            Some((c, m)) => (c.trim(), Some(m.trim())),
            None => (rest.trim(), None),
        };
        let colour = if colour.is_empty() {
            None
        } else if parse_hex_colour(colour).is_some() {
            Some(normalize_colour(colour))
        } else {
            return Err(format!("invalid colour '{}'", colour));
        };
        let material = material.filter(|m| !m.is_empty()).map(String::from);

        if colour.is_none() && material.is_none() {
            return Err(format!("override '{}' changes nothing", s));
        }

        Ok(Self {
            index: number - 1,
            colour,
            material,
        })
    }
}

/// Normalize a colour to upper-case `#RRGGBBAA`
///
/// Accepts `RRGGBB` or `RRGGBBAA` with or without `#`. A missing alpha
/// becomes `FF`; anything unparseable becomes opaque black.
pub fn normalize_colour(raw: &str) -> String {
    match parse_hex_colour(raw) {
        Some(hex) if hex.len() == 6 => format!("#{}FF", hex.to_ascii_uppercase()),
        Some(hex) => format!("#{}", hex.to_ascii_uppercase()),
        None => FALLBACK_COLOUR.to_string(),
    }
}

fn parse_hex_colour(raw: &str) -> Option<&str> {
    let hex = raw.trim();
    let hex = hex.strip_prefix('#').unwrap_or(hex);
    let valid = (hex.len() == 6 || hex.len() == 8) && hex.chars().all(|c| c.is_ascii_hexdigit());
    valid.then_some(hex)
}

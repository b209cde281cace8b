//! Settings document parsing

use crate::error::{Error, Result};
use crate::model::{DIFFERENT_SETTINGS_KEY, FilamentSlot, SettingsMap};
use serde_json::Value;
use std::collections::BTreeSet;

/// Parse a flat JSON settings document
///
/// The overridden set comes from `different_settings_to_system`, a list of
/// `;`-separated name groups (one group per preset). An absent key means
/// nothing is overridden.
///
/// # Arguments
/// * `bytes` - Document content
/// * `entry` - Archive path, used in error messages
pub fn parse_settings(bytes: &[u8], entry: &str) -> Result<SettingsMap> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| Error::malformed_settings(entry, &format!("invalid JSON: {}", e)))?;

    let Value::Object(values) = value else {
        return Err(Error::malformed_settings(entry, "root is not a JSON object"));
    };

    let mut overridden = BTreeSet::new();
    match values.get(DIFFERENT_SETTINGS_KEY) {
        None | Some(Value::Null) => {}
        Some(Value::String(group)) => collect_names(group, &mut overridden),
        Some(Value::Array(groups)) => {
            for group in groups {
                let Value::String(group) = group else {
                    return Err(Error::malformed_settings(
                        entry,
                        &format!("{} must contain only strings", DIFFERENT_SETTINGS_KEY),
                    ));
                };
                collect_names(group, &mut overridden);
            }
        }
        Some(_) => {
            return Err(Error::malformed_settings(
                entry,
                &format!("{} must be a list of strings", DIFFERENT_SETTINGS_KEY),
            ));
        }
    }

    Ok(SettingsMap::new(values, overridden))
}

fn collect_names(group: &str, names: &mut BTreeSet<String>) {
    names.extend(
        group
            .split(';')
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(String::from),
    );
}

/// Filament slots declared by `filament_colour`, `filament_type` and
/// `filament_vendor`
///
/// The colour list decides how many slots there are. A missing type is
/// read as PLA.
pub(crate) fn filaments_from_settings(settings: &SettingsMap) -> Vec<FilamentSlot> {
    let colours = settings.get_list("filament_colour");
    let types = settings.get_list("filament_type");
    let vendors = settings.get_list("filament_vendor");

    colours
        .iter()
        .enumerate()
        .map(|(index, colour)| {
            let material = types.get(index).map(String::as_str).unwrap_or_default();
            FilamentSlot::new(index, material, colour)
                .with_brand(vendors.get(index).map(String::as_str))
        })
        .collect()
}

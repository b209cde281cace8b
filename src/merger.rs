//! Output package assembly
//!
//! The output is the selected template with the source model grafted in:
//!
//! - template entries keep their order and bytes, except for model parts
//!   and the settings document
//! - the source model parts take the place of the template's first model
//!   part, byte-for-byte and in source order
//! - the settings document is the template's, overlaid with the padded
//!   filament list
//!
//! Destination profile ids live only in the settings document, so model
//! bytes never need rewriting. Only names may change: the template's
//! `_rels/.rels` points at its own root part, so a source root stored
//! under another name is emitted under the template's.

use crate::error::{Error, Result};
use crate::model::{FilamentList, FilamentSlot, MAX_FILAMENTS, ModelDocument, SettingsMap};
use crate::opc::{Entry, Package, SETTINGS_PATH, is_model_part, part_rels_path};
use crate::template::Template;
use serde_json::{Map, Value};
use tracing::debug;

/// Slot field written to an overlaid settings list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayField {
    /// `#RRGGBBAA` colour
    Colour,
    /// Material type
    Material,
    /// Destination profile id
    Profile,
}

/// Settings lists rebuilt from the filament list, in write order
pub const FILAMENT_OVERLAY: &[(&str, OverlayField)] = &[
    ("filament_colour", OverlayField::Colour),
    ("filament_type", OverlayField::Material),
    ("filament_settings_id", OverlayField::Profile),
];

/// Prefix of per-filament settings lists
const FILAMENT_PREFIX: &str = "filament_";

/// Build the output package
///
/// # Errors
///
/// [`Error::Internal`] when the filament list is not exactly
/// [`MAX_FILAMENTS`] long or a slot has no profile; both are broken
/// pipeline invariants, not bad input.
pub fn merge(model: &ModelDocument, filaments: &FilamentList, template: &Template) -> Result<Package> {
    let overlay = filament_overlay(filaments)?;
    let settings = overlay_settings(template.settings(), &overlay);
    let settings_bytes = settings.to_pretty_json()?;

    let mut output = Package::new();
    let mut model_emitted = false;

    for entry in template.package().entries() {
        if is_model_part(&entry.name) {
            if !model_emitted {
                push_model_parts(&mut output, model, template.root_path())?;
                model_emitted = true;
            }
            continue;
        }

        if entry.name == SETTINGS_PATH {
            output
                .push(Entry {
                    data: settings_bytes.clone(),
                    ..entry.clone()
                })
                .map_err(internal)?;
        } else {
            output.push(entry.clone()).map_err(internal)?;
        }
    }

    if !model_emitted {
        push_model_parts(&mut output, model, template.root_path())?;
    }

    debug!(
        entries = output.len(),
        model_parts = model.parts.len(),
        "merged output package"
    );
    Ok(output)
}

fn push_model_parts(output: &mut Package, model: &ModelDocument, root_path: &str) -> Result<()> {
    let renames = root_renames(model, root_path)?;
    for part in &model.parts {
        let mut part = part.clone();
        if let Some((_, to)) = renames.iter().find(|(from, _)| *from == part.name) {
            part.name = to.clone();
        }
        output.push(part).map_err(internal)?;
    }
    Ok(())
}

/// Source parts to rename so the source root sits where the template's
/// relationships point
fn root_renames(model: &ModelDocument, root_path: &str) -> Result<Vec<(String, String)>> {
    if model.root_path == root_path {
        return Ok(Vec::new());
    }

    let renames: Vec<(String, String)> = [
        (model.root_path.clone(), root_path.to_string()),
        (part_rels_path(&model.root_path), part_rels_path(root_path)),
    ]
    .into_iter()
    .filter(|(from, _)| model.parts.iter().any(|p| &p.name == from))
    .collect();
    for (_, to) in &renames {
        if model.parts.iter().any(|p| &p.name == to) {
            return Err(Error::malformed_model(
                &model.root_path,
                &format!("root part cannot be stored as {}: name already taken", to),
            ));
        }
    }

    debug!(from = %model.root_path, to = root_path, "renaming root model part");
    Ok(renames)
}

fn internal(err: Error) -> Error {
    Error::internal(format!("Output assembly failed: {}", err))
}

/// Settings lists derived from a padded filament list
///
/// Yields one `(key, list)` pair per [`FILAMENT_OVERLAY`] row.
pub fn filament_overlay(filaments: &FilamentList) -> Result<Vec<(String, Value)>> {
    if filaments.len() != MAX_FILAMENTS {
        return Err(Error::internal(format!(
            "Filament list has {} slots at merge time, expected {}",
            filaments.len(),
            MAX_FILAMENTS
        )));
    }

    FILAMENT_OVERLAY
        .iter()
        .map(|&(key, field)| {
            let values = filaments
                .iter()
                .map(|slot| field_value(slot, field).map(Value::String))
                .collect::<Result<Vec<_>>>()?;
            Ok((key.to_string(), Value::Array(values)))
        })
        .collect()
}

fn field_value(slot: &FilamentSlot, field: OverlayField) -> Result<String> {
    match field {
        OverlayField::Colour => Ok(slot.colour.clone()),
        OverlayField::Material => Ok(slot.material.clone()),
        OverlayField::Profile => slot.profile.clone().ok_or_else(|| {
            Error::internal(format!("Filament slot {} has no destination profile", slot.index))
        }),
    }
}

/// Apply an overlay to base settings
///
/// Overlay keys replace base values in place (or are appended when the
/// base lacks them); every other key keeps its base value. Remaining
/// `filament_*` lists are then resized to [`MAX_FILAMENTS`] entries by
/// repeating their last value or truncating.
pub fn overlay_settings(base: &SettingsMap, overlay: &[(String, Value)]) -> SettingsMap {
    let mut values: Map<String, Value> = base.values().clone();

    for (key, value) in overlay {
        values.insert(key.clone(), value.clone());
    }

    for (key, value) in values.iter_mut() {
        if !key.starts_with(FILAMENT_PREFIX) || overlay.iter().any(|(k, _)| k == key) {
            continue;
        }
        if let Value::Array(items) = value {
            resize_list(items, MAX_FILAMENTS);
        }
    }

    SettingsMap::new(values, base.overridden().clone())
}

fn resize_list(items: &mut Vec<Value>, len: usize) {
    let Some(last) = items.last().cloned() else {
        return;
    };
    items.resize(len, last);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opc::{self, MODEL_PATH};
    use crate::parser::parse_settings;
    use crate::template::SupportMode;

    fn template() -> Template {
        let mut package = Package::new();
        package
            .push(Entry::new(MODEL_PATH, b"<model><resources/><build/></model>".to_vec()))
            .unwrap();
        package
            .push(Entry::new(SETTINGS_PATH, br##"{"filament_colour": ["#FFFFFF"]}"##.to_vec()))
            .unwrap();
        Template::from_bytes(&opc::write(&package).unwrap(), SupportMode::Disabled).unwrap()
    }

    fn model_rooted_at(root: &str, extra: &[&str]) -> ModelDocument {
        let mut parts = vec![
            Entry::new(root, b"<model/>".to_vec()),
            Entry::new(part_rels_path(root), b"<Relationships/>".to_vec()),
        ];
        parts.extend(extra.iter().map(|name| Entry::new(*name, b"<model/>".to_vec())));
        ModelDocument {
            parts,
            root_path: root.to_string(),
            ..ModelDocument::default()
        }
    }

    fn padded() -> FilamentList {
        FilamentList::new(
            (0..MAX_FILAMENTS)
                .map(|i| FilamentSlot {
                    profile: Some(format!("Profile {}", i)),
                    ..FilamentSlot::new(i, "PLA", "#FF0000")
                })
                .collect(),
        )
    }

    #[test]
    fn test_overlay_keeps_order_and_other_keys() {
        let base = parse_settings(
            br##"{
                "printer_model": "Snapmaker U1",
                "filament_colour": ["#FFFFFF"],
                "layer_height": "0.2",
                "filament_diameter": ["1.75", "1.75"],
                "filament_flow_ratio": ["0.98", "0.95", "1", "1", "1"],
                "filament_notes": []
            }"##,
            SETTINGS_PATH,
        )
        .unwrap();

        let overlay = filament_overlay(&padded()).unwrap();
        let merged = overlay_settings(&base, &overlay);

        let keys: Vec<&str> = merged.values().keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec![
                "printer_model",
                "filament_colour",
                "layer_height",
                "filament_diameter",
                "filament_flow_ratio",
                "filament_notes",
                "filament_type",
                "filament_settings_id",
            ]
        );
        assert_eq!(merged.get_list("filament_colour"), vec!["#FF0000FF"; 4]);
        assert_eq!(merged.get_list("filament_diameter"), vec!["1.75"; 4]);
        assert_eq!(merged.get_list("filament_flow_ratio"), vec!["0.98", "0.95", "1", "1"]);
        assert!(merged.get_list("filament_notes").is_empty());
        assert_eq!(merged.get_str("layer_height"), Some("0.2"));
        assert_eq!(merged.get_list("filament_settings_id")[3], "Profile 3");
    }

    #[test]
    fn test_source_root_stored_under_template_root() {
        let model = model_rooted_at("3D/main.model", &["3D/Objects/object_1.model"]);
        let output = merge(&model, &padded(), &template()).unwrap();

        assert_eq!(
            output.file_names(),
            vec![
                MODEL_PATH,
                "3D/_rels/3dmodel.model.rels",
                "3D/Objects/object_1.model",
                SETTINGS_PATH,
            ]
        );
    }

    #[test]
    fn test_root_rename_clash_rejected() {
        let model = model_rooted_at("3D/main.model", &[MODEL_PATH]);
        let err = merge(&model, &padded(), &template()).unwrap_err();
        assert!(matches!(err, Error::MalformedModel(_)));
        assert!(err.to_string().contains("name already taken"));
    }

    #[test]
    fn test_overlay_rejects_unpadded_list() {
        let short = FilamentList::new(vec![FilamentSlot::new(0, "PLA", "#FFFFFF")]);
        let err = filament_overlay(&short).unwrap_err();
        assert!(err.is_internal());
    }

    #[test]
    fn test_overlay_requires_profiles() {
        let mut list = padded();
        list.slots_mut()[2].profile = None;
        let err = filament_overlay(&list).unwrap_err();
        assert!(err.is_internal());
        assert!(err.to_string().contains("slot 2"));
    }
}

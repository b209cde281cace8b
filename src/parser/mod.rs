//! Parsing of source project documents
//!
//! A project splits into a model document (every part under `3D/` plus the
//! per-object settings) and a flat settings document. Both are parsed here
//! for validation and for the data a conversion needs, while the model
//! bytes themselves are carried through untouched.

mod model;
mod model_settings;
pub mod paint;
mod settings;
mod slice_info;

pub use settings::parse_settings;

use crate::error::{Error, Result};
use crate::model::{FilamentList, ModelDocument, SettingsMap};
use crate::opc::{
    self, MODEL_DIR, MODEL_SETTINGS_PATH, Package, SETTINGS_PATH, SLICE_INFO_PATH, is_model_part,
};
use quick_xml::events::BytesStart;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::debug;

/// Default buffer capacity for XML parsing (4KB)
const XML_BUFFER_CAPACITY: usize = 4096;

/// Parse and validate the model document of a package
///
/// Parses the root model part, every part its components and build items
/// reference, and every other `.model` part under `3D/`, since all of them
/// are carried into the output. Checks that every component and build item
/// resolves to an object and that every triangle references existing
/// vertices. Filament
/// assignments are read from `Metadata/model_settings.config` if present.
pub fn parse_model_document(package: &Package) -> Result<ModelDocument> {
    let root_path = opc::discover_model_path(package)?;
    if !package.has_file(&root_path) {
        return Err(Error::missing_entry(&root_path));
    }

    let mut document = ModelDocument {
        parts: package
            .entries()
            .iter()
            .filter(|e| is_model_part(&e.name))
            .cloned()
            .collect(),
        root_path: root_path.clone(),
        ..ModelDocument::default()
    };

    // Root first, then every other model part so that none reaches the
    // output unchecked; referenced parts are still required to exist.
    let mut queue: VecDeque<String> = std::iter::once(root_path.clone())
        .chain(
            document
                .parts
                .iter()
                .filter(|e| e.name != root_path && is_model_file(&e.name))
                .map(|e| e.name.clone()),
        )
        .collect();
    let mut visited = HashSet::new();

    while let Some(part) = queue.pop_front() {
        if !visited.insert(part.clone()) {
            continue;
        }

        let xml = model_part_text(package, &part)?;
        let parsed = model::parse_model_part(&part, xml)?;

        let components = parsed
            .objects
            .iter()
            .flat_map(|o| o.components.iter().filter_map(|c| c.path.as_ref()));
        let items = parsed.build_items.iter().filter_map(|i| i.path.as_ref());
        for path in components.chain(items) {
            if !path.starts_with(MODEL_DIR) {
                return Err(Error::malformed_model(
                    &part,
                    &format!("reference to part outside {}: {}", MODEL_DIR, path),
                ));
            }
            if !visited.contains(path) {
                queue.push_back(path.clone());
            }
        }

        if part == root_path {
            document.build_items = parsed.build_items;
        }
        document.objects.extend(parsed.objects);
    }

    validate_references(&document)?;

    if let Some(entry) = package.get(MODEL_SETTINGS_PATH) {
        let text = std::str::from_utf8(&entry.data).map_err(|e| {
            Error::malformed_model(MODEL_SETTINGS_PATH, &format!("not valid UTF-8: {}", e))
        })?;
        document.assignments = model_settings::parse_model_settings(text)?;
    }

    debug!(
        parts = visited.len(),
        objects = document.objects.len(),
        triangles = document.triangle_count(),
        painted = document.painted_triangle_count(),
        "parsed model document"
    );

    Ok(document)
}

/// Parse the settings document of a package
pub fn parse_settings_document(package: &Package) -> Result<SettingsMap> {
    let bytes = package.get_file_binary(SETTINGS_PATH)?;
    parse_settings(bytes, SETTINGS_PATH)
}

/// Extract the ordered filament list of a project
///
/// The settings document is authoritative because its order is the order
/// paint codes index into. Projects whose settings carry no filament list
/// fall back to the slice summary.
pub fn extract_filaments(package: &Package, settings: &SettingsMap) -> Result<FilamentList> {
    let slots = settings::filaments_from_settings(settings);
    if !slots.is_empty() {
        return Ok(FilamentList::new(slots));
    }

    if let Some(text) = package.get_text(SLICE_INFO_PATH) {
        let slots = slice_info::filaments_from_slice_info(text)?;
        if !slots.is_empty() {
            debug!(count = slots.len(), "filaments read from slice info");
            return Ok(FilamentList::new(slots));
        }
    }

    Err(Error::malformed_settings(
        SETTINGS_PATH,
        "project declares no filaments",
    ))
}

/// Model XML part, as opposed to relationships or other files under `3D/`
fn is_model_file(name: &str) -> bool {
    name.starts_with(MODEL_DIR) && name.ends_with(".model")
}

fn model_part_text<'a>(package: &'a Package, part: &str) -> Result<&'a str> {
    let entry = package
        .get(part)
        .ok_or_else(|| Error::malformed_model(part, "referenced model part is missing"))?;
    std::str::from_utf8(&entry.data)
        .map_err(|e| Error::malformed_model(part, &format!("not valid UTF-8: {}", e)))
}

fn validate_references(document: &ModelDocument) -> Result<()> {
    let mut seen = HashSet::new();
    for object in &document.objects {
        if !seen.insert((object.part.as_str(), object.id)) {
            return Err(Error::malformed_model(
                &object.part,
                &format!("duplicate object id {}", object.id),
            ));
        }
    }

    for object in &document.objects {
        for component in &object.components {
            let target = component.path.as_deref().unwrap_or(&object.part);
            if !seen.contains(&(target, component.objectid)) {
                return Err(Error::malformed_model(
                    &object.part,
                    &format!(
                        "object {} references missing object {} in {}",
                        object.id, component.objectid, target
                    ),
                ));
            }
        }
    }

    for item in &document.build_items {
        let target = item.path.as_deref().unwrap_or(&document.root_path);
        if !seen.contains(&(target, item.objectid)) {
            return Err(Error::malformed_model(
                &document.root_path,
                &format!("build item references missing object {}", item.objectid),
            ));
        }
    }

    Ok(())
}

/// Extract local name from potentially namespaced XML element name
///
/// - `"p:path"` returns `"path"`
/// - `"object"` returns `"object"`
pub(crate) fn get_local_name(name_str: &str) -> &str {
    if let Some(pos) = name_str.rfind(':') {
        &name_str[pos + 1..]
    } else {
        name_str
    }
}

/// Get an attribute value by its local name, regardless of namespace prefix
fn get_attr_by_local_name(attrs: &HashMap<String, String>, local_name: &str) -> Option<String> {
    attrs.iter().find_map(|(key, value)| {
        if get_local_name(key) == local_name {
            Some(value.clone())
        } else {
            None
        }
    })
}

/// Collect the attributes of an element
///
/// `on_error` turns a decoding problem into the error kind of the document
/// being parsed.
pub(crate) fn parse_attributes(
    e: &BytesStart,
    on_error: impl Fn(String) -> Error,
) -> Result<HashMap<String, String>> {
    let mut attrs = HashMap::with_capacity(8);

    for attr in e.attributes() {
        let attr = attr.map_err(|e| on_error(e.to_string()))?;
        let key = std::str::from_utf8(attr.key.as_ref()).map_err(|e| on_error(e.to_string()))?;
        let value = std::str::from_utf8(&attr.value).map_err(|e| on_error(e.to_string()))?;

        attrs.insert(key.to_string(), value.to_string());
    }

    Ok(attrs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opc::{Entry, MODEL_PATH};

    const ROOT: &str = r#"<model xmlns:p="http://schemas.microsoft.com/3dmanufacturing/production/2015/06">
  <resources>
    <object id="2" type="model">
      <components><component p:path="/3D/Objects/object_1.model" objectid="1"/></components>
    </object>
  </resources>
  <build><item objectid="2"/></build>
</model>"#;

    const OBJECT_PART: &str = r#"<model><resources><object id="1" type="model"><mesh>
<vertices><vertex x="0" y="0" z="0"/><vertex x="1" y="0" z="0"/><vertex x="0" y="1" z="0"/></vertices>
<triangles><triangle v1="0" v2="1" v3="2" paint_color="8"/></triangles>
</mesh></object></resources></model>"#;

    fn package(files: &[(&str, &str)]) -> Package {
        let mut package = Package::new();
        for (name, data) in files {
            package
                .push(Entry::new(*name, data.as_bytes().to_vec()))
                .unwrap();
        }
        package
    }

    #[test]
    fn test_parse_multi_part_document() {
        let package = package(&[
            (MODEL_PATH, ROOT),
            ("3D/Objects/object_1.model", OBJECT_PART),
            (SETTINGS_PATH, "{}"),
            ("Metadata/plate_1.png", "png"),
        ]);

        let document = parse_model_document(&package).unwrap();
        assert_eq!(document.root_path, MODEL_PATH);
        assert_eq!(document.parts.len(), 2);
        assert_eq!(document.objects.len(), 2);
        assert_eq!(document.triangle_count(), 1);
        assert_eq!(document.max_referenced_slot(), Some(1));
    }

    #[test]
    fn test_unreferenced_part_is_parsed() {
        let stray = OBJECT_PART.replace(r#"paint_color="8""#, r#"paint_color="3C""#);
        let package = package(&[
            (MODEL_PATH, ROOT),
            ("3D/Objects/object_1.model", OBJECT_PART),
            ("3D/Objects/object_9.model", stray.as_str()),
            ("3D/_rels/3dmodel.model.rels", "<Relationships/>"),
        ]);

        let document = parse_model_document(&package).unwrap();
        assert_eq!(document.objects.len(), 3);
        assert_eq!(document.max_referenced_slot(), Some(5));
    }

    #[test]
    fn test_broken_unreferenced_part_rejected() {
        let package = package(&[
            (MODEL_PATH, ROOT),
            ("3D/Objects/object_1.model", OBJECT_PART),
            ("3D/Objects/object_9.model", "<model><resources><object id=\"1\">"),
        ]);
        let err = parse_model_document(&package).unwrap_err();
        assert!(matches!(err, Error::MalformedModel(_)));
        assert!(err.to_string().contains("object_9.model"));
    }

    #[test]
    fn test_build_item_into_other_part() {
        let root = r#"<model xmlns:p="http://schemas.microsoft.com/3dmanufacturing/production/2015/06">
  <resources/>
  <build><item objectid="1" p:path="/3D/Objects/object_1.model"/></build>
</model>"#;
        let package = package(&[(MODEL_PATH, root), ("3D/Objects/object_1.model", OBJECT_PART)]);

        let document = parse_model_document(&package).unwrap();
        assert_eq!(document.build_items.len(), 1);
        assert_eq!(document.build_items[0].path.as_deref(), Some("3D/Objects/object_1.model"));
    }

    #[test]
    fn test_build_item_into_missing_part() {
        let root = r#"<model xmlns:p="http://schemas.microsoft.com/3dmanufacturing/production/2015/06">
  <resources/>
  <build><item objectid="1" p:path="/3D/Objects/gone.model"/></build>
</model>"#;
        let err = parse_model_document(&package(&[(MODEL_PATH, root)])).unwrap_err();
        assert!(err.to_string().contains("referenced model part is missing"));
    }

    #[test]
    fn test_component_to_missing_part() {
        let package = package(&[(MODEL_PATH, ROOT)]);
        let err = parse_model_document(&package).unwrap_err();
        assert!(matches!(err, Error::MalformedModel(_)));
        assert!(err.to_string().contains("referenced model part is missing"));
    }

    #[test]
    fn test_component_to_missing_object() {
        let other = OBJECT_PART.replace(r#"object id="1""#, r#"object id="5""#);
        let package = package(&[(MODEL_PATH, ROOT), ("3D/Objects/object_1.model", other.as_str())]);
        let err = parse_model_document(&package).unwrap_err();
        assert!(err.to_string().contains("references missing object 1"));
    }

    #[test]
    fn test_build_item_to_missing_object() {
        let root = r#"<model><resources/><build><item objectid="9"/></build></model>"#;
        let package = package(&[(MODEL_PATH, root)]);
        let err = parse_model_document(&package).unwrap_err();
        assert!(err.to_string().contains("build item references missing object 9"));
    }

    #[test]
    fn test_missing_root_part() {
        let package = package(&[(SETTINGS_PATH, "{}")]);
        let err = parse_model_document(&package).unwrap_err();
        assert!(matches!(err, Error::CorruptArchive(_)));
    }

    #[test]
    fn test_extract_filaments_prefers_settings() {
        let package = package(&[(
            SLICE_INFO_PATH,
            r##"<config><plate><filament id="1" type="ABS" color="#000000"/></plate></config>"##,
        )]);
        let settings =
            parse_settings(br##"{"filament_colour": ["#FF0000"], "filament_type": ["PETG"]}"##, SETTINGS_PATH)
                .unwrap();
        let list = extract_filaments(&package, &settings).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list.get(0).unwrap().material, "PETG");
    }

    #[test]
    fn test_extract_filaments_falls_back_to_slice_info() {
        let package = package(&[(
            SLICE_INFO_PATH,
            r##"<config><plate><filament id="2" type="ABS" color="#00FF00"/></plate></config>"##,
        )]);
        let settings = parse_settings(b"{}", SETTINGS_PATH).unwrap();
        let list = extract_filaments(&package, &settings).unwrap();
        assert_eq!(list.len(), 2);
        assert!(list.get(0).unwrap().placeholder);
        assert_eq!(list.get(1).unwrap().material, "ABS");
    }

    #[test]
    fn test_extract_filaments_none_declared() {
        let settings = parse_settings(b"{}", SETTINGS_PATH).unwrap();
        let err = extract_filaments(&Package::new(), &settings).unwrap_err();
        assert!(matches!(err, Error::MalformedSettings(_)));
    }

    #[test]
    fn test_get_local_name() {
        assert_eq!(get_local_name("p:path"), "path");
        assert_eq!(get_local_name("slic3rpe:mmu_segmentation"), "mmu_segmentation");
        assert_eq!(get_local_name("object"), "object");
    }
}

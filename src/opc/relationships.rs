//! Relationship discovery

use super::{MODEL_DIR, MODEL_PATH, Package, RELS_PATH, normalize_part_name};
use crate::error::{Error, Result};
use quick_xml::Reader;
use quick_xml::events::Event;

/// 3D model relationship type
pub const MODEL_REL_TYPE: &str = "http://schemas.microsoft.com/3dmanufacturing/2013/01/3dmodel";

/// Discover the root model path from the package relationships
///
/// Falls back to [`MODEL_PATH`] when the package has no `_rels/.rels` or
/// it declares no model relationship. The model must live under `3D/`,
/// because everything under that directory is transplanted as one unit.
pub fn discover_model_path(package: &Package) -> Result<String> {
    let Some(rels_content) = package.get_text(RELS_PATH) else {
        return Ok(MODEL_PATH.to_string());
    };

    let mut reader = Reader::from_str(rels_content);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                let name = e.name();
                let name_str = std::str::from_utf8(name.as_ref())
                    .map_err(|e| Error::CorruptArchive(e.to_string()))?;

                if name_str.ends_with("Relationship") {
                    let mut target = None;
                    let mut rel_type = None;

                    for attr in e.attributes() {
                        let attr = attr.map_err(|e| {
                            Error::CorruptArchive(format!("{}: {}", RELS_PATH, e))
                        })?;
                        let value = std::str::from_utf8(&attr.value)
                            .map_err(|e| Error::CorruptArchive(e.to_string()))?;

                        match attr.key.as_ref() {
                            b"Target" => target = Some(value.to_string()),
                            b"Type" => rel_type = Some(value.to_string()),
                            _ => {}
                        }
                    }

                    if let (Some(t), Some(rt)) = (target, rel_type) {
                        if rt == MODEL_REL_TYPE {
                            let path = normalize_part_name(&t).into_owned();
                            if !path.starts_with(MODEL_DIR) {
                                return Err(Error::CorruptArchive(format!(
                                    "Model relationship points outside {}: {}",
                                    MODEL_DIR, path
                                )));
                            }
                            return Ok(path);
                        }
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::CorruptArchive(format!("{}: {}", RELS_PATH, e)));
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(MODEL_PATH.to_string())
}

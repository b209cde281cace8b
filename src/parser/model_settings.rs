//! Per-object settings parsing
//!
//! `Metadata/model_settings.config` assigns an extruder to each object and
//! optionally to each part (volume) of it:
//!
//! ```xml
//! <config>
//!   <object id="2">
//!     <metadata key="extruder" value="1"/>
//!     <part id="1" subtype="normal_part">
//!       <metadata key="extruder" value="3"/>
//!     </part>
//!   </object>
//! </config>
//! ```

use super::{get_local_name, parse_attributes};
use crate::error::{Error, Result};
use crate::model::FilamentAssignment;
use crate::opc::MODEL_SETTINGS_PATH;
use quick_xml::Reader;
use quick_xml::events::Event;

const EXTRUDER_KEY: &str = "extruder";

/// Read filament assignments; extruder `0` means "inherit" and is skipped
pub(crate) fn parse_model_settings(xml: &str) -> Result<Vec<FilamentAssignment>> {
    let err = |message: String| Error::malformed_model(MODEL_SETTINGS_PATH, &message);

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut assignments = Vec::new();
    let mut current_object: Option<usize> = None;
    let mut current_part: Option<usize> = None;

    loop {
        let event_result = reader.read_event_into(&mut buf);
        let is_empty_element = matches!(&event_result, Ok(Event::Empty(_)));

        match event_result {
            Ok(Event::DocType(_)) => {
                return Err(err("DTD declarations are not allowed".to_string()));
            }
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                let name = e.name();
                let name_str =
                    std::str::from_utf8(name.as_ref()).map_err(|e| err(e.to_string()))?;

                match get_local_name(name_str) {
                    "object" if !is_empty_element => {
                        let attrs = parse_attributes(e, err)?;
                        current_object = attrs.get("id").and_then(|id| id.trim().parse().ok());
                    }
                    "part" if !is_empty_element && current_object.is_some() => {
                        let attrs = parse_attributes(e, err)?;
                        current_part = attrs.get("id").and_then(|id| id.trim().parse().ok());
                    }
                    "metadata" => {
                        let Some(object_id) = current_object else {
                            buf.clear();
                            continue;
                        };
                        let attrs = parse_attributes(e, err)?;
                        if attrs.get("key").map(String::as_str) != Some(EXTRUDER_KEY) {
                            buf.clear();
                            continue;
                        }
                        let value = attrs.get("value").map(String::as_str).unwrap_or("0");
                        let extruder: usize = value.trim().parse().map_err(|_| {
                            err(format!(
                                "object {} has invalid extruder '{}'",
                                object_id, value
                            ))
                        })?;
                        if extruder > 0 {
                            assignments.push(FilamentAssignment {
                                object_id,
                                part_id: current_part,
                                slot: extruder - 1,
                            });
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::End(ref e)) => {
                let name = e.name();
                let name_str =
                    std::str::from_utf8(name.as_ref()).map_err(|e| err(e.to_string()))?;
                match get_local_name(name_str) {
                    "object" => {
                        current_object = None;
                        current_part = None;
                    }
                    "part" => current_part = None,
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(err(format!(
                    "XML error at position {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(assignments)
}

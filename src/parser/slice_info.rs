//! Slice summary parsing

use super::{get_local_name, parse_attributes};
use crate::error::{Error, Result};
use crate::model::{FilamentSlot, MAX_FILAMENTS, PLACEHOLDER_COLOUR};
use crate::opc::SLICE_INFO_PATH;
use quick_xml::Reader;
use quick_xml::events::Event;
use std::collections::BTreeMap;

/// Filament slots listed by `<filament id=".." type=".." color=".."/>`
///
/// Ids are 1-based extruder numbers. The summary only lists filaments that
/// were used, so ids missing below the highest one become placeholder slots
/// to keep every slot at its extruder position.
pub(crate) fn filaments_from_slice_info(xml: &str) -> Result<Vec<FilamentSlot>> {
    let err = |message: String| Error::malformed_settings(SLICE_INFO_PATH, &message);

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut declared: BTreeMap<usize, FilamentSlot> = BTreeMap::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::DocType(_)) => {
                return Err(err("DTD declarations are not allowed".to_string()));
            }
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                let name = e.name();
                let name_str =
                    std::str::from_utf8(name.as_ref()).map_err(|e| err(e.to_string()))?;

                if get_local_name(name_str) == "filament" {
                    let attrs = parse_attributes(e, err)?;
                    let id = attrs
                        .get("id")
                        .and_then(|id| id.trim().parse::<usize>().ok())
                        .filter(|&id| id > 0)
                        .ok_or_else(|| err("filament without a valid id".to_string()))?;
                    let material = attrs.get("type").map(String::as_str).unwrap_or_default();
                    let colour = attrs.get("color").map(String::as_str).unwrap_or_default();
                    declared
                        .entry(id)
                        .or_insert_with(|| FilamentSlot::new(id - 1, material, colour));
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

    let Some(&max_id) = declared.keys().next_back() else {
        return Ok(Vec::new());
    };
    if max_id > MAX_FILAMENTS {
        return Err(Error::TooManyFilaments {
            count: max_id,
            max: MAX_FILAMENTS,
        });
    }

    Ok((1..=max_id)
        .map(|id| {
            declared.remove(&id).unwrap_or_else(|| FilamentSlot {
                placeholder: true,
                ..FilamentSlot::new(id - 1, "", PLACEHOLDER_COLOUR)
            })
        })
        .collect())
}

//! Model part parsing
//!
//! Reads objects, mesh sizes, components, build items and triangle paint
//! from one model part. Vertex coordinates are skipped.

use super::{XML_BUFFER_CAPACITY, get_attr_by_local_name, get_local_name, parse_attributes, paint};
use crate::error::{Error, Result};
use crate::model::{BuildItem, Component, Mesh, ModelObject, ObjectType, TrianglePaint};
use crate::opc::normalize_part_name;
use quick_xml::Reader;
use quick_xml::events::Event;
use std::collections::HashMap;

/// Paint attribute written by Bambu Studio and Orca Slicer
const PAINT_ATTR: &str = "paint_color";

/// Paint attribute written by PrusaSlicer (`slic3rpe:mmu_segmentation`)
const LEGACY_PAINT_ATTR: &str = "mmu_segmentation";

/// Objects and build items of one model part
#[derive(Debug, Default)]
pub(crate) struct ParsedPart {
    pub objects: Vec<ModelObject>,
    pub build_items: Vec<BuildItem>,
}

/// Parse one model part
pub(crate) fn parse_model_part(part: &str, xml: &str) -> Result<ParsedPart> {
    let err = |message: String| Error::malformed_model(part, &message);

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::with_capacity(XML_BUFFER_CAPACITY);
    let mut parsed = ParsedPart::default();
    let mut current_object: Option<ModelObject> = None;
    let mut current_mesh: Option<Mesh> = None;
    let mut in_build = false;

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
                    "object" => {
                        if current_object.is_some() {
                            return Err(err("nested object element".to_string()));
                        }
                        let attrs = parse_attributes(e, err)?;
                        let object = parse_object(part, &attrs).map_err(err)?;
                        if is_empty_element {
                            parsed.objects.push(object);
                        } else {
                            current_object = Some(object);
                        }
                    }
                    "mesh" if current_object.is_some() => {
                        let mesh = Mesh::default();
                        if is_empty_element {
                            if let Some(object) = current_object.as_mut() {
                                object.mesh = Some(mesh);
                            }
                        } else {
                            current_mesh = Some(mesh);
                        }
                    }
                    "vertex" => {
                        if let Some(mesh) = current_mesh.as_mut() {
                            mesh.vertex_count += 1;
                        }
                    }
                    "triangle" => {
                        if let (Some(mesh), Some(object)) =
                            (current_mesh.as_mut(), current_object.as_mut())
                        {
                            let attrs = parse_attributes(e, err)?;
                            parse_triangle(mesh, object, &attrs).map_err(err)?;
                        }
                    }
                    "component" => {
                        if let Some(object) = current_object.as_mut() {
                            let attrs = parse_attributes(e, err)?;
                            let component = parse_component(&attrs).map_err(err)?;
                            object.components.push(component);
                        }
                    }
                    "build" => in_build = !is_empty_element,
                    "item" if in_build => {
                        let attrs = parse_attributes(e, err)?;
                        let item = parse_build_item(&attrs).map_err(err)?;
                        parsed.build_items.push(item);
                    }
                    _ => {}
                }
            }
            Ok(Event::End(ref e)) => {
                let name = e.name();
                let name_str =
                    std::str::from_utf8(name.as_ref()).map_err(|e| err(e.to_string()))?;

                match get_local_name(name_str) {
                    "mesh" => {
                        if let (Some(mesh), Some(object)) =
                            (current_mesh.take(), current_object.as_mut())
                        {
                            object.mesh = Some(mesh);
                        }
                    }
                    "object" => {
                        if let Some(object) = current_object.take() {
                            parsed.objects.push(object);
                        }
                    }
                    "build" => in_build = false,
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

    if current_object.is_some() {
        return Err(err("unexpected end of document inside an object".to_string()));
    }

    Ok(parsed)
}

fn parse_object(part: &str, attrs: &HashMap<String, String>) -> std::result::Result<ModelObject, String> {
    let id = required_index(attrs, "id", "object")?;
    let mut object = ModelObject::new(part, id);
    object.name = attrs.get("name").cloned();
    if let Some(type_str) = attrs.get("type") {
        object.object_type = ObjectType::from_attr(type_str);
    }
    Ok(object)
}

fn parse_triangle(
    mesh: &mut Mesh,
    object: &mut ModelObject,
    attrs: &HashMap<String, String>,
) -> std::result::Result<(), String> {
    let index = mesh.triangle_count;

    for key in ["v1", "v2", "v3"] {
        let vertex = required_index(attrs, key, "triangle")?;
        if vertex >= mesh.vertex_count {
            return Err(format!(
                "object {} triangle {} references vertex {} but the mesh has {} vertices",
                object.id, index, vertex, mesh.vertex_count
            ));
        }
    }

    let code = get_attr_by_local_name(attrs, PAINT_ATTR)
        .or_else(|| get_attr_by_local_name(attrs, LEGACY_PAINT_ATTR));
    if let Some(code) = code.filter(|c| !c.trim().is_empty()) {
        let slots = paint::decode_slots(&code)
            .map_err(|e| format!("object {} triangle {}: {}", object.id, index, e))?;
        object.paint.push(TrianglePaint {
            triangle: index,
            code,
            slots,
        });
    }

    mesh.triangle_count += 1;
    Ok(())
}

fn parse_component(attrs: &HashMap<String, String>) -> std::result::Result<Component, String> {
    Ok(Component {
        objectid: required_index(attrs, "objectid", "component")?,
        path: get_attr_by_local_name(attrs, "path").map(|p| normalize_part_name(&p).into_owned()),
    })
}

fn parse_build_item(attrs: &HashMap<String, String>) -> std::result::Result<BuildItem, String> {
    Ok(BuildItem {
        objectid: required_index(attrs, "objectid", "item")?,
        path: get_attr_by_local_name(attrs, "path").map(|p| normalize_part_name(&p).into_owned()),
    })
}

fn required_index(
    attrs: &HashMap<String, String>,
    key: &str,
    element: &str,
) -> std::result::Result<usize, String> {
    let value = attrs
        .get(key)
        .ok_or_else(|| format!("{} missing {} attribute", element, key))?;
    value
        .trim()
        .parse::<usize>()
        .map_err(|_| format!("{} has invalid {} '{}'", element, key, value))
}

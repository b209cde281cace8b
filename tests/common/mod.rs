//! Shared fixtures for integration tests
//!
//! Builds Bambu-style source projects and U1 templates in memory with
//! `zip::ZipWriter`, shaped like what the slicers export.

#![allow(dead_code)]

use serde_json::{Value, json};
use std::io::{Cursor, Read, Write};
use u1convert::{Converter, RemapTable, TemplateSet};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
 <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
 <Default Extension="model" ContentType="application/vnd.ms-package.3dmanufacturing-3dmodel+xml"/>
 <Default Extension="png" ContentType="image/png"/>
</Types>"#;

pub const RELS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
 <Relationship Target="/3D/3dmodel.model" Id="rel-1" Type="http://schemas.microsoft.com/3dmanufacturing/2013/01/3dmodel"/>
 <Relationship Target="/Metadata/plate_1.png" Id="rel-2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/thumbnail"/>
</Relationships>"#;

pub const OBJECT_PART_PATH: &str = "3D/Objects/object_1.model";
pub const TEMPLATE_THUMBNAIL: &[u8] = b"\x89PNG U1 template thumbnail";
pub const SOURCE_THUMBNAIL: &[u8] = b"\x89PNG bambu thumbnail";

/// One declared source filament
#[derive(Debug, Clone)]
pub struct Filament {
    pub colour: &'static str,
    pub material: &'static str,
    pub vendor: &'static str,
}

pub const fn filament(colour: &'static str, material: &'static str, vendor: &'static str) -> Filament {
    Filament {
        colour,
        material,
        vendor,
    }
}

/// Builder for a Bambu Studio project
#[derive(Debug, Clone)]
pub struct SourceProject {
    pub filaments: Vec<Filament>,
    pub paint: Vec<&'static str>,
    pub extruders: Vec<(usize, usize)>,
    pub enable_support: &'static str,
    pub overridden: Option<Vec<&'static str>>,
}

impl Default for SourceProject {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceProject {
    /// Two filaments (red PLA, blue PETG), support off, both colours painted
    pub fn new() -> Self {
        Self {
            filaments: vec![
                filament("#FF0000", "PLA", "Bambu Lab"),
                filament("#0000FF", "PETG", "Bambu Lab"),
            ],
            paint: vec!["4", "8", "", "841"],
            extruders: vec![(2, 1)],
            enable_support: "0",
            overridden: Some(vec!["wall_loops;sparse_infill_density", ""]),
        }
    }

    pub fn with_filaments(mut self, filaments: Vec<Filament>) -> Self {
        self.filaments = filaments;
        self
    }

    pub fn with_paint(mut self, paint: Vec<&'static str>) -> Self {
        self.paint = paint;
        self
    }

    pub fn with_extruders(mut self, extruders: Vec<(usize, usize)>) -> Self {
        self.extruders = extruders;
        self
    }

    /// Support on, and flagged as a user override
    pub fn with_support(mut self) -> Self {
        self.enable_support = "1";
        self.overridden = Some(vec!["enable_support;support_type", ""]);
        self
    }

    /// No `different_settings_to_system` key at all
    pub fn without_overridden_list(mut self) -> Self {
        self.overridden = None;
        self
    }

    pub fn root_model(&self) -> String {
        r#"<?xml version="1.0" encoding="UTF-8"?>
<model unit="millimeter" xml:lang="en-US" xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02" xmlns:BambuStudio="http://schemas.bambulab.com/package/2021" xmlns:p="http://schemas.microsoft.com/3dmanufacturing/production/2015/06" requiredextensions="p">
 <metadata name="Application">BambuStudio-01.09.07.52</metadata>
 <resources>
  <object id="2" p:UUID="00000001-61cb-4c03-9d28-80fed5dfa1dc" type="model">
   <components>
    <component p:path="/3D/Objects/object_1.model" objectid="1" p:UUID="00010000-b206-40ff-9872-83e8017abed1" transform="1 0 0 0 1 0 0 0 1 0 0 0"/>
   </components>
  </object>
 </resources>
 <build p:UUID="2c7c17d8-22b5-4d84-8835-1976022ea369">
  <item objectid="2" p:UUID="00000002-b1ec-4553-aec9-835e5b724bb4" transform="1 0 0 0 1 0 0 0 1 128 128 10" printable="1"/>
 </build>
</model>"#
            .to_string()
    }

    /// Mesh part with one triangle per paint code (empty code = unpainted)
    pub fn object_part(&self) -> String {
        const FACES: [(usize, usize, usize); 4] = [(0, 2, 1), (0, 1, 3), (1, 2, 3), (0, 3, 2)];
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<model unit="millimeter" xml:lang="en-US" xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02" xmlns:BambuStudio="http://schemas.bambulab.com/package/2021" xmlns:p="http://schemas.microsoft.com/3dmanufacturing/production/2015/06" requiredextensions="p">
 <resources>
  <object id="1" p:UUID="00010000-81cb-4c03-9d28-80fed5dfa1dc" type="model">
   <mesh>
    <vertices>
     <vertex x="0" y="0" z="0"/>
     <vertex x="20" y="0" z="0"/>
     <vertex x="0" y="20" z="0"/>
     <vertex x="0" y="0" z="20"/>
    </vertices>
    <triangles>
"#,
        );
        for (i, code) in self.paint.iter().enumerate() {
            let (v1, v2, v3) = FACES[i % FACES.len()];
            if code.is_empty() {
                xml.push_str(&format!(
                    "     <triangle v1=\"{}\" v2=\"{}\" v3=\"{}\"/>\n",
                    v1, v2, v3
                ));
            } else {
                xml.push_str(&format!(
                    "     <triangle v1=\"{}\" v2=\"{}\" v3=\"{}\" paint_color=\"{}\"/>\n",
                    v1, v2, v3, code
                ));
            }
        }
        xml.push_str("    </triangles>\n   </mesh>\n  </object>\n </resources>\n <build/>\n</model>\n");
        xml
    }

    pub fn model_settings(&self) -> String {
        let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<config>\n");
        for (object_id, extruder) in &self.extruders {
            xml.push_str(&format!(
                "  <object id=\"{}\">\n    <metadata key=\"name\" value=\"cube.stl\"/>\n    <metadata key=\"extruder\" value=\"{}\"/>\n    <part id=\"1\" subtype=\"normal_part\">\n      <metadata key=\"name\" value=\"cube.stl\"/>\n    </part>\n  </object>\n",
                object_id, extruder
            ));
        }
        xml.push_str("  <plate>\n    <metadata key=\"plater_id\" value=\"1\"/>\n  </plate>\n</config>\n");
        xml
    }

    pub fn settings(&self) -> Value {
        let mut settings = json!({
            "printer_model": "Bambu Lab X1 Carbon",
            "printer_settings_id": "Bambu Lab X1 Carbon 0.4 nozzle",
            "print_settings_id": "0.20mm Standard @BBL X1C",
            "layer_height": "0.2",
            "wall_loops": "3",
            "sparse_infill_density": "25%",
            "enable_support": self.enable_support,
            "support_type": "tree(auto)",
            "filament_colour": self.filaments.iter().map(|f| f.colour).collect::<Vec<_>>(),
            "filament_type": self.filaments.iter().map(|f| f.material).collect::<Vec<_>>(),
            "filament_vendor": self.filaments.iter().map(|f| f.vendor).collect::<Vec<_>>(),
            "filament_settings_id": self
                .filaments
                .iter()
                .map(|f| format!("{} {} @BBL X1C", f.vendor, f.material))
                .collect::<Vec<_>>(),
            "filament_diameter": vec!["1.75"; self.filaments.len()],
            "nozzle_temperature": vec!["220"; self.filaments.len()],
        });
        if let Some(ref overridden) = self.overridden {
            settings["different_settings_to_system"] = json!(overridden);
        }
        settings
    }

    pub fn slice_info(&self) -> String {
        let mut xml = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<config>\n  <header>\n    <header_item key=\"X-BBL-Client-Type\" value=\"slicer\"/>\n  </header>\n  <plate>\n    <metadata key=\"index\" value=\"1\"/>\n    <metadata key=\"printer_model_id\" value=\"BL-P001\"/>\n",
        );
        for (i, f) in self.filaments.iter().enumerate() {
            xml.push_str(&format!(
                "    <filament id=\"{}\" type=\"{}\" color=\"{}\" used_m=\"1.00\" used_g=\"3.00\"/>\n",
                i + 1,
                f.material,
                f.colour
            ));
        }
        xml.push_str("  </plate>\n</config>\n");
        xml
    }

    pub fn build(&self) -> Vec<u8> {
        let settings = pretty(&self.settings());
        zip_bytes(&[
            ("[Content_Types].xml", CONTENT_TYPES.as_bytes(), CompressionMethod::Deflated),
            ("_rels/.rels", RELS.as_bytes(), CompressionMethod::Deflated),
            ("3D/3dmodel.model", self.root_model().as_bytes(), CompressionMethod::Deflated),
            (
                "3D/_rels/3dmodel.model.rels",
                br#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Target="/3D/Objects/object_1.model" Id="rel-1" Type="http://schemas.microsoft.com/3dmanufacturing/2013/01/3dmodel"/></Relationships>"#,
                CompressionMethod::Deflated,
            ),
            (OBJECT_PART_PATH, self.object_part().as_bytes(), CompressionMethod::Deflated),
            ("Metadata/plate_1.png", SOURCE_THUMBNAIL, CompressionMethod::Stored),
            ("Metadata/project_settings.config", settings.as_bytes(), CompressionMethod::Deflated),
            ("Metadata/model_settings.config", self.model_settings().as_bytes(), CompressionMethod::Deflated),
            ("Metadata/slice_info.config", self.slice_info().as_bytes(), CompressionMethod::Deflated),
        ])
    }
}

/// Settings document of a U1 template
pub fn template_settings(support: bool) -> Value {
    json!({
        "printer_model": "Snapmaker U1",
        "printer_settings_id": "Snapmaker U1 (0.4 nozzle)",
        "print_settings_id": "0.20mm Standard @Snapmaker U1",
        "layer_height": "0.2",
        "enable_support": if support { "1" } else { "0" },
        "filament_colour": ["#FFFFFF"],
        "filament_type": ["PLA"],
        "filament_settings_id": ["Snapmaker PLA SnapSpeed @U1"],
        "filament_diameter": ["1.75"],
        "nozzle_temperature": ["220", "220", "220", "220"],
        "different_settings_to_system": [if support { "enable_support" } else { "" }, "", ""],
    })
}

/// A U1 template project
pub fn template(support: bool) -> Vec<u8> {
    let settings = pretty(&template_settings(support));
    zip_bytes(&[
        ("[Content_Types].xml", CONTENT_TYPES.as_bytes(), CompressionMethod::Deflated),
        ("_rels/.rels", RELS.as_bytes(), CompressionMethod::Deflated),
        (
            "3D/3dmodel.model",
            br#"<?xml version="1.0" encoding="UTF-8"?><model unit="millimeter" xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02"><resources/><build/></model>"#,
            CompressionMethod::Deflated,
        ),
        ("Metadata/plate_1.png", TEMPLATE_THUMBNAIL, CompressionMethod::Stored),
        ("Metadata/project_settings.config", settings.as_bytes(), CompressionMethod::Deflated),
        ("Metadata/model_settings.config", b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<config/>\n", CompressionMethod::Deflated),
        (
            "Metadata/slice_info.config",
            b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<config><plate><metadata key=\"printer_model_id\" value=\"Snapmaker U1\"/></plate></config>\n",
            CompressionMethod::Deflated,
        ),
    ])
}

/// A reference project listing the available U1 filament profiles
pub fn profile_package() -> Vec<u8> {
    let settings = pretty(&json!({
        "printer_model": "Snapmaker U1",
        "filament_type": ["PLA", "PETG", "ABS", "TPU", "PLA"],
        "filament_settings_id": [
            "Snapmaker PLA SnapSpeed @U1",
            "Snapmaker PETG HF",
            "Generic ABS",
            "Generic TPU",
            "Snapmaker PLA Silk @U1"
        ],
        "filament_vendor": ["Snapmaker", "Snapmaker", "Generic", "Generic", "Snapmaker"],
    }));
    zip_bytes(&[("Metadata/project_settings.config", settings.as_bytes(), CompressionMethod::Deflated)])
}

/// Converter with both fixture templates and the built-in remap table
pub fn converter() -> Converter {
    let templates = TemplateSet::from_bytes(&template(false), &template(true))
        .expect("fixture templates load");
    Converter::new(templates, RemapTable::builtin())
}

pub fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).expect("fixture JSON serializes")
}

pub fn zip_bytes(files: &[(&str, &[u8], CompressionMethod)]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data, method) in files {
        let options = SimpleFileOptions::default().compression_method(*method);
        zip.start_file(*name, options).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

/// Every entry of an archive: name, content, compression method
pub fn entries(bytes: &[u8]) -> Vec<(String, Vec<u8>, CompressionMethod)> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    (0..archive.len())
        .map(|i| {
            let mut file = archive.by_index(i).unwrap();
            let mut data = Vec::new();
            file.read_to_end(&mut data).unwrap();
            (file.name().to_string(), data, file.compression())
        })
        .collect()
}

pub fn entry(bytes: &[u8], name: &str) -> Option<Vec<u8>> {
    entries(bytes)
        .into_iter()
        .find(|(n, _, _)| n == name)
        .map(|(_, data, _)| data)
}

pub fn output_settings(bytes: &[u8]) -> Value {
    let data = entry(bytes, "Metadata/project_settings.config").expect("settings entry present");
    serde_json::from_slice(&data).expect("settings are JSON")
}

pub fn string_list(value: &Value, key: &str) -> Vec<String> {
    value[key]
        .as_array()
        .unwrap_or_else(|| panic!("{} is a list", key))
        .iter()
        .map(|v| v.as_str().unwrap_or_default().to_string())
        .collect()
}

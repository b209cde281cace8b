//! Parsed model document
//!
//! The model document is carried through a conversion as raw bytes. The
//! structures here are the parsed view used to validate it and to find out
//! which filament slots it references; they are never serialized back.

use crate::opc::Entry;
use std::collections::BTreeSet;

/// The geometry side of a project
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelDocument {
    /// Raw model parts in source archive order
    pub parts: Vec<Entry>,
    /// Path of the root model part
    pub root_path: String,
    /// Objects of every parsed model part
    pub objects: Vec<ModelObject>,
    /// Build items of the root part
    pub build_items: Vec<BuildItem>,
    /// Object- and part-level filament assignments
    pub assignments: Vec<FilamentAssignment>,
}

impl ModelDocument {
    /// Find an object by the part it is defined in and its id
    pub fn object(&self, part: &str, id: usize) -> Option<&ModelObject> {
        self.objects.iter().find(|o| o.part == part && o.id == id)
    }

    /// Total number of triangles across all meshes
    pub fn triangle_count(&self) -> usize {
        self.objects
            .iter()
            .filter_map(|o| o.mesh.as_ref())
            .map(|m| m.triangle_count)
            .sum()
    }

    /// Number of triangles carrying paint data
    pub fn painted_triangle_count(&self) -> usize {
        self.objects.iter().map(|o| o.paint.len()).sum()
    }

    /// Every 0-based filament slot referenced by paint or assignments
    pub fn referenced_slots(&self) -> BTreeSet<usize> {
        let mut slots: BTreeSet<usize> = self
            .objects
            .iter()
            .flat_map(|o| o.paint.slots())
            .collect();
        slots.extend(self.assignments.iter().map(|a| a.slot));
        slots
    }

    /// Highest referenced 0-based slot
    pub fn max_referenced_slot(&self) -> Option<usize> {
        self.referenced_slots().last().copied()
    }
}

/// Type of an object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObjectType {
    /// A standard model object
    #[default]
    Model,
    /// A support structure
    Support,
    /// A solid support structure
    SolidSupport,
    /// A surface object
    Surface,
    /// Other types
    Other,
}

impl ObjectType {
    /// Parse the `type` attribute of an object
    pub fn from_attr(value: &str) -> Self {
        match value {
            "model" => ObjectType::Model,
            "support" => ObjectType::Support,
            "solidsupport" => ObjectType::SolidSupport,
            "surface" => ObjectType::Surface,
            _ => ObjectType::Other,
        }
    }
}

/// An object from one model part
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelObject {
    /// Model part the object is defined in
    pub part: String,
    /// Object ID, unique within its part
    pub id: usize,
    /// Optional object name
    pub name: Option<String>,
    /// Object type
    pub object_type: ObjectType,
    /// Mesh summary, if the object has a mesh
    pub mesh: Option<Mesh>,
    /// Components referencing other objects
    pub components: Vec<Component>,
    /// Painted triangles of the mesh
    pub paint: PaintMap,
}

impl ModelObject {
    /// Create an object defined in `part`
    pub fn new(part: impl Into<String>, id: usize) -> Self {
        Self {
            part: part.into(),
            id,
            ..Self::default()
        }
    }
}

/// Size of a mesh
///
/// Coordinates are not retained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Mesh {
    /// Number of vertices
    pub vertex_count: usize,
    /// Number of triangles
    pub triangle_count: usize,
}

/// A reference from an object to another object, possibly in another part
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    /// Referenced object id
    pub objectid: usize,
    /// Part holding the referenced object; `None` means the same part
    pub path: Option<String>,
}

/// A build item placing an object on the plate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildItem {
    /// Object placed by this item
    pub objectid: usize,
    /// Part holding the object; `None` means the root part
    pub path: Option<String>,
}

/// Paint data of one triangle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrianglePaint {
    /// Triangle index within the mesh
    pub triangle: usize,
    /// Raw paint code as stored in the part
    pub code: String,
    /// 0-based filament slots the code paints with
    pub slots: BTreeSet<usize>,
}

/// Per-triangle paint data of one mesh
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaintMap {
    triangles: Vec<TrianglePaint>,
}

impl PaintMap {
    /// Record paint for a triangle
    pub fn push(&mut self, paint: TrianglePaint) {
        self.triangles.push(paint);
    }

    /// Painted triangles in mesh order
    pub fn triangles(&self) -> &[TrianglePaint] {
        &self.triangles
    }

    /// Number of painted triangles
    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    /// Whether no triangle is painted
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Union of the slots painted on this mesh
    pub fn slots(&self) -> BTreeSet<usize> {
        self.triangles
            .iter()
            .flat_map(|t| t.slots.iter().copied())
            .collect()
    }
}

/// A filament slot assigned to a whole object or one of its parts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilamentAssignment {
    /// Object id in the root model part
    pub object_id: usize,
    /// Part (volume) id within the object, `None` for the object itself
    pub part_id: Option<usize>,
    /// 0-based filament slot
    pub slot: usize,
}

/// In-memory view of a `project.pbxproj` descriptor
///
/// `Project` keeps the original text next to the parsed tree. All lookups go
/// through the object index; nothing here mutates the text.

use std::collections::HashMap;

use crate::constants::isa;
use crate::error::DescriptorError;
use crate::lexer::Span;
use crate::object_id::ObjectId;
use crate::parser::{parse, Array, Dict, Entry, Value};

/// One record from the `objects` dictionary
#[derive(Debug, Clone)]
pub struct PbxObject {
    id: ObjectId,
    isa: String,
    entry: Entry,
}

impl PbxObject {
    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    pub fn isa(&self) -> &str {
        &self.isa
    }

    /// Span of the whole `ID = { ... };` entry
    pub fn span(&self) -> Span {
        self.entry.span
    }

    pub fn body(&self) -> Option<&Dict> {
        self.entry.value.as_dict()
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.body().and_then(|body| body.get(key))
    }

    pub fn string(&self, key: &str) -> Option<&str> {
        self.field(key).and_then(Value::as_str)
    }

    pub fn array(&self, key: &str) -> Option<&Array> {
        self.field(key).and_then(Value::as_array)
    }

    pub fn dict(&self, key: &str) -> Option<&Dict> {
        self.field(key).and_then(Value::as_dict)
    }

    /// What Xcode shows for the record: `name`, falling back to `path`
    pub fn display_name(&self) -> Option<&str> {
        self.string("name").or_else(|| self.string("path"))
    }

    /// Label of a build phase as it appears in the target's phase list
    pub fn phase_label(&self) -> Option<&str> {
        if let Some(name) = self.string("name") {
            return Some(name);
        }
        match self.isa.as_str() {
            isa::SOURCES_PHASE => Some("Sources"),
            isa::FRAMEWORKS_PHASE => Some("Frameworks"),
            isa::RESOURCES_PHASE => Some("Resources"),
            isa::HEADERS_PHASE => Some("Headers"),
            isa::SHELL_SCRIPT_PHASE => Some("ShellScript"),
            isa::COPY_FILES_PHASE => Some("CopyFiles"),
            _ => None,
        }
    }
}

/// Byte spans of the `Begin`/`End` comments around one section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionBounds {
    pub begin: Span,
    pub end: Span,
}

#[derive(Debug, Clone)]
pub struct Project {
    source: String,
    root: Dict,
    objects_span: Span,
    objects: Vec<PbxObject>,
    index: HashMap<ObjectId, usize>,
    duplicates: Vec<ObjectId>,
    sections: Vec<(String, SectionBounds)>,
}

impl Project {
    pub fn parse(source: impl Into<String>) -> Result<Self, DescriptorError> {
        let source = source.into();
        let document = parse(&source)?;

        let objects_dict = document
            .root
            .get("objects")
            .and_then(Value::as_dict)
            .ok_or(DescriptorError::MissingObjects)?
            .clone();

        let mut objects = Vec::with_capacity(objects_dict.entries.len());
        let mut index = HashMap::new();
        let mut duplicates = Vec::new();

        for entry in objects_dict.entries {
            let id = ObjectId::new(entry.key.value.clone());
            let isa = entry
                .value
                .as_dict()
                .and_then(|body| body.get_str("isa"))
                .unwrap_or_default()
                .to_string();

            if index.contains_key(&id) {
                duplicates.push(id.clone());
            } else {
                index.insert(id.clone(), objects.len());
            }
            objects.push(PbxObject { id, isa, entry });
        }

        let mut sections = Vec::new();
        let mut open: HashMap<&str, Span> = HashMap::new();
        for marker in &document.markers {
            if marker.begin {
                open.insert(marker.isa.as_str(), marker.span);
            } else if let Some(begin) = open.remove(marker.isa.as_str()) {
                sections.push((
                    marker.isa.clone(),
                    SectionBounds {
                        begin,
                        end: marker.span,
                    },
                ));
            }
        }

        Ok(Project {
            objects_span: objects_dict.span,
            root: document.root,
            objects,
            index,
            duplicates,
            sections,
            source,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Span of the `objects` dictionary, braces included
    pub fn objects_span(&self) -> Span {
        self.objects_span
    }

    pub fn objects(&self) -> &[PbxObject] {
        &self.objects
    }

    pub fn ids(&self) -> impl Iterator<Item = &ObjectId> {
        self.objects.iter().map(PbxObject::id)
    }

    /// Identifiers that appear more than once in `objects`
    pub fn duplicates(&self) -> &[ObjectId] {
        &self.duplicates
    }

    pub fn object(&self, id: &str) -> Option<&PbxObject> {
        self.index
            .get(&ObjectId::from(id))
            .map(|&i| &self.objects[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(&ObjectId::from(id))
    }

    pub fn objects_of<'a>(&'a self, isa: &'a str) -> impl Iterator<Item = &'a PbxObject> + 'a {
        self.objects.iter().filter(move |o| o.isa == isa)
    }

    pub fn section(&self, isa: &str) -> Option<SectionBounds> {
        self.sections
            .iter()
            .find(|(name, _)| name == isa)
            .map(|(_, bounds)| *bounds)
    }

    pub fn sections(&self) -> impl Iterator<Item = (&str, SectionBounds)> {
        self.sections.iter().map(|(name, b)| (name.as_str(), *b))
    }

    pub fn root_object_id(&self) -> Option<&str> {
        self.root.get_str("rootObject")
    }

    pub fn root_object(&self) -> Option<&PbxObject> {
        self.root_object_id().and_then(|id| self.object(id))
    }

    pub fn main_group(&self) -> Option<&PbxObject> {
        self.root_object()
            .and_then(|project| project.string("mainGroup"))
            .and_then(|id| self.object(id))
    }

    /// First group whose `name` (or, lacking one, `path`) equals `name`
    pub fn group_named(&self, name: &str) -> Option<&PbxObject> {
        self.objects_of(isa::GROUP)
            .find(|g| g.display_name() == Some(name))
    }

    /// Walk a `Shared/Services` style path down from the main group
    ///
    /// Returns the deepest group reached together with the components that
    /// could not be resolved below it.
    pub fn group_at_path<'a>(&self, path: &'a str) -> Option<(&PbxObject, Vec<&'a str>)> {
        let mut group = self.main_group()?;
        let mut components = path.split('/').filter(|c| !c.is_empty()).peekable();

        while let Some(&component) = components.peek() {
            let child = group
                .array("children")
                .into_iter()
                .flat_map(|children| children.strings())
                .filter_map(|id| self.object(id))
                .find(|child| child.isa == isa::GROUP && child.display_name() == Some(component));
            match child {
                Some(child) => {
                    group = child;
                    components.next();
                }
                None => break,
            }
        }

        Some((group, components.collect()))
    }

    /// Group at `path` below the main group, when every component exists
    pub fn group_by_path(&self, path: &str) -> Option<&PbxObject> {
        match self.group_at_path(path)? {
            (group, rest) if rest.is_empty() => Some(group),
            _ => None,
        }
    }

    /// Native targets in the order the project lists them
    pub fn targets(&self) -> Vec<&PbxObject> {
        let listed: Vec<&PbxObject> = self
            .root_object()
            .and_then(|project| project.array("targets"))
            .map(|targets| targets.strings().filter_map(|id| self.object(id)).collect())
            .unwrap_or_default();

        if listed.is_empty() {
            self.objects_of(isa::NATIVE_TARGET).collect()
        } else {
            listed
        }
    }

    /// Target by exact name, or the first target whose name contains none of
    /// the `exclude` fragments
    pub fn target(&self, name: Option<&str>, exclude: &[String]) -> Option<&PbxObject> {
        let targets = self.targets();
        match name {
            Some(name) => targets
                .into_iter()
                .find(|t| t.string("name") == Some(name)),
            None => targets.into_iter().find(|t| {
                let target_name = t.string("name").unwrap_or_default();
                !exclude.iter().any(|fragment| target_name.contains(fragment.as_str()))
            }),
        }
    }

    /// The target's build phase of kind `phase_isa`
    pub fn build_phase(&self, target: &PbxObject, phase_isa: &str) -> Option<&PbxObject> {
        target
            .array("buildPhases")?
            .strings()
            .filter_map(|id| self.object(id))
            .find(|phase| phase.isa == phase_isa)
    }

    /// Build phases of a target, in build order
    pub fn build_phases(&self, target: &PbxObject) -> Vec<&PbxObject> {
        target
            .array("buildPhases")
            .map(|phases| phases.strings().filter_map(|id| self.object(id)).collect())
            .unwrap_or_default()
    }

    pub fn file_references(&self) -> impl Iterator<Item = &PbxObject> {
        self.objects_of(isa::FILE_REFERENCE)
    }

    /// File references plus the version groups wrapping data models
    pub fn file_records(&self) -> impl Iterator<Item = &PbxObject> {
        self.objects
            .iter()
            .filter(|o| o.isa == isa::FILE_REFERENCE || o.isa == isa::VERSION_GROUP)
    }

    pub fn file_reference_by_path(&self, path: &str) -> Option<&PbxObject> {
        self.file_records().find(|f| f.string("path") == Some(path))
    }

    pub fn file_reference_by_name(&self, name: &str) -> Option<&PbxObject> {
        self.file_records().find(|f| {
            f.string("name") == Some(name)
                || f
                    .string("path")
                    .map(|p| p.rsplit('/').next() == Some(name))
                    .unwrap_or(false)
        })
    }

    /// Build-file records whose `fileRef` points at `file_ref`
    pub fn build_files_for<'a>(&'a self, file_ref: &'a str) -> impl Iterator<Item = &'a PbxObject> + 'a {
        self.objects_of(isa::BUILD_FILE)
            .filter(move |b| b.string("fileRef") == Some(file_ref))
    }
}

/// Planning of descriptor patches and registration of new artifacts
///
/// A patch is planned against a parsed `Project` and yields a `PatchPlan`:
/// the edits to splice into the text plus a report of what they do. When any
/// anchor the patch needs is missing, the plan carries no edits at all, so
/// applying it leaves the descriptor byte-for-byte unchanged.

use std::collections::HashSet;
use std::fmt;

use crate::artifact::{Artifact, ArtifactKind};
use crate::constants::{
    isa,
    layout::{FIELD_INDENT, OBJECT_INDENT},
};
use crate::edit::{self, Edit};
use crate::error::DescriptorError;
use crate::lexer::quote;
use crate::object_id::{IdGenerator, ObjectId};
use crate::parser::Array;
use crate::project::{Project, SectionBounds};

/// A location a patch needs but could not find
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anchor {
    Section(String),
    Group(String),
    MainGroup,
    Target(Option<String>),
    BuildPhase { target: String, isa: String },
    Configuration(Option<String>),
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Anchor::Section(isa) => write!(f, "`/* Begin {} section */` marker", isa),
            Anchor::Group(name) => write!(f, "group `{}`", name),
            Anchor::MainGroup => write!(f, "project main group"),
            Anchor::Target(Some(name)) => write!(f, "target `{}`", name),
            Anchor::Target(None) => write!(f, "a target outside the exclusion filters"),
            Anchor::BuildPhase { target, isa } => write!(f, "{} of target `{}`", isa, target),
            Anchor::Configuration(Some(name)) => write!(f, "build configuration `{}`", name),
            Anchor::Configuration(None) => write!(f, "any build configuration"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    AddedFile {
        name: String,
        file_ref: ObjectId,
        build_file: ObjectId,
        phase: &'static str,
    },
    AddedGroup {
        path: String,
        id: ObjectId,
    },
    AddedBuildPhase {
        name: String,
        id: ObjectId,
        target: String,
    },
    SetSetting {
        configuration: String,
        key: String,
        from: Option<String>,
        to: String,
    },
    RewrotePath {
        id: ObjectId,
        from: String,
        to: String,
    },
    Removed {
        id: ObjectId,
        what: String,
    },
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Change::AddedFile {
                name,
                file_ref,
                build_file,
                phase,
            } => write!(f, "{} → {} (file {}, build {})", name, phase, file_ref, build_file),
            Change::AddedGroup { path, id } => write!(f, "group `{}` ({})", path, id),
            Change::AddedBuildPhase { name, id, target } => {
                write!(f, "build phase `{}` ({}) on target `{}`", name, id, target)
            }
            Change::SetSetting {
                configuration,
                key,
                from,
                to,
            } => match from {
                Some(from) => write!(f, "[{}] {}: {} → {}", configuration, key, from, to),
                None => write!(f, "[{}] {}: (unset) → {}", configuration, key, to),
            },
            Change::RewrotePath { id, from, to } => write!(f, "{}: {} → {}", id, from, to),
            Change::Removed { id, what } => write!(f, "removed {} ({})", what, id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Skip {
    AlreadyPresent(String),
    NoMatch(String),
}

impl fmt::Display for Skip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Skip::AlreadyPresent(what) => write!(f, "{} is already in the project", what),
            Skip::NoMatch(pattern) => write!(f, "nothing matches `{}`", pattern),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchReport {
    pub changes: Vec<Change>,
    pub skipped: Vec<Skip>,
    pub missing: Vec<Anchor>,
}

#[derive(Debug, Clone, Default)]
pub struct PatchPlan {
    edits: Vec<Edit>,
    report: PatchReport,
}

impl PatchPlan {
    pub fn new(edits: Vec<Edit>, report: PatchReport) -> Self {
        if report.missing.is_empty() {
            PatchPlan { edits, report }
        } else {
            PatchPlan {
                edits: Vec::new(),
                report: PatchReport {
                    changes: Vec::new(),
                    ..report
                },
            }
        }
    }

    /// A plan that cannot be applied because `anchors` are absent
    pub fn missing(anchors: Vec<Anchor>) -> Self {
        for anchor in &anchors {
            tracing::warn!("anchor not found: {}", anchor);
        }
        PatchPlan {
            edits: Vec::new(),
            report: PatchReport {
                missing: anchors,
                ..PatchReport::default()
            },
        }
    }

    pub fn report(&self) -> &PatchReport {
        &self.report
    }

    pub fn edits(&self) -> &[Edit] {
        &self.edits
    }

    pub fn is_noop(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn is_blocked(&self) -> bool {
        !self.report.missing.is_empty()
    }

    /// Combine two plans planned against the same text; a missing anchor in
    /// either blocks both
    pub fn merge(self, other: PatchPlan) -> PatchPlan {
        let mut edits = self.edits;
        edits.extend(other.edits);
        let mut report = self.report;
        report.changes.extend(other.report.changes);
        report.skipped.extend(other.report.skipped);
        report.missing.extend(other.report.missing);
        PatchPlan::new(edits, report)
    }

    pub fn apply(&self, source: &str) -> Result<String, DescriptorError> {
        edit::apply(source, &self.edits)
    }
}

/// Where `add_artifacts` should register new files
#[derive(Debug, Clone, Default)]
pub struct AddOptions {
    /// Group path below the main group (`Shared/Services`); the main group
    /// itself when `None`
    pub group: Option<String>,
    /// Create the missing tail of `group` instead of reporting it
    pub create_groups: bool,
    /// Target whose build phases consume the files
    pub target: Option<String>,
    /// Name fragments that disqualify a target from being picked by default
    pub exclude_targets: Vec<String>,
}

/// The `children` list receiving new file records
enum GroupSlot<'p> {
    Existing(&'p Array),
    /// `names` are created below the group owning `parent`, outermost first
    Create { parent: &'p Array, names: Vec<String> },
}

struct Anchors<'p> {
    build_section: SectionBounds,
    file_section: SectionBounds,
    group: GroupSlot<'p>,
    phases: Vec<(ArtifactKind, &'p Array)>,
}

fn locate_group<'p>(project: &'p Project, options: &AddOptions) -> Result<GroupSlot<'p>, Anchor> {
    let Some(path) = &options.group else {
        return project
            .main_group()
            .and_then(|g| g.array("children"))
            .map(GroupSlot::Existing)
            .ok_or(Anchor::MainGroup);
    };

    let (deepest, rest) = project.group_at_path(path).ok_or(Anchor::MainGroup)?;
    let children = deepest
        .array("children")
        .ok_or_else(|| Anchor::Group(path.clone()))?;

    if rest.is_empty() {
        Ok(GroupSlot::Existing(children))
    } else if options.create_groups {
        Ok(GroupSlot::Create {
            parent: children,
            names: rest.iter().map(|name| name.to_string()).collect(),
        })
    } else {
        Err(Anchor::Group(path.clone()))
    }
}

fn locate<'p>(
    project: &'p Project,
    kinds: &[ArtifactKind],
    options: &AddOptions,
) -> Result<Anchors<'p>, Vec<Anchor>> {
    let mut missing = Vec::new();

    let build_section = project.section(isa::BUILD_FILE);
    if build_section.is_none() {
        missing.push(Anchor::Section(isa::BUILD_FILE.to_string()));
    }
    let file_section = project.section(isa::FILE_REFERENCE);
    if file_section.is_none() {
        missing.push(Anchor::Section(isa::FILE_REFERENCE.to_string()));
    }

    let group = match locate_group(project, options) {
        Ok(group) => Some(group),
        Err(anchor) => {
            missing.push(anchor);
            None
        }
    };

    // One build phase per distinct artifact kind
    let mut phases = Vec::new();
    match project.target(options.target.as_deref(), &options.exclude_targets) {
        Some(target) => {
            for &kind in kinds {
                let files = project
                    .build_phase(target, kind.phase_isa())
                    .and_then(|phase| phase.array("files"));
                match files {
                    Some(files) => phases.push((kind, files)),
                    None => missing.push(Anchor::BuildPhase {
                        target: target.string("name").unwrap_or_default().to_string(),
                        isa: kind.phase_isa().to_string(),
                    }),
                }
            }
        }
        None => missing.push(Anchor::Target(options.target.clone())),
    }

    match (build_section, file_section, group) {
        (Some(build_section), Some(file_section), Some(group)) if missing.is_empty() => {
            Ok(Anchors {
                build_section,
                file_section,
                group,
                phases,
            })
        }
        _ => Err(missing),
    }
}

fn already_registered(project: &Project, artifact: &Artifact) -> bool {
    if project.file_reference_by_path(&artifact.path).is_some() {
        return true;
    }
    artifact.kind == ArtifactKind::Framework && project.file_reference_by_name(&artifact.name).is_some()
}

fn render_build_file(build_file: &ObjectId, file_ref: &ObjectId, artifact: &Artifact) -> String {
    format!(
        "{indent}{bid} /* {name} in {label} */ = {{isa = PBXBuildFile; fileRef = {fid} /* {name} */; }};\n",
        indent = OBJECT_INDENT,
        bid = build_file,
        fid = file_ref,
        name = artifact.name,
        label = artifact.kind.phase_label(),
    )
}

fn render_file_reference(file_ref: &ObjectId, artifact: &Artifact) -> String {
    let mut fields = format!(
        "isa = PBXFileReference; lastKnownFileType = {}; ",
        artifact.file_type()
    );
    if artifact.needs_explicit_name() || artifact.source_tree != "<group>" {
        fields.push_str(&format!("name = {}; ", quote(&artifact.name)));
    }
    fields.push_str(&format!(
        "path = {}; sourceTree = {}; ",
        quote(&artifact.path),
        quote(&artifact.source_tree)
    ));
    format!(
        "{}{} /* {} */ = {{{}}};\n",
        OBJECT_INDENT, file_ref, artifact.name, fields
    )
}

/// Multi-line record in Xcode's layout, one `key = value;` per line
///
/// Values must already be quoted.
pub(crate) fn render_record(id: &str, comment: &str, fields: &[(&str, String)]) -> String {
    let mut out = format!("{}{} /* {} */ = {{\n", OBJECT_INDENT, id, comment);
    for (key, value) in fields {
        out.push_str(&format!("{}{} = {};\n", FIELD_INDENT, key, value));
    }
    out.push_str(&format!("{}}};\n", OBJECT_INDENT));
    out
}

/// Parenthesised list value, one item per line
pub(crate) fn render_list(items: &[String]) -> String {
    let mut out = String::from("(\n");
    for item in items {
        out.push_str(&format!("{}\t{},\n", FIELD_INDENT, item));
    }
    out.push_str(FIELD_INDENT);
    out.push(')');
    out
}

/// Append `body` to the section of `section_isa`, creating the section at
/// its sorted position when the descriptor has none yet
pub(crate) fn append_to_section(project: &Project, section_isa: &str, body: &str) -> Edit {
    let source = project.source();
    if let Some(bounds) = project.section(section_isa) {
        return Edit::insert(edit::line_start(source, bounds.end.start), body);
    }

    let successor = project
        .sections()
        .filter(|(name, _)| *name > section_isa)
        .min_by_key(|(_, bounds)| bounds.begin.start);

    match successor {
        Some((_, bounds)) => Edit::insert(
            edit::line_start(source, bounds.begin.start),
            format!(
                "/* Begin {isa} section */\n{body}/* End {isa} section */\n\n",
                isa = section_isa,
                body = body
            ),
        ),
        None => {
            // Last section: goes right before the closing brace of `objects`
            let close = project.objects_span().end - 1;
            Edit::insert(
                edit::line_start(source, close),
                format!(
                    "\n/* Begin {isa} section */\n{body}/* End {isa} section */\n",
                    isa = section_isa,
                    body = body
                ),
            )
        }
    }
}

/// `XCVersionGroup` wrapping a data model bundle and its current version
fn render_version_group(id: &ObjectId, version: &ObjectId, model: &Artifact, version_name: &str) -> String {
    let member = format!("{} /* {} */", version, version_name);
    let mut fields = vec![
        ("isa", isa::VERSION_GROUP.to_string()),
        ("children", render_list(&[member.clone()])),
        ("currentVersion", member),
    ];
    if model.needs_explicit_name() {
        fields.push(("name", quote(&model.name)));
    }
    fields.push(("path", quote(&model.path)));
    fields.push(("sourceTree", quote(&model.source_tree)));
    fields.push(("versionGroupType", "wrapper.xcdatamodel".to_string()));
    render_record(id.as_str(), &model.name, &fields)
}

fn render_group(id: &ObjectId, name: &str, children: &[String]) -> String {
    let fields = [
        ("isa", isa::GROUP.to_string()),
        ("children", render_list(children)),
        ("name", quote(name)),
        ("path", quote(name)),
        ("sourceTree", quote("<group>")),
    ];
    render_record(id.as_str(), name, &fields)
}

/// Records for the nested groups `names`, the innermost one holding `items`
///
/// Returns the records and the list item linking the outermost new group
/// into its parent.
fn render_new_groups(
    ids: &mut IdGenerator,
    names: &[String],
    items: &[String],
) -> (String, String, Vec<ObjectId>) {
    let new_ids: Vec<ObjectId> = names.iter().map(|_| ids.next_id()).collect();

    let mut records = String::new();
    for (i, (id, name)) in new_ids.iter().zip(names).enumerate() {
        let children = match (new_ids.get(i + 1), names.get(i + 1)) {
            (Some(next_id), Some(next_name)) => vec![format!("{} /* {} */", next_id, next_name)],
            _ => items.to_vec(),
        };
        records.push_str(&render_group(id, name, &children));
    }

    let link = format!("{} /* {} */", new_ids[0], names[0]);
    (records, link, new_ids)
}

/// Register `artifacts` in the build-file and file-reference sections, the
/// chosen group and the target's matching build phases
pub fn add_artifacts(project: &Project, artifacts: &[Artifact], options: &AddOptions) -> PatchPlan {
    let mut kinds: Vec<ArtifactKind> = Vec::new();
    for artifact in artifacts {
        if !kinds.contains(&artifact.kind) {
            kinds.push(artifact.kind);
        }
    }

    let anchors = match locate(project, &kinds, options) {
        Ok(anchors) => anchors,
        Err(missing) => return PatchPlan::missing(missing),
    };

    let source = project.source();
    let mut ids = IdGenerator::for_project(project);
    let mut report = PatchReport::default();
    let mut seen = HashSet::new();

    let mut build_lines = String::new();
    let mut file_lines = String::new();
    let mut version_groups = String::new();
    let mut group_items = Vec::new();
    let mut phase_items: Vec<(ArtifactKind, String)> = Vec::new();

    // Skip what the project already has, and repeats within the input
    for artifact in artifacts {
        if already_registered(project, artifact) || !seen.insert(artifact.path.clone()) {
            tracing::debug!("skipping {}: already registered", artifact.path);
            report.skipped.push(Skip::AlreadyPresent(artifact.name.clone()));
            continue;
        }

        let file_ref = ids.next_id();
        let build_file = ids.next_id();

        build_lines.push_str(&render_build_file(&build_file, &file_ref, artifact));
        if artifact.kind == ArtifactKind::DataModel {
            // The bundle is a version group; only its current version is a file
            let version = ids.next_id();
            let current = artifact.model_version();
            file_lines.push_str(&render_file_reference(&version, &current));
            version_groups.push_str(&render_version_group(&file_ref, &version, artifact, &current.name));
        } else {
            file_lines.push_str(&render_file_reference(&file_ref, artifact));
        }
        group_items.push(format!("{} /* {} */", file_ref, artifact.name));
        phase_items.push((
            artifact.kind,
            format!(
                "{} /* {} in {} */",
                build_file,
                artifact.name,
                artifact.kind.phase_label()
            ),
        ));

        report.changes.push(Change::AddedFile {
            name: artifact.name.clone(),
            file_ref,
            build_file,
            phase: artifact.kind.phase_label(),
        });
    }

    if group_items.is_empty() {
        return PatchPlan::new(Vec::new(), report);
    }

    let mut edits = vec![
        Edit::insert(
            edit::line_start(source, anchors.build_section.end.start),
            build_lines,
        ),
        Edit::insert(
            edit::line_start(source, anchors.file_section.end.start),
            file_lines,
        ),
    ];

    match &anchors.group {
        GroupSlot::Existing(children) => {
            for item in &group_items {
                edits.push(edit::append_to_array(source, children, item));
            }
        }
        GroupSlot::Create { parent, names } => {
            let (records, link, new_ids) = render_new_groups(&mut ids, names, &group_items);
            edits.push(edit::append_to_array(source, parent, &link));
            edits.push(append_to_section(project, isa::GROUP, &records));

            let base = options.group.as_deref().unwrap_or_default();
            let components: Vec<&str> = base.split('/').filter(|c| !c.is_empty()).collect();
            let resolved = components.len().saturating_sub(names.len());
            for (depth, id) in new_ids.into_iter().enumerate() {
                report.changes.push(Change::AddedGroup {
                    path: components[..resolved + depth + 1].join("/"),
                    id,
                });
            }
        }
    }

    if !version_groups.is_empty() {
        edits.push(append_to_section(project, isa::VERSION_GROUP, &version_groups));
    }

    for (kind, item) in &phase_items {
        if let Some((_, files)) = anchors.phases.iter().find(|(k, _)| k == kind) {
            edits.push(edit::append_to_array(source, files, item));
        }
    }

    PatchPlan::new(edits, report)
}

/// Link SDK frameworks such as `FileProvider` into a target
///
/// The file records go into `group` (normally `Frameworks`) and the build
/// files into the target's Frameworks phase.
pub fn add_frameworks(
    project: &Project,
    names: &[String],
    group: &str,
    target: Option<&str>,
    exclude_targets: &[String],
) -> PatchPlan {
    let artifacts: Vec<Artifact> = names.iter().map(|n| Artifact::system_framework(n)).collect();
    let options = AddOptions {
        group: Some(group.to_string()),
        target: target.map(str::to_string),
        exclude_targets: exclude_targets.to_vec(),
        ..AddOptions::default()
    };
    add_artifacts(project, &artifacts, &options)
}

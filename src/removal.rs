// Removal of file records together with every reference to them

use std::collections::HashSet;

use crate::constants::isa;
use crate::edit::{self, Edit};
use crate::patch::{Change, PatchPlan, PatchReport, Skip};
use crate::project::Project;

/// Remove every file record whose path contains `pattern`
///
/// Build-file records pointing at the removed files go too, as do their
/// entries in group `children` and build-phase `files` lists. A removed
/// data model takes the model versions it contains with it.
pub fn remove_files(project: &Project, pattern: &str) -> PatchPlan {
    let source = project.source();
    let mut report = PatchReport::default();
    let mut edits = Vec::new();

    let mut file_ids: HashSet<&str> = project
        .file_records()
        .filter(|o| o.string("path").is_some_and(|p| p.contains(pattern)))
        .map(|o| o.id().as_str())
        .collect();

    if file_ids.is_empty() {
        report.skipped.push(Skip::NoMatch(pattern.to_string()));
        return PatchPlan::new(edits, report);
    }

    // Versions inside a doomed version group would be left without a parent
    let versions: Vec<&str> = project
        .objects_of(isa::VERSION_GROUP)
        .filter(|group| file_ids.contains(group.id().as_str()))
        .flat_map(|group| group.array("children").into_iter().flat_map(|a| a.strings()))
        .collect();
    file_ids.extend(versions);

    let doomed_files: Vec<_> = project
        .file_records()
        .filter(|o| file_ids.contains(o.id().as_str()))
        .collect();
    let doomed_builds: Vec<_> = project
        .objects_of(isa::BUILD_FILE)
        .filter(|b| b.string("fileRef").is_some_and(|f| file_ids.contains(f)))
        .collect();
    let build_ids: HashSet<&str> = doomed_builds.iter().map(|o| o.id().as_str()).collect();

    for object in doomed_files.iter().chain(doomed_builds.iter()) {
        edits.push(Edit::delete(edit::whole_lines(source, object.span())));
        report.changes.push(Change::Removed {
            id: object.id().clone(),
            what: object
                .display_name()
                .map(str::to_string)
                .unwrap_or_else(|| format!("{} record", object.isa())),
        });
    }

    // Drop list memberships of everything removed above
    for object in project.objects() {
        if file_ids.contains(object.id().as_str()) {
            continue;
        }
        let list = if isa::CONTAINERS.contains(&object.isa()) {
            object.array("children").map(|a| (a, &file_ids))
        } else {
            object.array("files").map(|a| (a, &build_ids))
        };
        let Some((array, doomed)) = list else {
            continue;
        };
        for item in &array.items {
            if item.value.as_str().is_some_and(|id| doomed.contains(id)) {
                edits.push(Edit::delete(edit::whole_lines(source, item.span)));
            }
        }
    }

    PatchPlan::new(edits, report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removing_model_bundle_takes_its_versions() {
        let src = "{
\tobjects = {
\t\tB1 = {isa = PBXBuildFile; fileRef = V1; };
\t\tG1 = {isa = PBXGroup; children = (V1, ); };
\t\tF3 = {isa = PBXFileReference; path = CitationTrackingModel.xcdatamodel; };
\t\tS1 = {isa = PBXSourcesBuildPhase; files = (B1, ); };
\t\tV1 = {isa = XCVersionGroup; children = (F3, ); currentVersion = F3; path = CitationTrackingModel.xcdatamodeld; };
\t};
}";
        let project = Project::parse(src).unwrap();
        let plan = remove_files(&project, "CitationTrackingModel.xcdatamodeld");
        assert_eq!(plan.report().changes.len(), 3);

        let patched = plan.apply(project.source()).unwrap();
        assert!(!patched.contains("F3"));
        assert!(!patched.contains("V1"));
        assert!(!patched.contains("B1"));
        assert!(patched.contains("G1 = {isa = PBXGroup; children = ( ); };"));
        assert!(patched.contains("S1 = {isa = PBXSourcesBuildPhase; files = ( ); };"));
    }

    #[test]
    fn test_removes_version_group_and_its_children_lists() {
        let src = "{
\tobjects = {
\t\tB1 = {isa = PBXBuildFile; fileRef = V1; };
\t\tG1 = {
\t\t\tisa = PBXGroup;
\t\t\tchildren = (
\t\t\t\tV1 /* Model.xcdatamodeld */,
\t\t\t\tF2 /* App.swift */,
\t\t\t);
\t\t};
\t\tF2 = {isa = PBXFileReference; path = App.swift; };
\t\tF3 = {isa = PBXFileReference; path = Model.xcdatamodel; };
\t\tS1 = {
\t\t\tisa = PBXSourcesBuildPhase;
\t\t\tfiles = (
\t\t\t\tB1 /* Model.xcdatamodeld in Sources */,
\t\t\t);
\t\t};
\t\tV1 = {
\t\t\tisa = XCVersionGroup;
\t\t\tchildren = (
\t\t\t\tF3,
\t\t\t);
\t\t\tpath = Model.xcdatamodeld;
\t\t};
\t};
}";
        let project = Project::parse(src).unwrap();
        let plan = remove_files(&project, "Model.xcdatamodel");
        let removed: Vec<&str> = plan
            .report()
            .changes
            .iter()
            .filter_map(|c| match c {
                Change::Removed { id, .. } => Some(id.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(removed, vec!["F3", "V1", "B1"]);

        let patched = plan.apply(project.source()).unwrap();
        assert_eq!(
            patched,
            "{
\tobjects = {
\t\tG1 = {
\t\t\tisa = PBXGroup;
\t\t\tchildren = (
\t\t\t\tF2 /* App.swift */,
\t\t\t);
\t\t};
\t\tF2 = {isa = PBXFileReference; path = App.swift; };
\t\tS1 = {
\t\t\tisa = PBXSourcesBuildPhase;
\t\t\tfiles = (
\t\t\t);
\t\t};
\t};
}"
        );
    }
}

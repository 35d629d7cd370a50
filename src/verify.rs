// Structural integrity checks over a parsed descriptor

use std::fmt;

use crate::constants::isa;
use crate::object_id::ObjectId;
use crate::project::Project;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityIssue {
    DuplicateObject(ObjectId),
    DanglingReference {
        owner: ObjectId,
        field: &'static str,
        target: String,
    },
    MissingRootObject,
}

impl fmt::Display for IntegrityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityIssue::DuplicateObject(id) => write!(f, "identifier {} is defined more than once", id),
            IntegrityIssue::DanglingReference { owner, field, target } => {
                write!(f, "{}.{} points at missing object {}", owner, field, target)
            }
            IntegrityIssue::MissingRootObject => write!(f, "rootObject does not name a record"),
        }
    }
}

/// Every problem found, in file order
pub fn verify(project: &Project) -> Vec<IntegrityIssue> {
    let mut issues: Vec<IntegrityIssue> = project
        .duplicates()
        .iter()
        .cloned()
        .map(IntegrityIssue::DuplicateObject)
        .collect();

    if project.root_object().is_none() {
        issues.push(IntegrityIssue::MissingRootObject);
    }

    for object in project.objects() {
        let mut check = |field: &'static str, target: &str| {
            if !project.contains(target) {
                issues.push(IntegrityIssue::DanglingReference {
                    owner: object.id().clone(),
                    field,
                    target: target.to_string(),
                });
            }
        };

        match object.isa() {
            isa::BUILD_FILE => {
                if let Some(file_ref) = object.string("fileRef") {
                    check("fileRef", file_ref);
                }
            }
            isa::NATIVE_TARGET => {
                for phase in object.array("buildPhases").into_iter().flat_map(|a| a.strings()) {
                    check("buildPhases", phase);
                }
            }
            isa::PROJECT => {
                for target in object.array("targets").into_iter().flat_map(|a| a.strings()) {
                    check("targets", target);
                }
                if let Some(group) = object.string("mainGroup") {
                    check("mainGroup", group);
                }
            }
            kind if isa::CONTAINERS.contains(&kind) => {
                for child in object.array("children").into_iter().flat_map(|a| a.strings()) {
                    check("children", child);
                }
                // Only version groups carry one
                if let Some(current) = object.string("currentVersion") {
                    check("currentVersion", current);
                }
            }
            _ => {
                for file in object.array("files").into_iter().flat_map(|a| a.strings()) {
                    check("files", file);
                }
            }
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reports_dangling_and_duplicates() {
        let src = "{
\tobjects = {
\t\tB1 = {isa = PBXBuildFile; fileRef = F9; };
\t\tG1 = {isa = PBXGroup; children = (B1, X1, ); };
\t\tG1 = {isa = PBXGroup; children = ( ); };
\t};
\trootObject = P1;
}";
        let project = Project::parse(src).unwrap();
        let issues = verify(&project);
        assert_eq!(
            issues,
            vec![
                IntegrityIssue::DuplicateObject(ObjectId::from("G1")),
                IntegrityIssue::MissingRootObject,
                IntegrityIssue::DanglingReference {
                    owner: ObjectId::from("B1"),
                    field: "fileRef",
                    target: "F9".to_string(),
                },
                IntegrityIssue::DanglingReference {
                    owner: ObjectId::from("G1"),
                    field: "children",
                    target: "X1".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_reports_dangling_current_version() {
        let src = "{
\tobjects = {
\t\tP1 = {isa = PBXProject; mainGroup = V1; targets = ( ); };
\t\tV1 = {isa = XCVersionGroup; children = ( ); currentVersion = F3; path = Model.xcdatamodeld; };
\t};
\trootObject = P1;
}";
        let project = Project::parse(src).unwrap();
        assert_eq!(
            verify(&project),
            vec![IntegrityIssue::DanglingReference {
                owner: ObjectId::from("V1"),
                field: "currentVersion",
                target: "F3".to_string(),
            }]
        );
    }
}

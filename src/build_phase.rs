// Shell-script build phases

use crate::constants::{isa, layout::BUILD_ACTION_MASK};
use crate::edit;
use crate::lexer::quote;
use crate::object_id::IdGenerator;
use crate::patch::{
    append_to_section, render_list, render_record, Anchor, Change, PatchPlan, PatchReport, Skip,
};
use crate::project::Project;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptPhase {
    pub name: String,
    pub script: String,
    pub shell_path: String,
    pub input_paths: Vec<String>,
    pub output_paths: Vec<String>,
}

impl ScriptPhase {
    pub fn new(name: impl Into<String>, script: impl Into<String>) -> Self {
        ScriptPhase {
            name: name.into(),
            script: script.into(),
            shell_path: "/bin/sh".to_string(),
            input_paths: Vec::new(),
            output_paths: Vec::new(),
        }
    }

    fn render(&self, id: &str) -> String {
        let fields = [
            ("isa", isa::SHELL_SCRIPT_PHASE.to_string()),
            ("buildActionMask", BUILD_ACTION_MASK.to_string()),
            ("files", render_list(&[])),
            ("inputFileListPaths", render_list(&[])),
            ("inputPaths", quoted_list(&self.input_paths)),
            ("name", quote(&self.name)),
            ("outputFileListPaths", render_list(&[])),
            ("outputPaths", quoted_list(&self.output_paths)),
            ("runOnlyForDeploymentPostprocessing", "0".to_string()),
            ("shellPath", quote(&self.shell_path)),
            ("shellScript", quote(&self.script)),
        ];
        render_record(id, &self.name, &fields)
    }
}

fn quoted_list(paths: &[String]) -> String {
    let quoted: Vec<String> = paths.iter().map(|p| quote(p)).collect();
    render_list(&quoted)
}

/// Add `phase` to a target, after the phase labelled `after` when present
pub fn add_script_phase(
    project: &Project,
    phase: &ScriptPhase,
    target_name: Option<&str>,
    exclude_targets: &[String],
    after: Option<&str>,
) -> PatchPlan {
    let Some(target) = project.target(target_name, exclude_targets) else {
        return PatchPlan::missing(vec![Anchor::Target(target_name.map(str::to_string))]);
    };
    let Some(build_phases) = target.array("buildPhases") else {
        return PatchPlan::missing(vec![Anchor::BuildPhase {
            target: target.string("name").unwrap_or_default().to_string(),
            isa: isa::SHELL_SCRIPT_PHASE.to_string(),
        }]);
    };
    let target_label = target.string("name").unwrap_or_default().to_string();

    let duplicate = project.build_phases(target).into_iter().any(|existing| {
        existing.isa() == isa::SHELL_SCRIPT_PHASE
            && (existing.string("name") == Some(phase.name.as_str())
                || existing.string("shellScript") == Some(phase.script.as_str()))
    });
    if duplicate {
        return PatchPlan::new(
            Vec::new(),
            PatchReport {
                skipped: vec![Skip::AlreadyPresent(format!("build phase `{}`", phase.name))],
                ..PatchReport::default()
            },
        );
    }

    let source = project.source();
    let id = IdGenerator::for_project(project).next_id();
    let object_edit = append_to_section(project, isa::SHELL_SCRIPT_PHASE, &phase.render(id.as_str()));

    // List the phase after the labelled one, or last
    let item = format!("{} /* {} */", id, phase.name);
    let anchor_item = after.and_then(|label| {
        build_phases.items.iter().find(|item| {
            item.value
                .as_str()
                .and_then(|phase_id| project.object(phase_id))
                .and_then(|p| p.phase_label())
                == Some(label)
        })
    });
    let list_edit = match anchor_item {
        Some(existing) => edit::insert_after_item(source, existing, &item),
        None => {
            if let Some(label) = after {
                tracing::debug!("no phase labelled `{}`; appending at the end", label);
            }
            edit::append_to_array(source, build_phases, &item)
        }
    };

    PatchPlan::new(
        vec![object_edit, list_edit],
        PatchReport {
            changes: vec![Change::AddedBuildPhase {
                name: phase.name.clone(),
                id,
                target: target_label,
            }],
            ..PatchReport::default()
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_script_phase() {
        let mut phase = ScriptPhase::new(
            "Sign Sparkle Components",
            "\"${SRCROOT}/scripts/sign_sparkle_components.sh\"\n",
        );
        phase.input_paths.push("$(SRCROOT)/scripts".to_string());
        let rendered = phase.render("ID");
        assert!(rendered.starts_with("\t\tID /* Sign Sparkle Components */ = {\n"));
        assert!(rendered.contains("\t\t\tisa = PBXShellScriptBuildPhase;\n"));
        assert!(rendered.contains("\t\t\tfiles = (\n\t\t\t);\n"));
        assert!(rendered.contains("\t\t\tinputPaths = (\n\t\t\t\t\"$(SRCROOT)/scripts\",\n\t\t\t);\n"));
        assert!(rendered.contains("\t\t\tname = \"Sign Sparkle Components\";\n"));
        assert!(rendered.contains(
            "\t\t\tshellScript = \"\\\"${SRCROOT}/scripts/sign_sparkle_components.sh\\\"\\n\";\n"
        ));
        assert!(rendered.ends_with("\t\t};\n"));
    }

    #[test]
    fn test_rendered_phase_parses() {
        let phase = ScriptPhase::new("Lint", "swiftlint\n");
        let src = format!("{{\n\tobjects = {{\n{}\t}};\n}}\n", phase.render("ID"));
        let project = Project::parse(src).unwrap();
        let parsed = project.object("ID").unwrap();
        assert_eq!(parsed.isa(), isa::SHELL_SCRIPT_PHASE);
        assert_eq!(parsed.string("shellScript"), Some("swiftlint\n"));
        assert_eq!(parsed.phase_label(), Some("Lint"));
    }
}

// Build-setting updates and record path rewrites

use regex::Regex;

use crate::constants::isa;
use crate::edit::{self, Edit};
use crate::lexer::quote;
use crate::patch::{Anchor, Change, PatchPlan, PatchReport};
use crate::project::Project;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingChange {
    pub key: String,
    pub value: String,
    /// Restrict to one configuration (`Debug`, `Release`, ...)
    pub configuration: Option<String>,
    /// Only touch configurations where the current value equals this
    pub only_if: Option<String>,
}

impl SettingChange {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        SettingChange {
            key: key.into(),
            value: value.into(),
            configuration: None,
            only_if: None,
        }
    }

    pub fn only_if(mut self, current: impl Into<String>) -> Self {
        self.only_if = Some(current.into());
        self
    }

    pub fn in_configuration(mut self, name: impl Into<String>) -> Self {
        self.configuration = Some(name.into());
        self
    }
}

/// Settings that keep dSYM bundles and symbols in every configuration
pub fn dsym_preset() -> Vec<SettingChange> {
    vec![
        SettingChange::new("DEBUG_INFORMATION_FORMAT", "dwarf-with-dsym").only_if("dwarf"),
        SettingChange::new("STRIP_INSTALLED_PRODUCT", "NO").only_if("YES"),
    ]
}

pub fn set_build_setting(project: &Project, change: &SettingChange) -> PatchPlan {
    let source = project.source();
    let configurations: Vec<_> = project
        .objects_of(isa::BUILD_CONFIGURATION)
        .filter(|c| match &change.configuration {
            Some(name) => c.string("name") == Some(name.as_str()),
            None => true,
        })
        .collect();

    if configurations.is_empty() {
        return PatchPlan::missing(vec![Anchor::Configuration(change.configuration.clone())]);
    }

    let mut edits = Vec::new();
    let mut report = PatchReport::default();
    let value = quote(&change.value);

    for configuration in configurations {
        let Some(settings) = configuration.dict("buildSettings") else {
            tracing::debug!("{} has no buildSettings", configuration.id());
            continue;
        };
        let label = configuration
            .string("name")
            .unwrap_or(configuration.id().as_str())
            .to_string();

        match settings.entry(&change.key) {
            // Existing key: replace the value in place
            Some(entry) => {
                let current = entry.value.as_str();
                if current == Some(change.value.as_str()) {
                    continue;
                }
                if let Some(expected) = &change.only_if {
                    if current != Some(expected.as_str()) {
                        continue;
                    }
                }
                edits.push(Edit::replace(entry.value.span(), value.clone()));
                report.changes.push(Change::SetSetting {
                    configuration: label,
                    key: change.key.clone(),
                    from: current.map(str::to_string),
                    to: change.value.clone(),
                });
            }
            // Missing key: insert it among its sorted neighbours
            None if change.only_if.is_none() => {
                edits.push(edit::insert_dict_entry(source, settings, &change.key, &value));
                report.changes.push(Change::SetSetting {
                    configuration: label,
                    key: change.key.clone(),
                    from: None,
                    to: change.value.clone(),
                });
            }
            None => {}
        }
    }

    PatchPlan::new(edits, report)
}

/// Rewrite the `path` of file, group and version-group records
pub fn rewrite_paths(project: &Project, pattern: &Regex, replacement: &str) -> PatchPlan {
    let mut edits = Vec::new();
    let mut report = PatchReport::default();

    for object in project
        .objects()
        .iter()
        .filter(|o| isa::PATH_CARRIERS.contains(&o.isa()))
    {
        let Some(path) = object.field("path") else {
            continue;
        };
        let Some(current) = path.as_str() else {
            continue;
        };
        let rewritten = pattern.replace_all(current, replacement);
        if rewritten == current {
            continue;
        }
        edits.push(Edit::replace(path.span(), quote(&rewritten)));
        report.changes.push(Change::RewrotePath {
            id: object.id().clone(),
            from: current.to_string(),
            to: rewritten.into_owned(),
        });
    }

    PatchPlan::new(edits, report)
}

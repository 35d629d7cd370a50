use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

use pbxpatch::artifact::{Artifact, ArtifactKind};
use pbxpatch::build_phase::{self, ScriptPhase};
use pbxpatch::config::Config;
use pbxpatch::constants::isa;
use pbxpatch::patch::{self, AddOptions, PatchPlan, PatchReport};
use pbxpatch::project::Project;
use pbxpatch::removal;
use pbxpatch::settings::{self, SettingChange};
use pbxpatch::store;
use pbxpatch::verify;

#[derive(Parser)]
#[command(name = "pbxpatch")]
#[command(about = "Structural patcher for Xcode project descriptors", long_about = None)]
struct Cli {
    /// Settings file (defaults to ~/.pbxpatch/settings.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Show what would change without writing the descriptor
    #[arg(long, global = true)]
    dry_run: bool,

    /// Keep the previous descriptor as `<file>.backup`
    #[arg(long, global = true)]
    backup: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register source, resource or data-model files with a target
    AddFiles {
        /// The .xcodeproj bundle or its project.pbxproj
        project: PathBuf,
        /// File paths, relative to the receiving group
        #[arg(required = true)]
        files: Vec<String>,
        /// Group path below the main group, e.g. Shared/Services (main group by default)
        #[arg(long)]
        group: Option<String>,
        /// Create the missing groups of --group instead of failing
        #[arg(long, requires = "group")]
        create_groups: bool,
        /// Target to build the files with (first non-excluded target by default)
        #[arg(long)]
        target: Option<String>,
        /// Force the artifact kind instead of inferring it from the extension
        #[arg(long)]
        kind: Option<ArtifactKind>,
    },
    /// Link SDK frameworks (e.g. FileProvider) into a target
    AddFramework {
        project: PathBuf,
        #[arg(required = true)]
        names: Vec<String>,
        #[arg(long)]
        target: Option<String>,
        /// Group receiving the framework records (settings default: Frameworks)
        #[arg(long)]
        group: Option<String>,
    },
    /// Add a shell-script build phase to a target
    AddScriptPhase {
        project: PathBuf,
        /// Phase name shown in Xcode
        #[arg(long)]
        name: String,
        /// Script body
        #[arg(long, conflicts_with = "script_file")]
        script: Option<String>,
        /// Read the script body from a file
        #[arg(long)]
        script_file: Option<PathBuf>,
        #[arg(long, default_value = "/bin/sh")]
        shell: String,
        #[arg(long = "input")]
        inputs: Vec<String>,
        #[arg(long = "output")]
        outputs: Vec<String>,
        /// Place the phase after the phase with this label (e.g. Resources)
        #[arg(long)]
        after: Option<String>,
        #[arg(long)]
        target: Option<String>,
    },
    /// Remove file records whose path contains PATTERN, with every reference to them
    RemoveFiles {
        project: PathBuf,
        pattern: String,
    },
    /// Set a build setting in every (or one) build configuration
    SetBuildSetting {
        project: PathBuf,
        key: String,
        value: String,
        /// Only this configuration (Debug, Release, ...)
        #[arg(long)]
        configuration: Option<String>,
        /// Only replace the setting where it currently has this value
        #[arg(long)]
        only_if: Option<String>,
    },
    /// Switch dwarf builds to dwarf-with-dsym and stop stripping products
    FixDsym {
        project: PathBuf,
    },
    /// Rewrite record paths matching a regular expression
    RewritePaths {
        project: PathBuf,
        pattern: String,
        replacement: String,
    },
    /// List targets and file records
    List {
        project: PathBuf,
    },
    /// Check the descriptor for duplicate ids and dangling references
    Verify {
        project: PathBuf,
    },
}

struct WriteOptions {
    dry_run: bool,
    backup: bool,
}

fn main() -> Result<()> {
    pbxpatch::logging::init();
    let cli = Cli::parse();

    let config = Config::resolve(cli.config.as_deref())?;
    let write = WriteOptions {
        dry_run: cli.dry_run,
        backup: cli.backup || config.patch.backup,
    };
    let exclude = &config.patch.exclude_targets;

    match cli.command {
        Commands::AddFiles {
            project,
            files,
            group,
            create_groups,
            target,
            kind,
        } => {
            let artifacts: Vec<Artifact> = files
                .iter()
                .map(|f| match kind {
                    Some(kind) => Artifact::with_kind(f, kind),
                    None => Artifact::from_path(f),
                })
                .collect();
            let options = AddOptions {
                group,
                create_groups,
                target,
                exclude_targets: exclude.clone(),
            };
            run_patch(&project, &write, |p| patch::add_artifacts(p, &artifacts, &options))
        }
        Commands::AddFramework {
            project,
            names,
            target,
            group,
        } => {
            let group = group.unwrap_or_else(|| config.patch.framework_group.clone());
            run_patch(&project, &write, |p| {
                patch::add_frameworks(p, &names, &group, target.as_deref(), exclude)
            })
        }
        Commands::AddScriptPhase {
            project,
            name,
            script,
            script_file,
            shell,
            inputs,
            outputs,
            after,
            target,
        } => {
            let script = match (script, script_file) {
                (Some(script), _) => script,
                (None, Some(file)) => fs::read_to_string(&file)
                    .with_context(|| format!("Failed to read script {}", file.display()))?,
                (None, None) => bail!("Either --script or --script-file is required"),
            };
            let phase = ScriptPhase {
                shell_path: shell,
                input_paths: inputs,
                output_paths: outputs,
                ..ScriptPhase::new(name, script)
            };
            run_patch(&project, &write, |p| {
                build_phase::add_script_phase(p, &phase, target.as_deref(), exclude, after.as_deref())
            })
        }
        Commands::RemoveFiles { project, pattern } => {
            run_patch(&project, &write, |p| removal::remove_files(p, &pattern))
        }
        Commands::SetBuildSetting {
            project,
            key,
            value,
            configuration,
            only_if,
        } => {
            let change = SettingChange {
                configuration,
                only_if,
                ..SettingChange::new(key, value)
            };
            run_patch(&project, &write, |p| settings::set_build_setting(p, &change))
        }
        Commands::FixDsym { project } => run_patch(&project, &write, |p| {
            settings::dsym_preset()
                .iter()
                .map(|change| settings::set_build_setting(p, change))
                .reduce(PatchPlan::merge)
                .unwrap_or_default()
        }),
        Commands::RewritePaths {
            project,
            pattern,
            replacement,
        } => {
            let pattern = Regex::new(&pattern)
                .with_context(|| format!("Invalid path pattern `{}`", pattern))?;
            run_patch(&project, &write, |p| settings::rewrite_paths(p, &pattern, &replacement))
        }
        Commands::List { project } => list_command(&project),
        Commands::Verify { project } => verify_command(&project),
    }
}

/// Load, plan, report and (unless dry-running) write back
fn run_patch<F>(project_path: &Path, write: &WriteOptions, plan: F) -> Result<()>
where
    F: FnOnce(&Project) -> PatchPlan,
{
    let path = store::resolve_descriptor(project_path);
    let project = store::load(&path)?;
    println!("📂 {}", path.display());

    let plan = plan(&project);
    print_report(plan.report());

    if plan.is_blocked() {
        bail!(
            "{} required location(s) not found; {} left unchanged",
            plan.report().missing.len(),
            path.display()
        );
    }

    if plan.is_noop() {
        println!("✓ Nothing to do");
        return Ok(());
    }

    // Apply the edits in memory first
    let updated = plan
        .apply(project.source())
        .context("Failed to apply planned edits")?;

    // Refuse patches that introduce dangling references
    let before = verify::verify(&project).len();
    let after = verify::verify(&Project::parse(updated.as_str())?);
    if after.len() > before {
        for issue in &after {
            tracing::warn!("{}", issue);
        }
        bail!("Patch would leave dangling references; {} left unchanged", path.display());
    }

    if write.dry_run {
        println!("🔍 Dry run: {} edit(s) planned, nothing written", plan.edits().len());
        return Ok(());
    }

    store::save(&path, &updated, write.backup)?;
    println!("💾 Saved {}", path.display());
    Ok(())
}

fn print_report(report: &PatchReport) {
    for change in &report.changes {
        println!("  ✅ {}", change);
    }
    for skip in &report.skipped {
        println!("  ⏭️  {}", skip);
    }
    for anchor in &report.missing {
        println!("  ❌ Missing {}", anchor);
    }
}

fn list_command(project_path: &Path) -> Result<()> {
    let path = store::resolve_descriptor(project_path);
    let project = store::load(&path)?;

    println!("🎯 Targets:");
    for target in project.targets() {
        let phases: Vec<&str> = project
            .build_phases(target)
            .into_iter()
            .filter_map(|phase| phase.phase_label())
            .collect();
        println!(
            "  {} {} [{}]",
            target.id(),
            target.string("name").unwrap_or("?"),
            phases.join(", ")
        );
    }
    println!();

    println!("📄 File records:");
    for file in project.file_records() {
        let file_type = file
            .string("lastKnownFileType")
            .or_else(|| file.string("explicitFileType"))
            .or_else(|| file.string("versionGroupType"))
            .unwrap_or("-");
        let built = project.build_files_for(file.id().as_str()).count();
        println!(
            "  {} {:<28} {}{}",
            file.id(),
            file_type,
            file.string("path").unwrap_or("-"),
            if built > 0 { format!(" (built ×{})", built) } else { String::new() }
        );
    }

    let groups = project.objects_of(isa::GROUP).count();
    println!();
    println!(
        "{} objects, {} groups, {} file records",
        project.objects().len(),
        groups,
        project.file_records().count()
    );
    Ok(())
}

fn verify_command(project_path: &Path) -> Result<()> {
    let path = store::resolve_descriptor(project_path);
    let project = store::load(&path)?;

    let issues = verify::verify(&project);
    if issues.is_empty() {
        println!("✅ {} is consistent ({} objects)", path.display(), project.objects().len());
        return Ok(());
    }

    for issue in &issues {
        println!("  ❌ {}", issue);
    }
    bail!("{} integrity issue(s) found in {}", issues.len(), path.display())
}

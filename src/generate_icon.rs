use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;

use pbxpatch::config::Config;
use pbxpatch::icon::{self, BundleOutcome};

#[derive(Parser)]
#[command(name = "generate-icon")]
#[command(about = "Render an app icon set and bundle it with iconutil", long_about = None)]
struct Cli {
    /// Settings file (defaults to ~/.pbxpatch/settings.yaml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Comma-separated pixel sizes, e.g. 16,32,128
    #[arg(long, value_delimiter = ',')]
    sizes: Option<Vec<u32>>,

    /// Directory receiving icon_<s>x<s>.png files
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Symbol drawn by the glyph strategy
    #[arg(long)]
    glyph: Option<String>,

    /// Bundle file written by iconutil
    #[arg(long)]
    bundle: Option<PathBuf>,

    /// Skip bundling; only write the PNG files
    #[arg(long)]
    no_bundle: bool,
}

fn main() -> Result<()> {
    pbxpatch::logging::init();
    let cli = Cli::parse();

    let mut config = Config::resolve(cli.config.as_deref())?;
    if let Some(sizes) = cli.sizes {
        config.icon.sizes = sizes;
    }
    if let Some(out_dir) = cli.out_dir {
        config.icon.output_dir = out_dir;
    }
    if let Some(glyph) = cli.glyph {
        config.icon.glyph = glyph;
    }
    if let Some(bundle) = cli.bundle {
        config.icon.bundle_path = bundle;
    }
    if cli.no_bundle {
        config.icon.compile_bundle = false;
    }
    config.validate()?;

    let settings = &config.icon;
    println!("🎨 Generating app icon {:?}...", settings.glyph);

    let renderers = icon::default_renderers(settings);
    let report = icon::generate_icon_set(&renderers, &settings.sizes, &settings.output_dir)?;

    println!();
    println!(
        "📁 {} of {} icons written to {}",
        report.entries.len(),
        settings.sizes.len(),
        settings.output_dir.display()
    );

    if settings.compile_bundle && !report.entries.is_empty() {
        println!("  Converting to .icns...");
        match icon::compile_bundle(&settings.iconutil, &settings.output_dir, &settings.bundle_path) {
            BundleOutcome::Built(path) => println!("✅ Icon created: {}", path.display()),
            BundleOutcome::ToolMissing(tool) => {
                println!("⚠️  {} not found; skipping the bundle (macOS only)", tool)
            }
            BundleOutcome::Failed(stderr) => println!("⚠️  Bundling failed: {}", stderr),
        }
    }

    if report.entries.is_empty() {
        bail!("No icon could be generated");
    }
    if !report.failures.is_empty() {
        let sizes: Vec<String> = report.failures.iter().map(|(s, _)| s.to_string()).collect();
        bail!("Failed to generate sizes: {}", sizes.join(", "));
    }

    Ok(())
}

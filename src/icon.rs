// App icon rasterizer
//
// Each size is rendered independently by trying a list of strategies in
// order: a text glyph, two rings on a soft radial background, and finally a
// flat colour square. A strategy that fails, or that produces an image of
// the wrong size, hands over to the next one.

use anyhow::{anyhow, bail, Context, Result};
use image::{Rgba, RgbaImage};
use resvg::{tiny_skia, usvg};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use crate::config::IconConfig;
use crate::constants::icon::{GLYPH_SCALE, GRADIENT_PEAK_ALPHA};

pub trait IconRenderer {
    fn name(&self) -> &'static str;
    fn render(&self, size: u32) -> Result<RgbaImage>;
}

/// Renders a Unicode glyph centred on a transparent square
pub struct GlyphRenderer {
    glyph: String,
    families: Vec<String>,
    fontdb: Arc<usvg::fontdb::Database>,
}

impl GlyphRenderer {
    /// Font files listed first take precedence over system fonts
    pub fn new(glyph: &str, families: &[String], font_files: &[PathBuf]) -> Self {
        let mut fontdb = usvg::fontdb::Database::new();
        for file in font_files {
            if !file.exists() {
                continue;
            }
            match fontdb.load_font_file(file) {
                Ok(()) => tracing::debug!("loaded font {}", file.display()),
                Err(e) => tracing::debug!("skipping font {}: {}", file.display(), e),
            }
        }
        fontdb.load_system_fonts();

        GlyphRenderer {
            glyph: glyph.to_string(),
            families: families.to_vec(),
            fontdb: Arc::new(fontdb),
        }
    }

    fn svg(&self, size: u32) -> String {
        let half = size as f32 / 2.0;
        let families = self
            .families
            .iter()
            .map(|f| if f.contains(' ') { format!("'{}'", f) } else { f.clone() })
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            r##"<svg xmlns="http://www.w3.org/2000/svg" width="{size}" height="{size}" viewBox="0 0 {size} {size}"><text x="{half}" y="{half}" font-size="{font}" font-family="{families}" fill="#000000" text-anchor="middle" dominant-baseline="central">{glyph}</text></svg>"##,
            size = size,
            half = half,
            font = size as f32 * GLYPH_SCALE,
            families = xml_escape(&families),
            glyph = xml_escape(&self.glyph),
        )
    }
}

impl IconRenderer for GlyphRenderer {
    fn name(&self) -> &'static str {
        "glyph"
    }

    fn render(&self, size: u32) -> Result<RgbaImage> {
        if self.fontdb.is_empty() {
            bail!("no fonts available");
        }

        let mut options = usvg::Options::default();
        options.fontdb = Arc::clone(&self.fontdb);

        let tree = usvg::Tree::from_str(&self.svg(size), &options)
            .context("Failed to lay out glyph")?;
        let mut pixmap = tiny_skia::Pixmap::new(size, size)
            .with_context(|| format!("Failed to create {}x{} canvas", size, size))?;
        resvg::render(&tree, tiny_skia::Transform::identity(), &mut pixmap.as_mut());

        let img = pixmap_to_image(&pixmap);
        if img.pixels().all(|p| p[3] == 0) {
            bail!("no installed font can draw {:?}", self.glyph);
        }
        Ok(img)
    }
}

/// Two overlapping ring outlines over a translucent radial gradient
pub struct ShapeRenderer {
    color: Rgba<u8>,
}

impl ShapeRenderer {
    pub fn new(color: [u8; 4]) -> Self {
        ShapeRenderer {
            color: Rgba(color),
        }
    }
}

impl IconRenderer for ShapeRenderer {
    fn name(&self) -> &'static str {
        "shapes"
    }

    fn render(&self, size: u32) -> Result<RgbaImage> {
        if size == 0 {
            bail!("icon size must be positive");
        }

        let mut img = radial_gradient(size, self.color);

        let center = (size / 2) as f32;
        let radius = (size / 6) as f32;
        let width = (size / 20 + 2) as f32;

        draw_ring(&mut img, center - radius, center, radius, width, self.color);
        draw_ring(&mut img, center + radius, center, radius, width, self.color);

        Ok(img)
    }
}

/// Flat square in a single colour; the last resort
pub struct SolidRenderer {
    color: Rgba<u8>,
}

impl SolidRenderer {
    pub fn new(color: [u8; 4]) -> Self {
        SolidRenderer {
            color: Rgba([color[0], color[1], color[2], 255]),
        }
    }
}

impl IconRenderer for SolidRenderer {
    fn name(&self) -> &'static str {
        "solid"
    }

    fn render(&self, size: u32) -> Result<RgbaImage> {
        Ok(RgbaImage::from_pixel(size, size, self.color))
    }
}

pub fn default_renderers(config: &IconConfig) -> Vec<Box<dyn IconRenderer>> {
    vec![
        Box::new(GlyphRenderer::new(
            &config.glyph,
            &config.font_families,
            &config.font_files,
        )),
        Box::new(ShapeRenderer::new(config.color)),
        Box::new(SolidRenderer::new(config.color)),
    ]
}

fn pixmap_to_image(pixmap: &tiny_skia::Pixmap) -> RgbaImage {
    let mut img = RgbaImage::new(pixmap.width(), pixmap.height());
    for (src, dst) in pixmap.pixels().iter().zip(img.pixels_mut()) {
        let c = src.demultiply();
        *dst = Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
    }
    img
}

fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn distance(x: u32, y: u32, cx: f32, cy: f32) -> f32 {
    let dx = x as f32 + 0.5 - cx;
    let dy = y as f32 + 0.5 - cy;
    (dx * dx + dy * dy).sqrt()
}

fn radial_gradient(size: u32, color: Rgba<u8>) -> RgbaImage {
    let center = (size / 2) as f32;
    let max_radius = center.max(1.0);
    RgbaImage::from_fn(size, size, |x, y| {
        let d = distance(x, y, center, center);
        if d >= max_radius {
            return Rgba([0, 0, 0, 0]);
        }
        let alpha = 255.0 * (1.0 - d / max_radius) * GRADIENT_PEAK_ALPHA;
        Rgba([color[0], color[1], color[2], alpha.round() as u8])
    })
}

fn draw_ring(img: &mut RgbaImage, cx: f32, cy: f32, radius: f32, width: f32, color: Rgba<u8>) {
    let half = width / 2.0;
    for (x, y, pixel) in img.enumerate_pixels_mut() {
        if (distance(x, y, cx, cy) - radius).abs() <= half {
            *pixel = blend_over(*pixel, color);
        }
    }
}

/// Straight-alpha "source over destination"
fn blend_over(dst: Rgba<u8>, src: Rgba<u8>) -> Rgba<u8> {
    let sa = src[3] as f32 / 255.0;
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }
    let channel = |i: usize| -> u8 {
        let c = (src[i] as f32 * sa + dst[i] as f32 * da * (1.0 - sa)) / out_a;
        c.round().clamp(0.0, 255.0) as u8
    };
    Rgba([channel(0), channel(1), channel(2), (out_a * 255.0).round() as u8])
}

/// Render one size, falling through the strategies until one succeeds
pub fn render_icon(renderers: &[Box<dyn IconRenderer>], size: u32) -> Result<(RgbaImage, &'static str)> {
    let mut last_error = None;
    for renderer in renderers {
        match renderer.render(size) {
            Ok(img) if img.dimensions() == (size, size) => return Ok((img, renderer.name())),
            Ok(img) => {
                let (w, h) = img.dimensions();
                tracing::warn!("{} strategy produced {}x{} for {}x{}", renderer.name(), w, h, size, size);
                last_error = Some(anyhow!("{} strategy produced {}x{}", renderer.name(), w, h));
            }
            Err(e) => {
                tracing::warn!("{} strategy failed for {}x{}: {:#}", renderer.name(), size, size, e);
                last_error = Some(e);
            }
        }
    }
    Err(last_error.unwrap_or_else(|| anyhow!("no icon strategies configured")))
}

pub fn icon_file_name(size: u32) -> String {
    format!("icon_{}x{}.png", size, size)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconEntry {
    pub size: u32,
    pub path: PathBuf,
    pub strategy: &'static str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IconSetReport {
    pub entries: Vec<IconEntry>,
    pub failures: Vec<(u32, String)>,
}

/// Write `icon_<s>x<s>.png` for every size into `out_dir`
///
/// Icons left over from an earlier run are removed first. A size that cannot
/// be rendered or saved is reported and the remaining sizes still run.
pub fn generate_icon_set(
    renderers: &[Box<dyn IconRenderer>],
    sizes: &[u32],
    out_dir: &Path,
) -> Result<IconSetReport> {
    // Create iconset directory
    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;
    remove_stale_icons(out_dir)?;

    let mut report = IconSetReport::default();
    for &size in sizes {
        println!("  📐 Creating {}x{} icon...", size, size);
        let path = out_dir.join(icon_file_name(size));

        let outcome = render_icon(renderers, size).and_then(|(img, strategy)| {
            img.save(&path)
                .with_context(|| format!("Failed to save {}", path.display()))?;
            Ok(strategy)
        });

        // Record the failure and keep going with the next size
        match outcome {
            Ok(strategy) => {
                println!("    ✅ {} icon {}x{} created", strategy, size, size);
                report.entries.push(IconEntry {
                    size,
                    path,
                    strategy,
                });
            }
            Err(e) => {
                println!("    ❌ {}x{} icon failed: {:#}", size, size, e);
                report.failures.push((size, format!("{:#}", e)));
            }
        }
    }

    Ok(report)
}

fn remove_stale_icons(out_dir: &Path) -> Result<()> {
    for entry in fs::read_dir(out_dir)? {
        let path = entry?.path();
        let stale = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with("icon_") && n.ends_with(".png"))
            .unwrap_or(false);
        if stale {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
        }
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleOutcome {
    Built(PathBuf),
    ToolMissing(String),
    Failed(String),
}

/// Run `<tool> -c icns <iconset> -o <output>`; never fatal
pub fn compile_bundle(tool: &str, iconset: &Path, output: &Path) -> BundleOutcome {
    let result = Command::new(tool)
        .arg("-c")
        .arg("icns")
        .arg(iconset)
        .arg("-o")
        .arg(output)
        .output();

    match result {
        Ok(out) if out.status.success() => BundleOutcome::Built(output.to_path_buf()),
        Ok(out) => BundleOutcome::Failed(String::from_utf8_lossy(&out.stderr).trim().to_string()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => BundleOutcome::ToolMissing(tool.to_string()),
        Err(e) => BundleOutcome::Failed(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Broken;

    impl IconRenderer for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn render(&self, _size: u32) -> Result<RgbaImage> {
            bail!("font missing")
        }
    }

    struct WrongSize;

    impl IconRenderer for WrongSize {
        fn name(&self) -> &'static str {
            "wrong-size"
        }

        fn render(&self, size: u32) -> Result<RgbaImage> {
            Ok(RgbaImage::new(size + 1, size))
        }
    }

    #[test]
    fn test_fallback_skips_failing_strategies() {
        let renderers: Vec<Box<dyn IconRenderer>> = vec![
            Box::new(Broken),
            Box::new(WrongSize),
            Box::new(SolidRenderer::new([1, 2, 3, 4])),
        ];
        let (img, strategy) = render_icon(&renderers, 32).unwrap();
        assert_eq!(strategy, "solid");
        assert_eq!(img.dimensions(), (32, 32));
        assert_eq!(*img.get_pixel(5, 5), Rgba([1, 2, 3, 255]));
    }

    #[test]
    fn test_all_strategies_failing_is_an_error() {
        let renderers: Vec<Box<dyn IconRenderer>> = vec![Box::new(Broken)];
        let err = render_icon(&renderers, 16).unwrap_err();
        assert!(err.to_string().contains("font missing"));
    }

    #[test]
    fn test_shapes_draw_rings_on_gradient() {
        let img = ShapeRenderer::new([0, 122, 255, 255]).render(120).unwrap();
        assert_eq!(img.dimensions(), (120, 120));

        // Left ring: centre (40, 60), radius 20, so (20, 60) is on the outline
        assert_eq!(*img.get_pixel(20, 60), Rgba([0, 122, 255, 255]));
        // Inside the left ring: only the faint background
        let inner = img.get_pixel(40, 60);
        assert!(inner[3] > 0 && inner[3] < 26);
        // Corners lie outside the gradient
        assert_eq!(img.get_pixel(0, 0)[3], 0);
    }

    #[test]
    fn test_shapes_reject_zero_size() {
        assert!(ShapeRenderer::new([0, 0, 0, 255]).render(0).is_err());
    }

    #[test]
    fn test_blend_over_opaque_source_wins() {
        let out = blend_over(Rgba([10, 10, 10, 20]), Rgba([200, 100, 50, 255]));
        assert_eq!(out, Rgba([200, 100, 50, 255]));
    }

    #[test]
    fn test_blend_over_transparent_source_keeps_destination() {
        let out = blend_over(Rgba([10, 20, 30, 40]), Rgba([200, 100, 50, 0]));
        assert_eq!(out, Rgba([10, 20, 30, 40]));
    }

    #[test]
    fn test_glyph_svg_is_escaped_and_centred() {
        let renderer = GlyphRenderer {
            glyph: "<&>".to_string(),
            families: vec!["Apple Color Emoji".to_string(), "sans-serif".to_string()],
            fontdb: Arc::new(usvg::fontdb::Database::new()),
        };
        let svg = renderer.svg(100);
        assert!(svg.contains(">&lt;&amp;&gt;</text>"));
        assert!(svg.contains(r#"x="50" y="50""#));
        assert!(svg.contains(r#"font-size="70""#));
        assert!(svg.contains("font-family=\"'Apple Color Emoji', sans-serif\""));
    }

    #[test]
    fn test_glyph_without_fonts_fails() {
        let renderer = GlyphRenderer {
            glyph: "A".to_string(),
            families: vec!["sans-serif".to_string()],
            fontdb: Arc::new(usvg::fontdb::Database::new()),
        };
        assert!(renderer.render(16).is_err());
    }

    #[test]
    fn test_missing_bundle_tool_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = compile_bundle(
            "pbxpatch-no-such-iconutil",
            dir.path(),
            &dir.path().join("AppIcon.icns"),
        );
        assert_eq!(
            outcome,
            BundleOutcome::ToolMissing("pbxpatch-no-such-iconutil".to_string())
        );
    }
}

// Icon set generation against a scratch directory

use pbxpatch::config::IconConfig;
use pbxpatch::icon::{
    compile_bundle, default_renderers, generate_icon_set, icon_file_name, BundleOutcome,
    IconRenderer, ShapeRenderer, SolidRenderer,
};
use std::fs;

fn png_files(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| n.ends_with(".png"))
        .collect();
    names.sort();
    names
}

#[test]
fn test_three_sizes_give_three_matching_files() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("AppIcon.iconset");
    let renderers = default_renderers(&IconConfig::default());

    let report = generate_icon_set(&renderers, &[16, 256, 1024], &out).unwrap();
    assert!(report.failures.is_empty());
    assert_eq!(report.entries.len(), 3);

    assert_eq!(
        png_files(&out),
        vec![
            "icon_1024x1024.png".to_string(),
            "icon_16x16.png".to_string(),
            "icon_256x256.png".to_string(),
        ]
    );
    for size in [16u32, 256, 1024] {
        let img = image::open(out.join(icon_file_name(size))).unwrap();
        assert_eq!((img.width(), img.height()), (size, size));
    }
}

#[test]
fn test_shapes_strategy_used_without_glyph() {
    let dir = tempfile::tempdir().unwrap();
    let renderers: Vec<Box<dyn IconRenderer>> = vec![
        Box::new(ShapeRenderer::new([0, 122, 255, 255])),
        Box::new(SolidRenderer::new([0, 122, 255, 255])),
    ];

    let report = generate_icon_set(&renderers, &[32, 64], dir.path()).unwrap();
    let strategies: Vec<&str> = report.entries.iter().map(|e| e.strategy).collect();
    assert_eq!(strategies, vec!["shapes", "shapes"]);
}

#[test]
fn test_stale_icons_are_replaced() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("icon_48x48.png"), b"stale").unwrap();
    fs::write(dir.path().join("Contents.json"), b"{}").unwrap();

    let renderers: Vec<Box<dyn IconRenderer>> = vec![Box::new(SolidRenderer::new([1, 2, 3, 255]))];
    generate_icon_set(&renderers, &[16], dir.path()).unwrap();

    assert_eq!(png_files(dir.path()), vec!["icon_16x16.png".to_string()]);
    assert!(dir.path().join("Contents.json").exists());
}

#[test]
fn test_failing_size_does_not_stop_the_rest() {
    let dir = tempfile::tempdir().unwrap();
    let renderers: Vec<Box<dyn IconRenderer>> = vec![Box::new(ShapeRenderer::new([0, 0, 0, 255]))];

    let report = generate_icon_set(&renderers, &[0, 16], dir.path()).unwrap();
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, 0);
    assert_eq!(report.entries.len(), 1);
    assert_eq!(report.entries[0].size, 16);
}

#[test]
fn test_missing_bundler_is_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let outcome = compile_bundle(
        "definitely-not-iconutil",
        dir.path(),
        &dir.path().join("AppIcon.icns"),
    );
    assert!(matches!(outcome, BundleOutcome::ToolMissing(_)));
}

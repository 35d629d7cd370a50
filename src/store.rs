// Reading and writing descriptor files on disk

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::layout::DESCRIPTOR_FILE;
use crate::project::Project;

/// Accept either the `.xcodeproj` bundle or the descriptor inside it
pub fn resolve_descriptor(path: &Path) -> PathBuf {
    if path.is_dir() {
        path.join(DESCRIPTOR_FILE)
    } else {
        path.to_path_buf()
    }
}

pub fn load(path: &Path) -> Result<Project> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read project file {}", path.display()))?;
    Project::parse(contents)
        .with_context(|| format!("Failed to parse project file {}", path.display()))
}

/// Replace the descriptor at `path` with `contents`
///
/// The new text must parse. With `backup`, the previous contents are kept as
/// `<file>.backup`. The write goes to a sibling temp file that is renamed
/// over the original.
pub fn save(path: &Path, contents: &str, backup: bool) -> Result<()> {
    // Never write something we could not read back
    Project::parse(contents).context("Refusing to write a descriptor that no longer parses")?;

    if backup {
        let backup_path = backup_path(path);
        fs::copy(path, &backup_path)
            .with_context(|| format!("Failed to write backup {}", backup_path.display()))?;
        tracing::info!("backup written to {}", backup_path.display());
    }

    // Write to a sibling file, then swap it in
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| DESCRIPTOR_FILE.to_string());
    let temp_path = path.with_file_name(format!(".{}.pbxpatch-tmp", file_name));

    fs::write(&temp_path, contents)
        .with_context(|| format!("Failed to write {}", temp_path.display()))?;
    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(e).with_context(|| format!("Failed to replace {}", path.display()));
    }

    Ok(())
}

pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".backup");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = "{\n\tobjects = {\n\t};\n\trootObject = P;\n}\n";

    #[test]
    fn test_resolve_bundle_directory() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = dir.path().join("App.xcodeproj");
        fs::create_dir(&bundle).unwrap();
        assert_eq!(resolve_descriptor(&bundle), bundle.join("project.pbxproj"));

        let file = bundle.join("project.pbxproj");
        assert_eq!(resolve_descriptor(&file), file);
    }

    #[test]
    fn test_save_with_backup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("project.pbxproj");
        fs::write(&path, MINIMAL).unwrap();

        let updated = MINIMAL.replace("P;", "Q;");
        save(&path, &updated, true).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), updated);
        assert_eq!(fs::read_to_string(backup_path(&path)).unwrap(), MINIMAL);
        assert!(!dir.path().join(".project.pbxproj.pbxpatch-tmp").exists());
    }

    #[test]
    fn test_save_refuses_unparsable_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("project.pbxproj");
        fs::write(&path, MINIMAL).unwrap();

        assert!(save(&path, "{ objects = {", false).is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), MINIMAL);
    }
}

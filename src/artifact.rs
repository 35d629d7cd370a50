use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::constants::isa;

/// What a new artifact is, which decides its file type and build phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Source,
    Framework,
    DataModel,
    Resource,
}

impl ArtifactKind {
    /// Guess the kind from a file extension
    pub fn infer(path: &str) -> Self {
        match extension(path).as_deref() {
            Some("swift" | "m" | "mm" | "c" | "cc" | "cpp" | "metal") => ArtifactKind::Source,
            Some("framework" | "xcframework") => ArtifactKind::Framework,
            Some("xcdatamodeld") => ArtifactKind::DataModel,
            _ => ArtifactKind::Resource,
        }
    }

    /// `isa` of the build phase that consumes this kind
    pub fn phase_isa(self) -> &'static str {
        match self {
            ArtifactKind::Source | ArtifactKind::DataModel => isa::SOURCES_PHASE,
            ArtifactKind::Framework => isa::FRAMEWORKS_PHASE,
            ArtifactKind::Resource => isa::RESOURCES_PHASE,
        }
    }

    /// Word used in `X in <label>` build-file comments
    pub fn phase_label(self) -> &'static str {
        match self {
            ArtifactKind::Source | ArtifactKind::DataModel => "Sources",
            ArtifactKind::Framework => "Frameworks",
            ArtifactKind::Resource => "Resources",
        }
    }
}

impl FromStr for ArtifactKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "source" => Ok(ArtifactKind::Source),
            "framework" => Ok(ArtifactKind::Framework),
            "data-model" | "datamodel" => Ok(ArtifactKind::DataModel),
            "resource" => Ok(ArtifactKind::Resource),
            other => Err(format!(
                "unknown artifact kind `{}` (expected source, framework, data-model or resource)",
                other
            )),
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArtifactKind::Source => "source",
            ArtifactKind::Framework => "framework",
            ArtifactKind::DataModel => "data-model",
            ArtifactKind::Resource => "resource",
        };
        f.write_str(name)
    }
}

/// A file to register in the project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Display name, normally the last path component
    pub name: String,
    /// Path relative to the containing group (or to the SDK)
    pub path: String,
    pub kind: ArtifactKind,
    pub source_tree: String,
}

impl Artifact {
    pub fn from_path(path: &str) -> Self {
        Self::with_kind(path, ArtifactKind::infer(path))
    }

    pub fn with_kind(path: &str, kind: ArtifactKind) -> Self {
        Artifact {
            name: file_name(path),
            path: path.to_string(),
            kind,
            source_tree: "<group>".to_string(),
        }
    }

    /// An SDK framework such as `FileProvider` or `FileProvider.framework`
    pub fn system_framework(name: &str) -> Self {
        let name = if name.ends_with(".framework") {
            name.to_string()
        } else {
            format!("{}.framework", name)
        };
        Artifact {
            path: format!("System/Library/Frameworks/{}", name),
            name,
            kind: ArtifactKind::Framework,
            source_tree: "SDKROOT".to_string(),
        }
    }

    /// Current model version inside an `.xcdatamodeld` bundle
    ///
    /// `Foo.xcdatamodeld` holds `Foo.xcdatamodel`, with a path relative to
    /// the bundle.
    pub fn model_version(&self) -> Artifact {
        let stem = self
            .name
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .unwrap_or(&self.name);
        Artifact::with_kind(&format!("{}.xcdatamodel", stem), ArtifactKind::DataModel)
    }

    /// Value written to `lastKnownFileType`
    pub fn file_type(&self) -> &'static str {
        match extension(&self.path).as_deref() {
            Some("swift") => "sourcecode.swift",
            Some("m") => "sourcecode.c.objc",
            Some("mm") => "sourcecode.cpp.objcpp",
            Some("c") => "sourcecode.c.c",
            Some("cc" | "cpp") => "sourcecode.cpp.cpp",
            Some("h") => "sourcecode.c.h",
            Some("metal") => "sourcecode.metal",
            Some("framework") => "wrapper.framework",
            Some("xcframework") => "wrapper.xcframework",
            Some("xcdatamodeld") => "wrapper.xcdatamodeld",
            Some("xcdatamodel") => "wrapper.xcdatamodel",
            Some("xcassets") => "folder.assetcatalog",
            Some("icns") => "image.icns",
            Some("png") => "image.png",
            Some("json") => "text.json",
            Some("plist") => "text.plist.xml",
            Some("strings") => "text.plist.strings",
            Some("entitlements") => "text.plist.entitlements",
            Some("storyboard") => "file.storyboard",
            Some("xib") => "file.xib",
            Some("sh") => "text.script.sh",
            _ => "text",
        }
    }

    /// `name` is only written when it differs from the last path component
    pub fn needs_explicit_name(&self) -> bool {
        file_name(&self.path) != self.name
    }
}

fn extension(path: &str) -> Option<String> {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

fn file_name(path: &str) -> String {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(path)
        .to_string()
}

/// Constants shared by the descriptor patcher and the icon generator

pub mod isa {
    pub const BUILD_FILE: &str = "PBXBuildFile";
    pub const FILE_REFERENCE: &str = "PBXFileReference";
    pub const GROUP: &str = "PBXGroup";
    pub const VARIANT_GROUP: &str = "PBXVariantGroup";
    pub const VERSION_GROUP: &str = "XCVersionGroup";
    pub const NATIVE_TARGET: &str = "PBXNativeTarget";
    pub const PROJECT: &str = "PBXProject";
    pub const SOURCES_PHASE: &str = "PBXSourcesBuildPhase";
    pub const FRAMEWORKS_PHASE: &str = "PBXFrameworksBuildPhase";
    pub const RESOURCES_PHASE: &str = "PBXResourcesBuildPhase";
    pub const SHELL_SCRIPT_PHASE: &str = "PBXShellScriptBuildPhase";
    pub const COPY_FILES_PHASE: &str = "PBXCopyFilesBuildPhase";
    pub const HEADERS_PHASE: &str = "PBXHeadersBuildPhase";
    pub const BUILD_CONFIGURATION: &str = "XCBuildConfiguration";

    /// Record kinds that carry a `path` pointing at something on disk
    pub const PATH_CARRIERS: [&str; 4] = [FILE_REFERENCE, GROUP, VARIANT_GROUP, VERSION_GROUP];

    /// Record kinds that own an ordered `children` list
    pub const CONTAINERS: [&str; 3] = [GROUP, VARIANT_GROUP, VERSION_GROUP];
}

pub mod layout {
    /// Indentation of records inside the `objects` dictionary
    pub const OBJECT_INDENT: &str = "\t\t";

    /// Indentation of fields inside a multi-line record
    pub const FIELD_INDENT: &str = "\t\t\t";

    /// Value Xcode writes for `buildActionMask` on every build phase
    pub const BUILD_ACTION_MASK: &str = "2147483647";

    /// Length of identifiers generated for new records
    pub const OBJECT_ID_LEN: usize = 24;

    /// Name of the descriptor inside an `.xcodeproj` bundle
    pub const DESCRIPTOR_FILE: &str = "project.pbxproj";
}

pub mod icon {
    /// Side lengths generated when nothing else is configured
    pub const DEFAULT_SIZES: [u32; 7] = [16, 32, 64, 128, 256, 512, 1024];

    /// Largest side length accepted from configuration
    pub const MAX_SIZE: u32 = 2048;

    /// Glyph rendered by the first strategy
    pub const DEFAULT_GLYPH: &str = "\u{267E}\u{FE0F}";

    /// Share of the icon side used as font size
    pub const GLYPH_SCALE: f32 = 0.7;

    /// Accent colour (#007AFF) used by the shape and solid strategies
    pub const ACCENT: [u8; 4] = [0, 122, 255, 255];

    /// Peak opacity of the radial background behind the rings
    pub const GRADIENT_PEAK_ALPHA: f32 = 0.1;
}

use std::path::{Path, PathBuf};

use tracing::info;

/// Replacement brand logo to composite over the erased watermark area.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogoPreset {
    LakeB2b,
    Champions,
    Ampliz,
    None,
}

impl LogoPreset {
    pub const ALL: [LogoPreset; 4] = [
        LogoPreset::LakeB2b,
        LogoPreset::Champions,
        LogoPreset::Ampliz,
        LogoPreset::None,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "lakeb2b" => Some(Self::LakeB2b),
            "champions" => Some(Self::Champions),
            "ampliz" => Some(Self::Ampliz),
            "none" => Some(Self::None),
            _ => None,
        }
    }

    pub fn id(self) -> &'static str {
        match self {
            Self::LakeB2b => "lakeb2b",
            Self::Champions => "champions",
            Self::Ampliz => "ampliz",
            Self::None => "none",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::LakeB2b => "LakeB2B",
            Self::Champions => "Champions Group",
            Self::Ampliz => "Ampliz",
            Self::None => "Remove Only (No Logo)",
        }
    }
}

impl Default for LogoPreset {
    fn default() -> Self {
        Self::LakeB2b
    }
}

/// Outcome of a preset lookup. Absence of the asset file is a normal
/// branch the caller must handle, never an error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogoAsset {
    /// Preset "none": erase the watermark, composite nothing.
    NoOverlay,
    /// Asset file found; composite it.
    File(PathBuf),
    /// Named preset whose asset file is missing on disk.
    Unavailable,
}

/// Logo asset directory, resolved once at startup and shared read-only
/// across requests.
#[derive(Clone, Debug)]
pub struct LogoLibrary {
    dir: PathBuf,
}

impl LogoLibrary {
    /// Pick the asset directory from a prioritized candidate list: explicit
    /// config override, the deployment mount, the dev-convenience folder
    /// next to the crate, then the packaged default. First existing
    /// directory wins for the life of the process.
    pub fn locate(override_dir: Option<&Path>) -> Self {
        let packaged_default = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("assets")
            .join("logos");
        let dev_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("Images & Logos");

        let candidates = [
            override_dir.map(Path::to_path_buf),
            Some(PathBuf::from("/app/assets/logos")),
            Some(dev_dir),
            Some(packaged_default.clone()),
        ];

        let dir = candidates
            .into_iter()
            .flatten()
            .find(|path| path.is_dir())
            .unwrap_or(packaged_default);

        info!(dir = %dir.display(), "Logo asset directory resolved");
        Self { dir }
    }

    /// Fixed directory, bypassing the candidate search. Used by tests.
    pub fn at(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn resolve(&self, preset: LogoPreset) -> LogoAsset {
        if preset == LogoPreset::None {
            return LogoAsset::NoOverlay;
        }

        let path = self.dir.join(format!("{}.png", preset.id()));
        if path.is_file() {
            LogoAsset::File(path)
        } else {
            LogoAsset::Unavailable
        }
    }

    /// Availability as reported by the presets endpoint. "none" needs no
    /// asset and is always available.
    pub fn is_available(&self, preset: LogoPreset) -> bool {
        !matches!(self.resolve(preset), LogoAsset::Unavailable)
    }
}

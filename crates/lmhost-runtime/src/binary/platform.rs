//! Platform detection and release asset selection.

use std::fmt;

/// How a release asset packages the executable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetFormat {
    /// gzip-compressed tarball; the executable is at `bin/ollama`.
    TarGz,
    /// zip archive; the executable is at the archive root.
    Zip,
    /// The asset is the executable itself.
    Raw,
}

/// A downloadable release asset for one platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReleaseAsset {
    pub name: &'static str,
    pub format: AssetFormat,
}

/// Operating system and CPU architecture, as reported by `std::env::consts`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub os: String,
    pub arch: String,
}

impl Platform {
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    pub fn current() -> Self {
        Self::new(std::env::consts::OS, std::env::consts::ARCH)
    }

    pub fn is_windows(&self) -> bool {
        self.os == "windows"
    }

    /// File name of the server executable on this platform.
    pub fn executable_name(&self) -> &'static str {
        if self.is_windows() { "ollama.exe" } else { "ollama" }
    }

    /// Subdirectory of the bundled `bin` directory holding this platform's binary.
    pub fn bundle_key(&self) -> String {
        format!("{}-{}", self.os, self.arch)
    }

    /// Release asset for this platform, or `None` when no binary is published.
    pub fn release_asset(&self) -> Option<ReleaseAsset> {
        let (name, format) = match (self.os.as_str(), self.arch.as_str()) {
            ("linux", "x86_64") => ("ollama-linux-amd64.tgz", AssetFormat::TarGz),
            ("linux", "aarch64") => ("ollama-linux-arm64.tgz", AssetFormat::TarGz),
            ("windows", "x86_64") => ("ollama-windows-amd64.zip", AssetFormat::Zip),
            ("windows", "aarch64") => ("ollama-windows-arm64.zip", AssetFormat::Zip),
            // Universal binary
            ("macos", "x86_64" | "aarch64") => ("ollama-darwin", AssetFormat::Raw),
            _ => return None,
        };
        Some(ReleaseAsset { name, format })
    }

    pub fn is_supported(&self) -> bool {
        self.release_asset().is_some()
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}

/// Options for an install run
#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    /// Copy linked modules instead of symlinking them
    pub copy: bool,
    /// Leave version control directories out of copies
    pub strip_vcs: bool,
    /// Skip devDependencies and the peer dependency pass; copies leave out node_modules
    pub production: bool,
    /// Search workspace children recursively
    pub recursive: bool,
    /// Create relative symlinks instead of absolute ones
    pub relative_links: bool,
    /// Manifest written into placeholder directories
    pub stub_manifest: StubManifestMode,
}

/// How to pick the placeholder manifest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum StubManifestMode {
    /// `full` for npm 3 and later, `empty` otherwise
    #[default]
    Auto,
    /// `{}`
    Empty,
    /// A copy of the linked module's own `package.json`
    Full,
}

/// Resolved placeholder manifest strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StubManifest {
    Empty,
    Full,
}

impl StubManifestMode {
    /// Resolve `Auto` against the package manager's major version.
    /// npm 3 flattens the tree and needs real metadata to decide where
    /// a package goes.
    pub fn resolve(self, npm_major: Option<u32>) -> StubManifest {
        match self {
            Self::Empty => StubManifest::Empty,
            Self::Full => StubManifest::Full,
            Self::Auto => match npm_major {
                Some(major) if major >= 3 => StubManifest::Full,
                _ => StubManifest::Empty,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stub_manifest_resolution() {
        assert_eq!(StubManifestMode::Auto.resolve(Some(2)), StubManifest::Empty);
        assert_eq!(StubManifestMode::Auto.resolve(Some(3)), StubManifest::Full);
        assert_eq!(StubManifestMode::Auto.resolve(None), StubManifest::Empty);
        assert_eq!(StubManifestMode::Empty.resolve(Some(10)), StubManifest::Empty);
        assert_eq!(StubManifestMode::Full.resolve(None), StubManifest::Full);
    }
}

use anyhow::Result;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use super::{PACKAGE_DESCRIPTOR, read_json};
use crate::error::WorkspaceError;
use crate::runtime::Runtime;

/// The fields of `package.json` the installer cares about
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PackageDescriptor {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub dev_dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub peer_dependencies: BTreeMap<String, String>,
}

impl PackageDescriptor {
    pub fn load<R: Runtime>(runtime: &R, dir: &Path) -> Result<Self> {
        read_json(runtime, &dir.join(PACKAGE_DESCRIPTOR))
    }

    /// `dependencies` plus `devDependencies` unless `production` is set.
    /// A name declared in both keeps its `dependencies` requirement.
    pub fn working_dependencies(&self, production: bool) -> BTreeMap<String, String> {
        let mut deps = self.dependencies.clone();
        if !production {
            for (name, requirement) in &self.dev_dependencies {
                deps.entry(name.clone())
                    .or_insert_with(|| requirement.clone());
            }
        }
        deps
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("(unnamed)")
    }
}

/// Read `package.json` from `dir`, or `Ok(None)` if there is none.
#[tracing::instrument(skip(runtime))]
pub fn find_package_descriptor<R: Runtime>(
    runtime: &R,
    dir: &Path,
) -> Result<Option<PackageDescriptor>> {
    if !runtime.exists(&dir.join(PACKAGE_DESCRIPTOR)) {
        return Ok(None);
    }
    PackageDescriptor::load(runtime, dir).map(Some)
}

/// Like [`find_package_descriptor`], but a missing descriptor is an error.
pub fn load_package_descriptor<R: Runtime>(runtime: &R, dir: &Path) -> Result<PackageDescriptor> {
    find_package_descriptor(runtime, dir)?.ok_or_else(|| {
        WorkspaceError::PackageDescriptorNotFound {
            dir: dir.to_path_buf(),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;
    use mockall::predicate::eq;
    use std::path::PathBuf;

    fn runtime_with_manifest(json: &'static str) -> MockRuntime {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_exists()
            .with(eq(PathBuf::from("/ws/prj1/package.json")))
            .returning(|_| true);
        runtime
            .expect_read_to_string()
            .with(eq(PathBuf::from("/ws/prj1/package.json")))
            .returning(move |_| Ok(json.to_string()));
        runtime
    }

    #[test]
    fn test_parses_all_dependency_tables() {
        let runtime = runtime_with_manifest(
            r#"{
                "name": "prj1",
                "version": "1.0.0",
                "scripts": { "test": "mocha" },
                "dependencies": { "prj2": "1.0.0", "lodash": "^4.0.0" },
                "devDependencies": { "mocha": "*" },
                "peerDependencies": { "react": ">=16" }
            }"#,
        );

        let pkg = find_package_descriptor(&runtime, Path::new("/ws/prj1"))
            .unwrap()
            .unwrap();
        assert_eq!(pkg.name.as_deref(), Some("prj1"));
        assert_eq!(pkg.version.as_deref(), Some("1.0.0"));
        assert_eq!(pkg.dependencies.len(), 2);
        assert_eq!(pkg.dev_dependencies["mocha"], "*");
        assert_eq!(pkg.peer_dependencies["react"], ">=16");
    }

    #[test]
    fn test_working_dependencies_respects_production() {
        let runtime = runtime_with_manifest(
            r#"{
                "dependencies": { "prj2": "1.0.0", "shared": "^1.0.0" },
                "devDependencies": { "mocha": "*", "shared": "^2.0.0" }
            }"#,
        );
        let pkg = load_package_descriptor(&runtime, Path::new("/ws/prj1")).unwrap();

        let dev = pkg.working_dependencies(false);
        assert_eq!(dev.len(), 3);
        assert_eq!(dev["shared"], "^1.0.0");

        let prod = pkg.working_dependencies(true);
        assert_eq!(prod.keys().collect::<Vec<_>>(), vec!["prj2", "shared"]);
    }

    #[test]
    fn test_missing_manifest() {
        let mut runtime = MockRuntime::new();
        runtime.expect_exists().returning(|_| false);

        assert!(
            find_package_descriptor(&runtime, Path::new("/ws/prj1"))
                .unwrap()
                .is_none()
        );

        let err = load_package_descriptor(&runtime, Path::new("/ws/prj1")).unwrap_err();
        assert!(
            err.to_string()
                .contains("package descriptor not found in /ws/prj1")
        );
    }
}

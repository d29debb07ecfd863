//! Per-package environment overlay.
//!
//! Each package's build steps see an ordered set of environment variables
//! layering the package-private workspace paths over the shared install
//! root. The overlay is recomputed for every package instance; nothing
//! here mutates the ambient process environment, so one package's paths
//! can never leak into another's build.

use std::path::Path;

use crate::build::toolchain::ToolchainContext;
use crate::util::process::ProcessBuilder;

/// The derived environment for one package build (or for the bare
/// install-root, see [`EnvironmentOverlay::for_prefix`]).
#[derive(Debug, Clone)]
pub struct EnvironmentOverlay {
    vars: Vec<(String, String)>,
}

impl EnvironmentOverlay {
    /// Build the overlay for a package: toolchain, install root, and the
    /// package's private workspace directory.
    pub fn for_package(
        toolchain: &ToolchainContext,
        prefix: &Path,
        pkg_dir: &Path,
    ) -> EnvironmentOverlay {
        let mut vars = Vec::new();

        vars.push(("PATH".to_string(), prefixed_path(prefix)));

        // Library and header search: package-private first, install root
        // second, host defaults never.
        let lib_dirs = [pkg_dir.join("lib"), prefix.join("lib")];
        let include_dirs = [pkg_dir.join("include"), prefix.join("include")];

        let mut ldflags: Vec<String> =
            lib_dirs.iter().map(|d| format!("-L{}", d.display())).collect();
        ldflags.extend(toolchain.ldflags.iter().cloned());
        vars.push(("LDFLAGS".to_string(), ldflags.join(" ")));

        let cppflags: Vec<String> = include_dirs
            .iter()
            .map(|d| format!("-I{}", d.display()))
            .collect();
        vars.push(("CPPFLAGS".to_string(), cppflags.join(" ")));

        vars.push(("CFLAGS".to_string(), toolchain.cflags.join(" ")));

        vars.push(("CC".to_string(), toolchain.cc.display().to_string()));
        if let Some(cxx) = &toolchain.cxx {
            vars.push(("CXX".to_string(), cxx.display().to_string()));
        }
        vars.push(("AR".to_string(), toolchain.ar.display().to_string()));
        vars.push(("MAKEFLAGS".to_string(), format!("-j{}", toolchain.jobs)));

        // Autotools macro search.
        let aclocal = prefix.join("share").join("aclocal");
        vars.push(("ACLOCAL_PATH".to_string(), aclocal.display().to_string()));
        vars.push(("M4PATH".to_string(), aclocal.display().to_string()));

        // pkg-config restricted to the private and shared locations only;
        // setting PKG_CONFIG_LIBDIR (not just _PATH) shuts out the host's
        // system-wide .pc files entirely.
        let pkgconfig = join_paths(&[
            pkg_dir.join("lib").join("pkgconfig"),
            prefix.join("lib").join("pkgconfig"),
        ]);
        vars.push(("PKG_CONFIG_PATH".to_string(), pkgconfig.clone()));
        vars.push(("PKG_CONFIG_LIBDIR".to_string(), pkgconfig));

        EnvironmentOverlay { vars }
    }

    /// Build the overlay for running a command inside the install root,
    /// with no package workspace and no toolchain (used by `keelson exec`).
    pub fn for_prefix(prefix: &Path) -> EnvironmentOverlay {
        let mut vars = Vec::new();
        vars.push(("PATH".to_string(), prefixed_path(prefix)));
        vars.push((
            "LDFLAGS".to_string(),
            format!("-L{}", prefix.join("lib").display()),
        ));
        vars.push((
            "CPPFLAGS".to_string(),
            format!("-I{}", prefix.join("include").display()),
        ));
        let aclocal = prefix.join("share").join("aclocal");
        vars.push(("ACLOCAL_PATH".to_string(), aclocal.display().to_string()));
        EnvironmentOverlay { vars }
    }

    /// The ordered variables of this overlay.
    pub fn vars(&self) -> &[(String, String)] {
        &self.vars
    }

    /// Look up a variable by name.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Apply the overlay to a process builder.
    pub fn apply(&self, cmd: ProcessBuilder) -> ProcessBuilder {
        cmd.envs(self.vars.iter())
    }
}

/// Install-root `bin` and `sbin` prepended to the inherited PATH.
fn prefixed_path(prefix: &Path) -> String {
    let mut parts = vec![
        prefix.join("bin").display().to_string(),
        prefix.join("sbin").display().to_string(),
    ];
    if let Ok(inherited) = std::env::var("PATH") {
        if !inherited.is_empty() {
            parts.push(inherited);
        }
    }
    parts.join(":")
}

fn join_paths(paths: &[std::path::PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(":")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use crate::build::toolchain::Profile;

    fn toolchain() -> ToolchainContext {
        ToolchainContext {
            cc: PathBuf::from("/usr/bin/cc"),
            cxx: Some(PathBuf::from("/usr/bin/c++")),
            ar: PathBuf::from("/usr/bin/ar"),
            os: "linux".to_string(),
            arch: "x86_64".to_string(),
            cflags: vec!["-O2".to_string()],
            ldflags: vec!["-flto".to_string()],
            jobs: 8,
            profile: Profile::Release,
            strip: true,
            lto: true,
        }
    }

    #[test]
    fn test_private_paths_come_first() {
        let overlay = EnvironmentOverlay::for_package(
            &toolchain(),
            Path::new("/opt/boot"),
            Path::new("/tmp/session/gm4"),
        );

        let ldflags = overlay.get("LDFLAGS").unwrap();
        let private = ldflags.find("-L/tmp/session/gm4/lib").unwrap();
        let shared = ldflags.find("-L/opt/boot/lib").unwrap();
        assert!(private < shared);
        assert!(ldflags.contains("-flto"));

        let cppflags = overlay.get("CPPFLAGS").unwrap();
        assert!(
            cppflags.find("/tmp/session/gm4/include").unwrap()
                < cppflags.find("/opt/boot/include").unwrap()
        );
    }

    #[test]
    fn test_path_prepends_prefix_bins() {
        let overlay = EnvironmentOverlay::for_package(
            &toolchain(),
            Path::new("/opt/boot"),
            Path::new("/tmp/session/gm4"),
        );

        let path = overlay.get("PATH").unwrap();
        assert!(path.starts_with("/opt/boot/bin:/opt/boot/sbin"));
    }

    #[test]
    fn test_pkg_config_excludes_system_dirs() {
        let overlay = EnvironmentOverlay::for_package(
            &toolchain(),
            Path::new("/opt/boot"),
            Path::new("/tmp/session/gm4"),
        );

        let libdir = overlay.get("PKG_CONFIG_LIBDIR").unwrap();
        assert_eq!(
            libdir,
            "/tmp/session/gm4/lib/pkgconfig:/opt/boot/lib/pkgconfig"
        );
        assert_eq!(overlay.get("PKG_CONFIG_PATH"), Some(libdir));
    }

    #[test]
    fn test_toolchain_vars_present() {
        let overlay = EnvironmentOverlay::for_package(
            &toolchain(),
            Path::new("/opt/boot"),
            Path::new("/tmp/session/gm4"),
        );

        assert_eq!(overlay.get("CC"), Some("/usr/bin/cc"));
        assert_eq!(overlay.get("CXX"), Some("/usr/bin/c++"));
        assert_eq!(overlay.get("AR"), Some("/usr/bin/ar"));
        assert_eq!(overlay.get("MAKEFLAGS"), Some("-j8"));
        assert_eq!(overlay.get("CFLAGS"), Some("-O2"));
    }

    #[test]
    fn test_overlays_are_independent() {
        let tc = toolchain();
        let a =
            EnvironmentOverlay::for_package(&tc, Path::new("/opt/boot"), Path::new("/s/a"));
        let b =
            EnvironmentOverlay::for_package(&tc, Path::new("/opt/boot"), Path::new("/s/b"));

        assert!(a.get("LDFLAGS").unwrap().contains("/s/a/lib"));
        assert!(!b.get("LDFLAGS").unwrap().contains("/s/a/lib"));
    }

    #[test]
    fn test_prefix_only_overlay() {
        let overlay = EnvironmentOverlay::for_prefix(Path::new("/opt/boot"));
        assert!(overlay.get("PATH").unwrap().starts_with("/opt/boot/bin"));
        assert!(overlay.get("CC").is_none());
    }
}

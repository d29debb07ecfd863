//! Source archive extraction.
//!
//! Extracts a downloaded archive into a package's workspace, stripping the
//! archive's top-level directory component and preserving no ownership
//! metadata. Entries that would escape the destination are rejected.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Component, Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use flate2::read::GzDecoder;
use tar::{Archive, EntryType};
use xz2::read::XzDecoder;

use crate::core::recipe::ArchiveKind;
use crate::util::fs::ensure_dir;

/// Extract `archive` of the given kind into `dest`, dropping the leading
/// path component of every entry.
pub fn extract_archive(archive: &Path, kind: ArchiveKind, dest: &Path) -> Result<()> {
    let file = File::open(archive)
        .with_context(|| format!("failed to open archive: {}", archive.display()))?;
    let reader = BufReader::new(file);

    match kind {
        ArchiveKind::TarGz => unpack(Box::new(GzDecoder::new(reader)), dest),
        ArchiveKind::TarXz => unpack(Box::new(XzDecoder::new(reader)), dest),
    }
    .with_context(|| format!("failed to extract {}", archive.display()))
}

fn unpack(decoder: Box<dyn Read>, dest: &Path) -> Result<()> {
    let mut archive = Archive::new(decoder);
    archive.set_preserve_permissions(true);
    archive.set_preserve_ownerships(false);

    ensure_dir(dest)?;

    for entry in archive.entries().context("failed to read archive entries")? {
        let mut entry = entry.context("failed to read archive entry")?;
        let entry_path = entry.path().context("failed to get entry path")?.into_owned();

        let Some(stripped) = strip_top_level(&entry_path) else {
            // The top-level directory itself, or a bare top-level file.
            continue;
        };

        if stripped
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::RootDir))
        {
            bail!("archive entry escapes destination: {}", entry_path.display());
        }

        let output_path = dest.join(&stripped);

        match entry.header().entry_type() {
            EntryType::Directory => {
                ensure_dir(&output_path)?;
            }
            EntryType::Regular | EntryType::Continuous => {
                if let Some(parent) = output_path.parent() {
                    ensure_dir(parent)?;
                }
                entry.unpack(&output_path).with_context(|| {
                    format!("failed to extract file: {}", output_path.display())
                })?;
            }
            EntryType::Link => {
                // Hard link targets are archive-root-relative, so they get
                // the same top-level strip and escape checks as entry paths.
                let raw_target = entry
                    .link_name()
                    .context("failed to read hard link target")?
                    .ok_or_else(|| {
                        anyhow!("hard link without target: {}", entry_path.display())
                    })?;
                let Some(target) = strip_top_level(&raw_target) else {
                    bail!("hard link target escapes destination: {}", entry_path.display());
                };
                if target
                    .components()
                    .any(|c| matches!(c, Component::ParentDir | Component::RootDir))
                {
                    bail!("hard link target escapes destination: {}", entry_path.display());
                }
                if let Some(parent) = output_path.parent() {
                    ensure_dir(parent)?;
                }
                std::fs::hard_link(dest.join(&target), &output_path).with_context(|| {
                    format!("failed to create hard link: {}", output_path.display())
                })?;
            }
            EntryType::Symlink => {
                #[cfg(unix)]
                if let Ok(Some(target)) = entry.link_name() {
                    // Symlink targets are relative to the link's own
                    // directory; resolve lexically and keep them inside.
                    if link_escapes(&output_path, target.as_ref(), dest) {
                        bail!(
                            "link target escapes destination: {}",
                            entry_path.display()
                        );
                    }
                    if let Some(parent) = output_path.parent() {
                        ensure_dir(parent)?;
                    }
                    std::os::unix::fs::symlink(target.as_ref(), &output_path).with_context(
                        || format!("failed to create symlink: {}", output_path.display()),
                    )?;
                }
            }
            other => {
                tracing::debug!(
                    "skipping unsupported entry type {:?}: {}",
                    other,
                    entry_path.display()
                );
            }
        }
    }

    Ok(())
}

/// Lexically resolve a symlink target against the link's directory and
/// check whether it leaves `dest`. Absolute targets always escape.
fn link_escapes(link: &Path, target: &Path, dest: &Path) -> bool {
    if target.is_absolute() {
        return true;
    }
    let mut resolved = match link.parent() {
        Some(parent) => parent.to_path_buf(),
        None => return true,
    };
    for component in target.components() {
        match component {
            Component::ParentDir => {
                if !resolved.pop() || !resolved.starts_with(dest) {
                    return true;
                }
            }
            Component::Normal(name) => resolved.push(name),
            Component::CurDir => {}
            Component::RootDir | Component::Prefix(_) => return true,
        }
    }
    !resolved.starts_with(dest)
}

/// Drop the first path component (the archive's wrapping directory).
fn strip_top_level(path: &Path) -> Option<PathBuf> {
    let mut components = path.components();
    components.next()?;
    let rest: PathBuf = components.collect();
    if rest.as_os_str().is_empty() {
        None
    } else {
        Some(rest)
    }
}

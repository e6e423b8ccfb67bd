use std::path::Path;

use walkdir::WalkDir;

use crate::error::SkillError;
use crate::types::{BundledFile, FileCategory, SKILL_FILE_NAME};

/// Recursively list the files bundled with a skill, excluding its SKILL.md.
///
/// Only leaf files are recorded; each is classified by its top-level directory.
///
/// # Errors
///
/// Returns an error if the directory tree cannot be walked.
pub fn discover_bundled_files(skill_dir: &Path) -> Result<Vec<BundledFile>, SkillError> {
    let skill_md = skill_dir.join(SKILL_FILE_NAME);
    let mut files = Vec::new();

    for entry in WalkDir::new(skill_dir)
        .min_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| {
            SkillError::Io(e.into_io_error().unwrap_or_else(|| {
                std::io::Error::other(format!("walk failed under {}", skill_dir.display()))
            }))
        })?;
        if entry.file_type().is_dir() || entry.path() == skill_md {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(skill_dir) else {
            continue;
        };
        files.push(BundledFile {
            category: FileCategory::from_relative(relative),
            relative_path: relative.to_path_buf(),
            absolute_path: entry.path().to_path_buf(),
        });
    }

    Ok(files)
}

/// Read a bundled file with path traversal protection.
///
/// # Errors
///
/// Returns [`SkillError::PathTraversal`] if the resolved path escapes the skill
/// directory, or an I/O error if it cannot be read.
pub fn load_resource(skill_dir: &Path, relative_path: &str) -> Result<Vec<u8>, SkillError> {
    let canonical_base = skill_dir.canonicalize()?;
    let canonical_target = skill_dir.join(relative_path).canonicalize()?;

    if !canonical_target.starts_with(&canonical_base) {
        return Err(SkillError::PathTraversal(format!(
            "{relative_path} escapes {}",
            skill_dir.display()
        )));
    }

    Ok(std::fs::read(&canonical_target)?)
}

//! New-skill scaffolding.

use std::path::{Path, PathBuf};

use skilldeck_skills::Header;
use skilldeck_skills::types::SKILL_FILE_NAME;

use crate::error::ServiceError;

const PLACEHOLDER_DESCRIPTION: &str = "Brief description of what this skill does and when to use it";

const PLACEHOLDERS: &[(&str, &str)] = &[
    (
        "scripts/example.sh",
        "#!/bin/bash\n# Example script\necho 'Hello from skill script'\n",
    ),
    (
        "references/additional-docs.md",
        "# Additional Documentation\n\nAdd detailed reference material here.\n",
    ),
    ("assets/.gitkeep", ""),
];

fn skill_template(name: &str) -> String {
    format!(
        r#"---
name: "{name}"
description: "{PLACEHOLDER_DESCRIPTION}"
---

# {name}

## Overview

Describe what this skill does and its main purpose.

## Instructions

### Step 1: [First Step]

Detailed instructions for the first step.

### Step 2: [Second Step]

Detailed instructions for the second step.

## Examples

### Example 1

[Show a concrete example]

## Best Practices

- Practice 1
- Practice 2
- Practice 3

## References

See [references/additional-docs.md](references/additional-docs.md) for more details.
"#
    )
}

fn check_name(name: &str) -> Result<(), ServiceError> {
    let usable = !name.is_empty()
        && name == name.trim()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', ':', '"']);
    if !usable {
        return Err(ServiceError::InvalidName(name.to_owned()));
    }
    Header {
        name: name.to_owned(),
        description: PLACEHOLDER_DESCRIPTION.to_owned(),
        ..Header::default()
    }
    .validate()?;
    Ok(())
}

/// Create `<base_dir>/<name>/` with a template SKILL.md and placeholder
/// `scripts/`, `references/` and `assets/` files. Returns the skill directory.
///
/// # Errors
///
/// Returns [`ServiceError::InvalidName`] or a header validation error for an
/// unusable name, [`ServiceError::AlreadyExists`] if the directory exists, or
/// an I/O error.
pub fn create_skill(base_dir: &Path, name: &str) -> Result<PathBuf, ServiceError> {
    check_name(name)?;

    let skill_dir = base_dir.join(name);
    if skill_dir.exists() {
        return Err(ServiceError::AlreadyExists(skill_dir));
    }

    for sub in ["scripts", "references", "assets"] {
        std::fs::create_dir_all(skill_dir.join(sub))?;
    }
    std::fs::write(skill_dir.join(SKILL_FILE_NAME), skill_template(name))?;
    for (relative, content) in PLACEHOLDERS {
        std::fs::write(skill_dir.join(relative), content)?;
    }

    tracing::info!(name, dir = %skill_dir.display(), "skill created");
    Ok(skill_dir)
}

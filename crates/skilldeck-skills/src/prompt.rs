use std::fmt::Write;

use crate::types::SkillMetadata;

// Tags (lowercase) that would break the block structure if a description
// contained them verbatim. Matching is case-insensitive.
const SANITIZE_PATTERNS: &[(&str, &str)] = &[
    ("</skill>", "&lt;/skill&gt;"),
    ("<skill>", "&lt;skill&gt;"),
    ("</available_skills>", "&lt;/available_skills&gt;"),
    ("<available_skills>", "&lt;available_skills&gt;"),
];

const SKILLS_INSTRUCTIONS: &str = "<skills_instructions>
When a task matches one of the available skills, follow these steps:

1. **Discovery**: Check <available_skills> to see if any skill matches the current task
2. **Load Instructions**: Load the full SKILL.md content from the skill's location, or view its outline first and then only the sections you need
3. **Follow Instructions**: Execute the task according to the loaded skill instructions
4. **Reference Files**: If the skill references additional files (scripts/, references/, assets/), load them as needed

Skills provide specialized workflows and domain knowledge. Always prefer using a relevant skill over improvising when one is available.
</skills_instructions>
";

/// Case-insensitive replacement of `pattern` (given in lowercase) with `replacement` in `src`.
fn replace_case_insensitive(src: &str, pattern: &str, replacement: &str) -> String {
    let lower = src.to_ascii_lowercase();
    let mut out = String::with_capacity(src.len());
    let mut pos = 0;
    while let Some(ch) = src[pos..].chars().next() {
        if lower[pos..].starts_with(pattern) {
            out.push_str(replacement);
            pos += pattern.len();
        } else {
            out.push(ch);
            pos += ch.len_utf8();
        }
    }
    out
}

/// Escape block tags that could close or open a `<skill>` entry early.
#[must_use]
pub fn sanitize(text: &str) -> String {
    let mut out = text.to_owned();
    for (pattern, replacement) in SANITIZE_PATTERNS {
        out = replace_case_insensitive(&out, pattern, replacement);
    }
    out
}

/// Render the `<available_skills>` block for prompt injection.
///
/// Returns an empty string when there are no skills so callers can omit the
/// block entirely.
#[must_use]
pub fn format_skills_section(skills: &[SkillMetadata]) -> String {
    if skills.is_empty() {
        return String::new();
    }

    let mut out = String::from("<available_skills>\n");
    for skill in skills {
        let _ = write!(
            out,
            "<skill>\n<name>\n{}\n</name>\n<description>\n{}\n</description>\n<location>\n{}\n</location>\n</skill>\n\n",
            sanitize(&skill.name),
            sanitize(&skill.description),
            skill.skill_md_path().display(),
        );
    }
    out.push_str("</available_skills>\n");
    out
}

/// Fixed usage instructions that accompany the skills block.
#[must_use]
pub fn skills_instructions() -> &'static str {
    SKILLS_INSTRUCTIONS
}

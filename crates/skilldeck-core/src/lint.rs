//! Structural checks for a single skill directory.

use std::fmt;
use std::path::Path;

use skilldeck_skills::SkillError;
use skilldeck_skills::parser::{extract_section, parse_file};
use skilldeck_skills::types::SKILL_FILE_NAME;

const MIN_BODY_CHARS: usize = 100;
const RECOMMENDED_SECTIONS: [&str; 2] = ["Instructions", "Examples"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintCheck {
    pub status: CheckStatus,
    pub message: String,
}

impl fmt::Display for LintCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = match self.status {
            CheckStatus::Pass => "✓",
            CheckStatus::Warn => "⚠",
            CheckStatus::Fail => "✗",
        };
        write!(f, "{mark} {}", self.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LintReport {
    pub checks: Vec<LintCheck>,
}

impl LintReport {
    /// True when no check failed. Warnings do not fail a skill.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.checks.iter().all(|c| c.status != CheckStatus::Fail)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &LintCheck> {
        self.checks.iter().filter(|c| c.status == CheckStatus::Warn)
    }

    fn push(&mut self, status: CheckStatus, message: impl Into<String>) {
        self.checks.push(LintCheck {
            status,
            message: message.into(),
        });
    }
}

/// Check a skill directory: document present, header valid, body long enough,
/// recommended sections present. Stops at the first failing check.
#[must_use]
pub fn lint_skill(dir: &Path) -> LintReport {
    let mut report = LintReport::default();

    let skill_md = dir.join(SKILL_FILE_NAME);
    if !skill_md.is_file() {
        report.push(
            CheckStatus::Fail,
            format!("{SKILL_FILE_NAME} not found at {}", skill_md.display()),
        );
        return report;
    }
    report.push(CheckStatus::Pass, format!("{SKILL_FILE_NAME} found"));

    let body = match parse_file(&skill_md) {
        Ok((_, body)) => body,
        Err(e @ (SkillError::MissingField(_) | SkillError::FieldTooLong { .. })) => {
            report.push(CheckStatus::Pass, "header parsed");
            report.push(CheckStatus::Fail, format!("header validation failed: {e}"));
            return report;
        }
        Err(e) => {
            report.push(CheckStatus::Fail, format!("parse error: {e}"));
            return report;
        }
    };
    report.push(CheckStatus::Pass, "header parsed");
    report.push(CheckStatus::Pass, "name and description present");

    if body.chars().count() < MIN_BODY_CHARS {
        report.push(
            CheckStatus::Warn,
            "content is very short, consider adding more instructions",
        );
    } else {
        report.push(CheckStatus::Pass, "content length OK");
    }

    for section in RECOMMENDED_SECTIONS {
        if extract_section(&body, section).is_empty() {
            report.push(
                CheckStatus::Warn,
                format!("'{section}' section recommended but not found"),
            );
        } else {
            report.push(CheckStatus::Pass, format!("'{section}' section found"));
        }
    }

    report
}

//! File and directory name rules.
//!
//! Rules run in a fixed order and the first failure wins, so the message a
//! user sees is stable for a given input.

#[cfg(test)]
#[path = "validation_test.rs"]
mod validation_test;

use std::fmt;

/// Longest accepted name, in characters, after trimming.
pub const MAX_NAME_LEN: usize = 25;

const FILE_FORBIDDEN: &[char] = &['<', '>', ':', '"', '|', '?', '*', '\\', '/'];
const DIRECTORY_FORBIDDEN: &[char] = &['<', '>', ':', '"', '|', '?', '*', '\\'];

/// Device names that cannot be used as a file or directory name on Windows.
pub const RESERVED_NAMES: [&str; 22] = [
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8", "COM9", "LPT1", "LPT2",
    "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NameKind {
    File,
    Directory,
}

impl NameKind {
    fn forbidden(self) -> &'static [char] {
        match self {
            Self::File => FILE_FORBIDDEN,
            Self::Directory => DIRECTORY_FORBIDDEN,
        }
    }

    fn forbidden_display(self) -> String {
        self.forbidden()
            .iter()
            .map(char::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for NameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::File => "File",
            Self::Directory => "Directory",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    #[error("{0} name cannot be empty")]
    Empty(NameKind),
    #[error("{} name cannot be longer than {} characters", .0, MAX_NAME_LEN)]
    TooLong(NameKind),
    #[error("{0} name cannot have leading or trailing spaces")]
    Whitespace(NameKind),
    #[error("{0} name cannot start or end with a dot")]
    Dot(NameKind),
    #[error("{} name cannot contain: {}", .0, .0.forbidden_display())]
    ForbiddenChar(NameKind),
    #[error("\"{0}\" is a reserved name and cannot be used")]
    Reserved(String),
}

/// Validate a proposed file or directory name.
///
/// # Errors
///
/// Returns the first [`NameError`] rule the name breaks.
pub fn validate_name(name: &str, kind: NameKind) -> Result<(), NameError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(NameError::Empty(kind));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(NameError::TooLong(kind));
    }
    if trimmed.len() != name.len() {
        return Err(NameError::Whitespace(kind));
    }
    if trimmed.starts_with('.') || trimmed.ends_with('.') {
        return Err(NameError::Dot(kind));
    }
    if trimmed.contains(kind.forbidden()) {
        return Err(NameError::ForbiddenChar(kind));
    }

    if is_reserved(trimmed) {
        return Err(NameError::Reserved(trimmed.to_owned()));
    }
    // CON.txt is as unusable as CON.
    let stem = trimmed.split('.').next().unwrap_or(trimmed).to_uppercase();
    if is_reserved(&stem) {
        return Err(NameError::Reserved(stem));
    }

    Ok(())
}

fn is_reserved(name: &str) -> bool {
    RESERVED_NAMES.iter().any(|reserved| reserved.eq_ignore_ascii_case(name))
}

//! Route path templates.
//!
//! A template is a literal path with `{name}` wildcard segments. A leading
//! `*` marks a catch-all wildcard (`/files/{*path}`); the marker is not part
//! of the wildcard name.

use std::collections::HashSet;

use crate::error::DesignError;

/// Extract the wildcard names of a path template, in order of appearance.
///
/// Assumes the template passed [`validate_path_template`]; unbalanced braces
/// are ignored rather than reported.
pub fn extract_wildcards(path: &str) -> Vec<String> {
    let mut wildcards = Vec::new();
    let mut rest = path;

    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        let Some(end) = after.find('}') else {
            break;
        };
        let name = after[..end].trim_start_matches('*');
        if !name.is_empty() {
            wildcards.push(name.to_string());
        }
        rest = &after[end + 1..];
    }

    wildcards
}

/// Validate path template syntax.
///
/// Checks for:
/// - A leading slash
/// - Balanced, non-nested braces
/// - Non-empty wildcard names made of alphanumerics, `_` and `.`
/// - No duplicate wildcard names in the same path
pub fn validate_path_template(path: &str) -> Result<(), DesignError> {
    if !path.starts_with('/') {
        return Err(DesignError::InvalidPathTemplate(format!(
            "{} - must start with '/'",
            path
        )));
    }

    let mut seen: HashSet<String> = HashSet::new();
    let mut current = String::new();
    let mut in_param = false;

    for ch in path.chars() {
        match ch {
            '{' => {
                if in_param {
                    return Err(DesignError::InvalidPathTemplate(format!(
                        "{} - nested braces not allowed",
                        path
                    )));
                }
                in_param = true;
            }
            '}' => {
                if !in_param {
                    return Err(DesignError::InvalidPathTemplate(format!(
                        "{} - unmatched closing brace",
                        path
                    )));
                }
                in_param = false;

                if current.is_empty() {
                    return Err(DesignError::InvalidPathTemplate(format!(
                        "{} - empty wildcard name",
                        path
                    )));
                }
                if !seen.insert(current.clone()) {
                    return Err(DesignError::InvalidPathTemplate(format!(
                        "{} - duplicate wildcard '{}'",
                        path, current
                    )));
                }
                current.clear();
            }
            '*' if in_param && current.is_empty() => {}
            _ if in_param => {
                if !ch.is_alphanumeric() && ch != '_' && ch != '.' {
                    return Err(DesignError::InvalidPathTemplate(format!(
                        "{} - invalid character '{}' in wildcard name",
                        path, ch
                    )));
                }
                current.push(ch);
            }
            _ => {}
        }
    }

    if in_param {
        return Err(DesignError::InvalidPathTemplate(format!(
            "{} - unclosed brace",
            path
        )));
    }

    Ok(())
}

use super::TreeError;

/// Split a `/`-delimited config path into segments.
///
/// Leading and trailing slashes are ignored. Empty paths and empty
/// segments (`a//b`) are rejected.
pub fn split_path(path: &str) -> Result<Vec<&str>, TreeError> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Err(TreeError::InvalidPath("path is empty".to_string()));
    }
    let segments: Vec<&str> = trimmed.split('/').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(TreeError::InvalidPath(format!("empty segment in '{}'", path)));
    }
    Ok(segments)
}

/// Names become dotted keys (`a.b = v`) in the rendered file, so they may
/// not contain `.`, `=`, `/`, whitespace or control characters.
pub fn validate_name(name: &str) -> Result<(), TreeError> {
    if name.is_empty() {
        return Err(TreeError::InvalidPath("name is empty".to_string()));
    }
    if let Some(c) = name
        .chars()
        .find(|&c| matches!(c, '.' | '=' | '/') || c.is_whitespace() || c.is_control())
    {
        return Err(TreeError::InvalidPath(format!(
            "name '{}' contains forbidden character {:?}",
            name, c
        )));
    }
    Ok(())
}

/// Values are written verbatim after `= `; a line break would start a new key.
pub fn validate_value(value: &str) -> Result<(), TreeError> {
    if value.contains(|c: char| c == '\n' || c == '\r') {
        return Err(TreeError::InvalidValue(
            "value may not contain line breaks".to_string(),
        ));
    }
    Ok(())
}

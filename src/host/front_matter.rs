//! YAML front matter at the top of a Markdown note
//!
//! ```text
//! ---
//! id: 42
//! tags: [reading]
//! ---
//! # Note body
//! ```
//!
//! Metadata values cross the API as `serde_json::Value` so callers do not
//! depend on the YAML representation.

use serde_yaml::{Mapping, Value as YamlValue};

#[derive(Debug, thiserror::Error)]
pub enum FrontMatterError {
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("value cannot be represented as JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("front matter is not a key/value mapping")]
    NotAMapping,
}

/// Split content into the raw YAML block (without delimiters) and the body
///
/// Content without a complete `---` block is all body.
pub fn split(content: &str) -> (Option<&str>, &str) {
    let Some(rest) = content
        .strip_prefix("---\n")
        .or_else(|| content.strip_prefix("---\r\n"))
    else {
        return (None, content);
    };

    // Empty block: "---\n---\n"
    if let Some(body) = rest
        .strip_prefix("---\n")
        .or_else(|| rest.strip_prefix("---\r\n"))
    {
        return (Some(""), body);
    }
    if rest == "---" {
        return (Some(""), "");
    }

    let closing = rest
        .find("\n---\n")
        .map(|i| (i, i + 5))
        .or_else(|| rest.find("\n---\r\n").map(|i| (i, i + 6)))
        .or_else(|| rest.ends_with("\n---").then(|| (rest.len() - 4, rest.len())));

    match closing {
        Some((yaml_end, body_start)) => (Some(&rest[..yaml_end]), &rest[body_start..]),
        None => (None, content),
    }
}

/// Note body with any front matter removed
pub fn body(content: &str) -> &str {
    split(content).1
}

/// Parse a YAML block into a mapping; an empty block is an empty mapping
pub fn parse(yaml: &str) -> Result<Mapping, FrontMatterError> {
    if yaml.trim().is_empty() {
        return Ok(Mapping::new());
    }
    match serde_yaml::from_str::<YamlValue>(yaml)? {
        YamlValue::Mapping(mapping) => Ok(mapping),
        YamlValue::Null => Ok(Mapping::new()),
        _ => Err(FrontMatterError::NotAMapping),
    }
}

/// Read one metadata key
pub fn get(content: &str, key: &str) -> Result<Option<serde_json::Value>, FrontMatterError> {
    let Some(yaml) = split(content).0 else {
        return Ok(None);
    };
    let mapping = parse(yaml)?;
    mapping
        .get(key)
        .map(serde_json::to_value)
        .transpose()
        .map_err(FrontMatterError::from)
}

/// Set one metadata key, creating the front matter block when needed
///
/// Other keys and the body are preserved.
pub fn set(content: &str, key: &str, value: serde_json::Value) -> Result<String, FrontMatterError> {
    let (yaml, body) = split(content);
    let mut mapping = match yaml {
        Some(yaml) => parse(yaml)?,
        None => Mapping::new(),
    };
    mapping.insert(YamlValue::String(key.to_string()), serde_yaml::to_value(value)?);

    let yaml = serde_yaml::to_string(&mapping)?;
    Ok(format!("---\n{}\n---\n{}", yaml.trim_end_matches('\n'), body))
}

use serde::de::DeserializeOwned;
use std::io::{self, Read};

use super::file::{parse, Format};

/// Read a piped scenario from stdin. JSON is tried first, then YAML.
/// Returns None if stdin is a TTY (interactive) or empty.
pub fn read_stdin<T: DeserializeOwned>() -> Result<Option<T>, Box<dyn std::error::Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;

    let trimmed = buffer.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    match parse(trimmed, Format::Json) {
        Ok(value) => Ok(Some(value)),
        Err(json_err) => parse(trimmed, Format::Yaml)
            .map(Some)
            .map_err(|_| format!("Failed to parse stdin: {json_err}").into()),
    }
}

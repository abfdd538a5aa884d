use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::io::{self, Read};
use std::path::Path;

/// Read a JSON document from `input`, or from stdin when it is `-`.
pub fn read_tree(input: &Path) -> Result<Value> {
    tracing::debug!(input = %input.display(), "reading input");
    let content = if input.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        buf
    } else {
        std::fs::read_to_string(input).with_context(|| format!("Failed to read {:?}", input))?
    };
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {:?}", input))
}

pub fn render<T: Serialize + ?Sized>(value: &T, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(json)
}

pub fn print_json<T: Serialize + ?Sized>(value: &T, pretty: bool) -> Result<()> {
    println!("{}", render(value, pretty)?);
    Ok(())
}

#[cfg(test)]
pub(crate) fn write_temp_json(value: &Value) -> tempfile::NamedTempFile {
    use std::io::Write;

    let mut f = tempfile::NamedTempFile::new().unwrap();
    write!(f, "{}", value).unwrap();
    f.flush().unwrap();
    f
}

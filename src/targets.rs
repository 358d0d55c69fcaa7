use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::types::Target;

/// One target per line, as typed into the web form or stored in a file.
///
/// Lines are trimmed and blank lines dropped. Order and duplicates are kept.
pub fn parse_target_lines(text: &str) -> Vec<Target> {
    text.lines().filter_map(Target::parse).collect()
}

/// Comma-separated targets, as carried in the stream URL (`ips=a,b`).
pub fn parse_target_list(text: &str) -> Vec<Target> {
    text.split(',').filter_map(Target::parse).collect()
}

/// Resolve a CLI `--targets` value: a path to an existing file is read line-wise,
/// anything else is taken as a comma-separated list.
pub fn load_targets(arg: &str) -> Result<Vec<Target>> {
    let path = Path::new(arg);
    if path.is_file() {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read targets file: {}", path.display()))?;
        return Ok(parse_target_lines(&content));
    }
    Ok(parse_target_list(arg))
}

/// Inverse of [`parse_target_list`].
pub fn join_target_list(targets: &[Target]) -> String {
    targets
        .iter()
        .map(Target::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strs(v: &[Target]) -> Vec<&str> {
        v.iter().map(Target::as_str).collect()
    }

    #[test]
    fn lines_trim_and_drop_blanks() {
        let input = "  10.0.0.1\n\n   \ncam.local  \r\n10.0.0.1\n";
        let targets = parse_target_lines(input);
        assert_eq!(strs(&targets), vec!["10.0.0.1", "cam.local", "10.0.0.1"]);
    }

    #[test]
    fn list_splits_on_commas() {
        let targets = parse_target_list("a, b,,c ,");
        assert_eq!(strs(&targets), vec!["a", "b", "c"]);
        assert!(parse_target_list("").is_empty());
    }

    #[test]
    fn join_roundtrips_list() {
        let targets = parse_target_list("10.0.0.1,10.0.0.2");
        assert_eq!(join_target_list(&targets), "10.0.0.1,10.0.0.2");
    }
}

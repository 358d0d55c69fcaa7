use anyhow::{anyhow, bail, Context, Result};
use std::fs;
use std::path::Path;

/// Well-known network camera ports, in scan order: HTTP, HTTPS, RTSP, vendor
/// web consoles, HTTP alt and RTSP alt.
pub const CAMERA_PORTS: [u16; 6] = [80, 443, 554, 8000, 8080, 8554];

/// The camera port set as an owned list.
pub fn camera_ports() -> Vec<u16> {
    CAMERA_PORTS.to_vec()
}

/// Largest port set accepted. Every port adds a probe-start line to each target's
/// sequence, so the list stays small.
pub const MAX_PORTS: usize = 64;

/// One non-empty line of a ports file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PortSpec {
    Single(u16),
    Range(u16, u16),
}

/// Parse a ports file into an ordered port set without duplicates.
///
/// Each line holds a port (`554`) or an inclusive range (`8000-8010`); `#` starts
/// a comment. The result may not exceed [`MAX_PORTS`] entries.
pub fn parse_ports_str(s: &str) -> Result<Vec<u16>> {
    let mut out: Vec<u16> = Vec::new();

    for (idx, raw_line) in s.lines().enumerate() {
        let line_no = idx + 1;
        let spec = parse_line(raw_line).with_context(|| format!("line {line_no}"))?;
        let (start, end) = match spec {
            None => continue,
            Some(PortSpec::Single(p)) => (p, p),
            Some(PortSpec::Range(a, b)) => (a, b),
        };
        // Checked before expanding so `1-65535` fails fast.
        if usize::from(end - start) >= MAX_PORTS {
            bail!("line {line_no}: range {start}-{end} is wider than {MAX_PORTS} ports");
        }
        for p in start..=end {
            if !out.contains(&p) {
                out.push(p);
            }
        }
        if out.len() > MAX_PORTS {
            bail!("line {line_no}: port set grows beyond {MAX_PORTS} ports");
        }
    }

    Ok(out)
}

/// Load a ports list from a file path. Errors if the file cannot be read, parsed, or is empty.
pub fn load_ports_from_path(path: impl AsRef<Path>) -> Result<Vec<u16>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read ports file: {}", path.display()))?;
    let ports = parse_ports_str(&content)
        .with_context(|| format!("failed to parse ports file: {}", path.display()))?;
    if ports.is_empty() {
        bail!("ports file lists no ports: {}", path.display());
    }
    Ok(ports)
}

fn parse_line(raw: &str) -> Result<Option<PortSpec>> {
    let line = raw.split('#').next().unwrap_or("").trim();
    if line.is_empty() {
        return Ok(None);
    }
    let Some((a, b)) = line.split_once('-') else {
        return Ok(Some(PortSpec::Single(parse_port(line)?)));
    };
    let (start, end) = (parse_port(a.trim())?, parse_port(b.trim())?);
    if start > end {
        bail!("invalid range {start}-{end} (start > end)");
    }
    Ok(Some(PortSpec::Range(start, end)))
}

fn parse_port(s: &str) -> Result<u16> {
    match s.parse::<u16>() {
        Ok(0) => bail!("port 0 is not a valid TCP port"),
        Ok(p) => Ok(p),
        Err(e) => Err(anyhow!("invalid port {s:?}: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_set_order() {
        assert_eq!(camera_ports(), vec![80, 443, 554, 8000, 8080, 8554]);
    }

    #[test]
    fn line_kinds() {
        assert_eq!(parse_line("  # rtsp").unwrap(), None);
        assert_eq!(parse_line("554 # rtsp").unwrap(), Some(PortSpec::Single(554)));
        assert_eq!(
            parse_line(" 8000 - 8002 ").unwrap(),
            Some(PortSpec::Range(8000, 8002))
        );
        assert!(parse_line("8080-80").is_err());
        assert!(parse_line("rtsp").is_err());
        assert!(parse_line("0").is_err());
        assert!(parse_line("70000").is_err());
    }

    #[test]
    fn overlapping_ranges_keep_first_position() {
        let ports = parse_ports_str("8554\n8000-8002\n8001\n8553-8555\n").unwrap();
        assert_eq!(ports, vec![8554, 8000, 8001, 8002, 8553, 8555]);
    }

    #[test]
    fn wide_range_is_rejected_before_expansion() {
        let err = parse_ports_str("1-65535\n").unwrap_err();
        assert!(format!("{err:#}").contains("wider than 64 ports"));
    }

    #[test]
    fn port_set_limit_is_cumulative() {
        assert_eq!(parse_ports_str("1000-1063\n").unwrap().len(), MAX_PORTS);
        assert!(parse_ports_str("1000-1063\n2000\n").is_err());
        // Duplicates do not count against the limit.
        assert_eq!(parse_ports_str("1000-1063\n1000\n").unwrap().len(), MAX_PORTS);
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;

/// Text of the scan-complete marker.
pub const SCAN_COMPLETE_TEXT: &str = "Scan terminé";
/// Text of the end-of-stream marker.
pub const TERMINAL_TEXT: &str = "FIN";
/// Separator line emitted after every target.
pub const SEPARATOR_TEXT: &str = "---------------------";
/// Summary body used when no target had an open port.
pub const NO_FINDINGS_TEXT: &str = "Aucun port ouvert trouvé sur aucune IP.";
/// Marker carried by every positive finding line.
pub const OPEN_MARKER: &str = "[OPEN]";

/// One address to scan, as supplied by the caller (trimmed, never blank).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(try_from = "String")]
pub struct Target(String);

impl Target {
    /// Trim `raw` and wrap it; blank input yields `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let t = raw.trim();
        if t.is_empty() {
            None
        } else {
            Some(Self(t.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Target {
    type Error = &'static str;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Target::parse(&raw).ok_or("target must not be blank")
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An open (target, port) pair discovered during a scan.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub target: Target,
    pub port: u16,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{OPEN_MARKER} Found open port {} on {}", self.port, self.target)
    }
}

/// Category tag of a [`ScanEvent`], used as the SSE event name and the JSON `category`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    TargetStart,
    PortProbeStart,
    PortOpen,
    TargetNoOpenPorts,
    TargetSeparator,
    DeadlineReached,
    ScanComplete,
    Summary,
    Terminal,
}

impl EventCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::TargetStart => "target_start",
            EventCategory::PortProbeStart => "port_probe_start",
            EventCategory::PortOpen => "port_open",
            EventCategory::TargetNoOpenPorts => "target_no_open_ports",
            EventCategory::TargetSeparator => "target_separator",
            EventCategory::DeadlineReached => "deadline_reached",
            EventCategory::ScanComplete => "scan_complete",
            EventCategory::Summary => "summary",
            EventCategory::Terminal => "terminal",
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of scan progress. Formatting to text happens only through `Display`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum ScanEvent {
    TargetStart { target: Target },
    PortProbeStart { target: Target, port: u16 },
    PortOpen(Finding),
    TargetNoOpenPorts { target: Target },
    TargetSeparator,
    /// The overall deadline expired; `unscanned` targets were skipped or cut short.
    DeadlineReached { unscanned: usize },
    ScanComplete,
    Summary { findings: Vec<Finding> },
    Terminal,
}

impl ScanEvent {
    pub fn category(&self) -> EventCategory {
        match self {
            ScanEvent::TargetStart { .. } => EventCategory::TargetStart,
            ScanEvent::PortProbeStart { .. } => EventCategory::PortProbeStart,
            ScanEvent::PortOpen(_) => EventCategory::PortOpen,
            ScanEvent::TargetNoOpenPorts { .. } => EventCategory::TargetNoOpenPorts,
            ScanEvent::TargetSeparator => EventCategory::TargetSeparator,
            ScanEvent::DeadlineReached { .. } => EventCategory::DeadlineReached,
            ScanEvent::ScanComplete => EventCategory::ScanComplete,
            ScanEvent::Summary { .. } => EventCategory::Summary,
            ScanEvent::Terminal => EventCategory::Terminal,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, ScanEvent::PortOpen(_))
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ScanEvent::Terminal)
    }

    /// Wire form carrying both the typed fields and the rendered text.
    pub fn to_record(&self) -> EventRecord<'_> {
        EventRecord {
            event: self,
            text: self.to_string(),
        }
    }
}

impl fmt::Display for ScanEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanEvent::TargetStart { target } => write!(f, "[IP] Scanning {target}..."),
            ScanEvent::PortProbeStart { target, port } => {
                write!(f, "Scanning port {port} on {target}...")
            }
            ScanEvent::PortOpen(finding) => write!(f, "{finding}"),
            ScanEvent::TargetNoOpenPorts { target } => {
                write!(f, "[INFO] No open ports found on {target}")
            }
            ScanEvent::TargetSeparator => f.write_str(SEPARATOR_TEXT),
            ScanEvent::DeadlineReached { unscanned } => write!(
                f,
                "[WARN] Scan deadline reached, {unscanned} target(s) not fully scanned"
            ),
            ScanEvent::ScanComplete => f.write_str(SCAN_COMPLETE_TEXT),
            ScanEvent::Summary { findings } => {
                f.write_str("Final Summary:\n")?;
                if findings.is_empty() {
                    return f.write_str(NO_FINDINGS_TEXT);
                }
                for (i, finding) in findings.iter().enumerate() {
                    if i > 0 {
                        f.write_str("\n")?;
                    }
                    write!(f, "{finding}")?;
                }
                Ok(())
            }
            ScanEvent::Terminal => f.write_str(TERMINAL_TEXT),
        }
    }
}

/// JSON-lines representation of an event.
#[derive(Serialize, Debug)]
pub struct EventRecord<'a> {
    #[serde(flatten)]
    pub event: &'a ScanEvent,
    pub text: String,
}

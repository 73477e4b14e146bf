use crate::types::{OutputArtifact, UNKNOWN_METRIC};

pub const PROVENANCE_MARKER: &str = "--ProvenanceInfo";

/// Extracts `--ProvenanceInfo name=.. date=.. size=..` records from command output.
pub fn parse_provenance(stdout: &str) -> Vec<OutputArtifact> {
    stdout.lines().filter_map(parse_line).collect()
}

fn parse_line(line: &str) -> Option<OutputArtifact> {
    let (_, fields) = line.split_once(PROVENANCE_MARKER)?;

    let mut name = None;
    let mut size = UNKNOWN_METRIC;
    let mut date = UNKNOWN_METRIC;
    for field in fields.split_whitespace() {
        let Some((key, value)) = field.split_once('=') else {
            continue;
        };
        match key {
            "name" if !value.is_empty() => name = Some(value.to_string()),
            "size" => size = value.parse().unwrap_or(UNKNOWN_METRIC),
            "date" => date = value.parse().unwrap_or(UNKNOWN_METRIC),
            _ => {}
        }
    }

    name.map(|name| OutputArtifact::new(name, size, date))
}

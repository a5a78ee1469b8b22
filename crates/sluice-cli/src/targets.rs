use std::path::Path;

use anyhow::{Context, Result, bail};
use sluice_core::Target;
use url::Url;

const ID_PLACEHOLDER: &str = "{id}";

/// Expand `template` once per integer in `first..=last`.
pub fn from_range(template: &str, first: u64, last: u64) -> Result<Vec<Target>> {
    if !template.contains(ID_PLACEHOLDER) {
        bail!("URL template must contain {ID_PLACEHOLDER}: {template}");
    }
    if first > last {
        bail!("--first ({first}) must not be greater than --last ({last})");
    }

    (first..=last)
        .map(|id| parse_target(&template.replace(ID_PLACEHOLDER, &id.to_string())))
        .collect()
}

/// Read one URL per line, skipping blank lines and `#` comments.
pub fn from_file(path: &Path) -> Result<Vec<Target>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read target list: {}", path.display()))?;
    from_lines(&contents).with_context(|| format!("Invalid target list: {}", path.display()))
}

fn from_lines(contents: &str) -> Result<Vec<Target>> {
    contents
        .lines()
        .enumerate()
        .map(|(n, line)| (n + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(n, line)| parse_target(line).with_context(|| format!("line {n}")))
        .collect()
}

fn parse_target(raw: &str) -> Result<Target> {
    let url = Url::parse(raw).with_context(|| format!("Invalid URL: {raw}"))?;
    match url.scheme() {
        "http" | "https" => Ok(Target::new(raw)),
        other => bail!("Unsupported scheme '{other}' in {raw}"),
    }
}

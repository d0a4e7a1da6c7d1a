use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::network::{Bus, Generator, Line, Load, Network, Transformer};

fn default_base_mva() -> f64 {
    100.0
}

/// On-disk case description. Complex quantities are `[re, im]` pairs and
/// windings are `"Delta"`, `"Wye"` or `{"GroundedWye": [re, im]}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseFile {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_base_mva")]
    pub base_mva: f64,
    pub buses: Vec<Bus>,
    #[serde(default)]
    pub lines: Vec<Line>,
    #[serde(default)]
    pub transformers: Vec<Transformer>,
    #[serde(default)]
    pub generators: Vec<Generator>,
    #[serde(default)]
    pub loads: Vec<Load>,
}

impl CaseFile {
    pub fn into_network(self) -> crate::Result<Network> {
        Network::new(
            self.name,
            self.base_mva,
            self.buses,
            self.lines,
            self.transformers,
            self.generators,
            self.loads,
        )
    }
}

pub fn parse_case(json: &str) -> Result<Network> {
    let case: CaseFile = serde_json::from_str(json)?;
    Ok(case.into_network()?)
}

pub fn load_case_file(case_path: &Path) -> Result<Network> {
    let content = fs::read_to_string(case_path)
        .with_context(|| format!("reading case file {}", case_path.display()))?;
    let mut case: CaseFile = serde_json::from_str(&content)
        .with_context(|| format!("parsing case file {}", case_path.display()))?;
    if case.name.is_empty() {
        if let Some(stem) = case_path.file_stem() {
            case.name = stem.to_string_lossy().into_owned();
        }
    }
    Ok(case.into_network()?)
}

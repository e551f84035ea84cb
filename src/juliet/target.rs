//! Target region configuration: genes, known drug-resistance mutation
//! positions, and expected minor variants used for accuracy diagnostics.

use crate::utils::Result;
use itertools::Itertools;
use serde::Deserialize;
use std::path::Path;

/// A named group of known drug-resistance mutations, given as 1-based codon
/// numbers within the gene.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DrmGroup {
    pub name: String,
    pub positions: Vec<usize>,
}

/// An expected minor variant, used only to tally calling accuracy.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExpectedMinor {
    /// 1-based codon number within the gene.
    pub position: usize,
    pub amino_acid: char,
    pub codon: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
struct RawGene {
    name: String,
    /// 1-based start of the reading frame.
    begin: usize,
    /// 1-based exclusive end.
    end: usize,
    #[serde(default)]
    drms: Vec<DrmGroup>,
    #[serde(default)]
    minors: Vec<ExpectedMinor>,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
struct RawConfig {
    #[serde(default)]
    reference_name: String,
    #[serde(default)]
    reference_sequence: String,
    #[serde(default)]
    genes: Vec<RawGene>,
}

/// A gene window in 0-based half-open reference coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetGene {
    pub name: String,
    pub begin: usize,
    pub end: usize,
    pub drms: Vec<DrmGroup>,
    pub minors: Vec<ExpectedMinor>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TargetConfig {
    pub reference_name: String,
    pub reference_sequence: String,
    pub genes: Vec<TargetGene>,
}

impl TargetConfig {
    /// Resolves a config argument: empty for no targets, a predefined tag
    /// like `<HIV>`, a JSON literal, or a path to a JSON file.
    pub fn from_arg(arg: &str) -> Result<TargetConfig> {
        let arg = arg.trim();
        if arg.is_empty() {
            return Ok(TargetConfig::default());
        }
        let json = match arg {
            "<HIV>" | "HIV" => HIV_CONFIG.to_string(),
            _ if arg.starts_with('{') => arg.to_string(),
            _ => std::fs::read_to_string(Path::new(arg))
                .map_err(|e| format!("Failed to read target config {}: {}", arg, e))?,
        };
        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> Result<TargetConfig> {
        let raw: RawConfig = serde_json::from_str(json)
            .map_err(|e| format!("Failed to parse target config: {}", e))?;

        let mut genes = Vec::with_capacity(raw.genes.len());
        for gene in raw.genes {
            if gene.begin == 0 {
                return Err(format!("Gene {}: coordinates are 1-based", gene.name));
            }
            if gene.end <= gene.begin {
                return Err(format!("Gene {}: end must exceed begin", gene.name));
            }
            genes.push(TargetGene {
                name: gene.name,
                begin: gene.begin - 1,
                end: gene.end - 1,
                drms: gene.drms,
                minors: gene.minors,
            });
        }

        Ok(TargetConfig {
            reference_name: raw.reference_name,
            reference_sequence: raw.reference_sequence.to_ascii_uppercase(),
            genes,
        })
    }

    pub fn num_expected_minors(&self) -> usize {
        self.genes.iter().map(|gene| gene.minors.len()).sum()
    }

    pub fn has_expected_minors(&self) -> bool {
        self.num_expected_minors() > 0
    }

    pub fn has_reference(&self) -> bool {
        !self.reference_sequence.is_empty()
    }

    /// Names of all known-DRM groups of `gene_name` covering the codon,
    /// joined with " + ".
    pub fn drm_summary(&self, gene_name: &str, codon_number: usize) -> String {
        let Some(gene) = self.genes.iter().find(|gene| gene.name == gene_name) else {
            return String::new();
        };
        gene.drms
            .iter()
            .filter(|drms| drms.positions.contains(&codon_number))
            .map(|drms| drms.name.as_str())
            .join(" + ")
    }
}

/// Predefined HIV-1 (HXB2 coordinates) pol target windows with known
/// drug-resistance positions.
const HIV_CONFIG: &str = r#"{
  "referenceName": "HIV HXB2",
  "genes": [
    {
      "name": "Protease",
      "begin": 2253,
      "end": 2550,
      "drms": [
        {
          "name": "PI",
          "positions": [10, 23, 24, 30, 32, 33, 46, 47, 48, 50, 53, 54, 73, 76, 82, 83, 84, 88, 90]
        }
      ]
    },
    {
      "name": "Reverse Transcriptase",
      "begin": 2550,
      "end": 3870,
      "drms": [
        {
          "name": "NRTI",
          "positions": [41, 65, 67, 69, 70, 74, 75, 77, 115, 116, 151, 184, 210, 215, 219]
        },
        {
          "name": "NNRTI",
          "positions": [100, 101, 103, 106, 108, 138, 179, 181, 188, 190, 221, 225, 227, 230]
        }
      ]
    },
    {
      "name": "RNase",
      "begin": 3870,
      "end": 4230,
      "drms": []
    },
    {
      "name": "Integrase",
      "begin": 4230,
      "end": 5096,
      "drms": [
        {
          "name": "INSTI",
          "positions": [66, 92, 97, 118, 121, 138, 140, 143, 147, 148, 155, 263]
        }
      ]
    }
  ]
}"#;

//! JSON report assembly and serialization.

use crate::juliet::phasing::Haplotype;
use crate::juliet::variant::{ContextCounts, VariantGene};
use crate::utils::{create_writer, Result};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;

#[derive(Debug, Serialize)]
pub struct JsonReport {
    genes: Vec<JsonGene>,
    #[serde(skip_serializing_if = "Option::is_none")]
    haplotypes: Option<Vec<JsonHaplotype>>,
}

#[derive(Debug, Serialize)]
struct JsonGene {
    name: String,
    variant_positions: Vec<JsonPosition>,
}

#[derive(Debug, Serialize)]
struct JsonPosition {
    /// 1-based codon number within the gene's reading frame.
    ref_position: usize,
    ref_codon: String,
    ref_amino_acid: String,
    coverage: u64,
    variant_amino_acids: Vec<JsonAminoAcid>,
    msa: Vec<JsonMsaColumn>,
}

#[derive(Debug, Serialize)]
struct JsonAminoAcid {
    amino_acid: String,
    variant_codons: Vec<JsonCodon>,
}

#[derive(Debug, Serialize)]
struct JsonCodon {
    codon: String,
    frequency: f64,
    #[serde(rename = "pValue")]
    p_value: f64,
    known_drm: String,
    haplotype_hit: Vec<bool>,
}

#[derive(Debug, Serialize)]
struct JsonMsaColumn {
    rel_pos: i64,
    abs_pos: usize,
    #[serde(rename = "A")]
    a: u64,
    #[serde(rename = "C")]
    c: u64,
    #[serde(rename = "G")]
    g: u64,
    #[serde(rename = "T")]
    t: u64,
    #[serde(rename = "-")]
    gap: u64,
    wt: String,
}

#[derive(Debug, Serialize)]
struct JsonHaplotype {
    name: String,
    reads_hard: usize,
    reads_soft: f64,
    frequency: f64,
    read_names: Vec<String>,
}

impl JsonReport {
    /// Builds the report tree. With `drm_only`, variant codons without a
    /// known drug-resistance annotation are dropped, along with any amino
    /// acids, positions, and genes left empty.
    pub fn new(
        genes: &[VariantGene],
        haplotypes: Option<&[Haplotype]>,
        drm_only: bool,
    ) -> JsonReport {
        let mut json_genes = Vec::new();
        for gene in genes {
            let mut positions = Vec::new();
            for (&codon_number, position) in &gene.positions {
                let mut amino_acids = Vec::new();
                for (&aa, codons) in &position.amino_acids {
                    let codons: Vec<JsonCodon> = codons
                        .iter()
                        .filter(|codon| !drm_only || !codon.known_drm.is_empty())
                        .map(|codon| JsonCodon {
                            codon: codon.codon.clone(),
                            frequency: codon.frequency,
                            p_value: codon.p_value,
                            known_drm: codon.known_drm.clone(),
                            haplotype_hit: codon.haplotype_hits.clone(),
                        })
                        .collect();
                    if !codons.is_empty() {
                        amino_acids.push(JsonAminoAcid {
                            amino_acid: aa.to_string(),
                            variant_codons: codons,
                        });
                    }
                }
                if amino_acids.is_empty() {
                    continue;
                }
                positions.push(JsonPosition {
                    ref_position: codon_number,
                    ref_codon: position.ref_codon.clone(),
                    ref_amino_acid: position.ref_amino_acid.to_string(),
                    coverage: position.coverage,
                    variant_amino_acids: amino_acids,
                    msa: position.context.iter().map(JsonMsaColumn::new).collect(),
                });
            }
            if !positions.is_empty() {
                json_genes.push(JsonGene {
                    name: gene.name.clone(),
                    variant_positions: positions,
                });
            }
        }

        let haplotypes = haplotypes.map(|haplotypes| {
            haplotypes
                .iter()
                .map(|haplotype| JsonHaplotype {
                    name: haplotype.name.clone(),
                    reads_hard: haplotype.hard_size(),
                    reads_soft: haplotype.size(),
                    frequency: haplotype.frequency,
                    read_names: haplotype.members.clone(),
                })
                .collect()
        });

        JsonReport {
            genes: json_genes,
            haplotypes,
        }
    }
}

impl JsonMsaColumn {
    fn new(context: &ContextCounts) -> JsonMsaColumn {
        JsonMsaColumn {
            rel_pos: context.rel_pos,
            abs_pos: context.abs_pos,
            a: context.counts[0],
            c: context.counts[1],
            g: context.counts[2],
            t: context.counts[3],
            gap: context.counts[4],
            wt: context.wildtype.to_string(),
        }
    }
}

pub fn write_report(report: &JsonReport, output_prefix: &str) -> Result<()> {
    create_writer(output_prefix, "json", |path| {
        let file =
            File::create(path).map_err(|e| format!("Failed to create {}: {}", path, e))?;
        serde_json::to_writer_pretty(BufWriter::new(file), report)
            .map_err(|e| format!("Failed to write {}: {}", path, e))
    })
}

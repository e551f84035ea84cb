//! Variant call results: genes, codon-aligned positions, variant codons.

use std::collections::BTreeMap;

/// One significant non-reference codon at a variant position.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantCodon {
    pub codon: String,
    pub frequency: f64,
    pub p_value: f64,
    pub known_drm: String,
    /// Per-generator-haplotype flag: does the haplotype carry this codon?
    pub haplotype_hits: Vec<bool>,
}

/// Raw consensus counts around a variant position, for display.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextCounts {
    pub rel_pos: i64,
    pub abs_pos: usize,
    pub counts: [u64; 5],
    pub wildtype: char,
}

/// One codon-aligned reference position holding at least one variant codon.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariantPosition {
    pub ref_codon: String,
    pub ref_amino_acid: char,
    pub coverage: u64,
    pub amino_acids: BTreeMap<char, Vec<VariantCodon>>,
    pub context: Vec<ContextCounts>,
}

impl VariantPosition {
    pub fn new(ref_codon: String, ref_amino_acid: char) -> VariantPosition {
        VariantPosition {
            ref_codon,
            ref_amino_acid,
            ..VariantPosition::default()
        }
    }

    pub fn is_variant(&self) -> bool {
        !self.amino_acids.is_empty()
    }
}

/// Variant positions of one gene, keyed by 1-based codon number.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariantGene {
    pub name: String,
    /// 0-based reference position of the reading frame start.
    pub begin: usize,
    pub positions: BTreeMap<usize, VariantPosition>,
}

impl VariantGene {
    /// Absolute 0-based reference position of a codon's first base.
    pub fn codon_start(&self, codon_number: usize) -> usize {
        self.begin + (codon_number - 1) * 3
    }
}

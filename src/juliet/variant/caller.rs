//! Codon-aligned scan over the target genes: per-codon tallies,
//! significance testing against the error model, and DRM annotation.

use super::gene::{ContextCounts, VariantCodon, VariantGene, VariantPosition};
use crate::juliet::codon::amino_acid;
use crate::juliet::error_model::ErrorEstimates;
use crate::juliet::msa::{ColumnMatrix, RowMatrix, GAP, SYMBOLS, UNCOVERED};
use crate::juliet::stats::{bonferroni, fisher_exact_greater, ALPHA};
use crate::juliet::target::{TargetConfig, TargetGene};
use std::collections::{BTreeMap, HashSet};

/// Call frequency below which a site counts as variable; with an
/// expected-minor list supplied, only variable sites are reported.
const VARIABLE_SITE_FRACTION: f64 = 0.8;

/// Diagnostic accuracy of the calls against an expected-minor list.
/// Never feeds back into calling decisions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Accuracy {
    pub true_positive_rate: f64,
    pub false_positive_rate: f64,
    pub accuracy: f64,
    pub false_positives: f64,
}

#[derive(Debug, Default)]
struct PerformanceTally {
    true_positives: f64,
    false_positives: f64,
    false_negatives: f64,
    true_negatives: f64,
}

impl PerformanceTally {
    fn summarize(&self, num_expected_minors: usize, num_tests: u64) -> Accuracy {
        let total = self.true_positives
            + self.false_positives
            + self.false_negatives
            + self.true_negatives;
        let negatives = num_tests.saturating_sub(num_expected_minors as u64) as f64;
        Accuracy {
            true_positive_rate: self.true_positives / num_expected_minors.max(1) as f64,
            false_positive_rate: self.false_positives / negatives.max(1.0),
            accuracy: (self.true_positives + self.true_negatives) / total.max(1.0),
            false_positives: self.false_positives,
        }
    }
}

#[derive(Debug)]
pub struct CallResults {
    pub genes: Vec<VariantGene>,
    pub num_tests: u64,
    pub accuracy: Option<Accuracy>,
}

pub struct VariantCaller<'a> {
    rows: &'a RowMatrix,
    columns: &'a ColumnMatrix,
    error: &'a ErrorEstimates,
    config: &'a TargetConfig,
    /// Record every tested codon regardless of significance.
    debug: bool,
}

impl<'a> VariantCaller<'a> {
    pub fn new(
        rows: &'a RowMatrix,
        columns: &'a ColumnMatrix,
        error: &'a ErrorEstimates,
        config: &'a TargetConfig,
        debug: bool,
    ) -> VariantCaller<'a> {
        VariantCaller {
            rows,
            columns,
            error,
            config,
            debug,
        }
    }

    pub fn call(&self) -> CallResults {
        let genes = self.target_genes();
        let num_tests = self.count_tests(&genes);
        let has_minors = self.config.has_expected_minors();
        log::debug!(
            "Testing {} candidate codons across {} genes",
            num_tests,
            genes.len()
        );

        let mut tally = PerformanceTally::default();
        let mut out_genes = Vec::new();
        for gene in &genes {
            let mut variant_gene = VariantGene {
                name: gene.name.clone(),
                begin: gene.begin,
                positions: BTreeMap::new(),
            };
            for codon_start in codon_starts(gene) {
                let codon_number = 1 + (codon_start - gene.begin) / 3;
                let offset = codon_start as i64 - self.rows.begin as i64;
                let (codons, coverage) = self.codon_tally(offset);
                let Some((ref_codon, ref_amino_acid)) = self.reference_codon(codon_start, &codons)
                else {
                    continue;
                };

                let mut position = VariantPosition::new(ref_codon.clone(), ref_amino_acid);
                for (codon, &count) in &codons {
                    let Some(aa) = amino_acid(codon.as_bytes()) else {
                        continue;
                    };
                    if aa == ref_amino_acid {
                        continue;
                    }

                    let expected = coverage as f64
                        * self
                            .error
                            .sequence_probability(ref_codon.as_bytes(), codon.as_bytes());
                    let p_value = bonferroni(
                        fisher_exact_greater(count, coverage, expected.round() as u64, coverage),
                        num_tests as f64,
                    );

                    let variable_site = measure_performance(
                        &mut tally,
                        gene,
                        codon,
                        aa,
                        codon_number,
                        count,
                        coverage,
                        p_value,
                    );

                    let report = ((has_minors && variable_site) || !has_minors)
                        && p_value < ALPHA;
                    if self.debug || report {
                        position.amino_acids.entry(aa).or_default().push(VariantCodon {
                            codon: codon.clone(),
                            frequency: count as f64 / coverage as f64,
                            p_value,
                            known_drm: self.config.drm_summary(&gene.name, codon_number),
                            haplotype_hits: Vec::new(),
                        });
                    }
                }

                if position.is_variant() {
                    position.coverage = coverage;
                    position.context = self.context_counts(codon_start);
                    variant_gene.positions.insert(codon_number, position);
                }
            }
            if !variant_gene.positions.is_empty() {
                out_genes.push(variant_gene);
            }
        }

        let accuracy = has_minors
            .then(|| tally.summarize(self.config.num_expected_minors(), num_tests));
        CallResults {
            genes: out_genes,
            num_tests,
            accuracy,
        }
    }

    /// With no configured genes, the whole input window is one gene.
    fn target_genes(&self) -> Vec<TargetGene> {
        if self.config.genes.is_empty() {
            return vec![TargetGene {
                name: "unknown".to_string(),
                begin: self.rows.begin,
                end: self.rows.end,
                drms: Vec::new(),
                minors: Vec::new(),
            }];
        }
        self.config.genes.clone()
    }

    /// Total number of codon tests: distinct valid codons observed at every
    /// codon-aligned position of every gene. Computed up front so each
    /// test's correction factor covers the whole target region.
    fn count_tests(&self, genes: &[TargetGene]) -> u64 {
        let mut num_tests = 0;
        for gene in genes {
            for codon_start in codon_starts(gene) {
                let offset = codon_start as i64 - self.rows.begin as i64;
                let mut codons = HashSet::new();
                for row in &self.rows.rows {
                    if let Some(codon) = spanning_codon(&row.bases, offset) {
                        if amino_acid(codon).is_some() {
                            codons.insert(<[u8; 3]>::try_from(codon).unwrap());
                        }
                    }
                }
                num_tests += codons.len() as u64;
            }
        }
        num_tests
    }

    /// Tallies codons across rows at a window offset. Coverage counts every
    /// row spanning the triplet, deletions included; gapped and invalid
    /// codons contribute coverage but no codon.
    fn codon_tally(&self, offset: i64) -> (BTreeMap<String, u64>, u64) {
        let mut codons = BTreeMap::new();
        let mut coverage = 0;
        for row in &self.rows.rows {
            let Some(codon) = spanning_codon(&row.bases, offset) else {
                continue;
            };
            coverage += 1;
            if codon.contains(&GAP) {
                continue;
            }
            if amino_acid(codon).is_none() {
                continue;
            }
            *codons
                .entry(String::from_utf8(codon.to_vec()).unwrap())
                .or_insert(0) += 1;
        }
        (codons, coverage)
    }

    /// Reference codon and amino acid at an absolute position: from the
    /// explicit reference sequence when given, else the plurality-observed
    /// codon. `None` when it cannot be resolved to an amino acid.
    fn reference_codon(
        &self,
        codon_start: usize,
        codons: &BTreeMap<String, u64>,
    ) -> Option<(String, char)> {
        let ref_codon = if self.config.has_reference() {
            let reference = self.config.reference_sequence.as_bytes();
            let codon = reference.get(codon_start..codon_start + 3)?;
            String::from_utf8(codon.to_vec()).ok()?
        } else {
            let mut max_count = 0;
            let mut arg_max = None;
            for (codon, &count) in codons {
                if count > max_count {
                    max_count = count;
                    arg_max = Some(codon.clone());
                }
            }
            arg_max?
        };
        let aa = amino_acid(ref_codon.as_bytes())?;
        Some((ref_codon, aa))
    }

    /// Raw consensus counts around a codon start, for display.
    fn context_counts(&self, codon_start: usize) -> Vec<ContextCounts> {
        let mut context = Vec::new();
        for rel_pos in -3i64..6 {
            let Ok(abs_pos) = usize::try_from(codon_start as i64 + rel_pos) else {
                continue;
            };
            if !self.columns.has(abs_pos) {
                continue;
            }
            let column = self.columns.column(abs_pos);
            let wildtype = self
                .config
                .has_reference()
                .then(|| {
                    self.config
                        .reference_sequence
                        .as_bytes()
                        .get(abs_pos)
                        .map(|&c| c as char)
                })
                .flatten()
                .unwrap_or(SYMBOLS[column.max_index()] as char);
            context.push(ContextCounts {
                rel_pos,
                abs_pos,
                counts: *column.counts(),
                wildtype,
            });
        }
        context
    }
}

/// Codon-aligned start positions of a gene's reading frame.
fn codon_starts(gene: &TargetGene) -> impl Iterator<Item = usize> + '_ {
    (gene.begin..gene.end.saturating_sub(2)).step_by(3)
}

/// The triplet at a window offset, or `None` when the row does not span it.
fn spanning_codon(bases: &[u8], offset: i64) -> Option<&[u8]> {
    if offset < 0 {
        return None;
    }
    let offset = offset as usize;
    let codon = bases.get(offset..offset + 3)?;
    (!codon.contains(&UNCOVERED)).then_some(codon)
}

#[allow(clippy::too_many_arguments)]
fn measure_performance(
    tally: &mut PerformanceTally,
    gene: &TargetGene,
    codon: &str,
    aa: char,
    codon_number: usize,
    count: u64,
    coverage: u64,
    p_value: f64,
) -> bool {
    let relative_coverage = count as f64 / coverage as f64;
    let variable_site = relative_coverage < VARIABLE_SITE_FRACTION;
    if variable_site {
        let expected = gene.minors.iter().any(|minor| {
            minor.position == codon_number && minor.amino_acid == aa && minor.codon == codon
        });
        match (p_value < ALPHA, expected) {
            (true, true) => tally.true_positives += 1.0,
            (true, false) => tally.false_positives += 1.0,
            (false, true) => tally.false_negatives += 1.0,
            (false, false) => tally.true_negatives += 1.0,
        }
    }
    variable_site
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::juliet::msa::MsaRow;
    use std::collections::HashMap;

    fn rows_from(begin: usize, rows: &[(&str, &str)]) -> RowMatrix {
        let rows: Vec<MsaRow> = rows
            .iter()
            .map(|(name, bases)| MsaRow {
                name: name.to_string(),
                bases: bases.as_bytes().to_vec(),
                insertions: HashMap::new(),
            })
            .collect();
        let end = begin + rows[0].bases.len();
        RowMatrix { begin, end, rows }
    }

    fn replicated_rows(begin: usize, groups: &[(&str, usize)]) -> RowMatrix {
        let mut rows = Vec::new();
        for (bases, copies) in groups {
            for i in 0..*copies {
                rows.push(MsaRow {
                    name: format!("{}_{}", bases.trim(), i),
                    bases: bases.as_bytes().to_vec(),
                    insertions: HashMap::new(),
                });
            }
        }
        let end = begin + rows[0].bases.len();
        RowMatrix { begin, end, rows }
    }

    fn single_gene_config(begin_1based: usize, end_1based: usize) -> TargetConfig {
        TargetConfig::from_json(&format!(
            r#"{{"genes": [{{"name": "gene", "begin": {}, "end": {}}}]}}"#,
            begin_1based, end_1based
        ))
        .unwrap()
    }

    fn error_model() -> ErrorEstimates {
        ErrorEstimates::from_rates(0.005, 0.001).unwrap()
    }

    fn call(rows: &RowMatrix, config: &TargetConfig, debug: bool) -> CallResults {
        let columns = ColumnMatrix::new(rows).unwrap();
        let error = error_model();
        VariantCaller::new(rows, &columns, &error, config, debug).call()
    }

    #[test]
    fn synonymous_codons_are_not_reported() {
        let rows = replicated_rows(0, &[("AAA", 80), ("AAG", 20)]);
        let config = single_gene_config(1, 4);
        let results = call(&rows, &config, false);
        // AAG encodes Lys like the reference codon AAA
        assert!(results.genes.is_empty());
    }

    #[test]
    fn minor_amino_acid_variant_is_reported() {
        let rows = replicated_rows(0, &[("AAA", 90), ("GAA", 10)]);
        let config = single_gene_config(1, 4);
        let results = call(&rows, &config, false);

        assert_eq!(results.num_tests, 2);
        assert_eq!(results.genes.len(), 1);
        let position = results.genes[0].positions.get(&1).unwrap();
        assert_eq!(position.ref_codon, "AAA");
        assert_eq!(position.ref_amino_acid, 'K');
        assert_eq!(position.coverage, 100);

        let codons = position.amino_acids.get(&'E').unwrap();
        assert_eq!(codons.len(), 1);
        assert_eq!(codons[0].codon, "GAA");
        assert_eq!(codons[0].frequency, 0.10);
        assert!(codons[0].p_value < ALPHA);
    }

    #[test]
    fn coverage_includes_gapped_and_skips_uncovered_rows() {
        let mut groups = replicated_rows(0, &[("AAA", 90), ("GAA", 10), ("A-A", 5)]);
        groups.rows.push(MsaRow {
            name: "offwindow".to_string(),
            bases: b" AA".to_vec(),
            insertions: HashMap::new(),
        });
        let config = single_gene_config(1, 4);
        let results = call(&groups, &config, true);
        let position = results.genes[0].positions.get(&1).unwrap();
        assert_eq!(position.coverage, 105);
    }

    #[test]
    fn expected_minor_list_gates_on_variable_sites() {
        // The call is significant but near-fixed (frequency 1.0), so with an
        // expected-minor list it is suppressed as a non-variable site.
        let config = TargetConfig::from_json(
            r#"{"referenceSequence": "GGG",
                "genes": [{"name": "gene", "begin": 1, "end": 4,
                           "minors": [{"position": 1, "aminoAcid": "K", "codon": "AAA"}]}]}"#,
        )
        .unwrap();
        let rows = replicated_rows(0, &[("AAA", 100)]);
        let results = call(&rows, &config, false);
        assert!(results.genes.is_empty());
        assert!(results.accuracy.is_some());
    }

    #[test]
    fn without_expected_minors_the_same_call_is_reported() {
        let config = TargetConfig::from_json(
            r#"{"referenceSequence": "GGG",
                "genes": [{"name": "gene", "begin": 1, "end": 4}]}"#,
        )
        .unwrap();
        let rows = replicated_rows(0, &[("AAA", 100)]);
        let results = call(&rows, &config, false);
        assert_eq!(results.genes.len(), 1);
        let position = results.genes[0].positions.get(&1).unwrap();
        assert_eq!(position.ref_amino_acid, 'G');
        assert!(position.amino_acids.contains_key(&'K'));
        assert!(results.accuracy.is_none());
    }

    #[test]
    fn accuracy_tallies_expected_minors() {
        let config = TargetConfig::from_json(
            r#"{"genes": [{"name": "gene", "begin": 1, "end": 4,
                           "minors": [{"position": 1, "aminoAcid": "E", "codon": "GAA"}]}]}"#,
        )
        .unwrap();
        let rows = replicated_rows(0, &[("AAA", 90), ("GAA", 10)]);
        let results = call(&rows, &config, false);

        let accuracy = results.accuracy.unwrap();
        assert_eq!(accuracy.true_positive_rate, 1.0);
        assert_eq!(accuracy.false_positives, 0.0);
        // The minor variant itself is still reported
        assert_eq!(results.genes.len(), 1);
    }

    #[test]
    fn debug_records_insignificant_codons() {
        let rows = replicated_rows(0, &[("AAA", 97), ("GAA", 3)]);
        let config = single_gene_config(1, 4);

        let without_debug = call(&rows, &config, false);
        let with_debug = call(&rows, &config, true);
        let reported = |results: &CallResults| {
            results
                .genes
                .first()
                .map(|gene| gene.positions.len())
                .unwrap_or(0)
        };
        assert!(reported(&with_debug) >= reported(&without_debug));
        assert_eq!(reported(&with_debug), 1);
    }

    #[test]
    fn distinct_codons_are_counted_once_per_position() {
        let rows = rows_from(
            0,
            &[("r1", "AAAGGG"), ("r2", "AAAGGG"), ("r3", "GAAGG-")],
        );
        let config = single_gene_config(1, 7);
        let columns = ColumnMatrix::new(&rows).unwrap();
        let error = error_model();
        let caller = VariantCaller::new(&rows, &columns, &error, &config, false);
        // Position 1: AAA, GAA; position 2: GGG (the gapped codon is skipped)
        assert_eq!(caller.count_tests(&config.genes), 3);
    }

    #[test]
    fn context_counts_cover_the_window_around_the_codon() {
        let rows = replicated_rows(10, &[("AAAAAA", 90), ("AAAGAA", 10)]);
        let config = single_gene_config(11, 17);
        let results = call(&rows, &config, false);
        let position = results.genes[0].positions.get(&2).unwrap();
        // Codon 2 starts at absolute 13; rel -3..6 clipped to the window
        assert_eq!(position.context.first().unwrap().abs_pos, 10);
        assert_eq!(position.context.last().unwrap().abs_pos, 15);
        for counts in &position.context {
            assert_eq!(counts.counts.iter().sum::<u64>(), 100);
        }
        assert_eq!(position.context[0].wildtype, 'A');
    }
}

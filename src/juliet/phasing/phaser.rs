//! Clusters reads by codon identity at the variant positions and
//! redistributes outlier read mass onto well-supported haplotypes.

use super::haplotype::Haplotype;
use crate::juliet::error_model::ErrorEstimates;
use crate::juliet::msa::{RowMatrix, UNCOVERED};
use crate::juliet::variant::VariantGene;

/// Gap-free clusters below this hard size are demoted to observations.
const MINIMAL_CLUSTER_SIZE: usize = 10;

pub struct HaplotypePhaser<'a> {
    rows: &'a RowMatrix,
    error: &'a ErrorEstimates,
    merge_outliers: bool,
}

impl<'a> HaplotypePhaser<'a> {
    pub fn new(
        rows: &'a RowMatrix,
        error: &'a ErrorEstimates,
        merge_outliers: bool,
    ) -> HaplotypePhaser<'a> {
        HaplotypePhaser {
            rows,
            error,
            merge_outliers,
        }
    }

    /// Phases the variant positions of `genes` into generator haplotypes.
    ///
    /// Rewrites the per-haplotype hit flags of every variant codon in
    /// `genes` and returns the generators, sorted ascending by the size
    /// they had before outlier merging.
    pub fn phase(&self, genes: &mut [VariantGene]) -> Vec<Haplotype> {
        let positions = variant_positions(genes);
        log::debug!("Phasing {} variant positions", positions.len());
        if positions.is_empty() {
            return Vec::new();
        }

        let (mut generators, mut observations) = self.cluster(&positions);

        // Gap-free but poorly supported clusters become observations.
        let (kept, demoted): (Vec<_>, Vec<_>) = generators
            .into_iter()
            .partition(|generator| generator.hard_size() >= MINIMAL_CLUSTER_SIZE);
        generators = kept;
        observations.extend(demoted);

        generators.sort_by(|a, b| a.size().total_cmp(&b.size()));
        observations.sort_by(|a, b| a.size().total_cmp(&b.size()));
        log::debug!(
            "{} generator and {} observation clusters",
            generators.len(),
            observations.len()
        );

        if self.merge_outliers && !generators.is_empty() {
            for observation in &observations {
                self.collapse(observation, &mut generators);
            }
        }

        let total: f64 = generators.iter().map(Haplotype::size).sum();
        for (number, generator) in generators.iter_mut().enumerate() {
            generator.name = number.to_string();
            generator.frequency = generator.size() / total;
        }

        mark_haplotype_hits(genes, &positions, &generators);
        generators
    }

    /// Groups rows into clusters of exact codon-vector identity. Gap-free
    /// clusters seed the generator pool, all others the observation pool.
    fn cluster(&self, positions: &[VariantPos]) -> (Vec<Haplotype>, Vec<Haplotype>) {
        let mut generators: Vec<Haplotype> = Vec::new();
        let mut observations: Vec<Haplotype> = Vec::new();
        for row in &self.rows.rows {
            let codons = self.row_codons(&row.bases, positions);
            if absorb(&mut generators, &row.name, &codons)
                || absorb(&mut observations, &row.name, &codons)
            {
                continue;
            }
            let haplotype = Haplotype::new(row.name.clone(), codons);
            if haplotype.no_gaps {
                generators.push(haplotype);
            } else {
                observations.push(haplotype);
            }
        }
        (generators, observations)
    }

    /// The row's codon at every variant position, uncovered cells included.
    fn row_codons(&self, bases: &[u8], positions: &[VariantPos]) -> Vec<String> {
        positions
            .iter()
            .map(|position| {
                let local = position.abs_start as i64 - self.rows.begin as i64;
                (local..local + 3)
                    .map(|pos| {
                        usize::try_from(pos)
                            .ok()
                            .and_then(|pos| bases.get(pos).copied())
                            .unwrap_or(UNCOVERED) as char
                    })
                    .collect()
            })
            .collect()
    }

    /// Distributes the observation's read mass over the generators,
    /// weighted by generator size and codon-transition likelihood.
    fn collapse(&self, observation: &Haplotype, generators: &mut [Haplotype]) {
        let gen_cov: f64 = generators.iter().map(Haplotype::size).sum();
        let probabilities: Vec<f64> = generators
            .iter()
            .map(|generator| {
                generator
                    .codons
                    .iter()
                    .zip(&observation.codons)
                    .map(|(gen_codon, obs_codon)| {
                        self.error
                            .sequence_probability(gen_codon.as_bytes(), obs_codon.as_bytes())
                    })
                    .product()
            })
            .collect();

        let sum: f64 = probabilities.iter().sum();
        if sum <= 0.0 || gen_cov <= 0.0 {
            log::debug!("Unassignable observation cluster of size {}", observation.size());
            return;
        }

        let weights: Vec<f64> = generators
            .iter()
            .zip(&probabilities)
            .map(|(generator, p)| generator.size() / gen_cov * p / sum)
            .collect();
        let sum_weights: f64 = weights.iter().sum();
        if sum_weights <= 0.0 {
            return;
        }

        for (generator, weight) in generators.iter_mut().zip(&weights) {
            generator.soft_collapses += observation.size() * weight / sum_weights;
        }
    }
}

struct VariantPos {
    /// Absolute 0-based reference position of the codon's first base.
    abs_start: usize,
    gene_index: usize,
    codon_number: usize,
}

/// All variant positions across genes, ascending by reference position.
fn variant_positions(genes: &[VariantGene]) -> Vec<VariantPos> {
    let mut positions = Vec::new();
    for (gene_index, gene) in genes.iter().enumerate() {
        for (&codon_number, position) in &gene.positions {
            if position.is_variant() {
                positions.push(VariantPos {
                    abs_start: gene.codon_start(codon_number),
                    gene_index,
                    codon_number,
                });
            }
        }
    }
    positions.sort_by_key(|position| position.abs_start);
    positions
}

/// Appends the read to the first cluster with an identical codon vector.
fn absorb(haplotypes: &mut [Haplotype], read_name: &str, codons: &[String]) -> bool {
    for haplotype in haplotypes {
        if haplotype.codons.len() != codons.len() {
            continue;
        }
        if haplotype.codons == codons {
            haplotype.members.push(read_name.to_string());
            return true;
        }
    }
    false
}

fn mark_haplotype_hits(
    genes: &mut [VariantGene],
    positions: &[VariantPos],
    generators: &[Haplotype],
) {
    for (index, variant_pos) in positions.iter().enumerate() {
        let Some(position) = genes[variant_pos.gene_index]
            .positions
            .get_mut(&variant_pos.codon_number)
        else {
            continue;
        };
        for codons in position.amino_acids.values_mut() {
            for variant_codon in codons {
                variant_codon.haplotype_hits = generators
                    .iter()
                    .map(|generator| generator.codons[index] == variant_codon.codon)
                    .collect();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::juliet::msa::MsaRow;
    use crate::juliet::variant::{VariantCodon, VariantPosition};
    use approx::assert_relative_eq;
    use std::collections::{BTreeMap, HashMap};

    fn rows_of(groups: &[(&str, usize)]) -> RowMatrix {
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
        let end = rows[0].bases.len();
        RowMatrix {
            begin: 0,
            end,
            rows,
        }
    }

    fn variant_gene(codons: &[&str]) -> VariantGene {
        let mut position = VariantPosition::new("AAA".to_string(), 'K');
        for codon in codons {
            position.amino_acids.entry('E').or_default().push(VariantCodon {
                codon: codon.to_string(),
                frequency: 0.0,
                p_value: 0.0,
                known_drm: String::new(),
                haplotype_hits: Vec::new(),
            });
        }
        VariantGene {
            name: "gene".to_string(),
            begin: 0,
            positions: BTreeMap::from([(1, position)]),
        }
    }

    fn error_model() -> ErrorEstimates {
        ErrorEstimates::from_rates(0.005, 0.001).unwrap()
    }

    #[test]
    fn identical_reads_collapse_into_one_cluster() {
        let rows = rows_of(&[("AAA", 2)]);
        let error = error_model();
        let phaser = HaplotypePhaser::new(&rows, &error, true);
        let positions = variant_positions(&[variant_gene(&["GAA"])]);

        let (generators, observations) = phaser.cluster(&positions);
        assert_eq!(generators.len(), 1);
        assert!(observations.is_empty());
        assert_eq!(generators[0].size(), 2.0);
        assert_eq!(generators[0].members, vec!["AAA_0", "AAA_1"]);
    }

    #[test]
    fn gapped_reads_seed_the_observation_pool() {
        let rows = rows_of(&[("A-A", 1), ("AAA", 1)]);
        let error = error_model();
        let phaser = HaplotypePhaser::new(&rows, &error, true);
        let positions = variant_positions(&[variant_gene(&["GAA"])]);

        let (generators, observations) = phaser.cluster(&positions);
        assert_eq!(generators.len(), 1);
        assert_eq!(observations.len(), 1);
        assert_eq!(observations[0].codons, vec!["A-A"]);
    }

    #[test]
    fn small_gap_free_clusters_are_demoted() {
        let rows = rows_of(&[("AAA", 9)]);
        let error = error_model();
        let mut genes = vec![variant_gene(&["GAA"])];

        let generators = HaplotypePhaser::new(&rows, &error, true).phase(&mut genes);
        assert!(generators.is_empty());
    }

    #[test]
    fn soft_mass_is_conserved_across_generators() {
        let rows = rows_of(&[("AAA", 60), ("GAA", 30), ("A-A", 5)]);
        let error = error_model();
        let mut genes = vec![variant_gene(&["GAA"])];

        let generators = HaplotypePhaser::new(&rows, &error, true).phase(&mut genes);
        assert_eq!(generators.len(), 2);

        let soft: f64 = generators.iter().map(|g| g.soft_collapses).sum();
        assert_relative_eq!(soft, 5.0, epsilon = 1e-9);
        for generator in &generators {
            assert!(generator.size() >= generator.hard_size() as f64);
        }
        let frequency: f64 = generators.iter().map(|g| g.frequency).sum();
        assert_relative_eq!(frequency, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn merging_can_be_disabled() {
        let rows = rows_of(&[("AAA", 60), ("GAA", 30), ("A-A", 5)]);
        let error = error_model();
        let mut genes = vec![variant_gene(&["GAA"])];

        let generators = HaplotypePhaser::new(&rows, &error, false).phase(&mut genes);
        assert!(generators.iter().all(|g| g.soft_collapses == 0.0));
        assert_eq!(generators[0].size(), 30.0);
        assert_eq!(generators[1].size(), 60.0);
    }

    #[test]
    fn variant_codons_receive_per_generator_hit_flags() {
        let rows = rows_of(&[("AAA", 60), ("GAA", 30)]);
        let error = error_model();
        let mut genes = vec![variant_gene(&["GAA"])];

        let generators = HaplotypePhaser::new(&rows, &error, true).phase(&mut genes);
        assert_eq!(generators[0].name, "0");
        assert_eq!(generators[0].codons, vec!["GAA"]);
        assert_eq!(generators[1].codons, vec!["AAA"]);

        let position = genes[0].positions.get(&1).unwrap();
        let variant_codon = &position.amino_acids.get(&'E').unwrap()[0];
        assert_eq!(variant_codon.haplotype_hits, vec![true, false]);
    }

    #[test]
    fn reads_not_spanning_a_variant_position_are_gapped() {
        let mut rows = rows_of(&[("AAAAAA", 1)]);
        rows.rows.push(MsaRow {
            name: "short".to_string(),
            bases: b"AAA   ".to_vec(),
            insertions: HashMap::new(),
        });
        let error = error_model();
        let phaser = HaplotypePhaser::new(&rows, &error, true);

        let mut gene = variant_gene(&["GAA"]);
        gene.positions.insert(
            2,
            gene.positions.get(&1).unwrap().clone(),
        );
        let positions = variant_positions(&[gene]);
        assert_eq!(positions.len(), 2);

        let (generators, observations) = phaser.cluster(&positions);
        assert_eq!(generators.len(), 1);
        assert_eq!(observations.len(), 1);
        assert_eq!(observations[0].codons[1], "   ");
    }
}

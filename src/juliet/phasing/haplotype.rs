//! Read clusters sharing identical codons at all variant positions.

/// A cluster of reads with identical per-variant-position codons.
///
/// Generators are well-supported, gap-free clusters; observations are
/// everything else and only ever contribute soft mass onto generators.
#[derive(Debug, Clone, PartialEq)]
pub struct Haplotype {
    pub name: String,
    /// Names of the reads collapsed into this cluster.
    pub members: Vec<String>,
    /// Codons at the variant positions, in ascending genomic order.
    pub codons: Vec<String>,
    /// Fractional read mass reassigned from observation clusters.
    pub soft_collapses: f64,
    /// Share of the total generator mass, set after phasing.
    pub frequency: f64,
    pub no_gaps: bool,
}

impl Haplotype {
    pub fn new(first_member: String, codons: Vec<String>) -> Haplotype {
        let no_gaps = !codons
            .iter()
            .any(|codon| codon.contains(&['-', 'N', ' '][..]));
        Haplotype {
            name: String::new(),
            members: vec![first_member],
            codons,
            soft_collapses: 0.0,
            frequency: 0.0,
            no_gaps,
        }
    }

    pub fn hard_size(&self) -> usize {
        self.members.len()
    }

    /// Hard member count plus reassigned soft mass.
    pub fn size(&self) -> f64 {
        self.members.len() as f64 + self.soft_collapses
    }
}

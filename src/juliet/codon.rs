//! Codon to amino-acid translation.

/// Translates a codon into its amino acid, stop codons mapping to 'X'.
/// Returns `None` for triplets that do not encode an amino acid.
pub fn amino_acid(codon: &[u8]) -> Option<char> {
    let codon: [u8; 3] = codon.try_into().ok()?;
    let aa = match &codon {
        b"ATT" | b"ATC" | b"ATA" => 'I',
        b"CTT" | b"CTC" | b"CTA" | b"CTG" | b"TTA" | b"TTG" => 'L',
        b"GTT" | b"GTC" | b"GTA" | b"GTG" => 'V',
        b"TTT" | b"TTC" => 'F',
        b"ATG" => 'M',
        b"TGT" | b"TGC" => 'C',
        b"GCT" | b"GCC" | b"GCA" | b"GCG" => 'A',
        b"GGT" | b"GGC" | b"GGA" | b"GGG" => 'G',
        b"CCT" | b"CCC" | b"CCA" | b"CCG" => 'P',
        b"ACT" | b"ACC" | b"ACA" | b"ACG" => 'T',
        b"TCT" | b"TCC" | b"TCA" | b"TCG" | b"AGT" | b"AGC" => 'S',
        b"TAT" | b"TAC" => 'Y',
        b"TGG" => 'W',
        b"CAA" | b"CAG" => 'Q',
        b"AAT" | b"AAC" => 'N',
        b"CAT" | b"CAC" => 'H',
        b"GAA" | b"GAG" => 'E',
        b"GAT" | b"GAC" => 'D',
        b"AAA" | b"AAG" => 'K',
        b"CGT" | b"CGC" | b"CGA" | b"CGG" | b"AGA" | b"AGG" => 'R',
        b"TAA" | b"TAG" | b"TGA" => 'X',
        _ => return None,
    };
    Some(aa)
}

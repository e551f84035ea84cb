pub mod codon;
pub mod error_model;
pub mod msa;
pub mod phasing;
pub mod reads;
pub mod stats;
pub mod target;
pub mod variant;
pub mod writers;

mod haplotype;
mod phaser;

pub use haplotype::Haplotype;
pub use phaser::HaplotypePhaser;

mod base;
mod fisher;

pub use base::{FisherResult, SignificanceEngine, ALPHA, NUM_ALT_BASES, NUM_POSITIONS};
pub use fisher::{bonferroni, fisher_exact_greater};

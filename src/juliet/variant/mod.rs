mod caller;
mod gene;

pub use caller::{Accuracy, CallResults, VariantCaller};
pub use gene::{ContextCounts, VariantCodon, VariantGene, VariantPosition};

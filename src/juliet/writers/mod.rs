mod report;
mod write_msa;

pub use report::{write_report, JsonReport};
pub use write_msa::write_msa;

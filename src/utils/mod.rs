mod bam_utils;
mod io_utils;
mod region;
mod util;

pub use bam_utils::{extract_reads, get_bam_header, get_chemistry, is_bam_mapped};
pub use io_utils::create_writer;
pub use region::GenomicRange;
pub use util::{handle_error_and_exit, Result};

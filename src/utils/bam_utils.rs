use crate::juliet::reads::AlignedRead;
use crate::utils::{GenomicRange, Result};
use rust_htslib::bam::{self, Read};
use std::{collections::HashSet, path::Path};

pub fn get_bam_header(bam_path: &Path) -> Result<bam::Header> {
    let bam = bam::Reader::from_path(bam_path)
        .map_err(|e| format!("Failed to create bam reader: {}", e))?;
    Ok(bam::Header::from_template(bam.header()))
}

pub fn is_bam_mapped(bam_header: &bam::Header) -> bool {
    // A mapped input carries SQ lines for its references
    for line in String::from_utf8(bam_header.to_bytes()).unwrap().lines() {
        if line.starts_with("@SQ") {
            return true;
        }
    }
    false
}

/// Extracts the sequencing chemistry recorded in the read groups.
///
/// All read groups of one input must agree; batches with mixed chemistries
/// cannot share one error model and are rejected.
pub fn get_chemistry(bam_header: &bam::Header) -> Result<String> {
    let header_hashmap = bam_header.to_hashmap();
    let mut chemistries = HashSet::new();

    if let Some(rg_fields) = header_hashmap.get("RG") {
        for rg_field in rg_fields {
            if let Some(ds_field) = rg_field.get("DS") {
                for entry in ds_field.split(';') {
                    if let Some(chemistry) = entry.strip_prefix("CHEMISTRY=") {
                        chemistries.insert(chemistry.to_string());
                    }
                }
            }
        }
    }

    match chemistries.len() {
        1 => Ok(chemistries.into_iter().next().unwrap()),
        0 => Err(
            "No sequencing chemistry found in read groups; specify --sub and --del rates"
                .to_string(),
        ),
        _ => Err("Mixed chemistries are not allowed".to_string()),
    }
}

/// Reads all primary alignments of one input, optionally clipped to a region.
pub fn extract_reads(bam_path: &Path, region: Option<&GenomicRange>) -> Result<Vec<AlignedRead>> {
    let mut bam = bam::Reader::from_path(bam_path)
        .map_err(|e| format!("Failed to create bam reader: {}", e))?;

    let mut reads = Vec::new();
    let mut record = bam::Record::new();
    while let Some(result) = bam.read(&mut record) {
        result.map_err(|e| format!("Failed to read record: {}", e))?;
        if record.is_unmapped() || record.is_secondary() || record.is_supplementary() {
            continue;
        }
        let read = AlignedRead::from_hts_rec(&record)?;
        let read = match region {
            Some(range) => match read.clip_to(range.start, range.end) {
                Some(clipped) => clipped,
                None => continue,
            },
            None => read,
        };
        if !read.bases.is_empty() {
            reads.push(read);
        }
    }
    log::debug!("{}: extracted {} reads", bam_path.display(), reads.len());
    Ok(reads)
}

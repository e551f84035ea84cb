//! Position-tagged read representation built from alignment records.

use crate::utils::Result;
use rust_htslib::bam::{self, ext::BamRecordExtensions, record::Aux, record::Cigar};
use std::str;

/// Per-base edit operation relative to the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOp {
    Match,
    Mismatch,
    Deletion,
    Insertion,
    Padding,
    SoftClip,
}

impl EditOp {
    pub fn consumes_reference(&self) -> bool {
        matches!(self, EditOp::Match | EditOp::Mismatch | EditOp::Deletion)
    }
}

/// Optional per-base quality value thresholds.
///
/// A base passes a threshold when the threshold is unset or the base carries
/// no value for it; otherwise the value must reach the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QvThresholds {
    pub qual: Option<u8>,
    pub del: Option<u8>,
    pub sub: Option<u8>,
    pub ins: Option<u8>,
}

pub const DEFAULT_SUB_QV: u8 = 42;

impl Default for QvThresholds {
    fn default() -> Self {
        QvThresholds {
            qual: None,
            del: None,
            sub: Some(DEFAULT_SUB_QV),
            ins: None,
        }
    }
}

/// One aligned position of one read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Base {
    pub op: EditOp,
    pub nuc: u8,
    pub qual_qv: Option<u8>,
    pub del_qv: Option<u8>,
    pub sub_qv: Option<u8>,
    pub ins_qv: Option<u8>,
}

impl Base {
    pub fn new(op: EditOp, nuc: u8) -> Base {
        Base {
            op,
            nuc,
            qual_qv: None,
            del_qv: None,
            sub_qv: None,
            ins_qv: None,
        }
    }

    fn meets_one(qv: Option<u8>, threshold: Option<u8>) -> bool {
        match (qv, threshold) {
            (Some(qv), Some(threshold)) => qv >= threshold,
            _ => true,
        }
    }

    pub fn meets_thresholds(&self, thresholds: &QvThresholds) -> bool {
        Self::meets_one(self.qual_qv, thresholds.qual)
            && Self::meets_one(self.del_qv, thresholds.del)
            && Self::meets_one(self.sub_qv, thresholds.sub)
            && Self::meets_one(self.ins_qv, thresholds.ins)
    }
}

/// A read unrolled into per-base edit operations, anchored at a reference
/// start position (0-based half-open interval).
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedRead {
    pub name: String,
    pub start: usize,
    pub end: usize,
    pub bases: Vec<Base>,
}

impl AlignedRead {
    pub fn new(name: String, start: usize, bases: Vec<Base>) -> AlignedRead {
        let ref_len = bases.iter().filter(|b| b.op.consumes_reference()).count();
        AlignedRead {
            name,
            start,
            end: start + ref_len,
            bases,
        }
    }

    /// Builds an `AlignedRead` from an HTSlib record.
    ///
    /// Per-base quality values are taken from the record QUAL field and the
    /// dq/sq/iq tags when present. Reference-skip and unknown CIGAR
    /// operations are rejected.
    pub fn from_hts_rec(rec: &bam::Record) -> Result<AlignedRead> {
        let name = str::from_utf8(rec.qname())
            .map_err(|e| format!("Invalid read name: {}", e))?
            .to_string();
        let seq = rec.seq().as_bytes();
        let quals = rec.qual();
        let has_quals = quals.iter().any(|&q| q != 0xff);
        let del_qvs = get_qv_tag(rec, "dq");
        let sub_qvs = get_qv_tag(rec, "sq");
        let ins_qvs = get_qv_tag(rec, "iq");

        let make_base = |op: EditOp, qpos: usize| {
            let mut base = Base::new(op, seq[qpos].to_ascii_uppercase());
            if has_quals {
                base.qual_qv = quals.get(qpos).copied();
            }
            base.del_qv = del_qvs.as_ref().and_then(|qv| qv.get(qpos).copied());
            base.sub_qv = sub_qvs.as_ref().and_then(|qv| qv.get(qpos).copied());
            base.ins_qv = ins_qvs.as_ref().and_then(|qv| qv.get(qpos).copied());
            base
        };

        let mut bases = Vec::with_capacity(seq.len());
        let mut qpos = 0;
        for op in rec.cigar().iter() {
            match *op {
                Cigar::Equal(len) | Cigar::Match(len) => {
                    for _ in 0..len {
                        bases.push(make_base(EditOp::Match, qpos));
                        qpos += 1;
                    }
                }
                Cigar::Diff(len) => {
                    for _ in 0..len {
                        bases.push(make_base(EditOp::Mismatch, qpos));
                        qpos += 1;
                    }
                }
                Cigar::Ins(len) => {
                    for _ in 0..len {
                        bases.push(make_base(EditOp::Insertion, qpos));
                        qpos += 1;
                    }
                }
                Cigar::Del(len) => {
                    for _ in 0..len {
                        bases.push(Base::new(EditOp::Deletion, b'-'));
                    }
                }
                Cigar::SoftClip(len) => {
                    for _ in 0..len {
                        bases.push(make_base(EditOp::SoftClip, qpos));
                        qpos += 1;
                    }
                }
                Cigar::Pad(len) => {
                    for _ in 0..len {
                        bases.push(Base::new(EditOp::Padding, b'-'));
                    }
                }
                Cigar::HardClip(_) => {}
                Cigar::RefSkip(_) => {
                    return Err(format!("Unrecognized edit operation in read {}: N", name));
                }
            }
        }

        Ok(AlignedRead::new(name, rec.reference_start() as usize, bases))
    }

    /// Restricts the read to reference interval [start, end), dropping bases
    /// aligned outside of it. Returns `None` when nothing overlaps.
    pub fn clip_to(&self, start: usize, end: usize) -> Option<AlignedRead> {
        let mut bases = Vec::new();
        let mut ref_pos = self.start;
        let mut new_start = None;
        for base in &self.bases {
            let in_range = ref_pos >= start && ref_pos < end;
            if base.op.consumes_reference() {
                if in_range {
                    new_start.get_or_insert(ref_pos);
                    bases.push(base.clone());
                }
                ref_pos += 1;
            } else if in_range && new_start.is_some() {
                bases.push(base.clone());
            }
        }
        new_start.map(|start| AlignedRead::new(self.name.clone(), start, bases))
    }
}

fn get_qv_tag(rec: &bam::Record, tag: &str) -> Option<Vec<u8>> {
    match rec.aux(tag.as_bytes()) {
        Ok(Aux::String(qvs)) => Some(qvs.bytes().map(|b| b.saturating_sub(33)).collect()),
        _ => None,
    }
}

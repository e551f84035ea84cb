//! Per-read expansion into fixed-width rows over the shared reference window.

use crate::juliet::reads::{AlignedRead, EditOp, QvThresholds};
use std::collections::HashMap;

/// Sentinel for positions a read does not cover.
pub const UNCOVERED: u8 = b' ';
/// Marker for deletions and quality-filtered calls.
pub const GAP: u8 = b'-';

/// One read expanded over the window: one cell per reference position,
/// insertions kept in a side map keyed by window offset.
#[derive(Debug, Clone, PartialEq)]
pub struct MsaRow {
    pub name: String,
    pub bases: Vec<u8>,
    pub insertions: HashMap<usize, String>,
}

/// All reads of a batch expanded over their shared reference window.
#[derive(Debug, Clone)]
pub struct RowMatrix {
    pub begin: usize,
    pub end: usize,
    pub rows: Vec<MsaRow>,
}

impl RowMatrix {
    pub fn new(reads: &[AlignedRead], thresholds: &QvThresholds) -> RowMatrix {
        let begin = reads.iter().map(|r| r.start).min().unwrap_or(0);
        let end = reads.iter().map(|r| r.end).max().unwrap_or(0);
        let rows = reads
            .iter()
            .map(|read| Self::expand_read(read, begin, end - begin, thresholds))
            .collect();
        RowMatrix { begin, end, rows }
    }

    pub fn width(&self) -> usize {
        self.end - self.begin
    }

    fn expand_read(
        read: &AlignedRead,
        begin: usize,
        width: usize,
        thresholds: &QvThresholds,
    ) -> MsaRow {
        let mut bases = vec![UNCOVERED; width];
        let mut insertions = HashMap::new();
        let mut pos = read.start - begin;
        let mut pending = String::new();

        let mut flush = |pending: &mut String, pos: usize| {
            if !pending.is_empty() {
                insertions.insert(pos, std::mem::take(pending));
            }
        };

        for base in &read.bases {
            match base.op {
                EditOp::Match | EditOp::Mismatch => {
                    flush(&mut pending, pos);
                    bases[pos] = if base.meets_thresholds(thresholds) {
                        base.nuc
                    } else {
                        GAP
                    };
                    pos += 1;
                }
                EditOp::Deletion => {
                    flush(&mut pending, pos);
                    bases[pos] = GAP;
                    pos += 1;
                }
                EditOp::Insertion => pending.push(base.nuc as char),
                EditOp::Padding | EditOp::SoftClip => flush(&mut pending, pos),
            }
        }

        MsaRow {
            name: read.name.clone(),
            bases,
            insertions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::juliet::reads::{Base, DEFAULT_SUB_QV};

    fn read(name: &str, start: usize, ops: &[(EditOp, u8)]) -> AlignedRead {
        let bases = ops.iter().map(|&(op, nuc)| Base::new(op, nuc)).collect();
        AlignedRead::new(name.to_string(), start, bases)
    }

    fn no_thresholds() -> QvThresholds {
        QvThresholds {
            qual: None,
            del: None,
            sub: None,
            ins: None,
        }
    }

    #[test]
    fn rows_share_the_window_width() {
        let reads = vec![
            read("r1", 5, &[(EditOp::Match, b'A'), (EditOp::Match, b'C')]),
            read("r2", 8, &[(EditOp::Match, b'G')]),
        ];
        let matrix = RowMatrix::new(&reads, &no_thresholds());
        assert_eq!(matrix.begin, 5);
        assert_eq!(matrix.end, 9);
        for row in &matrix.rows {
            assert_eq!(row.bases.len(), matrix.width());
        }
        assert_eq!(matrix.rows[0].bases, b"AC  ".to_vec());
        assert_eq!(matrix.rows[1].bases, b"   G".to_vec());
    }

    #[test]
    fn every_cell_is_uncovered_gap_or_nucleotide() {
        let reads = vec![read(
            "r1",
            2,
            &[
                (EditOp::Match, b'A'),
                (EditOp::Deletion, b'-'),
                (EditOp::Mismatch, b'T'),
            ],
        )];
        let matrix = RowMatrix::new(&reads, &no_thresholds());
        for &cell in &matrix.rows[0].bases {
            assert!(matches!(cell, UNCOVERED | GAP | b'A' | b'C' | b'G' | b'T'));
        }
        assert_eq!(matrix.rows[0].bases, b"A-T".to_vec());
    }

    #[test]
    fn insertions_are_kept_out_of_line() {
        let reads = vec![read(
            "r1",
            0,
            &[
                (EditOp::Match, b'A'),
                (EditOp::Insertion, b'C'),
                (EditOp::Insertion, b'G'),
                (EditOp::Match, b'T'),
            ],
        )];
        let matrix = RowMatrix::new(&reads, &no_thresholds());
        let row = &matrix.rows[0];
        assert_eq!(row.bases, b"AT".to_vec());
        assert_eq!(row.insertions.get(&1), Some(&"CG".to_string()));
    }

    #[test]
    fn padding_and_soft_clips_flush_pending_insertions() {
        let reads = vec![read(
            "r1",
            0,
            &[
                (EditOp::Match, b'A'),
                (EditOp::Insertion, b'C'),
                (EditOp::SoftClip, b'G'),
                (EditOp::Match, b'T'),
            ],
        )];
        let matrix = RowMatrix::new(&reads, &no_thresholds());
        let row = &matrix.rows[0];
        assert_eq!(row.bases, b"AT".to_vec());
        assert_eq!(row.insertions.get(&1), Some(&"C".to_string()));
    }

    #[test]
    fn failed_quality_threshold_writes_gap() {
        let mut low = Base::new(EditOp::Match, b'A');
        low.sub_qv = Some(DEFAULT_SUB_QV - 1);
        let mut high = Base::new(EditOp::Match, b'C');
        high.sub_qv = Some(DEFAULT_SUB_QV);
        let reads = vec![AlignedRead::new("r1".to_string(), 0, vec![low, high])];

        let matrix = RowMatrix::new(&reads, &QvThresholds::default());
        assert_eq!(matrix.rows[0].bases, b"-C".to_vec());
    }
}

//! Per-position consensus aggregation over the row matrix.

use super::row::{RowMatrix, GAP, UNCOVERED};
use crate::utils::Result;
use std::collections::HashMap;

/// Count-vector symbol order: A, C, G, T, gap.
pub const SYMBOLS: [u8; 5] = [b'A', b'C', b'G', b'T', GAP];

pub fn symbol_index(symbol: u8) -> Option<usize> {
    SYMBOLS.iter().position(|&s| s == symbol)
}

/// Nucleotide and insertion tallies at one reference position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MsaColumn {
    pub ref_pos: usize,
    counts: [u64; 5],
    pub insertions: HashMap<String, u64>,
}

impl MsaColumn {
    pub fn counts(&self) -> &[u64; 5] {
        &self.counts
    }

    /// Number of rows covering this position.
    pub fn coverage(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn frequency(&self, index: usize) -> f64 {
        let coverage = self.coverage();
        if coverage == 0 {
            return 0.0;
        }
        self.counts[index] as f64 / coverage as f64
    }

    /// Index of the most frequent symbol (first on ties).
    pub fn max_index(&self) -> usize {
        let mut arg_max = 0;
        for (i, &count) in self.counts.iter().enumerate() {
            if count > self.counts[arg_max] {
                arg_max = i;
            }
        }
        arg_max
    }
}

/// One `MsaColumn` per window position.
#[derive(Debug, Clone)]
pub struct ColumnMatrix {
    pub begin: usize,
    pub end: usize,
    pub columns: Vec<MsaColumn>,
}

impl ColumnMatrix {
    pub fn new(rows: &RowMatrix) -> Result<ColumnMatrix> {
        let mut columns: Vec<MsaColumn> = (rows.begin..rows.end)
            .map(|ref_pos| MsaColumn {
                ref_pos,
                ..MsaColumn::default()
            })
            .collect();

        for row in &rows.rows {
            for (offset, &cell) in row.bases.iter().enumerate() {
                if cell == UNCOVERED {
                    continue;
                }
                let index = symbol_index(cell)
                    .ok_or_else(|| format!("Unexpected base {}", cell as char))?;
                columns[offset].counts[index] += 1;
            }
            for (&offset, insertion) in &row.insertions {
                *columns[offset]
                    .insertions
                    .entry(insertion.clone())
                    .or_insert(0) += 1;
            }
        }

        Ok(ColumnMatrix {
            begin: rows.begin,
            end: rows.end,
            columns,
        })
    }

    pub fn has(&self, ref_pos: usize) -> bool {
        ref_pos >= self.begin && ref_pos < self.end
    }

    /// Column at an absolute reference position.
    pub fn column(&self, ref_pos: usize) -> &MsaColumn {
        &self.columns[ref_pos - self.begin]
    }
}

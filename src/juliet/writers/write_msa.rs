//! Per-column pileup dump behind `--save-msa`.

use crate::juliet::msa::{ColumnMatrix, SYMBOLS};
use crate::juliet::stats::SignificanceEngine;
use crate::utils::{create_writer, Result};
use std::fs::File;
use std::io::{BufWriter, Write};

/// Writes the filtered per-column counts with 1-based positions. The `N`
/// column is constant zero since ambiguous calls never reach the matrix.
/// Symbols flagged by the significance engine are appended with a `*`,
/// significant insertions with a `+` prefix.
pub fn write_msa(columns: &ColumnMatrix, output_prefix: &str) -> Result<()> {
    create_writer(output_prefix, "msa", |path| {
        let file =
            File::create(path).map_err(|e| format!("Failed to create {}: {}", path, e))?;
        let mut out = BufWriter::new(file);
        let engine = SignificanceEngine::default();

        let write_err = |e: std::io::Error| format!("Failed to write {}: {}", path, e);
        writeln!(out, "pos A C G T - N").map_err(write_err)?;
        for column in &columns.columns {
            write!(out, "{}", column.ref_pos + 1).map_err(write_err)?;
            for count in column.counts() {
                write!(out, " {}", count).map_err(write_err)?;
            }
            write!(out, " 0").map_err(write_err)?;

            let result = engine.test_counts(column.counts());
            for (index, symbol) in SYMBOLS.iter().enumerate() {
                if result.mask[index] && index != result.arg_max {
                    write!(out, " {}*", *symbol as char).map_err(write_err)?;
                }
            }
            for (sequence, _) in engine.test_insertions(column.counts(), &column.insertions) {
                write!(out, " +{}", sequence).map_err(write_err)?;
            }
            writeln!(out).map_err(write_err)?;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::juliet::msa::{MsaRow, RowMatrix};
    use std::collections::HashMap;

    #[test]
    fn columns_are_written_one_based_with_counts() {
        let rows: Vec<MsaRow> = (0..10)
            .map(|i| MsaRow {
                name: format!("r{}", i),
                bases: b"ACG".to_vec(),
                insertions: HashMap::new(),
            })
            .collect();
        let rows = RowMatrix {
            begin: 4,
            end: 7,
            rows,
        };
        let columns = ColumnMatrix::new(&rows).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("sample");
        let prefix = prefix.to_str().unwrap();
        write_msa(&columns, prefix).unwrap();

        let contents = std::fs::read_to_string(format!("{}.msa", prefix)).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], "pos A C G T - N");
        assert_eq!(lines[1], "5 10 0 0 0 0 0");
        assert_eq!(lines[2], "6 0 10 0 0 0 0");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn significant_minorities_are_flagged() {
        let mut rows: Vec<MsaRow> = (0..700)
            .map(|i| MsaRow {
                name: format!("a{}", i),
                bases: b"A".to_vec(),
                insertions: HashMap::new(),
            })
            .collect();
        rows.extend((0..300).map(|i| MsaRow {
            name: format!("c{}", i),
            bases: b"C".to_vec(),
            insertions: HashMap::new(),
        }));
        let rows = RowMatrix {
            begin: 0,
            end: 1,
            rows,
        };
        let columns = ColumnMatrix::new(&rows).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("sample");
        let prefix = prefix.to_str().unwrap();
        write_msa(&columns, prefix).unwrap();

        let contents = std::fs::read_to_string(format!("{}.msa", prefix)).unwrap();
        assert_eq!(contents.lines().nth(1).unwrap(), "1 700 300 0 0 0 0 C*");
    }
}

mod column;
mod row;

pub use column::{symbol_index, ColumnMatrix, MsaColumn, SYMBOLS};
pub use row::{MsaRow, RowMatrix, GAP, UNCOVERED};

//! Dense numeric views for model fitting.

use nalgebra::DMatrix;
use polars::prelude::DataFrame;

use crate::error::{Error, Result};
use crate::frame::access::numbers;

/// A numeric column with every cell present.
pub fn dense_values(frame: &DataFrame, name: &str, stage: &'static str) -> Result<Vec<f64>> {
    numbers(frame, name, stage)?
        .into_iter()
        .enumerate()
        .map(|(row, v)| {
            v.ok_or_else(|| Error::MissingValue {
                column: name.to_string(),
                row,
            })
        })
        .collect()
}

/// `rows x columns` matrix of the named numeric columns.
///
/// Fails on missing columns, non-numeric columns, and missing cells.
pub fn to_matrix(frame: &DataFrame, names: &[String]) -> Result<DMatrix<f64>> {
    let mut data = Vec::with_capacity(frame.height() * names.len());
    // Column-major storage: fill one column at a time.
    for name in names {
        data.extend(dense_values(frame, name, "matrix conversion")?);
    }
    Ok(DMatrix::from_vec(frame.height(), names.len(), data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::access::number_column;

    fn frame() -> DataFrame {
        DataFrame::new(vec![
            number_column("a", vec![Some(1.0), Some(2.0), Some(3.0)]),
            number_column("b", vec![Some(4.0), None, Some(6.0)]),
        ])
        .unwrap()
    }

    #[test]
    fn to_matrix_keeps_row_and_column_positions() {
        let m = to_matrix(&frame(), &["b".to_string(), "a".to_string()]);
        assert!(matches!(m, Err(Error::MissingValue { row: 1, .. })));

        let m = to_matrix(&frame(), &["a".to_string()]).unwrap();
        assert_eq!(m.shape(), (3, 1));
        assert_eq!(m[(2, 0)], 3.0);
    }

    #[test]
    fn dense_values_require_every_cell() {
        assert_eq!(dense_values(&frame(), "a", "test").unwrap(), vec![1.0, 2.0, 3.0]);
        assert!(matches!(
            dense_values(&frame(), "b", "test"),
            Err(Error::MissingValue { row: 1, .. })
        ));
    }
}

//! Export experiment records and frames.
//!
//! Writers take any `io::Write`, so the caller decides whether output goes to
//! a file, a buffer or stdout.

use std::io::Write;

use polars::prelude::{DataFrame, DataType};

use crate::error::{Error, Result};
use crate::eval::ExperimentRecord;
use crate::frame::{column_names, months, numbers, require, texts};

/// One CSV row per record. The header comes from the first record; every
/// other record must flatten to the same keys.
pub fn write_records_csv<W: Write>(writer: W, records: &[ExperimentRecord]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    let mut header: Option<Vec<String>> = None;

    for record in records {
        let flat = record.to_flat()?;
        let keys: Vec<String> = flat.iter().map(|(k, _)| k.clone()).collect();
        match &header {
            Some(expected) if *expected != keys => {
                return Err(Error::InvalidParameter(format!(
                    "record keys {keys:?} differ from header {expected:?}"
                )));
            }
            Some(_) => {}
            None => {
                wtr.write_record(&keys)?;
                header = Some(keys);
            }
        }
        wtr.write_record(flat.iter().map(|(_, v)| v.to_string()))?;
    }

    wtr.flush()?;
    Ok(())
}

/// Records as a pretty-printed JSON array of flat objects.
pub fn write_records_json<W: Write>(writer: W, records: &[ExperimentRecord]) -> Result<()> {
    serde_json::to_writer_pretty(writer, records)?;
    Ok(())
}

/// A frame as CSV. Missing cells are empty and months are `YYYY-MM`.
pub fn write_frame_csv<W: Write>(writer: W, frame: &DataFrame) -> Result<()> {
    let names = column_names(frame);
    let columns = names
        .iter()
        .map(|name| rendered(frame, name))
        .collect::<Result<Vec<_>>>()?;

    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(&names)?;
    for row in 0..frame.height() {
        wtr.write_record(columns.iter().map(|c| c[row].as_str()))?;
    }
    wtr.flush()?;
    Ok(())
}

fn rendered(frame: &DataFrame, name: &str) -> Result<Vec<String>> {
    const STAGE: &str = "frame export";
    let text = |v: Option<String>| v.unwrap_or_default();
    Ok(match require(frame, name, STAGE)?.dtype() {
        DataType::Float64 => numbers(frame, name, STAGE)?
            .into_iter()
            .map(|v| text(v.map(|x| x.to_string())))
            .collect(),
        DataType::String => texts(frame, name, STAGE)?.into_iter().map(text).collect(),
        DataType::Date => months(frame, name, STAGE)?
            .into_iter()
            .map(|m| text(m.map(|m| m.to_string())))
            .collect(),
        _ => require(frame, name, STAGE)?
            .cast(&DataType::String)?
            .str()?
            .into_iter()
            .map(|v| v.map(str::to_string).unwrap_or_default())
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Hyperparameters, Month};
    use crate::frame::{month_column, number_column, text_column};
    use polars::prelude::Column;

    fn record(seed: u64) -> ExperimentRecord {
        let mut hyperparameters = Hyperparameters::new();
        hyperparameters.insert("fit_intercept".into(), true.into());
        ExperimentRecord {
            n_splits: 5,
            seed,
            hyperparameters,
            train_cv_mse: 0.5,
            test_cv_mse: 0.75,
        }
    }

    #[test]
    fn records_csv_has_header_and_one_row_each() {
        let mut buf = Vec::new();
        write_records_csv(&mut buf, &[record(1), record(2)]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            [
                "n_splits,seed,fit_intercept,train_cv_mse,test_cv_mse",
                "5,1,true,0.5,0.75",
                "5,2,true,0.5,0.75",
            ]
        );
    }

    #[test]
    fn mismatched_records_are_rejected() {
        let mut other = record(2);
        other.hyperparameters.insert("alpha".into(), 0.1.into());
        let mut buf = Vec::new();
        assert!(matches!(
            write_records_csv(&mut buf, &[record(1), other]),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn records_json_is_flat() {
        let mut buf = Vec::new();
        write_records_json(&mut buf, &[record(7)]).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value[0]["seed"], serde_json::Value::from(7));
        assert_eq!(value[0]["fit_intercept"], serde_json::Value::Bool(true));
        assert_eq!(value[0]["test_cv_mse"], serde_json::Value::from(0.75));
    }

    #[test]
    fn frame_csv_renders_every_kind() {
        let frame = DataFrame::new(vec![
            number_column("price", vec![Some(250000.0), None]),
            text_column("city", vec![Some("Austin".to_string()), None]),
            month_column("saleDate", &[Month::new(2023, 4), None]).unwrap(),
            text_column("features", vec![Some(r#"{"garage":true}"#.to_string()), None]),
            Column::new("lotCount".into(), vec![Some(2_i64), None]),
        ])
        .unwrap();

        let mut buf = Vec::new();
        write_frame_csv(&mut buf, &frame).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "price,city,saleDate,features,lotCount");
        assert_eq!(lines[1], r#"250000,Austin,2023-04,"{""garage"":true}",2"#);
        assert_eq!(lines[2], ",,,,");
    }
}

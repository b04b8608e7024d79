//! Formatted terminal output.
//!
//! Formatting lives in one place so:
//! - the pipeline and evaluation code stay free of presentation concerns
//! - output changes are localized

use crate::app::PreparedDataset;
use crate::domain::{ColumnGroup, Scalar};
use crate::error::Result;
use crate::eval::ExperimentRecord;
use crate::listings::{TIME_NORMALIZED_PRICE_PER_SQFT, missing_count};

/// Summary of a prepared dataset: stage row counts, index window, column groups.
pub fn format_dataset_summary(dataset: &PreparedDataset) -> String {
    let mut out = String::new();
    let c = &dataset.counts;

    out.push_str("=== hopus - dataset ===\n");
    out.push_str(&format!(
        "Rows: raw={} | processed={} | without outliers={} | complete={}\n",
        c.raw, c.processed, c.without_outliers, c.complete_key_features
    ));

    let points = dataset.index.points();
    if let (Some(first), Some(last)) = (points.first(), points.last()) {
        out.push_str(&format!(
            "Index: {} .. {} ({} months, lag {})\n",
            first.month,
            last.month,
            points.len(),
            dataset.index.lag_months()
        ));
    }

    out.push_str("\nColumn groups:\n");
    for (group, n) in dataset.grouping.counts() {
        out.push_str(&format!("  {:<28} {n:>4}\n", group.label()));
    }
    let target = dataset.grouping.columns_in(ColumnGroup::Target);
    out.push_str(&format!("Targets: {}\n", target.join(", ")));

    // Rows kept by the outlier filter only because the ratio is missing.
    if let Ok(n) = missing_count(&dataset.frame, TIME_NORMALIZED_PRICE_PER_SQFT) {
        if n > 0 {
            out.push_str(&format!("Rows without {TIME_NORMALIZED_PRICE_PER_SQFT}: {n}\n"));
        }
    }

    out
}

/// Fixed-width table of experiment records, one row per record.
///
/// Columns follow the flat record order of the first record.
pub fn format_records(records: &[ExperimentRecord]) -> Result<String> {
    let rows = records
        .iter()
        .map(ExperimentRecord::to_flat)
        .collect::<Result<Vec<_>>>()?;
    let Some(first) = rows.first() else {
        return Ok("(no experiment records)\n".to_string());
    };

    let header: Vec<&str> = first.iter().map(|(k, _)| k.as_str()).collect();
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            header
                .iter()
                .map(|key| {
                    row.iter()
                        .find(|(k, _)| k == key)
                        .map(|(_, v)| fmt_scalar(v))
                        .unwrap_or_default()
                })
                .collect()
        })
        .collect();

    let widths: Vec<usize> = header
        .iter()
        .enumerate()
        .map(|(j, h)| cells.iter().map(|r| r[j].len()).chain([h.len()]).max().unwrap_or(0))
        .collect();

    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();

    let mut out = String::new();
    push_row(&mut out, header.iter().copied(), &widths);
    push_row(&mut out, rule.iter().map(String::as_str), &widths);
    for row in &cells {
        push_row(&mut out, row.iter().map(String::as_str), &widths);
    }
    Ok(out)
}

fn push_row<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>, widths: &[usize]) {
    let line: Vec<String> = cells
        .zip(widths)
        .map(|(c, &w)| format!("{c:>w$}"))
        .collect();
    out.push_str(line.join("  ").trim_end());
    out.push('\n');
}

fn fmt_scalar(v: &Scalar) -> String {
    match v {
        Scalar::Float(x) => format!("{x:.6e}"),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Hyperparameters;

    fn record(seed: u64, test: f64) -> ExperimentRecord {
        let mut hyperparameters = Hyperparameters::new();
        hyperparameters.insert("fit_intercept".into(), true.into());
        ExperimentRecord {
            n_splits: 5,
            seed,
            hyperparameters,
            train_cv_mse: 0.5,
            test_cv_mse: test,
        }
    }

    #[test]
    fn records_table_has_header_rule_and_rows() {
        let text = format_records(&[record(7, 0.75), record(123456, 1.5)]).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("n_splits"));
        assert!(lines[0].ends_with("test_cv_mse"));
        assert!(lines[1].chars().all(|c| c == '-' || c == ' '));
        assert!(lines[3].contains("123456"));
        assert!(lines[3].ends_with("1.500000e0"));
    }

    #[test]
    fn empty_records_render_a_placeholder() {
        assert_eq!(format_records(&[]).unwrap(), "(no experiment records)\n");
    }

    #[test]
    fn dataset_summary_lists_counts_and_groups() {
        use crate::app::{DatasetConfig, prepare_dataset};
        use crate::data::{SampleConfig, generate_sample};

        let sample = generate_sample(&SampleConfig::default()).unwrap();
        let prepared =
            prepare_dataset(&sample.listings, &sample.observations, &DatasetConfig::default()).unwrap();
        let text = format_dataset_summary(&prepared);

        assert!(text.starts_with("=== hopus - dataset ===\n"));
        assert!(text.contains(&format!("raw={}", sample.listings.len())));
        assert!(text.contains("Index: "));
        assert!(text.contains(ColumnGroup::KeyPredictionFeatures.label()));
        assert!(text.contains("Targets: "));
    }
}

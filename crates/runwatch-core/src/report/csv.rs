//! Daily statistics as CSV

use std::fmt::Write;

use crate::models::DailyStats;

/// Fixed leading columns of the daily report
pub const BASE_COLUMNS: [&str; 4] = ["Date", "Total Traces", "Zenrows Errors", "Error Rate"];

/// Render daily stats as CSV, one row per date in ascending order.
///
/// `category_columns` (usually [`CategoryTable::column_order`]) appends one
/// count column per category; categories missing from a row read as 0.
///
/// [`CategoryTable::column_order`]: crate::analysis::CategoryTable::column_order
pub fn render_daily_csv(stats: &DailyStats, category_columns: &[&str]) -> String {
    let mut out = String::new();

    let header: Vec<&str> = BASE_COLUMNS.iter().chain(category_columns).copied().collect();
    out.push_str(&header.join(","));
    out.push('\n');

    for (date, stat) in stats {
        let _ = write!(
            out,
            "{date},{},{},{}",
            stat.total_traces, stat.zenrows_errors, stat.error_rate
        );
        for column in category_columns {
            let _ = write!(out, ",{}", stat.category_count(column));
        }
        out.push('\n');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DailyStat, ErrorRate};
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn stat(total: u64, errors: u64, categories: Option<&[(&str, u64)]>) -> DailyStat {
        DailyStat {
            total_traces: total,
            zenrows_errors: errors,
            error_rate: ErrorRate::from_counts(errors, total),
            categories: categories.map(|pairs| {
                pairs
                    .iter()
                    .map(|(name, count)| (name.to_string(), *count))
                    .collect::<BTreeMap<_, _>>()
            }),
        }
    }

    #[test]
    fn test_plain_report() {
        let mut stats = DailyStats::new();
        stats.insert("2025-08-30".to_string(), stat(3, 1, None));
        stats.insert("2025-08-29".to_string(), stat(0, 0, None));

        assert_eq!(
            render_daily_csv(&stats, &[]),
            "Date,Total Traces,Zenrows Errors,Error Rate\n\
             2025-08-29,0,0,0.0\n\
             2025-08-30,3,1,33.3\n"
        );
    }

    #[test]
    fn test_category_columns_follow_given_order() {
        let mut stats = DailyStats::new();
        stats.insert(
            "2025-08-29".to_string(),
            stat(2, 3, Some(&[("read_timeout", 1), ("unknown_errors", 2)])),
        );

        let csv = render_daily_csv(&stats, &["http_404_not_found", "read_timeout", "unknown_errors"]);
        assert_eq!(
            csv,
            "Date,Total Traces,Zenrows Errors,Error Rate,http_404_not_found,read_timeout,unknown_errors\n\
             2025-08-29,2,3,150.0,0,1,2\n"
        );
    }
}

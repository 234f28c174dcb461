//! ASCII table rendering
//!
//! Bordered layout for result tables and the `\d` table listing. Result
//! printing caps at 50 rows and reports how many were withheld. Values are
//! always f64 and print with six decimals; each column is sized to its
//! widest cell.

use crate::catalog::Catalog;
use crate::engine::ResultTable;
use std::fmt::Write;

const MAX_PRINT_ROWS: usize = 50;

fn pad_center(text: &str, width: usize, pad: char) -> String {
    if text.len() >= width {
        return text.to_string();
    }
    let total = width - text.len();
    let left = total / 2;
    let mut out = String::with_capacity(width);
    out.extend(std::iter::repeat_n(pad, left));
    out.push_str(text);
    out.extend(std::iter::repeat_n(pad, total - left));
    out
}

fn format_value(value: f64) -> String {
    format!("{value:.6}")
}

/// Render a result table in the bordered layout, capped at 50 rows.
pub fn render_result(table: &ResultTable) -> String {
    let rows = table.row_count();
    let shown = rows.min(MAX_PRINT_ROWS);

    let widths: Vec<usize> = table
        .columns
        .iter()
        .map(|column| {
            let widest_value = column.values[..shown]
                .iter()
                .map(|v| format_value(*v).len())
                .max()
                .unwrap_or(0);
            column.name.len().max(widest_value) + 2
        })
        .collect();
    let total: usize = widths.iter().map(|w| w + 2).sum();
    let border = "-".repeat(total);

    let mut out = String::new();
    let _ = writeln!(out, "{border}");
    let _ = writeln!(out, "{}", pad_center(&table.name, total, '-'));
    let _ = writeln!(out, "{border}");

    for (column, width) in table.columns.iter().zip(&widths) {
        let _ = write!(out, "|{}|", pad_center(&column.name, *width, ' '));
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "{border}");

    for row in 0..shown {
        for (column, width) in table.columns.iter().zip(&widths) {
            let _ = write!(
                out,
                "|{}|",
                pad_center(&format_value(column.values[row]), *width, ' ')
            );
        }
        let _ = writeln!(out);
    }
    let _ = writeln!(out, "{border}");

    if rows > shown {
        let _ = writeln!(
            out,
            "An additional {} rows were not printed (total results: {rows}).",
            rows - shown
        );
    }
    out
}

/// Render the table listing shown by the `\d` meta-command.
pub fn render_table_list(catalog: &Catalog) -> String {
    let width = catalog
        .tables()
        .iter()
        .map(|t| t.name.len() + 4)
        .max()
        .unwrap_or(10);
    let border = "-".repeat(width);

    let mut out = String::new();
    let _ = writeln!(out, "{border}");
    let _ = writeln!(out, "{}", pad_center("Tables", width, '-'));
    let _ = writeln!(out, "{border}");
    for table in catalog.tables() {
        let _ = writeln!(out, "|{}|", pad_center(&table.name, width - 2, ' '));
    }
    let _ = writeln!(out, "{border}");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Column, ColumnData, Table};
    use crate::engine::ResultColumn;
    use std::sync::Arc;

    #[test]
    fn single_column_layout_is_exact() {
        let table = ResultTable {
            name: "Result Table".into(),
            columns: vec![ResultColumn {
                name: "x".into(),
                values: vec![1.0, 2.0],
            }],
        };
        let expected = "\
------------
Result Table
------------
|    x     |
------------
| 1.000000 |
| 2.000000 |
------------
";
        assert_eq!(render_result(&table), expected);
    }

    #[test]
    fn columns_size_to_their_widest_cell() {
        let table = ResultTable {
            name: "Result Table".into(),
            columns: vec![ResultColumn {
                name: "(x + 1000000)".into(),
                values: vec![1000001.0],
            }],
        };
        let rendered = render_result(&table);
        // Name (13 chars) and value ("1000001.000000", 14 chars) share one
        // 16-wide cell.
        assert!(rendered.contains("| 1000001.000000 |"));
        assert!(rendered.contains("| (x + 1000000)  |"));
    }

    #[test]
    fn long_results_cap_at_fifty_rows() {
        let table = ResultTable {
            name: "Result Table".into(),
            columns: vec![ResultColumn {
                name: "x".into(),
                values: (0..52).map(|v| v as f64).collect(),
            }],
        };
        let rendered = render_result(&table);
        assert_eq!(rendered.matches("49.000000").count(), 1);
        assert!(!rendered.contains("50.000000"));
        assert!(
            rendered.ends_with("An additional 2 rows were not printed (total results: 52).\n")
        );
    }

    #[test]
    fn empty_result_prints_header_only() {
        let table = ResultTable {
            name: "Result Table".into(),
            columns: vec![ResultColumn {
                name: "x".into(),
                values: vec![],
            }],
        };
        let rendered = render_result(&table);
        assert!(rendered.contains("| x |"));
        assert!(!rendered.contains("0.000000"));
    }

    #[test]
    fn table_list_layout_is_exact() {
        let catalog = Catalog::new(vec![Table::new(
            "demo".into(),
            vec![Arc::new(Column::with_data(
                "x".into(),
                ColumnData::Dbl(vec![1.0]),
            ))],
        )]);
        let expected = "\
--------
-Tables-
--------
| demo |
--------
";
        assert_eq!(render_table_list(&catalog), expected);
    }
}

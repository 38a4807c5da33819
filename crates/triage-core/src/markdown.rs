//! Minimal markdown table rendering.
//!
//! Generic over ordered rows of string cells, so it carries no
//! antivirus-specific knowledge; the triage renderer feeds it
//! engine/result pairs but any tabular data works.

/// Escape characters that would break out of a table cell.
fn escape_cell(cell: &str) -> String {
    cell.replace('|', "\\|").replace('\n', " ")
}

/// Render a markdown table with a header row and one row per entry.
///
/// Columns are padded to the widest cell so the source text stays
/// aligned. Rows shorter than the header are padded with empty cells;
/// surplus cells are dropped. Zero data rows yield the header and
/// separator lines only.
pub fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let escaped: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.iter().map(|cell| escape_cell(cell)).collect())
        .collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &escaped {
        for (i, cell) in row.iter().enumerate().take(widths.len()) {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let mut out = String::new();
    write_row(&mut out, headers.iter().copied(), &widths);
    out.push('|');
    for width in &widths {
        out.push_str(&"-".repeat(width + 2));
        out.push('|');
    }
    out.push('\n');
    for row in &escaped {
        write_row(&mut out, row.iter().map(String::as_str), &widths);
    }
    out
}

fn write_row<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>, widths: &[usize]) {
    let mut cells: Vec<&str> = cells.collect();
    cells.resize(widths.len(), "");
    out.push('|');
    for (cell, width) in cells.iter().zip(widths) {
        out.push(' ');
        out.push_str(cell);
        for _ in cell.chars().count()..*width {
            out.push(' ');
        }
        out.push_str(" |");
    }
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_aligns_columns() {
        let rows = vec![
            vec!["EngineA".to_string(), "Safe".to_string()],
            vec!["EngineB".to_string(), "Malicious".to_string()],
        ];
        let out = table(&["Antivirus", "Result"], &rows);
        assert_eq!(
            out,
            "| Antivirus | Result    |\n\
             |-----------|-----------|\n\
             | EngineA   | Safe      |\n\
             | EngineB   | Malicious |\n"
        );
    }

    #[test]
    fn table_without_rows_keeps_header() {
        let out = table(&["Antivirus", "Result"], &[]);
        assert_eq!(out, "| Antivirus | Result |\n|-----------|--------|\n");
    }

    #[test]
    fn table_escapes_pipes_and_newlines() {
        let rows = vec![vec!["a|b".to_string(), "x\ny".to_string()]];
        let out = table(&["Name", "Value"], &rows);
        assert!(out.contains("a\\|b"));
        assert!(out.contains("x y"));
    }

    #[test]
    fn table_pads_short_rows() {
        let rows = vec![vec!["only".to_string()]];
        let out = table(&["One", "Two"], &rows);
        assert_eq!(out.lines().count(), 3);
        for line in out.lines() {
            assert_eq!(line.matches('|').count(), 3);
        }
    }
}

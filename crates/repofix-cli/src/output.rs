use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    for line in render_table(headers, &rows) {
        println!("{line}");
    }
}

/// Count-like columns (exit codes, `5/7` tallies, durations, `-`
/// placeholders) are right-aligned so they line up; everything else is
/// left-aligned.
fn render_table(headers: &[&str], rows: &[Vec<String>]) -> Vec<String> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.len());
            }
        }
    }

    let numeric: Vec<bool> = (0..headers.len())
        .map(|i| {
            !rows.is_empty()
                && rows
                    .iter()
                    .all(|row| row.get(i).is_some_and(|c| numeric_cell(c)))
        })
        .collect();

    let mut lines = Vec::with_capacity(rows.len() + 2);
    let header_row: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| pad(h, widths[i], numeric[i]))
        .collect();
    lines.push(header_row.join("  "));

    let sep: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    lines.push(sep.join("  "));

    for row in rows {
        let cells: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let w = widths.get(i).copied().unwrap_or(0);
                pad(cell, w, numeric.get(i).copied().unwrap_or(false))
            })
            .collect();
        lines.push(cells.join("  "));
    }
    lines
}

fn numeric_cell(cell: &str) -> bool {
    !cell.is_empty()
        && cell
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '/' | '-'))
}

fn pad(text: &str, width: usize, right_align: bool) -> String {
    if right_align {
        format!("{text:>width$}")
    } else {
        format!("{text:<width$}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn numeric_columns_right_aligned() {
        let lines = render_table(
            &["TRY", "TESTS", "MS"],
            &[row(&["try-01", "5/7", "1200"]), row(&["try-02", "-", "80"])],
        );
        assert_eq!(lines[0], "TRY     TESTS    MS");
        assert_eq!(lines[1], "------  -----  ----");
        assert_eq!(lines[2], "try-01    5/7  1200");
        assert_eq!(lines[3], "try-02      -    80");
    }

    #[test]
    fn text_columns_left_aligned() {
        let lines = render_table(
            &["ID", "OK"],
            &[row(&["a", "yes"]), row(&["longer-id", "no"])],
        );
        assert_eq!(lines[2], "a          yes");
        assert_eq!(lines[3], "longer-id  no ");
    }

    #[test]
    fn empty_rows_render_header_only() {
        let lines = render_table(&["A", "B"], &[]);
        assert_eq!(lines, vec!["A  B".to_string(), "-  -".to_string()]);
    }
}

//! Table inference from column-aligned text.
//!
//! Text-only providers have no layout model, so tables are recovered from
//! lines whose cells are separated by `|`, tabs, or runs of two or more
//! spaces. Consecutive multi-cell lines form one table.

use crate::models::record::TableGrid;

/// Minimum number of rows for a block of lines to count as a table.
const MIN_ROWS: usize = 2;

/// Split one line into cells, or `None` if it does not look tabular.
pub fn split_cells(line: &str) -> Option<Vec<String>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let cells: Vec<String> = if line.contains('|') {
        line.trim_matches('|')
            .split('|')
            .map(|c| c.trim().to_string())
            .collect()
    } else if line.contains('\t') {
        line.split('\t').map(|c| c.trim().to_string()).collect()
    } else {
        split_on_wide_gaps(line)
    };

    if cells.iter().filter(|c| !c.is_empty()).count() >= 2 {
        Some(cells)
    } else {
        None
    }
}

fn split_on_wide_gaps(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut spaces = 0;

    for c in line.chars() {
        if c == ' ' {
            spaces += 1;
            continue;
        }
        if spaces >= 2 && !current.is_empty() {
            cells.push(std::mem::take(&mut current));
        } else if spaces == 1 && !current.is_empty() {
            current.push(' ');
        }
        spaces = 0;
        current.push(c);
    }
    if !current.is_empty() {
        cells.push(current);
    }
    cells
}

/// Recover tables from a text block.
pub fn detect_tables(text: &str) -> Vec<TableGrid> {
    let mut tables = Vec::new();
    let mut current: TableGrid = Vec::new();

    for line in text.lines() {
        match split_cells(line) {
            Some(cells) => current.push(cells),
            None => {
                if current.len() >= MIN_ROWS {
                    tables.push(std::mem::take(&mut current));
                } else {
                    current.clear();
                }
            }
        }
    }
    if current.len() >= MIN_ROWS {
        tables.push(current);
    }

    tables
}

/// Recover tables from every text block, in block order.
pub fn detect_tables_in_blocks(blocks: &[String]) -> Vec<TableGrid> {
    blocks.iter().flat_map(|b| detect_tables(b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_split_pipe_line() {
        assert_eq!(
            split_cells("| Voce | Importo € |"),
            Some(vec!["Voce".to_string(), "Importo €".to_string()])
        );
    }

    #[test]
    fn test_split_wide_gaps_keeps_single_spaces() {
        assert_eq!(
            split_cells("Spesa materia gas     45,30"),
            Some(vec!["Spesa materia gas".to_string(), "45,30".to_string()])
        );
        assert_eq!(split_cells("Totale da pagare 99,62"), None);
    }

    #[test]
    fn test_detect_tables_groups_consecutive_lines() {
        let text = "ENEL ENERGIA\n\
                    Voce\tImporto\n\
                    Materia gas\t45,30\n\
                    Trasporto\t20,10\n\
                    \n\
                    Grazie\n\
                    Lettura  1234\n";

        let tables = detect_tables(text);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].len(), 3);
        assert_eq!(tables[0][2], vec!["Trasporto".to_string(), "20,10".to_string()]);
    }
}

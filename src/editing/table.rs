use crate::metadata::{
    TableBorderFormat, TableMetadataFormat, table_cell_metadata, update_table_cell_metadata,
    update_table_metadata,
};
use crate::model::{BlockGroup, Paragraph, Segment, SegmentFormat, Table, TableCellFormat};

pub const DEFAULT_COLUMN_WIDTH: f64 = 120.0;
pub const MIN_ROW_HEIGHT: f64 = 22.0;

/// Brings a table into the shape the rest of the editor expects: collapsed
/// borders, rectangular rows, no spans on the first row or column, a width
/// per column and at least one block per cell.
pub fn normalize_table(table: &mut Table, default_format: Option<&SegmentFormat>) {
    table.format.border_collapse = Some(true);
    table.format.use_border_box = Some(true);

    let columns = table.column_count();
    for (row_index, row) in table.rows.iter_mut().enumerate() {
        while row.cells.len() < columns {
            let format = row
                .cells
                .last()
                .and_then(BlockGroup::as_table_cell)
                .map(|props| props.format.clone())
                .unwrap_or_default();
            row.cells.push(BlockGroup::table_cell(false, false, false, format));
        }

        for (col_index, cell) in row.cells.iter_mut().enumerate() {
            if cell.blocks.is_empty() {
                let mut paragraph = Paragraph::implicit().with_segment(Segment::br());
                paragraph.segment_format = default_format.filter(|format| !format.is_empty()).cloned();
                cell.blocks.push(paragraph.into());
            }
            if let Some(props) = cell.as_table_cell_mut() {
                if row_index == 0 {
                    props.span_above = false;
                }
                if col_index == 0 {
                    props.span_left = false;
                }
                props.format.use_border_box = Some(true);
            }
        }

        if row.height <= 0.0 {
            row.height = MIN_ROW_HEIGHT;
        }
    }

    table.widths.truncate(columns);
    while table.widths.len() < columns {
        table.widths.push(DEFAULT_COLUMN_WIDTH);
    }
}

/// Re-derives borders, banding and header cells from the table metadata
/// merged with `new_format`, and stores the result as the new metadata.
///
/// Cells whose background was set by hand keep it when `keep_cell_shade` is
/// set; otherwise their override flag is cleared first.
pub fn apply_table_format(table: &mut Table, new_format: Option<&TableMetadataFormat>, keep_cell_shade: bool) {
    let mut effective = None;
    update_table_metadata(table, |current| {
        let format = new_format.cloned().or(current).unwrap_or_default();
        effective = Some(format.clone());
        Some(format)
    });
    let Some(format) = effective else {
        return;
    };

    if !keep_cell_shade {
        for row in &mut table.rows {
            for cell in &mut row.cells {
                update_table_cell_metadata(cell, |current| {
                    current.map(|mut metadata| {
                        metadata.bg_color_override = false;
                        metadata
                    })
                });
            }
        }
    }

    let row_count = table.rows.len();
    for (row_index, row) in table.rows.iter_mut().enumerate() {
        let col_count = row.cells.len();
        for (col_index, cell) in row.cells.iter_mut().enumerate() {
            let overrides = table_cell_metadata(cell).unwrap_or_default();
            let is_header = (format.has_header_row && row_index == 0)
                || (format.has_first_column && col_index == 0);
            let Some(props) = cell.as_table_cell_mut() else {
                continue;
            };
            props.is_header = is_header;

            if !overrides.border_override {
                set_borders(&mut props.format, &format, (row_index, col_index), (row_count, col_count));
            }
            if !overrides.bg_color_override {
                props.format.background_color = background_for(&format, row_index, col_index);
            }
            if !overrides.v_align_override && format.vertical_align.is_some() {
                props.format.vertical_align = format.vertical_align.clone();
            }
        }
    }
}

fn background_for(format: &TableMetadataFormat, row_index: usize, col_index: usize) -> Option<String> {
    if format.has_header_row && row_index == 0 {
        return format.header_row_color.clone();
    }
    if format.has_first_column && col_index == 0 {
        return None;
    }
    let odd = (format.has_banded_rows && row_index % 2 != 0) || (format.has_banded_columns && col_index % 2 != 0);
    if odd {
        format.bg_color_odd.clone()
    } else {
        format.bg_color_even.clone()
    }
}

fn border(color: &Option<String>) -> Option<String> {
    color.as_ref().map(|color| format!("1px solid {color}"))
}

fn set_borders(
    cell: &mut TableCellFormat,
    format: &TableMetadataFormat,
    (row, col): (usize, usize),
    (rows, cols): (usize, usize),
) {
    let is_first_row = row == 0;
    let is_last_row = row + 1 == rows;
    let is_first_col = col == 0;
    let is_last_col = col + 1 == cols;

    cell.border_top = border(&format.top_border_color);
    cell.border_bottom = border(&format.bottom_border_color);
    cell.border_left = border(&format.vertical_border_color);
    cell.border_right = border(&format.vertical_border_color);

    match format.table_border_format {
        TableBorderFormat::Default => {}
        TableBorderFormat::ListWithSideBorders => {
            if !is_first_col {
                cell.border_left = None;
            }
            if !is_last_col {
                cell.border_right = None;
            }
            if !is_first_row && !is_last_row {
                cell.border_top = None;
                cell.border_bottom = None;
            }
        }
        TableBorderFormat::NoHeaderBorders => {
            if is_first_row {
                cell.border_top = None;
                cell.border_left = None;
                cell.border_right = None;
            }
        }
        TableBorderFormat::NoSideBorders => {
            if is_first_col {
                cell.border_left = None;
            }
            if is_last_col {
                cell.border_right = None;
            }
        }
        TableBorderFormat::FirstColumnHeaderExternal => {
            if is_first_row && is_first_col {
                cell.border_top = None;
                cell.border_left = None;
            }
            if !is_first_col && !is_first_row {
                cell.border_left = None;
            }
        }
        TableBorderFormat::Clear => {
            cell.border_top = None;
            cell.border_bottom = None;
            cell.border_left = None;
            cell.border_right = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{TableCellMetadataFormat, table_metadata};

    #[test]
    fn normalize_makes_rows_rectangular() {
        let mut table = Table::with_size(2, 2);
        table.rows[1].cells.pop();
        if let Some(props) = table.rows[0].cells[1].as_table_cell_mut() {
            props.span_above = true;
        }

        normalize_table(&mut table, None);

        assert!(table.rows.iter().all(|row| row.cells.len() == 2));
        assert_eq!(table.widths, vec![DEFAULT_COLUMN_WIDTH; 2]);
        assert_eq!(table.format.border_collapse, Some(true));
        assert!(table.rows[0].cells[1].as_table_cell().is_some_and(|props| !props.span_above));
        assert!(table.rows.iter().flat_map(|row| &row.cells).all(|cell| cell.blocks.len() == 1));
    }

    #[test]
    fn apply_format_bands_rows_and_marks_header() {
        let mut table = Table::with_size(3, 2);
        let format = TableMetadataFormat {
            has_header_row: true,
            has_banded_rows: true,
            bg_color_even: Some("white".to_string()),
            bg_color_odd: Some("gray".to_string()),
            header_row_color: Some("blue".to_string()),
            ..TableMetadataFormat::default()
        };

        apply_table_format(&mut table, Some(&format), false);

        let background = |row: usize| {
            table.rows[row].cells[0]
                .as_table_cell()
                .and_then(|props| props.format.background_color.clone())
        };
        assert_eq!(background(0).as_deref(), Some("blue"));
        assert_eq!(background(1).as_deref(), Some("gray"));
        assert_eq!(background(2).as_deref(), Some("white"));
        assert!(table.rows[0].cells[1].as_table_cell().is_some_and(|props| props.is_header));
        assert_eq!(table_metadata(&table), Some(format));
    }

    #[test]
    fn keep_cell_shade_respects_overrides() {
        let mut table = Table::with_size(2, 1);
        if let Some(cell) = table.cell_mut(1, 0) {
            if let Some(props) = cell.as_table_cell_mut() {
                props.format.background_color = Some("pink".to_string());
            }
            update_table_cell_metadata(cell, |_| {
                Some(TableCellMetadataFormat {
                    bg_color_override: true,
                    ..TableCellMetadataFormat::default()
                })
            });
        }

        apply_table_format(&mut table, None, true);
        let shade = |table: &Table| {
            table.rows[1].cells[0]
                .as_table_cell()
                .and_then(|props| props.format.background_color.clone())
        };
        assert_eq!(shade(&table).as_deref(), Some("pink"));

        apply_table_format(&mut table, None, false);
        assert_eq!(shade(&table), None);
    }

    #[test]
    fn no_side_borders_drops_outer_vertical_borders() {
        let mut table = Table::with_size(1, 3);
        let format = TableMetadataFormat {
            table_border_format: TableBorderFormat::NoSideBorders,
            ..TableMetadataFormat::default()
        };

        apply_table_format(&mut table, Some(&format), true);

        let props = |col: usize| table.rows[0].cells[col].as_table_cell().cloned().unwrap_or_default();
        assert_eq!(props(0).format.border_left, None);
        assert!(props(1).format.border_left.is_some());
        assert_eq!(props(2).format.border_right, None);
        assert_eq!(props(1).format.border_top.as_deref(), Some("1px solid #ABABAB"));
    }
}

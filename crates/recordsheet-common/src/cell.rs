//! Table snapshot model.
//!
//! A [`Table`] is the in-memory copy of one sheet region as handed over by the
//! table source: a rectangular grid of [`Cell`]s with a fixed width. The first
//! two rows are header rows (kind declarations and field names), everything
//! below is data. Upload mutates the copy in place and the host writes the
//! whole grid back; per-cell `modified` flags let a host narrow that write to
//! what actually changed.

/// A single table position holding raw text.
///
/// A cell is *empty* when it holds no text at all or only whitespace. The
/// `modified` flag records whether this run wrote the cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cell {
    raw: Option<String>,
    modified: bool,
}

impl Cell {
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            raw: Some(raw.into()),
            modified: false,
        }
    }

    /// A cell carrying freshly produced text (or a deliberate blank), already
    /// marked as written by this run.
    pub fn written(raw: Option<String>) -> Self {
        Self {
            raw,
            modified: true,
        }
    }

    /// Empty ⇔ no raw text, or raw text that is blank after trimming.
    pub fn is_empty(&self) -> bool {
        match &self.raw {
            None => true,
            Some(s) => s.trim().is_empty(),
        }
    }

    /// The cell text, with absence rendered as the empty string.
    pub fn text(&self) -> &str {
        self.raw.as_deref().unwrap_or("")
    }

    pub fn raw(&self) -> Option<&str> {
        self.raw.as_deref()
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Replace the cell text, marking the cell modified only when the visible
    /// text actually changes.
    pub fn write(&mut self, raw: Option<String>) {
        if self.text() != raw.as_deref().unwrap_or("") {
            self.raw = raw;
            self.modified = true;
        }
    }
}

/// Fixed-width grid of cells for one sheet region.
#[derive(Debug, Clone, Default)]
pub struct Table {
    width: usize,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Build a table from the ragged text rows a table source produces.
    ///
    /// The grid width is taken from the second row (the field-name header);
    /// shorter rows are padded with empty cells and longer rows truncated, so
    /// every row ends up exactly `width` cells long.
    pub fn from_text_rows(rows: Vec<Vec<String>>) -> Self {
        let width = rows.get(1).map(Vec::len).unwrap_or_default();
        let rows = rows
            .into_iter()
            .map(|row| {
                let mut cells: Vec<Cell> = row.into_iter().take(width).map(Cell::new).collect();
                cells.resize(width, Cell::default());
                cells
            })
            .collect();
        Self { width, rows }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut [Vec<Cell>] {
        &mut self.rows
    }

    /// Append a row. The row is padded or truncated to the table width.
    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.truncate(self.width);
        row.resize(self.width, Cell::default());
        self.rows.push(row);
    }

    /// Flatten back into plain text rows for the table sink.
    pub fn to_text_rows(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| row.iter().map(|c| c.text().to_string()).collect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emptiness_tracks_blank_text() {
        assert!(Cell::default().is_empty());
        assert!(Cell::new("   ").is_empty());
        assert!(!Cell::new("x").is_empty());
    }

    #[test]
    fn write_marks_modified_only_on_change() {
        let mut cell = Cell::new("3");
        cell.write(Some("3".into()));
        assert!(!cell.is_modified());
        cell.write(Some("4".into()));
        assert!(cell.is_modified());

        let mut blank = Cell::default();
        blank.write(None);
        assert!(!blank.is_modified());
    }

    #[test]
    fn width_comes_from_second_row() {
        let table = Table::from_text_rows(vec![
            vec!["Card".into()],
            vec!["Name".into(), "Cost".into(), "Flags".into()],
            vec!["Slash".into(), "1".into(), "Common".into(), "spill".into()],
        ]);
        assert_eq!(table.width(), 3);
        for row in table.rows() {
            assert_eq!(row.len(), 3);
        }
        assert!(table.rows()[0][2].is_empty());
        assert_eq!(table.rows()[2][2].text(), "Common");
    }
}

use std::fmt;

use super::{Bar, Canvas};

const EMPTY: char = ' ';
const FILLED: char = '#';

/// Character grid canvas, one cell per canvas unit.
#[derive(Debug, Clone)]
pub struct TextCanvas {
    columns: usize,
    rows: usize,
    cells: Vec<char>,
}

impl TextCanvas {
    pub fn new(columns: usize, rows: usize) -> Self {
        Self {
            columns,
            rows,
            cells: vec![EMPTY; columns * rows],
        }
    }

    pub fn row(&self, index: usize) -> Option<String> {
        (index < self.rows).then(|| {
            self.cells[index * self.columns..(index + 1) * self.columns]
                .iter()
                .collect()
        })
    }

    /// Filled cells in column `column`.
    pub fn column_height(&self, column: usize) -> usize {
        if column >= self.columns {
            return 0;
        }
        (0..self.rows)
            .filter(|row| self.cells[row * self.columns + column] == FILLED)
            .count()
    }
}

impl Canvas for TextCanvas {
    fn size(&self) -> (f32, f32) {
        (self.columns as f32, self.rows as f32)
    }

    fn clear(&mut self) {
        self.cells.fill(EMPTY);
    }

    fn fill_bar(&mut self, bar: &Bar) {
        let first_column = bar.x.floor().max(0.0) as usize;
        let last_column = ((bar.x + bar.width).ceil() as usize).min(self.columns);
        let top_row = (bar.y.round().max(0.0) as usize).min(self.rows);

        for row in top_row..self.rows {
            for column in first_column..last_column {
                self.cells[row * self.columns + column] = FILLED;
            }
        }
    }
}

impl fmt::Display for TextCanvas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..self.rows {
            let line: String = self.cells[row * self.columns..(row + 1) * self.columns]
                .iter()
                .collect();
            writeln!(f, "{}", line.trim_end())?;
        }
        Ok(())
    }
}

// Copyright (c) 2025 ADBC Drivers Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Row/column matrix that chunk parsers populate.
//!
//! A [`ResultMatrix`] is allocated by the caller with the column count from
//! the result manifest. Parsers fill it through a [`MatrixWriter`], which
//! stages rows in a growable buffer and only replaces the matrix contents on
//! [`MatrixWriter::finish`]. A writer that is dropped early (parse error or
//! cancellation) leaves the matrix untouched.

use crate::error::{ChunkErrorHelper, Result};

/// One entry of a result row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Cell {
    /// Explicit absence (JSON `null`), also the state of unset cells.
    #[default]
    Null,
    /// Scalar value carried as its literal text.
    Value(String),
}

impl Cell {
    /// Null-safe text projection: `None` for null, the text otherwise.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Null => None,
            Cell::Value(s) => Some(s),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Value(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Value(value)
    }
}

/// Dense, row-major matrix of [`Cell`]s with bounds-checked access.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultMatrix {
    rows: usize,
    cols: usize,
    cells: Vec<Cell>,
}

impl ResultMatrix {
    /// Allocate a `rows` x `cols` matrix with every cell null.
    ///
    /// # Panics
    ///
    /// Panics if `rows * cols` overflows `usize`. Use [`try_allocate`] for
    /// sizes taken from untrusted input.
    ///
    /// [`try_allocate`]: ResultMatrix::try_allocate
    pub fn allocate(rows: usize, cols: usize) -> Self {
        match Self::try_allocate(rows, cols) {
            Ok(matrix) => matrix,
            Err(e) => panic!("{}", e),
        }
    }

    /// Allocate a `rows` x `cols` matrix, failing with `OutOfRange` if the
    /// cell count overflows `usize`.
    pub fn try_allocate(rows: usize, cols: usize) -> Result<Self> {
        let len = rows.checked_mul(cols).ok_or_else(|| {
            ChunkErrorHelper::out_of_range()
                .message(format!("A {}x{} matrix is too large", rows, cols))
        })?;
        Ok(Self {
            rows,
            cols,
            cells: vec![Cell::Null; len],
        })
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn col_count(&self) -> usize {
        self.cols
    }

    fn offset(&self, row: usize, col: usize) -> Result<usize> {
        if row >= self.rows || col >= self.cols {
            return Err(ChunkErrorHelper::out_of_range().message(format!(
                "Cell ({}, {}) is outside a {}x{} matrix",
                row, col, self.rows, self.cols
            )));
        }
        Ok(row * self.cols + col)
    }

    /// Get the cell at (`row`, `col`).
    pub fn get(&self, row: usize, col: usize) -> Result<&Cell> {
        let offset = self.offset(row, col)?;
        Ok(&self.cells[offset])
    }

    /// Overwrite the cell at (`row`, `col`).
    pub fn set(&mut self, row: usize, col: usize, value: impl Into<Cell>) -> Result<()> {
        let offset = self.offset(row, col)?;
        self.cells[offset] = value.into();
        Ok(())
    }

    /// All cells of one row, left to right.
    pub fn row(&self, row: usize) -> Result<&[Cell]> {
        if row >= self.rows {
            return Err(ChunkErrorHelper::out_of_range().message(format!(
                "Row {} is outside a matrix with {} rows",
                row, self.rows
            )));
        }
        let start = row * self.cols;
        Ok(&self.cells[start..start + self.cols])
    }

    /// Iterate rows in order.
    ///
    /// A matrix with rows but zero columns still yields one empty slice per row.
    pub fn rows(&self) -> impl ExactSizeIterator<Item = &[Cell]> + '_ {
        (0..self.rows).map(move |r| &self.cells[r * self.cols..(r + 1) * self.cols])
    }

    /// Start populating this matrix from a chunk.
    ///
    /// The matrix keeps its current contents until the returned writer is
    /// finished.
    pub fn writer(&mut self) -> MatrixWriter<'_> {
        MatrixWriter::new(self)
    }
}

/// Staged, row-at-a-time writer into a [`ResultMatrix`].
///
/// Rows are appended to a private buffer whose width is fixed to the
/// matrix's column count. Pushing more cells than that into one row fails
/// with a shape violation. Shorter rows are padded with nulls.
pub struct MatrixWriter<'a> {
    matrix: &'a mut ResultMatrix,
    width: usize,
    staged: Vec<Cell>,
    rows: usize,
    /// Cells pushed into the open row, `None` when no row is open.
    open_row: Option<usize>,
    /// Longest row seen so far.
    max_row_len: usize,
}

impl<'a> MatrixWriter<'a> {
    fn new(matrix: &'a mut ResultMatrix) -> Self {
        let width = matrix.cols;
        Self {
            matrix,
            width,
            staged: Vec::new(),
            rows: 0,
            open_row: None,
            max_row_len: 0,
        }
    }

    /// Number of completed rows so far.
    pub fn rows_written(&self) -> usize {
        self.rows
    }

    /// Reserve space for `additional` more rows.
    pub fn reserve_rows(&mut self, additional: usize) {
        self.staged.reserve(additional.saturating_mul(self.width));
    }

    pub fn begin_row(&mut self) -> Result<()> {
        if self.open_row.is_some() {
            return Err(ChunkErrorHelper::invalid_state()
                .message(format!("Row {} is still open", self.rows)));
        }
        self.open_row = Some(0);
        Ok(())
    }

    pub fn push_cell(&mut self, cell: Cell) -> Result<()> {
        let Some(len) = self.open_row.as_mut() else {
            return Err(ChunkErrorHelper::invalid_state().message("No row is open"));
        };
        if *len >= self.width {
            return Err(ChunkErrorHelper::shape_violation().message(format!(
                "Row {} has more than {} columns",
                self.rows, self.width
            )));
        }
        *len += 1;
        self.staged.push(cell);
        Ok(())
    }

    pub fn end_row(&mut self) -> Result<()> {
        let Some(len) = self.open_row.take() else {
            return Err(ChunkErrorHelper::invalid_state().message("No row is open"));
        };
        self.staged
            .extend(std::iter::repeat(Cell::Null).take(self.width - len));
        self.max_row_len = self.max_row_len.max(len);
        self.rows += 1;
        Ok(())
    }

    /// Append a complete row.
    pub fn push_row<I>(&mut self, cells: I) -> Result<()>
    where
        I: IntoIterator<Item = Cell>,
    {
        self.begin_row()?;
        for cell in cells {
            self.push_cell(cell)?;
        }
        self.end_row()
    }

    /// Commit the staged rows into the matrix.
    ///
    /// The matrix ends up with one row per staged row. Its column count stays
    /// at the declared width unless rows were written and all of them were
    /// empty, in which case it becomes zero.
    pub fn finish(self) -> Result<()> {
        if self.open_row.is_some() {
            return Err(ChunkErrorHelper::invalid_state()
                .message(format!("Row {} was never closed", self.rows)));
        }

        let (cols, cells) = if self.rows > 0 && self.max_row_len == 0 {
            (0, Vec::new())
        } else {
            (self.width, self.staged)
        };

        self.matrix.rows = self.rows;
        self.matrix.cols = cols;
        self.matrix.cells = cells;
        Ok(())
    }
}

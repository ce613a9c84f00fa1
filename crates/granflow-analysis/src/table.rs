//! Two-key tables that can be re-pivoted between row and column orientation.

use std::collections::BTreeMap;

use granflow_core::Accel;
use serde::{Deserialize, Serialize};

/// Address of one cell: the outer (row) key and the inner (column) key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Cell<R, C> {
    /// Outer key.
    pub row: R,
    /// Inner key.
    pub col: C,
}

/// Sparse table keyed by [`Cell`], iterated row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    bound(
        serialize = "R: Serialize + Clone, C: Serialize + Clone, V: Serialize + Clone",
        deserialize = "R: Deserialize<'de> + Ord, C: Deserialize<'de> + Ord, V: Deserialize<'de>"
    ),
    into = "Vec<TableEntry<R, C, V>>",
    from = "Vec<TableEntry<R, C, V>>"
)]
pub struct PivotTable<R, C, V> {
    cells: BTreeMap<Cell<R, C>, V>,
}

/// Flattened table entry used for serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableEntry<R, C, V> {
    /// Outer key.
    pub row: R,
    /// Inner key.
    pub col: C,
    /// Cell value.
    pub value: V,
}

impl<R: Ord, C: Ord, V> From<Vec<TableEntry<R, C, V>>> for PivotTable<R, C, V> {
    fn from(entries: Vec<TableEntry<R, C, V>>) -> Self {
        entries
            .into_iter()
            .map(|entry| (entry.row, entry.col, entry.value))
            .collect()
    }
}

impl<R, C, V> From<PivotTable<R, C, V>> for Vec<TableEntry<R, C, V>> {
    fn from(table: PivotTable<R, C, V>) -> Self {
        table
            .cells
            .into_iter()
            .map(|(cell, value)| TableEntry {
                row: cell.row,
                col: cell.col,
                value,
            })
            .collect()
    }
}

impl<R: Ord, C: Ord, V> Default for PivotTable<R, C, V> {
    fn default() -> Self {
        Self {
            cells: BTreeMap::new(),
        }
    }
}

impl<R: Ord, C: Ord, V> FromIterator<(R, C, V)> for PivotTable<R, C, V> {
    fn from_iter<I: IntoIterator<Item = (R, C, V)>>(iter: I) -> Self {
        Self {
            cells: iter
                .into_iter()
                .map(|(row, col, value)| (Cell { row, col }, value))
                .collect(),
        }
    }
}

impl<R: Ord + Copy, C: Ord + Copy, V> PivotTable<R, C, V> {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the value of a cell, returning the previous one.
    pub fn insert(&mut self, row: R, col: C, value: V) -> Option<V> {
        self.cells.insert(Cell { row, col }, value)
    }

    /// Value of a cell.
    pub fn get(&self, row: R, col: C) -> Option<&V> {
        self.cells.get(&Cell { row, col })
    }

    /// Mutable access to a cell, inserting `V::default()` when absent.
    pub fn entry_or_default(&mut self, row: R, col: C) -> &mut V
    where
        V: Default,
    {
        self.cells.entry(Cell { row, col }).or_default()
    }

    /// Number of populated cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether no cell is populated.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cells in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (R, C, &V)> + '_ {
        self.cells
            .iter()
            .map(|(cell, value)| (cell.row, cell.col, value))
    }

    /// Distinct row keys, ascending.
    pub fn rows(&self) -> Vec<R> {
        let mut rows: Vec<R> = self.cells.keys().map(|cell| cell.row).collect();
        rows.dedup();
        rows
    }

    /// Distinct column keys, ascending.
    pub fn cols(&self) -> Vec<C> {
        let mut cols: Vec<C> = self.cells.keys().map(|cell| cell.col).collect();
        cols.sort();
        cols.dedup();
        cols
    }

    /// Cells of one row, ordered by column.
    pub fn row(&self, row: R) -> impl Iterator<Item = (C, &V)> + '_ {
        self.cells
            .iter()
            .filter(move |(cell, _)| cell.row == row)
            .map(|(cell, value)| (cell.col, value))
    }

    /// Applies `f` to every cell, keeping the keys.
    pub fn map<W>(&self, mut f: impl FnMut(&V) -> W) -> PivotTable<R, C, W> {
        PivotTable {
            cells: self
                .cells
                .iter()
                .map(|(cell, value)| (*cell, f(value)))
                .collect(),
        }
    }

    /// Keeps only the given rows.
    pub fn select_rows(&self, rows: &[R]) -> Self
    where
        V: Clone,
    {
        PivotTable {
            cells: self
                .cells
                .iter()
                .filter(|(cell, _)| rows.contains(&cell.row))
                .map(|(cell, value)| (*cell, value.clone()))
                .collect(),
        }
    }
}

impl<R: Ord + Copy, C: Ord + Copy, V: Clone> PivotTable<R, C, V> {
    /// Swaps the row and column keys of every cell.
    pub fn pivot(&self) -> PivotTable<C, R, V> {
        PivotTable {
            cells: self
                .cells
                .iter()
                .map(|(cell, value)| {
                    (
                        Cell {
                            row: cell.col,
                            col: cell.row,
                        },
                        value.clone(),
                    )
                })
                .collect(),
        }
    }
}

/// Flow-rate samples keyed obstacle count → acceleration, one per usable trial.
pub type FlowRateTable = PivotTable<u32, Accel, Vec<f64>>;

/// Scalar statistic keyed obstacle count → acceleration.
pub type StatTable = PivotTable<u32, Accel, f64>;

/// Scalar statistic keyed acceleration → obstacle count.
pub type PivotedStatTable = PivotTable<Accel, u32, f64>;

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> StatTable {
        [
            (80, Accel(0.5), 1.0),
            (80, Accel(2.0), 2.0),
            (100, Accel(0.5), 0.5),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn pivot_transposes_keys() {
        let pivoted = sample().pivot();
        assert_eq!(pivoted.rows(), vec![Accel(0.5), Accel(2.0)]);
        assert_eq!(pivoted.get(Accel(0.5), 100), Some(&0.5));
        assert_eq!(pivoted.get(Accel(2.0), 100), None);
    }

    #[test]
    fn rows_and_cols_are_sorted_and_distinct() {
        let table = sample();
        assert_eq!(table.rows(), vec![80, 100]);
        assert_eq!(table.cols(), vec![Accel(0.5), Accel(2.0)]);
        let row: Vec<_> = table.row(80).map(|(col, v)| (col, *v)).collect();
        assert_eq!(row, vec![(Accel(0.5), 1.0), (Accel(2.0), 2.0)]);
    }

    #[test]
    fn select_rows_keeps_full_rows() {
        let subset = sample().select_rows(&[100]);
        assert_eq!(subset.len(), 1);
        assert_eq!(subset.get(100, Accel(0.5)), Some(&0.5));
    }

    #[test]
    fn serializes_as_entry_list() {
        let json = serde_json::to_value(sample()).expect("json");
        assert_eq!(json.as_array().map(Vec::len), Some(3));
        assert_eq!(json[0]["row"], 80);
        let back: StatTable = serde_json::from_value(json).expect("decode");
        assert_eq!(back, sample());
    }
}

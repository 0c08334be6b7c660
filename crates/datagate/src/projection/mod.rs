//! Column projection between model properties and external tabular
//! columns.
//!
//! A [`ColumnVector`] maps an external column order onto model property
//! positions. It is derived once per open cursor or statement from the
//! external column name list; readers and writers then move typed fields
//! through it without any further name lookups.

pub mod reader;
pub mod writer;

pub use self::reader::{CursorReader, RowCursor};
pub use self::writer::{ParamStatement, StatementWriter};

use crate::core::schema::ModelSchema;
use crate::error::{GateError, Result};

/// Ordered mapping: external column position to model property position.
///
/// An unmapped entry means the column carries no model property; readers
/// and writers skip it. [`ColumnVector::build`] never produces unmapped
/// entries (unknown names fail instead), so they only arise from vectors
/// assembled by other means.
#[derive(Debug, Clone)]
pub struct ColumnVector {
    entries: Vec<Option<usize>>,
}

impl ColumnVector {
    /// Derive a vector from an external column name list.
    ///
    /// Each name is resolved against the model's fixed property table.
    /// An unknown or repeated column name fails with
    /// [`GateError::ColumnMapping`] naming the column; each property maps
    /// to at most one column.
    pub fn build<S: AsRef<str>>(schema: &ModelSchema, column_names: &[S]) -> Result<ColumnVector> {
        let mut entries = Vec::with_capacity(column_names.len());
        let mut used = vec![false; schema.len()];

        for name in column_names {
            let name = name.as_ref();
            let position = schema.position_of(name).ok_or_else(|| {
                GateError::column(
                    name,
                    format!("unknown column for model '{}'", schema.model()),
                )
            })?;
            if used[position] {
                return Err(GateError::column(
                    name,
                    format!(
                        "column repeats property '{}' of model '{}'",
                        schema.property(position).name,
                        schema.model()
                    ),
                ));
            }
            used[position] = true;
            entries.push(Some(position));
        }

        Ok(ColumnVector { entries })
    }

    /// Number of external columns covered by this vector.
    pub fn width(&self) -> usize {
        self.entries.len()
    }

    /// The property position mapped to an external column, if any.
    pub fn property_at(&self, column: usize) -> Option<usize> {
        self.entries.get(column).copied().flatten()
    }

    /// Iterate `(column position, property position)` over mapped
    /// entries.
    pub fn mapped(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(column, prop)| prop.map(|p| (column, p)))
    }
}

//! Cursor-side projection: reading external rows into models.

use std::marker::PhantomData;

use async_trait::async_trait;

use crate::core::schema::DataModel;
use crate::core::value::FieldValue;
use crate::error::{GateError, Result};
use crate::projection::ColumnVector;

/// A positional cursor over external tabular data.
///
/// `advance` moves to the next row and reports whether one exists;
/// `value_at` reads a typed field of the current row. An external NULL
/// arrives as `FieldValue::Null(_)` with whatever type marker the
/// resource uses; the reader translates it into the model's own typed
/// null.
#[async_trait]
pub trait RowCursor: Send {
    async fn advance(&mut self) -> Result<bool>;

    fn value_at(&self, column: usize) -> Result<FieldValue>;
}

/// Reads models off a cursor through a column vector.
///
/// Owned exclusively by the call site that created it; the underlying
/// cursor is finite and not restartable.
pub struct CursorReader<T, C> {
    cursor: C,
    vector: ColumnVector,
    _model: PhantomData<fn() -> T>,
}

impl<T: DataModel, C: RowCursor> CursorReader<T, C> {
    pub fn new(cursor: C, vector: ColumnVector) -> Self {
        Self {
            cursor,
            vector,
            _model: PhantomData,
        }
    }

    /// The next model, or `None` once the cursor is exhausted.
    ///
    /// Every mapped column is read as its declared property type; an
    /// external null becomes the model's typed null. A value whose type
    /// contradicts the schema is a column-mapping failure naming the
    /// column.
    pub async fn next(&mut self) -> Result<Option<T>> {
        if !self.cursor.advance().await? {
            return Ok(None);
        }

        let schema = T::schema();
        let mut model = T::default();
        for (column, position) in self.vector.mapped() {
            let property = schema.property(position);
            let value = match self.cursor.value_at(column)? {
                FieldValue::Null(_) => FieldValue::Null(property.field_type),
                value if value.field_type() == property.field_type => value,
                value => {
                    return Err(GateError::column(
                        property.name.clone(),
                        format!(
                            "cursor produced {} where model '{}' declares {}",
                            value.field_type(),
                            schema.model(),
                            property.field_type
                        ),
                    ))
                }
            };
            model.set(position, value)?;
        }
        Ok(Some(model))
    }

    /// Release the reader, returning the cursor to the caller.
    pub fn into_cursor(self) -> C {
        self.cursor
    }
}


#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::testing::VecCursor;
    use super::*;
    use crate::core::value::FieldType;
    use crate::process::testing::Record;

    #[tokio::test]
    async fn test_reads_rows_until_exhausted() {
        let rows = vec![
            vec![FieldValue::I64(1), FieldValue::Text("one".into())],
            vec![FieldValue::I64(2), FieldValue::Text("two".into())],
        ];
        let vector = ColumnVector::build(Record::schema(), &["ID", "LABEL"]).unwrap();
        let mut reader = CursorReader::<Record, _>::new(VecCursor::new(rows), vector);

        let first = reader.next().await.unwrap().unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(first.label.as_deref(), Some("one"));

        let second = reader.next().await.unwrap().unwrap();
        assert_eq!(second.id, 2);

        assert!(reader.next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reordered_columns() {
        let rows = vec![vec![
            FieldValue::Text("flipped".into()),
            FieldValue::I64(9),
        ]];
        let vector = ColumnVector::build(Record::schema(), &["LABEL", "ID"]).unwrap();
        let mut reader = CursorReader::<Record, _>::new(VecCursor::new(rows), vector);

        let record = reader.next().await.unwrap().unwrap();
        assert_eq!(record.id, 9);
        assert_eq!(record.label.as_deref(), Some("flipped"));
    }

    #[tokio::test]
    async fn test_external_null_becomes_model_null() {
        // the cursor's null marker carries a foreign type; the model
        // receives its own declared type
        let rows = vec![vec![
            FieldValue::I64(5),
            FieldValue::Null(FieldType::Bytes),
            FieldValue::Null(FieldType::Bytes),
        ]];
        let vector = ColumnVector::build(Record::schema(), &["ID", "LABEL", "AMOUNT"]).unwrap();
        let mut reader = CursorReader::<Record, _>::new(VecCursor::new(rows), vector);

        let record = reader.next().await.unwrap().unwrap();
        assert_eq!(record.id, 5);
        assert_eq!(record.label, None);
        assert_eq!(record.amount, None);
    }

    #[tokio::test]
    async fn test_type_mismatch_names_column() {
        let rows = vec![vec![FieldValue::Text("not a number".into())]];
        let vector = ColumnVector::build(Record::schema(), &["ID"]).unwrap();
        let mut reader = CursorReader::<Record, _>::new(VecCursor::new(rows), vector);

        let err = reader.next().await.unwrap_err();
        match err {
            GateError::ColumnMapping { column, .. } => assert_eq!(column, "ID"),
            other => panic!("expected ColumnMapping, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unprojected_properties_keep_defaults() {
        let rows = vec![vec![FieldValue::Decimal(Decimal::new(1234, 2))]];
        let vector = ColumnVector::build(Record::schema(), &["AMOUNT"]).unwrap();
        let mut reader = CursorReader::<Record, _>::new(VecCursor::new(rows), vector);

        let record = reader.next().await.unwrap().unwrap();
        assert_eq!(record.id, 0);
        assert_eq!(record.label, None);
        assert_eq!(record.amount, Some(Decimal::new(1234, 2)));
    }
}

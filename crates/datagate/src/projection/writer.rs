//! Statement-side projection: binding model properties into a prepared
//! statement before the caller executes it.

use std::marker::PhantomData;

use crate::core::schema::DataModel;
use crate::core::value::{FieldType, FieldValue};
use crate::error::Result;
use crate::projection::ColumnVector;

/// A parameterized statement accepting positional binds.
///
/// Parameter positions follow the column vector's external column order.
/// NULLs are bound explicitly with the declared parameter type, the way
/// relational drivers require.
pub trait ParamStatement: Send {
    fn bind(&mut self, index: usize, value: &FieldValue) -> Result<()>;

    fn bind_null(&mut self, index: usize, field_type: FieldType) -> Result<()>;
}

/// Binds models into a statement through a column vector.
///
/// Owned exclusively by the call site that created it. The writer only
/// binds; executing the statement (and re-binding for the next row)
/// stays with the caller.
pub struct StatementWriter<T, S> {
    statement: S,
    vector: ColumnVector,
    _model: PhantomData<fn() -> T>,
}

impl<T: DataModel, S: ParamStatement> StatementWriter<T, S> {
    pub fn new(statement: S, vector: ColumnVector) -> Self {
        Self {
            statement,
            vector,
            _model: PhantomData,
        }
    }

    /// Bind every mapped property of `model` into the statement, using
    /// an explicit typed null where the property is absent.
    pub fn write(&mut self, model: &T) -> Result<()> {
        let schema = T::schema();
        for (column, position) in self.vector.mapped() {
            let value = model.get(position);
            if value.is_null() {
                self.statement
                    .bind_null(column, schema.property(position).field_type)?;
            } else {
                self.statement.bind(column, &value)?;
            }
        }
        Ok(())
    }

    /// Access the underlying statement, e.g. to execute it.
    pub fn statement(&mut self) -> &mut S {
        &mut self.statement
    }

    /// Release the writer, returning the statement to the caller.
    pub fn into_statement(self) -> S {
        self.statement
    }
}

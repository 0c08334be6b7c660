//! Core contracts and value/model types.

pub mod schema;
pub mod traits;
pub mod value;

pub use self::schema::{check_assignable, DataModel, ModelSchema, ModelSchemaBuilder, PropertyDef};
pub use self::traits::{
    ComponentResolver, DrainDriver, DriverFactory, Process, ProcessContext, SourceDriver,
    StaticResolver,
};
pub use self::value::{FieldType, FieldValue, TypedField};

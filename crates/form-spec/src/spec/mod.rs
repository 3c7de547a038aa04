pub mod field;
pub mod form;
pub mod validation;

pub use field::{Constraint, FieldSpec, FieldType, FileConstraint, SelectOption};
pub use form::{FormSchema, FormSpec, SchemaError};
pub use validation::CrossFieldRule;

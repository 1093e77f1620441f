//! Schema of cached objects: primary keys, classes and objects.

mod class;
mod object;
mod primary_key;

pub use class::{Class, ClassBuilder, FieldDef};
pub use object::Object;
pub use primary_key::PrimaryKey;

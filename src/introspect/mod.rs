pub mod schema;
pub mod secondary;

pub use schema::SchemaIntrospector;
pub use secondary::MetaModelScanner;

//! Safe SQL: identifiers quoted, values as parameters, DDL from the desired schema only.

mod builder;
pub mod ddl;
pub mod native;
pub mod params;
pub use builder::*;
pub use ddl::*;
pub use native::*;
pub use params::*;

//! CrudService: record-level CRUD over the desired schema using the safe SQL builder.

mod crud;
pub use crud::CrudService;

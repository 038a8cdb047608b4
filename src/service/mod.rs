//! CrudService: generic CRUD over reflected tables using the safe SQL builder.

mod crud;

pub use crud::CrudService;

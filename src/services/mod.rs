//! Business logic services.
//!
//! Services orchestrate storage backends and provide high-level operations.

mod backend_factory;
mod todo;

pub use backend_factory::BackendFactory;
pub use todo::TodoService;

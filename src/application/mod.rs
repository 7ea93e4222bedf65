// Application layer - use cases and orchestration over the repository.
// Clients (CLI, HTTP) talk to LedgerService only.

pub mod error;
mod service;

pub use error::*;
pub use service::*;

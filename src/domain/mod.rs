mod account;
mod customer;
mod routing;
mod transfer;

pub use account::*;
pub use customer::*;
pub use routing::*;
pub use transfer::*;

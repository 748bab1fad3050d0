mod core;
mod index_admin;
mod ops;
mod store;

pub use self::core::{Collection, SharedStorage};
pub use self::store::DocStore;

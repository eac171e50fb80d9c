pub mod patterns;
pub mod session;
pub mod table;

pub use session::{ExceptionGrouper, GrouperState};
pub use table::{GrouperTable, SharedGrouper};

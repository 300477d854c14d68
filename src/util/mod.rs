pub mod context;
pub mod keys;
pub mod status;

pub use context::{CallContext, CancelHandle};
pub use status::{Code, Result, Status};

pub mod jikan;
pub mod queue;
pub mod retry;

pub use jikan::{JikanApi, JikanClient, JikanError};
pub use queue::RequestQueue;
pub use retry::RetryPolicy;

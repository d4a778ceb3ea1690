// Route groups, one module per resource, mounted under /v1 by `crate::app`.
pub mod comments;
pub mod posts;
pub mod system;
pub mod users;

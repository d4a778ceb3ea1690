//! Postgres-backed repositories.

mod comments;
mod posts;
mod users;

pub use comments::PgCommentRepository;
pub use posts::PgPostRepository;
pub use users::PgUserRepository;

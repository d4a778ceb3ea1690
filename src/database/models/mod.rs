pub mod comment;
pub mod post;
pub mod user;

pub use comment::{Comment, NewComment};
pub use post::{NewPost, Post, PostChanges, PostFilter, PostWithAuthor};
pub use user::{Address, Company, Geo, NewUser, User, UserChanges, DEFAULT_AVATAR};

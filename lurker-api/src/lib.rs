mod comment;
pub use comment::{Comment, CommentId, ThreadInfo};

mod error;
pub use error::Error;

mod group;
pub use group::{Group, GroupId};

mod page;
pub use page::Page;

mod post;
pub use post::{CommentInfo, Post, PostId};

mod transport;
pub use transport::Transport;

mod user;
pub use user::{UserId, UserRecord};

/// Requests per second used when the caller does not provide a usable limit.
pub const DEFAULT_RPS: u32 = 3;

/// Page size of every paginated remote method (wall, comments, threads).
pub const PAGE_SIZE: u64 = 100;

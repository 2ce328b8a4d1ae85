// ABOUTME: Comment threads attached to change documents
// ABOUTME: Subjects are resolved within the caller's organization before a comment is stored

pub mod storage;
pub mod types;

pub use storage::CommentStorage;
pub use types::{Comment, CommentCreateInput};

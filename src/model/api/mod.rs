pub mod auth;
pub mod id;
pub mod page;
pub mod question;

pub use id::ApiId;
pub use page::Message;

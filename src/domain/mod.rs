pub mod conversation;
pub mod matching;
pub mod message;
pub mod user;

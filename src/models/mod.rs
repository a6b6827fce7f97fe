pub mod chat;
pub mod console;

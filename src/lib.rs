// Library root: the chat model, providers and shells. The binary entry
// point is src/main.rs.

pub mod chat;
pub mod comms;
pub mod config;
pub mod error;
pub mod llm;
pub mod logger;

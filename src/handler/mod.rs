pub mod chat_handler;
pub mod contact_handler;
pub mod quote_handler;

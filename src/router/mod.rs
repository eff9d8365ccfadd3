pub mod chat_router;
pub mod contact_router;
pub mod quote_router;

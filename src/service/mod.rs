pub mod chat_service;
pub mod contact_service;
pub mod pricing_service;
pub mod quote_service;

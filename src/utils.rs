pub mod chat_messenger;
pub mod config;
pub mod test_setup;
pub mod websocket;

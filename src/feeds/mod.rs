pub mod channel;
pub mod replay;
pub mod synthetic;
pub mod websocket;

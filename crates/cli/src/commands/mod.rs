pub mod chat;
pub mod gateway;
pub mod onboard;
pub mod tools;

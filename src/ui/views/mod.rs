pub mod chat;
pub mod console;

pub use chat::render_customer;
pub use console::render_console;

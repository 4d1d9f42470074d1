pub mod core;
pub mod deck;
pub mod greek;
pub mod pipeline;
pub mod speech;

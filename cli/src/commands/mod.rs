pub mod list;
pub mod pull;

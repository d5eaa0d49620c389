pub mod account;
pub mod change_log;
pub mod material;
pub mod stone;

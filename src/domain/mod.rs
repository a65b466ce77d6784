pub mod auth;
pub mod errors;
pub mod hours;
pub mod models;
pub mod overlap;
pub mod swap_model;
pub mod swap_state_machine;
pub mod time;

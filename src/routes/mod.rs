pub mod assistant;
pub mod auth;
pub mod recurring;
pub mod reminders;
pub mod reports;
pub mod transactions;
pub mod users;

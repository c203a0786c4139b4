pub mod rate_budget;

pub use rate_budget::RateBudget;

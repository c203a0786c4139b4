pub mod eurocore;
pub mod happening;
pub mod nation;

pub use eurocore::{NewTelegram, Template, TelegramType};
pub use happening::HappeningPayload;
pub use nation::{RecruitmentEligibility, normalize_name};

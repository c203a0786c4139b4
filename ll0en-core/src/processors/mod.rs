//! Processors of the happening pipeline.
//!
//! - `StreamSubscriber`: Holds the feed connection, emits `RawEvent`
//! - `ActionDispatcher`: Receives `ClassifiedMatch`, spawns one reaction each
//! - `EligibilityQueryClient`: Rate-limited recruitment eligibility checks
//! - `NotificationDispatchClient`: Resolves and sends telegrams

pub mod dispatcher;
pub mod eligibility;
pub mod notification;
pub mod subscriber;

pub use dispatcher::{ActionDispatcher, ReactionError, ReactionOutcome, ReactionPlan};
pub use eligibility::{
    EligibilityCheck, EligibilityQueryClient, EligibilityResult, QueryError, RecruitmentApi,
};
pub use notification::{DispatchError, NotificationDispatchClient, NotificationGateway};
pub use subscriber::{
    ConnectionError, DecodeError, FeedSource, HttpFeedSource, StreamSubscriber, subscribe,
};

//! ActionDispatcher processor.
//!
//! The ActionDispatcher is responsible for:
//! - Receiving `ClassifiedMatch` values from the feed consumer
//! - Spawning one independent reaction task per match
//! - Running the reaction pipeline for the match's category
//! - Logging the outcome at the task boundary
//!
//! Both categories share a single pipeline parameterised by [`ReactionPlan`]:
//!
//! ```text
//! Start -> [CheckEligibility -> Ineligible -> Done]
//!                            -> Eligible ->] ResolveNotification -> Send -> Done | Failed
//! ```
//!
//! Reactions are fire-and-forget. Nothing is retried, deduplicated or
//! reported back to the consumer; two happenings for the same nation produce
//! two unrelated reactions.

use std::sync::Arc;

use ll0en_sdk::objects::TelegramType;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{error, info};

use super::eligibility::{EligibilityCheck, QueryError};
use super::notification::{DispatchError, NotificationDispatchClient};
use crate::config::NotificationSource;
use crate::events::{Category, ClassifiedMatch};

/// Errors that end a reaction early.
#[derive(Debug, Error)]
pub enum ReactionError {
    #[error("eligibility check failed: {0}")]
    Query(#[from] QueryError),

    #[error("telegram dispatch failed: {0}")]
    Dispatch(#[from] DispatchError),
}

/// How a reaction that did not fail ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReactionOutcome {
    /// The telegram was handed to the gateway.
    Sent,
    /// The nation may not be recruited; nothing was sent.
    Ineligible { territory: String },
}

/// Parameters of the reaction pipeline for one category.
#[derive(Debug, Clone)]
pub struct ReactionPlan {
    pub category: Category,
    pub kind: TelegramType,
    pub check_eligibility: bool,
    pub source: NotificationSource,
}

impl ReactionPlan {
    /// Standard telegram, sent unconditionally.
    pub fn resignation(source: NotificationSource) -> Self {
        Self {
            category: Category::Resignation,
            kind: TelegramType::Standard,
            check_eligibility: false,
            source,
        }
    }

    /// Recruitment telegram, sent only to nations the API reports as eligible.
    pub fn relocation(source: NotificationSource) -> Self {
        Self {
            category: Category::Relocation,
            kind: TelegramType::Recruitment,
            check_eligibility: true,
            source,
        }
    }
}

/// Turns classified matches into concurrent reactions.
///
/// Cheap to clone; every spawned task holds its own handle to the shared
/// clients.
#[derive(Clone)]
pub struct ActionDispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    region: String,
    eligibility: Arc<dyn EligibilityCheck>,
    notifier: NotificationDispatchClient,
    resign: ReactionPlan,
    relocate: ReactionPlan,
}

impl ActionDispatcher {
    /// Create a new ActionDispatcher.
    ///
    /// # Arguments
    ///
    /// * `region` - The tracked region, used as the recruiting region in eligibility checks
    /// * `eligibility` - Eligibility source for relocation reactions
    /// * `notifier` - Telegram resolution and delivery
    /// * `resign` / `relocate` - Pipeline parameters per category
    pub fn new(
        region: impl Into<String>,
        eligibility: Arc<dyn EligibilityCheck>,
        notifier: NotificationDispatchClient,
        resign: ReactionPlan,
        relocate: ReactionPlan,
    ) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                region: region.into(),
                eligibility,
                notifier,
                resign,
                relocate,
            }),
        }
    }

    /// The pipeline parameters used for `category`.
    pub fn plan(&self, category: Category) -> &ReactionPlan {
        match category {
            Category::Resignation => &self.inner.resign,
            Category::Relocation => &self.inner.relocate,
        }
    }

    /// Spawn the reaction for `matched` and return immediately.
    ///
    /// The returned handle resolves once the reaction has finished and
    /// logged its outcome; callers are free to drop it.
    pub fn dispatch(&self, matched: ClassifiedMatch) -> JoinHandle<()> {
        let this = self.clone();

        tokio::spawn(async move {
            let nation = matched.nation();
            let category = matched.category();

            match this.react(&matched).await {
                Ok(ReactionOutcome::Sent) => {
                    info!(
                        nation = %nation,
                        category = %category,
                        kind = %this.plan(category).kind,
                        "Telegram sent"
                    );
                }
                Ok(ReactionOutcome::Ineligible { territory }) => {
                    info!(
                        nation = %nation,
                        region = %territory,
                        "Nation not eligible for recruitment"
                    );
                }
                Err(e) => {
                    error!(
                        nation = %nation,
                        category = %category,
                        region = %this.inner.region,
                        error = %e,
                        "Reaction failed"
                    );
                }
            }
        })
    }

    /// Run the reaction pipeline for `matched` to completion.
    pub async fn react(&self, matched: &ClassifiedMatch) -> Result<ReactionOutcome, ReactionError> {
        let plan = self.plan(matched.category());
        let nation = matched.nation();

        if plan.check_eligibility {
            let eligibility = self
                .inner
                .eligibility
                .is_eligible(nation, &self.inner.region)
                .await?;

            if !eligibility.eligible {
                return Ok(ReactionOutcome::Ineligible {
                    territory: eligibility.territory,
                });
            }
        }

        self.inner
            .notifier
            .resolve_and_send(plan.kind, nation, &plan.source)
            .await?;

        Ok(ReactionOutcome::Sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StaticTelegram;
    use crate::processors::eligibility::EligibilityResult;
    use crate::processors::notification::testing::FakeGateway;
    use async_trait::async_trait;
    use ll0en_sdk::client::ClientError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeEligibility {
        eligible: Option<bool>,
        calls: AtomicUsize,
    }

    impl FakeEligibility {
        fn answering(eligible: bool) -> Arc<Self> {
            Arc::new(Self {
                eligible: Some(eligible),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                eligible: None,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl EligibilityCheck for FakeEligibility {
        async fn is_eligible(
            &self,
            _nation: &str,
            region: &str,
        ) -> Result<EligibilityResult, QueryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.eligible {
                Some(eligible) => Ok(EligibilityResult {
                    eligible,
                    territory: if eligible {
                        "other_place".to_string()
                    } else {
                        region.to_string()
                    },
                }),
                None => Err(QueryError::Client(ClientError::RateLimited {
                    retry_after_secs: 30,
                })),
            }
        }
    }

    fn static_source(author: &str) -> NotificationSource {
        NotificationSource::Static(StaticTelegram {
            id: 1234,
            secret: "key".to_string(),
            author: author.to_string(),
        })
    }

    fn dispatcher(
        eligibility: Arc<FakeEligibility>,
        gateway: Arc<FakeGateway>,
        resign: NotificationSource,
    ) -> ActionDispatcher {
        ActionDispatcher::new(
            "testlandia",
            eligibility,
            NotificationDispatchClient::new(gateway),
            ReactionPlan::resignation(resign),
            ReactionPlan::relocation(static_source("testlandia")),
        )
    }

    fn relocation(nation: &str) -> ClassifiedMatch {
        ClassifiedMatch::Relocation {
            nation: nation.to_string(),
        }
    }

    #[tokio::test]
    async fn test_resignation_sends_standard_telegram() {
        let eligibility = FakeEligibility::answering(false);
        let gateway = Arc::new(FakeGateway::with_template("resign", 77));
        let dispatcher = dispatcher(
            eligibility.clone(),
            gateway.clone(),
            NotificationSource::Template("resign".to_string()),
        );

        let outcome = dispatcher
            .react(&ClassifiedMatch::Resignation {
                nation: "kingdom_of_rust".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(outcome, ReactionOutcome::Sent);
        assert_eq!(eligibility.calls.load(Ordering::SeqCst), 0);
        let sent = gateway.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipient, "kingdom_of_rust");
        assert_eq!(sent[0].telegram_type, TelegramType::Standard);
        assert_eq!(sent[0].id, "77");
    }

    #[tokio::test]
    async fn test_eligible_relocation_sends_recruitment_telegram() {
        let eligibility = FakeEligibility::answering(true);
        let gateway = Arc::new(FakeGateway::default());
        let dispatcher = dispatcher(eligibility.clone(), gateway.clone(), static_source("x"));

        let outcome = dispatcher.react(&relocation("free_republic")).await.unwrap();

        assert_eq!(outcome, ReactionOutcome::Sent);
        assert_eq!(eligibility.calls.load(Ordering::SeqCst), 1);
        let sent = gateway.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipient, "free_republic");
        assert_eq!(sent[0].telegram_type, TelegramType::Recruitment);
    }

    #[tokio::test]
    async fn test_ineligible_relocation_sends_nothing() {
        let gateway = Arc::new(FakeGateway::default());
        let dispatcher = dispatcher(
            FakeEligibility::answering(false),
            gateway.clone(),
            static_source("x"),
        );

        let outcome = dispatcher.react(&relocation("free_republic")).await.unwrap();

        assert_eq!(
            outcome,
            ReactionOutcome::Ineligible {
                territory: "testlandia".to_string()
            }
        );
        assert!(gateway.sent().is_empty());
    }

    #[tokio::test]
    async fn test_failed_query_aborts_reaction() {
        let gateway = Arc::new(FakeGateway::default());
        let dispatcher = dispatcher(FakeEligibility::failing(), gateway.clone(), static_source("x"));

        let err = dispatcher.react(&relocation("free_republic")).await.unwrap_err();

        assert!(matches!(err, ReactionError::Query(_)));
        assert!(gateway.sent().is_empty());
    }

    #[tokio::test]
    async fn test_failures_stay_inside_their_task() {
        let gateway = Arc::new(FakeGateway::default());
        let dispatcher = dispatcher(
            FakeEligibility::failing(),
            gateway.clone(),
            NotificationSource::Template("missing".to_string()),
        );

        let failing_query = dispatcher.dispatch(relocation("free_republic"));
        let failing_template = dispatcher.dispatch(ClassifiedMatch::Resignation {
            nation: "kingdom_of_rust".to_string(),
        });

        assert!(failing_query.await.is_ok());
        assert!(failing_template.await.is_ok());
        assert!(gateway.sent().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_reactions_are_independent() {
        let gateway = Arc::new(FakeGateway::default());
        let dispatcher = dispatcher(
            FakeEligibility::answering(true),
            gateway.clone(),
            static_source("testlandia"),
        );

        let handles: Vec<_> = (0..5)
            .map(|_| dispatcher.dispatch(relocation("free_republic")))
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        // No deduplication: every happening gets its own telegram.
        assert_eq!(gateway.sent().len(), 5);
    }
}

//! Rate-limited recruitment eligibility checks.
//!
//! Every query first takes a slot from the shared [`RateBudget`], then asks
//! the NationStates API whether the nation may receive a recruitment
//! telegram from the tracked region. The API's answer is surfaced as-is.

use std::sync::Arc;

use async_trait::async_trait;
use ll0en_sdk::client::{ClientError, NsClient};
use ll0en_sdk::objects::RecruitmentEligibility;
use thiserror::Error;
use tracing::debug;

use crate::utils::RateBudget;

/// Errors that can occur while checking eligibility.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Transport, status or decoding failure from the NationStates API.
    #[error("nationstates query failed: {0}")]
    Client(#[from] ClientError),
}

/// Answer to "may this nation be recruited from this region right now?".
///
/// Built fresh for every query and never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibilityResult {
    pub eligible: bool,
    /// Region the nation currently resides in.
    pub territory: String,
}

impl From<RecruitmentEligibility> for EligibilityResult {
    fn from(value: RecruitmentEligibility) -> Self {
        Self {
            eligible: value.can_recruit,
            territory: value.region,
        }
    }
}

/// The NationStates query the eligibility check is built on.
#[async_trait]
pub trait RecruitmentApi: Send + Sync {
    async fn recruitment_eligibility(
        &self,
        nation: &str,
        region: &str,
    ) -> Result<RecruitmentEligibility, ClientError>;
}

#[async_trait]
impl<T: RecruitmentApi + ?Sized> RecruitmentApi for Arc<T> {
    async fn recruitment_eligibility(
        &self,
        nation: &str,
        region: &str,
    ) -> Result<RecruitmentEligibility, ClientError> {
        (**self).recruitment_eligibility(nation, region).await
    }
}

#[async_trait]
impl RecruitmentApi for NsClient {
    async fn recruitment_eligibility(
        &self,
        nation: &str,
        region: &str,
    ) -> Result<RecruitmentEligibility, ClientError> {
        NsClient::recruitment_eligibility(self, nation, region).await
    }
}

/// Seam between reactions and the eligibility source.
#[async_trait]
pub trait EligibilityCheck: Send + Sync {
    /// Check whether `nation` may receive a recruitment telegram from `region`.
    async fn is_eligible(&self, nation: &str, region: &str)
    -> Result<EligibilityResult, QueryError>;
}

/// NationStates-backed eligibility check sharing one [`RateBudget`].
pub struct EligibilityQueryClient {
    api: Arc<dyn RecruitmentApi>,
    budget: Arc<RateBudget>,
}

impl EligibilityQueryClient {
    /// Create a new EligibilityQueryClient.
    ///
    /// # Arguments
    ///
    /// * `api` - NationStates API client
    /// * `budget` - Request budget shared with every other API caller
    pub fn new(api: impl RecruitmentApi + 'static, budget: Arc<RateBudget>) -> Self {
        Self {
            api: Arc::new(api),
            budget,
        }
    }
}

#[async_trait]
impl EligibilityCheck for EligibilityQueryClient {
    async fn is_eligible(
        &self,
        nation: &str,
        region: &str,
    ) -> Result<EligibilityResult, QueryError> {
        if !self.budget.try_acquire().await {
            debug!(nation = %nation, "Waiting for NationStates request budget");
            self.budget.acquire().await;
        }

        let eligibility = self.api.recruitment_eligibility(nation, region).await?;
        let budget_left = self.budget.available().await;
        debug!(
            nation = %nation,
            can_recruit = eligibility.can_recruit,
            region = %eligibility.region,
            budget_left,
            "Recruitment eligibility received"
        );

        Ok(eligibility.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Records every query it receives.
    #[derive(Default)]
    struct RecordingApi {
        queries: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl RecruitmentApi for RecordingApi {
        async fn recruitment_eligibility(
            &self,
            nation: &str,
            region: &str,
        ) -> Result<RecruitmentEligibility, ClientError> {
            self.queries
                .lock()
                .unwrap()
                .push((nation.to_string(), region.to_string()));
            Ok(RecruitmentEligibility {
                can_recruit: true,
                region: "Elsewhere".to_string(),
            })
        }
    }

    impl RecordingApi {
        fn query_count(&self) -> usize {
            self.queries.lock().unwrap().len()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_waits_for_exhausted_budget() {
        let api = Arc::new(RecordingApi::default());
        let budget = Arc::new(RateBudget::new(1, Duration::from_secs(30)));
        budget.acquire().await;

        let client = Arc::new(EligibilityQueryClient::new(api.clone(), budget.clone()));
        let query = tokio::spawn({
            let client = client.clone();
            async move { client.is_eligible("testlandia", "the_region").await }
        });

        tokio::time::sleep(Duration::from_secs(29)).await;
        assert!(!query.is_finished());
        assert_eq!(api.query_count(), 0);

        let result = query.await.unwrap().unwrap();
        assert!(result.eligible);
        assert_eq!(result.territory, "Elsewhere");
        assert_eq!(
            api.queries.lock().unwrap().as_slice(),
            [("testlandia".to_string(), "the_region".to_string())]
        );
        assert_eq!(budget.available().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_query_takes_from_shared_budget() {
        let api = Arc::new(RecordingApi::default());
        let budget = Arc::new(RateBudget::new(3, Duration::from_secs(30)));
        let client = EligibilityQueryClient::new(api.clone(), budget.clone());

        client.is_eligible("a", "r").await.unwrap();
        client.is_eligible("b", "r").await.unwrap();

        assert_eq!(api.query_count(), 2);
        assert_eq!(budget.available().await, 1);
    }

    #[test]
    fn test_result_from_api_answer() {
        let result: EligibilityResult = RecruitmentEligibility {
            can_recruit: true,
            region: "Other Place".to_string(),
        }
        .into();
        assert!(result.eligible);
        assert_eq!(result.territory, "Other Place");
    }
}

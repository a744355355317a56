use async_trait::async_trait;
use hh_client::{HhClient, SearchQuery, VacancyDetail, VacancyPage};

/// Where vacancy pages come from.
///
/// Implemented by [`HhClient`] for real runs and by
/// [`crate::testing::MockSource`] in tests.
#[async_trait]
pub trait VacancySource: Send + Sync {
    async fn fetch_page(&self, query: &SearchQuery) -> hh_client::Result<VacancyPage>;

    async fn fetch_vacancy(&self, id: &str) -> hh_client::Result<VacancyDetail>;
}

#[async_trait]
impl VacancySource for HhClient {
    async fn fetch_page(&self, query: &SearchQuery) -> hh_client::Result<VacancyPage> {
        HhClient::fetch_page(self, query).await
    }

    async fn fetch_vacancy(&self, id: &str) -> hh_client::Result<VacancyDetail> {
        HhClient::fetch_vacancy(self, id).await
    }
}

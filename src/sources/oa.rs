//! OA.Works report API.

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::sources::SourceError;
use crate::utils::{FetchRequest, HttpClient, DEFAULT_TIMEOUT};

const OA_API_URL: &str = "https://bg.api.oa.works/report/works";

/// Institutional report query: journal articles, editorials, letters and reviews
/// affiliated with or funded by HHMI / Janelia, excluding preprints, proceedings
/// and works removed from the report. Already URL-encoded.
pub const INSTITUTION_REPORT_QUERY: &str = concat!(
    "?q=(openalx.authorships.institutions.display_name:",
    "janelia%20OR%20openalx.authorships.affiliations.raw_affiliation_string:",
    "janelia%20OR%20openalx.authorships.institutions.ror:",
    "013sk6x84%20OR%20openalx.authorships.institutions.id:",
    "%22i195573530%22)%20AND%20((supplements.sheets:",
    "(%22pmc__hhmi%22%20OR%20%22name_epmc__hhmi%22%20OR%20%22",
    "all-time__hhmi%22%20OR%20%22authorship__hhmi%22%20OR%20%22",
    "staff__hhmi%22%20OR%20%22preprints_oa_locations__hhmi",
    "%22%20OR%20%22preprints-enrichment__hhmi%22)%20OR%20",
    "(funder.DOI:(%2210.13039/100000011%22)%20OR%20funder.name:",
    "(%22Howard%20Hughes%20Medical%20Institute%22%20OR",
    "%20%22Janelia%20Research%20Campus%22%20OR",
    "%20%22Freeman%20Hrabowski%22)%20OR%20openalx.grants.funder:",
    "(%22F4320306082%22))%20OR%20(authorships.institutions.ror:",
    "(%22006w34k90%22%20OR%20%22013sk6x84%22)%20OR",
    "%20authorships.institutions.display_name:",
    "(%22Howard%20Hughes%20Medical%20Institute%22%20OR%20%22",
    "Janelia%20Research%20Campus%22%20OR",
    "%20%22Freeman%20Hrabowski%22)%20OR",
    "%20authorships.raw_affiliation_string:",
    "(%22Howard%20Hughes%20Medical%20Institute%22%20OR",
    "%20%22Janelia%20Research%20Campus%22%20OR",
    "%20%22Freeman%20Hrabowski%22))%20OR%20",
    "supplements.funder.display_name_ic:%22hhmi%22)%20AND",
    "%20NOT%20(supplements.removed_from_report:",
    "%22hhmi%22%20OR%20supplements.is_financial_disclosure:",
    "%22hhmi%22))%20AND%20type:",
    "(%22article%22%20OR%20%22editorial%22%20OR",
    "%20%22letter%22%20OR%20%22review%22)%20AND%20NOT",
    "%20openalx.type_crossref:",
    "%22proceedings-article%22%20AND%20NOT",
    "%20(supplements.is_preprint:true%20OR",
    "%20(pubtype:preprint%20AND%20NOT%20supplements.is_preprint:",
    "false)%20OR%20subtype:preprint)%20AND%20openalex:*%20AND",
    "%20journal:*",
);

/// OA.Works source
#[derive(Debug, Clone)]
pub struct OaSource {
    client: Arc<HttpClient>,
    base_url: String,
    timeout: Duration,
}

impl OaSource {
    pub fn new() -> Result<Self, SourceError> {
        Ok(Self::with_client(Arc::new(HttpClient::new()?)))
    }

    pub fn with_client(client: Arc<HttpClient>) -> Self {
        Self {
            client,
            base_url: OA_API_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Report record for a single DOI
    pub async fn work(&self, doi: &str) -> Result<Value, SourceError> {
        self.get(format!("{}/{}", self.base_url, doi)).await
    }

    /// Institutional report; `suffix` carries extra parameters such as `&size=100`
    pub async fn institution_report(&self, suffix: &str) -> Result<Value, SourceError> {
        self.get(format!("{}{}{}", self.base_url, INSTITUTION_REPORT_QUERY, suffix))
            .await
    }

    async fn get(&self, url: String) -> Result<Value, SourceError> {
        let request = FetchRequest::new(url)
            .header("Accept", "application/json")
            .timeout(self.timeout);
        self.client.fetch(&request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn source(server: &Server) -> OaSource {
        OaSource::with_client(Arc::new(HttpClient::new().unwrap()))
            .with_base_url(format!("{}/report/works", server.url()))
    }

    #[tokio::test]
    async fn test_work() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/report/works/10.7554/elife.90523")
            .with_status(200)
            .with_body(r#"{"DOI": "10.7554/elife.90523", "is_oa": true}"#)
            .create_async()
            .await;

        let work = source(&server).work("10.7554/elife.90523").await.unwrap();
        assert_eq!(work["is_oa"], true);
    }

    #[tokio::test]
    async fn test_institution_report_appends_suffix() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/report/works")
            .match_query(Matcher::AllOf(vec![
                Matcher::Regex("openalx".into()),
                Matcher::UrlEncoded("size".into(), "5".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"hits": {"total": 0, "hits": []}}"#)
            .create_async()
            .await;

        let report = source(&server).institution_report("&size=5").await.unwrap();
        assert_eq!(report["hits"]["total"], 0);
        mock.assert_async().await;
    }
}

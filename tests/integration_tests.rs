//! Integration tests for jrc-common
//!
//! These tests drive the public API against local mock servers: the fetcher's status
//! and decoding contract, the retry wrapper over real transport failures, and DOI to
//! PMID resolution across both NCBI services.

use jrc_common::sources::{NcbiSource, PeopleSource, SourceError, TransportKind};
use jrc_common::utils::{is_empty_result, with_retry, FetchRequest, HttpClient, RetryPolicy};
use jrc_common::ResponseFormat;
use mockito::{Matcher, Server, ServerGuard};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn client() -> Arc<HttpClient> {
    Arc::new(HttpClient::new().expect("client"))
}

fn ncbi(server: &ServerGuard, api_key: Option<&str>) -> NcbiSource {
    NcbiSource::with_client(client())
        .with_api_key(api_key.map(str::to_string))
        .with_base_urls(
            format!("{}/idconv/", server.url()),
            format!("{}/esearch.fcgi", server.url()),
        )
}

/// A server that accepts connections and never answers; returns its URL and the
/// number of connections accepted so far
async fn silent_server() -> (String, Arc<AtomicUsize>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/slow", listener.local_addr().unwrap());
    let accepted = Arc::new(AtomicUsize::new(0));

    let counter = accepted.clone();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            held.push(socket);
        }
    });

    (url, accepted)
}

/// URL of a local port with nothing listening on it
async fn refused_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/closed", addr)
}

mod fetcher {
    use super::*;

    #[tokio::test]
    async fn allowed_statuses_yield_empty_result() {
        let mut server = Server::new_async().await;
        for status in [400, 403, 404, 410] {
            server
                .mock("GET", format!("/status/{}", status).as_str())
                .with_status(status)
                .with_body("not json at all")
                .create_async()
                .await;

            let request = FetchRequest::new(format!("{}/status/{}", server.url(), status))
                .allow([400, 403, 404, 410]);
            let result = client().fetch(&request).await.unwrap();
            assert!(is_empty_result(&result), "status {} should be empty", status);
        }
    }

    #[tokio::test]
    async fn other_statuses_carry_their_code() {
        let mut server = Server::new_async().await;
        for status in [201, 204, 301, 404, 429, 500, 503] {
            server
                .mock("GET", format!("/status/{}", status).as_str())
                .with_status(status)
                .create_async()
                .await;

            let request = FetchRequest::new(format!("{}/status/{}", server.url(), status))
                .allow(std::iter::empty());
            let err = client().fetch(&request).await.unwrap_err();
            assert_eq!(err.status(), Some(status as u16));
        }
    }

    #[tokio::test]
    async fn json_body_matches_direct_parse() {
        let body = r#"{"message": {"DOI": "10.1/x", "author": [{"given": "Ada", "ORCID": null}], "score": 1.5, "count": 3}}"#;
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/works")
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        let result = client()
            .fetch(&FetchRequest::new(format!("{}/works", server.url())))
            .await
            .unwrap();
        assert_eq!(result, serde_json::from_str::<Value>(body).unwrap());
    }

    #[tokio::test]
    async fn invalid_bodies_are_decode_errors() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/truncated")
            .with_status(200)
            .with_body(r#"{"message": {"DOI": "#)
            .create_async()
            .await;
        server
            .mock("GET", "/broken.xml")
            .with_status(200)
            .with_body("<feed><entry></feed>")
            .create_async()
            .await;

        let err = client()
            .fetch(&FetchRequest::new(format!("{}/truncated", server.url())))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SourceError::Decode { format: ResponseFormat::Json, .. }
        ));

        let err = client()
            .fetch(
                &FetchRequest::new(format!("{}/broken.xml", server.url()))
                    .format(ResponseFormat::Xml),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SourceError::Decode { format: ResponseFormat::Xml, .. }
        ));
    }
}

mod retry {
    use super::*;

    #[tokio::test]
    async fn timeouts_are_retried_up_to_max_attempts() {
        let (url, accepted) = silent_server().await;
        let request = FetchRequest::new(url).timeout(Duration::from_millis(100));
        let policy = RetryPolicy::new(3, Duration::from_millis(10));
        let client = client();

        let err = with_retry(&policy, "silent", || client.fetch(&request))
            .await
            .unwrap_err();

        assert!(err.transport_kind().is_some_and(TransportKind::is_timeout));
        assert_eq!(accepted.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn connection_refused_is_not_retried() {
        let request = FetchRequest::new(refused_url().await);
        let policy = RetryPolicy::new(3, Duration::from_millis(10));
        let client = client();
        let calls = AtomicUsize::new(0);

        let err = with_retry(&policy, "refused", || {
            calls.fetch_add(1, Ordering::SeqCst);
            client.fetch(&request)
        })
        .await
        .unwrap_err();

        assert_eq!(err.transport_kind(), Some(TransportKind::Connect));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn status_errors_propagate_unchanged() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/busy")
            .with_status(503)
            .expect(1)
            .create_async()
            .await;
        let request = FetchRequest::new(format!("{}/busy", server.url()));
        let client = client();

        let err = with_retry(&RetryPolicy::default(), "busy", || client.fetch(&request))
            .await
            .unwrap_err();

        assert!(matches!(err, SourceError::HttpStatus { status: 503, .. }));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn people_lookups_retry_timeouts() {
        let (url, accepted) = silent_server().await;
        let base_url = url.trim_end_matches("slow").to_string();
        let people = PeopleSource::with_client(client(), "key")
            .with_base_url(base_url)
            .with_timeout(Duration::from_millis(100))
            .with_retry_policy(RetryPolicy::new(2, Duration::from_millis(10)));

        // The default 5 s timeout would blow this bound
        let err = tokio::time::timeout(Duration::from_secs(3), people.by_name("Ada"))
            .await
            .expect("timeout override honoured")
            .unwrap_err();

        assert!(err.transport_kind().is_some_and(TransportKind::is_timeout));
        assert_eq!(accepted.load(Ordering::SeqCst), 2);
    }
}

mod pmid {
    use super::*;

    #[tokio::test]
    async fn primary_hit_skips_pubmed() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/idconv/")
            .match_query(Matcher::UrlEncoded("ids".into(), "10.1093/nar/gks1195".into()))
            .with_status(200)
            .with_body(r#"{"status": "ok", "records": [{"doi": "10.1093/nar/gks1195", "pmid": "23193287"}]}"#)
            .create_async()
            .await;
        let esearch = server
            .mock("GET", "/esearch.fcgi")
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let pmid = ncbi(&server, Some("ncbi-key"))
            .get_pmid("10.1093/nar/gks1195")
            .await
            .unwrap();

        assert_eq!(pmid.as_deref(), Some("23193287"));
        esearch.assert_async().await;
    }

    #[tokio::test]
    async fn no_api_key_means_no_pubmed_search() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/idconv/")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"status": "ok", "records": [{"doi": "10.1/none", "errmsg": "invalid article id"}]}"#)
            .create_async()
            .await;
        let esearch = server
            .mock("GET", "/esearch.fcgi")
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let pmid = ncbi(&server, None).get_pmid("10.1/none").await.unwrap();

        assert_eq!(pmid, None);
        esearch.assert_async().await;
    }

    #[tokio::test]
    async fn pubmed_zero_hits_reports_error_list() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/idconv/")
            .match_query(Matcher::Any)
            .with_status(404)
            .create_async()
            .await;
        server
            .mock("GET", "/esearch.fcgi")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("db".into(), "pubmed".into()),
                Matcher::UrlEncoded("api_key".into(), "ncbi-key".into()),
                Matcher::UrlEncoded("term".into(), "10.1/missing[DOI]".into()),
            ]))
            .with_status(200)
            .with_body(concat!(
                "<eSearchResult><Count>0</Count><RetMax>0</RetMax><IdList/>",
                "<ErrorList><PhraseNotFound>10.1/missing[DOI]</PhraseNotFound></ErrorList>",
                "</eSearchResult>"
            ))
            .create_async()
            .await;

        let err = ncbi(&server, Some("ncbi-key"))
            .get_pmid("10.1/missing")
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "No PMID found for 10.1/missing");
        let details = err.details().unwrap();
        assert_eq!(
            serde_json::from_str::<Value>(details).unwrap(),
            json!({"PhraseNotFound": "10.1/missing[DOI]"})
        );
    }

    #[tokio::test]
    async fn pubmed_non_numeric_id_is_empty() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/idconv/")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"status": "error", "message": "unknown id"}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/esearch.fcgi")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<eSearchResult><Count>1</Count><IdList><Id>PMC999</Id></IdList></eSearchResult>")
            .create_async()
            .await;

        let pmid = ncbi(&server, Some("ncbi-key"))
            .get_pmid("10.1/odd")
            .await
            .unwrap();
        assert_eq!(pmid, None);
    }

    #[tokio::test]
    async fn pubmed_single_hit() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/idconv/")
            .match_query(Matcher::Any)
            .with_status(400)
            .create_async()
            .await;
        server
            .mock("GET", "/esearch.fcgi")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<eSearchResult><Count>1</Count><IdList><Id>37035178</Id></IdList></eSearchResult>")
            .create_async()
            .await;

        let pmid = ncbi(&server, Some("ncbi-key"))
            .get_pmid("10.1/hit")
            .await
            .unwrap();
        assert_eq!(pmid.as_deref(), Some("37035178"));
    }

    #[tokio::test]
    async fn pubmed_failure_status_is_not_found() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/idconv/")
            .match_query(Matcher::Any)
            .with_status(403)
            .create_async()
            .await;
        server
            .mock("GET", "/esearch.fcgi")
            .match_query(Matcher::Any)
            .with_status(429)
            .create_async()
            .await;

        let err = ncbi(&server, Some("ncbi-key"))
            .get_pmid("10.1/limited")
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Could not find PMID for 10.1/limited");
        assert_eq!(err.details(), Some("Status: 429"));
    }

    #[tokio::test]
    async fn pubmed_malformed_body_is_decode_error() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/idconv/")
            .match_query(Matcher::Any)
            .with_status(404)
            .create_async()
            .await;
        server
            .mock("GET", "/esearch.fcgi")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<eSearchResult><Count>1</Count>")
            .create_async()
            .await;

        let err = ncbi(&server, Some("ncbi-secret"))
            .get_pmid("10.1/x")
            .await
            .unwrap_err();

        match &err {
            SourceError::Decode { url, format, .. } => {
                assert_eq!(*format, ResponseFormat::Xml);
                assert!(url.contains("esearch.fcgi"));
                assert!(!url.contains("ncbi-secret"));
            }
            other => panic!("Expected Decode error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn pubmed_transport_failure_propagates() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/idconv/")
            .match_query(Matcher::Any)
            .with_status(404)
            .create_async()
            .await;

        let source = NcbiSource::with_client(client())
            .with_api_key(Some("ncbi-secret".to_string()))
            .with_base_urls(format!("{}/idconv/", server.url()), refused_url().await);

        let err = source.get_pmid("10.1/x").await.unwrap_err();

        assert_eq!(err.transport_kind(), Some(TransportKind::Connect));
        assert!(!err.to_string().contains("ncbi-secret"));
    }
}

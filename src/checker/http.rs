// src/checker/http.rs
// =============================================================================
// Fetches one URL and records what happened.
//
// Key functionality:
// - Waits for a slot on the shared admission gate before sending anything
// - GET with redirect following and a per-request timeout
// - 200 responses get a content fingerprint (see html.rs)
// - Any other status is recorded as-is; a 404 is a result, not an error
// - Transport failures (timeout, DNS, refused, reset...) become a Failed
//   outcome with a readable cause
//
// check_url never returns an error: whatever happens to one URL stays inside
// that URL's result.
// =============================================================================

use super::gate::AdmissionGate;
use super::html::fingerprint;
use crate::config::ScanConfig;
use crate::model::{FetchOutcome, UrlRecord};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::debug;

/// The outcome of checking one discovered URL, before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlCheck {
    pub record: UrlRecord,
    pub outcome: FetchOutcome,
}

/// Builds the HTTP client shared by the resolver and every check.
///
/// One client means one connection pool for the whole scan.
pub fn build_client(config: &ScanConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
        .build()
}

/// Checks a single URL.
///
/// Parameters:
///   client: shared HTTP client
///   record: the URL (and its sitemap metadata) to check
///   gate: admission gate bounding in-flight checks
///   timeout: limit for the whole request, body included
pub async fn check_url(
    client: &Client,
    record: UrlRecord,
    gate: &AdmissionGate,
    timeout: Duration,
) -> UrlCheck {
    // held until this function returns, whichever way it returns
    let _permit = match gate.acquire().await {
        Ok(permit) => permit,
        Err(_) => {
            return UrlCheck {
                record,
                outcome: FetchOutcome::Failed {
                    error: "Scan is shutting down".to_string(),
                },
            }
        }
    };

    let outcome = match client.get(&record.url).timeout(timeout).send().await {
        Ok(response) => analyze_response(response, timeout).await,
        Err(e) => FetchOutcome::Failed {
            error: describe_error(&e, timeout),
        },
    };

    match &outcome {
        FetchOutcome::Fetched { status, .. } => debug!("{} -> {}", record.url, status),
        FetchOutcome::Failed { error } => debug!("{} -> error: {}", record.url, error),
    }

    UrlCheck { record, outcome }
}

// Reads the final (post-redirect) response.
//
// Only a 200 body is downloaded and parsed; for every other status the
// code alone is the result.
async fn analyze_response(response: reqwest::Response, timeout: Duration) -> FetchOutcome {
    let status = response.status();
    let final_url = response.url().to_string();

    if status != StatusCode::OK {
        return FetchOutcome::Fetched {
            status: status.as_u16(),
            final_url,
            content_hash: None,
        };
    }

    match response.text().await {
        Ok(body) => FetchOutcome::Fetched {
            status: status.as_u16(),
            final_url,
            content_hash: Some(fingerprint(&body)),
        },
        Err(e) => FetchOutcome::Failed {
            error: describe_error(&e, timeout),
        },
    }
}

// Turns a reqwest error into a short human-readable cause.
fn describe_error(error: &reqwest::Error, timeout: Duration) -> String {
    let error_string = error.to_string().to_lowercase();

    if error.is_timeout() {
        format!("Request timed out after {}s", timeout.as_secs_f32())
    } else if error.is_redirect() {
        "Too many redirects".to_string()
    } else if error.is_builder() {
        format!("Invalid URL: {}", error)
    } else if error.is_connect() {
        if error_string.contains("dns") || error_string.contains("resolve") {
            format!("Could not resolve hostname: {}", error)
        } else {
            format!("Connection failed: {}", error)
        }
    } else if error_string.contains("certificate") || error_string.contains("ssl") || error_string.contains("tls") {
        format!("SSL certificate error: {}", error)
    } else if error.is_body() || error.is_decode() {
        format!("Failed to read response body: {}", error)
    } else {
        error.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PAGE: &str = "<html><head><title>T</title></head><body><h1>H</h1></body></html>";

    fn record(url: String) -> UrlRecord {
        UrlRecord::new(url, Some("2024-01-01".to_string()))
    }

    fn client() -> Client {
        build_client(&ScanConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_ok_page_gets_fingerprint() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
            .mount(&server)
            .await;

        let gate = AdmissionGate::new(2);
        let url = format!("{}/page", server.uri());
        let check = check_url(&client(), record(url.clone()), &gate, Duration::from_secs(5)).await;

        assert_eq!(
            check.outcome,
            FetchOutcome::Fetched {
                status: 200,
                final_url: url,
                content_hash: Some(fingerprint(PAGE)),
            }
        );
        assert_eq!(check.record.last_modified, "2024-01-01");
        assert_eq!(gate.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_not_found_is_a_result_not_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(404).set_body_string(PAGE))
            .mount(&server)
            .await;

        let gate = AdmissionGate::new(1);
        let url = format!("{}/gone", server.uri());
        let check = check_url(&client(), record(url.clone()), &gate, Duration::from_secs(5)).await;

        assert_eq!(
            check.outcome,
            FetchOutcome::Fetched {
                status: 404,
                final_url: url,
                content_hash: None,
            }
        );
    }

    #[tokio::test]
    async fn test_redirect_records_final_url() {
        let server = MockServer::start().await;
        let target = format!("{}/new", server.uri());
        Mock::given(method("GET"))
            .and(path("/old"))
            .respond_with(ResponseTemplate::new(301).insert_header("Location", target.as_str()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/new"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
            .mount(&server)
            .await;

        let gate = AdmissionGate::new(1);
        let check = check_url(
            &client(),
            record(format!("{}/old", server.uri())),
            &gate,
            Duration::from_secs(5),
        )
        .await;

        match check.outcome {
            FetchOutcome::Fetched { status, final_url, content_hash } => {
                assert_eq!(status, 200);
                assert_eq!(final_url, target);
                assert!(content_hash.is_some());
            }
            other => panic!("expected a fetch, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_timeout_becomes_failed_outcome() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(PAGE)
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let gate = AdmissionGate::new(1);
        let check = check_url(
            &client(),
            record(format!("{}/slow", server.uri())),
            &gate,
            Duration::from_millis(200),
        )
        .await;

        match check.outcome {
            FetchOutcome::Failed { error } => assert!(error.contains("timed out"), "{}", error),
            other => panic!("expected a failure, got {:?}", other),
        }
        assert_eq!(gate.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_invalid_url_becomes_failed_outcome() {
        let gate = AdmissionGate::new(1);
        let check = check_url(&client(), record("not a url".to_string()), &gate, Duration::from_secs(1)).await;
        assert!(matches!(check.outcome, FetchOutcome::Failed { .. }));
    }

    #[tokio::test]
    async fn test_closed_gate_fails_without_request() {
        let gate = AdmissionGate::new(1);
        gate.close();
        let check = check_url(
            &client(),
            record("http://127.0.0.1:9/".to_string()),
            &gate,
            Duration::from_secs(1),
        )
        .await;
        assert!(matches!(check.outcome, FetchOutcome::Failed { .. }));
    }
}

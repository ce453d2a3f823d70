// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

#[cfg(test)]
mod tests {
    use crate::config::settings::SecSettings;
    use crate::engines::sec_engine::SecEdgarEngine;
    use crate::engines::traits::{FetchError, FilingFetcher};
    use std::time::Duration;
    use wiremock::matchers::{header, headers, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const USER_AGENT: &str = "filingrs-test ops@example.com";

    const ATOM_INDEX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <company-info><conformed-name>BERKSHIRE HATHAWAY INC</conformed-name></company-info>
  <entry>
    <content type="text/xml">
      <accession-number>0000950123-24-011775</accession-number>
      <filing-date>2024-11-14</filing-date>
      <filing-type>13F-HR</filing-type>
    </content>
  </entry>
</feed>"#;

    fn settings(base_url: &str) -> SecSettings {
        SecSettings {
            base_url: base_url.to_string(),
            user_agent: USER_AGENT.to_string(),
            timeout_secs: 1,
            requests_per_second: 50,
            index_count: 40,
            information_table_file: "infotable.xml".to_string(),
        }
    }

    #[test]
    fn test_urls_follow_edgar_layout() {
        let engine = SecEdgarEngine::new(&settings("https://www.sec.gov/")).unwrap();

        assert_eq!(
            engine.index_url("0001067983").unwrap().as_str(),
            "https://www.sec.gov/cgi-bin/browse-edgar?action=getcompany&CIK=0001067983&type=13F-HR&dateb=&owner=include&count=40&output=atom"
        );
        assert_eq!(
            engine
                .document_url("0000950123-24-011775", "0001067983")
                .unwrap()
                .as_str(),
            "https://www.sec.gov/Archives/edgar/data/1067983/000095012324011775/infotable.xml"
        );
        assert!(matches!(
            engine.document_url("0000950123-24-011775", "000"),
            Err(FetchError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_filing_index_sends_identity() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cgi-bin/browse-edgar"))
            .and(query_param("CIK", "0001067983"))
            .and(query_param("output", "atom"))
            .and(header("user-agent", USER_AGENT))
            // wiremock splits comma separated header values
            .and(headers("accept", vec!["application/xml", "text/xml", "text/plain"]))
            .respond_with(ResponseTemplate::new(200).set_body_string(ATOM_INDEX))
            .expect(1)
            .mount(&server)
            .await;

        let engine = SecEdgarEngine::new(&settings(&server.uri())).unwrap();
        let index = engine.fetch_filing_index("0001067983").await.unwrap();

        assert_eq!(index.company_name.as_deref(), Some("BERKSHIRE HATHAWAY INC"));
        assert_eq!(index.references.len(), 1);
        assert_eq!(index.references[0].accession_number, "0000950123-24-011775");
    }

    #[tokio::test]
    async fn test_fetch_filing_document_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(
                "/Archives/edgar/data/1067983/000095012324011775/infotable.xml",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_string("<informationTable/>"))
            .mount(&server)
            .await;

        let engine = SecEdgarEngine::new(&settings(&server.uri())).unwrap();
        let body = engine
            .fetch_filing_document("0000950123-24-011775", "0001067983")
            .await
            .unwrap();

        assert_eq!(body, "<informationTable/>");
    }

    #[tokio::test]
    async fn test_non_200_status_is_retryable_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let engine = SecEdgarEngine::new(&settings(&server.uri())).unwrap();
        let err = engine
            .fetch_filing_document("0000950123-24-011775", "1067983")
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Status { status_code: 503, .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<feed/>")
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let engine = SecEdgarEngine::new(&settings(&server.uri())).unwrap();
        let err = engine.fetch_filing_index("1067983").await.unwrap_err();

        assert!(matches!(err, FetchError::Timeout(_)), "{:?}", err);
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_malformed_index_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<feed><entry>"))
            .mount(&server)
            .await;

        let engine = SecEdgarEngine::new(&settings(&server.uri())).unwrap();
        let err = engine.fetch_filing_index("1067983").await.unwrap_err();

        assert!(matches!(err, FetchError::InvalidIndex(_)));
    }
}

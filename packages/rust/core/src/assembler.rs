//! Tender assembly.
//!
//! Takes one raw listing row, parses its summary fields, enriches them from
//! the detail page when a link is present, and merges both into a canonical
//! [`Tender`]. A detail-page value wins whenever it is present and non-empty.

use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use tenderfeed_crawler::{DetailFields, DetailPageEnricher, Enrichment, PageFetcher};
use tenderfeed_normalize::text::title_case;
use tenderfeed_normalize::{
    ProvisionalFields, RawRow, RowRejection, SummaryRowParser, extract_email,
};
use tenderfeed_shared::{
    PortalConfig, Result, SupportingDocument, Tender, TenderCommon, TenderFeedError,
};

/// Builds canonical tenders from raw listing rows.
#[derive(Debug, Clone)]
pub struct TenderAssembler<F> {
    rows: SummaryRowParser,
    enricher: DetailPageEnricher<F>,
    source: String,
}

impl<F: PageFetcher> TenderAssembler<F> {
    /// Assembler for the portal described by `portal`, fetching detail pages
    /// with `fetcher`.
    pub fn new(portal: &PortalConfig, fetcher: F) -> Result<Self> {
        let origin = Url::parse(&portal.origin).map_err(|e| {
            TenderFeedError::config(format!("invalid portal origin '{}': {e}", portal.origin))
        })?;

        Ok(Self::from_parts(
            SummaryRowParser::new(origin),
            DetailPageEnricher::new(fetcher),
            portal.source.clone(),
        ))
    }

    pub fn from_parts(
        rows: SummaryRowParser,
        enricher: DetailPageEnricher<F>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            rows,
            enricher,
            source: source.into(),
        }
    }

    /// Assemble a feed entry, or `None` if the entry is not a usable row.
    pub async fn assemble(&self, row: &Value) -> Option<Tender> {
        self.try_assemble(row).await.ok()
    }

    /// Like [`assemble`](Self::assemble), but says why a row was rejected.
    pub async fn try_assemble(&self, row: &Value) -> std::result::Result<Tender, RowRejection> {
        let row = RawRow::from_value(row)?;
        Ok(self.assemble_row(&row).await)
    }

    /// Assemble a shape-checked row. Enrichment problems only degrade the
    /// result to summary data.
    #[instrument(skip_all)]
    pub async fn assemble_row(&self, row: &RawRow) -> Tender {
        let provisional = self.rows.parse(row);

        let enrichment = match &provisional.url {
            Some(url) => self.enricher.enrich(url).await,
            None => {
                debug!(
                    tender_number = %provisional.tender_number,
                    "no detail link, skipping enrichment"
                );
                Enrichment::Unavailable {
                    reason: "no detail link".into(),
                }
            }
        };

        merge(provisional, enrichment.into_fields(), &self.source)
    }
}

/// Merge summary and detail values into the canonical record.
pub fn merge(provisional: ProvisionalFields, detail: DetailFields, source: &str) -> Tender {
    let title = prefer(detail.title, provisional.title);
    let description = prefer(detail.description, provisional.description);
    let full_notice_text = prefer(detail.full_notice_text, provisional.full_notice_text);

    let email = extract_email(&full_notice_text);

    let supporting_documents = provisional
        .url
        .map(|url| SupportingDocument::tender_details(url.as_str()))
        .into_iter()
        .collect();

    Tender {
        common: TenderCommon {
            title: title_case(&title),
            description: title_case(&description),
            source: source.to_string(),
            published_date: detail.published_date,
            closing_date: provisional.closing_date,
            supporting_documents,
            tags: Vec::new(),
        },
        tender_number: provisional.tender_number.to_uppercase(),
        category: provisional.category,
        region: provisional.region,
        email,
        full_notice_text: title_case(&full_notice_text),
    }
}

fn prefer(detail: Option<String>, provisional: String) -> String {
    detail
        .filter(|value| !value.trim().is_empty())
        .unwrap_or(provisional)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;

    use chrono::{NaiveDate, NaiveDateTime};
    use serde_json::json;
    use tenderfeed_crawler::FetchResponse;
    use tenderfeed_shared::NOT_AVAILABLE;

    pub(crate) const DETAIL_PAGE: &str = r#"
        <html>
            <div class="page-header"><h2>Road Upgrade Tender</h2></div>
            <h3>Upgrade of N2 Section</h3>
            <table>
                <tr><td>Tender Notice:</td><td>Full tender details including contact info: info@sanral.co.za</td></tr>
                <tr><th>Create Date</th><td>October 10, 2025</td></tr>
            </table>
        </html>
    "#;

    /// Serves canned pages by URL; unknown URLs fail like a dead host.
    #[derive(Debug, Default)]
    pub(crate) struct StubFetcher {
        pages: HashMap<String, FetchResponse>,
    }

    impl StubFetcher {
        pub(crate) fn with_page(mut self, url: &str, status: u16, body: &str) -> Self {
            self.pages.insert(
                url.to_string(),
                FetchResponse {
                    status,
                    body: body.to_string(),
                },
            );
            self
        }
    }

    impl PageFetcher for StubFetcher {
        async fn fetch(&self, url: &Url) -> Result<FetchResponse> {
            self.pages
                .get(url.as_str())
                .cloned()
                .ok_or_else(|| TenderFeedError::Network(format!("{url}: connection refused")))
        }
    }

    pub(crate) fn sample_row() -> Value {
        json!([
            "<a href=\"/tender/123\">RFP123/2025</a>",
            "Construction",
            "KwaZulu-Natal",
            "Tender Notice: Upgrade of N2",
            "Full text info@sanral.co.za",
            "2025/12/31 14:00"
        ])
    }

    fn assembler(fetcher: StubFetcher) -> TenderAssembler<StubFetcher> {
        TenderAssembler::new(&PortalConfig::default(), fetcher).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(y, m, d).and_then(|date| date.and_hms_opt(h, min, 0))
    }

    #[tokio::test]
    async fn assembles_enriched_tender() {
        let fetcher =
            StubFetcher::default().with_page("https://www.nra.co.za/tender/123", 200, DETAIL_PAGE);
        let tender = assembler(fetcher).assemble(&sample_row()).await.expect("tender");

        assert_eq!(tender.tender_number, "RFP123/2025");
        assert_eq!(tender.category, "Construction");
        assert_eq!(tender.region, "Kwazulu-Natal");
        assert_eq!(tender.common.title, "Road Upgrade Tender");
        assert_eq!(tender.common.description, "Upgrade Of N2 Section");
        assert_eq!(tender.common.source, "SANRAL");
        assert_eq!(tender.common.closing_date, at(2025, 12, 31, 14, 0));
        assert_eq!(tender.common.published_date, at(2025, 10, 10, 0, 0));
        assert_eq!(tender.email, "info@sanral.co.za");
        assert_eq!(
            tender.full_notice_text,
            "Full Tender Details Including Contact Info: Info@Sanral.Co.Za"
        );
        assert_eq!(
            tender.common.supporting_documents,
            vec![SupportingDocument::tender_details(
                "https://www.nra.co.za/tender/123"
            )]
        );
        assert!(tender.common.tags.is_empty());
    }

    #[tokio::test]
    async fn short_row_yields_none() {
        let assembler = assembler(StubFetcher::default());
        assert!(assembler.assemble(&json!(["Only one item"])).await.is_none());
        assert!(assembler.assemble(&Value::Null).await.is_none());
        assert_eq!(
            assembler.try_assemble(&json!(["a", "b"])).await.unwrap_err(),
            RowRejection::TooFewFields(2)
        );
    }

    #[tokio::test]
    async fn failed_fetch_keeps_summary_data() {
        let tender = assembler(StubFetcher::default())
            .assemble(&sample_row())
            .await
            .expect("tender despite dead detail page");

        assert_eq!(tender.tender_number, "RFP123/2025");
        assert_eq!(tender.category, "Construction");
        assert_eq!(tender.region, "Kwazulu-Natal");
        assert_eq!(tender.common.title, "Rfp123/2025");
        assert_eq!(tender.common.description, "Upgrade Of N2");
        assert_eq!(tender.common.published_date, None);
        assert_eq!(tender.common.closing_date, at(2025, 12, 31, 14, 0));
        assert_eq!(tender.email, "info@sanral.co.za");
        // The link was still resolved, so the document entry stays.
        assert_eq!(tender.common.supporting_documents.len(), 1);
    }

    #[tokio::test]
    async fn error_status_keeps_summary_data() {
        let fetcher = StubFetcher::default().with_page(
            "https://www.nra.co.za/tender/123",
            500,
            DETAIL_PAGE,
        );
        let tender = assembler(fetcher).assemble(&sample_row()).await.unwrap();
        assert_eq!(tender.common.title, "Rfp123/2025");
        assert_eq!(tender.common.published_date, None);
    }

    #[tokio::test]
    async fn partial_page_overrides_only_what_it_has() {
        let fetcher = StubFetcher::default().with_page(
            "https://www.nra.co.za/tender/123",
            200,
            "<html><body><h3>Better description</h3></body></html>",
        );
        let tender = assembler(fetcher).assemble(&sample_row()).await.unwrap();

        assert_eq!(tender.common.title, "Rfp123/2025");
        assert_eq!(tender.common.description, "Better Description");
        assert_eq!(tender.full_notice_text, "Full Text Info@Sanral.Co.Za");
        assert_eq!(tender.common.published_date, None);
    }

    #[tokio::test]
    async fn row_without_link_skips_enrichment() {
        let row = json!([
            "No link here",
            " consulting ",
            "GAUTENG",
            "Tender Notice: Traffic study",
            "Contact A@First.com then Second@Example.ORG",
            "15/01/2026"
        ]);
        let tender = assembler(StubFetcher::default()).assemble(&row).await.unwrap();

        assert_eq!(tender.tender_number, NOT_AVAILABLE);
        assert_eq!(tender.common.title, "N/A");
        assert_eq!(tender.category, "Consulting");
        assert_eq!(tender.region, "Gauteng");
        assert_eq!(tender.email, "second@example.org");
        assert!(tender.common.supporting_documents.is_empty());
        assert_eq!(tender.common.closing_date, at(2026, 1, 15, 0, 0));
    }

    #[tokio::test]
    async fn identifier_is_upper_cased() {
        let row = json!([
            "<a href=\"/tender/8\">nra x.001-050/1</a>",
            "",
            "",
            "",
            "",
            ""
        ]);
        let tender = assembler(StubFetcher::default()).assemble(&row).await.unwrap();
        assert_eq!(tender.tender_number, "NRA X.001-050/1");
    }

    #[tokio::test]
    async fn email_comes_from_final_notice_text() {
        let page = r#"<table><tr><td>Tender Notice:</td><td>Write to detail@nra.co.za</td></tr></table>"#;
        let fetcher =
            StubFetcher::default().with_page("https://www.nra.co.za/tender/123", 200, page);
        let tender = assembler(fetcher).assemble(&sample_row()).await.unwrap();
        assert_eq!(tender.email, "detail@nra.co.za");
    }

    #[tokio::test]
    async fn assembly_is_idempotent() {
        let fetcher =
            StubFetcher::default().with_page("https://www.nra.co.za/tender/123", 200, DETAIL_PAGE);
        let assembler = assembler(fetcher);

        let first = assembler.assemble(&sample_row()).await.unwrap();
        let second = assembler.assemble(&sample_row()).await.unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn blank_detail_values_do_not_override() {
        let provisional = ProvisionalFields {
            title: "RFP 1".into(),
            description: "Summary".into(),
            full_notice_text: "Notice".into(),
            url: None,
            tender_number: "RFP 1".into(),
            closing_date: None,
            category: "Construction".into(),
            region: "Gauteng".into(),
        };
        let detail = DetailFields {
            title: Some("   ".into()),
            description: Some(String::new()),
            full_notice_text: None,
            published_date: None,
        };

        let tender = merge(provisional, detail, "SANRAL");
        assert_eq!(tender.common.title, "Rfp 1");
        assert_eq!(tender.common.description, "Summary");
        assert_eq!(tender.full_notice_text, "Notice");
    }

    #[test]
    fn invalid_origin_is_config_error() {
        let portal = PortalConfig {
            origin: "not a url".into(),
            ..PortalConfig::default()
        };
        let err = TenderAssembler::new(&portal, StubFetcher::default()).unwrap_err();
        assert!(matches!(err, TenderFeedError::Config { .. }));
    }
}

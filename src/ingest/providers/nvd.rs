// src/ingest/providers/nvd.rs
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use metrics::{counter, histogram};
use serde::Deserialize;

use super::{error_for_status, VulnRecord, VulnerabilityFeed};
use crate::error::SourceFetchError;

pub const NVD_API_URL: &str = "https://services.nvd.nist.gov/rest/json/cves/2.0";

/// Timestamp layout NVD expects for `pubStartDate` / `pubEndDate`.
const NVD_TS_FORMAT: &str = "%Y-%m-%dT%H:%M:%S.000";

#[derive(Debug, Deserialize)]
struct CveResponse {
    #[serde(default)]
    vulnerabilities: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    cve: Cve,
}

#[derive(Debug, Deserialize)]
struct Cve {
    id: String,
    published: Option<String>,
    #[serde(default)]
    descriptions: Vec<Description>,
    #[serde(default)]
    metrics: Metrics,
}

#[derive(Debug, Deserialize)]
struct Description {
    lang: Option<String>,
    value: String,
}

#[derive(Debug, Default, Deserialize)]
struct Metrics {
    #[serde(rename = "cvssMetricV31", default)]
    v31: Vec<CvssMetric>,
    #[serde(rename = "cvssMetricV30", default)]
    v30: Vec<CvssMetric>,
    #[serde(rename = "cvssMetricV2", default)]
    v2: Vec<CvssMetric>,
}

#[derive(Debug, Deserialize)]
struct CvssMetric {
    #[serde(rename = "cvssData")]
    cvss_data: CvssData,
}

#[derive(Debug, Deserialize)]
struct CvssData {
    #[serde(rename = "baseScore")]
    base_score: Option<f64>,
}

impl Cve {
    fn english_description(&self) -> String {
        self.descriptions
            .iter()
            .find(|d| d.lang.as_deref() == Some("en"))
            .or_else(|| self.descriptions.first())
            .map(|d| d.value.trim().to_string())
            .unwrap_or_default()
    }

    /// Newest CVSS version that carries a score wins.
    fn base_score(&self) -> Option<f64> {
        [&self.metrics.v31, &self.metrics.v30, &self.metrics.v2]
            .into_iter()
            .find_map(|m| m.first().and_then(|x| x.cvss_data.base_score))
    }
}

fn parse_nvd_timestamp(ts: &str) -> Option<DateTime<Utc>> {
    // NVD omits the offset; the values are UTC.
    NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
        .or_else(|| DateTime::parse_from_rfc3339(ts).ok().map(|d| d.with_timezone(&Utc)))
}

/// Decode an NVD CVE API 2.0 response body.
pub fn parse_cve_response(body: &str) -> Result<Vec<VulnRecord>, SourceFetchError> {
    let t0 = std::time::Instant::now();
    let resp: CveResponse =
        serde_json::from_str(body).map_err(|e| SourceFetchError::Decode(e.to_string()))?;

    let out: Vec<VulnRecord> = resp
        .vulnerabilities
        .into_iter()
        .map(|entry| {
            let cve = entry.cve;
            VulnRecord {
                description: cve.english_description(),
                score: cve.base_score(),
                published: cve.published.as_deref().and_then(parse_nvd_timestamp),
                id: cve.id,
            }
        })
        .collect();

    histogram!("feed_parse_ms", "source" => "nvd").record(t0.elapsed().as_secs_f64() * 1_000.0);
    Ok(out)
}

pub struct NvdFeed {
    url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl NvdFeed {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            url: NVD_API_URL.to_string(),
            api_key,
            client: reqwest::Client::new(),
        }
    }

    /// Point at a different endpoint (mirrors, tests).
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

#[async_trait]
impl VulnerabilityFeed for NvdFeed {
    async fn published_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<VulnRecord>, SourceFetchError> {
        let params = [
            ("pubStartDate", start.format(NVD_TS_FORMAT).to_string()),
            ("pubEndDate", end.format(NVD_TS_FORMAT).to_string()),
        ];
        let mut req = self.client.get(&self.url).query(&params);
        if let Some(key) = &self.api_key {
            req = req.header("apiKey", key);
        }

        tracing::debug!(start = %params[0].1, end = %params[1].1, "querying NVD");
        let resp = error_for_status(req.send().await?).await?;
        let body = resp.text().await?;
        let records = parse_cve_response(&body)?;
        counter!("feed_items_fetched_total", "source" => "nvd").increment(records.len() as u64);
        Ok(records)
    }
}

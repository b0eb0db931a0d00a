use anyhow::{
  Context,
  bail
};
use async_trait::async_trait;
use tracing::{
  debug,
  warn
};

use crate::record::Record;
use crate::viewer::RecordSource;

/// Fetches the whole record set with a
/// single `GET`; all searching and
/// paging happens locally.
#[derive(Debug, Clone)]
pub struct HttpRecordSource {
  client: reqwest::Client,
  url:    String
}

impl HttpRecordSource {
  pub fn new(
    url: impl Into<String>
  ) -> anyhow::Result<Self> {
    let client =
      reqwest::Client::builder()
        .build()
        .context(
          "failed building HTTP client \
           for record source"
        )?;
    Ok(Self {
      client,
      url: url.into()
    })
  }

  pub fn url(&self) -> &str {
    &self.url
  }
}

#[async_trait]
impl RecordSource for HttpRecordSource {
  #[tracing::instrument(skip(self), fields(url = %self.url))]
  async fn fetch_records(
    &self
  ) -> anyhow::Result<Vec<Record>> {
    let response = self
      .client
      .get(self.url.as_str())
      .header(
        reqwest::header::ACCEPT,
        "application/json"
      )
      .send()
      .await
      .with_context(|| {
        format!(
          "failed requesting records \
           from {}",
          self.url
        )
      })?;

    let status = response.status();
    let body =
      response.text().await.with_context(
        || {
          format!(
            "failed reading record \
             response body from {}",
            self.url
          )
        }
      )?;

    if !status.is_success() {
      warn!(
        %status,
        "record source returned an error status"
      );
      bail!(
        "record source {} answered \
         HTTP {}",
        self.url,
        status
      );
    }

    let records = parse_records(&body)?;
    debug!(
      count = records.len(),
      "fetched records"
    );
    Ok(records)
  }
}

pub fn parse_records(
  body: &str
) -> anyhow::Result<Vec<Record>> {
  serde_json::from_str(body).context(
    "record source did not return a \
     JSON array of records"
  )
}

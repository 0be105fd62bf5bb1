use std::future::Future;
use std::pin::Pin;

use pb_core::eval::{ResponseRecord, ResponseSink, SinkError, RESPONSE_COLUMNS};

// ---------------------------------------------------------------------------
// SheetsSink — append rows to a remote spreadsheet
// ---------------------------------------------------------------------------

/// Appends responses to a fixed spreadsheet/sheet through the values HTTP
/// API, authenticating with a static bearer credential. The header row is
/// written only when the sheet is currently empty. Auth and network
/// failures propagate unretried; the caller decides what a failed
/// submission means.
pub struct SheetsSink {
    http: reqwest::Client,
    api_base: String,
    spreadsheet_id: String,
    sheet_name: String,
    credential: String,
}

impl SheetsSink {
    pub fn new(
        api_base: impl Into<String>,
        spreadsheet_id: impl Into<String>,
        sheet_name: impl Into<String>,
        credential: impl Into<String>,
    ) -> Self {
        let api_base: String = api_base.into();
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_owned(),
            spreadsheet_id: spreadsheet_id.into(),
            sheet_name: sheet_name.into(),
            credential: credential.into(),
        }
    }

    fn values_base(&self) -> String {
        format!(
            "{}/v4/spreadsheets/{}/values",
            self.api_base, self.spreadsheet_id
        )
    }

    async fn sheet_is_empty(&self) -> Result<bool, SinkError> {
        let url = format!("{}/{}!A1:K1", self.values_base(), self.sheet_name);
        let resp = self
            .http
            .get(&url)
            .bearer_auth(&self.credential)
            .send()
            .await
            .map_err(connection_error)?;

        if !resp.status().is_success() {
            return Err(http_status_error(resp).await);
        }

        let body: serde_json::Value = resp.json().await.map_err(connection_error)?;
        // The values API omits the "values" field entirely for an empty range.
        Ok(body
            .get("values")
            .and_then(serde_json::Value::as_array)
            .is_none_or(|rows| rows.is_empty()))
    }

    async fn append_values(&self, values: Vec<Vec<String>>) -> Result<(), SinkError> {
        let url = format!(
            "{}/{}!A1:append?valueInputOption=RAW",
            self.values_base(),
            self.sheet_name
        );
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.credential)
            .json(&serde_json::json!({ "values": values }))
            .send()
            .await
            .map_err(connection_error)?;

        if !resp.status().is_success() {
            return Err(http_status_error(resp).await);
        }
        Ok(())
    }
}

impl ResponseSink for SheetsSink {
    fn append<'a>(
        &'a self,
        rows: &'a [ResponseRecord],
    ) -> Pin<Box<dyn Future<Output = Result<usize, SinkError>> + Send + 'a>> {
        Box::pin(async move {
            if rows.is_empty() {
                return Ok(0);
            }

            if self.sheet_is_empty().await? {
                let header = RESPONSE_COLUMNS.iter().map(|c| (*c).to_owned()).collect();
                self.append_values(vec![header]).await?;
            }

            let values: Vec<Vec<String>> = rows.iter().map(|r| r.to_row().to_vec()).collect();
            self.append_values(values).await?;

            tracing::info!(
                rows = rows.len(),
                spreadsheet = %self.spreadsheet_id,
                sheet = %self.sheet_name,
                "appended responses to spreadsheet"
            );
            Ok(rows.len())
        })
    }
}

fn connection_error(err: reqwest::Error) -> SinkError {
    SinkError::Connection(err.to_string())
}

async fn http_status_error(resp: reqwest::Response) -> SinkError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    SinkError::HttpStatus { status, body }
}

use reqwest::blocking::{Client, Response};
use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::{Result, StoreError};
use crate::table::Table;
use crate::TableStore;

const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Google Sheets workbook addressed through the v4 values API.
///
/// The bearer token is taken as given; obtaining it is left to the caller.
pub struct SheetsWorkbook {
    http: Client,
    base_url: String,
    spreadsheet_id: String,
    token: SecretString,
}

impl SheetsWorkbook {
    /// Connects and verifies that the spreadsheet metadata is reachable.
    pub fn connect(spreadsheet_id: impl Into<String>, token: SecretString) -> Result<Self> {
        Self::connect_with_base(DEFAULT_BASE_URL, spreadsheet_id, token)
    }

    pub fn connect_with_base(
        base_url: &str,
        spreadsheet_id: impl Into<String>,
        token: SecretString,
    ) -> Result<Self> {
        let book = Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            spreadsheet_id: spreadsheet_id.into(),
            token,
        };
        let titles = book.sheet_titles()?;
        info!(
            spreadsheet = %book.spreadsheet_id,
            sheets = titles.len(),
            "connected to spreadsheet"
        );
        Ok(book)
    }

    /// Titles of every worksheet in the spreadsheet.
    pub fn sheet_titles(&self) -> Result<Vec<String>> {
        let mut url = self.spreadsheet_url("", &[])?;
        url.query_pairs_mut()
            .append_pair("fields", "sheets.properties.title");
        let response = self.send(self.http.get(url))?;
        let meta: SpreadsheetMeta = decode_json(response)?;
        Ok(meta
            .sheets
            .into_iter()
            .map(|sheet| sheet.properties.title)
            .collect())
    }

    fn ensure_sheet(&self, sheet: &str) -> Result<()> {
        if self.sheet_titles()?.iter().any(|title| title == sheet) {
            return Ok(());
        }
        let url = self.spreadsheet_url(":batchUpdate", &[])?;
        let body = json!({
            "requests": [{ "addSheet": { "properties": { "title": sheet } } }]
        });
        self.send(self.http.post(url).json(&body))?;
        info!(sheet, "created worksheet");
        Ok(())
    }

    fn spreadsheet_url(&self, suffix: &str, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/", self.base_url))
            .map_err(|err| StoreError::Decode(format!("invalid sheets base url: {err}")))?;
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| StoreError::Decode("sheets base url cannot be a base".into()))?;
            path.pop_if_empty();
            path.push(&format!("{}{}", self.spreadsheet_id, suffix));
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    fn send(&self, request: reqwest::blocking::RequestBuilder) -> Result<Response> {
        let response = request
            .bearer_auth(self.token.expose_secret())
            .send()
            .map_err(|err| StoreError::Connection {
                location: self.location(),
                reason: err.to_string(),
            })?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        if status.as_u16() == 400 && body.contains("Unable to parse range") {
            return Err(StoreError::SheetNotFound(body));
        }
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(StoreError::Connection {
                location: self.location(),
                reason: format!("access denied (status {status})"),
            });
        }
        Err(StoreError::Http {
            status: status.as_u16(),
            body,
        })
    }
}

impl TableStore for SheetsWorkbook {
    fn load(&self, sheet: &str) -> Result<Table> {
        let url = self.spreadsheet_url("", &["values", &quote_sheet(sheet)])?;
        let response = self.send(self.http.get(url)).map_err(|err| match err {
            StoreError::SheetNotFound(_) => StoreError::SheetNotFound(sheet.to_string()),
            other => other,
        })?;
        let range: ValueRange = decode_json(response)?;
        let table = Table::from_grid(grid_from_values(range.values));
        debug!(sheet, rows = table.len(), "loaded worksheet");
        Ok(table)
    }

    fn replace(&self, sheet: &str, table: &Table) -> Result<()> {
        self.ensure_sheet(sheet)?;
        let range = quote_sheet(sheet);
        let clear = self.spreadsheet_url("", &["values", &format!("{range}:clear")])?;
        self.send(self.http.post(clear).json(&json!({})))?;

        let target = format!("{range}!A1");
        let mut update = self.spreadsheet_url("", &["values", &target])?;
        update
            .query_pairs_mut()
            .append_pair("valueInputOption", "RAW");
        let body = json!({
            "range": target,
            "majorDimension": "ROWS",
            "values": table.to_grid(),
        });
        self.send(self.http.put(update).json(&body))?;
        debug!(sheet, rows = table.len(), "replaced worksheet");
        Ok(())
    }

    fn location(&self) -> String {
        format!("sheets:{}", self.spreadsheet_id)
    }
}

/// A1 notation needs sheet titles quoted; embedded quotes are doubled.
fn quote_sheet(sheet: &str) -> String {
    format!("'{}'", sheet.replace('\'', "''"))
}

fn grid_from_values(values: Vec<Vec<Value>>) -> Vec<Vec<String>> {
    values
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|cell| match cell {
                    Value::String(text) => text,
                    Value::Null => String::new(),
                    other => other.to_string(),
                })
                .collect()
        })
        .collect()
}

fn decode_json<T: for<'de> Deserialize<'de>>(response: Response) -> Result<T> {
    let body = response
        .text()
        .map_err(|err| StoreError::Decode(err.to_string()))?;
    serde_json::from_str(&body).map_err(|err| StoreError::Decode(err.to_string()))
}

#[derive(Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Deserialize)]
struct SheetProperties {
    title: String,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

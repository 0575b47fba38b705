//! Google Drive v3 implementation of [`RemoteStore`].
//!
//! We talk to the REST API directly with a blocking `reqwest` client: the pipeline is
//! sequential, so there is nothing for an async runtime to overlap.

use std::fs;
use std::path::Path;

use anyhow::{Context, anyhow};
use reqwest::Url;
use reqwest::blocking::{Client, Response};
use serde::Deserialize;
use tracing::debug;

use crate::remote::{ListPage, RemoteItem, RemoteItemKind, RemoteStore};
use crate::service_account::{DRIVE_READONLY_SCOPE, ServiceAccountAuth, ServiceAccountKey};
use crate::{Error, Result};

/// Files endpoint of the Drive v3 API.
pub const DRIVE_FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";

const LIST_FIELDS: &str = "nextPageToken, files(id, name, mimeType)";
const PAGE_SIZE: &str = "1000";

/// How requests to Drive are authorized.
#[derive(Debug, Clone)]
pub enum Credentials {
    /// A bearer token obtained elsewhere, used as-is.
    AccessToken(String),
    /// A service-account key, exchanged for tokens on demand.
    ServiceAccount(ServiceAccountKey),
}

enum Auth {
    Bearer(String),
    ServiceAccount(ServiceAccountAuth),
}

/// Authenticated Drive client.
pub struct DriveClient {
    client: Client,
    auth: Auth,
    files_url: String,
}

impl DriveClient {
    /// Build a client that authenticates every request with `access_token`.
    pub fn new(access_token: impl Into<String>) -> Result<Self> {
        Self::from_credentials(Credentials::AccessToken(access_token.into()))
    }

    /// Build a client for either kind of [`Credentials`].
    ///
    /// Service accounts are granted [`DRIVE_READONLY_SCOPE`].
    pub fn from_credentials(credentials: Credentials) -> Result<Self> {
        let client = Client::builder()
            .user_agent("scanscribe")
            .build()
            .context("failed to build HTTP client")?;

        let auth = match credentials {
            Credentials::AccessToken(token) => Auth::Bearer(token),
            Credentials::ServiceAccount(key) => Auth::ServiceAccount(ServiceAccountAuth::new(
                key,
                DRIVE_READONLY_SCOPE,
                client.clone(),
            )?),
        };

        Ok(Self {
            client,
            auth,
            files_url: DRIVE_FILES_URL.to_owned(),
        })
    }

    /// Build a client from a credentials file (see [`read_credentials`]).
    pub fn from_credentials_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_credentials(read_credentials(path)?)
    }

    /// Point the client at a different files endpoint (e.g. a local test server).
    pub fn with_files_url(mut self, files_url: impl Into<String>) -> Self {
        self.files_url = files_url.into();
        self
    }

    fn bearer_token(&self) -> Result<String> {
        match &self.auth {
            Auth::Bearer(token) => Ok(token.clone()),
            Auth::ServiceAccount(auth) => auth.access_token(),
        }
    }

    fn get(&self, url: Url) -> Result<Response> {
        let token = self.bearer_token()?;
        let resp = self
            .client
            .get(url.clone())
            .bearer_auth(token)
            .send()
            .with_context(|| format!("request failed: {url}"))?
            .error_for_status()
            .with_context(|| format!("request failed (bad status): {url}"))?;
        Ok(resp)
    }
}

impl RemoteStore for DriveClient {
    fn list_children(&self, folder_id: &str, page_token: Option<&str>) -> Result<ListPage> {
        let url = list_url(&self.files_url, folder_id, page_token)?;
        debug!(folder_id, ?page_token, "listing folder page");

        let body = self.get(url)?.bytes()?;
        let list: FileList = serde_json::from_slice(&body)?;
        Ok(list.into())
    }

    fn fetch_bytes(&self, file_id: &str) -> Result<Vec<u8>> {
        let url = Url::parse_with_params(
            &format!("{}/{}", self.files_url.trim_end_matches('/'), file_id),
            &[("alt", "media"), ("supportsAllDrives", "true")],
        )
        .map_err(|err| Error::msg(format!("invalid download URL for '{file_id}': {err}")))?;

        let body = self.get(url)?.bytes()?;
        Ok(body.to_vec())
    }
}

/// Build the listing URL for one page of `folder_id`'s non-trashed children.
fn list_url(files_url: &str, folder_id: &str, page_token: Option<&str>) -> Result<Url> {
    let query = children_query(folder_id);
    let mut params = vec![
        ("q", query.as_str()),
        ("fields", LIST_FIELDS),
        ("pageSize", PAGE_SIZE),
        ("supportsAllDrives", "true"),
        ("includeItemsFromAllDrives", "true"),
    ];
    if let Some(token) = page_token {
        params.push(("pageToken", token));
    }

    Url::parse_with_params(files_url, &params)
        .map_err(|err| Error::msg(format!("invalid listing URL '{files_url}': {err}")))
}

fn children_query(folder_id: &str) -> String {
    let escaped = folder_id.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{escaped}' in parents and trashed = false")
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    name: String,
    #[serde(default)]
    mime_type: String,
}

impl From<FileList> for ListPage {
    fn from(list: FileList) -> Self {
        let items = list
            .files
            .into_iter()
            .map(|f| RemoteItem {
                kind: RemoteItemKind::from_mime_type(&f.mime_type),
                id: f.id,
                name: f.name,
            })
            .collect();

        Self {
            items,
            next_page_token: list.next_page_token.filter(|t| !t.is_empty()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CredentialsFile {
    access_token: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

/// Read Drive credentials from `path`.
///
/// Accepted formats:
/// - a service-account key file (`"type": "service_account"`)
/// - JSON with an `access_token` field (e.g. a saved OAuth token response)
/// - a plain-text file containing only the token
pub fn read_credentials(path: impl AsRef<Path>) -> Result<Credentials> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read credentials file: {}", path.display()))?;
    Ok(parse_credentials(&raw).with_context(|| format!("in {}", path.display()))?)
}

fn parse_credentials(raw: &str) -> anyhow::Result<Credentials> {
    let trimmed = raw.trim();
    if trimmed.starts_with('{') {
        let creds: CredentialsFile =
            serde_json::from_str(trimmed).context("credentials file is not valid JSON")?;
        if let Some(token) = creds.access_token.filter(|t| !t.trim().is_empty()) {
            return Ok(Credentials::AccessToken(token.trim().to_owned()));
        }
        if creds.kind.as_deref() == Some("service_account") {
            let key = ServiceAccountKey::from_json(trimmed).map_err(|err| anyhow!("{err}"))?;
            return Ok(Credentials::ServiceAccount(key));
        }
        return Err(anyhow!(
            "credentials JSON is neither a service account key nor has an 'access_token' field"
        ));
    }

    if trimmed.is_empty() {
        return Err(anyhow!("credentials file is empty"));
    }
    Ok(Credentials::AccessToken(trimmed.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_list_maps_folders_and_files() -> anyhow::Result<()> {
        let body = r#"{
            "nextPageToken": "tok-2",
            "files": [
                {"id": "f1", "name": "scan.PNG", "mimeType": "image/png"},
                {"id": "d1", "name": "Box 2", "mimeType": "application/vnd.google-apps.folder"}
            ]
        }"#;
        let page: ListPage = serde_json::from_str::<FileList>(body)?.into();

        assert_eq!(page.next_page_token.as_deref(), Some("tok-2"));
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].kind, RemoteItemKind::File);
        assert_eq!(page.items[0].name, "scan.PNG");
        assert_eq!(page.items[1].kind, RemoteItemKind::Folder);
        assert_eq!(page.items[1].id, "d1");
        Ok(())
    }

    #[test]
    fn empty_page_token_means_last_page() -> anyhow::Result<()> {
        let page: ListPage = serde_json::from_str::<FileList>(r#"{"nextPageToken": ""}"#)?.into();
        assert!(page.items.is_empty());
        assert!(page.next_page_token.is_none());
        Ok(())
    }

    #[test]
    fn list_url_filters_to_non_trashed_children() -> anyhow::Result<()> {
        let url = list_url(DRIVE_FILES_URL, "abc'd", Some("next"))?;
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        assert!(pairs.contains(&(
            "q".to_string(),
            "'abc\\'d' in parents and trashed = false".to_string()
        )));
        assert!(pairs.contains(&("pageToken".to_string(), "next".to_string())));
        assert!(pairs.contains(&("fields".to_string(), LIST_FIELDS.to_string())));
        Ok(())
    }

    #[test]
    fn list_url_omits_token_on_first_page() -> anyhow::Result<()> {
        let url = list_url(DRIVE_FILES_URL, "root", None)?;
        assert!(!url.query_pairs().any(|(k, _)| k == "pageToken"));
        Ok(())
    }

    fn bearer(creds: Credentials) -> String {
        match creds {
            Credentials::AccessToken(token) => token,
            other => panic!("expected an access token, got {other:?}"),
        }
    }

    #[test]
    fn access_token_from_json_or_plain_text() -> anyhow::Result<()> {
        assert_eq!(
            bearer(parse_credentials(
                r#"{"access_token": "ya29.abc", "expires_in": 3599}"#
            )?),
            "ya29.abc"
        );
        assert_eq!(bearer(parse_credentials("  ya29.plain\n")?), "ya29.plain");
        assert!(parse_credentials("   ").is_err());
        Ok(())
    }

    #[test]
    fn service_account_key_file_is_accepted() -> anyhow::Result<()> {
        let creds = parse_credentials(include_str!("../tests/fixtures/service_account.json"))?;
        match &creds {
            Credentials::ServiceAccount(key) => {
                assert_eq!(key.client_email, "scanner@scanscribe-test.iam.gserviceaccount.com");
            }
            other => panic!("expected a service account, got {other:?}"),
        }

        // The key is checked when the client is built, before any request is made.
        DriveClient::from_credentials(creds)?;
        Ok(())
    }

    #[test]
    fn service_account_key_without_private_key_is_rejected() {
        let err = parse_credentials(r#"{"type": "service_account", "client_email": "a@b"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("private_key"));
    }

    #[test]
    fn unrecognized_credentials_json_is_rejected() {
        let err = parse_credentials(r#"{"type": "authorized_user"}"#).unwrap_err();
        assert!(err.to_string().contains("neither a service account key"));
    }

    #[test]
    fn read_credentials_reports_missing_file() {
        let err = read_credentials("/definitely/not/here.json").unwrap_err();
        assert!(err.to_string().contains("failed to read credentials file"));
    }
}

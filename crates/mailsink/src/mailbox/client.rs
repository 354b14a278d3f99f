//! HTTP client for the remote mailbox API.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use log::{debug, warn};
use reqwest::{Client, Url};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::error::{MailboxError, Result};
use super::token::{create_http_client, sanitize_error_body, TokenManager};

/// Default API base.
const GRAPH_API_BASE: &str = "https://graph.microsoft.com/v1.0";

/// Message fields the pipeline consumes; the listing requests exactly these.
const MESSAGE_SELECT_FIELDS: &str = "id,subject,from,receivedDateTime,hasAttachments,parentFolderId";

/// Page size for message listings.
const MESSAGE_PAGE_SIZE: &str = "999";

/// Page size for folder listings.
const FOLDER_PAGE_SIZE: &str = "100";

/// The narrow mailbox capability the pipeline consumes. Implementations own
/// wire protocol, pagination, and authentication.
#[async_trait]
pub trait MailboxApi: Send + Sync {
    /// Maps a folder display name to its id, searching top-level folders and
    /// then the children of the default inbox. Returns `None` when neither
    /// search finds a case-insensitive match.
    async fn resolve_folder(&self, display_name: &str) -> Result<Option<String>>;

    /// Lists the messages in a folder matching a server-side filter.
    async fn list_messages(&self, folder_id: &str, filter: &str) -> Result<Vec<Message>>;

    /// Lists the attachments of a message.
    async fn list_attachments(&self, message_id: &str) -> Result<Vec<Attachment>>;

    /// Moves a message into another folder.
    async fn move_message(&self, message_id: &str, destination_id: &str) -> Result<()>;
}

/// A message as returned by the listing call. Immutable once fetched; owned
/// by the pipeline for the duration of one run.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub from: Option<Recipient>,
    #[serde(default)]
    pub received_date_time: Option<String>,
    #[serde(default)]
    pub has_attachments: Option<bool>,
    #[serde(default)]
    pub parent_folder_id: Option<String>,
}

impl Message {
    /// The sender address, when present and non-empty.
    pub fn sender_address(&self) -> Option<&str> {
        self.from
            .as_ref()?
            .email_address
            .as_ref()?
            .address
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    #[serde(default)]
    pub email_address: Option<EmailAddress>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailAddress {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

/// An attachment of a message. `content_bytes` is the base64-encoded payload
/// and is absent for non-file attachment kinds.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub content_bytes: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

impl Attachment {
    /// Decodes the raw payload. Returns `None` when the attachment carries no
    /// retrievable content (non-file kinds, or a payload that fails to
    /// decode).
    pub fn content(&self) -> Option<Vec<u8>> {
        let raw = self.content_bytes.as_deref()?;
        match BASE64.decode(raw) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!(
                    "Attachment '{}' has undecodable content, skipping: {}",
                    self.id, e
                );
                None
            }
        }
    }
}

/// A mail folder as returned by the folder listing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailFolder {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
struct FolderPage {
    #[serde(default)]
    value: Vec<MailFolder>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessagePage {
    #[serde(default)]
    value: Vec<Message>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AttachmentPage {
    #[serde(default)]
    value: Vec<Attachment>,
}

/// Case-insensitive display-name lookup.
fn match_folder<'a>(folders: &'a [MailFolder], display_name: &str) -> Option<&'a MailFolder> {
    folders
        .iter()
        .find(|f| f.display_name.eq_ignore_ascii_case(display_name))
}

/// reqwest-based implementation of [`MailboxApi`] against the Microsoft
/// Graph mail endpoints, with a bearer token per request from the token
/// manager.
pub struct GraphMailClient {
    http: Client,
    base_url: String,
    mailbox: String,
    tokens: TokenManager,
}

impl GraphMailClient {
    /// Creates a client for the given mailbox. `base_url` overrides the
    /// default API base (used for tests and sovereign clouds).
    pub fn new(mailbox: &str, tokens: TokenManager, base_url: Option<String>) -> Result<Self> {
        if mailbox.trim().is_empty() {
            return Err(MailboxError::Config(
                "Target mailbox must not be empty".into(),
            ));
        }

        let base_url = base_url
            .unwrap_or_else(|| GRAPH_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            http: create_http_client()?,
            base_url,
            mailbox: mailbox.to_string(),
            tokens,
        })
    }

    /// The mailbox this client reads from.
    pub fn mailbox(&self) -> &str {
        &self.mailbox
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let token = self.tokens.access_token().await?;
        debug!("GET {}", url);

        let response = self
            .http
            .get(url)
            .bearer_auth(token.expose_secret())
            .header("accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(MailboxError::Api {
                status: status.as_u16(),
                body: sanitize_error_body(&body),
            });
        }

        serde_json::from_str(&body).map_err(|e| MailboxError::Decode(e.to_string()))
    }

    async fn list_top_level_folders(&self) -> Result<Vec<MailFolder>> {
        let url = format!("{}/users/{}/mailFolders", self.base_url, self.mailbox);
        self.collect_folder_pages(&url).await
    }

    async fn list_child_folders(&self, folder_id: &str) -> Result<Vec<MailFolder>> {
        let url = format!(
            "{}/users/{}/mailFolders/{}/childFolders",
            self.base_url, self.mailbox, folder_id
        );
        self.collect_folder_pages(&url).await
    }

    async fn collect_folder_pages(&self, endpoint: &str) -> Result<Vec<MailFolder>> {
        let mut url = Url::parse(endpoint)
            .map_err(|e| MailboxError::Config(format!("Invalid folder URL '{}': {}", endpoint, e)))?;
        url.query_pairs_mut().append_pair("$top", FOLDER_PAGE_SIZE);

        let mut folders = Vec::new();
        let mut next = url.to_string();
        loop {
            let page: FolderPage = self.get_json(&next).await?;
            folders.extend(page.value);
            match page.next_link {
                Some(link) => next = link,
                None => break,
            }
        }
        Ok(folders)
    }
}

#[async_trait]
impl MailboxApi for GraphMailClient {
    async fn resolve_folder(&self, display_name: &str) -> Result<Option<String>> {
        if display_name.trim().is_empty() {
            return Ok(None);
        }

        let folders = self.list_top_level_folders().await?;
        if let Some(folder) = match_folder(&folders, display_name) {
            return Ok(Some(folder.id.clone()));
        }

        // Not a top-level folder; look among the children of the inbox.
        let Some(inbox) = match_folder(&folders, "Inbox") else {
            return Ok(None);
        };
        let children = self.list_child_folders(&inbox.id).await?;
        Ok(match_folder(&children, display_name).map(|f| f.id.clone()))
    }

    async fn list_messages(&self, folder_id: &str, filter: &str) -> Result<Vec<Message>> {
        let endpoint = format!(
            "{}/users/{}/mailFolders/{}/messages",
            self.base_url, self.mailbox, folder_id
        );
        let mut url = Url::parse(&endpoint)
            .map_err(|e| MailboxError::Config(format!("Invalid message URL '{}': {}", endpoint, e)))?;
        url.query_pairs_mut()
            .append_pair("$filter", filter)
            .append_pair("$select", MESSAGE_SELECT_FIELDS)
            .append_pair("$orderby", "receivedDateTime desc")
            .append_pair("$top", MESSAGE_PAGE_SIZE);

        let mut messages = Vec::new();
        let mut next = url.to_string();
        loop {
            let page: MessagePage = self.get_json(&next).await?;
            messages.extend(page.value);
            match page.next_link {
                Some(link) => next = link,
                None => break,
            }
        }
        Ok(messages)
    }

    async fn list_attachments(&self, message_id: &str) -> Result<Vec<Attachment>> {
        let url = format!(
            "{}/users/{}/messages/{}/attachments",
            self.base_url, self.mailbox, message_id
        );
        let page: AttachmentPage = self.get_json(&url).await?;
        Ok(page.value)
    }

    async fn move_message(&self, message_id: &str, destination_id: &str) -> Result<()> {
        let url = format!(
            "{}/users/{}/messages/{}/move",
            self.base_url, self.mailbox, message_id
        );
        let token = self.tokens.access_token().await?;

        let response = self
            .http
            .post(&url)
            .bearer_auth(token.expose_secret())
            .json(&serde_json::json!({ "destinationId": destination_id }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailboxError::Api {
                status: status.as_u16(),
                body: sanitize_error_body(&body),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    #[test]
    fn test_message_page_deserializes() {
        let payload = r#"{
            "value": [{
                "id": "msg-1",
                "subject": "Invoice",
                "from": { "emailAddress": { "name": "Alex", "address": "alex@example.com" } },
                "receivedDateTime": "2026-01-01T12:00:00Z",
                "hasAttachments": true,
                "parentFolderId": "folder-1"
            }],
            "@odata.nextLink": "https://example.test/page2"
        }"#;

        let page: MessagePage = serde_json::from_str(payload).unwrap();
        assert_eq!(page.value.len(), 1);
        assert_eq!(page.value[0].id, "msg-1");
        assert_eq!(page.value[0].sender_address(), Some("alex@example.com"));
        assert_eq!(page.value[0].has_attachments, Some(true));
        assert_eq!(page.next_link.as_deref(), Some("https://example.test/page2"));
    }

    #[test]
    fn test_sender_address_absent_or_empty() {
        let message = Message::default();
        assert_eq!(message.sender_address(), None);

        let message: Message = serde_json::from_str(
            r#"{"id":"m","from":{"emailAddress":{"address":"  "}}}"#,
        )
        .unwrap();
        assert_eq!(message.sender_address(), None);
    }

    #[test]
    fn test_attachment_content_decodes_base64() {
        let attachment: Attachment = serde_json::from_str(
            r#"{"id":"att-1","name":"hello.txt","contentBytes":"aGVsbG8=","size":5}"#,
        )
        .unwrap();
        assert_eq!(attachment.content().unwrap(), b"hello");
    }

    #[test]
    fn test_attachment_without_content_is_none() {
        let attachment: Attachment =
            serde_json::from_str(r#"{"id":"att-1","name":"item"}"#).unwrap();
        assert!(attachment.content().is_none());
    }

    #[test]
    fn test_attachment_with_bad_base64_is_none() {
        let attachment = Attachment {
            id: "att-1".to_string(),
            content_bytes: Some("!!! not base64 !!!".to_string()),
            ..Default::default()
        };
        assert!(attachment.content().is_none());
    }

    #[test]
    fn test_match_folder_is_case_insensitive() {
        let folders = vec![
            MailFolder {
                id: "f1".into(),
                display_name: "Inbox".into(),
            },
            MailFolder {
                id: "f2".into(),
                display_name: "Import".into(),
            },
        ];
        assert_eq!(match_folder(&folders, "import").unwrap().id, "f2");
        assert_eq!(match_folder(&folders, "INBOX").unwrap().id, "f1");
        assert!(match_folder(&folders, "Archive").is_none());
    }

    #[test]
    fn test_client_rejects_empty_mailbox() {
        let tokens = TokenManager::new(
            "tenant",
            "client",
            SecretString::from("secret".to_string()),
            None,
        )
        .unwrap();
        let result = GraphMailClient::new("", tokens, None);
        assert!(matches!(result, Err(MailboxError::Config(_))));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let tokens = TokenManager::new(
            "tenant",
            "client",
            SecretString::from("secret".to_string()),
            None,
        )
        .unwrap();
        let client = GraphMailClient::new(
            "user@example.com",
            tokens,
            Some("https://localhost:1234/v1.0/".to_string()),
        )
        .unwrap();
        assert_eq!(client.base_url, "https://localhost:1234/v1.0");
    }
}

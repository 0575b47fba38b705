use crate::Result;

/// MIME type the remote store uses to mark folder entries.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteItemKind {
    Folder,
    File,
}

impl RemoteItemKind {
    pub fn from_mime_type(mime_type: &str) -> Self {
        if mime_type == FOLDER_MIME_TYPE {
            Self::Folder
        } else {
            Self::File
        }
    }
}

/// One child entry of a remote folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteItem {
    pub id: String,
    pub name: String,
    pub kind: RemoteItemKind,
}

/// A single page of a folder listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    pub items: Vec<RemoteItem>,

    /// Opaque continuation token; `None` means this was the last page.
    pub next_page_token: Option<String>,
}

/// Capability for reading a remote folder tree.
///
/// This is the only handle discovery and fetching get to the remote service; it is passed
/// explicitly to every component that needs it.
pub trait RemoteStore {
    /// List one page of the non-trashed direct children of `folder_id`.
    fn list_children(&self, folder_id: &str, page_token: Option<&str>) -> Result<ListPage>;

    /// Download the full contents of `file_id`.
    fn fetch_bytes(&self, file_id: &str) -> Result<Vec<u8>>;
}

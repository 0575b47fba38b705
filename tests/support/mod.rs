#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;

use image::{GrayImage, ImageFormat, Luma};
use scanscribe::{
    Error, ListPage, OcrBackend, OcrPage, OcrToken, RemoteItem, RemoteItemKind, RemoteStore,
    Result,
};

/// In-memory remote folder tree with call counters.
#[derive(Default)]
pub struct FakeDrive {
    /// Pages of children per folder id, served in order.
    folders: HashMap<String, Vec<Vec<RemoteItem>>>,
    files: HashMap<String, Vec<u8>>,
    failing_folders: Vec<String>,
    pub list_calls: Cell<usize>,
    pub fetch_calls: Cell<usize>,
    pub listed: RefCell<Vec<(String, Option<String>)>>,
}

impl FakeDrive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `folder_id` with its children split into `pages`.
    pub fn folder(mut self, folder_id: &str, pages: Vec<Vec<RemoteItem>>) -> Self {
        self.folders.insert(folder_id.to_string(), pages);
        self
    }

    pub fn file_bytes(mut self, file_id: &str, bytes: Vec<u8>) -> Self {
        self.files.insert(file_id.to_string(), bytes);
        self
    }

    pub fn failing_folder(mut self, folder_id: &str) -> Self {
        self.failing_folders.push(folder_id.to_string());
        self
    }
}

impl RemoteStore for FakeDrive {
    fn list_children(&self, folder_id: &str, page_token: Option<&str>) -> Result<ListPage> {
        self.list_calls.set(self.list_calls.get() + 1);
        self.listed
            .borrow_mut()
            .push((folder_id.to_string(), page_token.map(str::to_string)));

        if self.failing_folders.iter().any(|f| f == folder_id) {
            return Err(Error::Message(format!("listing {folder_id} timed out")));
        }

        let pages = self.folders.get(folder_id).cloned().unwrap_or_default();
        let index = match page_token {
            None => 0,
            Some(token) => token
                .strip_prefix("page-")
                .and_then(|n| n.parse::<usize>().ok())
                .ok_or_else(|| Error::Message(format!("bad page token {token}")))?,
        };

        let items = pages.get(index).cloned().unwrap_or_default();
        let next_page_token = (index + 1 < pages.len()).then(|| format!("page-{}", index + 1));
        Ok(ListPage {
            items,
            next_page_token,
        })
    }

    fn fetch_bytes(&self, file_id: &str) -> Result<Vec<u8>> {
        self.fetch_calls.set(self.fetch_calls.get() + 1);
        self.files
            .get(file_id)
            .cloned()
            .ok_or_else(|| Error::Message(format!("file {file_id} not found")))
    }
}

pub fn file(id: &str, name: &str) -> RemoteItem {
    RemoteItem {
        id: id.to_string(),
        name: name.to_string(),
        kind: RemoteItemKind::File,
    }
}

pub fn folder(id: &str) -> RemoteItem {
    RemoteItem {
        id: id.to_string(),
        name: format!("folder {id}"),
        kind: RemoteItemKind::Folder,
    }
}

/// OCR backend returning canned output and counting invocations.
pub struct CountingBackend {
    pub text: String,
    pub tokens: Vec<OcrToken>,
    pub calls: usize,
}

impl CountingBackend {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            tokens: vec![OcrToken::new("hello", 90.0), OcrToken::new("ok", 0.0)],
            calls: 0,
        }
    }
}

impl OcrBackend for CountingBackend {
    fn recognize_text(&mut self, _image: &GrayImage) -> Result<String> {
        Ok(self.text.clone())
    }

    fn recognize_tokens(&mut self, _image: &GrayImage) -> Result<Vec<OcrToken>> {
        Ok(self.tokens.clone())
    }

    fn recognize(&mut self, image: &GrayImage) -> Result<OcrPage> {
        self.calls += 1;
        Ok(OcrPage {
            text: self.recognize_text(image)?,
            tokens: self.recognize_tokens(image)?,
        })
    }
}

/// A small white page encoded as PNG.
pub fn png_bytes() -> Vec<u8> {
    let img = GrayImage::from_pixel(8, 8, Luma([255]));
    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .expect("encode png");
    out
}

pub fn write_png(path: &Path) {
    std::fs::write(path, png_bytes()).expect("write png");
}

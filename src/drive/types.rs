use serde::Deserialize;

/// MIME type Drive uses for folders.
pub const FOLDER_MIME: &str = "application/vnd.google-apps.folder";

/// Prefix shared by every Drive-native (non-downloadable) document type.
pub const NATIVE_MIME_PREFIX: &str = "application/vnd.google-apps.";

/// Drive-native document flavours that can only be exported, not downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeKind {
    Document,
    Spreadsheet,
    Presentation,
    /// Forms, drawings, shortcuts, sites and anything Google adds later.
    Other(String),
}

/// Target format for exporting a native document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportFormat {
    pub mime_type: &'static str,
    /// Appended to the sanitized display name, leading dot included.
    pub extension: &'static str,
}

const DOCX: ExportFormat = ExportFormat {
    mime_type: "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    extension: ".docx",
};
const XLSX: ExportFormat = ExportFormat {
    mime_type: "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    extension: ".xlsx",
};
const PPTX: ExportFormat = ExportFormat {
    mime_type: "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    extension: ".pptx",
};

impl NativeKind {
    /// Office format a native document is exported as. `None` means the kind
    /// has no export mapping and is left alone.
    pub fn export_format(&self) -> Option<ExportFormat> {
        match self {
            NativeKind::Document => Some(DOCX),
            NativeKind::Spreadsheet => Some(XLSX),
            NativeKind::Presentation => Some(PPTX),
            NativeKind::Other(_) => None,
        }
    }
}

/// What a listed entry is, derived from its MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    Folder,
    File,
    Native(NativeKind),
}

impl EntryKind {
    pub fn from_mime(mime_type: &str) -> Self {
        if mime_type == FOLDER_MIME {
            return EntryKind::Folder;
        }
        match mime_type.strip_prefix(NATIVE_MIME_PREFIX) {
            Some("document") => EntryKind::Native(NativeKind::Document),
            Some("spreadsheet") => EntryKind::Native(NativeKind::Spreadsheet),
            Some("presentation") => EntryKind::Native(NativeKind::Presentation),
            Some(other) => EntryKind::Native(NativeKind::Other(other.to_string())),
            None => EntryKind::File,
        }
    }
}

/// One child of a remote folder, as listed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub kind: EntryKind,
    pub size: Option<u64>,
}

impl RemoteEntry {
    pub fn new(id: impl Into<String>, name: impl Into<String>, mime_type: impl Into<String>) -> Self {
        let mime_type = mime_type.into();
        Self {
            id: id.into(),
            name: name.into(),
            kind: EntryKind::from_mime(&mime_type),
            mime_type,
            size: None,
        }
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn is_folder(&self) -> bool {
        self.kind == EntryKind::Folder
    }
}

/// One page of a folder listing.
#[derive(Debug, Default)]
pub struct ListPage {
    pub entries: Vec<RemoteEntry>,
    /// `None` (or empty from the wire) means this was the last page.
    pub next_page_token: Option<String>,
}

/// Response body of `GET /files`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FileList {
    #[serde(default)]
    pub next_page_token: Option<String>,
    #[serde(default)]
    pub files: Vec<FileRecord>,
}

/// A `File` resource restricted to the fields the mirror requests.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FileRecord {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
    /// Drive encodes int64 fields as JSON strings.
    #[serde(default)]
    pub size: Option<String>,
}

impl From<FileRecord> for RemoteEntry {
    fn from(record: FileRecord) -> Self {
        let size = record.size.as_deref().and_then(|s| s.parse().ok());
        let mut entry = RemoteEntry::new(record.id, record.name, record.mime_type);
        entry.size = size;
        entry
    }
}

impl From<FileList> for ListPage {
    fn from(list: FileList) -> Self {
        Self {
            entries: list.files.into_iter().map(RemoteEntry::from).collect(),
            next_page_token: list.next_page_token.filter(|t| !t.is_empty()),
        }
    }
}

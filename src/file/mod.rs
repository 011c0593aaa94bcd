//! File management for filedepot.
//!
//! This module contains the content-addressed blob store, the metadata
//! catalog, the folder hierarchy, and the services that tie them together.

mod folder;
mod hierarchy;
mod metadata;
mod service;
mod storage;
mod thumbnail;

pub use folder::{Folder, FolderRepository, FolderUpdate, NewFolder};
pub use hierarchy::{DeletePolicy, FolderNode, FolderService, FolderWithCounts};
pub use metadata::{
    FileQuery, FileRecord, FileRepository, FileUpdate, NewFileRecord, PageRequest,
};
pub use service::{FileService, UploadOutcome, UploadRequest};
pub use storage::ContentStore;
pub use thumbnail::{is_image_mime, probe_dimensions, render_thumbnail};

/// Maximum display-name length for files and folders.
pub const MAX_NAME_LENGTH: usize = 255;

/// Maximum description length.
pub const MAX_DESCRIPTION_LENGTH: usize = 2000;

/// Maximum number of tags on a single file.
pub const MAX_TAGS: usize = 32;

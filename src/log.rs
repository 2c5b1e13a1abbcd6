//! Optional append-only lifecycle log.
//!
//! Diagnostics go through `tracing`. This file log exists for deployments that
//! want a plain, timestamped record of connections next to the server.

use std::{
    fs::{File, OpenOptions},
    io::Write,
    path::Path,
    sync::{Mutex, PoisonError},
};
use time::{format_description::BorrowedFormatItem, macros::format_description, OffsetDateTime};

const TIMESTAMP: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

#[derive(Debug)]
pub struct FileLog {
    file: Option<Mutex<File>>,
}

impl FileLog {
    /// Opens `path` for appending, creating it when missing.
    ///
    /// A file that cannot be opened yields an inactive log.
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Self {
                file: Some(Mutex::new(file)),
            },
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "file log disabled");
                Self::disabled()
            }
        }
    }

    #[inline]
    pub const fn disabled() -> Self {
        Self { file: None }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.file.is_some()
    }

    /// Appends `[YYYY-MM-DD HH:MM:SS] message` and flushes.
    pub fn write(&self, message: &str) {
        let Some(file) = &self.file else {
            return;
        };

        let line = format!("[{}] {message}\n", timestamp());
        let mut file = file.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(err) = file.write_all(line.as_bytes()).and_then(|_| file.flush()) {
            tracing::debug!(error = %err, "file log write failed");
        }
    }
}

impl Default for FileLog {
    fn default() -> Self {
        Self::disabled()
    }
}

fn timestamp() -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    now.format(TIMESTAMP).unwrap_or_default()
}

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use actix_multipart::Multipart;
use actix_web::web;
use futures::{StreamExt as _, TryStreamExt};

use crate::app::AppError;

const ALLOWED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "gif"];

/// An uploaded file as it came off the wire, name not yet sanitized.
pub struct UploadedFile {
    pub filename: String,
    pub data: Vec<u8>,
}

/// Text fields plus at most one file field from a multipart form.
pub struct MultipartForm {
    pub fields: HashMap<String, String>,
    pub file: Option<UploadedFile>,
}

/// Drains a multipart payload into named text fields and the optional file
/// field. An empty file input (no name, no bytes) counts as no file.
pub async fn read_form(payload: &mut Multipart) -> Result<MultipartForm, AppError> {
    let mut fields = HashMap::new();
    let mut file = None;

    while let Ok(Some(mut field)) = payload.try_next().await {
        let (name, filename) = {
            let disposition = field.content_disposition();
            (
                disposition.get_name().map(String::from),
                disposition.get_filename().map(String::from),
            )
        };
        let name = match name {
            Some(name) => name,
            None => continue,
        };

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|_| AppError::BadRequest)?;
            data.extend_from_slice(&chunk);
        }

        match filename {
            Some(filename) => {
                if !filename.is_empty() && !data.is_empty() {
                    file = Some(UploadedFile { filename, data });
                }
            }
            None => {
                let value = String::from_utf8(data).map_err(|_| AppError::BadRequest)?;
                fields.insert(name, value);
            }
        }
    }

    Ok(MultipartForm { fields, file })
}

/// Where accepted uploads live: one fixed directory for profile pictures,
/// one for blog images.
#[derive(Clone)]
pub struct MediaStore {
    pub root: PathBuf,
}

impl MediaStore {
    /// Upload root from `UPLOAD_DIR`, defaulting to `static/uploads`.
    pub fn from_env() -> Self {
        let root =
            std::env::var("UPLOAD_DIR").unwrap_or_else(|_| String::from("static/uploads"));

        Self {
            root: PathBuf::from(root),
        }
    }

    pub fn profiles_dir(&self) -> PathBuf {
        self.root.join("profiles")
    }

    pub fn blogs_dir(&self) -> PathBuf {
        self.root.join("blogs")
    }

    /// Maps a url path segment onto a served directory. Anything but the
    /// two known kinds is not a media path.
    pub fn resolve_dir(&self, kind: &str) -> Option<PathBuf> {
        match kind {
            "profiles" => Some(self.profiles_dir()),
            "blogs" => Some(self.blogs_dir()),
            _ => None,
        }
    }

    /// Creates the upload directories. Runs on every boot; safe when they
    /// already exist.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        fs::create_dir_all(self.profiles_dir())?;
        fs::create_dir_all(self.blogs_dir())
    }

    /// Accepts or rejects the upload by filename extension alone — the
    /// bytes are never sniffed — and stores accepted files under `dir`
    /// keyed by the sanitized name. Returns the stored name; a rejected
    /// file comes back as `None` and the caller treats it as "no image
    /// supplied". A name that is already taken is overwritten (known gap,
    /// kept as documented behavior).
    pub async fn store(
        &self,
        dir: PathBuf,
        upload: UploadedFile,
    ) -> Result<Option<String>, AppError> {
        let filename = sanitize_filename(&upload.filename);
        if !allowed_file(&filename) {
            return Ok(None);
        }

        let path = dir.join(&filename);
        let data = upload.data;
        web::block(move || -> std::io::Result<()> {
            fs::create_dir_all(&dir)?;
            fs::write(&path, data)
        })
        .await??;

        Ok(Some(filename))
    }
}

/// Only the allow-listed image extensions pass, judged by name alone.
fn allowed_file(filename: &str) -> bool {
    match filename.rsplit_once('.') {
        Some((_, ext)) => ALLOWED_EXTENSIONS.contains(&ext.to_lowercase().as_str()),
        None => false,
    }
}

/// Keeps the final path component and strips everything that is not a
/// plain filename character, so an upload cannot escape its directory.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or(filename);

    base.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect()
}

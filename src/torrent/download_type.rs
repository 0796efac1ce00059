use std::path::PathBuf;

use crate::bencoding::Value;
use crate::torrent::{DecodeError, integer_field, required};

#[derive(Debug, PartialEq, Clone)]
pub enum DownloadType {
    SingleFile {
        name: String,
        length: usize,
    },
    MultiFile {
        directory_name: String,
        files: Vec<File>,
        /// Sum of the file lengths, checked for overflow when decoded.
        length: usize,
    },
}

impl DownloadType {
    pub fn name(&self) -> &str {
        match self {
            Self::SingleFile { name, .. } => name,
            Self::MultiFile { directory_name, .. } => directory_name,
        }
    }

    pub fn length(&self) -> usize {
        match self {
            Self::SingleFile { length, .. } | Self::MultiFile { length, .. } => *length,
        }
    }
}

impl TryFrom<&Value> for DownloadType {
    type Error = DecodeError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        let name = required(value, "name")?
            .as_str()
            .filter(|name| is_plain_file_name(name))
            .ok_or(DecodeError::InvalidField("name"))?
            .to_string();

        if value.contains_key("length") {
            let length = integer_field(value, "length")?;
            return Ok(DownloadType::SingleFile { name, length });
        }

        if let Some(files) = value.get("files") {
            let files = files.as_list().ok_or(DecodeError::InvalidField("files"))?;
            let mut result = Vec::with_capacity(files.len());
            let mut length: usize = 0;
            for file in files {
                let file = File::try_from(file)?;
                length = length
                    .checked_add(file.length)
                    .ok_or(DecodeError::InvalidField("files"))?;
                result.push(file);
            }
            return Ok(DownloadType::MultiFile {
                directory_name: name,
                files: result,
                length,
            });
        }

        Err(DecodeError::MissingField("length"))
    }
}

/// The name ends up as a path on disk, so it must not escape the download directory.
fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

#[derive(Debug, PartialEq, Clone)]
pub struct File {
    pub path: PathBuf,
    pub length: usize,
}

impl TryFrom<&Value> for File {
    type Error = DecodeError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        let length = integer_field(value, "length")?;
        let parts = required(value, "path")?
            .as_list()
            .ok_or(DecodeError::InvalidField("path"))?;
        let mut path = PathBuf::with_capacity(parts.len());
        for part in parts {
            let part = part.as_str().ok_or(DecodeError::InvalidField("path"))?;
            path.push(part);
        }
        Ok(File { path, length })
    }
}

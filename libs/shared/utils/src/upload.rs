use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A file sent inline as base64, optionally as a `data:<type>;base64,` URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileUpload {
    pub file_name: String,
    #[serde(default = "default_content_type")]
    pub content_type: String,
    pub data: String,
}

fn default_content_type() -> String {
    "application/octet-stream".to_string()
}

impl FileUpload {
    pub fn decode(&self) -> Result<Vec<u8>, String> {
        let payload = match self.data.split_once(";base64,") {
            Some((_, encoded)) => encoded,
            None => self.data.as_str(),
        };

        let bytes = BASE64
            .decode(payload.trim())
            .map_err(|e| format!("Failed to decode base64 data: {}", e))?;

        if bytes.is_empty() {
            return Err("Uploaded file is empty".to_string());
        }
        Ok(bytes)
    }

    /// Storage key `<folder>/<owner>/<uuid>-<name>`, with the name reduced to safe characters.
    pub fn object_path(&self, folder: &str, owner: Uuid) -> String {
        let safe_name: String = self
            .file_name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' { c } else { '_' })
            .collect();

        format!("{}/{}/{}-{}", folder, owner, Uuid::new_v4(), safe_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    fn upload(data: &str) -> FileUpload {
        FileUpload {
            file_name: "scan report.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            data: data.to_string(),
        }
    }

    #[test]
    fn test_decode_plain_and_data_url() {
        assert_eq!(upload("aGVsbG8=").decode().unwrap(), b"hello");
        assert_eq!(upload("data:application/pdf;base64,aGVsbG8=").decode().unwrap(), b"hello");
    }

    #[test]
    fn test_decode_rejects_garbage_and_empty() {
        assert_err!(upload("not base64!").decode());
        assert_err!(upload("").decode());
        assert_ok!(upload("AA==").decode());
    }

    #[test]
    fn test_object_path_sanitizes_name() {
        let owner = Uuid::new_v4();
        let path = upload("").object_path("patients", owner);
        assert!(path.starts_with(&format!("patients/{}/", owner)));
        assert!(path.ends_with("-scan_report.pdf"));
    }
}

use std::collections::HashMap;
use tracing::debug;

use crate::storage::Storage;

/// One file extracted from a `multipart/form-data` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Form field name the file arrived under
    pub field: String,
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl UploadedFile {
    /// Persist the file body through a storage backend; returns bytes written.
    pub fn persist(&self, storage: &dyn Storage, key: &str) -> anyhow::Result<u64> {
        storage.put(key, &self.data)
    }
}

/// Parse a form body by content type.
///
/// Supports `application/x-www-form-urlencoded` and `multipart/form-data`.
/// Returns `None` for other content types or malformed bodies; the context
/// builder swallows that into empty form state rather than failing the
/// request.
#[must_use]
pub fn parse_form(
    content_type: Option<&str>,
    body: &[u8],
) -> Option<(HashMap<String, String>, Vec<UploadedFile>)> {
    let content_type = content_type?;

    if content_type.starts_with("application/x-www-form-urlencoded") {
        let fields = url::form_urlencoded::parse(body)
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        return Some((fields, Vec::new()));
    }

    if content_type.starts_with("multipart/form-data") {
        let boundary = content_type
            .split(';')
            .find_map(|part| part.trim().strip_prefix("boundary="))
            .map(|b| b.trim_matches('"'))?;
        return parse_multipart(boundary, body);
    }

    None
}

fn parse_multipart(
    boundary: &str,
    body: &[u8],
) -> Option<(HashMap<String, String>, Vec<UploadedFile>)> {
    let delimiter = format!("--{boundary}");
    let mut fields = HashMap::new();
    let mut files = Vec::new();

    // Skip the preamble up to the first delimiter, then walk part by part.
    let first = find_subslice(body, delimiter.as_bytes())?;
    let mut rest = &body[first + delimiter.len()..];
    loop {
        // Closing delimiter is "--boundary--"
        if rest.starts_with(b"--") {
            break;
        }
        let chunk = strip_crlf(rest);
        let Some(end) = find_subslice(chunk, delimiter.as_bytes()) else {
            break;
        };

        if let Some((headers_raw, content)) = split_part(&chunk[..end]) {
            parse_part(headers_raw, content, &mut fields, &mut files);
        } else {
            debug!(boundary = %boundary, "Skipping malformed multipart part");
        }

        rest = &chunk[end + delimiter.len()..];
    }

    Some((fields, files))
}

/// Split one part into its raw header block and content bytes.
fn split_part(part: &[u8]) -> Option<(&[u8], &[u8])> {
    let split = find_subslice(part, b"\r\n\r\n")?;
    let headers = &part[..split];
    let mut content = &part[split + 4..];
    // Content ends with the CRLF that precedes the next delimiter
    if content.ends_with(b"\r\n") {
        content = &content[..content.len() - 2];
    }
    Some((headers, content))
}

fn parse_part(
    headers_raw: &[u8],
    content: &[u8],
    fields: &mut HashMap<String, String>,
    files: &mut Vec<UploadedFile>,
) {
    let headers = String::from_utf8_lossy(headers_raw);
    let mut name = None;
    let mut filename = None;
    let mut content_type = "application/octet-stream".to_string();

    for line in headers.lines() {
        let lower = line.to_ascii_lowercase();
        if lower.starts_with("content-disposition:") {
            for attr in line.split(';') {
                let attr = attr.trim();
                if let Some(v) = attr.strip_prefix("name=") {
                    name = Some(v.trim_matches('"').to_string());
                } else if let Some(v) = attr.strip_prefix("filename=") {
                    filename = Some(v.trim_matches('"').to_string());
                }
            }
        } else if let Some(v) = lower.strip_prefix("content-type:") {
            content_type = v.trim().to_string();
        }
    }

    let Some(name) = name else { return };
    match filename {
        Some(filename) => files.push(UploadedFile {
            field: name,
            filename,
            content_type,
            data: content.to_vec(),
        }),
        None => {
            fields.insert(name, String::from_utf8_lossy(content).to_string());
        }
    }
}

fn strip_crlf(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(b"\r\n").unwrap_or(bytes)
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urlencoded_form() {
        let (fields, files) = parse_form(
            Some("application/x-www-form-urlencoded"),
            b"name=alice&age=30",
        )
        .unwrap();
        assert_eq!(fields.get("name"), Some(&"alice".to_string()));
        assert_eq!(fields.get("age"), Some(&"30".to_string()));
        assert!(files.is_empty());
    }

    #[test]
    fn test_multipart_fields_and_file() {
        let body = b"--XYZ\r\n\
Content-Disposition: form-data; name=\"title\"\r\n\r\n\
hello\r\n\
--XYZ\r\n\
Content-Disposition: form-data; name=\"doc\"; filename=\"a.txt\"\r\n\
Content-Type: text/plain\r\n\r\n\
file-bytes\r\n\
--XYZ--\r\n";
        let (fields, files) =
            parse_form(Some("multipart/form-data; boundary=XYZ"), body).unwrap();
        assert_eq!(fields.get("title"), Some(&"hello".to_string()));
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].field, "doc");
        assert_eq!(files[0].filename, "a.txt");
        assert_eq!(files[0].content_type, "text/plain");
        assert_eq!(files[0].data, b"file-bytes");
    }

    #[test]
    fn test_unknown_content_type_is_none() {
        assert!(parse_form(Some("application/json"), b"{}").is_none());
        assert!(parse_form(None, b"x").is_none());
    }

    #[test]
    fn test_missing_boundary_is_none() {
        assert!(parse_form(Some("multipart/form-data"), b"data").is_none());
    }
}

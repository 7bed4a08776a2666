use super::SourceReader;
use async_trait::async_trait;
use bytes::Bytes;
use hlsforge_media::ByteRange;
use reqwest::header::{CONNECTION, CONTENT_RANGE, CONTENT_TYPE, RANGE};
use reqwest::{Client, StatusCode};
use std::sync::RwLock;
use std::time::Duration;

/// Ranged GETs against a remote source over a keep-alive connection pool.
pub struct HttpReader {
    url: String,
    client: RwLock<Option<Client>>,
}

/// A contiguous piece of the remote resource returned by the server.
#[derive(Debug, Clone, PartialEq)]
struct Part {
    start: u64,
    data: Bytes,
}

impl Part {
    fn slice(&self, range: &ByteRange) -> Option<Bytes> {
        let end = self.start.saturating_add(self.data.len() as u64);
        if range.offset < self.start || range.offset >= end {
            return None;
        }
        let from = (range.offset - self.start) as usize;
        let to = (range.end().min(end) - self.start) as usize;
        Some(self.data.slice(from..to))
    }
}

impl HttpReader {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(1)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build HTTP client with timeout: {}", e);
                Client::new()
            });

        Self {
            url: url.into(),
            client: RwLock::new(Some(client)),
        }
    }

    fn client(&self) -> Option<Client> {
        self.client.read().ok().and_then(|c| c.clone())
    }

    /// Issue a GET with `Range: bytes=<spec>` and split the answer into parts.
    async fn fetch(&self, spec: &str) -> Vec<Part> {
        let Some(client) = self.client() else {
            tracing::warn!("Read on closed source {}", self.url);
            return Vec::new();
        };

        let response = match client
            .get(&self.url)
            .header(CONNECTION, "keep-alive")
            .header(RANGE, format!("bytes={spec}"))
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Range request {} on {} failed: {}", spec, self.url, e);
                return Vec::new();
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("Range request {} on {} returned {}", spec, self.url, status);
            return Vec::new();
        }

        let content_type = header_str(&response, CONTENT_TYPE);
        let content_range = header_str(&response, CONTENT_RANGE);

        let body = match response.bytes().await {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!("Reading body of {} failed: {}", self.url, e);
                return Vec::new();
            }
        };

        if status != StatusCode::PARTIAL_CONTENT {
            // Range ignored, the whole resource came back
            return vec![Part {
                start: 0,
                data: body,
            }];
        }

        if let Some(boundary) = content_type.as_deref().and_then(multipart_boundary) {
            return parse_byteranges(&body, &boundary);
        }

        match content_range.as_deref().and_then(parse_content_range) {
            Some((start, _)) => vec![Part { start, data: body }],
            None => {
                tracing::warn!("Partial response from {} without Content-Range", self.url);
                Vec::new()
            }
        }
    }
}

fn header_str(response: &reqwest::Response, name: reqwest::header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn range_spec(range: &ByteRange) -> String {
    format!("{}-{}", range.offset, range.end() - 1)
}

/// Boundary of a `multipart/byteranges` content type.
fn multipart_boundary(content_type: &str) -> Option<String> {
    let mut params = content_type.split(';');
    let mime = params.next()?.trim();
    if !mime.eq_ignore_ascii_case("multipart/byteranges") {
        return None;
    }
    params.find_map(|p| {
        let (key, value) = p.trim().split_once('=')?;
        key.eq_ignore_ascii_case("boundary")
            .then(|| value.trim_matches('"').to_string())
    })
}

/// `bytes <first>-<last>/<total>` to `(first, last)`.
fn parse_content_range(value: &str) -> Option<(u64, u64)> {
    let spec = value.trim().strip_prefix("bytes")?.trim_start();
    let (range, _total) = spec.split_once('/')?;
    let (first, last) = range.split_once('-')?;
    let first = first.trim().parse().ok()?;
    let last = last.trim().parse().ok()?;
    (last >= first).then_some((first, last))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Split a `multipart/byteranges` body into its parts.
fn parse_byteranges(body: &Bytes, boundary: &str) -> Vec<Part> {
    let delimiter = format!("--{boundary}");
    let mut parts = Vec::new();
    let mut pos = 0;

    while let Some(found) = find(&body[pos..], delimiter.as_bytes()) {
        let cursor = pos + found + delimiter.len();
        if body[cursor..].starts_with(b"--") {
            break;
        }
        let Some(headers_len) = find(&body[cursor..], b"\r\n\r\n") else {
            break;
        };
        let headers = String::from_utf8_lossy(&body[cursor..cursor + headers_len]);
        let data_start = cursor + headers_len + 4;

        let range = headers.lines().find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.trim()
                .eq_ignore_ascii_case("content-range")
                .then(|| parse_content_range(value))
                .flatten()
        });
        let Some((first, last)) = range else {
            pos = data_start;
            continue;
        };

        let data_end = usize::try_from(last - first)
            .ok()
            .and_then(|len| len.checked_add(1))
            .and_then(|len| data_start.checked_add(len))
            .filter(|end| *end <= body.len());
        let Some(data_end) = data_end else {
            tracing::warn!("Truncated multipart body part at {}", first);
            break;
        };
        parts.push(Part {
            start: first,
            data: body.slice(data_start..data_end),
        });
        pos = data_end;
    }

    parts
}

fn slice_parts(parts: &[Part], ranges: &[ByteRange]) -> Vec<Bytes> {
    ranges
        .iter()
        .map(|r| {
            parts
                .iter()
                .find_map(|p| p.slice(r))
                .unwrap_or_default()
        })
        .collect()
}

#[async_trait]
impl SourceReader for HttpReader {
    fn source_id(&self) -> &str {
        &self.url
    }

    async fn read(&self, offset: u64, size: usize) -> Bytes {
        if size == 0 {
            return Bytes::new();
        }
        let range = ByteRange::new(offset, size as u64);
        let parts = self.fetch(&range_spec(&range)).await;
        slice_parts(&parts, &[range]).pop().unwrap_or_default()
    }

    async fn read_bulk(&self, ranges: &[ByteRange]) -> Vec<Bytes> {
        let wanted: Vec<&ByteRange> = ranges.iter().filter(|r| r.length > 0).collect();
        if wanted.is_empty() {
            return vec![Bytes::new(); ranges.len()];
        }

        let spec = wanted
            .iter()
            .map(|r| range_spec(r))
            .collect::<Vec<_>>()
            .join(",");
        let parts = self.fetch(&spec).await;
        slice_parts(&parts, ranges)
    }

    async fn close(&self) {
        if let Ok(mut client) = self.client.write() {
            client.take();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_content_range() {
        assert_eq!(parse_content_range("bytes 0-99/1000"), Some((0, 99)));
        assert_eq!(parse_content_range(" bytes 500-999/*"), Some((500, 999)));
        assert_eq!(parse_content_range("bytes */1000"), None);
        assert_eq!(parse_content_range("items 0-1/2"), None);
    }

    #[test]
    fn test_multipart_boundary() {
        assert_eq!(
            multipart_boundary("multipart/byteranges; boundary=3d6b6a416f9b5").as_deref(),
            Some("3d6b6a416f9b5")
        );
        assert_eq!(
            multipart_boundary("multipart/byteranges; boundary=\"abc\"").as_deref(),
            Some("abc")
        );
        assert_eq!(multipart_boundary("video/mp4"), None);
    }

    #[test]
    fn test_parse_byteranges() {
        let body = Bytes::from_static(
            b"\r\n--XYZ\r\nContent-Type: video/mp4\r\nContent-Range: bytes 2-4/20\r\n\r\ncde\
              \r\n--XYZ\r\nContent-Type: video/mp4\r\nContent-Range: bytes 10-11/20\r\n\r\nkl\
              \r\n--XYZ--\r\n",
        );
        let parts = parse_byteranges(&body, "XYZ");
        assert_eq!(
            parts,
            vec![
                Part {
                    start: 2,
                    data: Bytes::from_static(b"cde"),
                },
                Part {
                    start: 10,
                    data: Bytes::from_static(b"kl"),
                },
            ]
        );
    }

    #[test]
    fn test_parse_byteranges_rejects_impossible_lengths() {
        let body = Bytes::from_static(
            b"--XYZ\r\nContent-Range: bytes 0-18446744073709551615/*\r\n\r\nabcdef\r\n--XYZ--\r\n",
        );
        assert!(parse_byteranges(&body, "XYZ").is_empty());

        let overlong = Bytes::from_static(
            b"--XYZ\r\nContent-Range: bytes 0-99/100\r\n\r\nabc\r\n--XYZ--\r\n",
        );
        assert!(parse_byteranges(&overlong, "XYZ").is_empty());
    }

    #[test]
    fn test_part_at_end_of_address_space() {
        let part = Part {
            start: u64::MAX - 1,
            data: Bytes::from_static(b"ab"),
        };
        assert_eq!(part.slice(&ByteRange::new(0, 2)), None);
    }

    #[test]
    fn test_slice_parts() {
        let parts = vec![Part {
            start: 100,
            data: Bytes::from_static(b"abcdefgh"),
        }];
        let out = slice_parts(
            &parts,
            &[
                ByteRange::new(102, 3),
                ByteRange::new(106, 10),
                ByteRange::new(50, 2),
            ],
        );
        assert_eq!(&out[0][..], b"cde");
        assert_eq!(&out[1][..], b"gh");
        assert!(out[2].is_empty());
    }
}

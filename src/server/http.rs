//! Just enough HTTP/1.1: one request per connection, JSON responses,
//! `Connection: close`.

use std::collections::HashMap;
use std::io;

use serde::Serialize;
use serde_json::Value as Json;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

// ─── Request ──────────────────────────────────────────────────────

/// Request line and headers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestHead {
    pub method: String,
    /// Path without the query string.
    pub path: String,
    pub version: String,
    /// Decoded query parameters in order of appearance; keys may repeat.
    pub query: Vec<(String, String)>,
    /// Header names are lowercased.
    pub headers: HashMap<String, String>,
}

impl RequestHead {
    pub fn query_values<'a>(&'a self, key: &str) -> Vec<&'a str> {
        self.query
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

/// Read the request line and headers. A malformed request line yields the
/// 400 response to send back.
pub async fn read_head<R>(reader: &mut R) -> io::Result<Result<RequestHead, Response>>
where
    R: AsyncBufRead + Unpin,
{
    let mut request_line = String::new();
    if reader.read_line(&mut request_line).await? == 0 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "connection closed before request line",
        ));
    }

    let parts: Vec<&str> = request_line.split_whitespace().collect();
    let &[method, target, version] = parts.as_slice() else {
        return Ok(Err(Response::new(400, "Malformed request line")));
    };
    let (path, query) = target.split_once('?').unwrap_or((target, ""));
    let mut head = RequestHead {
        method: method.to_string(),
        path: path.to_string(),
        version: version.to_string(),
        query: parse_query(query),
        headers: HashMap::new(),
    };

    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).await? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if let Some((key, value)) = line.split_once(':') {
            head.headers
                .insert(key.trim().to_lowercase(), value.trim().to_string());
        }
    }
    Ok(Ok(head))
}

/// Read a `Content-Length` body. Requests without one have an empty body.
pub async fn read_body<R>(
    reader: &mut R,
    head: &RequestHead,
    max_body: usize,
) -> io::Result<Result<Vec<u8>, Response>>
where
    R: AsyncBufRead + Unpin,
{
    let Some(len) = head.header("content-length") else {
        return Ok(Ok(Vec::new()));
    };
    let Ok(len) = len.parse::<usize>() else {
        return Ok(Err(Response::new(400, "Invalid Content-Length header")));
    };
    if len > max_body {
        return Ok(Err(Response::new(413, "Request body too large").with_detail(
            format!("body of {} bytes exceeds the limit of {} bytes", len, max_body),
        )));
    }
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(Ok(body))
}

/// Split `a=1&b=2` into decoded pairs. Keys without `=` get an empty value.
pub fn parse_query(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (url_decode(key), url_decode(value))
        })
        .collect()
}

pub fn url_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let hex = bytes
                    .get(i + 1..i + 3)
                    .and_then(|h| std::str::from_utf8(h).ok())
                    .and_then(|h| u8::from_str_radix(h, 16).ok());
                match hex {
                    Some(byte) => {
                        out.push(byte);
                        i += 3;
                        continue;
                    }
                    None => out.push(b'%'),
                }
            }
            b'+' => out.push(b' '),
            b => out.push(b),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

// ─── Response ─────────────────────────────────────────────────────

/// A JSON response: `{code, message, description?, result?, detail?}`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Response {
    pub code: u16,
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Json>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Response {
    pub fn new(code: u16, description: &str) -> Self {
        Self {
            code,
            message: status_message(code),
            description: (!description.is_empty()).then(|| description.to_string()),
            result: None,
            detail: None,
        }
    }

    pub fn with_result(mut self, result: Json) -> Self {
        self.result = Some(result);
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        if !detail.is_empty() {
            self.detail = Some(detail);
        }
        self
    }

    pub fn to_json_string(&self) -> String {
        // Only string keys and JSON values, so serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

pub fn status_message(code: u16) -> &'static str {
    match code / 100 {
        1 => "Info",
        2 => "OK",
        3 => "Redirection",
        4 => "Client Error",
        5 => "Server Error",
        _ => "Undefined",
    }
}

fn reason_phrase(code: u16) -> &'static str {
    match code {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        413 => "Payload Too Large",
        500 => "Internal Server Error",
        _ => status_message(code),
    }
}

pub async fn write_response<W>(stream: &mut W, response: &Response) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let body = response.to_json_string();
    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        response.code,
        reason_phrase(response.code),
        body.len(),
    );
    stream.write_all(head.as_bytes()).await?;
    stream.write_all(body.as_bytes()).await?;
    stream.flush().await?;
    stream.shutdown().await
}

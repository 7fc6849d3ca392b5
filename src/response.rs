//! # 响应构建与静态交付模块
//!
//! 两部分职责：
//! - `FileDelivery`：把一个已解析的文件路径写入请求上下文的响应体。
//!   空字符串路径是约定的"未找到"哨兵，产生空响应体的 404；
//!   文件内容经过 LRU 缓存（按修改时间失效），`Content-Type` 来自 MIME 表。
//! - `Response`：把填好出站槽位的请求上下文序列化为 HTTP/1.1 报文，
//!   包括状态行、日期、服务器标识、自定义响应头、内容协商压缩与响应体。

use crate::{
    cache::DeliveryCache,
    param::*,
    request::Request,
};

use brotli::enc::{self, backward_references::BrotliEncoderParams};
use bytes::Bytes;
use chrono::prelude::*;
use flate2::{
    write::{DeflateEncoder, GzEncoder},
    Compression,
};
use log::{debug, error, warn};

use std::{
    fs,
    io::{self, Write},
    path::Path,
    sync::Mutex,
};

/// 静态文件交付器。
///
/// 对应外部接口 `deliver(path)`：空路径哨兵表示未找到，
/// 由响应层转译为空响应体的 404。
pub struct FileDelivery {
    cache: Mutex<DeliveryCache>,
}

impl FileDelivery {
    pub fn from_capacity(capacity: usize) -> Self {
        Self {
            cache: Mutex::new(DeliveryCache::from_capacity(capacity)),
        }
    }

    /// 将 `path` 指向的文件写入请求的响应体。
    ///
    /// - `path` 为空：未找到哨兵，置 404，响应体保持为空。
    /// - 文件在解析与交付之间消失、或读取失败：同样折叠为空响应体的 404，
    ///   只在日志中留下痕迹。
    pub fn deliver(&self, request: &mut Request, path: &str, id: u128) {
        if path.is_empty() {
            debug!("[ID{}]收到空路径哨兵，交付404", id);
            request.set_status_code(404);
            return;
        }

        let file_metadata = match fs::metadata(path) {
            Ok(meta) => meta,
            Err(e) => {
                warn!("[ID{}]无法获取文件{}的元数据：{}，交付404", id, path, e);
                request.set_status_code(404);
                return;
            }
        };
        let modified_time = match file_metadata.modified() {
            Ok(time) => time,
            Err(e) => {
                warn!("[ID{}]无法获取文件{}的修改时间：{}，交付404", id, path, e);
                request.set_status_code(404);
                return;
            }
        };

        let suffix = Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        let mime = mime_for_suffix(&suffix);

        let mut cache_lock = match self.cache.lock() {
            Ok(lock) => lock,
            Err(poisoned) => {
                warn!("[ID{}]缓存锁被污染，恢复并继续", id);
                poisoned.into_inner()
            }
        };

        let content = match cache_lock.find(path, modified_time) {
            Some((bytes, cached_mime)) => {
                debug!("[ID{}]缓存命中：{}（{} bytes）", id, path, bytes.len());
                request.set_content_type(cached_mime);
                bytes
            }
            None => {
                debug!("[ID{}]缓存未命中，读取文件：{}", id, path);
                let contents = match fs::read(path) {
                    Ok(c) => c,
                    Err(e) => {
                        warn!("[ID{}]无法读取文件{}：{}，交付404", id, path, e);
                        request.set_status_code(404);
                        return;
                    }
                };
                let bytes = Bytes::from(contents);
                cache_lock.push(path, bytes.clone(), mime, modified_time);
                request.set_content_type(mime);
                bytes
            }
        };

        request.set_status_code(200);
        request.response_mut().extend_from_slice(&content);
    }
}

/// HTTP/1.1 响应报文。
#[derive(Debug, Clone)]
pub struct Response {
    version: HttpVersion,
    status_code: u16,
    information: String,
    content_type: Option<String>,
    content_length: u64,
    date: DateTime<Utc>,
    content_encoding: Option<HttpEncoding>,
    server_name: String,
    allow: Option<Vec<HttpRequestMethod>>,
    headers: Vec<(String, String)>,
    content: Option<Bytes>,
}

impl Response {
    /// 由处理完毕的请求上下文构建响应。
    ///
    /// - `Content-Type` 优先取交付层写入的值，脚本页面则由响应类型标签推导。
    /// - HEAD 请求保留 `Content-Length` 但不携带响应体，也不做压缩。
    /// - 204 响应附带 `Allow` 头（OPTIONS 预检）。
    pub fn from_request(request: &Request, id: u128) -> Self {
        let status_code = request.status_code();
        let information = match STATUS_CODES.get(&status_code) {
            Some(&info) => info.to_string(),
            None => {
                error!("[ID{}]非法的状态码：{}。这条错误说明代码编写出现了错误。", id, status_code);
                "Unknown".to_string()
            }
        };

        let content_type = request
            .content_type()
            .map(|s| s.to_string())
            .or_else(|| request.response_type().content_type().map(|s| s.to_string()));

        let headonly = request.method() == HttpRequestMethod::Head;
        let body = request.response_body();

        let mut response = Self {
            version: HttpVersion::V1_1,
            status_code,
            information,
            content_type: if body.is_empty() && status_code == 404 {
                // 未找到回退：空响应体，不标注内容类型
                None
            } else {
                content_type
            },
            content_length: body.len() as u64,
            date: Utc::now(),
            content_encoding: None,
            server_name: SERVER_NAME.to_string(),
            allow: if status_code == 204 {
                Some(ALLOWED_METHODS.to_vec())
            } else {
                None
            },
            headers: request.response_headers().to_vec(),
            content: None,
        };

        if headonly || body.is_empty() {
            return response;
        }

        // 内容协商压缩：已压缩的媒体类型跳过
        let skip = response
            .content_type
            .as_deref()
            .map_or(true, should_skip_compression);
        response.content_encoding = if skip {
            None
        } else {
            decide_encoding(request.accept_encoding())
        };

        let contents = match compress(body.to_vec(), response.content_encoding) {
            Ok(c) => c,
            Err(e) => {
                error!("[ID{}]压缩响应体失败：{}，返回未压缩内容", id, e);
                response.content_encoding = None;
                body.to_vec()
            }
        };
        response.content_length = contents.len() as u64;
        response.content = Some(Bytes::from(contents));
        response
    }

    pub fn as_bytes(&self) -> Vec<u8> {
        let version: &str = match self.version {
            HttpVersion::V1_1 => "HTTP/1.1",
        };
        let status_code: &str = &self.status_code.to_string();
        let information: &str = &self.information;
        let content_length: &str = &self.content_length.to_string();
        let date: &str = &format_date(&self.date);
        let server: &str = &self.server_name;

        let mut extra_headers = String::new();
        for (name, value) in &self.headers {
            extra_headers.push_str(name);
            extra_headers.push_str(": ");
            extra_headers.push_str(value);
            extra_headers.push_str(CRLF);
        }

        let header = [
            version,
            " ",
            status_code,
            " ",
            information,
            CRLF,
            match &self.content_type {
                Some(t) => ["Content-Type: ", t, CRLF].concat(),
                None => "".to_string(),
            }
            .as_str(),
            match self.content_encoding {
                Some(e) => [
                    "Content-Encoding: ",
                    match e {
                        HttpEncoding::Gzip => "gzip",
                        HttpEncoding::Deflate => "deflate",
                        HttpEncoding::Br => "br",
                    },
                    CRLF,
                ]
                .concat()
                .to_string(),
                None => "".to_string(),
            }
            .as_str(),
            "Content-Length: ",
            content_length,
            CRLF,
            "Date: ",
            date,
            CRLF,
            "Server: ",
            server,
            CRLF,
            match &self.allow {
                Some(a) => {
                    let mut allow_str = String::new();
                    for (index, method) in a.iter().enumerate() {
                        allow_str.push_str(&format!("{}", method));
                        if index < a.len() - 1 {
                            allow_str.push_str(", ");
                        }
                    }
                    ["Allow: ", &allow_str, CRLF].concat()
                }
                None => "".to_string(),
            }
            .as_str(),
            extra_headers.as_str(),
            CRLF,
        ]
        .concat();
        let body: &[u8] = match &self.content {
            Some(c) => c,
            None => b"",
        };
        [header.as_bytes(), body].concat()
    }
}

impl Response {
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn information(&self) -> &str {
        &self.information
    }
}

fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc2822()
}

fn compress(data: Vec<u8>, mode: Option<HttpEncoding>) -> io::Result<Vec<u8>> {
    match mode {
        Some(HttpEncoding::Gzip) => {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(&data)?;
            encoder.finish()
        }
        Some(HttpEncoding::Deflate) => {
            let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(&data)?;
            encoder.finish()
        }
        Some(HttpEncoding::Br) => {
            let params = BrotliEncoderParams::default();
            let mut output = Vec::new();
            enc::BrotliCompress(&mut io::Cursor::new(data), &mut output, &params)?;
            Ok(output)
        }
        None => Ok(data),
    }
}

fn should_skip_compression(mime_type: &str) -> bool {
    let skip_types = [
        "image/jpeg",
        "image/png",
        "image/gif",
        "image/webp",
        "image/bmp",
        "image/x-icon",
        "video/",
        "audio/",
        "application/zip",
        "application/x-7z-compressed",
        "application/gzip",
        "font/woff",
        "font/woff2",
    ];

    skip_types
        .iter()
        .any(|&skip_type| mime_type.starts_with(skip_type))
}

fn decide_encoding(accept_encoding: &Vec<HttpEncoding>) -> Option<HttpEncoding> {
    if accept_encoding.contains(&HttpEncoding::Gzip) {
        Some(HttpEncoding::Gzip)
    } else if accept_encoding.contains(&HttpEncoding::Br) {
        Some(HttpEncoding::Br)
    } else if accept_encoding.contains(&HttpEncoding::Deflate) {
        Some(HttpEncoding::Deflate)
    } else {
        None
    }
}

// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 服务器协议参数与常量模块
//!
//! 该模块定义了 `shaneyale-htmlserver` 遵循的协议相关常量和数据结构，包括：
//! - 常见的 HTTP 状态码及其原因短语（Reason Phrase）。
//! - 文件后缀到 MIME 类型的映射表（含脚本页面后缀）。
//! - 保留的 URL 前缀、脚本后缀族以及静态响应的安全头字面量。
//! - HTTP 方法、版本、编码格式以及响应类型标签的强类型枚举。

use lazy_static::lazy_static;
use std::collections::HashMap;

/// 服务器名称标识，用于 HTTP 响应头的 `Server` 字段
pub const SERVER_NAME: &str = "shaneyale-htmlserver";

/// HTTP 协议规定的换行符（Carriage Return Line Feed）
pub const CRLF: &str = "\r\n";

/// 保留的存储组 URL 前缀。
///
/// 以该前缀开头的资源 URL 不映射到共享根目录，而是交给存储组查找器解析，
/// 因此共享根目录下不应存在同名的真实路径。
pub const STORAGE_GROUP_PREFIX: &str = "/StorageGroup/";

/// 脚本页面后缀族：命中其中之一的资源交由模板渲染器动态生成，
/// 分别对应 HTML、XML 和 JS 风味的模板。其余后缀一律按静态文件交付。
pub const SCRIPT_SUFFIXES: [&str; 3] = ["qsp", "qxml", "qjs"];

/// 强制旧版 IE 使用现代渲染模式的兼容性响应头。
pub const X_UA_COMPATIBLE: &str = "IE=Edge";

/// 静态交付统一携带的内容安全策略。
///
/// 禁止一切第三方外部内容：脚本与样式仅限同源（inline/eval 例外是临时的），
/// 禁用 frame，媒体、字体与图片都限制在同源范围内。
/// `default-src`/`connect-src` 目前被有意省略。
pub const CONTENT_SECURITY_POLICY: &str =
    "script-src 'self' 'unsafe-inline' 'unsafe-eval'; \
style-src 'self' 'unsafe-inline'; \
frame-src 'none'; \
object-src 'self'; \
media-src 'self'; \
font-src 'self'; \
image-src 'self'; \
reflected-xss filter;";

lazy_static! {
    /// 服务器当前允许处理的 HTTP 方法列表。
    ///
    /// 用于在收到请求时进行初步过滤，不在该列表中的方法将触发 405 Method Not Allowed。
    pub static ref ALLOWED_METHODS: Vec<HttpRequestMethod> = {
        vec![
            HttpRequestMethod::Get,
            HttpRequestMethod::Head,
            HttpRequestMethod::Options,
        ]
    };
}

lazy_static! {
    /// HTTP 状态码与其对应的标准原因短语映射表。
    ///
    /// 参考标准：[RFC 9110: HTTP Semantics](https://www.rfc-editor.org/rfc/rfc9110.html)。
    pub static ref STATUS_CODES: HashMap<u16, &'static str> = {
        let mut map = HashMap::new();
        map.insert(200, "OK");
        map.insert(204, "No Content");
        map.insert(206, "Partial Content");
        map.insert(301, "Moved Permanently");
        map.insert(302, "Found");
        map.insert(304, "Not Modified");
        map.insert(400, "Bad Request");
        map.insert(401, "Unauthorized");
        map.insert(403, "Forbidden");
        map.insert(404, "Not Found");
        map.insert(405, "Method Not Allowed");
        map.insert(408, "Request Timeout");
        map.insert(414, "URI Too Long");
        map.insert(500, "Internal Server Error");
        map.insert(501, "Not Implemented");
        map.insert(503, "Service Unavailable");
        map.insert(505, "HTTP Version Not Supported");
        map
    };
}

lazy_static! {
    /// 文件后缀名到 MIME 类型（Media Type）的映射表。
    ///
    /// 静态交付时用于设置响应头中的 `Content-Type` 字段；
    /// 解析阶段则用它推导响应类型标签。脚本页面后缀也在表中，
    /// 这样 `qsp`/`qxml`/`qjs` 在分发给渲染器之前就能得到正确的标签。
    pub static ref MIME_TYPES: HashMap<&'static str, &'static str> = {
        let mut map = HashMap::new();
        map.insert("avi", "video/x-msvideo");
        map.insert("bin", "application/octet-stream");
        map.insert("bmp", "image/bmp");
        map.insert("css", "text/css");
        map.insert("csv", "text/csv");
        map.insert("gif", "image/gif");
        map.insert("gz", "application/gzip");
        map.insert("htm", "text/html");
        map.insert("html", "text/html");
        map.insert("ico", "image/x-icon");
        map.insert("jpg", "image/jpeg");
        map.insert("jpeg", "image/jpeg");
        map.insert("js", "application/javascript");
        map.insert("json", "application/json");
        map.insert("mjs", "application/javascript");
        map.insert("mkv", "video/x-matroska");
        map.insert("mp3", "audio/mpeg");
        map.insert("mp4", "video/mp4");
        map.insert("mpeg", "video/mpeg");
        map.insert("oga", "audio/ogg");
        map.insert("ogv", "video/ogg");
        map.insert("otf", "font/otf");
        map.insert("pdf", "application/pdf");
        map.insert("png", "image/png");
        // 脚本页面模板：HTML / XML / JS 三种风味
        map.insert("qsp", "text/html");
        map.insert("qxml", "text/xml");
        map.insert("qjs", "application/javascript");
        map.insert("svg", "image/svg+xml");
        map.insert("svgz", "image/svg+xml");
        map.insert("tar", "application/x-tar");
        map.insert("tif", "image/tiff");
        map.insert("tiff", "image/tiff");
        map.insert("ttf", "font/ttf");
        map.insert("txt", "text/plain");
        map.insert("wav", "audio/wav");
        map.insert("webm", "video/webm");
        map.insert("webp", "image/webp");
        map.insert("woff", "font/woff");
        map.insert("woff2", "font/woff2");
        map.insert("xhtml", "application/xhtml+xml");
        map.insert("xml", "text/xml");
        map.insert("zip", "application/zip");
        map.insert("7z", "application/x-7z-compressed");
        map
    };
}

/// 按后缀查询 MIME 类型，未知后缀兜底为二进制流。
pub fn mime_for_suffix(suffix: &str) -> &'static str {
    match MIME_TYPES.get(suffix) {
        Some(v) => v,
        None => "application/octet-stream",
    }
}

/// 判断一个后缀是否属于脚本页面后缀族。
pub fn is_script_suffix(suffix: &str) -> bool {
    SCRIPT_SUFFIXES.contains(&suffix)
}

/// 响应类型标签，由解析阶段根据 MIME 类型写入请求上下文。
///
/// `Unknown` 是默认值：后缀在映射表中没有命中并不是错误，
/// 此时交付层直接使用 MIME 表的兜底类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseType {
    #[default]
    Unknown,
    Html,
    Xml,
    Js,
    Css,
    Text,
    Svg,
}

impl ResponseType {
    /// 脚本页面交付时根据标签推导 `Content-Type`。
    /// `Unknown` 不对应任何具体类型，交由调用方兜底。
    pub fn content_type(&self) -> Option<&'static str> {
        match self {
            ResponseType::Html => Some("text/html; charset=utf-8"),
            ResponseType::Xml => Some("text/xml; charset=utf-8"),
            ResponseType::Js => Some("application/javascript"),
            ResponseType::Css => Some("text/css"),
            ResponseType::Text => Some("text/plain; charset=utf-8"),
            ResponseType::Svg => Some("image/svg+xml"),
            ResponseType::Unknown => None,
        }
    }
}

/// 支持的 HTTP 协议版本
#[derive(Debug, Clone, Copy)]
pub enum HttpVersion {
    /// HTTP/1.1 版本
    V1_1,
}

/// 标准 HTTP 请求方法
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HttpRequestMethod {
    /// 获取资源
    Get,
    /// 获取资源的元数据（不包含响应体）
    Head,
    /// 查询服务器支持的选项
    Options,
    /// 提交数据或执行操作
    Post,
}

/// 支持的内容编码（压缩）格式
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HttpEncoding {
    /// GNU zip 压缩
    Gzip,
    /// zlib 压缩
    Deflate,
    /// Brotli 压缩
    Br,
}

use std::fmt;

impl fmt::Display for HttpVersion {
    /// 将枚举格式化为 HTTP 报文中的版本字符串
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            HttpVersion::V1_1 => write!(f, "1.1"),
        }
    }
}

impl fmt::Display for HttpRequestMethod {
    /// 将枚举格式化为 HTTP 标准大写方法名
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            HttpRequestMethod::Get => write!(f, "GET"),
            HttpRequestMethod::Head => write!(f, "HEAD"),
            HttpRequestMethod::Options => write!(f, "OPTIONS"),
            HttpRequestMethod::Post => write!(f, "POST"),
        }
    }
}

impl fmt::Display for HttpEncoding {
    /// 将枚举格式化为 `Content-Encoding` 头所使用的标识符
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            HttpEncoding::Gzip => write!(f, "gzip"),
            HttpEncoding::Deflate => write!(f, "deflate"),
            HttpEncoding::Br => write!(f, "br"),
        }
    }
}

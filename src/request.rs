// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # HTTP 请求处理模块
//!
//! 该模块负责将 TCP 流中读取的原始字节码解析为强类型的 `Request` 结构体。
//! 它涵盖了：
//! 1. 请求行（Request-Line）的解析（方法、路径、版本）。
//! 2. 常用 HTTP 标头（Headers）的提取。
//! 3. 内容协商（Content Negotiation）相关的编码解析。
//!
//! 除了入站字段之外，`Request` 还承载出站侧的写入槽位：
//! 响应类型标签、追加式响应头、内容类型、状态码与响应体缓冲区。
//! 解析器（`resolver` 模块）只读取 URL 字段，按阶段写入出站槽位，
//! 最终由 `response` 模块将整个请求上下文序列化为报文。

use crate::{exception::Exception, param::*};
use bytes::BytesMut;
use log::error;

/// 一次请求的完整上下文：入站元数据 + 出站写入槽位。
///
/// 入站字段在解析完成后不再变化；出站字段在处理过程中每个逻辑阶段至多写一次
/// （响应类型写一次、响应头只追加、响应体恰好写一次）。
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP 请求方法（GET, POST 等）
    method: HttpRequestMethod,
    /// 请求行中的完整基准 URL（查询串已剥离）
    base_url: String,
    /// 相对于共享根目录的资源 URL，约定以 `/` 开头
    resource_url: String,
    /// HTTP 协议版本
    version: HttpVersion,
    /// 客户端标识字符串
    user_agent: String,
    /// 客户端支持的压缩编码列表（按解析顺序排列）
    accept_encoding: Vec<HttpEncoding>,

    // --- 出站侧，由解析与交付阶段写入 ---
    /// 响应类型标签，由内容分类阶段根据文件后缀写入
    response_type: ResponseType,
    /// 追加式响应头集合
    response_headers: Vec<(String, String)>,
    /// 响应体的 `Content-Type`，空路径哨兵（404）时保持为 `None`
    content_type: Option<String>,
    /// HTTP 状态码
    status_code: u16,
    /// 响应体缓冲区
    response: BytesMut,
}

impl Request {
    /// 从原始字节缓冲区尝试构建 `Request` 实例。
    ///
    /// # 逻辑步骤
    /// 1. 验证编码：确保请求数据是合法的 UTF-8 字符串。
    /// 2. 解析请求行：提取方法、路径和协议版本。
    /// 3. 剥离查询串，得到基准 URL 与资源 URL。
    /// 4. 迭代解析标头：识别 `User-Agent` 与 `Accept-Encoding`。
    ///
    /// # 参数
    /// * `buffer` - 从网络 Socket 读取的原始数据。
    /// * `id` - 全局请求 ID，用于在多线程环境下追踪日志。
    ///
    /// # 错误处理
    /// 如果请求格式不符合 HTTP 规范或使用了不支持的方法/版本，将返回相应的 `Exception`。
    pub fn try_from(buffer: &Vec<u8>, id: u128) -> Result<Self, Exception> {
        // 1. 将字节流转换为字符串，失败则判定为非法的 HTTP 请求
        let request_string = match String::from_utf8(buffer.to_vec()) {
            Ok(string) => string,
            Err(_) => {
                error!("[ID{}]无法解析HTTP请求", id);
                return Err(Exception::RequestIsNotUtf8);
            }
        };

        let request_lines: Vec<&str> = request_string.split(CRLF).collect();

        // 2. 解析请求行 (e.g., "GET /index.html HTTP/1.1")
        let first_line_parts: Vec<&str> = request_lines[0].split(" ").collect();

        if first_line_parts.len() < 3 {
            error!("[ID{}]HTTP请求行格式不正确：{}", id, request_lines[0]);
            return Err(Exception::UnSupportedRequestMethod);
        }

        // 解析方法名
        let method_str = first_line_parts[0].to_uppercase();
        let method = match method_str.as_str() {
            "GET" => HttpRequestMethod::Get,
            "HEAD" => HttpRequestMethod::Head,
            "OPTIONS" => HttpRequestMethod::Options,
            "POST" => HttpRequestMethod::Post,
            _ => {
                error!("[ID{}]不支持的HTTP请求方法：{}", id, &method_str);
                return Err(Exception::UnSupportedRequestMethod);
            }
        };

        // 解析协议版本
        let version_str = first_line_parts.last().unwrap().to_uppercase();
        let version = match version_str.as_str() {
            "HTTP/1.1" => HttpVersion::V1_1,
            _ => {
                error!("[ID{}]不支持的HTTP协议版本：{}", id, &version_str);
                return Err(Exception::UnsupportedHttpVersion);
            }
        };

        // 解析路径（考虑到路径中可能包含空格的情况，虽然不规范但通过 join 尝试恢复）
        let raw_path = if first_line_parts.len() == 3 {
            first_line_parts[1].to_string()
        } else {
            first_line_parts[1..first_line_parts.len() - 1].join(" ")
        };

        // 3. 剥离查询串。资源定位只关心路径部分
        let base_url = match raw_path.split_once('?') {
            Some((path, _query)) => path.to_string(),
            None => raw_path,
        };
        let resource_url = base_url.clone();

        // 4. 迭代各行解析 Headers
        let mut user_agent = "".to_string();
        let mut accept_encoding = vec![];
        for line in &request_lines {
            let line_lower = line.to_lowercase();
            // 处理 User-Agent
            if line_lower.starts_with("user-agent") {
                if let Some(val) = line.split(": ").nth(1) {
                    user_agent = val.to_string();
                }
            }
            // 处理 Accept-Encoding，只要包含关键词即视为支持
            else if line_lower.starts_with("accept-encoding") {
                if let Some(val) = line.split(": ").nth(1) {
                    if val.contains("gzip") {
                        accept_encoding.push(HttpEncoding::Gzip);
                    }
                    if val.contains("deflate") {
                        accept_encoding.push(HttpEncoding::Deflate);
                    }
                    if val.contains("br") {
                        accept_encoding.push(HttpEncoding::Br);
                    }
                }
            }
        }

        Ok(Self {
            method,
            base_url,
            resource_url,
            version,
            user_agent,
            accept_encoding,
            response_type: ResponseType::default(),
            response_headers: Vec::new(),
            content_type: None,
            status_code: 200,
            response: BytesMut::new(),
        })
    }
}

// --- 入站侧访问器 ---

impl Request {
    /// 获取 HTTP 协议版本
    pub fn version(&self) -> &HttpVersion {
        &self.version
    }

    /// 获取基准 URL（不含查询参数）
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// 获取资源 URL
    pub fn resource_url(&self) -> &str {
        &self.resource_url
    }

    /// 获取请求方法
    pub fn method(&self) -> HttpRequestMethod {
        self.method
    }

    /// 获取用户代理字符串
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// 获取客户端支持的压缩算法列表
    pub fn accept_encoding(&self) -> &Vec<HttpEncoding> {
        &self.accept_encoding
    }
}

// --- 出站侧写入与访问器 ---

impl Request {
    /// 设置响应类型标签。内容分类阶段对每个请求至多调用一次。
    pub fn set_response_type(&mut self, response_type: ResponseType) {
        self.response_type = response_type;
    }

    pub fn response_type(&self) -> ResponseType {
        self.response_type
    }

    /// 追加一个出站响应头。头集合只增不改。
    pub fn set_response_header(&mut self, name: &str, value: &str) {
        self.response_headers
            .push((name.to_string(), value.to_string()));
    }

    pub fn response_headers(&self) -> &[(String, String)] {
        &self.response_headers
    }

    /// 按名称查询已写入的响应头（大小写不敏感），测试与格式化阶段使用。
    pub fn response_header(&self, name: &str) -> Option<&str> {
        self.response_headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn set_content_type(&mut self, content_type: &str) {
        self.content_type = Some(content_type.to_string());
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn set_status_code(&mut self, code: u16) {
        self.status_code = code;
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// 取得响应体缓冲区的可写引用，渲染器与交付层向其中写入内容。
    pub fn response_mut(&mut self) -> &mut BytesMut {
        &mut self.response
    }

    pub fn response_body(&self) -> &[u8] {
        &self.response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 验证常规 GET 请求的解析，包括 Path 和 Headers
    #[test]
    fn test_parse_get_request() {
        let request_str = "GET / HTTP/1.1\r\nHost: localhost:7878\r\nUser-Agent: Test-Browser\r\nAccept-Encoding: gzip, deflate, br\r\n\r\n";
        let buffer = request_str.as_bytes().to_vec();

        let request = Request::try_from(&buffer, 0).unwrap();

        assert_eq!(request.method(), HttpRequestMethod::Get);
        assert_eq!(request.resource_url(), "/");
        assert_eq!(request.user_agent(), "Test-Browser");
        assert!(request.accept_encoding().contains(&HttpEncoding::Gzip));
        assert!(request.accept_encoding().contains(&HttpEncoding::Deflate));
        assert!(request.accept_encoding().contains(&HttpEncoding::Br));
    }

    /// 验证 HEAD 请求的解析
    #[test]
    fn test_parse_head_request() {
        let request_str =
            "HEAD /index.html HTTP/1.1\r\nHost: localhost:7878\r\nUser-Agent: Test-Agent\r\n\r\n";
        let buffer = request_str.as_bytes().to_vec();

        let request = Request::try_from(&buffer, 0).unwrap();

        assert_eq!(request.method(), HttpRequestMethod::Head);
        assert_eq!(request.resource_url(), "/index.html");
    }

    /// 确保查询参数被剥离，只保留路径部分
    #[test]
    fn test_query_string_stripped() {
        let request_str = "GET /page.html?id=123&name=test HTTP/1.1\r\nHost: localhost:7878\r\n\r\n";
        let buffer = request_str.as_bytes().to_vec();

        let request = Request::try_from(&buffer, 0).unwrap();

        assert_eq!(request.base_url(), "/page.html");
        assert_eq!(request.resource_url(), "/page.html");
    }

    /// OPTIONS * 请求的资源 URL 不以 `/` 开头，由解析器按非法形状处理
    #[test]
    fn test_parse_options_request() {
        let request_str = "OPTIONS * HTTP/1.1\r\nHost: localhost:7878\r\n\r\n";
        let buffer = request_str.as_bytes().to_vec();

        let request = Request::try_from(&buffer, 0).unwrap();

        assert_eq!(request.method(), HttpRequestMethod::Options);
        assert_eq!(request.resource_url(), "*");
    }

    /// 确保不支持的 HTTP 方法（如 DELETE）会返回错误
    #[test]
    fn test_unsupported_method() {
        let request_str = "DELETE /resource HTTP/1.1\r\nHost: localhost:7878\r\n\r\n";
        let buffer = request_str.as_bytes().to_vec();

        let result = Request::try_from(&buffer, 0);

        assert!(result.is_err());
        match result.unwrap_err() {
            Exception::UnSupportedRequestMethod => {}
            _ => panic!("Expected UnSupportedRequestMethod error"),
        }
    }

    /// 确保不支持的版本（如 HTTP/2.0）被正确拒绝
    #[test]
    fn test_unsupported_http_version() {
        let request_str = "GET / HTTP/2.0\r\nHost: localhost:7878\r\n\r\n";
        let buffer = request_str.as_bytes().to_vec();

        let result = Request::try_from(&buffer, 0);

        assert!(result.is_err());
        match result.unwrap_err() {
            Exception::UnsupportedHttpVersion => {}
            _ => panic!("Expected UnsupportedHttpVersion error"),
        }
    }

    /// 验证 UTF-8 编码检查
    #[test]
    fn test_invalid_utf8() {
        let buffer = vec![0xFF, 0xFE, 0xFD];

        let result = Request::try_from(&buffer, 0);

        assert!(result.is_err());
        match result.unwrap_err() {
            Exception::RequestIsNotUtf8 => {}
            _ => panic!("Expected RequestIsNotUtf8 error"),
        }
    }

    /// 验证 Header 字段名是否大小写不敏感
    #[test]
    fn test_case_insensitive_headers() {
        let request_str = "GET / HTTP/1.1\r\nhost: localhost:7878\r\nuser-agent: Test\r\naccept-encoding: gzip\r\n\r\n";
        let buffer = request_str.as_bytes().to_vec();

        let request = Request::try_from(&buffer, 0).unwrap();

        assert_eq!(request.user_agent(), "Test");
        assert!(request.accept_encoding().contains(&HttpEncoding::Gzip));
    }

    /// 测试缺失编码标头时，解析列表应为空
    #[test]
    fn test_no_encoding_header() {
        let request_str = "GET / HTTP/1.1\r\nHost: localhost:7878\r\n\r\n";
        let buffer = request_str.as_bytes().to_vec();

        let request = Request::try_from(&buffer, 0).unwrap();

        assert!(request.accept_encoding().is_empty());
    }

    /// 出站槽位的初始状态：200、无标签、无头、空响应体
    #[test]
    fn test_outgoing_defaults() {
        let request_str = "GET / HTTP/1.1\r\nHost: localhost:7878\r\n\r\n";
        let buffer = request_str.as_bytes().to_vec();

        let request = Request::try_from(&buffer, 0).unwrap();

        assert_eq!(request.status_code(), 200);
        assert_eq!(request.response_type(), ResponseType::Unknown);
        assert!(request.response_headers().is_empty());
        assert!(request.response_body().is_empty());
        assert!(request.content_type().is_none());
    }

    /// 响应头是追加语义，且按名称查询不区分大小写
    #[test]
    fn test_response_headers_additive() {
        let request_str = "GET / HTTP/1.1\r\nHost: localhost:7878\r\n\r\n";
        let buffer = request_str.as_bytes().to_vec();
        let mut request = Request::try_from(&buffer, 0).unwrap();

        request.set_response_header("X-UA-Compatible", "IE=Edge");
        request.set_response_header("Content-Security-Policy", "frame-src 'none';");

        assert_eq!(request.response_headers().len(), 2);
        assert_eq!(request.response_header("x-ua-compatible"), Some("IE=Edge"));
        assert_eq!(
            request.response_header("Content-Security-Policy"),
            Some("frame-src 'none';")
        );
        assert_eq!(request.response_header("X-Missing"), None);
    }

    /// 验证请求方法的小写兼容性处理
    #[test]
    fn test_lowercase_method() {
        let request_str = "get / HTTP/1.1\r\nHost: localhost:7878\r\n\r\n";
        let buffer = request_str.as_bytes().to_vec();

        let request = Request::try_from(&buffer, 0).unwrap();

        assert_eq!(request.method(), HttpRequestMethod::Get);
    }
}

// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # Exception 模块
//!
//! 该模块定义了服务器在请求处理生命周期中可能出现的各类异常情况。
//!
//! ## 设计意图
//! - **错误分类**：涵盖协议解析错误、路径解析与越权检查错误以及脚本页面渲染错误。
//! - **本地消化**：解析阶段的所有失败都不会向调用方传播，而是统一折叠为
//!   空响应体的 404（见 `resolver` 模块），客户端永远看不到诊断信息。
//! - **用户友好**：通过实现 `std::fmt::Display`，确保错误信息可以被安全地记录到日志中。

use std::fmt;

/// 服务器处理请求过程中发生的异常类型。
///
/// 该枚举通常作为 `Result` 的 `Err` 部分返回，用于指示处理失败的具体原因。
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Exception {
    /// 客户端发送的请求字节流无法解析为合法的 UTF-8 字符串。
    /// 这通常发生在请求头或正文包含非法字符时。
    RequestIsNotUtf8,
    /// 客户端使用了服务器暂不支持的 HTTP 方法（例如：使用了非 GET/POST 方法）。
    UnSupportedRequestMethod,
    /// 客户端使用了服务器不支持的 HTTP 协议版本（例如：HTTP/0.9 或过高的版本）。
    UnsupportedHttpVersion,
    /// 资源 URL 没有以 `/` 开头，请求形状非法，解析立即终止。
    InvalidRequestShape,
    /// 在共享根目录下未找到所请求的文件，且存储组也没有给出替代路径。
    ResourceNotFound,
    /// 规范化后的路径逃出了共享根目录，且候选资源未被存储组信任。
    /// 对外表现与 `ResourceNotFound` 完全一致，不泄露任何遍历尝试的信息。
    PathTraversalRejected,
    /// 存储组查找返回空结果，回落到普通候选路径的存在性判断。
    StorageGroupMiss,
    /// 模板渲染器执行脚本页面失败。
    ScriptExecuteFailed,
}

use Exception::*;

/// 为 `Exception` 实现 `Display` 特性，使其支持字符串格式化输出。
///
/// 这些描述信息只用于系统日志（Logging），永远不会出现在响应体中。
impl fmt::Display for Exception {
    /// 根据错误类型写入人类可读的描述文本。
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestIsNotUtf8 => write!(f, "Request bytes can't be parsed in UTF-8"),
            UnSupportedRequestMethod => write!(f, "Unsupported request method"),
            UnsupportedHttpVersion => write!(f, "Unsupported HTTP version"),
            InvalidRequestShape => write!(f, "Resource url doesn't start with '/'"),
            ResourceNotFound => write!(f, "Resource not found (404)"),
            PathTraversalRejected => write!(f, "Canonical path escapes the share root"),
            StorageGroupMiss => write!(f, "No matching file in that storage group"),
            ScriptExecuteFailed => write!(f, "Couldn't evaluate script page"),
        }
    }
}

// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 资源解析与分发模块
//!
//! 这是整个服务器唯一带有真实判定逻辑和安全属性的部分：把入站的资源 URL
//! 解析为一个安全的文件系统产物，并决定它的交付方式。
//!
//! 每个请求走一遍固定的状态机：
//!
//! ```text
//! 形状检查 -> 路径拼接 -> 目录索引替换 -> 存储组改写(可选) -> 存在性检查
//!   -> 越权检查(未受信任时) -> 符号链接跟随 -> 内容分类
//!   -> {脚本后缀 -> 模板渲染} | {其余 -> 安全头 + 静态交付}
//! ```
//!
//! 任何一步失败都从"未找到回退"出口离开：交付空路径哨兵，得到空响应体的
//! 404。越权拒绝与真实缺失在客户端看来完全一致，不泄露遍历尝试的信息。

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, error, warn};

use crate::config::Config;
use crate::exception::Exception;
use crate::param::*;
use crate::request::Request;
use crate::response::FileDelivery;
use crate::scripting::{RenderContext, ScriptHost, TemplateRenderer};
use crate::storage::{StorageGroupLookup, StorageGroups};

/// 从存储组 URL 解析出的引用：组名 + 组内相对路径。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageGroupReference {
    pub group: String,
    pub relative_path: String,
}

/// 解析保留前缀 `/StorageGroup/<组名>/<相对路径...>`。
///
/// 逐段切分并做边界检查：组名是第 3 个路径段，相对路径是其后的全部段。
/// 组名或相对路径缺失（例如 `/StorageGroup/` 或 `/StorageGroup/g`）时
/// 返回 `None`，由调用方回落到普通候选路径。
pub fn parse_storage_group_url(resource_url: &str) -> Option<StorageGroupReference> {
    let segments: Vec<&str> = resource_url.split('/').collect();
    // 期望形如 ["", "StorageGroup", <组名>, <段>...]
    if segments.len() < 4 {
        return None;
    }
    if segments[1] != "StorageGroup" {
        return None;
    }
    let group = segments[2];
    if group.is_empty() {
        return None;
    }
    let relative_path = segments[3..].join("/");
    if relative_path.is_empty() {
        return None;
    }
    Some(StorageGroupReference {
        group: group.to_string(),
        relative_path,
    })
}

/// 根据 MIME 类型推导响应类型标签。
///
/// `svgz` 是预压缩的 SVG，虽然 MIME 同为 `image/svg+xml`，
/// 但不能打上 SVG 标签。没有命中的类型保持 `Unknown`，这不是错误。
fn classify(mime: &str, suffix: &str) -> ResponseType {
    if mime.starts_with("text/html") {
        ResponseType::Html
    } else if mime.starts_with("text/xml") {
        ResponseType::Xml
    } else if mime.starts_with("application/javascript") {
        ResponseType::Js
    } else if mime.starts_with("text/css") {
        ResponseType::Css
    } else if mime.starts_with("text/plain") {
        ResponseType::Text
    } else if mime.starts_with("image/svg+xml") && suffix != "svgz" {
        ResponseType::Svg
    } else {
        ResponseType::Unknown
    }
}

/// 共享目录内容解析器。
///
/// 持有不可变的共享根目录配置与两个注入的协作者（存储组查找、模板渲染），
/// 构造之后对并发请求只读共享。
pub struct HtmlExtension {
    /// 共享根目录（规范化后的绝对路径）
    share_path: PathBuf,
    /// 越权检查使用的前缀：规范化、转小写、保证以 `/` 结尾
    canonical_share_prefix: String,
    /// 目录请求替换索引文件时的文件名主体
    index_base: String,
    groups: Arc<dyn StorageGroupLookup + Send + Sync>,
    scripting: Arc<dyn TemplateRenderer + Send + Sync>,
    delivery: FileDelivery,
}

impl HtmlExtension {
    /// 生产构造：存储组来自配置表，渲染器为内置的 `ScriptHost`。
    pub fn new(config: &Config) -> Self {
        Self::with_collaborators(
            config,
            Arc::new(StorageGroups::from_config(config)),
            Arc::new(ScriptHost::new()),
        )
    }

    /// 显式注入协作者的构造，测试中用 mock 替换。
    pub fn with_collaborators(
        config: &Config,
        groups: Arc<dyn StorageGroupLookup + Send + Sync>,
        scripting: Arc<dyn TemplateRenderer + Send + Sync>,
    ) -> Self {
        let share_path = match fs::canonicalize(config.share_root()) {
            Ok(p) => p,
            Err(e) => {
                // 根目录无法规范化时所有非存储组请求都会被越权检查拒绝
                warn!("无法规范化共享根目录{}：{}", config.share_root(), e);
                PathBuf::from(config.share_root())
            }
        };
        let mut canonical_share_prefix = share_path.to_string_lossy().to_lowercase();
        if !canonical_share_prefix.ends_with(std::path::MAIN_SEPARATOR) {
            canonical_share_prefix.push(std::path::MAIN_SEPARATOR);
        }
        debug!("共享根目录：{}", share_path.display());
        Self {
            share_path,
            canonical_share_prefix,
            index_base: config.index_base(),
            groups,
            scripting,
            delivery: FileDelivery::from_capacity(config.cache_size()),
        }
    }

    /// 处理一条请求，返回"已处理"标志。
    ///
    /// 本解析器对所有交给它的请求都返回 `true`：状态级语义（200/404）
    /// 完全体现在写入请求上下文的内容中，不通过返回值或错误传播。
    pub fn process_request(&self, request: &mut Request, id: u128) -> bool {
        let resource_url = request.resource_url().to_string();

        // 1. 形状检查：资源 URL 必须以 '/' 开头
        if !resource_url.starts_with('/') {
            debug!(
                "[ID{}]{}：{}",
                id,
                Exception::InvalidRequestShape,
                resource_url
            );
            return self.not_found(request, id);
        }

        // 2. 路径拼接：共享根目录 + 资源 URL
        let mut candidate = self.share_path.join(&resource_url[1..]);

        // 3. 目录请求替换为索引文件，脚本索引优先于静态索引
        if candidate.is_dir() {
            let script_index = candidate.join(format!("{}.qsp", self.index_base));
            candidate = if script_index.exists() {
                script_index
            } else {
                candidate.join(format!("{}.html", self.index_base))
            };
        }

        // 4. 存储组改写：命中保留前缀时向查找器要真实路径，
        //    拿到的路径取代候选并跳过越权检查；未命中则回落
        let mut trusted = false;
        if resource_url.starts_with(STORAGE_GROUP_PREFIX) {
            if let Some(reference) = parse_storage_group_url(&resource_url) {
                match self
                    .groups
                    .find_file(&reference.group, &reference.relative_path)
                {
                    Some(file) => {
                        debug!("[ID{}]存储组{}给出路径：{}", id, reference.group, file);
                        candidate = PathBuf::from(file);
                        trusted = true;
                    }
                    None => {
                        debug!(
                            "[ID{}]{}：{}/{}",
                            id,
                            Exception::StorageGroupMiss,
                            reference.group,
                            reference.relative_path
                        );
                    }
                }
            }
        }

        // 5. 存在性检查
        if !trusted && !candidate.exists() {
            debug!("[ID{}]{}：{}", id, Exception::ResourceNotFound, resource_url);
            return self.not_found(request, id);
        }

        // 6. 规范化。存储组命中但文件已消失的情形也在这里折叠为 404
        let canonical = match fs::canonicalize(&candidate) {
            Ok(p) => p,
            Err(_) => {
                debug!("[ID{}]{}：{}", id, Exception::ResourceNotFound, resource_url);
                return self.not_found(request, id);
            }
        };

        // 7. 越权检查：未受信任的候选，其规范化路径必须落在共享根目录之内。
        //    拒绝与真实缺失对外不可区分
        if !trusted && !self.contained(&canonical) {
            warn!(
                "[ID{}]{}：{} -> {}",
                id,
                Exception::PathTraversalRejected,
                resource_url,
                canonical.display()
            );
            return self.not_found(request, id);
        }

        // 8. 符号链接跟随：候选本身是符号链接时，后续分类与交付
        //    使用链接目标路径，目标不再重新校验
        let resolved = self.follow_symlink(&candidate, canonical);
        let resolved_str = resolved.to_string_lossy().to_string();

        // 9. 内容分类：小写后缀 -> MIME -> 响应类型标签
        let suffix = resolved
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        let mime = mime_for_suffix(&suffix);
        let response_type = classify(mime, &suffix);
        if response_type != ResponseType::Unknown {
            request.set_response_type(response_type);
        }

        // 10. 分发：脚本后缀交给模板渲染器，渲染分支不附加静态安全头
        if is_script_suffix(&suffix) {
            let context = RenderContext::from_request(request);
            let mut rendered = Vec::new();
            match self.scripting.render(&mut rendered, &resolved_str, &context) {
                Ok(()) => {
                    debug!("[ID{}]脚本页面渲染完成：{}", id, resolved_str);
                    request.set_status_code(200);
                    request.response_mut().extend_from_slice(&rendered);
                }
                Err(e) => {
                    error!("[ID{}]脚本页面{}渲染失败：{}", id, resolved_str, e);
                    return self.not_found(request, id);
                }
            }
            return true;
        }

        // 11. 静态交付：先附加两个固定安全头，再交付文件
        request.set_response_header("X-UA-Compatible", X_UA_COMPATIBLE);
        request.set_response_header("Content-Security-Policy", CONTENT_SECURITY_POLICY);
        self.delivery.deliver(request, &resolved_str, id);
        true
    }

    /// 未找到回退：交付空路径哨兵，依然返回"已处理"。
    fn not_found(&self, request: &mut Request, id: u128) -> bool {
        self.delivery.deliver(request, "", id);
        true
    }

    /// 越权检查：规范化路径（转小写）是否以共享根目录前缀开头。
    fn contained(&self, canonical: &Path) -> bool {
        canonical
            .to_string_lossy()
            .to_lowercase()
            .starts_with(&self.canonical_share_prefix)
    }

    /// 候选是符号链接时返回链接目标（相对目标基于候选所在目录补全），
    /// 否则返回已规范化的路径。
    fn follow_symlink(&self, candidate: &Path, canonical: PathBuf) -> PathBuf {
        let is_symlink = fs::symlink_metadata(candidate)
            .map(|meta| meta.file_type().is_symlink())
            .unwrap_or(false);
        if !is_symlink {
            return canonical;
        }
        match fs::read_link(candidate) {
            Ok(target) => {
                if target.is_absolute() {
                    target
                } else {
                    match candidate.parent() {
                        Some(parent) => parent.join(target),
                        None => target,
                    }
                }
            }
            Err(_) => canonical,
        }
    }
}

// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 脚本页面渲染模块
//!
//! `qsp`/`qxml`/`qjs` 后缀的资源不按静态字节交付，而是作为模板动态求值。
//! 解析器通过 `TemplateRenderer` 接口把输出流、规范化后的模板路径和请求
//! 上下文交给渲染器，渲染结果即响应体；该分支不附加静态交付的安全头，
//! 响应内容完全由渲染器负责。
//!
//! 内置实现 `ScriptHost` 是一个轻量的占位符展开器：读入模板文本，
//! 把 `${NAME}` 形式的占位符替换为请求上下文中的对应值。

use std::fs;
use std::io::Write;

use chrono::Local;
use log::warn;
use regex::{Captures, Regex};

use crate::exception::Exception;
use crate::param::SERVER_NAME;
use crate::request::Request;

/// 传递给渲染器的请求上下文快照。
///
/// 渲染发生时响应体缓冲区正被独占借用，因此这里持有入站字段的拷贝
/// 而不是整个 `Request` 的引用。
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub base_url: String,
    pub resource_url: String,
    pub user_agent: String,
}

impl RenderContext {
    pub fn from_request(request: &Request) -> Self {
        Self {
            base_url: request.base_url().to_string(),
            resource_url: request.resource_url().to_string(),
            user_agent: request.user_agent().to_string(),
        }
    }
}

/// 模板求值接口：`(输出流, 模板路径, 请求上下文) -> ()`。
///
/// 渲染失败不向客户端暴露任何诊断信息，调用方只记录日志。
#[cfg_attr(test, mockall::automock)]
pub trait TemplateRenderer {
    fn render(
        &self,
        out: &mut dyn Write,
        path: &str,
        context: &RenderContext,
    ) -> Result<(), Exception>;
}

/// 内置的占位符模板渲染器。
pub struct ScriptHost {
    placeholder: Regex,
}

impl ScriptHost {
    pub fn new() -> Self {
        Self {
            // 占位符形如 ${NAME}，名称限定为标识符字符
            placeholder: Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap(),
        }
    }

    fn expand(&self, template: &str, context: &RenderContext) -> String {
        self.placeholder
            .replace_all(template, |caps: &Captures| match &caps[1] {
                "SERVER_NAME" => SERVER_NAME.to_string(),
                "BASE_URL" => context.base_url.clone(),
                "RESOURCE_URL" => context.resource_url.clone(),
                "USER_AGENT" => context.user_agent.clone(),
                "DATE" => Local::now().format("%Y-%m-%d %H:%M:%S %Z").to_string(),
                other => {
                    warn!("模板中出现未知的占位符：${{{}}}", other);
                    String::new()
                }
            })
            .into_owned()
    }
}

impl Default for ScriptHost {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateRenderer for ScriptHost {
    fn render(
        &self,
        out: &mut dyn Write,
        path: &str,
        context: &RenderContext,
    ) -> Result<(), Exception> {
        let template = match fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) => {
                warn!("无法读取模板文件{}：{}", path, e);
                return Err(Exception::ScriptExecuteFailed);
            }
        };
        let expanded = self.expand(&template, context);
        out.write_all(expanded.as_bytes())
            .map_err(|_| Exception::ScriptExecuteFailed)?;
        Ok(())
    }
}

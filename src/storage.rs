// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 存储组模块
//!
//! 共享根目录之外的内容通过"存储组"间接挂载：配置文件把组名映射到若干个
//! 磁盘目录，资源 URL 命中保留前缀 `/StorageGroup/` 时由本模块按组名查找
//! 真实文件。查找成功的路径会取代常规候选路径并被标记为受信任，
//! 跳过共享根目录的越权检查。

use std::collections::HashMap;
use std::path::{Component, Path};

use log::debug;

use crate::config::Config;

/// 存储组查找接口：`(组名, 相对路径)` -> 绝对路径或未命中。
///
/// 解析器通过该接口与具体实现解耦，测试中可以注入 mock。
#[cfg_attr(test, mockall::automock)]
pub trait StorageGroupLookup {
    /// 在给定组中查找相对路径对应的文件，返回其绝对路径。
    /// `None` 表示该组中没有匹配的文件。
    fn find_file(&self, group: &str, relative_path: &str) -> Option<String>;
}

/// 基于配置表的存储组实现。
///
/// 每个组对应一个有序的目录列表，按顺序查找，第一个存在的普通文件胜出。
pub struct StorageGroups {
    groups: HashMap<String, Vec<String>>,
}

impl StorageGroups {
    pub fn from_config(config: &Config) -> Self {
        Self {
            groups: config.storage_groups().clone(),
        }
    }

    #[cfg(test)]
    pub fn from_map(groups: HashMap<String, Vec<String>>) -> Self {
        Self { groups }
    }

    /// 相对路径必须是纯粹的下行路径：非空，不含 `..` 段，也不能是绝对路径。
    /// 存储组本身绕过共享根目录的越权检查，查找入口必须自行把关。
    fn is_clean_relative(relative_path: &str) -> bool {
        if relative_path.is_empty() {
            return false;
        }
        let path = Path::new(relative_path);
        path.components().all(|c| match c {
            Component::Normal(_) | Component::CurDir => true,
            _ => false,
        })
    }
}

impl StorageGroupLookup for StorageGroups {
    fn find_file(&self, group: &str, relative_path: &str) -> Option<String> {
        if !Self::is_clean_relative(relative_path) {
            debug!("存储组{}拒绝了不合规的相对路径：{}", group, relative_path);
            return None;
        }
        let dirs = self.groups.get(group)?;
        for dir in dirs {
            let candidate = Path::new(dir).join(relative_path);
            if candidate.is_file() {
                debug!("存储组{}命中文件：{}", group, candidate.display());
                return candidate.to_str().map(|s| s.to_string());
            }
        }
        None
    }
}

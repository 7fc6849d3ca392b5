use num_cpus;
use serde_derive::Deserialize;
use serde_derive::Serialize;

use core::str;
use log::{error, warn};
use std::collections::HashMap;
use std::fs::File;
use std::io::prelude::*;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    share_root: String,
    port: u16,
    worker_threads: usize,
    cache_size: usize,
    local: bool,
    #[serde(default = "default_app_prefix")]
    app_prefix: String,
    /// 存储组表：组名 -> 若干个位于共享根目录之外的内容目录，按顺序查找
    #[serde(default)]
    storage_groups: HashMap<String, Vec<String>>,
}

fn default_app_prefix() -> String {
    "".to_string()
}

impl Config {
    pub fn new() -> Self {
        Self {
            share_root: "share".to_string(),
            port: 7878,
            worker_threads: 0,
            cache_size: 5,
            local: true,
            app_prefix: default_app_prefix(),
            storage_groups: HashMap::new(),
        }
    }

    pub fn from_toml(filename: &str) -> Self {
        let mut file = match File::open(filename) {
            Ok(f) => f,
            Err(e) => panic!("no such file {} exception:{}", filename, e),
        };
        let mut str_val = String::new();
        match file.read_to_string(&mut str_val) {
            Ok(s) => s,
            Err(e) => panic!("Error Reading file: {}", e),
        };

        let mut raw_config = match toml::from_str(&str_val) {
            Ok(t) => t,
            Err(_) => {
                error!("无法成功从配置文件构建配置对象，使用默认配置");
                Config::new()
            }
        };
        if raw_config.worker_threads == 0 {
            raw_config.worker_threads = num_cpus::get();
        }
        if raw_config.cache_size == 0 {
            warn!("cache_size被设置为0，但目前尚不支持禁用缓存，因此该值将被改为5。");
            raw_config.cache_size = 5;
        }
        raw_config
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn share_root(&self) -> &str {
        &self.share_root
    }

    /// 目录请求替换成索引文件时使用的文件名主体：`<app_prefix>index`
    pub fn index_base(&self) -> String {
        format!("{}index", self.app_prefix)
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn worker_threads(&self) -> usize {
        self.worker_threads
    }

    pub fn cache_size(&self) -> usize {
        self.cache_size
    }

    pub fn local(&self) -> bool {
        self.local
    }

    pub fn app_prefix(&self) -> &str {
        &self.app_prefix
    }

    pub fn storage_groups(&self) -> &HashMap<String, Vec<String>> {
        &self.storage_groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::new();
        assert_eq!(config.share_root(), "share");
        assert_eq!(config.port(), 7878);
        assert_eq!(config.index_base(), "index");
        assert!(config.storage_groups().is_empty());
    }

    #[test]
    fn test_index_base_with_prefix() {
        let mut config = Config::new();
        config.app_prefix = "myth".to_string();
        assert_eq!(config.index_base(), "mythindex");
    }

    #[test]
    fn test_parse_toml_with_storage_groups() {
        let toml_str = r#"
            share_root = "/srv/www"
            port = 8080
            worker_threads = 4
            cache_size = 16
            local = true
            app_prefix = "app"

            [storage_groups]
            Videos = ["/data/videos", "/mnt/more_videos"]
            Music = ["/data/music"]
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.share_root(), "/srv/www");
        assert_eq!(config.index_base(), "appindex");
        assert_eq!(config.storage_groups()["Videos"].len(), 2);
        assert_eq!(config.storage_groups()["Music"][0], "/data/music");
    }
}

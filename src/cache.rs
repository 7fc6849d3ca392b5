use std::num::NonZeroUsize;
use std::time::SystemTime;

use bytes::Bytes;
use lru::LruCache;

/// 一条交付缓存记录：文件内容、交付时使用的 MIME 类型以及入缓存时的修改时间。
#[derive(Clone)]
struct CacheEntry {
    content: Bytes,
    mime: &'static str,
    modified_time: SystemTime,
}

/// 静态交付层的文件内容缓存。
///
/// 以规范化后的文件路径为键，修改时间作为失效依据：磁盘上的文件一旦被改动，
/// 旧记录即视为无效。缓存的是交付内容而不是解析结果，
/// 每次请求的路径解析与越权检查仍然完整执行。
pub struct DeliveryCache {
    cache: LruCache<String, CacheEntry>,
}

impl DeliveryCache {
    // 根据容量构造
    pub fn from_capacity(capacity: usize) -> Self {
        if capacity == 0 {
            panic!("调用from_capacity时指定的大小是0。如果需要自动设置大小，请在调用处进行处理，而不是传入0");
        }
        Self {
            cache: LruCache::new(NonZeroUsize::new(capacity).unwrap()),
        }
    }

    // 放入
    pub fn push(
        &mut self,
        path: &str,
        bytes: Bytes,
        mime: &'static str,
        modified_time: SystemTime,
    ) {
        let entry = CacheEntry {
            content: bytes,
            mime,
            modified_time,
        };
        self.cache.put(path.to_string(), entry);
    }

    // 查询有效缓存，返回内容与 MIME 类型
    pub fn find(
        &mut self,
        path: &str,
        current_modified_time: SystemTime,
    ) -> Option<(Bytes, &'static str)> {
        match self.cache.get(path) {
            Some(entry) => {
                if entry.modified_time == current_modified_time {
                    Some((entry.content.clone(), entry.mime))
                } else {
                    None
                }
            }
            None => None,
        }
    }

    // 测试
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    #[cfg(test)]
    pub fn capacity(&self) -> usize {
        self.cache.cap().get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};

    #[test]
    fn test_cache_creation() {
        let cache = DeliveryCache::from_capacity(10);
        assert_eq!(cache.capacity(), 10);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    #[should_panic(expected = "调用from_capacity时指定的大小是0")]
    fn test_cache_zero_capacity_panics() {
        DeliveryCache::from_capacity(0);
    }

    #[test]
    fn test_cache_push_and_find() {
        let mut cache = DeliveryCache::from_capacity(3);
        let time = SystemTime::now();
        let content = Bytes::from("<html></html>");

        cache.push("/srv/www/a.html", content.clone(), "text/html", time);
        assert_eq!(cache.len(), 1);

        let found = cache.find("/srv/www/a.html", time);
        assert!(found.is_some());
        let (bytes, mime) = found.unwrap();
        assert_eq!(bytes, content);
        assert_eq!(mime, "text/html");
    }

    #[test]
    fn test_cache_modified_time_invalidation() {
        let mut cache = DeliveryCache::from_capacity(3);
        let time1 = SystemTime::now();
        let time2 = time1 + Duration::from_secs(10);

        cache.push("/srv/www/a.css", Bytes::from("body{}"), "text/css", time1);

        // 磁盘文件已更新：旧记录失效
        assert!(cache.find("/srv/www/a.css", time2).is_none());
        assert!(cache.find("/srv/www/a.css", time1).is_some());
    }

    #[test]
    fn test_cache_lru_eviction() {
        let mut cache = DeliveryCache::from_capacity(2);
        let time = SystemTime::now();

        cache.push("/a", Bytes::from("1"), "text/plain", time);
        cache.push("/b", Bytes::from("2"), "text/plain", time);
        assert_eq!(cache.len(), 2);

        cache.find("/a", time);

        cache.push("/c", Bytes::from("3"), "text/plain", time);
        assert_eq!(cache.len(), 2);

        assert!(cache.find("/b", time).is_none());
        assert!(cache.find("/a", time).is_some());
        assert!(cache.find("/c", time).is_some());
    }

    #[test]
    fn test_cache_update_existing() {
        let mut cache = DeliveryCache::from_capacity(3);
        let time1 = SystemTime::now();
        let time2 = time1 + Duration::from_secs(10);

        cache.push("/a.txt", Bytes::from("old"), "text/plain", time1);
        cache.push("/a.txt", Bytes::from("new"), "text/plain", time2);

        assert!(cache.find("/a.txt", time1).is_none());

        let found = cache.find("/a.txt", time2);
        assert!(found.is_some());
        assert_eq!(found.unwrap().0, Bytes::from("new"));
    }

    #[test]
    fn test_cache_not_found() {
        let mut cache = DeliveryCache::from_capacity(3);
        let time = SystemTime::now();

        assert!(cache.find("/nonexistent.txt", time).is_none());
    }
}

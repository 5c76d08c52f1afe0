//! Cache Key - 缓存 key 生成
//!
//! 缓存 key 由文本和有序的区分参数（音色、模型、格式等）决定，
//! 同时用作持久化缓存服务端的查找 key，因此必须跨进程稳定。

use serde::{Deserialize, Serialize};

/// 文本与区分参数之间的分隔符
const KEY_SEPARATOR: &str = "-";

/// 紧凑 key 的十六进制宽度
const COMPACT_KEY_WIDTH: usize = 8;

/// 缓存 key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CacheKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

/// key 摘要算法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyDigest {
    /// 32 位滚动哈希，8 位十六进制（与已有缓存文件兼容）
    #[default]
    Compact,
    /// MD5，32 位十六进制
    Md5,
}

/// 缓存 key 生成器
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheKeyGenerator {
    digest: KeyDigest,
}

impl CacheKeyGenerator {
    pub fn new(digest: KeyDigest) -> Self {
        Self { digest }
    }

    /// 生成缓存 key
    ///
    /// 区分参数的顺序有意义，不做排序归一化
    pub fn generate(&self, text: &str, discriminators: &[&str]) -> CacheKey {
        let content = key_content(text, discriminators);
        match self.digest {
            KeyDigest::Compact => CacheKey(compact_hash(&content)),
            KeyDigest::Md5 => CacheKey(format!("{:x}", md5::compute(content.as_bytes()))),
        }
    }
}

/// 使用紧凑摘要生成缓存 key
pub fn generate_cache_key(text: &str, discriminators: &[&str]) -> CacheKey {
    CacheKeyGenerator::default().generate(text, discriminators)
}

fn key_content(text: &str, discriminators: &[&str]) -> String {
    format!(
        "{}{}{}",
        text,
        KEY_SEPARATOR,
        discriminators.join(KEY_SEPARATOR)
    )
}

/// `hash = hash * 31 + unit`，按 UTF-16 码元累加并在 32 位上回绕
fn compact_hash(content: &str) -> String {
    let hash = content
        .encode_utf16()
        .fold(0i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(unit as i32));

    // i32::MIN 取绝对值需要 64 位
    let magnitude = (hash as i64).abs();
    let mut hex = format!("{:0width$x}", magnitude, width = COMPACT_KEY_WIDTH);
    hex.truncate(COMPACT_KEY_WIDTH);
    hex
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vectors() {
        assert_eq!(generate_cache_key("Hello", &["mock", "120"]).as_str(), "7b0465d9");
        assert_eq!(generate_cache_key("Hello", &[]).as_str(), "7f611245");
        assert_eq!(generate_cache_key("a", &[]).as_str(), "00000bec");
    }

    #[test]
    fn test_non_ascii_text_uses_utf16_units() {
        assert_eq!(generate_cache_key("héllo 🎙", &["x"]).as_str(), "78fe989a");
    }

    #[test]
    fn test_same_input_same_key() {
        let a = generate_cache_key("Hello", &["mock", "120", "v1"]);
        let b = generate_cache_key("Hello", &["mock", "120", "v1"]);
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 8);
    }

    #[test]
    fn test_discriminators_distinguish_keys() {
        let base = generate_cache_key("Hello", &["mock", "120", "v1"]);
        let other_voice = generate_cache_key("Hello", &["mock", "120", "v2"]);
        let reordered = generate_cache_key("Hello", &["v1", "mock", "120"]);

        assert_eq!(base.as_str(), "5b3897e1");
        assert_eq!(reordered.as_str(), "0d641a1d");
        assert_ne!(base, other_voice);
        assert_ne!(base, reordered);
    }

    #[test]
    fn test_min_hash_is_eight_chars() {
        assert_eq!(compact_hash(""), "00000000");
        let key = compact_hash("some longer text that wraps the accumulator many times");
        assert_eq!(key.len(), 8);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_md5_digest() {
        let generator = CacheKeyGenerator::new(KeyDigest::Md5);
        let key = generator.generate("Hello", &["mock", "120"]);
        assert_eq!(key.as_str(), "12fa56755d2a329d94adf24481435ad1");
    }
}

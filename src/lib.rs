//! Narrator - 带缓存与并发合并的旁白解析
//!
//! 架构设计: Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - 缓存 key 生成
//! - Narration Context: 请求、定位符、解析结果
//!
//! 应用层 (application/):
//! - Ports: 端口定义（NarrationProvider, AudioCache, ServerCache, MessageChannel）
//! - Providers: CachedProvider（内存 -> 服务端 -> 后端）、DedupedProvider（并发合并）
//! - Narrator: 门面与批量预取
//!
//! 基础设施层 (infrastructure/):
//! - Memory: 一级缓存、临时音频存储
//! - Server Cache: 消息协议、客户端、文件缓存服务端
//! - Transport: 进程内消息通道
//! - Adapters: Mock / File 后端
//! - Events: 上传结果观察者

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

#[cfg(test)]
mod test_support;

pub use config::{load_config, AppConfig};

//! 配置管理
//!
//! 配置按节划分（数据库、调度器、Web农场、维护任务、API、可观测性），
//! 通过 `config` crate 叠加代码默认值、TOML 文件和 `WEBFARM__` 前缀的环境变量，
//! 加载后逐节校验。

pub mod models;

pub use models::*;

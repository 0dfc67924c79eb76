//! Web农场调度服务的进程入口：组件装配与优雅关闭

pub mod app;
pub mod shutdown;

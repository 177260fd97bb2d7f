#![deny(clippy::expect_used, clippy::unwrap_used)]

//! The root of the Remy DNA congestion-control policy library.
//! Remy DNA 拥塞控制策略库的根。
//!
//! A "DNA" file is a serialized whisker tree produced by an offline policy
//! trainer. This crate loads such a file into an immutable in-memory policy
//! and answers, for a snapshot of per-flow statistics, which congestion
//! window and inter-send delay the flow should use next.
//!
//! "DNA"文件是离线策略训练器产出的序列化 whisker 树。本库将这种文件加载为
//! 不可变的内存策略，并针对每条流的统计快照，回答该流接下来应使用的
//! 拥塞窗口与发送间隔。

pub mod config;
pub mod error;
pub mod wire;

pub mod controller;
pub mod dna;
pub mod store;

//! # 数据模型模块
//!
//! 定义统一的晶体结构与晶面指数数据模型。
//!
//! ## 依赖关系
//! - 被 `parsers/`、`symmetry/`、`surface/`、`interface/` 等使用
//! - 子模块: structure, miller

pub mod miller;
pub mod structure;

pub use miller::MillerIndex;
pub use structure::{Atom, Crystal, Lattice};

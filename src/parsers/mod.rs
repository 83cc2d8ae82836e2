//! # 解析器模块
//!
//! 结构文件读写。目前只支持 VASP POSCAR/CONTCAR。
//!
//! ## 依赖关系
//! - 被 `commands/`、`interface/` 使用
//! - 使用 `models/` 数据模型
//! - 子模块: poscar

pub mod poscar;

use crate::error::Result;
use crate::models::Crystal;
use std::path::Path;

/// 读取结构文件
pub fn parse_structure_file(path: &Path) -> Result<Crystal> {
    poscar::parse_poscar_file(path)
}

/// 写出结构文件
pub fn write_structure_file(crystal: &Crystal, path: &Path) -> Result<()> {
    poscar::write_poscar_file(crystal, path)
}

//! # 对称性分析模块
//!
//! 定义对称性分析服务的接口，并提供基于度规张量 + 位点映射的内置实现。
//!
//! ## 子模块
//! - `finder`: 内置分析器 [`SymmetryFinder`]
//!
//! ## 依赖关系
//! - 被 `miller`、`surface/`、`interface/` 使用
//! - 使用 `models/structure.rs`

pub mod finder;

pub use finder::SymmetryFinder;

use crate::error::Result;
use crate::models::Crystal;

use nalgebra::{Matrix3, Vector3};

/// 分数坐标下的对称操作 x' = W·x + t
#[derive(Debug, Clone, PartialEq)]
pub struct SymOp {
    /// 整数旋转部分
    pub rotation: Matrix3<i32>,
    /// 平移部分（分数坐标）
    pub translation: Vector3<f64>,
}

impl SymOp {
    pub fn identity() -> Self {
        SymOp {
            rotation: Matrix3::identity(),
            translation: Vector3::zeros(),
        }
    }

    /// 旋转部分的浮点形式
    pub fn rotation_f64(&self) -> Matrix3<f64> {
        self.rotation.map(|x| x as f64)
    }

    /// 作用于分数坐标
    pub fn operate(&self, frac: &Vector3<f64>) -> Vector3<f64> {
        self.rotation_f64() * frac + self.translation
    }
}

/// 对称性分析服务
///
/// 空间群/点群分析属于外部协作方；任何实现只需满足此接口。
/// `reduced` 与 `conventional_standard` 只在格子等价下重新描述晶胞，不增删原子；
/// `primitive` 仅在结构存在纯平移对称时缩小晶胞。
pub trait SymmetryAnalyzer {
    /// 点群操作（平移部分为零）
    fn point_group_operations(&self, crystal: &Crystal) -> Result<Vec<SymOp>>;

    /// 约化晶胞
    fn reduced(&self, crystal: &Crystal) -> Result<Crystal>;

    /// 标准惯用晶胞
    fn conventional_standard(&self, crystal: &Crystal) -> Result<Crystal>;

    /// 原胞
    fn primitive(&self, crystal: &Crystal) -> Result<Crystal>;
}

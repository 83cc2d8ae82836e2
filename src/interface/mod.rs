//! # 界面模块
//!
//! 由两个表面构建周期性界面结构，并在构建后支持薄膜平移。
//!
//! ## 子模块
//! - `pipeline`: 分阶段构建流水线与 [`InterfaceBuilder`]
//!
//! ## 依赖关系
//! - 被 `registration/`、`commands/` 使用
//! - 使用 `surface/`、`symmetry/`、`parsers/poscar.rs`

pub mod pipeline;

pub use pipeline::InterfaceBuilder;

use crate::error::{HeteroError, Result};
use crate::models::Crystal;
use crate::parsers::poscar;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// 薄膜平移后允许的最小界面距离 (Å)
pub const MIN_INTERFACIAL_DISTANCE: f64 = 0.5;

/// 只有分数高度低于此值的薄膜原子随薄膜平移
const FILM_CEILING: f64 = 0.99;

/// 外部晶格匹配给出的一组候选
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatticeMatch {
    /// 薄膜面内变换矩阵
    pub film_transformation: [[i32; 2]; 2],
    /// 衬底面内变换矩阵
    pub substrate_transformation: [[i32; 2]; 2],
    /// 沿两个面内方向的线应变
    pub strain: [f64; 2],
    /// 夹角应变
    pub angle_diff: f64,
}

impl Default for LatticeMatch {
    fn default() -> Self {
        Self {
            film_transformation: [[1, 0], [0, 1]],
            substrate_transformation: [[1, 0], [0, 1]],
            strain: [0.0, 0.0],
            angle_diff: 0.0,
        }
    }
}

/// 界面构建参数
#[derive(Debug, Clone)]
pub struct InterfaceConfig {
    /// 衬底承担的应变比例，0 表示衬底刚性
    pub strain_fraction: f64,
    /// 初始界面距离 (Å)
    pub interfacial_distance: f64,
    /// 真空层厚度 (Å)
    pub vacuum: f64,
    /// 是否把界面平移到 z = 0.5
    pub center: bool,
}

impl Default for InterfaceConfig {
    fn default() -> Self {
        Self {
            strain_fraction: 0.0,
            interfacial_distance: 2.0,
            vacuum: 40.0,
            center: false,
        }
    }
}

/// 构建完成的界面
#[derive(Debug, Clone)]
pub struct Interface {
    pub structure: Crystal,
    /// 衬底与薄膜之间的间隙 (Å)
    pub interfacial_distance: f64,
    /// 分隔衬底与薄膜的分数高度
    pub interface_height: f64,
    /// 衬底体相元素
    pub substrate_species: BTreeSet<String>,
    /// 薄膜体相元素
    pub film_species: BTreeSet<String>,
}

impl Interface {
    /// 薄膜一侧的原子索引 (z > interface_height)
    pub fn film_indices(&self) -> Vec<usize> {
        self.indices_where(|z| z > self.interface_height)
    }

    /// 衬底一侧的原子索引 (z < interface_height)
    pub fn substrate_indices(&self) -> Vec<usize> {
        self.indices_where(|z| z < self.interface_height)
    }

    fn indices_where(&self, keep: impl Fn(f64) -> bool) -> Vec<usize> {
        self.structure
            .atoms
            .iter()
            .enumerate()
            .filter(|(_, atom)| keep(atom.position.z))
            .map(|(i, _)| i)
            .collect()
    }

    /// 薄膜部分
    pub fn film_part(&self) -> Crystal {
        self.structure.selected(&self.film_indices())
    }

    /// 衬底部分
    pub fn sub_part(&self) -> Crystal {
        self.structure.selected(&self.substrate_indices())
    }

    /// 晶胞体积 (Å³)
    pub fn structure_volume(&self) -> f64 {
        self.structure.lattice.volume()
    }

    /// 把平移换算为 (分数平移, 笛卡尔 z 分量)，并检查界面距离
    fn resolve_shift(&self, shift: &Vector3<f64>, fractional: bool) -> Result<(Vector3<f64>, f64)> {
        let lattice = &self.structure.lattice;
        if fractional {
            Ok((*shift, lattice.frac_to_cart(shift).z))
        } else {
            let distance = self.interfacial_distance + shift.z;
            if distance < MIN_INTERFACIAL_DISTANCE {
                return Err(HeteroError::InvalidShift { distance });
            }
            Ok((lattice.cart_to_frac(shift), shift.z))
        }
    }

    /// 随薄膜移动的原子
    fn movable_film(&self) -> Vec<usize> {
        self.indices_where(|z| z > self.interface_height && z < FILM_CEILING)
    }

    /// 返回平移薄膜后的新结构，界面本身不变
    pub fn shifted(&self, shift: &Vector3<f64>, fractional: bool) -> Result<Crystal> {
        let (frac_shift, _) = self.resolve_shift(shift, fractional)?;
        Ok(self.structure.translated(&self.movable_film(), &frac_shift))
    }

    /// 原地平移薄膜，同步更新界面高度与界面距离
    ///
    /// 笛卡尔模式下若界面距离会低于 0.5 Å，返回 `InvalidShift` 且不做任何修改。
    pub fn shift_film(&mut self, shift: &Vector3<f64>, fractional: bool) -> Result<()> {
        let (frac_shift, cart_z) = self.resolve_shift(shift, fractional)?;
        self.structure = self.structure.translated(&self.movable_film(), &frac_shift);
        self.interface_height += frac_shift.z / 2.0;
        self.interfacial_distance += cart_z;
        Ok(())
    }

    /// 应用配准结果（笛卡尔面内平移）
    pub fn apply_registration(&mut self, shift: &[f64; 2]) -> Result<()> {
        self.shift_film(&Vector3::new(shift[0], shift[1], 0.0), false)
    }

    /// 写出 POSCAR
    pub fn write_poscar(&self, path: &Path) -> Result<()> {
        poscar::write_poscar_file(&self.structure, path)
    }
}

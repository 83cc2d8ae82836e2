//! # 对称性不等价晶面枚举
//!
//! 给定体相晶格、点群操作与最大指数 m，枚举所有对称性不等价的表面取向。
//!
//! ## 算法概述
//! 1. 枚举 [-m, m]³ 内的非零整数三元组，按浮点 gcd 约化并去重
//! 2. 依次取出剩余候选面，经倒格子 → 笛卡尔 → 分数坐标共轭后施加每个点群操作，
//!    得到等价类；等价类中的面从候选集中移除
//! 3. 每个等价类按以下顺序挑选代表：非负分量最多 → |h| 最大 → |k| 最大 →
//!    符号和最大 → 字典序最大
//! 4. 代表按 (范数升序, 符号和降序, 字典序降序) 排序
//!
//! ## 依赖关系
//! - 被 `commands/miller.rs` 调用
//! - 使用 `symmetry/` 获取点群操作

use crate::error::{HeteroError, Result};
use crate::geometry::reduce_triple;
use crate::models::{Crystal, Lattice, MillerIndex};
use crate::symmetry::{SymOp, SymmetryAnalyzer};

use nalgebra::Vector3;
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// 一个对称性等价的晶面族
#[derive(Debug, Clone)]
pub struct MillerFamily {
    /// 族的代表
    pub representative: MillerIndex,
    /// 族内所有等价晶面（排序）
    pub members: Vec<MillerIndex>,
}

/// 晶面枚举器
pub struct MillerIndexEnumerator<'a> {
    lattice: &'a Lattice,
    operations: &'a [SymOp],
}

impl<'a> MillerIndexEnumerator<'a> {
    /// 创建枚举器；点群为空时返回错误
    pub fn new(lattice: &'a Lattice, operations: &'a [SymOp]) -> Result<Self> {
        if operations.is_empty() {
            return Err(HeteroError::InvalidMillerIndex(
                "bulk has no resolvable point-group symmetry".to_string(),
            ));
        }
        Ok(Self {
            lattice,
            operations,
        })
    }

    /// 对称性不等价的 Miller 指数（已排序）
    pub fn unique_indices(&self, max_index: i32) -> Result<Vec<MillerIndex>> {
        Ok(self
            .families(max_index)?
            .into_iter()
            .map(|f| f.representative)
            .collect())
    }

    /// 全部等价晶面族（按代表排序）
    pub fn families(&self, max_index: i32) -> Result<Vec<MillerFamily>> {
        if max_index < 1 {
            return Err(HeteroError::InvalidMillerIndex(format!(
                "maximum index must be at least 1, got {}",
                max_index
            )));
        }

        let recip = self.lattice.reciprocal_crystallographic()?;
        let mut remaining = reduced_planes(max_index);
        let mut families = Vec::new();

        while let Some(plane) = remaining.pop_first() {
            let mut members: BTreeSet<[i32; 3]> = self.images(&recip, &plane).into_iter().collect();
            members.insert(plane);
            for image in &members {
                remaining.remove(image);
            }

            let members = members
                .into_iter()
                .map(MillerIndex::from_array)
                .collect::<Result<Vec<_>>>()?;
            let representative = canonical_representative(&members);
            families.push(MillerFamily {
                representative,
                members,
            });
        }

        families.sort_by(|a, b| display_order(&a.representative, &b.representative));
        Ok(families)
    }

    /// 晶面在全部点群操作下的像（约化后）
    fn images(&self, recip: &Lattice, plane: &[i32; 3]) -> Vec<[i32; 3]> {
        let hkl = Vector3::new(plane[0] as f64, plane[1] as f64, plane[2] as f64);
        let cart = recip.frac_to_cart(&hkl);
        let frac = self.lattice.cart_to_frac(&cart);

        self.operations
            .iter()
            .filter_map(|op| {
                let cart_out = self.lattice.frac_to_cart(&op.operate(&frac));
                let out = recip.cart_to_frac(&cart_out);
                reduce_triple(&[out.x, out.y, out.z])
            })
            .collect()
    }
}

/// 使用分析器求点群后枚举
pub fn distinct_miller_indices(
    bulk: &Crystal,
    analyzer: &dyn SymmetryAnalyzer,
    max_index: i32,
) -> Result<Vec<MillerIndex>> {
    let operations = analyzer
        .point_group_operations(bulk)
        .map_err(|e| HeteroError::InvalidMillerIndex(format!("unresolvable symmetry: {}", e)))?;
    MillerIndexEnumerator::new(&bulk.lattice, &operations)?.unique_indices(max_index)
}

/// [-m, m]³ 内约化后去重的非零三元组
fn reduced_planes(max_index: i32) -> BTreeSet<[i32; 3]> {
    let range = -max_index..=max_index;
    let mut planes = BTreeSet::new();
    for h in range.clone() {
        for k in range.clone() {
            for l in range.clone() {
                if let Some(p) = reduce_triple(&[h as f64, k as f64, l as f64]) {
                    planes.insert(p);
                }
            }
        }
    }
    planes
}

/// 从等价类中挑选代表
fn canonical_representative(members: &[MillerIndex]) -> MillerIndex {
    let mut survivors: Vec<MillerIndex> = members.to_vec();

    let rules: [fn(&MillerIndex) -> i64; 4] = [
        |m| m.non_negative_count() as i64,
        |m| m.h().abs() as i64,
        |m| m.k().abs() as i64,
        |m| m.sign_sum() as i64,
    ];
    for rule in rules {
        if survivors.len() == 1 {
            break;
        }
        if let Some(best) = survivors.iter().map(rule).max() {
            survivors.retain(|m| rule(m) == best);
        }
    }

    // 四条规则仍无法区分时取字典序最大者
    survivors
        .into_iter()
        .max()
        .unwrap_or(members[0])
}

/// 输出顺序：范数升序，符号和降序，字典序降序
fn display_order(a: &MillerIndex, b: &MillerIndex) -> Ordering {
    a.norm()
        .total_cmp(&b.norm())
        .then_with(|| b.sign_sum().cmp(&a.sign_sum()))
        .then_with(|| b.cmp(a))
}

//! # 表面模块
//!
//! 表面 slab 的数据类型与构建。
//!
//! ## 子模块
//! - `builder`: 晶体学方向与 slab 生成
//! - `layers`: 按高度分层
//!
//! ## 依赖关系
//! - 被 `interface/`、`commands/` 使用
//! - 使用 `models/`、`symmetry/`

pub mod builder;
pub mod layers;

pub use builder::{crystallographic_directions, Directions, SurfaceBuilder};
pub use layers::{group_layers, Layer};

use crate::error::{HeteroError, Result};
use crate::models::{Crystal, MillerIndex};

use std::collections::{BTreeMap, BTreeSet};

/// Slab 生成参数
#[derive(Debug, Clone)]
pub struct SlabConfig {
    /// 沿面外方向重复的体相层数
    pub layers: usize,
    /// 真空层厚度 (Å)
    pub vacuum: f64,
    /// 分层容差 (Å)，`None` 时自动推导
    pub layer_tolerance: Option<f64>,
}

impl Default for SlabConfig {
    fn default() -> Self {
        Self {
            layers: 3,
            vacuum: 10.0,
            layer_tolerance: None,
        }
    }
}

/// 表面 slab
///
/// 同时持有惯用与原胞两种晶胞选择，二者化学组成一致。
#[derive(Debug, Clone)]
pub struct Surface {
    pub bulk: Crystal,
    pub miller: MillerIndex,
    /// 惯用 slab
    pub conventional: Crystal,
    /// 原胞 slab
    pub primitive: Crystal,
    pub layers: usize,
    pub vacuum: f64,
    pub layer_tolerance: Option<f64>,
    /// 表面基（体相晶格基矢的整数组合）
    pub directions: Directions,
}

impl Surface {
    /// 面积 |a × b|（惯用 slab）
    pub fn area(&self) -> f64 {
        self.conventional.lattice.inplane_area()
    }

    /// 最顶层原子的元素种类
    pub fn termination(&self) -> BTreeSet<String> {
        group_layers(&self.conventional, self.layer_tolerance)
            .last()
            .map(|layer| {
                layer
                    .indices
                    .iter()
                    .map(|&i| self.conventional.atoms[i].element.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// 惯用 slab 的原子层
    pub fn layer_groups(&self, atol: Option<f64>) -> Vec<Layer> {
        group_layers(&self.conventional, atol.or(self.layer_tolerance))
    }

    /// 删除顶部或底部的 `n` 个原子层，返回新表面
    ///
    /// 两个视图各自独立分层后删除，删除后的化学计量必须一致。
    pub fn remove_layers(&self, n: usize, from_top: bool, atol: Option<f64>) -> Result<Surface> {
        let atol = atol.or(self.layer_tolerance);
        let conventional = strip_layers(&self.conventional, n, from_top, atol)?;
        let primitive = strip_layers(&self.primitive, n, from_top, atol)?;

        if !same_stoichiometry(&conventional, &primitive) {
            return Err(HeteroError::InvalidArgument(format!(
                "removing {} layer(s) leaves {} and {} with different compositions",
                n,
                conventional.formula(),
                primitive.formula()
            )));
        }

        Ok(Surface {
            conventional,
            primitive,
            ..self.clone()
        })
    }
}

/// 删除一端的 n 层
fn strip_layers(crystal: &Crystal, n: usize, from_top: bool, atol: Option<f64>) -> Result<Crystal> {
    let mut layers = group_layers(crystal, atol);
    if n >= layers.len() {
        return Err(HeteroError::InvalidArgument(format!(
            "cannot remove {} of {} layers from {}",
            n,
            layers.len(),
            crystal.name
        )));
    }
    if from_top {
        layers.reverse();
    }

    let doomed: Vec<usize> = layers
        .iter()
        .take(n)
        .flat_map(|layer| layer.indices.iter().copied())
        .collect();
    Ok(crystal.removed(&doomed))
}

/// 两个结构的各元素数目成同一比例
fn same_stoichiometry(a: &Crystal, b: &Crystal) -> bool {
    let count = |c: &Crystal| {
        let mut map: BTreeMap<String, usize> = BTreeMap::new();
        for atom in &c.atoms {
            *map.entry(atom.element.clone()).or_insert(0) += 1;
        }
        map
    };
    let (ca, cb) = (count(a), count(b));
    if ca.keys().ne(cb.keys()) {
        return false;
    }
    let ratio = a.len() as f64 / b.len().max(1) as f64;
    ca.iter()
        .zip(cb.values())
        .all(|((_, &na), &nb)| (na as f64 - ratio * nb as f64).abs() < 1e-8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Atom, Lattice};
    use crate::symmetry::SymmetryFinder;

    fn rock_salt_surface(layers: usize) -> Surface {
        let lattice = Lattice::from_parameters(4.0, 4.0, 4.0, 90.0, 90.0, 90.0).unwrap();
        let atoms = vec![
            Atom::new("Na", [0.0, 0.0, 0.0]),
            Atom::new("Na", [0.5, 0.5, 0.0]),
            Atom::new("Na", [0.5, 0.0, 0.5]),
            Atom::new("Na", [0.0, 0.5, 0.5]),
            Atom::new("Cl", [0.5, 0.0, 0.0]),
            Atom::new("Cl", [0.0, 0.5, 0.0]),
            Atom::new("Cl", [0.0, 0.0, 0.5]),
            Atom::new("Cl", [0.5, 0.5, 0.5]),
        ];
        let bulk = Crystal::new("NaCl", lattice, atoms);
        let finder = SymmetryFinder::default();
        let config = SlabConfig {
            layers,
            ..SlabConfig::default()
        };
        SurfaceBuilder::new(&finder)
            .build(&bulk, MillerIndex::new(1, 0, 0).unwrap(), &config)
            .unwrap()
    }

    #[test]
    fn test_remove_layers_keeps_views_consistent() {
        let surface = rock_salt_surface(2);
        let trimmed = surface.remove_layers(1, true, None).unwrap();

        assert_eq!(trimmed.conventional.len(), 12);
        assert_eq!(trimmed.primitive.len(), 6);
        assert_eq!(trimmed.conventional.species(), trimmed.primitive.species());
        // 原表面不受影响
        assert_eq!(surface.conventional.len(), 16);
    }

    #[test]
    fn test_remove_layers_from_bottom() {
        let surface = rock_salt_surface(2);
        let before = surface.layer_groups(None);
        let trimmed = surface.remove_layers(2, false, None).unwrap();
        let after = trimmed.layer_groups(None);
        assert_eq!(after.len(), before.len() - 2);
        assert!((after[0].height - before[2].height).abs() < 1e-9);
    }

    #[test]
    fn test_remove_all_layers_rejected() {
        let surface = rock_salt_surface(1);
        assert!(matches!(
            surface.remove_layers(2, true, None),
            Err(HeteroError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_stoichiometry_check() {
        let lattice = Lattice::from_parameters(3.0, 3.0, 3.0, 90.0, 90.0, 90.0).unwrap();
        let ab = Crystal::new(
            "AB",
            lattice.clone(),
            vec![Atom::new("A", [0.0, 0.0, 0.0]), Atom::new("B", [0.5, 0.5, 0.5])],
        );
        let a2 = Crystal::new(
            "A2",
            lattice,
            vec![Atom::new("A", [0.0, 0.0, 0.0]), Atom::new("A", [0.5, 0.5, 0.5])],
        );
        assert!(same_stoichiometry(&ab, &ab));
        assert!(!same_stoichiometry(&ab, &a2));
    }
}

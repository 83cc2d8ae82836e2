//! # 原子层划分
//!
//! 按笛卡尔 z 坐标对原子聚类，得到自下而上排列的原子层。
//!
//! ## 依赖关系
//! - 被 `surface/`、`interface/`、`registration/` 使用

use crate::models::Crystal;

/// 一个原子层
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    /// 层内原子索引
    pub indices: Vec<usize>,
    /// 平均分数 z 坐标
    pub height: f64,
}

/// 默认层容差：最短原子间距（含周期像）的 10%
pub fn default_tolerance(crystal: &Crystal) -> f64 {
    let carts = crystal.cart_coords();
    let vectors = [
        crystal.lattice.vector(0),
        crystal.lattice.vector(1),
        crystal.lattice.vector(2),
    ];

    let mut shortest = f64::INFINITY;
    for (i, ri) in carts.iter().enumerate() {
        for (j, rj) in carts.iter().enumerate().skip(i) {
            for na in -1..=1 {
                for nb in -1..=1 {
                    for nc in -1..=1 {
                        if i == j && na == 0 && nb == 0 && nc == 0 {
                            continue;
                        }
                        let image = rj
                            + vectors[0] * na as f64
                            + vectors[1] * nb as f64
                            + vectors[2] * nc as f64;
                        let d = (image - ri).norm();
                        if d > 1e-8 && d < shortest {
                            shortest = d;
                        }
                    }
                }
            }
        }
    }

    if shortest.is_finite() {
        0.1 * shortest
    } else {
        0.1
    }
}

/// 按 z 坐标分层，`atol` 为层内允许的最大 z 间隙（Å）
pub fn group_layers(crystal: &Crystal, atol: Option<f64>) -> Vec<Layer> {
    if crystal.is_empty() {
        return Vec::new();
    }
    let atol = atol.unwrap_or_else(|| default_tolerance(crystal));

    let mut order: Vec<(usize, f64)> = crystal
        .cart_coords()
        .iter()
        .enumerate()
        .map(|(i, r)| (i, r.z))
        .collect();
    order.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));

    let mut groups: Vec<Vec<usize>> = vec![vec![order[0].0]];
    for pair in order.windows(2) {
        if pair[1].1 - pair[0].1 > atol {
            groups.push(Vec::new());
        }
        if let Some(current) = groups.last_mut() {
            current.push(pair[1].0);
        }
    }

    groups
        .into_iter()
        .map(|mut indices| {
            indices.sort_unstable();
            let height = indices
                .iter()
                .map(|&i| crystal.atoms[i].position.z)
                .sum::<f64>()
                / indices.len() as f64;
            Layer { indices, height }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Atom, Lattice};

    fn stacked() -> Crystal {
        let lattice = Lattice::from_parameters(3.0, 3.0, 20.0, 90.0, 90.0, 90.0).unwrap();
        Crystal::new(
            "stack",
            lattice,
            vec![
                Atom::new("Cu", [0.0, 0.0, 0.30]),
                Atom::new("Cu", [0.5, 0.5, 0.301]),
                Atom::new("Cu", [0.0, 0.0, 0.40]),
                Atom::new("O", [0.5, 0.5, 0.50]),
            ],
        )
    }

    #[test]
    fn test_layers_ordered_bottom_to_top() {
        let layers = group_layers(&stacked(), Some(0.1));
        assert_eq!(layers.len(), 3);
        assert_eq!(layers[0].indices, vec![0, 1]);
        assert_eq!(layers[1].indices, vec![2]);
        assert_eq!(layers[2].indices, vec![3]);
        assert!((layers[0].height - 0.3005).abs() < 1e-9);
    }

    #[test]
    fn test_default_tolerance_uses_shortest_distance() {
        // 最短距离是两个 Cu 之间沿 z 的 2.0 Å
        let crystal = stacked();
        let tol = default_tolerance(&crystal);
        assert!((tol - 0.2).abs() < 1e-9);
        assert_eq!(group_layers(&crystal, None).len(), 3);
    }

    #[test]
    fn test_empty_structure_has_no_layers() {
        let lattice = Lattice::from_parameters(3.0, 3.0, 3.0, 90.0, 90.0, 90.0).unwrap();
        let empty = Crystal::new("empty", lattice, Vec::new());
        assert!(group_layers(&empty, None).is_empty());
    }
}

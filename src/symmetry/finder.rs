//! # 内置对称性分析器
//!
//! ## 算法概述
//! 1. 枚举元素属于 {-1, 0, 1}、行列式为 ±1 的整数矩阵 W
//! 2. 保留满足 Wᵀ·G·W = G 的矩阵（G 为度规张量）
//! 3. 对每个 W 尝试以参考原子确定平移 t，检查所有原子映射到同种原子
//! 4. 纯平移（W = I）用于寻找原胞
//!
//! 惯用晶胞只做取向标准化（a ∥ x，b 在 xy 平面内），不识别心格子。
//!
//! ## 依赖关系
//! - 实现 `symmetry::SymmetryAnalyzer`
//! - 使用 `geometry.rs` 的二维约化

use crate::error::{HeteroError, Result};
use crate::geometry::{reduce_vectors, wrap_frac};
use crate::models::{Atom, Crystal, Lattice};
use crate::symmetry::{SymOp, SymmetryAnalyzer};

use nalgebra::{Matrix3, Vector3};
use std::collections::BTreeMap;

/// 基于度规张量与位点映射的对称性分析器
#[derive(Debug, Clone)]
pub struct SymmetryFinder {
    /// 笛卡尔位置容差（Å）
    pub symprec: f64,
}

impl Default for SymmetryFinder {
    fn default() -> Self {
        SymmetryFinder { symprec: 1e-2 }
    }
}

impl SymmetryFinder {
    pub fn new(symprec: f64) -> Self {
        SymmetryFinder { symprec }
    }

    /// 保持度规张量不变的整数矩阵
    fn lattice_rotations(&self, lattice: &Lattice) -> Vec<Matrix3<i32>> {
        let g = lattice.metric();
        let lengths: Vec<f64> = (0..3).map(|i| g[(i, i)].sqrt()).collect();
        let mut rotations = Vec::new();

        for code in 0..19683u32 {
            let mut entries = [0i32; 9];
            let mut c = code;
            for e in entries.iter_mut() {
                *e = (c % 3) as i32 - 1;
                c /= 3;
            }
            let w = Matrix3::from_row_slice(&entries);
            let det = w.map(|x| x as f64).determinant().round() as i32;
            if det.abs() != 1 {
                continue;
            }

            let wf = w.map(|x| x as f64);
            let rotated = wf.transpose() * g * wf;
            let preserved = (0..3).all(|i| {
                (0..3).all(|j| {
                    (rotated[(i, j)] - g[(i, j)]).abs()
                        <= self.symprec * (lengths[i] + lengths[j])
                })
            });
            if preserved {
                rotations.push(w);
            }
        }

        rotations
    }

    /// 分数坐标差在周期意义下是否小于容差
    fn same_site(&self, lattice: &Lattice, a: &Vector3<f64>, b: &Vector3<f64>) -> bool {
        let diff = (a - b).map(|x| x - x.round());
        lattice.frac_to_cart(&diff).norm() < self.symprec
    }

    /// 检查 x → W·x + t 是否把结构映射到自身
    fn maps_onto_itself(&self, crystal: &Crystal, w: &Matrix3<f64>, t: &Vector3<f64>) -> bool {
        crystal.atoms.iter().all(|atom| {
            let image = w * atom.position + t;
            crystal
                .atoms
                .iter()
                .any(|other| {
                    other.element == atom.element
                        && self.same_site(&crystal.lattice, &image, &other.position)
                })
        })
    }

    /// 原子数最少的元素中的第一个原子，作为参考原子
    fn reference_atom(crystal: &Crystal) -> Result<usize> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for atom in &crystal.atoms {
            *counts.entry(atom.element.as_str()).or_insert(0) += 1;
        }
        let rarest = counts
            .iter()
            .min_by_key(|entry| *entry.1)
            .map(|(el, _)| *el)
            .ok_or_else(|| HeteroError::SymmetryError("structure has no sites".to_string()))?;
        crystal
            .atoms
            .iter()
            .position(|a| a.element == rarest)
            .ok_or_else(|| HeteroError::SymmetryError("structure has no sites".to_string()))
    }

    /// 找到 W 对应的一个平移 t（若存在）
    fn find_translation(&self, crystal: &Crystal, w: &Matrix3<f64>, reference: usize) -> Option<Vector3<f64>> {
        let origin = &crystal.atoms[reference];
        let image = w * origin.position;
        crystal
            .atoms
            .iter()
            .filter(|a| a.element == origin.element)
            .map(|a| (a.position - image).map(wrap_frac))
            .find(|t| self.maps_onto_itself(crystal, w, t))
    }

    /// 所有纯平移对称（含零平移），分数坐标在 [0, 1) 内
    pub fn pure_translations(&self, crystal: &Crystal) -> Result<Vec<Vector3<f64>>> {
        let reference = Self::reference_atom(crystal)?;
        let identity = Matrix3::identity();
        let origin = crystal.atoms[reference].position;
        let mut translations: Vec<Vector3<f64>> = Vec::new();

        for atom in crystal.atoms.iter().filter(|a| a.element == crystal.atoms[reference].element) {
            let t = (atom.position - origin).map(wrap_frac);
            if translations.iter().any(|u| self.same_site(&crystal.lattice, u, &t)) {
                continue;
            }
            if self.maps_onto_itself(crystal, &identity, &t) {
                translations.push(t);
            }
        }

        Ok(translations)
    }

    /// 去除重复位点
    fn deduplicated(&self, crystal: &Crystal) -> Crystal {
        let mut atoms: Vec<Atom> = Vec::new();
        for atom in &crystal.atoms {
            let duplicate = atoms.iter().any(|a| {
                a.element == atom.element && self.same_site(&crystal.lattice, &a.position, &atom.position)
            });
            if !duplicate {
                atoms.push(atom.clone());
            }
        }
        Crystal::new(crystal.name.clone(), crystal.lattice.clone(), atoms)
    }
}

impl SymmetryAnalyzer for SymmetryFinder {
    fn point_group_operations(&self, crystal: &Crystal) -> Result<Vec<SymOp>> {
        let reference = Self::reference_atom(crystal)?;
        let ops: Vec<SymOp> = self
            .lattice_rotations(&crystal.lattice)
            .into_iter()
            .filter(|w| {
                self.find_translation(crystal, &w.map(|x| x as f64), reference)
                    .is_some()
            })
            .map(|rotation| SymOp {
                rotation,
                translation: Vector3::zeros(),
            })
            .collect();

        if ops.is_empty() {
            return Err(HeteroError::SymmetryError(
                "no symmetry operation (not even the identity) maps the structure onto itself"
                    .to_string(),
            ));
        }
        Ok(ops)
    }

    fn reduced(&self, crystal: &Crystal) -> Result<Crystal> {
        let lattice = &crystal.lattice;
        let (a, b) = reduce_vectors(&lattice.vector(0), &lattice.vector(1));
        let c = lattice.vector(2);

        // 最小二乘求 c 在 (a, b) 平面内的投影系数，再取整去掉面内倾斜
        let gram = nalgebra::Matrix2::new(a.dot(&a), a.dot(&b), a.dot(&b), b.dot(&b));
        let rhs = nalgebra::Vector2::new(c.dot(&a), c.dot(&b));
        let coeffs = gram
            .try_inverse()
            .map(|inv| inv * rhs)
            .unwrap_or_else(nalgebra::Vector2::zeros);

        let mut best = c;
        for x in [coeffs.x.floor(), coeffs.x.ceil()] {
            for y in [coeffs.y.floor(), coeffs.y.ceil()] {
                let candidate = c - a * x - b * y;
                if candidate.norm() < best.norm() - 1e-10 {
                    best = candidate;
                }
            }
        }

        let reduced = Lattice::from_vectors(a, b, best)?;
        Ok(crystal.recelled(reduced))
    }

    fn conventional_standard(&self, crystal: &Crystal) -> Result<Crystal> {
        let standard = crystal.lattice.standard_orientation()?;
        Ok(crystal.strained(standard).wrapped())
    }

    fn primitive(&self, crystal: &Crystal) -> Result<Crystal> {
        let translations = self.pure_translations(crystal)?;
        if translations.len() <= 1 {
            return Ok(crystal.wrapped());
        }

        // 候选向量：非零纯平移（取最短代表）+ 原晶格基矢
        let mut candidates: Vec<Vector3<f64>> = translations
            .iter()
            .filter(|t| t.norm() > 1e-8)
            .map(|t| t.map(|x| if x > 0.5 + 1e-8 { x - 1.0 } else { x }))
            .collect();
        candidates.extend([Vector3::x(), Vector3::y(), Vector3::z()]);
        candidates.sort_by(|u, v| {
            let lu = crystal.lattice.frac_to_cart(u).norm();
            let lv = crystal.lattice.frac_to_cart(v).norm();
            lu.total_cmp(&lv)
        });

        let target = 1.0 / translations.len() as f64;
        // 所有平移都在面内时（slab、界面）固定 c，只在面内挑选基矢
        let layered = translations.iter().all(|t| t.z.abs() < 1e-8);
        let basis = primitive_basis(&candidates, target, layered).ok_or_else(|| {
            HeteroError::SymmetryError(
                "no primitive basis found among translation vectors".to_string(),
            )
        })?;

        let lattice = Lattice::new(basis * crystal.lattice.matrix())?;
        let folded = self.deduplicated(&crystal.recelled(lattice));
        if folded.len() * translations.len() != crystal.len() {
            return Err(HeteroError::SymmetryError(format!(
                "primitive folding produced {} sites from {}",
                folded.len(),
                crystal.len()
            )));
        }
        Ok(folded)
    }
}

/// 在按长度排序的候选向量中找第一组体积为 `target` 的右手基（分数坐标）
fn primitive_basis(candidates: &[Vector3<f64>], target: f64, layered: bool) -> Option<Matrix3<f64>> {
    let n = candidates.len();
    if layered {
        let inplane: Vec<&Vector3<f64>> = candidates.iter().filter(|v| v.z.abs() < 1e-8).collect();
        for i in 0..inplane.len() {
            for j in (i + 1)..inplane.len() {
                let mut p = Matrix3::from_rows(&[
                    inplane[i].transpose(),
                    inplane[j].transpose(),
                    Vector3::z().transpose(),
                ]);
                let det = p.determinant();
                if (det.abs() - target).abs() > 1e-6 {
                    continue;
                }
                if det < 0.0 {
                    let flipped = -p.row(0).into_owned();
                    p.set_row(0, &flipped);
                }
                return Some(p);
            }
        }
        return None;
    }

    for i in 0..n {
        for j in (i + 1)..n {
            for k in (j + 1)..n {
                let mut p = Matrix3::from_rows(&[
                    candidates[i].transpose(),
                    candidates[j].transpose(),
                    candidates[k].transpose(),
                ]);
                let det = p.determinant();
                if (det.abs() - target).abs() > 1e-6 {
                    continue;
                }
                if det < 0.0 {
                    let flipped = -p.row(2).into_owned();
                    p.set_row(2, &flipped);
                }
                return Some(p);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simple_cubic() -> Crystal {
        let lattice = Lattice::from_parameters(3.0, 3.0, 3.0, 90.0, 90.0, 90.0).unwrap();
        Crystal::new("Po", lattice, vec![Atom::new("Po", [0.0, 0.0, 0.0])])
    }

    fn rock_salt_conventional() -> Crystal {
        let lattice = Lattice::from_parameters(5.64, 5.64, 5.64, 90.0, 90.0, 90.0).unwrap();
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
        Crystal::new("NaCl", lattice, atoms)
    }

    #[test]
    fn test_cubic_point_group_has_48_operations() {
        let finder = SymmetryFinder::default();
        let ops = finder.point_group_operations(&simple_cubic()).unwrap();
        assert_eq!(ops.len(), 48);
        assert!(ops.contains(&SymOp::identity()));
    }

    #[test]
    fn test_tetragonal_point_group_has_16_operations() {
        let lattice = Lattice::from_parameters(3.0, 3.0, 4.0, 90.0, 90.0, 90.0).unwrap();
        let crystal = Crystal::new("X", lattice, vec![Atom::new("Fe", [0.0, 0.0, 0.0])]);
        let ops = SymmetryFinder::default()
            .point_group_operations(&crystal)
            .unwrap();
        assert_eq!(ops.len(), 16);
    }

    #[test]
    fn test_rock_salt_keeps_full_cubic_group() {
        let ops = SymmetryFinder::default()
            .point_group_operations(&rock_salt_conventional())
            .unwrap();
        assert_eq!(ops.len(), 48);
    }

    #[test]
    fn test_basis_atoms_lower_the_symmetry() {
        // 沿 z 方向偏移的第二个原子破坏了立方对称性
        let lattice = Lattice::from_parameters(3.0, 3.0, 3.0, 90.0, 90.0, 90.0).unwrap();
        let crystal = Crystal::new(
            "X",
            lattice,
            vec![Atom::new("Fe", [0.0, 0.0, 0.0]), Atom::new("O", [0.0, 0.0, 0.3])],
        );
        let ops = SymmetryFinder::default()
            .point_group_operations(&crystal)
            .unwrap();
        assert_eq!(ops.len(), 8);
    }

    #[test]
    fn test_rock_salt_primitive_has_two_sites() {
        let finder = SymmetryFinder::default();
        let crystal = rock_salt_conventional();
        assert_eq!(finder.pure_translations(&crystal).unwrap().len(), 4);

        let primitive = finder.primitive(&crystal).unwrap();
        assert_eq!(primitive.len(), 2);
        let ratio = crystal.lattice.volume() / primitive.lattice.volume();
        assert!((ratio - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_primitive_of_primitive_is_unchanged() {
        let finder = SymmetryFinder::default();
        let crystal = simple_cubic();
        let primitive = finder.primitive(&crystal).unwrap();
        assert_eq!(primitive.len(), 1);
        assert!((primitive.lattice.volume() - 27.0).abs() < 1e-9);
    }

    #[test]
    fn test_reduced_removes_inplane_tilt() {
        let lattice = Lattice::from_vectors(
            Vector3::new(3.0, 0.0, 0.0),
            Vector3::new(3.0, 3.0, 0.0),
            Vector3::new(6.0, 0.0, 10.0),
        )
        .unwrap();
        let crystal = Crystal::new("X", lattice, vec![Atom::new("Fe", [0.1, 0.2, 0.3])]);
        let reduced = SymmetryFinder::default().reduced(&crystal).unwrap();
        let (a, b, c, _, _, _) = reduced.lattice.parameters();

        assert!((a - 3.0).abs() < 1e-9);
        assert!((b - 3.0).abs() < 1e-9);
        assert!((c - 10.0).abs() < 1e-9);
        assert!((reduced.lattice.volume() - crystal.lattice.volume()).abs() < 1e-9);
        // 分数 z 坐标不变
        assert!((reduced.atoms[0].position.z - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_conventional_standard_orientation() {
        let lattice = Lattice::from_vectors(
            Vector3::new(0.0, 3.0, 0.0),
            Vector3::new(-3.0, 0.0, 0.0),
            Vector3::new(0.0, 0.0, 5.0),
        )
        .unwrap();
        let crystal = Crystal::new("X", lattice, vec![Atom::new("Fe", [0.2, 0.3, 0.4])]);
        let standard = SymmetryFinder::default()
            .conventional_standard(&crystal)
            .unwrap();
        let a = standard.lattice.vector(0);
        assert!(a.y.abs() < 1e-12 && a.z.abs() < 1e-12);
        assert!((standard.atoms[0].position - crystal.atoms[0].position).norm() < 1e-12);
    }
}

//! # 晶体结构数据模型
//!
//! 定义统一的晶体结构表示：体相、表面 slab、界面都用同一个 [`Crystal`] 描述。
//! 所有编辑操作（平移、删除、换晶格）都返回新结构，不修改原结构。
//!
//! ## 约定
//! - 晶格矩阵按行存储晶格向量 a, b, c
//! - 分数坐标 → 笛卡尔坐标: `cart = Mᵀ · frac`
//!
//! ## 依赖关系
//! - 被 `parsers/`、`symmetry/`、`surface/`、`interface/`、`registration/` 使用
//! - 使用 `nalgebra` 做矩阵运算

use crate::error::{HeteroError, Result};
use crate::geometry::wrap_frac;

use nalgebra::{Matrix3, RowVector3, Vector3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// 晶格
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lattice {
    /// 晶格向量矩阵 (3x3)，行向量表示 a, b, c
    matrix: Matrix3<f64>,
    /// 缓存的逆矩阵
    inv_matrix: Matrix3<f64>,
}

impl Lattice {
    /// 从行向量矩阵创建晶格，奇异矩阵返回错误
    pub fn new(matrix: Matrix3<f64>) -> Result<Self> {
        if matrix.determinant().abs() < 1e-8 {
            return Err(HeteroError::InvalidLattice(
                "lattice vectors are linearly dependent".to_string(),
            ));
        }
        let inv_matrix = matrix.try_inverse().ok_or_else(|| {
            HeteroError::InvalidLattice("lattice matrix is not invertible".to_string())
        })?;
        Ok(Lattice { matrix, inv_matrix })
    }

    /// 从三个晶格向量创建
    pub fn from_vectors(a: Vector3<f64>, b: Vector3<f64>, c: Vector3<f64>) -> Result<Self> {
        Self::new(Matrix3::from_rows(&[
            a.transpose(),
            b.transpose(),
            c.transpose(),
        ]))
    }

    /// 从晶格参数 (a, b, c, alpha, beta, gamma) 创建晶格
    /// 角度单位：度。a 沿 x 轴，b 位于 xy 平面内
    pub fn from_parameters(
        a: f64,
        b: f64,
        c: f64,
        alpha: f64,
        beta: f64,
        gamma: f64,
    ) -> Result<Self> {
        let cos_alpha = alpha.to_radians().cos();
        let cos_beta = beta.to_radians().cos();
        let cos_gamma = gamma.to_radians().cos();
        let sin_gamma = gamma.to_radians().sin();

        let c1 = c * cos_beta;
        let c2 = c * (cos_alpha - cos_beta * cos_gamma) / sin_gamma;
        let c3_sq = c * c - c1 * c1 - c2 * c2;
        if c3_sq <= 0.0 {
            return Err(HeteroError::InvalidLattice(format!(
                "angles ({}, {}, {}) do not describe a cell",
                alpha, beta, gamma
            )));
        }

        Self::from_vectors(
            Vector3::new(a, 0.0, 0.0),
            Vector3::new(b * cos_gamma, b * sin_gamma, 0.0),
            Vector3::new(c1, c2, c3_sq.sqrt()),
        )
    }

    /// 晶格矩阵（行向量）
    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    /// 晶格矩阵的逆
    pub fn inv_matrix(&self) -> &Matrix3<f64> {
        &self.inv_matrix
    }

    /// 第 i 个晶格向量
    pub fn vector(&self, i: usize) -> Vector3<f64> {
        self.matrix.row(i).transpose()
    }

    /// 替换第 i 个晶格向量
    pub fn with_vector(&self, i: usize, v: Vector3<f64>) -> Result<Self> {
        let mut matrix = self.matrix;
        matrix.set_row(i, &RowVector3::new(v.x, v.y, v.z));
        Self::new(matrix)
    }

    /// 获取晶格参数 (a, b, c, alpha, beta, gamma)，角度单位：度
    pub fn parameters(&self) -> (f64, f64, f64, f64, f64, f64) {
        let (a_vec, b_vec, c_vec) = (self.vector(0), self.vector(1), self.vector(2));
        let (a, b, c) = (a_vec.norm(), b_vec.norm(), c_vec.norm());

        let alpha = (b_vec.dot(&c_vec) / (b * c)).clamp(-1.0, 1.0).acos().to_degrees();
        let beta = (a_vec.dot(&c_vec) / (a * c)).clamp(-1.0, 1.0).acos().to_degrees();
        let gamma = (a_vec.dot(&b_vec) / (a * b)).clamp(-1.0, 1.0).acos().to_degrees();

        (a, b, c, alpha, beta, gamma)
    }

    /// 晶格体积（带符号的行列式）
    pub fn volume(&self) -> f64 {
        self.matrix.determinant()
    }

    /// a × b 张成的面积
    pub fn inplane_area(&self) -> f64 {
        self.vector(0).cross(&self.vector(1)).norm()
    }

    /// 晶体学倒格子（不含 2π），行向量 b1, b2, b3 满足 aᵢ·bⱼ = δᵢⱼ
    pub fn reciprocal_crystallographic(&self) -> Result<Lattice> {
        Lattice::new(self.inv_matrix.transpose())
    }

    /// 分数坐标转笛卡尔坐标
    pub fn frac_to_cart(&self, frac: &Vector3<f64>) -> Vector3<f64> {
        self.matrix.transpose() * frac
    }

    /// 笛卡尔坐标转分数坐标
    pub fn cart_to_frac(&self, cart: &Vector3<f64>) -> Vector3<f64> {
        self.inv_matrix.transpose() * cart
    }

    /// 度规张量 G = M·Mᵀ
    pub fn metric(&self) -> Matrix3<f64> {
        self.matrix * self.matrix.transpose()
    }

    /// 以相同晶格参数旋转到标准取向（a ∥ x，b 在 xy 平面内）
    pub fn standard_orientation(&self) -> Result<Lattice> {
        let (a, b, c, alpha, beta, gamma) = self.parameters();
        Lattice::from_parameters(a, b, c, alpha, beta, gamma)
    }
}

/// 原子信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Atom {
    /// 元素符号
    pub element: String,

    /// 分数坐标 [x, y, z]
    pub position: Vector3<f64>,
}

impl Atom {
    pub fn new(element: impl Into<String>, position: impl Into<Vector3<f64>>) -> Self {
        Atom {
            element: element.into(),
            position: position.into(),
        }
    }
}

/// 晶体结构
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Crystal {
    /// 结构名称
    pub name: String,

    /// 晶格
    pub lattice: Lattice,

    /// 原子列表
    pub atoms: Vec<Atom>,
}

impl Crystal {
    /// 创建结构。左手晶格会翻转 c 轴，使行列式为正
    pub fn new(name: impl Into<String>, lattice: Lattice, atoms: Vec<Atom>) -> Self {
        if lattice.volume() < 0.0 {
            let flipped = Lattice::new(Matrix3::from_rows(&[
                lattice.matrix().row(0).into_owned(),
                lattice.matrix().row(1).into_owned(),
                -lattice.matrix().row(2).into_owned(),
            ]));
            if let Ok(flipped) = flipped {
                let atoms = atoms
                    .into_iter()
                    .map(|a| {
                        let p = a.position;
                        Atom::new(a.element, [p.x, p.y, -p.z])
                    })
                    .collect();
                return Crystal {
                    name: name.into(),
                    lattice: flipped,
                    atoms,
                };
            }
        }

        Crystal {
            name: name.into(),
            lattice,
            atoms,
        }
    }

    /// 由笛卡尔坐标创建（分数坐标回卷到 [0, 1)）
    pub fn from_cartesian(
        name: impl Into<String>,
        lattice: Lattice,
        sites: Vec<(String, Vector3<f64>)>,
    ) -> Self {
        let atoms = sites
            .into_iter()
            .map(|(element, cart)| Atom::new(element, lattice.cart_to_frac(&cart)))
            .collect();
        Crystal::new(name, lattice, atoms).wrapped()
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// 计算化学式
    pub fn formula(&self) -> String {
        use std::collections::BTreeMap;
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();

        for atom in &self.atoms {
            *counts.entry(atom.element.as_str()).or_insert(0) += 1;
        }

        counts
            .into_iter()
            .map(|(el, count)| {
                if count == 1 {
                    el.to_string()
                } else {
                    format!("{}{}", el, count)
                }
            })
            .collect::<Vec<_>>()
            .join("")
    }

    /// 元素种类（排序去重）
    pub fn species(&self) -> BTreeSet<String> {
        self.atoms.iter().map(|a| a.element.clone()).collect()
    }

    /// 第 i 个原子的笛卡尔坐标
    pub fn cart(&self, i: usize) -> Vector3<f64> {
        self.lattice.frac_to_cart(&self.atoms[i].position)
    }

    /// 全部笛卡尔坐标
    pub fn cart_coords(&self) -> Vec<Vector3<f64>> {
        self.atoms
            .iter()
            .map(|a| self.lattice.frac_to_cart(&a.position))
            .collect()
    }

    /// 分数坐标回卷到 [0, 1)
    pub fn wrapped(&self) -> Crystal {
        let atoms = self
            .atoms
            .iter()
            .map(|a| Atom::new(a.element.clone(), a.position.map(wrap_frac)))
            .collect();
        Crystal {
            name: self.name.clone(),
            lattice: self.lattice.clone(),
            atoms,
        }
    }

    /// 平移指定原子（分数坐标），结果回卷
    pub fn translated(&self, indices: &[usize], frac_shift: &Vector3<f64>) -> Crystal {
        let mut atoms = self.atoms.clone();
        for &i in indices {
            atoms[i].position = (atoms[i].position + frac_shift).map(wrap_frac);
        }
        Crystal {
            name: self.name.clone(),
            lattice: self.lattice.clone(),
            atoms,
        }
    }

    /// 删除指定原子
    pub fn removed(&self, indices: &[usize]) -> Crystal {
        let drop: BTreeSet<usize> = indices.iter().copied().collect();
        let atoms = self
            .atoms
            .iter()
            .enumerate()
            .filter(|(i, _)| !drop.contains(i))
            .map(|(_, a)| a.clone())
            .collect();
        Crystal {
            name: self.name.clone(),
            lattice: self.lattice.clone(),
            atoms,
        }
    }

    /// 只保留指定原子
    pub fn selected(&self, indices: &[usize]) -> Crystal {
        let atoms = indices.iter().map(|&i| self.atoms[i].clone()).collect();
        Crystal {
            name: self.name.clone(),
            lattice: self.lattice.clone(),
            atoms,
        }
    }

    /// 换晶格并保持分数坐标不变（即施加应变）
    pub fn strained(&self, lattice: Lattice) -> Crystal {
        Crystal {
            name: self.name.clone(),
            lattice,
            atoms: self.atoms.clone(),
        }
    }

    /// 换晶格并保持笛卡尔坐标不变（即重新选取晶胞）
    pub fn recelled(&self, lattice: Lattice) -> Crystal {
        let sites = self
            .atoms
            .iter()
            .map(|a| (a.element.clone(), self.lattice.frac_to_cart(&a.position)))
            .collect();
        Crystal::from_cartesian(self.name.clone(), lattice, sites)
    }

    /// 每原子体积
    pub fn volume_per_atom(&self) -> Option<f64> {
        if self.atoms.is_empty() {
            return None;
        }
        Some(self.lattice.volume().abs() / self.atoms.len() as f64)
    }

    /// 按整数变换矩阵扩胞，新晶格为 T·M
    pub fn supercell(&self, transform: &Matrix3<i32>) -> Result<Crystal> {
        let t = transform.map(|x| x as f64);
        let multiplicity = t.determinant().abs().round() as usize;
        if multiplicity == 0 {
            return Err(HeteroError::InvalidLattice(
                "supercell matrix is singular".to_string(),
            ));
        }
        let lattice = Lattice::new(t * self.lattice.matrix())?;
        let to_new = t.transpose().try_inverse().ok_or_else(|| {
            HeteroError::InvalidLattice("supercell matrix is not invertible".to_string())
        })?;

        // 新晶胞 8 个角点在旧分数坐标中的包围盒
        let mut lo = Vector3::repeat(f64::INFINITY);
        let mut hi = Vector3::repeat(f64::NEG_INFINITY);
        for corner in 0..8u8 {
            let c = Vector3::new(
                (corner & 1) as f64,
                ((corner >> 1) & 1) as f64,
                ((corner >> 2) & 1) as f64,
            );
            let old = t.transpose() * c;
            lo = lo.inf(&old);
            hi = hi.sup(&old);
        }

        let inside = |x: f64| x > -1e-8 && x < 1.0 - 1e-8;
        let mut atoms = Vec::with_capacity(self.len() * multiplicity);
        for i in (lo.x.floor() as i64)..=(hi.x.ceil() as i64) {
            for j in (lo.y.floor() as i64)..=(hi.y.ceil() as i64) {
                for k in (lo.z.floor() as i64)..=(hi.z.ceil() as i64) {
                    let shift = Vector3::new(i as f64, j as f64, k as f64);
                    for atom in &self.atoms {
                        let f = to_new * (atom.position + shift);
                        if f.iter().all(|&x| inside(x)) {
                            atoms.push(Atom::new(atom.element.clone(), f.map(wrap_frac)));
                        }
                    }
                }
            }
        }

        if atoms.len() != self.len() * multiplicity {
            return Err(HeteroError::InvalidLattice(format!(
                "supercell holds {} sites, expected {}",
                atoms.len(),
                self.len() * multiplicity
            )));
        }
        Ok(Crystal::new(self.name.clone(), lattice, atoms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lattice_from_parameters_cubic() {
        let lattice = Lattice::from_parameters(5.0, 5.0, 5.0, 90.0, 90.0, 90.0).unwrap();
        let (a, b, c, alpha, beta, gamma) = lattice.parameters();

        assert!((a - 5.0).abs() < 1e-6);
        assert!((b - 5.0).abs() < 1e-6);
        assert!((c - 5.0).abs() < 1e-6);
        assert!((alpha - 90.0).abs() < 1e-6);
        assert!((beta - 90.0).abs() < 1e-6);
        assert!((gamma - 90.0).abs() < 1e-6);
    }

    #[test]
    fn test_lattice_volume_cubic() {
        let lattice = Lattice::from_parameters(5.0, 5.0, 5.0, 90.0, 90.0, 90.0).unwrap();

        // 5^3 = 125
        assert!((lattice.volume() - 125.0).abs() < 1e-6);
    }

    #[test]
    fn test_lattice_hexagonal() {
        let lattice = Lattice::from_parameters(3.0, 3.0, 5.0, 90.0, 90.0, 120.0).unwrap();
        let (a, _, c, _, _, gamma) = lattice.parameters();

        assert!((a - 3.0).abs() < 0.01);
        assert!((c - 5.0).abs() < 0.01);
        assert!((gamma - 120.0).abs() < 0.01);
        // 面积 = a² sin(120°)
        assert!((lattice.inplane_area() - 9.0 * 120f64.to_radians().sin()).abs() < 1e-9);
    }

    #[test]
    fn test_singular_lattice_rejected() {
        let result = Lattice::from_vectors(
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(2.0, 0.0, 0.0),
            Vector3::new(0.0, 0.0, 1.0),
        );
        assert!(matches!(result, Err(HeteroError::InvalidLattice(_))));
    }

    #[test]
    fn test_frac_cart_conversion() {
        let lattice = Lattice::from_parameters(3.0, 4.0, 5.0, 80.0, 95.0, 110.0).unwrap();
        let frac = Vector3::new(0.1, 0.7, 0.35);
        let back = lattice.cart_to_frac(&lattice.frac_to_cart(&frac));
        assert!((back - frac).norm() < 1e-12);
    }

    #[test]
    fn test_reciprocal_is_dual_basis() {
        let lattice = Lattice::from_parameters(3.0, 4.0, 5.0, 80.0, 95.0, 110.0).unwrap();
        let recip = lattice.reciprocal_crystallographic().unwrap();
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((lattice.vector(i).dot(&recip.vector(j)) - expected).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_left_handed_lattice_is_normalized() {
        let lattice = Lattice::from_vectors(
            Vector3::new(2.0, 0.0, 0.0),
            Vector3::new(0.0, 2.0, 0.0),
            Vector3::new(0.0, 0.0, -2.0),
        )
        .unwrap();
        let crystal = Crystal::new("X", lattice, vec![Atom::new("Fe", [0.1, 0.2, 0.3])]);
        assert!(crystal.lattice.volume() > 0.0);
        // 笛卡尔位置保持不变
        let cart = crystal.cart(0);
        assert!((cart - Vector3::new(0.2, 0.4, -0.6)).norm() < 1e-12);
    }

    #[test]
    fn test_crystal_formula_and_species() {
        let lattice = Lattice::from_parameters(5.0, 5.0, 5.0, 90.0, 90.0, 90.0).unwrap();
        let atoms = vec![
            Atom::new("Na", [0.0, 0.0, 0.0]),
            Atom::new("Na", [0.5, 0.5, 0.0]),
            Atom::new("Cl", [0.5, 0.0, 0.0]),
            Atom::new("Cl", [0.0, 0.5, 0.0]),
        ];
        let crystal = Crystal::new("NaCl", lattice, atoms);

        assert_eq!(crystal.formula(), "Cl2Na2");
        let species: Vec<String> = crystal.species().into_iter().collect();
        assert_eq!(species, vec!["Cl".to_string(), "Na".to_string()]);
    }

    #[test]
    fn test_translated_and_removed_do_not_mutate() {
        let lattice = Lattice::from_parameters(4.0, 4.0, 4.0, 90.0, 90.0, 90.0).unwrap();
        let crystal = Crystal::new(
            "Fe",
            lattice,
            vec![
                Atom::new("Fe", [0.0, 0.0, 0.0]),
                Atom::new("Fe", [0.5, 0.5, 0.5]),
            ],
        );

        let moved = crystal.translated(&[1], &Vector3::new(0.75, 0.0, 0.0));
        assert!((moved.atoms[1].position.x - 0.25).abs() < 1e-12);
        assert!((crystal.atoms[1].position.x - 0.5).abs() < 1e-12);

        let removed = crystal.removed(&[0]);
        assert_eq!(removed.len(), 1);
        assert_eq!(crystal.len(), 2);
    }

    #[test]
    fn test_supercell_multiplies_sites() {
        let lattice = Lattice::from_parameters(3.0, 3.0, 10.0, 90.0, 90.0, 90.0).unwrap();
        let crystal = Crystal::new(
            "Cu",
            lattice,
            vec![Atom::new("Cu", [0.0, 0.0, 0.2]), Atom::new("Cu", [0.5, 0.5, 0.4])],
        );
        let t = Matrix3::new(1, 1, 0, -1, 1, 0, 0, 0, 1);
        let sc = crystal.supercell(&t).unwrap();

        assert_eq!(sc.len(), 4);
        assert!((sc.lattice.volume() - 2.0 * crystal.lattice.volume()).abs() < 1e-9);
        // 面外坐标不变
        for atom in &sc.atoms {
            assert!((atom.position.z - 0.2).abs() < 1e-9 || (atom.position.z - 0.4).abs() < 1e-9);
        }
    }

    #[test]
    fn test_singular_supercell_rejected() {
        let lattice = Lattice::from_parameters(3.0, 3.0, 3.0, 90.0, 90.0, 90.0).unwrap();
        let crystal = Crystal::new("Cu", lattice, vec![Atom::new("Cu", [0.0, 0.0, 0.0])]);
        let t = Matrix3::new(1, 1, 0, 1, 1, 0, 0, 0, 1);
        assert!(crystal.supercell(&t).is_err());
    }

    #[test]
    fn test_recelled_keeps_cartesian_positions() {
        let lattice = Lattice::from_parameters(4.0, 4.0, 4.0, 90.0, 90.0, 90.0).unwrap();
        let crystal = Crystal::new("Fe", lattice, vec![Atom::new("Fe", [0.25, 0.5, 0.5])]);
        let sheared = Lattice::from_vectors(
            Vector3::new(4.0, 0.0, 0.0),
            Vector3::new(4.0, 4.0, 0.0),
            Vector3::new(0.0, 0.0, 4.0),
        )
        .unwrap();
        let recelled = crystal.recelled(sheared);
        let expected = crystal.cart(0);
        let got = recelled.cart(0);
        // 回卷后笛卡尔位置只可能相差一个晶格向量
        let diff = recelled.lattice.cart_to_frac(&(got - expected));
        for k in 0..3 {
            assert!((diff[k] - diff[k].round()).abs() < 1e-9);
        }
    }
}

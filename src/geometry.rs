//! # 几何与数论工具
//!
//! 晶面指数约化、扩展欧几里得算法、二维格子约化等底层函数。
//!
//! ## 依赖关系
//! - 被 `models/`、`miller`、`surface/`、`interface/`、`registration/` 使用
//! - 使用 `nalgebra`

use nalgebra::Vector3;

/// 分数坐标回卷容差
const WRAP_TOL: f64 = 1e-8;

/// 3×3 周期像的平面偏移，顺序为 (-1,-1), (-1,0), (-1,1), (0,-1), ...
pub const PERIODIC_IMAGES: [(f64, f64); 9] = [
    (-1.0, -1.0),
    (-1.0, 0.0),
    (-1.0, 1.0),
    (0.0, -1.0),
    (0.0, 0.0),
    (0.0, 1.0),
    (1.0, -1.0),
    (1.0, 0.0),
    (1.0, 1.0),
];

/// 分数坐标回卷到 [0, 1)
pub fn wrap_frac(x: f64) -> f64 {
    let w = x - x.floor();
    if w > 1.0 - WRAP_TOL {
        0.0
    } else {
        w
    }
}

/// 带容差的浮点最大公约数
pub fn float_gcd(a: f64, b: f64) -> f64 {
    let (rtol, atol) = (1e-5, 1e-8);
    let t = a.abs().min(b.abs());
    let (mut a, mut b) = (a, b);
    let mut guard = 0;
    while b.abs() > rtol * t + atol && guard < 1000 {
        let r = a % b;
        a = b;
        b = r;
        guard += 1;
    }
    a
}

/// 用浮点最大公约数约化一个三元组，结果取整
///
/// 零向量返回 `None`
pub fn reduce_triple(v: &[f64; 3]) -> Option<[i32; 3]> {
    if v.iter().all(|x| x.abs() < 1e-8) {
        return None;
    }
    let gcd = v.iter().copied().reduce(float_gcd)?.abs();
    if gcd < 1e-8 {
        return None;
    }
    Some([
        (v[0] / gcd).round() as i32,
        (v[1] / gcd).round() as i32,
        (v[2] / gcd).round() as i32,
    ])
}

/// 整数最大公约数（非负）
pub fn gcd(a: i64, b: i64) -> i64 {
    let (mut a, mut b) = (a.abs(), b.abs());
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a
}

/// 向下取整的取模（结果与除数同号）
fn floor_mod(a: i64, b: i64) -> i64 {
    ((a % b) + b) % b
}

/// 向下取整的除法
fn floor_div(a: i64, b: i64) -> i64 {
    (a - floor_mod(a, b)) / b
}

/// 扩展欧几里得算法：返回 (x, y) 使 a·x + b·y = gcd(a, b)
pub fn ext_gcd(a: i64, b: i64) -> (i64, i64) {
    if b == 0 {
        (1, 0)
    } else if floor_mod(a, b) == 0 {
        (0, 1)
    } else {
        let (x, y) = ext_gcd(b, floor_mod(a, b));
        (y, x - y * floor_div(a, b))
    }
}

/// 两向量夹角（弧度）
pub fn angle_between(a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
    (a.dot(b) / (a.norm() * b.norm())).clamp(-1.0, 1.0).acos()
}

/// 绕 z 轴旋转
pub fn rotate_z(v: &Vector3<f64>, angle: f64) -> Vector3<f64> {
    let (s, c) = angle.sin_cos();
    Vector3::new(c * v.x - s * v.y, s * v.x + c * v.y, v.z)
}

/// 二维 Gauss-Lagrange 约化：返回张成同一平面格子的最短基 (a, b)
///
/// 结果满足 a·b ≥ 0，且 a × b 与输入同向
pub fn reduce_vectors(a: &Vector3<f64>, b: &Vector3<f64>) -> (Vector3<f64>, Vector3<f64>) {
    let tol = 1e-8;
    let normal = a.cross(b);
    let (mut a, mut b) = (*a, *b);

    for _ in 0..1000 {
        if a.dot(&b) < -tol {
            b = -b;
        } else if a.norm() > b.norm() + tol {
            std::mem::swap(&mut a, &mut b);
        } else if b.norm() > (b + a).norm() + tol {
            b += a;
        } else if b.norm() > (b - a).norm() + tol {
            b -= a;
        } else {
            break;
        }
    }

    if a.cross(&b).dot(&normal) < 0.0 {
        (b, a)
    } else {
        (a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_frac() {
        assert!((wrap_frac(1.25) - 0.25).abs() < 1e-12);
        assert!((wrap_frac(-0.25) - 0.75).abs() < 1e-12);
        assert_eq!(wrap_frac(0.999_999_999_9), 0.0);
    }

    #[test]
    fn test_reduce_triple() {
        assert_eq!(reduce_triple(&[2.0, 2.0, 0.0]), Some([1, 1, 0]));
        assert_eq!(reduce_triple(&[-3.0, 0.0, 6.0]), Some([-1, 0, 2]));
        assert_eq!(reduce_triple(&[0.5, 0.5, 1.0]), Some([1, 1, 2]));
        assert_eq!(reduce_triple(&[0.0, 0.0, 0.0]), None);
    }

    #[test]
    fn test_ext_gcd_identity() {
        for &(a, b) in &[(3, 5), (1, 1), (2, -1), (-4, 6), (7, 0), (1, -2)] {
            let (x, y) = ext_gcd(a, b);
            assert_eq!((a * x + b * y).abs(), gcd(a, b));
        }
    }

    #[test]
    fn test_reduce_vectors_shortest_basis() {
        let a = Vector3::new(1.0, 0.0, 0.0);
        let b = Vector3::new(3.0, 1.0, 0.0);
        let (ra, rb) = reduce_vectors(&a, &b);

        assert!((ra.norm() - 1.0).abs() < 1e-12);
        assert!((rb.norm() - 1.0).abs() < 1e-12);
        // 保持取向
        assert!(ra.cross(&rb).z > 0.0);
        // 面积不变
        assert!((ra.cross(&rb).norm() - a.cross(&b).norm()).abs() < 1e-12);
    }

    #[test]
    fn test_reduce_vectors_hexagonal_is_stable() {
        let a = Vector3::new(1.0, 0.0, 0.0);
        let b = rotate_z(&a, 120f64.to_radians());
        let (ra, rb) = reduce_vectors(&a, &b);
        assert!((ra.norm() - 1.0).abs() < 1e-9);
        assert!((rb.norm() - 1.0).abs() < 1e-9);
        assert!(ra.cross(&rb).z > 0.0);
    }
}

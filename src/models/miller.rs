//! # 晶面指数
//!
//! 约化到最简整数比的 Miller 指数，永远不为零向量。
//!
//! ## 依赖关系
//! - 被 `miller`、`surface/`、`cli/` 使用

use crate::error::{HeteroError, Result};
use crate::geometry::gcd;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Miller 指数 (h k l)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MillerIndex {
    h: i32,
    k: i32,
    l: i32,
}

impl MillerIndex {
    /// 创建并约化到最简整数比
    pub fn new(h: i32, k: i32, l: i32) -> Result<Self> {
        if h == 0 && k == 0 && l == 0 {
            return Err(HeteroError::InvalidMillerIndex(
                "(0 0 0) does not describe a plane".to_string(),
            ));
        }
        let g = gcd(gcd(h as i64, k as i64), l as i64) as i32;
        Ok(MillerIndex {
            h: h / g,
            k: k / g,
            l: l / g,
        })
    }

    pub fn from_array(hkl: [i32; 3]) -> Result<Self> {
        Self::new(hkl[0], hkl[1], hkl[2])
    }

    pub fn as_array(&self) -> [i32; 3] {
        [self.h, self.k, self.l]
    }

    pub fn h(&self) -> i32 {
        self.h
    }

    pub fn k(&self) -> i32 {
        self.k
    }

    pub fn l(&self) -> i32 {
        self.l
    }

    /// 欧几里得范数
    pub fn norm(&self) -> f64 {
        ((self.h * self.h + self.k * self.k + self.l * self.l) as f64).sqrt()
    }

    /// 各分量符号之和
    pub fn sign_sum(&self) -> i32 {
        self.h.signum() + self.k.signum() + self.l.signum()
    }

    /// 非负分量个数
    pub fn non_negative_count(&self) -> usize {
        self.as_array().iter().filter(|&&x| x >= 0).count()
    }
}

impl TryFrom<[f64; 3]> for MillerIndex {
    type Error = HeteroError;

    fn try_from(v: [f64; 3]) -> Result<Self> {
        if v.iter().any(|x| !x.is_finite() || (x - x.round()).abs() > 1e-8) {
            return Err(HeteroError::InvalidMillerIndex(format!(
                "({} {} {}) is not an integer triple",
                v[0], v[1], v[2]
            )));
        }
        Self::new(v[0].round() as i32, v[1].round() as i32, v[2].round() as i32)
    }
}

impl fmt::Display for MillerIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} {} {})", self.h, self.k, self.l)
    }
}

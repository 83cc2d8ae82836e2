//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数和子命令。
//!
//! ## 命令结构
//! - `miller`: 列出对称性不等价的晶面指数
//! - `surface`: 生成表面 slab
//! - `interface`: 构建异质界面，可选配准优化
//! - `scan`: 对界面做平移扫描并导出 CSV
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 子模块: miller, surface, interface, scan

pub mod interface;
pub mod miller;
pub mod scan;
pub mod surface;

use clap::{Parser, Subcommand};

/// heterostack - 晶体表面与异质界面构建工具
#[derive(Parser)]
#[command(name = "heterostack")]
#[command(version)]
#[command(about = "Build crystal surfaces and heterostructure interfaces", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令
#[derive(Subcommand)]
pub enum Commands {
    /// List symmetrically distinct Miller indices of a bulk structure
    Miller(miller::MillerArgs),

    /// Build a surface slab from a bulk structure
    Surface(surface::SurfaceArgs),

    /// Build a substrate/film interface and optionally optimize its registration
    Interface(interface::InterfaceArgs),

    /// Scan in-plane shifts or interfacial distances of an interface
    Scan(scan::ScanArgs),
}

/// 解析 `El=r` 形式的自定义半径
pub fn parse_radius(input: &str) -> Result<(String, f64), String> {
    let (element, radius) = input
        .split_once('=')
        .ok_or_else(|| format!("Expected ELEMENT=RADIUS, got '{}'", input))?;
    let radius: f64 = radius
        .trim()
        .parse()
        .map_err(|_| format!("Invalid radius '{}'", radius))?;
    if radius <= 0.0 {
        return Err(format!("Radius must be positive, got {}", radius));
    }
    Ok((element.trim().to_string(), radius))
}

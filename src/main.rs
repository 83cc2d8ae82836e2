//! # heterostack - 晶体表面与异质界面构建工具
//!
//! 从两个体相晶体出发，生成指定晶面的 slab，按晶格匹配结果堆叠成周期性界面，
//! 并在经验重叠能量面上搜索最优的面内配准。
//!
//! ## 子命令
//! - `miller` - 对称性不等价的晶面指数
//! - `surface` - 表面 slab 生成
//! - `interface` - 界面构建与配准优化
//! - `scan` - 界面平移扫描
//!
//! ## 依赖关系
//! ```text
//! main.rs
//!   ├── cli/          (命令行参数定义)
//!   ├── commands/     (命令执行逻辑)
//!   │     ├── miller.rs     (晶面枚举)
//!   │     ├── surface/      (slab 生成与分层)
//!   │     ├── interface/    (界面构建流水线)
//!   │     ├── registration/ (能量面、优化、扫描)
//!   │     ├── symmetry/     (对称性分析)
//!   │     ├── parsers/      (POSCAR 读写)
//!   │     └── models/       (数据模型)
//!   ├── batch/        (并行扫描)
//!   ├── utils/        (工具函数)
//!   └── error.rs      (错误处理)
//! ```

mod batch;
mod cli;
mod commands;
mod error;
mod geometry;
mod interface;
mod miller;
mod models;
mod parsers;
mod registration;
mod surface;
mod symmetry;
mod utils;

use clap::Parser;
use cli::Cli;

fn main() {
    // Initialize colored output for Windows compatibility
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();

    if let Err(e) = commands::run(cli.command) {
        utils::output::print_error(&format!("{}", e));
        std::process::exit(1);
    }
}

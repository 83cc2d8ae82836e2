//! # 并行扫描执行器
//!
//! 把一组互相独立的打分任务分发到固定大小的 rayon 线程池。
//!
//! ## 功能
//! - 每个任务只读共享数据，返回一个标量
//! - 任一任务失败即整体失败（报告任务序号），不返回部分结果，不重试
//! - 可选的进度条显示
//!
//! ## 依赖关系
//! - 被 `registration/scan.rs` 调用
//! - 使用 `utils/progress.rs` 创建进度条
//! - 使用 `rayon` 进行并行计算

use crate::error::{HeteroError, Result};
use crate::utils::progress;

use rayon::prelude::*;

/// 并行扫描执行器
#[derive(Debug, Clone)]
pub struct ScanRunner {
    /// 并行作业数
    jobs: usize,
    show_progress: bool,
}

impl ScanRunner {
    /// `jobs` 为 0 时使用全部 CPU
    pub fn new(jobs: usize) -> Self {
        let jobs = if jobs == 0 { num_cpus::get() } else { jobs };
        Self {
            jobs,
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// 并行执行全部任务，结果顺序与任务顺序一致
    pub fn run<T, F>(&self, tasks: &[T], worker: F) -> Result<Vec<f64>>
    where
        T: Sync,
        F: Fn(&T) -> Result<f64> + Sync + Send,
    {
        let pb = if self.show_progress {
            progress::create_progress_bar(tasks.len() as u64, "Scanning")
        } else {
            indicatif::ProgressBar::hidden()
        };

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .build()
            .map_err(|e| HeteroError::Other(format!("failed to start worker pool: {}", e)))?;

        let results: Result<Vec<f64>> = pool.install(|| {
            tasks
                .par_iter()
                .enumerate()
                .map(|(index, task)| {
                    let score = worker(task).map_err(|e| HeteroError::ScanFailed {
                        index,
                        reason: e.to_string(),
                    });
                    pb.inc(1);
                    score
                })
                .collect()
        });

        pb.finish_and_clear();
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_results_keep_task_order() {
        let tasks: Vec<f64> = (0..50).map(|i| i as f64).collect();
        let scores = ScanRunner::new(4).run(&tasks, |x| Ok(x * x)).unwrap();
        assert_eq!(scores.len(), 50);
        assert_eq!(scores[7], 49.0);
        assert_eq!(scores[49], 2401.0);
    }

    #[test]
    fn test_single_failure_fails_scan() {
        let tasks: Vec<usize> = (0..20).collect();
        let result = ScanRunner::new(2).run(&tasks, |&i| {
            if i == 13 {
                Err(HeteroError::Other("boom".to_string()))
            } else {
                Ok(i as f64)
            }
        });
        match result {
            Err(HeteroError::ScanFailed { index, reason }) => {
                assert_eq!(index, 13);
                assert!(reason.contains("boom"));
            }
            other => panic!("expected scan failure, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_jobs_uses_all_cpus() {
        assert_eq!(ScanRunner::new(0).jobs(), num_cpus::get());
    }
}

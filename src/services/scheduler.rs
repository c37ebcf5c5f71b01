//! 限定并发的抓取调度器
//!
//! 任务按并发上限分批；每批为每个任务启动一个短生命周期的 worker，
//! worker 完成后在本批的完成通道上发送且只发送一条消息。
//! 驱动方对每个已启动的 worker 做一次带超时的接收，超时即视为该任务失败，
//! 不会强制终止 worker，迟到的消息随通道一起被丢弃。

use futures::future::BoxFuture;
use futures::FutureExt;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::models::AssetQuote;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot launch worker: {0}")]
pub struct SpawnError(pub String);

/// Launches detached workers for the scheduler.
pub trait Spawner: Send + Sync {
    /// Checks whether workers can be launched at all.
    fn check_available(&self) -> Result<(), SpawnError>;

    fn spawn(&self, task: BoxFuture<'static, ()>) -> Result<(), SpawnError>;
}

/// 在当前 tokio 运行时上启动 worker
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSpawner;

impl Spawner for TokioSpawner {
    fn check_available(&self) -> Result<(), SpawnError> {
        tokio::runtime::Handle::try_current()
            .map(|_| ())
            .map_err(|e| SpawnError(e.to_string()))
    }

    fn spawn(&self, task: BoxFuture<'static, ()>) -> Result<(), SpawnError> {
        let handle = tokio::runtime::Handle::try_current().map_err(|e| SpawnError(e.to_string()))?;
        handle.spawn(task);
        Ok(())
    }
}

/// 一个抓取任务：独占一个输出槽位
#[derive(Debug, Clone)]
pub struct FetchTask {
    pub index: usize,
    pub symbol: String,
    pub quote: AssetQuote,
}

/// 执行单个任务的抓取、重试与解析，返回写好的槽位和是否成功
pub type FetchUnit = Arc<dyn Fn(FetchTask) -> BoxFuture<'static, (AssetQuote, bool)> + Send + Sync>;

/// 单个任务的结果；超时或启动失败时没有槽位内容
#[derive(Debug, Clone)]
pub struct TaskOutcome {
    pub index: usize,
    pub symbol: String,
    pub quote: Option<AssetQuote>,
    pub success: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub batches: usize,
    pub launched: usize,
    pub signals: usize,
    pub timeouts: usize,
    pub launch_failures: usize,
    pub succeeded: usize,
    pub sequential: bool,
}

struct Completion {
    position: usize,
    quote: Option<AssetQuote>,
    success: bool,
}

pub struct BoundedScheduler {
    max_concurrency: usize,
    task_timeout: Duration,
    cooldown: Duration,
    spawner: Arc<dyn Spawner>,
}

impl BoundedScheduler {
    pub fn new(max_concurrency: usize, task_timeout: Duration, cooldown: Duration) -> Self {
        Self {
            max_concurrency: max_concurrency.max(1),
            task_timeout,
            cooldown,
            spawner: Arc::new(TokioSpawner),
        }
    }

    pub fn with_spawner(mut self, spawner: Arc<dyn Spawner>) -> Self {
        self.spawner = spawner;
        self
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// 批次数 = ⌈N / C⌉
    pub fn batch_count(&self, tasks: usize) -> usize {
        (tasks + self.max_concurrency - 1) / self.max_concurrency
    }

    pub async fn run(&self, tasks: Vec<FetchTask>, unit: FetchUnit) -> (Vec<TaskOutcome>, BatchReport) {
        let mut outcomes: Vec<TaskOutcome> = tasks
            .iter()
            .map(|t| TaskOutcome {
                index: t.index,
                symbol: t.symbol.clone(),
                quote: None,
                success: false,
            })
            .collect();

        let report = match self.spawner.check_available() {
            Ok(()) => self.run_batched(tasks, unit, &mut outcomes).await,
            Err(e) => {
                warn!("Worker pool unavailable ({}), falling back to sequential", e);
                self.run_sequential(tasks, unit, &mut outcomes).await
            }
        };

        info!(
            "Fetch complete: {}/{} succeeded ({} batches, {} timeouts, {} launch failures{})",
            report.succeeded,
            outcomes.len(),
            report.batches,
            report.timeouts,
            report.launch_failures,
            if report.sequential { ", sequential" } else { "" }
        );
        (outcomes, report)
    }

    async fn run_sequential(
        &self,
        tasks: Vec<FetchTask>,
        unit: FetchUnit,
        outcomes: &mut [TaskOutcome],
    ) -> BatchReport {
        let mut report = BatchReport {
            sequential: true,
            ..Default::default()
        };
        for (position, task) in tasks.into_iter().enumerate() {
            report.launched += 1;
            let (quote, success) = unit(task).await;
            report.signals += 1;
            if success {
                report.succeeded += 1;
            }
            outcomes[position].quote = Some(quote);
            outcomes[position].success = success;
        }
        report
    }

    async fn run_batched(
        &self,
        tasks: Vec<FetchTask>,
        unit: FetchUnit,
        outcomes: &mut [TaskOutcome],
    ) -> BatchReport {
        let mut report = BatchReport::default();
        let total = tasks.len();
        let mut pending = tasks.into_iter().enumerate().peekable();

        while pending.peek().is_some() {
            let batch: Vec<(usize, FetchTask)> = pending.by_ref().take(self.max_concurrency).collect();
            let batch_len = batch.len();
            report.batches += 1;
            debug!("Launching batch {} of {} tasks", report.batches, batch_len);

            let symbols: Vec<(usize, String)> =
                batch.iter().map(|(position, task)| (*position, task.symbol.clone())).collect();
            let (tx, mut rx) = mpsc::channel::<Completion>(batch_len);
            for (position, task) in batch {
                report.launched += 1;
                let worker_tx = tx.clone();
                let unit = Arc::clone(&unit);
                let symbol = task.symbol.clone();
                let worker = async move {
                    let (quote, success) = unit(task).await;
                    // 无论成败都要发信号；驱动方若已超时放弃，发送失败即丢弃
                    let _ = worker_tx
                        .send(Completion {
                            position,
                            quote: Some(quote),
                            success,
                        })
                        .await;
                }
                .boxed();

                if let Err(e) = self.spawner.spawn(worker) {
                    warn!("Failed to launch worker for {}: {}", symbol, e);
                    report.launch_failures += 1;
                    let _ = tx.try_send(Completion {
                        position,
                        quote: None,
                        success: false,
                    });
                }
            }
            drop(tx);

            let mut received = Vec::with_capacity(batch_len);
            for _ in 0..batch_len {
                match tokio::time::timeout(self.task_timeout, rx.recv()).await {
                    Ok(Some(done)) => {
                        report.signals += 1;
                        received.push(done.position);
                        if done.success {
                            report.succeeded += 1;
                        }
                        outcomes[done.position].quote = done.quote;
                        outcomes[done.position].success = done.success;
                    }
                    // 所有发送端都已释放，不会再有信号
                    Ok(None) => break,
                    Err(_) => {
                        report.timeouts += 1;
                        warn!("Task wait timed out after {:?}", self.task_timeout);
                    }
                }
            }
            for (position, symbol) in &symbols {
                if !received.contains(position) {
                    warn!("Task {} ({}) abandoned without completion", position, symbol);
                }
            }

            if report.launched < total && !self.cooldown.is_zero() {
                tokio::time::sleep(self.cooldown).await;
            }
        }
        report
    }
}

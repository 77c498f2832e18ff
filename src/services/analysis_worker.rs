use std::sync::Arc;
use tokio::sync::{
    Mutex, broadcast,
    mpsc::{self, error::TrySendError},
    oneshot,
};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{debug, info, warn};

use super::analysis_pipeline::{AnalysisJob, AnalysisPipeline, PipelineOutcome};
use crate::{
    config::PipelineConfig,
    error::{AppError, AppResult},
};

/// 完成事件广播的缓冲大小
const COMPLETION_BUFFER: usize = 64;

/// 作业完成事件
#[derive(Debug, Clone)]
pub struct AnalysisCompletion {
    pub id: String,
    pub outcome: PipelineOutcome,
}

/// 队列中的作业及其完成通知
#[derive(Debug)]
struct QueuedJob {
    job: AnalysisJob,
    done: oneshot::Sender<PipelineOutcome>,
}

/// 已提交作业的句柄
#[derive(Debug)]
pub struct JobHandle {
    pub id: String,
    receiver: oneshot::Receiver<PipelineOutcome>,
}

impl JobHandle {
    /// 等待作业结束
    pub async fn wait(self) -> AppResult<PipelineOutcome> {
        self.receiver
            .await
            .map_err(|_| AppError::service_unavailable("分析工作者已退出"))
    }
}

/// 预留的队列空位
///
/// 持有期间占用一个队列位置，丢弃即释放。提交不会等待。
#[derive(Debug)]
pub struct JobSlot<'a> {
    permit: mpsc::Permit<'a, QueuedJob>,
}

impl JobSlot<'_> {
    /// 把作业放入预留的位置
    pub fn submit(self, job: AnalysisJob) -> JobHandle {
        let id = job.id.clone();
        let (done, receiver) = oneshot::channel();
        self.permit.send(QueuedJob { job, done });

        debug!(analysis_id = %id, "分析作业已入队");
        JobHandle { id, receiver }
    }
}

/// 分析工作池
///
/// 作业进入有界队列后由固定数量的工作者并发执行。队列满时立即拒绝，
/// 不等待空位。取消后工作者会把队列中剩余的作业以取消状态结束，然后退出。
#[derive(Debug, Clone)]
pub struct AnalysisWorkerPool {
    sender: mpsc::Sender<QueuedJob>,
    completions: broadcast::Sender<AnalysisCompletion>,
    cancel: CancellationToken,
    tracker: TaskTracker,
}

impl AnalysisWorkerPool {
    /// 启动工作者
    pub fn start(
        pipeline: Arc<AnalysisPipeline>,
        config: &PipelineConfig,
        cancel: CancellationToken,
    ) -> Self {
        let (sender, receiver) = mpsc::channel::<QueuedJob>(config.queue_capacity);
        let (completions, _) = broadcast::channel(COMPLETION_BUFFER);
        let receiver = Arc::new(Mutex::new(receiver));
        let tracker = TaskTracker::new();

        for worker_id in 0..config.workers {
            let receiver = Arc::clone(&receiver);
            let pipeline = Arc::clone(&pipeline);
            let completions = completions.clone();
            let cancel = cancel.clone();

            tracker.spawn(async move {
                debug!(worker_id, "分析工作者启动");
                while let Some(queued) = next_job(&receiver, &cancel).await {
                    let QueuedJob { job, done } = queued;
                    let outcome = pipeline.run(&job, &cancel).await;

                    // 没有订阅者时发送失败是正常的
                    let _ = completions.send(AnalysisCompletion {
                        id: job.id.clone(),
                        outcome: outcome.clone(),
                    });
                    let _ = done.send(outcome);
                }
                debug!(worker_id, "分析工作者退出");
            });
        }
        tracker.close();

        info!(workers = config.workers, queue_capacity = config.queue_capacity, "分析工作池已启动");

        Self {
            sender,
            completions,
            cancel,
            tracker,
        }
    }

    /// 预留一个队列位置，队列已满时返回 `QueueFull`
    pub fn reserve(&self) -> AppResult<JobSlot<'_>> {
        if self.cancel.is_cancelled() {
            return Err(AppError::service_unavailable("分析工作池已关闭"));
        }

        match self.sender.try_reserve() {
            Ok(permit) => Ok(JobSlot { permit }),
            Err(TrySendError::Full(())) => {
                warn!(queue_capacity = self.sender.max_capacity(), "分析队列已满");
                Err(AppError::QueueFull)
            }
            Err(TrySendError::Closed(())) => {
                Err(AppError::service_unavailable("分析队列已关闭"))
            }
        }
    }

    /// 提交作业，队列已满时立即失败
    pub fn submit(&self, job: AnalysisJob) -> AppResult<JobHandle> {
        Ok(self.reserve()?.submit(job))
    }

    /// 订阅作业完成事件
    pub fn subscribe(&self) -> broadcast::Receiver<AnalysisCompletion> {
        self.completions.subscribe()
    }

    /// 取消所有作业并等待工作者退出
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        self.tracker.wait().await;
        info!("分析工作池已停止");
    }

    pub fn is_shutdown(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// 取下一个作业；取消后仍会取走队列中剩余的作业，队列为空时返回 None
async fn next_job(
    receiver: &Mutex<mpsc::Receiver<QueuedJob>>,
    cancel: &CancellationToken,
) -> Option<QueuedJob> {
    let mut receiver = receiver.lock().await;
    tokio::select! {
        biased;
        job = receiver.recv() => job,
        _ = cancel.cancelled() => receiver.try_recv().ok(),
    }
}

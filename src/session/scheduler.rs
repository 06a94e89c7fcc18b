use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// 可取消的周期调度句柄，Drop 时自动中止。
pub(crate) struct TickerHandle {
    task: Option<JoinHandle<()>>,
}

impl TickerHandle {
    pub(crate) fn cancel(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for TickerHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// 立即执行第一次 tick，之后按 `period` 重复，直到回调返回 false。
pub(crate) fn spawn_ticker<F, Fut>(period: Duration, mut on_tick: F) -> TickerHandle
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = bool> + Send + 'static,
{
    let task = tokio::spawn(async move {
        let mut ticks = interval(period);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticks.tick().await;
            if !on_tick().await {
                break;
            }
        }
    });

    TickerHandle { task: Some(task) }
}

use crate::core::relay::{RelayHandle, Subscription};
use crate::domain::model::SubscriptionSnapshot;
use crate::domain::ports::SubscriptionSource;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshReason {
    Poll,
    Event(String),
    Manual,
}

#[derive(Debug, Clone)]
pub struct RefreshOptions {
    pub poll_interval: Duration,
    /// 收到這些事件時重新拉取
    pub events: Vec<String>,
}

/// 輪詢與 socket 事件共用同一個「失效後重新拉取」迴圈。
///
/// 拉取一次只跑一個；等待中的觸發會合併成一次，最新的結果覆蓋舊的。
pub struct RefreshCoordinator;

impl RefreshCoordinator {
    pub fn spawn<S>(source: S, relay: &RelayHandle, options: RefreshOptions) -> RefreshHandle
    where
        S: SubscriptionSource + 'static,
    {
        // 容量 1：已有待處理的觸發時，新的觸發直接合併
        let (trigger, triggers) = mpsc::channel(1);
        let (snapshot_tx, snapshots) = watch::channel(None);

        let subscriptions = options
            .events
            .iter()
            .map(|event| {
                let trigger = trigger.clone();
                let name = event.clone();
                relay.subscribe(event, move |_payload| {
                    let _ = trigger.try_send(RefreshReason::Event(name.clone()));
                })
            })
            .collect();

        let task = tokio::spawn(run(source, options.poll_interval, triggers, snapshot_tx));

        RefreshHandle {
            snapshots,
            trigger,
            task,
            _subscriptions: subscriptions,
        }
    }
}

/// drop 時一併釋放輪詢計時器、事件訂閱與背景任務
pub struct RefreshHandle {
    snapshots: watch::Receiver<Option<SubscriptionSnapshot>>,
    trigger: mpsc::Sender<RefreshReason>,
    task: JoinHandle<()>,
    _subscriptions: Vec<Subscription>,
}

impl RefreshHandle {
    pub fn snapshots(&self) -> watch::Receiver<Option<SubscriptionSnapshot>> {
        self.snapshots.clone()
    }

    pub fn latest(&self) -> Option<SubscriptionSnapshot> {
        self.snapshots.borrow().clone()
    }

    /// 手動要求重新拉取；已有待處理的請求時會合併
    pub fn refresh(&self) {
        match self.trigger.try_send(RefreshReason::Manual) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::debug!("Refresh already pending, coalescing manual request")
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::warn!("⚠️ Refresh loop is no longer running")
            }
        }
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run<S: SubscriptionSource>(
    source: S,
    poll_interval: Duration,
    mut triggers: mpsc::Receiver<RefreshReason>,
    snapshots: watch::Sender<Option<SubscriptionSnapshot>>,
) {
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let reason = tokio::select! {
            _ = ticker.tick() => RefreshReason::Poll,
            reason = triggers.recv() => match reason {
                Some(reason) => reason,
                None => break,
            },
        };

        // 開始拉取前累積的觸發併入這一次
        while let Ok(extra) = triggers.try_recv() {
            tracing::trace!("Coalescing refresh trigger {:?}", extra);
        }

        tracing::debug!("🔄 Refreshing subscription ({:?})", reason);
        match source.fetch().await {
            Ok(snapshot) => {
                snapshots.send_replace(Some(snapshot));
                // 事件觸發的拉取也算一次輪詢
                ticker.reset();
            }
            Err(e) => {
                tracing::warn!(
                    "⚠️ Subscription refresh failed, keeping previous snapshot: {}",
                    e
                );
            }
        }
    }
}

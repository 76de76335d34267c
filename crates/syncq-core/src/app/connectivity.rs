//! ConnectivityMonitor - 接続状態に応じて sync pass を起動
//!
//! `SyncQueue` 自体はスリープもスケジューリングもしません。
//! いつ `process_queue` を呼ぶかはこのループ（またはアプリ側）が決めます。
//!
//! - オフライン → オンラインに変わったら 1 回処理
//! - `interval` が指定されていれば、オンラインの間は定期的に処理

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};

use crate::queue::SyncQueue;

/// Handle of the background monitor task.
/// - `request_shutdown()` でループを止める（実行中の pass はキャンセルしない）
/// - `shutdown_and_join()` で終了を待てる
pub struct ConnectivityMonitor {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl ConnectivityMonitor {
    /// `online` carries the current connectivity state (`true` = online).
    pub fn spawn(
        queue: Arc<SyncQueue>,
        online: watch::Receiver<bool>,
        interval: Option<Duration>,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let join = tokio::spawn(monitor_loop(queue, online, interval, shutdown_rx));
        Self { shutdown_tx, join }
    }

    pub fn request_shutdown(&self) {
        // ignore send error: the loop may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        let _ = self.join.await;
    }
}

async fn monitor_loop(
    queue: Arc<SyncQueue>,
    mut online: watch::Receiver<bool>,
    interval: Option<Duration>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut was_online = *online.borrow_and_update();
    if was_online {
        queue.process_queue().await;
    }

    let mut ticker = interval.map(|period| {
        // 最初の tick は period 後（起動直後の pass と重ねない）
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    });

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                // 次のループで判定
                continue;
            }
            changed = online.changed() => {
                if changed.is_err() {
                    tracing::debug!("connectivity source closed, stopping monitor");
                    break;
                }
                let now_online = *online.borrow_and_update();
                if now_online && !was_online {
                    tracing::info!("connectivity restored, processing sync queue");
                    queue.process_queue().await;
                } else if !now_online && was_online {
                    tracing::info!("connectivity lost");
                }
                was_online = now_online;
            }
            _ = tick(&mut ticker) => {
                if was_online && queue.has_pending_requests().await {
                    queue.process_queue().await;
                }
            }
        }
    }
}

async fn tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

//! 推論ワーカー
//!
//! 読み込み済みのモデルを専用スレッドが1つだけ所有し、分類要求を順に処理します。
//! バックエンドによってはモデルが `Send` / `Sync` でないため、エンジンはワーカースレッド内で構築します。
//! 呼び出し側は非同期に待ち、タイムアウトすると `InferenceError::Timeout` を受け取ります。
//!
//! `spawn` と `shutdown`（および `Drop`）はワーカースレッドを待つ同期処理です。
//! 非同期ランタイム上では `tokio::task::spawn_blocking` から呼び出してください。

use std::sync::mpsc as std_mpsc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::error::{ClassifyError, InferenceError, ModelLoadError};
use crate::ml::inference::{ClassificationEngine, ClassificationResult, ScoreModel};
use crate::model::InferenceSettings;

struct Job {
    bytes: Vec<u8>,
    filename: Option<String>,
    reply: oneshot::Sender<Result<ClassificationResult, ClassifyError>>,
}

/// 単一所有者の推論ワーカー
pub struct InferenceWorker {
    sender: Option<mpsc::Sender<Job>>,
    handle: Option<JoinHandle<()>>,
    timeout: Duration,
}

impl InferenceWorker {
    /// ワーカースレッドを起動し、その中でエンジンを構築する
    ///
    /// モデルの読み込みに失敗した場合はここでエラーを返します（起動時に致命的）。
    /// 読み込みが終わるまで呼び出し元のスレッドをブロックします。
    pub fn spawn<F, M>(factory: F, settings: &InferenceSettings) -> Result<Self, ModelLoadError>
    where
        F: FnOnce() -> Result<ClassificationEngine<M>, ModelLoadError> + Send + 'static,
        M: ScoreModel + 'static,
    {
        let (sender, mut receiver) = mpsc::channel::<Job>(settings.queue_capacity.max(1));
        let (ready_tx, ready_rx) = std_mpsc::channel::<Result<(), ModelLoadError>>();

        let handle = thread::Builder::new()
            .name("inference-worker".to_string())
            .spawn(move || {
                let engine = match factory() {
                    Ok(engine) => {
                        let _ = ready_tx.send(Ok(()));
                        engine
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                info!("推論ワーカーを開始しました");
                while let Some(job) = receiver.blocking_recv() {
                    // タイムアウト済みの要求は処理しない
                    if job.reply.is_closed() {
                        debug!("破棄済みの要求をスキップしました");
                        continue;
                    }
                    let result = engine.classify_bytes(&job.bytes, job.filename.as_deref());
                    if job.reply.send(result).is_err() {
                        debug!("要求元が応答を待たずに終了しました");
                    }
                }
                info!("推論ワーカーを終了しました");
            })
            .map_err(|e| ModelLoadError::Worker(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                sender: Some(sender),
                handle: Some(handle),
                timeout: settings.timeout(),
            }),
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(ModelLoadError::Worker(
                    "エンジン構築中にワーカーが停止しました".to_string(),
                ))
            }
        }
    }

    /// 画像を分類する
    ///
    /// タイムアウト後もワーカー側の処理は最後まで実行され、結果は破棄されます。
    pub async fn classify(
        &self,
        bytes: Vec<u8>,
        filename: Option<String>,
    ) -> Result<ClassificationResult, ClassifyError> {
        let sender = self
            .sender
            .as_ref()
            .ok_or(InferenceError::WorkerUnavailable)?;

        let (reply, response) = oneshot::channel();
        let job = Job {
            bytes,
            filename,
            reply,
        };

        match tokio::time::timeout(self.timeout, async {
            sender
                .send(job)
                .await
                .map_err(|_| InferenceError::WorkerUnavailable)?;
            response.await.map_err(|_| InferenceError::WorkerUnavailable)
        })
        .await
        {
            Ok(result) => result?,
            Err(_) => {
                warn!("推論がタイムアウトしました ({:?})", self.timeout);
                Err(InferenceError::Timeout(self.timeout).into())
            }
        }
    }

    /// 待ち行列を閉じてワーカースレッドの終了を待つ（ブロックする）
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("推論ワーカーが異常終了していました");
            }
        }
    }
}

impl Drop for InferenceWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

//! 배치 업데이터
//!
//! git 소스 애드온 전체에 pull을 동시에 실행하고 진행 이벤트를 브로드캐스트
//! 채널로 내보냅니다. 동시성 상한은 설정으로만 걸 수 있고 기본은
//! 무제한입니다.

use crate::error::CoreResult;
use crate::git;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, Semaphore};
use tokio::task::JoinSet;

/// 배치 진행 이벤트. 개별 애드온의 이벤트는 임의 순서로 섞일 수 있고,
/// `batch-complete`만 모든 업데이트가 정착한 뒤에 옵니다.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum UpdateEvent {
    BatchStart { total: usize },
    UpdateStart { addon_id: String },
    UpdateSuccess { addon_id: String },
    UpdateError { addon_id: String, error: String },
    BatchProgress { processed: usize, total: usize },
    BatchComplete { updated: usize, failed: usize },
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateSummary {
    pub updated: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

/// 루트 아래의 git 소스 애드온을 모두 pull.
///
/// git 애드온이 하나도 없으면 이벤트 없이 0 카운트로 즉시 성공합니다.
/// `concurrency`가 Some이면 세마포어로 동시 pull 수를 제한합니다.
pub async fn update_all(
    addons_root: &Path,
    events: &broadcast::Sender<UpdateEvent>,
    concurrency: Option<usize>,
) -> CoreResult<UpdateSummary> {
    let git_addons = collect_git_addons(addons_root)?;

    if git_addons.is_empty() {
        return Ok(UpdateSummary {
            updated: 0,
            failed: 0,
            errors: Vec::new(),
        });
    }

    let total = git_addons.len();
    tracing::info!("Batch update: {} git addon(s)", total);
    // 수신자가 없어도(이벤트 스트림 미구독) 전송 실패는 무시
    let _ = events.send(UpdateEvent::BatchStart { total });

    let semaphore = concurrency.map(|cap| Arc::new(Semaphore::new(cap.max(1))));
    let processed = Arc::new(AtomicUsize::new(0));
    let mut tasks = JoinSet::new();

    for addon_path in git_addons {
        let events = events.clone();
        let semaphore = semaphore.clone();
        let processed = processed.clone();

        tasks.spawn(async move {
            let _permit = match semaphore {
                Some(sem) => sem.acquire_owned().await.ok(),
                None => None,
            };

            let addon_id = addon_path
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_default();

            let _ = events.send(UpdateEvent::UpdateStart {
                addon_id: addon_id.clone(),
            });

            let failure = match git::pull(&addon_path).await {
                Ok(()) => {
                    let _ = events.send(UpdateEvent::UpdateSuccess {
                        addon_id: addon_id.clone(),
                    });
                    None
                }
                Err(e) => {
                    let message = e.to_string();
                    let _ = events.send(UpdateEvent::UpdateError {
                        addon_id: addon_id.clone(),
                        error: message.clone(),
                    });
                    Some(format!("{}: {}", addon_id, message))
                }
            };

            let done = processed.fetch_add(1, Ordering::SeqCst) + 1;
            let _ = events.send(UpdateEvent::BatchProgress {
                processed: done,
                total,
            });

            failure
        });
    }

    let mut updated = 0;
    let mut failed = 0;
    let mut errors = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(None) => updated += 1,
            Ok(Some(error)) => {
                failed += 1;
                errors.push(error);
            }
            Err(e) => {
                // 태스크 패닉 — 해당 애드온은 실패로 집계
                failed += 1;
                errors.push(format!("update task failed: {}", e));
            }
        }
    }

    let _ = events.send(UpdateEvent::BatchComplete { updated, failed });
    tracing::info!("Batch update complete: {} updated, {} failed", updated, failed);

    Ok(UpdateSummary {
        updated,
        failed,
        errors,
    })
}

fn collect_git_addons(addons_root: &Path) -> CoreResult<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in std::fs::read_dir(addons_root)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() && git::is_git_repo(&path) {
            found.push(path);
        }
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn zero_git_addons_short_circuits() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("PlainAddon")).unwrap();

        let (tx, mut rx) = broadcast::channel(64);
        let summary = update_all(tmp.path(), &tx, None).await.unwrap();

        assert_eq!(summary.updated, 0);
        assert_eq!(summary.failed, 0);
        assert!(summary.errors.is_empty());
        // 이벤트가 하나도 나가지 않아야 함
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn failing_pulls_are_counted_and_bracketed() {
        let tmp = tempfile::tempdir().unwrap();
        for name in ["A", "B"] {
            std::fs::create_dir_all(tmp.path().join(name).join(".git")).unwrap();
        }

        let (tx, mut rx) = broadcast::channel(64);
        let summary = update_all(tmp.path(), &tx, None).await.unwrap();

        // 가짜 .git 마커라 pull은 전부 실패
        assert_eq!(summary.updated, 0);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.errors.len(), 2);

        let mut received = Vec::new();
        while let Ok(event) = rx.try_recv() {
            received.push(event);
        }
        assert!(matches!(received.first(), Some(UpdateEvent::BatchStart { total: 2 })));
        assert!(matches!(
            received.last(),
            Some(UpdateEvent::BatchComplete { updated: 0, failed: 2 })
        ));
        let progress_count = received
            .iter()
            .filter(|e| matches!(e, UpdateEvent::BatchProgress { .. }))
            .count();
        assert_eq!(progress_count, 2);
    }

    #[tokio::test]
    async fn concurrency_cap_still_completes() {
        let tmp = tempfile::tempdir().unwrap();
        for name in ["A", "B", "C"] {
            std::fs::create_dir_all(tmp.path().join(name).join(".git")).unwrap();
        }

        let (tx, _rx) = broadcast::channel(64);
        let summary = update_all(tmp.path(), &tx, Some(1)).await.unwrap();
        assert_eq!(summary.updated + summary.failed, 3);
    }

    #[test]
    fn event_wire_format() {
        let start = serde_json::to_value(UpdateEvent::UpdateStart {
            addon_id: "pfUI".to_string(),
        })
        .unwrap();
        assert_eq!(start["type"], "update-start");
        assert_eq!(start["addonId"], "pfUI");

        let progress = serde_json::to_value(UpdateEvent::BatchProgress {
            processed: 1,
            total: 3,
        })
        .unwrap();
        assert_eq!(progress["type"], "batch-progress");
        assert_eq!(progress["processed"], 1);
        assert_eq!(progress["total"], 3);
    }
}

//! git 프리미티브
//!
//! 애드온 저장소 관리에 필요한 git 연산을 `git` 바이너리를 직접 띄워서
//! 수행합니다. clone/pull/fetch 실패는 Network, 로컬 연산 실패는 Git으로
//! 태깅 — 실패 지점에서 종류가 확정되고 이후 재분류는 없습니다.

use crate::error::{CoreError, CoreResult};
use serde::Serialize;
use std::path::Path;
use tokio::process::Command;

/// `git branch` 결과
#[derive(Debug, Clone, Serialize)]
pub struct BranchList {
    pub all: Vec<String>,
    pub current: String,
}

/// `git fetch` + behind 카운트
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCheck {
    pub has_updates: bool,
    pub behind: u32,
}

/// Windows에서 콘솔 창이 뜨지 않게 하는 플래그. 다른 플랫폼에선 no-op.
#[cfg(target_os = "windows")]
fn apply_creation_flags(cmd: &mut Command) -> &mut Command {
    use std::os::windows::process::CommandExt;
    const CREATE_NO_WINDOW: u32 = 0x08000000;
    cmd.creation_flags(CREATE_NO_WINDOW)
}

#[cfg(not(target_os = "windows"))]
fn apply_creation_flags(cmd: &mut Command) -> &mut Command {
    cmd
}

/// clone/fetch/pull처럼 리모트를 건드리는 연산인지
fn is_remote_operation(operation: &str) -> bool {
    matches!(operation, "clone" | "pull" | "fetch")
}

async fn run_git(operation: &str, args: &[&str], cwd: Option<&Path>) -> CoreResult<String> {
    let mut cmd = Command::new("git");
    apply_creation_flags(&mut cmd);
    cmd.args(args);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    let output = cmd.output().await.map_err(|e| {
        if is_remote_operation(operation) {
            CoreError::network(operation, &e)
        } else {
            CoreError::git(operation, e.to_string())
        }
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        tracing::debug!("git {} failed: {}", operation, stderr);
        return Err(if is_remote_operation(operation) {
            CoreError::network(operation, &stderr)
        } else {
            CoreError::git(operation, stderr)
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// `.git` 마커 존재 여부 — 스캐너/배치 업데이터가 git 소스 판별에 사용
pub fn is_git_repo(path: &Path) -> bool {
    path.join(".git").exists()
}

pub async fn clone(repo_url: &str, target: &Path, branch: Option<&str>) -> CoreResult<()> {
    let target_str = target.to_string_lossy();
    let mut args = vec!["clone", repo_url, target_str.as_ref()];
    if let Some(branch) = branch {
        args.push("--branch");
        args.push(branch);
    }
    run_git("clone", &args, None).await?;
    Ok(())
}

pub async fn pull(repo_path: &Path) -> CoreResult<()> {
    run_git("pull", &["pull"], Some(repo_path)).await?;
    Ok(())
}

pub async fn fetch(repo_path: &Path) -> CoreResult<()> {
    run_git("fetch", &["fetch"], Some(repo_path)).await?;
    Ok(())
}

pub async fn checkout(repo_path: &Path, branch: &str) -> CoreResult<()> {
    run_git("checkout", &["checkout", branch], Some(repo_path)).await?;
    Ok(())
}

/// 로컬 브랜치 목록 + 현재 브랜치. detached HEAD 항목은 목록에서 제외.
pub async fn branches(repo_path: &Path) -> CoreResult<BranchList> {
    let stdout = run_git("branch", &["branch"], Some(repo_path)).await?;

    let mut all = Vec::new();
    let mut current = String::new();
    for line in stdout.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let (is_current, name) = match trimmed.strip_prefix("* ") {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        if name.starts_with('(') {
            // "(HEAD detached at ...)" 등
            continue;
        }
        if is_current {
            current = name.to_string();
        }
        all.push(name.to_string());
    }

    Ok(BranchList { all, current })
}

pub async fn current_branch(repo_path: &Path) -> CoreResult<String> {
    let stdout = run_git(
        "rev-parse",
        &["rev-parse", "--abbrev-ref", "HEAD"],
        Some(repo_path),
    )
    .await?;
    Ok(stdout.trim().to_string())
}

/// 첫 번째 리모트의 fetch URL. 리모트가 없으면 NotFound가 아니라 Git 에러 —
/// 호출 측(스캐너)은 어느 쪽이든 무시하고 넘어갑니다.
pub async fn remote_url(repo_path: &Path) -> CoreResult<String> {
    let remotes = run_git("remote", &["remote"], Some(repo_path)).await?;
    let first = remotes
        .lines()
        .next()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| CoreError::git("remote", "no remote configured"))?;

    let url = run_git("remote", &["remote", "get-url", first], Some(repo_path)).await?;
    Ok(url.trim().to_string())
}

/// fetch 후 업스트림 대비 behind 커밋 수 확인
pub async fn check_updates(repo_path: &Path) -> CoreResult<UpdateCheck> {
    fetch(repo_path).await?;

    let stdout = run_git(
        "rev-list",
        &["rev-list", "--count", "HEAD..@{upstream}"],
        Some(repo_path),
    )
    .await?;

    let behind: u32 = stdout
        .trim()
        .parse()
        .map_err(|_| CoreError::git("rev-list", format!("unexpected output: {}", stdout.trim())))?;

    Ok(UpdateCheck {
        has_updates: behind > 0,
        behind,
    })
}

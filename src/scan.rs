//! 애드온 폴더 스캐너
//!
//! AddOns 루트의 1단계 하위 디렉토리를 훑으며 디스크립터를 파싱합니다.
//! 애드온은 매 스캔마다 새로 물질화되며 스캔 간 캐시는 없습니다 —
//! 정체성은 폴더 이름뿐입니다.

use crate::error::{CoreError, CoreResult};
use crate::repo_url;
use crate::toc::{self, TocDescriptor};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AddonStatus {
    Enabled,
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AddonSource {
    Git,
    Zip,
}

/// 스캔 한 건의 결과 항목. 폴더 이름이 곧 정체성입니다.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Addon {
    pub id: String,
    pub name: String,
    pub title: String,
    pub version: String,
    pub author: String,
    pub description: String,
    pub path: PathBuf,
    pub status: AddonStatus,
    pub last_updated: String,
    pub source: AddonSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interface: Option<u32>,
}

/// 루트의 각 하위 디렉토리에 대해 `<이름>.toc`(enabled) →
/// `<이름>.toc.disabled`(disabled) 순으로 탐색. 둘 다 없으면 애드온이
/// 아닌 폴더로 보고 건너뜁니다. 한 폴더의 읽기 실패가 전체 스캔을
/// 중단시키지 않습니다.
pub async fn scan(addons_root: &Path) -> CoreResult<Vec<Addon>> {
    let mut addons = Vec::new();

    for entry in std::fs::read_dir(addons_root)? {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!("Unreadable directory entry in {}: {}", addons_root.display(), e);
                continue;
            }
        };
        let addon_path = entry.path();
        if !addon_path.is_dir() {
            continue;
        }
        let folder_name = entry.file_name().to_string_lossy().to_string();

        let enabled_toc = addon_path.join(format!("{}.toc", folder_name));
        let disabled_toc = addon_path.join(format!("{}.toc.disabled", folder_name));
        let (toc_path, status) = if enabled_toc.is_file() {
            (enabled_toc, AddonStatus::Enabled)
        } else if disabled_toc.is_file() {
            (disabled_toc, AddonStatus::Disabled)
        } else {
            continue;
        };

        match read_addon(&folder_name, &addon_path, &toc_path, status).await {
            Ok(addon) => addons.push(addon),
            Err(e) => {
                tracing::warn!("Skipping addon folder {}: {}", addon_path.display(), e);
            }
        }
    }

    Ok(addons)
}

async fn read_addon(
    folder_name: &str,
    addon_path: &Path,
    toc_path: &Path,
    status: AddonStatus,
) -> CoreResult<Addon> {
    let content = std::fs::read_to_string(toc_path)?;
    let descriptor = toc::parse_toc(folder_name, &content);
    let last_updated = descriptor_mtime(toc_path);

    let mut addon = Addon {
        id: folder_name.to_string(),
        // 표시 이름은 접미사를 뗀 형태, id는 폴더 이름 그대로
        name: crate::naming::sanitize_addon_folder_name(folder_name),
        title: descriptor.title.clone(),
        version: descriptor.version.clone(),
        author: descriptor.author.clone(),
        description: descriptor.description.clone(),
        path: addon_path.to_path_buf(),
        status,
        last_updated,
        source: AddonSource::Zip,
        branch: None,
        source_url: None,
        interface: descriptor.interface,
    };

    if crate::git::is_git_repo(addon_path) {
        addon.source = AddonSource::Git;
        enrich_from_git(&mut addon, addon_path, &descriptor).await;
    }

    Ok(addon)
}

/// git 메타데이터로 보강. 어떤 하위 실패든 (리모트 없음, detached HEAD 등)
/// 필드를 비워 두는 것으로 끝나며 스캔을 실패시키지 않습니다.
async fn enrich_from_git(addon: &mut Addon, addon_path: &Path, descriptor: &TocDescriptor) {
    match crate::git::current_branch(addon_path).await {
        Ok(branch) => addon.branch = Some(branch),
        Err(e) => tracing::debug!("No branch for {}: {}", addon_path.display(), e),
    }

    match crate::git::remote_url(addon_path).await {
        Ok(url) => {
            if descriptor.author == "Unknown" {
                if let Some(owner) = repo_url::github_owner(&url) {
                    addon.author = owner;
                }
            }
            addon.source_url = Some(url);
        }
        Err(e) => tracing::debug!("No remote for {}: {}", addon_path.display(), e),
    }
}

/// 디스크립터 확장자 전환으로 활성/비활성 토글.
/// 이미 원하는 상태면 그대로 반환합니다.
pub async fn set_addon_status(addon_path: &Path, enable: bool) -> CoreResult<AddonStatus> {
    let folder_name = addon_path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .ok_or_else(|| CoreError::PathNotFound(addon_path.to_path_buf()))?;

    let enabled_toc = addon_path.join(format!("{}.toc", folder_name));
    let disabled_toc = addon_path.join(format!("{}.toc.disabled", folder_name));

    let (from, to, target) = if enable {
        (disabled_toc, enabled_toc, AddonStatus::Enabled)
    } else {
        (enabled_toc, disabled_toc, AddonStatus::Disabled)
    };

    if to.is_file() {
        return Ok(target);
    }
    if !from.is_file() {
        return Err(CoreError::PathNotFound(from));
    }

    tokio::fs::rename(&from, &to).await?;
    tracing::info!("Addon {} -> {:?}", folder_name, target);
    Ok(target)
}

/// 애드온 폴더 삭제
pub async fn delete_addon(addon_path: &Path) -> CoreResult<()> {
    if !addon_path.is_dir() {
        return Err(CoreError::PathNotFound(addon_path.to_path_buf()));
    }
    tokio::fs::remove_dir_all(addon_path).await?;
    tracing::info!("Deleted addon folder {}", addon_path.display());
    Ok(())
}

fn descriptor_mtime(toc_path: &Path) -> String {
    std::fs::metadata(toc_path)
        .and_then(|meta| meta.modified())
        .map(|mtime| chrono::DateTime::<chrono::Utc>::from(mtime).to_rfc3339())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_addon(root: &Path, name: &str, toc_content: &str, disabled: bool) {
        let dir = root.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        let ext = if disabled { "toc.disabled" } else { "toc" };
        std::fs::write(dir.join(format!("{}.{}", name, ext)), toc_content).unwrap();
    }

    #[tokio::test]
    async fn scans_enabled_and_disabled() {
        let tmp = tempfile::tempdir().unwrap();
        make_addon(tmp.path(), "AlphaUI", "## Title: Alpha\n## Version: 2.0\n", false);
        make_addon(tmp.path(), "BetaBars", "## Title: Beta\n", true);

        let addons = scan(tmp.path()).await.unwrap();
        assert_eq!(addons.len(), 2);

        let alpha = addons.iter().find(|a| a.id == "AlphaUI").unwrap();
        assert_eq!(alpha.status, AddonStatus::Enabled);
        assert_eq!(alpha.title, "Alpha");
        assert_eq!(alpha.version, "2.0");
        assert_eq!(alpha.source, AddonSource::Zip);

        let beta = addons.iter().find(|a| a.id == "BetaBars").unwrap();
        assert_eq!(beta.status, AddonStatus::Disabled);
    }

    #[tokio::test]
    async fn skips_folders_without_descriptor() {
        let tmp = tempfile::tempdir().unwrap();
        make_addon(tmp.path(), "Real", "## Title: Real\n", false);
        std::fs::create_dir(tmp.path().join("NotAnAddon")).unwrap();
        std::fs::write(tmp.path().join("loose-file.txt"), "x").unwrap();

        let addons = scan(tmp.path()).await.unwrap();
        assert_eq!(addons.len(), 1);
        assert_eq!(addons[0].id, "Real");
    }

    #[tokio::test]
    async fn git_marker_degrades_gracefully() {
        let tmp = tempfile::tempdir().unwrap();
        make_addon(tmp.path(), "GitAddon", "## Title: G\n", false);
        // 진짜 저장소가 아닌 .git 마커 — 브랜치/리모트 조회는 실패해야 하고,
        // 스캔은 그래도 성공해야 함
        std::fs::create_dir(tmp.path().join("GitAddon").join(".git")).unwrap();

        let addons = scan(tmp.path()).await.unwrap();
        assert_eq!(addons.len(), 1);
        assert_eq!(addons[0].source, AddonSource::Git);
        assert_eq!(addons[0].branch, None);
        assert_eq!(addons[0].source_url, None);
    }

    #[tokio::test]
    async fn display_name_strips_suffix_but_id_does_not() {
        let tmp = tempfile::tempdir().unwrap();
        make_addon(tmp.path(), "pfUI-dev", "## Title: pfUI\n", false);

        let addons = scan(tmp.path()).await.unwrap();
        assert_eq!(addons[0].id, "pfUI-dev");
        assert_eq!(addons[0].name, "pfUI");
    }

    #[tokio::test]
    async fn scan_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        make_addon(tmp.path(), "One", "## Title: 1\n", false);
        make_addon(tmp.path(), "Two", "## Title: 2\n", true);

        let mut first: Vec<String> = scan(tmp.path()).await.unwrap().into_iter().map(|a| a.id).collect();
        let mut second: Vec<String> = scan(tmp.path()).await.unwrap().into_iter().map(|a| a.id).collect();
        first.sort();
        second.sort();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn toggle_renames_descriptor_both_ways() {
        let tmp = tempfile::tempdir().unwrap();
        make_addon(tmp.path(), "Toggler", "## Title: T\n", false);
        let addon_path = tmp.path().join("Toggler");

        let status = set_addon_status(&addon_path, false).await.unwrap();
        assert_eq!(status, AddonStatus::Disabled);
        assert!(addon_path.join("Toggler.toc.disabled").is_file());
        assert!(!addon_path.join("Toggler.toc").exists());

        // 같은 상태로 다시 토글해도 no-op
        let status = set_addon_status(&addon_path, false).await.unwrap();
        assert_eq!(status, AddonStatus::Disabled);

        let status = set_addon_status(&addon_path, true).await.unwrap();
        assert_eq!(status, AddonStatus::Enabled);
        assert!(addon_path.join("Toggler.toc").is_file());
    }

    #[tokio::test]
    async fn toggle_without_descriptor_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("Empty")).unwrap();
        let err = set_addon_status(&tmp.path().join("Empty"), true)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn delete_removes_folder() {
        let tmp = tempfile::tempdir().unwrap();
        make_addon(tmp.path(), "Doomed", "## Title: D\n", false);
        delete_addon(&tmp.path().join("Doomed")).await.unwrap();
        assert!(!tmp.path().join("Doomed").exists());

        let err = delete_addon(&tmp.path().join("Doomed")).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn missing_root_is_error() {
        let err = scan(Path::new("/nonexistent/addons")).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::NotFound);
    }
}

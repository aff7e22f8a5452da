//! 설치 파이프라인
//!
//! 획득(acquire) → 디스크립터 탐색(locate) → canonical name 도출 →
//! 충돌 검사 → 목적지로 이동. 임시 공간은 어느 경로로 끝나든
//! Acquisition이 정리합니다.
//!
//! 같은 canonical name을 노리는 두 설치가 동시에 "존재하지 않음" 검사를
//! 통과할 수 있는 check-then-act 경쟁이 남아 있습니다. 목적지가 이미
//! 생긴 뒤의 rename은 실패하므로 최악의 경우도 태깅된 에러로 끝납니다.

pub mod acquire;
pub mod locate;

use crate::error::{CoreError, CoreResult};
use crate::naming;
use acquire::Acquisition;
use locate::LocatedToc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// 설치 방법 — IPC 요청의 `method` 필드
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallMethod {
    Git,
    Zip,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallOutcome {
    pub addon_name: String,
    pub addon_path: PathBuf,
}

/// URL에서 설치 (git clone 또는 아카이브 다운로드)
pub async fn install_from_url(
    client: &reqwest::Client,
    url: &str,
    addons_folder: &Path,
    method: InstallMethod,
) -> CoreResult<InstallOutcome> {
    let acquisition = match method {
        InstallMethod::Git => Acquisition::clone_repo(url).await?,
        InstallMethod::Zip => Acquisition::download_archive(client, url).await?,
    };
    place_into(&acquisition, addons_folder)
}

/// 로컬 ZIP 파일에서 설치
pub async fn install_from_file(
    archive_path: &Path,
    addons_folder: &Path,
) -> CoreResult<InstallOutcome> {
    let acquisition = Acquisition::from_local_archive(archive_path)?;
    place_into(&acquisition, addons_folder)
}

/// 획득된 트리에서 디스크립터를 찾아 목적지에 배치.
/// acquisition은 호출이 끝날 때 drop되며 임시 공간을 제거합니다.
fn place_into(acquisition: &Acquisition, addons_folder: &Path) -> CoreResult<InstallOutcome> {
    let located = locate::find_toc(acquisition.root())?;
    let canonical = canonical_name(&located);

    let destination = addons_folder.join(&canonical);
    if destination.exists() {
        return Err(CoreError::AlreadyInstalled(canonical));
    }

    move_with_fallback(located.toc_dir(), &destination)?;
    tracing::info!("Installed \"{}\" → {}", canonical, destination.display());

    Ok(InstallOutcome {
        addon_name: canonical,
        addon_path: destination,
    })
}

/// canonical name 도출.
///
/// 디스크립터가 든 폴더 이름에 소스 컨트롤 접미사가 붙어 있으면 접미사를
/// 뗀 폴더 이름을, 아니면 디스크립터 파일명을 씁니다. clone된 저장소의
/// 디스크립터 폴더는 임시 디렉토리라 이름이 무의미하므로 후자가 적용됩니다.
fn canonical_name(located: &LocatedToc) -> String {
    let folder = located
        .toc_dir()
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();

    let stripped = naming::strip_suffix(&folder, naming::INSTALL_SUFFIXES);
    if stripped != folder {
        stripped
    } else {
        located.toc_name.clone()
    }
}

/// rename 시도, 디바이스 경계를 넘으면 복사 후 원본 제거로 폴백.
/// 폴백은 자동 복구라 호출자에게는 보이지 않습니다.
fn move_with_fallback(src: &Path, dest: &Path) -> CoreResult<()> {
    match fs::rename(src, dest) {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device(&e) => {
            tracing::debug!(
                "rename {} → {} crossed devices, falling back to copy",
                src.display(),
                dest.display()
            );
            copy_recursive(src, dest)?;
            fs::remove_dir_all(src)?;
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn is_cross_device(err: &io::Error) -> bool {
    // EXDEV(unix) / ERROR_NOT_SAME_DEVICE(windows)
    #[cfg(unix)]
    {
        err.raw_os_error() == Some(18)
    }
    #[cfg(windows)]
    {
        err.raw_os_error() == Some(17)
    }
    #[cfg(not(any(unix, windows)))]
    {
        let _ = err;
        false
    }
}

fn copy_recursive(src: &Path, dest: &Path) -> io::Result<()> {
    fs::create_dir_all(dest)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dest.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_recursive(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_located(tmp: &Path, folder: &str, toc: &str) -> LocatedToc {
        let dir = tmp.join(folder);
        fs::create_dir_all(&dir).unwrap();
        let toc_path = dir.join(format!("{}.toc", toc));
        fs::write(&toc_path, "").unwrap();
        LocatedToc {
            toc_path,
            toc_name: toc.to_string(),
        }
    }

    #[test]
    fn canonical_name_prefers_stripped_folder() {
        let tmp = tempfile::tempdir().unwrap();
        let located = fake_located(tmp.path(), "pfUI-master", "pfUI");
        assert_eq!(canonical_name(&located), "pfUI");

        // -trunk은 설치 테이블에만 있음
        let located = fake_located(tmp.path(), "Addon-trunk", "Whatever");
        assert_eq!(canonical_name(&located), "Addon");
    }

    #[test]
    fn canonical_name_falls_back_to_toc_name() {
        let tmp = tempfile::tempdir().unwrap();
        // clone된 저장소처럼 폴더 이름이 무의미한 경우
        let located = fake_located(tmp.path(), "repo", "RealName");
        assert_eq!(canonical_name(&located), "RealName");
    }

    #[test]
    fn move_with_fallback_renames() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        fs::create_dir(&src).unwrap();
        fs::write(src.join("file.lua"), "x").unwrap();

        let dest = tmp.path().join("dest");
        move_with_fallback(&src, &dest).unwrap();
        assert!(!src.exists());
        assert!(dest.join("file.lua").is_file());
    }

    #[test]
    fn copy_recursive_preserves_tree() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        fs::create_dir_all(src.join("sub")).unwrap();
        fs::write(src.join("a.lua"), "a").unwrap();
        fs::write(src.join("sub").join("b.lua"), "b").unwrap();

        let dest = tmp.path().join("dest");
        copy_recursive(&src, &dest).unwrap();
        assert_eq!(fs::read_to_string(dest.join("a.lua")).unwrap(), "a");
        assert_eq!(fs::read_to_string(dest.join("sub").join("b.lua")).unwrap(), "b");
    }
}

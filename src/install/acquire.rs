//! 소스 획득 — clone 또는 다운로드+압축 해제로 임시 디렉토리에
//! 애드온 파일 트리를 물질화합니다.
//!
//! 임시 디렉토리는 설치 한 건에 독점 귀속되며, `TempDir` RAII로 성공/실패
//! 어느 경로로 빠져나가든 제거가 보장됩니다. 이름에 현재 시각을 넣어
//! 동시 설치 간 충돌을 피합니다.

use crate::error::{CoreError, CoreResult};
use crate::repo_url;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// 한 번의 설치 시도 동안만 살아 있는 획득 결과
#[derive(Debug)]
pub struct Acquisition {
    /// drop 시 전체 임시 트리 제거
    _temp: TempDir,
    /// 애드온 트리의 실효 루트
    root: PathBuf,
}

impl Acquisition {
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// git clone으로 획득. `tree/<branch>` URL은 브랜치 제약 clone이 됩니다.
    pub async fn clone_repo(url: &str) -> CoreResult<Self> {
        let resolved = repo_url::parse_github_url(url);
        let temp = scratch_dir()?;
        let target = temp.path().join("repo");

        tracing::info!(
            "Cloning {} (branch: {})",
            resolved.repo_url,
            resolved.branch.as_deref().unwrap_or("default")
        );
        crate::git::clone(&resolved.repo_url, &target, resolved.branch.as_deref()).await?;

        Ok(Acquisition {
            _temp: temp,
            root: target,
        })
    }

    /// URL에서 아카이브를 내려받아 압축 해제로 획득
    pub async fn download_archive(client: &reqwest::Client, url: &str) -> CoreResult<Self> {
        let temp = scratch_dir()?;

        tracing::info!("Downloading archive: {}", url);
        let response = client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| CoreError::network("download", &e))?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| CoreError::network("download", &e))?;

        let archive_path = temp.path().join("addon.zip");
        fs::write(&archive_path, &bytes)?;

        let root = extract_into(&archive_path, temp.path())?;
        Ok(Acquisition { _temp: temp, root })
    }

    /// 로컬 ZIP 파일에서 획득 (다운로드 단계 생략)
    pub fn from_local_archive(archive_path: &Path) -> CoreResult<Self> {
        if !archive_path.is_file() {
            return Err(CoreError::PathNotFound(archive_path.to_path_buf()));
        }
        let temp = scratch_dir()?;
        let root = extract_into(archive_path, temp.path())?;
        Ok(Acquisition { _temp: temp, root })
    }
}

/// 프로세스 전역에서 유일한 임시 디렉토리.
/// 접두사에 현재 시각(ms)을 넣고, 나머지 유일성은 tempfile이 보장.
fn scratch_dir() -> CoreResult<TempDir> {
    let millis = chrono::Utc::now().timestamp_millis();
    let temp = tempfile::Builder::new()
        .prefix(&format!("zen-addon-{}-", millis))
        .tempdir()?;
    Ok(temp)
}

fn extract_into(archive_path: &Path, temp_root: &Path) -> CoreResult<PathBuf> {
    let extract_path = temp_root.join("extracted");
    fs::create_dir_all(&extract_path)?;
    extract_zip(archive_path, &extract_path)?;
    Ok(effective_root(&extract_path)?)
}

/// ZIP을 풉니다. `enclosed_name`으로 zip-slip 경로를 걸러냅니다.
fn extract_zip(archive_path: &Path, destination: &Path) -> CoreResult<()> {
    let file = File::open(archive_path)?;
    let mut archive = zip::ZipArchive::new(file)?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;

        let safe_path = match entry.enclosed_name() {
            Some(path) => path.to_owned(),
            None => continue, // 대상 밖을 가리키는 경로는 건너뜀
        };
        let output_path = destination.join(&safe_path);

        if entry.is_dir() {
            fs::create_dir_all(&output_path)?;
        } else {
            if let Some(parent) = output_path.parent() {
                if !parent.exists() {
                    fs::create_dir_all(parent)?;
                }
            }
            let mut outfile = File::create(&output_path)?;
            io::copy(&mut entry, &mut outfile)?;
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                let _ = fs::set_permissions(&output_path, fs::Permissions::from_mode(mode));
            }
        }
    }

    Ok(())
}

/// 최상위 항목이 디렉토리 하나뿐이면 그 안이 실효 루트
/// (`repo-branch/` 래퍼 아카이브 처리).
fn effective_root(extract_path: &Path) -> io::Result<PathBuf> {
    let entries: Vec<_> = fs::read_dir(extract_path)?.collect::<Result<_, _>>()?;
    if entries.len() == 1 && entries[0].path().is_dir() {
        return Ok(entries[0].path());
    }
    Ok(extract_path.to_path_buf())
}

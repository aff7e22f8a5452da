//! 획득된 트리 안에서 `.toc` 디스크립터 찾기

use crate::error::{CoreError, CoreResult};
use std::path::{Path, PathBuf};

/// 발견된 디스크립터 위치
#[derive(Debug, Clone)]
pub struct LocatedToc {
    /// `.toc` 파일 경로
    pub toc_path: PathBuf,
    /// 파일명에서 확장자를 뗀 애드온 이름
    pub toc_name: String,
}

impl LocatedToc {
    /// 디스크립터가 들어 있는 디렉토리 (설치 시 이동 대상)
    pub fn toc_dir(&self) -> &Path {
        self.toc_path.parent().unwrap_or(Path::new(""))
    }
}

/// 깊이 우선으로 첫 `.toc`를 찾습니다. 한 디렉토리 안에서는 파일을
/// 하위 디렉토리보다 먼저 봅니다.
///
/// 트리에 `.toc`가 여러 개인 경우 어느 것이 "맞는" 디스크립터인지는
/// 판단하지 않습니다 — 첫 발견이 이깁니다 (알려진 한계).
pub fn find_toc(root: &Path) -> CoreResult<LocatedToc> {
    find_toc_inner(root).ok_or_else(|| CoreError::DescriptorNotFound(root.to_path_buf()))
}

fn find_toc_inner(dir: &Path) -> Option<LocatedToc> {
    let entries = std::fs::read_dir(dir).ok()?;

    let mut subdirs = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_file() {
            if path.extension().map(|ext| ext == "toc").unwrap_or(false) {
                let toc_name = path
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().to_string())
                    .unwrap_or_default();
                return Some(LocatedToc {
                    toc_path: path,
                    toc_name,
                });
            }
        } else if path.is_dir() {
            subdirs.push(path);
        }
    }

    for sub in subdirs {
        if let Some(found) = find_toc_inner(&sub) {
            return Some(found);
        }
    }

    None
}

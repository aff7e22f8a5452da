//! 서버 프로필 주입과 클라이언트 설치 탐지
//!
//! 확장팩별 접속 파일(realmlist.wtf 또는 WTF/Config.wtf)을 찾아 읽고,
//! 접속 문자열을 기존 줄을 보존한 채 주입합니다. 클라이언트 폴더 검증과
//! 커스텀 패처 탐지도 여기서 처리합니다.

use crate::error::CoreResult;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// 지원 확장팩. 와이어 값은 클라이언트 버전 문자열입니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expansion {
    #[serde(rename = "1.12")]
    Vanilla,
    #[serde(rename = "2.4.3")]
    Tbc,
    #[serde(rename = "3.3.5")]
    Wrath,
    #[serde(rename = "4.3.4")]
    Cata,
    #[serde(rename = "5.4.8")]
    Mop,
}

impl Expansion {
    /// 5.4.8만 WTF/Config.wtf의 SET portal을 쓰고, 나머지는 realmlist.wtf
    fn uses_config_wtf(&self) -> bool {
        matches!(self, Expansion::Mop)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionFileKind {
    Realmlist,
    Config,
}

/// 탐지된 접속 파일 하나
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionFile {
    #[serde(rename = "type")]
    pub kind: ConnectionFileKind,
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_value: Option<String>,
}

/// 주입 결과: 수정된 파일과 새로 만들었거나 건너뛴 곳의 경고
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InjectionReport {
    pub modified_files: Vec<PathBuf>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatcherInfo {
    pub path: PathBuf,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WowInstall {
    /// 실행 파일을 못 찾고 AddOns 폴더만 확인된 설치에서는 생략
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executable_path: Option<PathBuf>,
    pub addons_path: PathBuf,
    /// 발견된 실행 파일명 (클라이언트 종류 구분용)
    pub version: String,
}

const WOW_EXECUTABLES: &[&str] = &["Wow.exe", "WowClassic.exe", "WowT.exe", "WowB.exe"];

/// Cata 이후 사설 서버 접속에 쓰이는 알려진 패처 실행 파일
const KNOWN_PATCHERS: &[&str] = &[
    "connection_patcher.exe",
    "WoW_Patched.exe",
    "Wow-64.exe",
    "arctium_launcher.exe",
];

/// 일반적인 설치 위치 후보
const CANDIDATE_INSTALL_PATHS: &[&str] = &[
    "C:/Program Files (x86)/World of Warcraft",
    "C:/Program Files/World of Warcraft",
    "D:/Games/World of Warcraft",
    "D:/Games/WoW",
    "C:/Games/World of Warcraft",
    "E:/Games/World of Warcraft",
];

fn locale_folder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z]{2}[A-Z]{2}$").expect("invalid locale regex"))
}

fn realmlist_value_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)set\s+realmlist\s+["']?([^"'\r\n]+)["']?"#)
            .expect("invalid realmlist regex")
    })
}

fn portal_value_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)SET\s+portal\s+["']?([^"'\r\n]*)["']?"#).expect("invalid portal regex")
    })
}

/// `set realmlist <host>` 줄에서 현재 값 추출
pub fn parse_realmlist(content: &str) -> Option<String> {
    realmlist_value_regex()
        .captures(content)
        .map(|caps| caps[1].trim().to_string())
}

/// `SET portal "<host>"` 줄에서 현재 값 추출
pub fn parse_portal(content: &str) -> Option<String> {
    portal_value_regex()
        .captures(content)
        .map(|caps| caps[1].trim().to_string())
        .filter(|value| !value.is_empty())
}

/// 지시어로 시작하는 줄을 새 줄로 치환. 없으면 끝에 추가.
/// 나머지 줄은 그대로 보존합니다.
fn rewrite_directive(content: &str, directive: &str, replacement: &str) -> String {
    let mut found = false;
    let mut lines: Vec<String> = content
        .split('\n')
        .map(|line| {
            if line.trim().to_lowercase().starts_with(directive) {
                found = true;
                replacement.to_string()
            } else {
                line.to_string()
            }
        })
        .collect();

    if !found {
        lines.push(replacement.to_string());
    }
    lines.join("\n")
}

/// realmlist.wtf 내용에 접속 문자열 주입
pub fn inject_realmlist(content: &str, connection: &str) -> String {
    rewrite_directive(
        content,
        "set realmlist",
        &format!("set realmlist {}", connection),
    )
}

/// Config.wtf 내용에 SET portal 주입
pub fn inject_portal(content: &str, connection: &str) -> String {
    rewrite_directive(
        content,
        "set portal",
        &format!("SET portal \"{}\"", connection),
    )
}

/// Data/ 아래의 로케일 폴더 목록 (예: enUS, koKR)
pub async fn get_locale_folders(wow_path: &Path) -> CoreResult<Vec<String>> {
    let data_path = wow_path.join("Data");
    let mut locales = Vec::new();

    let mut entries = tokio::fs::read_dir(&data_path).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().to_string();
        if entry.path().is_dir() && locale_folder_regex().is_match(&name) {
            locales.push(name);
        }
    }

    locales.sort();
    Ok(locales)
}

/// 확장팩에 맞는 접속 파일들을 탐지하고 현재 값을 읽어옴
pub async fn detect_connection_files(
    wow_path: &Path,
    expansion: Expansion,
) -> CoreResult<Vec<ConnectionFile>> {
    let mut files = Vec::new();

    if expansion.uses_config_wtf() {
        // Config.wtf는 아직 없어도 주입 대상이므로 항상 포함
        let config_path = wow_path.join("WTF").join("Config.wtf");
        let current_value = match tokio::fs::read_to_string(&config_path).await {
            Ok(content) => parse_portal(&content),
            Err(_) => None,
        };
        files.push(ConnectionFile {
            kind: ConnectionFileKind::Config,
            path: config_path,
            locale: None,
            current_value,
        });
        return Ok(files);
    }

    // 1.12은 루트에도 realmlist.wtf가 있을 수 있음
    if expansion == Expansion::Vanilla {
        let root_realmlist = wow_path.join("realmlist.wtf");
        if let Ok(content) = tokio::fs::read_to_string(&root_realmlist).await {
            files.push(ConnectionFile {
                kind: ConnectionFileKind::Realmlist,
                path: root_realmlist,
                locale: None,
                current_value: parse_realmlist(&content),
            });
        }
    }

    if let Ok(locales) = get_locale_folders(wow_path).await {
        for locale in locales {
            let realmlist_path = wow_path.join("Data").join(&locale).join("realmlist.wtf");
            if let Ok(content) = tokio::fs::read_to_string(&realmlist_path).await {
                files.push(ConnectionFile {
                    kind: ConnectionFileKind::Realmlist,
                    path: realmlist_path,
                    locale: Some(locale),
                    current_value: parse_realmlist(&content),
                });
            }
        }
    }

    Ok(files)
}

/// 알려진 커스텀 패처 실행 파일 탐지 (첫 발견만)
pub async fn detect_custom_patcher(wow_path: &Path) -> Option<PatcherInfo> {
    for patcher in KNOWN_PATCHERS {
        let patcher_path = wow_path.join(patcher);
        if tokio::fs::metadata(&patcher_path).await.is_ok() {
            return Some(PatcherInfo {
                path: patcher_path,
                kind: patcher.trim_end_matches(".exe").replace('_', "-"),
            });
        }
    }
    None
}

/// 접속 문자열을 확장팩에 맞는 파일 전부에 주입
pub async fn inject_server_profile(
    wow_path: &Path,
    expansion: Expansion,
    connection: &str,
) -> CoreResult<InjectionReport> {
    let mut modified_files = Vec::new();
    let mut warnings = Vec::new();

    if expansion.uses_config_wtf() {
        let wtf_path = wow_path.join("WTF");
        let config_path = wtf_path.join("Config.wtf");
        tokio::fs::create_dir_all(&wtf_path).await?;

        let content = match tokio::fs::read_to_string(&config_path).await {
            Ok(content) => content,
            Err(_) => {
                warnings.push("Created new Config.wtf".to_string());
                String::new()
            }
        };

        tokio::fs::write(&config_path, inject_portal(&content, connection)).await?;
        modified_files.push(config_path);
        return Ok(InjectionReport {
            modified_files,
            warnings,
        });
    }

    if expansion == Expansion::Vanilla {
        let root_realmlist = wow_path.join("realmlist.wtf");
        let content = match tokio::fs::read_to_string(&root_realmlist).await {
            Ok(content) => content,
            Err(_) => {
                warnings.push("Created new realmlist.wtf in root".to_string());
                String::new()
            }
        };
        tokio::fs::write(&root_realmlist, inject_realmlist(&content, connection)).await?;
        modified_files.push(root_realmlist);
    }

    // 로케일 폴더 전부에 기록
    match get_locale_folders(wow_path).await {
        Ok(locales) => {
            for locale in locales {
                let realmlist_path = wow_path.join("Data").join(&locale).join("realmlist.wtf");
                let content = match tokio::fs::read_to_string(&realmlist_path).await {
                    Ok(content) => content,
                    Err(_) => {
                        warnings.push(format!("Created new realmlist.wtf in {}", locale));
                        String::new()
                    }
                };
                tokio::fs::write(&realmlist_path, inject_realmlist(&content, connection)).await?;
                modified_files.push(realmlist_path);
            }
        }
        Err(e) => {
            warnings.push(format!("Could not access Data folder: {}", e));
        }
    }

    Ok(InjectionReport {
        modified_files,
        warnings,
    })
}

/// 폴더에 WoW 실행 파일이 있는지 검증
pub async fn validate_wow_path(folder: &Path) -> Option<WowInstall> {
    for exe in WOW_EXECUTABLES {
        let exe_path = folder.join(exe);
        if tokio::fs::metadata(&exe_path).await.is_ok() {
            return Some(WowInstall {
                executable_path: Some(exe_path),
                addons_path: folder.join("Interface").join("AddOns"),
                version: exe.to_string(),
            });
        }
    }
    None
}

/// 일반적인 설치 위치를 훑어 첫 번째 WoW 설치를 찾음
pub async fn auto_detect_wow_folder() -> Option<WowInstall> {
    for base in CANDIDATE_INSTALL_PATHS {
        let base_path = Path::new(base);
        let addons_path = base_path.join("Interface").join("AddOns");
        if tokio::fs::metadata(&addons_path).await.is_err() {
            continue;
        }

        if let Some(install) = validate_wow_path(base_path).await {
            return Some(install);
        }
        // 실행 파일이 없어도 AddOns 폴더만으로 유효한 설치로 취급
        return Some(WowInstall {
            executable_path: None,
            addons_path,
            version: String::new(),
        });
    }
    None
}

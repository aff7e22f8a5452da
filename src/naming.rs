//! 폴더 이름 정리
//!
//! GitHub 아카이브/브랜치명이 붙은 폴더(`pfUI-master` 등)에서 canonical
//! 애드온 이름을 끌어냅니다. 설치 경로와 표시 경로는 서로 다른 접미사
//! 테이블을 쓰며(`-trunk` vs `-dev`), 두 테이블 모두 설정 데이터로
//! 유지합니다. 대소문자 무시, 테이블 순서대로 첫 매치만, 최대 한 번 제거.

/// 설치 파이프라인이 쓰는 테이블
pub const INSTALL_SUFFIXES: &[&str] = &["-master", "-main", "-develop", "-trunk"];

/// 스캔/표시 계층이 쓰는 테이블
pub const DISPLAY_SUFFIXES: &[&str] = &["-master", "-main", "-develop", "-dev"];

/// `name` 끝의 접미사를 최대 하나 제거. 매치 없으면 입력 그대로.
pub fn strip_suffix(name: &str, table: &[&str]) -> String {
    let lower = name.to_lowercase();
    for suffix in table {
        if lower.ends_with(suffix) {
            return name[..name.len() - suffix.len()].to_string();
        }
    }
    name.to_string()
}

/// 표시용 테이블로 정리한 애드온 폴더 이름
pub fn sanitize_addon_folder_name(name: &str) -> String {
    strip_suffix(name, DISPLAY_SUFFIXES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_case_insensitively() {
        assert_eq!(sanitize_addon_folder_name("Addon-MASTER"), "Addon");
        assert_eq!(sanitize_addon_folder_name("Addon-Main"), "Addon");
    }

    #[test]
    fn untouched_without_suffix() {
        assert_eq!(sanitize_addon_folder_name("pfUI"), "pfUI");
    }

    #[test]
    fn idempotent() {
        let once = sanitize_addon_folder_name("Addon-master");
        assert_eq!(sanitize_addon_folder_name(&once), once);
    }

    #[test]
    fn at_most_one_suffix() {
        // 한 번만 제거 — 남은 접미사는 이름의 일부로 취급
        assert_eq!(sanitize_addon_folder_name("Addon-main-master"), "Addon-main");
    }

    #[test]
    fn tables_diverge_on_trunk_and_dev() {
        assert_eq!(strip_suffix("Addon-trunk", INSTALL_SUFFIXES), "Addon");
        assert_eq!(strip_suffix("Addon-trunk", DISPLAY_SUFFIXES), "Addon-trunk");
        assert_eq!(strip_suffix("Addon-dev", DISPLAY_SUFFIXES), "Addon");
        assert_eq!(strip_suffix("Addon-dev", INSTALL_SUFFIXES), "Addon-dev");
    }
}

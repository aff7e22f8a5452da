//! `.toc` 디스크립터 파서 + 인터페이스 버전 매핑
//!
//! 애드온 폴더의 `<이름>.toc` 파일은 `## Key: value` 형식의 라인 지향
//! 메타데이터입니다. 인식 못 하는 라인은 조용히 무시하고, 누락된 지시자는
//! 기본값으로 둡니다 — 파싱이 실패하는 경우는 없습니다.

use serde::{Deserialize, Serialize};

/// 디스크립터에서 뽑아낸 메타데이터. 파싱 후 불변.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocDescriptor {
    pub title: String,
    pub version: String,
    pub author: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interface: Option<u32>,
}

/// GitHub 저장소에서 디스크립터를 찾을 때 시도하는 파일명 변형.
/// `{repo}` 자리에 저장소 이름이 들어갑니다.
pub const TOC_FILENAME_VARIANTS: &[&str] = &[
    "{repo}.toc",
    "{repo}_Vanilla.toc",
    "{repo}_TBC.toc",
    "{repo}_Wrath.toc",
    "{repo}_Mainline.toc",
];

/// 디스크립터 텍스트를 파싱. `fallback_name`은 타이틀 기본값으로 쓰이는
/// 애드온 폴더 이름입니다.
///
/// `## X-Author:` 계열은 `## Author:`가 없을 때만 적용되는 폴백입니다.
pub fn parse_toc(fallback_name: &str, content: &str) -> TocDescriptor {
    let mut desc = TocDescriptor {
        title: fallback_name.to_string(),
        version: "Unknown".to_string(),
        author: "Unknown".to_string(),
        description: String::new(),
        interface: None,
    };

    for line in content.lines() {
        let trimmed = line.trim();

        if let Some(rest) = trimmed.strip_prefix("## Title:") {
            desc.title = rest.trim().to_string();
        } else if let Some(rest) = trimmed.strip_prefix("## Version:") {
            desc.version = rest.trim().to_string();
        } else if let Some(rest) = strip_either(trimmed, "## Author:", "## Authors:") {
            desc.author = rest.trim().to_string();
        } else if let Some(rest) = strip_either(trimmed, "## X-Author:", "## X-Authors:") {
            // X- 접두 필드는 폴백 — 이미 author가 있으면 덮어쓰지 않음
            if desc.author == "Unknown" {
                desc.author = rest.trim().to_string();
            }
        } else if let Some(rest) = trimmed.strip_prefix("## Notes:") {
            desc.description = rest.trim().to_string();
        } else if let Some(rest) = trimmed.strip_prefix("## Interface:") {
            // 최신 리테일 toc는 `110002, 110005`처럼 여러 값을 쓰므로
            // 선두 숫자 구간만 취합니다.
            let leading: String = rest
                .trim()
                .chars()
                .take_while(|c| c.is_ascii_digit())
                .collect();
            if let Ok(num) = leading.parse::<u32>() {
                desc.interface = Some(num);
            }
        }
    }

    desc
}

fn strip_either<'a>(line: &'a str, a: &str, b: &str) -> Option<&'a str> {
    line.strip_prefix(a).or_else(|| line.strip_prefix(b))
}

/// 인터페이스 번호 → 호환 게임 버전 라벨.
/// 어느 구간에도 안 들어가면 빈 목록.
pub fn map_interface_to_version(interface: u32) -> Vec<&'static str> {
    let mut versions = Vec::new();

    if (11200..20000).contains(&interface) {
        versions.push("1.12");
    }
    if (20400..30000).contains(&interface) {
        versions.push("2.4.3");
    }
    if (30300..40000).contains(&interface) {
        versions.push("3.3.5");
    }
    if (40300..50000).contains(&interface) {
        versions.push("4.3.4");
    }
    if (50400..100000).contains(&interface) {
        versions.push("5.4.8");
    }
    if interface >= 110000 {
        versions.push("retail");
        versions.push("classic");
    }

    versions
}

/// 저장소 이름에 대한 디스크립터 파일명 후보 목록
pub fn toc_filename_candidates(repo: &str) -> Vec<String> {
    TOC_FILENAME_VARIANTS
        .iter()
        .map(|pattern| pattern.replace("{repo}", repo))
        .collect()
}

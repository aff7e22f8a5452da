//! GitHub URL 정규화
//!
//! 사용자가 붙여넣는 URL은 `tree/<branch>` 경로, `.git` 접미사 유무 등
//! 형태가 제각각입니다. clone 가능한 URL + 선택적 브랜치로 정규화하되,
//! GitHub가 아닌 git 호스트 URL은 그대로 통과시킵니다. 절대 실패하지 않음.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedRepo {
    pub repo_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

fn tree_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"github\.com/([^/]+)/([^/]+)/tree/([^/]+)").expect("invalid tree regex")
    })
}

fn repo_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"github\.com/([^/]+)/([^/]+?)(\.git)?$").expect("invalid repo regex")
    })
}

/// GitHub URL → clone URL + 브랜치.
///
/// 1. `.../tree/<branch>` 형태면 브랜치 캡처
/// 2. `owner/repo`(`.git` 유무 무관)면 `.git` 붙인 clone URL
/// 3. 그 외에는 입력을 그대로 repo_url로 반환
pub fn parse_github_url(url: &str) -> ResolvedRepo {
    if let Some(caps) = tree_re().captures(url) {
        return ResolvedRepo {
            repo_url: format!("https://github.com/{}/{}.git", &caps[1], &caps[2]),
            branch: Some(caps[3].to_string()),
        };
    }

    if let Some(caps) = repo_re().captures(url) {
        return ResolvedRepo {
            repo_url: format!("https://github.com/{}/{}.git", &caps[1], &caps[2]),
            branch: None,
        };
    }

    ResolvedRepo {
        repo_url: url.to_string(),
        branch: None,
    }
}

/// 리모트 URL에서 GitHub owner 추출 (https/ssh 둘 다).
/// 스캐너가 author 폴백으로 사용합니다.
pub fn github_owner(remote_url: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"github\.com[:/]([^/]+)/").expect("invalid owner regex"));
    re.captures(remote_url).map(|caps| caps[1].to_string())
}

//! GitHub 저장소 검색 클라이언트
//!
//! GitHub Search API로 애드온 저장소를 카테고리별 토픽 질의로 찾고,
//! 상위 결과의 .toc 파일을 contents API로 받아 호환 버전을 붙입니다.

use crate::toc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tokio::task::JoinSet;

const USER_AGENT: &str = "ZenAddonsManager";
const PER_QUERY_LIMIT: u32 = 15;
const MAX_RESULTS: usize = 30;

/// 검색 카테고리. 각 카테고리는 여러 토픽 질의로 확장됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchCategory {
    All,
    Addon,
    Weakauras,
    Plater,
    Elvui,
}

impl Default for SearchCategory {
    fn default() -> Self {
        SearchCategory::All
    }
}

impl SearchCategory {
    /// 사용자 질의를 카테고리별 검색 질의 목록으로 확장
    fn queries(&self, query: &str) -> Vec<String> {
        match self {
            SearchCategory::Weakauras => vec![
                format!("{} topic:weakauras", query),
                format!("{} topic:weak-auras", query),
                format!("{} \"WeakAuras\"", query),
            ],
            SearchCategory::Plater => vec![
                format!("{} topic:plater", query),
                format!("{} topic:plater-profile", query),
                format!("{} \"Plater Nameplates\"", query),
            ],
            SearchCategory::Elvui => vec![
                format!("{} topic:elvui", query),
                format!("{} topic:elvui-plugin", query),
                format!("{} \"ElvUI\"", query),
            ],
            SearchCategory::Addon | SearchCategory::All => vec![
                format!("{} topic:wow-addon language:lua", query),
                format!("{} topic:world-of-warcraft language:lua", query),
                format!("{} topic:warcraft language:lua", query),
                format!("{} language:lua wow", query),
            ],
        }
    }
}

/// Search API 응답 (필요한 필드만)
#[derive(Debug, Clone, Deserialize)]
struct SearchPage {
    items: Vec<SearchItem>,
}

#[derive(Debug, Clone, Deserialize)]
struct SearchItem {
    name: String,
    full_name: String,
    description: Option<String>,
    clone_url: String,
    stargazers_count: u64,
    owner: SearchOwner,
    updated_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct SearchOwner {
    login: String,
}

/// 클라이언트에 내려주는 검색 결과 한 건
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    /// clone에 바로 쓸 수 있는 URL
    pub url: String,
    pub stars: u64,
    pub author: String,
    pub updated_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interface: Option<u32>,
    #[serde(rename = "compatibleVersions")]
    pub compatible_versions: Vec<&'static str>,
}

impl From<SearchItem> for SearchResult {
    fn from(item: SearchItem) -> Self {
        SearchResult {
            name: item.name,
            full_name: item.full_name,
            description: item.description,
            url: item.clone_url,
            stars: item.stargazers_count,
            author: item.owner.login,
            updated_at: item.updated_at,
            interface: None,
            compatible_versions: Vec::new(),
        }
    }
}

/// GitHub API 클라이언트
#[derive(Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    /// API 베이스 URL (기본: "https://api.github.com")
    /// 로컬 mock 서버 테스트 시 "http://127.0.0.1:9876" 등으로 오버라이드
    base_url: String,
}

impl GitHubClient {
    pub fn new() -> Self {
        Self::with_base_url(None)
    }

    /// base_url을 오버라이드할 수 있는 생성자 (테스트/mock 서버용)
    pub fn with_base_url(base_url: Option<&str>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client for GitHub search");

        Self {
            http,
            base_url: base_url
                .filter(|s| !s.trim().is_empty())
                .unwrap_or("https://api.github.com")
                .trim_end_matches('/')
                .to_string(),
        }
    }

    /// 저장소 검색: 카테고리 질의를 병렬 실행 → full_name으로 중복 제거 →
    /// 별 수 내림차순 상위 30건 → 각 결과의 .toc에서 호환 버전 조회
    pub async fn search(&self, query: &str, category: SearchCategory) -> Vec<SearchResult> {
        let mut pages = JoinSet::new();
        for search_query in category.queries(query) {
            let client = self.clone();
            pages.spawn(async move {
                match client.fetch_search_page(&search_query).await {
                    Ok(items) => items,
                    Err(e) => {
                        tracing::warn!("Search failed for '{}': {}", search_query, e);
                        Vec::new()
                    }
                }
            });
        }

        let mut collected: Vec<Vec<SearchItem>> = Vec::new();
        while let Some(joined) = pages.join_next().await {
            if let Ok(items) = joined {
                collected.push(items);
            }
        }

        let mut results = merge_results(collected);
        self.attach_toc_info(&mut results).await;
        results
    }

    async fn fetch_search_page(&self, query: &str) -> anyhow::Result<Vec<SearchItem>> {
        let url = format!("{}/search/repositories", self.base_url);
        let per_page = PER_QUERY_LIMIT.to_string();
        let response = self
            .http
            .get(&url)
            .query(&[
                ("q", query),
                ("sort", "stars"),
                ("order", "desc"),
                ("per_page", per_page.as_str()),
            ])
            .header("Accept", "application/vnd.github.v3+json")
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("GitHub API error ({})", response.status());
        }

        let page: SearchPage = response.json().await?;
        Ok(page.items)
    }

    /// 각 결과의 저장소 루트에서 .toc 후보 파일을 찾아 interface를 읽음.
    /// 실패한 결과는 호환 버전 없이 그대로 둡니다.
    async fn attach_toc_info(&self, results: &mut [SearchResult]) {
        let mut lookups = JoinSet::new();
        for (index, result) in results.iter().enumerate() {
            let client = self.clone();
            let author = result.author.clone();
            let repo = result.name.clone();
            lookups.spawn(async move {
                let interface = client.fetch_toc_interface(&author, &repo).await;
                (index, interface)
            });
        }

        while let Some(joined) = lookups.join_next().await {
            if let Ok((index, Some(interface))) = joined {
                results[index].interface = Some(interface);
                results[index].compatible_versions = toc::map_interface_to_version(interface);
            }
        }
    }

    /// .toc 후보 파일을 순서대로 시도해 첫 Interface 값을 반환
    async fn fetch_toc_interface(&self, owner: &str, repo: &str) -> Option<u32> {
        for filename in toc::toc_filename_candidates(repo) {
            let url = format!(
                "{}/repos/{}/{}/contents/{}",
                self.base_url, owner, repo, filename
            );
            let response = self
                .http
                .get(&url)
                .header("Accept", "application/vnd.github.v3.raw")
                .send()
                .await;

            let content = match response {
                Ok(resp) if resp.status().is_success() => match resp.text().await {
                    Ok(text) => text,
                    Err(_) => continue,
                },
                _ => continue,
            };

            let descriptor = toc::parse_toc(repo, &content);
            if let Some(interface) = descriptor.interface {
                return Some(interface);
            }
        }
        None
    }
}

/// 검색 페이지들을 합쳐 full_name으로 중복 제거, 별 수 내림차순 상위 30건
fn merge_results(pages: Vec<Vec<SearchItem>>) -> Vec<SearchResult> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut merged: Vec<SearchResult> = Vec::new();

    for items in pages {
        for item in items {
            if seen.insert(item.full_name.clone()) {
                merged.push(item.into());
            }
        }
    }

    merged.sort_by(|a, b| b.stars.cmp(&a.stars));
    merged.truncate(MAX_RESULTS);
    merged
}

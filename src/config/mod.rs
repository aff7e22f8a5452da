use serde::Deserialize;

#[derive(Deserialize, Debug, Clone, Default)]
pub struct GlobalConfig {
    /// IPC 리슨 주소 (기본: 127.0.0.1:57474)
    pub listen_addr: Option<String>,
    /// 배치 업데이트 동시 pull 상한 (기본: 제한 없음)
    pub update_concurrency: Option<usize>,
    /// GitHub API 베이스 URL 오버라이드 (mock 서버 테스트용)
    pub github_api_base: Option<String>,
}

impl GlobalConfig {
    /// config/zen.toml 로드. 파일이 없거나 깨져 있으면 기본값으로 동작.
    pub fn load() -> anyhow::Result<Self> {
        let s = std::fs::read_to_string("config/zen.toml").unwrap_or_default();
        let cfg: Self = toml::from_str(&s).unwrap_or_default();
        Ok(cfg)
    }
}

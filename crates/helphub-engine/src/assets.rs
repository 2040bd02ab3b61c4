use std::path::PathBuf;

use async_trait::async_trait;

use helphub_shared::{MedalTier, SeasonId};

/// Maps a (season, tier) pair to an optional icon reference.
#[async_trait]
pub trait MedalIconResolver: Send + Sync {
    async fn resolve(&self, season: &SeasonId, tier: MedalTier) -> Option<String>;
}

/// Looks for `<dir>/medals/<season>/<tier>.png` and, when present, returns
/// the same relative path under a public URL prefix.
pub struct DirectoryIconResolver {
    dir: PathBuf,
    base_url: String,
}

impl DirectoryIconResolver {
    pub fn new(dir: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl MedalIconResolver for DirectoryIconResolver {
    async fn resolve(&self, season: &SeasonId, tier: MedalTier) -> Option<String> {
        let relative = format!("medals/{season}/{tier}.png");
        let path = self.dir.join(&relative);

        match tokio::fs::try_exists(&path).await {
            Ok(true) => Some(format!("{}/{relative}", self.base_url.trim_end_matches('/'))),
            Ok(false) => None,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "medal icon lookup failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_only_existing_icons() {
        let dir = tempfile::tempdir().unwrap();
        let season: SeasonId = "2026-10".parse().unwrap();
        let medal_dir = dir.path().join("medals").join("2026-10");
        std::fs::create_dir_all(&medal_dir).unwrap();
        std::fs::write(medal_dir.join("gold.png"), b"png").unwrap();

        let resolver = DirectoryIconResolver::new(dir.path(), "https://cdn.example/assets/");
        assert_eq!(
            resolver.resolve(&season, MedalTier::Gold).await.as_deref(),
            Some("https://cdn.example/assets/medals/2026-10/gold.png")
        );
        assert_eq!(resolver.resolve(&season, MedalTier::Silver).await, None);
    }
}

//! 설정 로드.
//!
//! 기본값 → 설정 파일 → `PINGDECK_*` 환경변수 순으로 겹쳐 읽는다.
//! 파일 경로를 지정하지 않으면 플랫폼별 설정 디렉토리의 `config.toml`을 찾는다 (없어도 됨).

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use directories::ProjectDirs;
use pingdeck_core::config::AppConfig;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 설정 파일 이름
const CONFIG_FILE_NAME: &str = "config.toml";

/// 환경변수 접두사 (예: `PINGDECK_SERVER__BASE_URL`)
const ENV_PREFIX: &str = "PINGDECK";

/// 플랫폼별 기본 설정 파일 경로
///
/// - macOS: `~/Library/Application Support/dev.pingdeck.pingdeck/config.toml`
/// - Linux: `~/.config/pingdeck/config.toml`
/// - Windows: `%APPDATA%\pingdeck\pingdeck\config\config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("dev", "pingdeck", "pingdeck").map(|p| p.config_dir().join(CONFIG_FILE_NAME))
}

/// 설정 로드
///
/// `path`가 주어지면 반드시 존재해야 하고, 기본 경로는 선택 사항이다.
pub fn load(path: Option<&Path>) -> Result<AppConfig> {
    let defaults = Config::try_from(&AppConfig::default_config())
        .context("기본 설정 직렬화 실패")?;
    let mut builder = Config::builder().add_source(defaults);

    match path {
        Some(path) => {
            info!("설정 파일: {}", path.display());
            builder = builder.add_source(File::from(path).required(true));
        }
        None => {
            if let Some(path) = default_config_path() {
                debug!("기본 설정 파일 확인: {}", path.display());
                builder = builder.add_source(File::from(path).required(false));
            }
        }
    }

    let config: AppConfig = builder
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        )
        .build()
        .context("설정 로드 실패")?
        .try_deserialize()
        .context("설정 형식 오류")?;
    Ok(config)
}

//! tracing 구독자 초기화.
//!
//! `[logging]` 설정 섹션이 필터, 출력 형식, 대상 표시, span 이벤트를 결정합니다.
//! 토큰, 비밀번호, 해시는 어떤 형식에서도 기록하지 않습니다.

use serde::Deserialize;
use thiserror::Error;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::{SubscriberInitExt, TryInitError},
    EnvFilter, Layer, Registry,
};

/// 로그 출력 형식.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// 개발용
    #[default]
    Pretty,
    /// 로그 수집기용
    Json,
    /// 한 줄 형식
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            "compact" => Ok(Self::Compact),
            _ => Err(format!("알 수 없는 로그 형식: {}", s)),
        }
    }
}

/// `[logging]` 설정 섹션.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// `RUST_LOG`가 없을 때 사용하는 필터 (예: "info,rbac_service=debug")
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
    /// 이벤트에 모듈 경로 표시
    #[serde(default = "default_with_target")]
    pub with_target: bool,
    /// 서비스 span의 시작/종료 기록
    #[serde(default)]
    pub span_events: bool,
}

fn default_with_target() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            with_target: default_with_target(),
            span_events: false,
        }
    }
}

impl LoggingConfig {
    /// `RUST_LOG`, `LOG_FORMAT` 환경 변수로 구성합니다. 설정 파일이 없는 명령에서 사용합니다.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(level) = std::env::var("RUST_LOG") {
            config.level = level;
        }
        if let Some(format) = std::env::var("LOG_FORMAT").ok().and_then(|s| s.parse().ok()) {
            config.format = format;
        }
        config
    }

    fn span_events(&self) -> FmtSpan {
        if self.span_events {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        }
    }

    fn fmt_layer(&self) -> Box<dyn Layer<Registry> + Send + Sync> {
        let base = fmt::layer()
            .with_target(self.with_target)
            .with_span_events(self.span_events());

        match self.format {
            LogFormat::Pretty => base.pretty().boxed(),
            LogFormat::Json => base.json().boxed(),
            LogFormat::Compact => base.compact().boxed(),
        }
    }
}

/// 로깅 초기화 실패.
#[derive(Debug, Error)]
pub enum LogInitError {
    #[error("잘못된 로그 필터: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),

    #[error("전역 구독자 설치 실패: {0}")]
    Install(#[from] TryInitError),
}

/// 전역 구독자를 설치합니다. `RUST_LOG`가 있으면 `level`보다 우선합니다.
pub fn init_logging(config: &LoggingConfig) -> Result<(), LogInitError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)?,
    };

    tracing_subscriber::registry()
        .with(config.fmt_layer().with_filter(filter))
        .try_init()?;

    tracing::debug!(format = ?config.format, level = %config.level, "Logging initialized");
    Ok(())
}

/// 환경 변수만으로 로깅을 초기화합니다.
pub fn init_logging_from_env() -> Result<(), LogInitError> {
    init_logging(&LoggingConfig::from_env())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parsing() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("Compact".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_logging_section_defaults() {
        let config: LoggingConfig = serde_json::from_str(r#"{"level": "warn"}"#).unwrap();
        assert_eq!(config.level, "warn");
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(config.with_target);
        assert!(!config.span_events);
        assert_eq!(config.span_events(), FmtSpan::NONE);
    }

    #[test]
    fn test_logging_section_flags() {
        let config: LoggingConfig = serde_json::from_str(
            r#"{"level": "debug", "format": "json", "with_target": false, "span_events": true}"#,
        )
        .unwrap();
        assert_eq!(config.format, LogFormat::Json);
        assert!(!config.with_target);
        assert_eq!(config.span_events(), FmtSpan::NEW | FmtSpan::CLOSE);

        let unknown = serde_json::from_str::<LoggingConfig>(r#"{"level": "info", "format": "xml"}"#);
        assert!(unknown.is_err());
    }

    #[test]
    fn test_invalid_filter_is_reported() {
        let config = LoggingConfig {
            level: "rbac=verbose".to_string(),
            ..Default::default()
        };
        // RUST_LOG가 설정된 환경에서는 파일 값이 무시됨
        if std::env::var("RUST_LOG").is_err() {
            assert!(matches!(init_logging(&config), Err(LogInitError::Filter(_))));
        }
    }
}

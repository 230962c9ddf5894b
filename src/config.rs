use crate::engine::{EngineEvent, PollSettings, PromptBridge, expand_with};
use crate::error::ConfigError;
use crate::prompter::{BridgePrompter, DefaultPrompter, SharedPrompter};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

/// 설정 파일 경로를 지정하는 환경 변수이다.
pub const CONFIG_ENV: &str = "SCENARIO_CONFIG";

/// 입력 Step 응답 방식이다.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PromptMode {
    /// 터미널에서 사용자에게 묻는다.
    #[default]
    Terminal,
    /// 묻지 않고 기본 응답을 사용한다.
    Defaults,
}

impl std::str::FromStr for PromptMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "terminal" => Ok(PromptMode::Terminal),
            "defaults" => Ok(PromptMode::Defaults),
            other => Err(ConfigError::InvalidValue {
                field: "prompt_mode",
                value: other.to_string(),
            }),
        }
    }
}

/// Step 내부 폴링 기본 설정이다.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PollConfig {
    /// 시도 사이 대기 시간(밀리초).
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// 최대 시도 횟수.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl PollConfig {
    pub fn settings(&self) -> PollSettings {
        PollSettings {
            interval: Duration::from_millis(self.interval_ms),
            max_attempts: self.max_attempts,
        }
    }
}

/// 시나리오 실행기 설정이다.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunnerConfig {
    /// 단계 사이 상태를 저장할 파일 경로. `${ENV}` 플레이스홀더를 지원한다.
    #[serde(default = "default_state_file")]
    pub state_file: String,
    /// 입력 응답 방식.
    #[serde(default)]
    pub prompt_mode: PromptMode,
    /// 모든 확인 요청에 예로 응답할지 여부.
    #[serde(default)]
    pub confirm_all: bool,
    /// Output 머리글 구분선 길이.
    #[serde(default = "default_header_width")]
    pub header_width: usize,
    /// 폴링 설정.
    #[serde(default)]
    pub poll: PollConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            state_file: default_state_file(),
            prompt_mode: PromptMode::default(),
            confirm_all: false,
            header_width: default_header_width(),
            poll: PollConfig::default(),
        }
    }
}

impl RunnerConfig {
    /// 환경 변수 값으로 설정을 덮어쓴다.
    ///
    /// - `SCENARIO_STATE_FILE`: 상태 파일 경로.
    /// - `SCENARIO_CONFIRM_ALL`: `1`/`true`/`yes`이면 모든 확인에 예로 응답.
    /// - `SCENARIO_PROMPT_MODE`: `terminal` 또는 `defaults`.
    pub fn apply_env_overrides(mut self) -> Result<Self, ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(self)
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("SCENARIO_STATE_FILE") {
            self.state_file = path;
        }
        if let Some(flag) = lookup("SCENARIO_CONFIRM_ALL") {
            self.confirm_all = matches!(
                flag.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes"
            );
        }
        if let Some(mode) = lookup("SCENARIO_PROMPT_MODE") {
            self.prompt_mode = mode.parse()?;
        }
        Ok(())
    }

    /// 플레이스홀더를 환경 변수로 치환한 상태 파일 경로를 반환한다.
    pub fn state_path(&self) -> Result<PathBuf, ConfigError> {
        expand_with(&self.state_file, |key| std::env::var(key).ok())
            .map(PathBuf::from)
            .map_err(|err| ConfigError::Placeholder(format!("state_file: {err}")))
    }

    /// 사용자에게 직접 묻는 설정인지 여부.
    pub fn is_interactive(&self) -> bool {
        self.prompt_mode == PromptMode::Terminal && !self.confirm_all
    }

    /// 설정에 맞는 Prompter를 생성한다.
    ///
    /// 대화형이면 입력 요청을 이벤트로 내보내 콘솔이 응답하게 하고,
    /// 아니면 기본 응답으로 진행한다.
    pub fn build_prompter(
        &self,
        bridge: &PromptBridge,
        events: &UnboundedSender<EngineEvent>,
    ) -> SharedPrompter {
        if self.is_interactive() {
            Arc::new(BridgePrompter::new(bridge.clone(), events.clone()))
        } else {
            Arc::new(DefaultPrompter::new(self.confirm_all))
        }
    }
}

fn default_state_file() -> String {
    "state/scenario-state.yaml".to_string()
}

fn default_header_width() -> usize {
    80
}

fn default_interval_ms() -> u64 {
    1000
}

fn default_max_attempts() -> u32 {
    30
}

/// YAML 파일을 읽어 RunnerConfig로 역직렬화한다.
pub fn load_config_from_file(path: &Path) -> Result<RunnerConfig, ConfigError> {
    let mut file = File::open(path)?;
    load_config_from_reader(&mut file)
}

/// Reader에서 YAML을 읽어 RunnerConfig 구조체로 파싱한다.
pub fn load_config_from_reader<R: Read>(reader: &mut R) -> Result<RunnerConfig, ConfigError> {
    let mut buf = String::new();
    reader.read_to_string(&mut buf)?;
    if buf.trim().is_empty() {
        return Ok(RunnerConfig::default());
    }
    let config: RunnerConfig = serde_yaml::from_str(&buf)?;
    Ok(config)
}

use crate::engine::State;

/// 시나리오 구성 및 실행 중 발생 가능한 오류를 표현한다.
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    /// Step 이름이 중복된 경우이다.
    #[error("중복된 Step 이름이 존재합니다: {0}")]
    DuplicateStep(String),
    /// Step 이름이 비어 있는 경우이다.
    #[error("Step 이름이 비어 있습니다. (위치: {index})")]
    EmptyStepName { index: usize },
    /// 치명적 오류로 실행이 중단된 경우이다.
    #[error("Step '{step}' 실행 중 치명적 오류로 시나리오가 중단되었습니다: {source:#}")]
    Aborted {
        step: String,
        #[source]
        source: anyhow::Error,
        /// 중단 시점의 상태이다.
        state: Box<State>,
    },
    /// 사용자 입력을 받을 수 없는 경우이다.
    #[error("Step '{step}' 입력 처리 실패: {source:#}")]
    Prompt {
        step: String,
        #[source]
        source: anyhow::Error,
        state: Box<State>,
    },
}

impl ScenarioError {
    /// 중단 시점의 상태가 있으면 반환한다.
    pub fn state(&self) -> Option<&State> {
        match self {
            ScenarioError::Aborted { state, .. } | ScenarioError::Prompt { state, .. } => {
                Some(state)
            }
            _ => None,
        }
    }
}

/// State 접근과 영속화 중 발생 가능한 오류를 표현한다.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// 필수 키가 존재하지 않는 경우이다.
    #[error("상태 키가 존재하지 않습니다: {0}")]
    MissingKey(String),
    /// 값을 요청한 타입으로 변환할 수 없는 경우이다.
    #[error("상태 키 '{key}' 값을 변환할 수 없습니다: {source}")]
    Convert {
        key: String,
        #[source]
        source: serde_yaml::Error,
    },
    /// 상태 파일 입출력 오류이다.
    #[error("상태 파일 입출력 실패: {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 상태 파일 직렬화/역직렬화 오류이다.
    #[error("상태 파일 형식 오류: {path}")]
    Format {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// 폴링 헬퍼에서 발생하는 오류이다.
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    /// 최대 시도 횟수 안에 완료 상태에 도달하지 못했다.
    #[error("{attempts}회 폴링 후에도 완료되지 않았습니다.")]
    Exhausted { attempts: u32 },
}

/// 설정 파일 로딩 오류이다.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("설정 파일을 읽을 수 없습니다: {0}")]
    Io(#[from] std::io::Error),
    #[error("설정 파일 형식 오류: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// 알 수 없는 값이 지정된 경우이다.
    #[error("{field} 값이 올바르지 않습니다: {value}")]
    InvalidValue { field: &'static str, value: String },
    #[error("{0}")]
    Placeholder(String),
}

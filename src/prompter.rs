use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

mod bridge;
mod scripted;
mod terminal;

pub use bridge::BridgePrompter;
pub use scripted::ScriptedPrompter;
pub use terminal::TerminalPrompter;

/// Prompter는 Input Step이 사용자에게 값을 묻는 추상 계층을 정의한다.
#[async_trait]
pub trait Prompter: Send + Sync {
    /// 예/아니오 확인을 요청한다.
    async fn confirm(&self, message: &str, default: bool) -> anyhow::Result<bool>;

    /// 자유 텍스트 입력을 요청한다.
    async fn text(&self, message: &str, default: Option<&str>) -> anyhow::Result<String>;

    /// 선택지 중 하나를 고르게 하고 인덱스를 반환한다.
    async fn select(
        &self,
        message: &str,
        choices: &[String],
        default: Option<usize>,
    ) -> anyhow::Result<usize>;

    /// 선택지 중 여러 개를 고르게 하고 인덱스 목록을 반환한다.
    async fn multi_select(&self, message: &str, choices: &[String])
    -> anyhow::Result<Vec<usize>>;
}

/// Prompter를 공유하기 위한 Arc 타입 별칭이다.
pub type SharedPrompter = Arc<dyn Prompter>;

/// 입력 요청 종류이다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
    Confirm,
    Text,
    Select,
    MultiSelect,
}

/// 외부 UI로 전달되는 입력 요청 내용이다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptRequest {
    /// 요청 종류.
    pub kind: PromptKind,
    /// 사용자에게 보여줄 메시지.
    pub message: String,
    /// 선택지 목록. 선택형이 아니면 비어 있다.
    pub choices: Vec<String>,
    /// 기본 응답의 표시용 문자열.
    pub default: Option<String>,
}

/// 입력 요청에 대한 응답이다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptAnswer {
    Confirm(bool),
    Text(String),
    Select(usize),
    MultiSelect(Vec<usize>),
}

impl PromptAnswer {
    fn kind(&self) -> PromptKind {
        match self {
            PromptAnswer::Confirm(_) => PromptKind::Confirm,
            PromptAnswer::Text(_) => PromptKind::Text,
            PromptAnswer::Select(_) => PromptKind::Select,
            PromptAnswer::MultiSelect(_) => PromptKind::MultiSelect,
        }
    }

    fn mismatch(&self, expected: PromptKind) -> anyhow::Error {
        anyhow::anyhow!(
            "응답 종류가 요청과 다릅니다: 요청 {expected:?}, 응답 {:?}",
            self.kind()
        )
    }

    pub(crate) fn into_confirm(self) -> anyhow::Result<bool> {
        match self {
            PromptAnswer::Confirm(value) => Ok(value),
            other => Err(other.mismatch(PromptKind::Confirm)),
        }
    }

    pub(crate) fn into_text(self) -> anyhow::Result<String> {
        match self {
            PromptAnswer::Text(value) => Ok(value),
            other => Err(other.mismatch(PromptKind::Text)),
        }
    }

    pub(crate) fn into_select(self, choices: &[String]) -> anyhow::Result<usize> {
        match self {
            PromptAnswer::Select(index) if index < choices.len() => Ok(index),
            PromptAnswer::Select(index) => {
                anyhow::bail!(
                    "선택 인덱스 {index}가 범위를 벗어났습니다. (선택지 {}개)",
                    choices.len()
                )
            }
            other => Err(other.mismatch(PromptKind::Select)),
        }
    }

    pub(crate) fn into_multi_select(self, choices: &[String]) -> anyhow::Result<Vec<usize>> {
        match self {
            PromptAnswer::MultiSelect(indexes) => {
                if let Some(bad) = indexes.iter().find(|i| **i >= choices.len()) {
                    anyhow::bail!(
                        "선택 인덱스 {bad}가 범위를 벗어났습니다. (선택지 {}개)",
                        choices.len()
                    );
                }
                Ok(indexes)
            }
            other => Err(other.mismatch(PromptKind::MultiSelect)),
        }
    }
}

/// DefaultPrompter는 사용자 입력 없이 기본 응답으로 진행하는 구현이다.
#[derive(Debug, Default, Clone)]
pub struct DefaultPrompter {
    /// 모든 확인 요청에 예로 응답할지 여부.
    pub confirm_all: bool,
}

impl DefaultPrompter {
    pub fn new(confirm_all: bool) -> Self {
        Self { confirm_all }
    }
}

#[async_trait]
impl Prompter for DefaultPrompter {
    async fn confirm(&self, message: &str, default: bool) -> anyhow::Result<bool> {
        let answer = self.confirm_all || default;
        info!(prompt = message, answer, "기본 응답으로 확인 처리");
        Ok(answer)
    }

    async fn text(&self, message: &str, default: Option<&str>) -> anyhow::Result<String> {
        let value = default
            .ok_or_else(|| anyhow::anyhow!("기본값이 없는 입력 요청입니다: {message}"))?;
        info!(prompt = message, value, "기본 응답으로 입력 처리");
        Ok(value.to_string())
    }

    async fn select(
        &self,
        message: &str,
        choices: &[String],
        default: Option<usize>,
    ) -> anyhow::Result<usize> {
        if choices.is_empty() {
            anyhow::bail!("선택지가 비어 있습니다: {message}");
        }
        let index = default.unwrap_or(0);
        if index >= choices.len() {
            anyhow::bail!(
                "기본 선택 인덱스 {index}가 범위를 벗어났습니다. (선택지 {}개): {message}",
                choices.len()
            );
        }
        info!(prompt = message, choice = %choices[index], "기본 응답으로 선택 처리");
        Ok(index)
    }

    async fn multi_select(
        &self,
        message: &str,
        _choices: &[String],
    ) -> anyhow::Result<Vec<usize>> {
        info!(prompt = message, "기본 응답으로 다중 선택 처리 (선택 없음)");
        Ok(Vec::new())
    }
}

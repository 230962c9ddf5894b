use super::{PromptAnswer, Prompter};
use async_trait::async_trait;
use std::collections::VecDeque;
use tokio::sync::Mutex;
use tracing::debug;

/// 미리 준비한 응답을 순서대로 돌려주는 Prompter 구현이다.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    /// 남아 있는 응답 목록.
    answers: Mutex<VecDeque<PromptAnswer>>,
    /// 지금까지 받은 질문 메시지.
    asked: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn new(answers: impl IntoIterator<Item = PromptAnswer>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            asked: Mutex::new(Vec::new()),
        }
    }

    /// 지금까지 받은 질문 메시지 목록을 반환한다.
    pub async fn asked(&self) -> Vec<String> {
        self.asked.lock().await.clone()
    }

    /// 소비되지 않은 응답 수를 반환한다.
    pub async fn remaining(&self) -> usize {
        self.answers.lock().await.len()
    }

    async fn next(&self, message: &str) -> anyhow::Result<PromptAnswer> {
        self.asked.lock().await.push(message.to_string());
        let answer = self
            .answers
            .lock()
            .await
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("준비된 응답이 없습니다: {message}"))?;
        debug!(prompt = message, ?answer, "스크립트 응답 사용");
        Ok(answer)
    }
}

#[async_trait]
impl Prompter for ScriptedPrompter {
    async fn confirm(&self, message: &str, _default: bool) -> anyhow::Result<bool> {
        self.next(message).await?.into_confirm()
    }

    async fn text(&self, message: &str, _default: Option<&str>) -> anyhow::Result<String> {
        self.next(message).await?.into_text()
    }

    async fn select(
        &self,
        message: &str,
        choices: &[String],
        _default: Option<usize>,
    ) -> anyhow::Result<usize> {
        self.next(message).await?.into_select(choices)
    }

    async fn multi_select(
        &self,
        message: &str,
        choices: &[String],
    ) -> anyhow::Result<Vec<usize>> {
        self.next(message).await?.into_multi_select(choices)
    }
}

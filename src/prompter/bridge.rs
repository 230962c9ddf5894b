use super::{PromptAnswer, PromptKind, PromptRequest, Prompter};
use crate::engine::{EngineEvent, PromptBridge};
use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;

/// 입력 요청을 이벤트로 내보내고 외부 UI의 응답을 기다리는 Prompter 구현이다.
#[derive(Debug, Clone)]
pub struct BridgePrompter {
    bridge: PromptBridge,
    sender: UnboundedSender<EngineEvent>,
}

impl BridgePrompter {
    pub fn new(bridge: PromptBridge, sender: UnboundedSender<EngineEvent>) -> Self {
        Self { bridge, sender }
    }

    async fn ask(&self, request: PromptRequest) -> anyhow::Result<PromptAnswer> {
        let (request_id, rx) = self.bridge.register();
        if self
            .sender
            .send(EngineEvent::PromptRequested {
                request_id,
                request,
            })
            .is_err()
        {
            self.bridge.cancel(request_id);
            anyhow::bail!("입력 요청을 전달할 수신자가 없습니다.");
        }
        rx.await
            .map_err(|_| anyhow::anyhow!("입력 요청 {request_id}이 응답 없이 취소되었습니다."))
    }
}

#[async_trait]
impl Prompter for BridgePrompter {
    async fn confirm(&self, message: &str, default: bool) -> anyhow::Result<bool> {
        self.ask(PromptRequest {
            kind: PromptKind::Confirm,
            message: message.to_string(),
            choices: Vec::new(),
            default: Some(default.to_string()),
        })
        .await?
        .into_confirm()
    }

    async fn text(&self, message: &str, default: Option<&str>) -> anyhow::Result<String> {
        self.ask(PromptRequest {
            kind: PromptKind::Text,
            message: message.to_string(),
            choices: Vec::new(),
            default: default.map(str::to_string),
        })
        .await?
        .into_text()
    }

    async fn select(
        &self,
        message: &str,
        choices: &[String],
        default: Option<usize>,
    ) -> anyhow::Result<usize> {
        self.ask(PromptRequest {
            kind: PromptKind::Select,
            message: message.to_string(),
            choices: choices.to_vec(),
            default: default.and_then(|i| choices.get(i).cloned()),
        })
        .await?
        .into_select(choices)
    }

    async fn multi_select(
        &self,
        message: &str,
        choices: &[String],
    ) -> anyhow::Result<Vec<usize>> {
        self.ask(PromptRequest {
            kind: PromptKind::MultiSelect,
            message: message.to_string(),
            choices: choices.to_vec(),
            default: None,
        })
        .await?
        .into_multi_select(choices)
    }
}

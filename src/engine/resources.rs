use super::events::EngineEvent;
use crate::prompter::{DefaultPrompter, SharedPrompter};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

/// 기본 머리글 구분선 길이이다.
pub const DEFAULT_HEADER_WIDTH: usize = 80;

/// 엔진 실행 중 필요한 공용 협력 객체를 캡슐화한다.
#[derive(Clone)]
pub struct EngineHandles {
    /// Input Step 응답을 받을 Prompter.
    pub(crate) prompter: SharedPrompter,
    /// 이벤트 송신 채널. 없으면 이벤트를 보내지 않는다.
    pub(crate) events: Option<UnboundedSender<EngineEvent>>,
    /// Output 머리글 구분선 길이.
    pub(crate) header_width: usize,
}

impl EngineHandles {
    /// 지정한 Prompter로 핸들을 만든다.
    pub fn new(prompter: SharedPrompter) -> Self {
        Self {
            prompter,
            events: None,
            header_width: DEFAULT_HEADER_WIDTH,
        }
    }

    /// 이벤트 송신 채널을 연결한다.
    pub fn with_events(mut self, sender: UnboundedSender<EngineEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    pub fn with_header_width(mut self, width: usize) -> Self {
        self.header_width = width.max(1);
        self
    }

    pub fn prompter(&self) -> &SharedPrompter {
        &self.prompter
    }

    /// 이벤트를 전송한다. 수신자가 닫혀 있어도 실행은 계속한다.
    pub(crate) fn emit(&self, event: EngineEvent) {
        if let Some(sender) = &self.events {
            let _ = sender.send(event);
        }
    }
}

impl Default for EngineHandles {
    /// 기본 응답으로 진행하는 비대화형 핸들을 만든다.
    fn default() -> Self {
        Self::new(Arc::new(DefaultPrompter::default()))
    }
}

impl std::fmt::Debug for EngineHandles {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandles")
            .field("events", &self.events.is_some())
            .field("header_width", &self.header_width)
            .finish_non_exhaustive()
    }
}

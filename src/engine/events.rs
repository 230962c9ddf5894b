use crate::prompter::PromptRequest;

/// 엔진에서 UI로 전달되는 주요 이벤트 모델이다.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// 시나리오 시작 알림.
    ScenarioStarted { scenario: String, steps: usize },
    /// Step 시작 알림.
    StepStarted { step: String },
    /// skip 조건으로 Step을 건너뜀.
    StepSkipped { step: String },
    /// Output Step이 렌더링한 메시지.
    Output { step: String, text: String },
    /// 외부 UI에 입력을 요청한다.
    PromptRequested {
        request_id: u64,
        request: PromptRequest,
    },
    /// Step 종료 알림.
    StepFinished { step: String, success: bool },
    /// 전체 시나리오 종료.
    ScenarioFinished {
        scenario: String,
        early_exit: bool,
        errors: usize,
    },
}

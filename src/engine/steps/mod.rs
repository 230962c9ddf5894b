use super::resources::EngineHandles;
use super::runtime::StepRuntimeState;
use super::state::State;
use crate::scenario::{Step, StepKind};

mod action;
mod input;
mod output;

use action::execute_action;
use input::execute_input;
use output::execute_output;

/// Step 실행의 결과를 표현한다.
#[derive(Debug)]
pub(super) enum StepRunResult {
    /// 실행 성공.
    Success,
    /// 오류를 상태에 기록하고 계속 진행.
    Recorded(String),
}

/// 시나리오를 중단해야 하는 Step 실패이다.
#[derive(Debug)]
pub(super) enum StepAbort {
    /// 치명적 정책의 Action 실패.
    Fatal(anyhow::Error),
    /// 사용자 입력을 받을 수 없음.
    Prompt(anyhow::Error),
}

/// 단일 Step을 실행하고 결과를 반환한다.
pub(super) async fn run_single_step(
    step: &Step,
    state: &mut State,
    handles: &EngineHandles,
    runtime: &mut StepRuntimeState,
) -> Result<StepRunResult, StepAbort> {
    match step.kind() {
        StepKind::Output { message, options } => Ok(execute_output(
            step.name(),
            message,
            *options,
            state,
            handles,
            runtime,
        )),
        StepKind::Input { prompt } => execute_input(step.name(), prompt, state, handles).await,
        StepKind::Action { handler, policy } => {
            execute_action(step.name(), handler, *policy, state).await
        }
    }
}

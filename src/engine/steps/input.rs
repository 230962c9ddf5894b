use super::super::resources::EngineHandles;
use super::super::state::State;
use super::{StepAbort, StepRunResult};
use crate::scenario::Prompt;
use serde::Serialize;
use tracing::{info, warn};

/// Input Step을 실행하고 응답을 `state[step_name]`에 저장한다.
pub(super) async fn execute_input(
    step_name: &str,
    prompt: &Prompt,
    state: &mut State,
    handles: &EngineHandles,
) -> Result<StepRunResult, StepAbort> {
    let message = match prompt.message().render(state) {
        Ok(message) => message,
        Err(err) => {
            let text = format!("{err:#}");
            warn!(error = %text, "질문 메시지 렌더링 실패");
            state.record_error(step_name, &err);
            return Ok(StepRunResult::Recorded(text));
        }
    };
    let prompter = handles.prompter();
    match prompt {
        Prompt::Confirm {
            default,
            exit_on_decline,
            ..
        } => {
            let answer = prompter
                .confirm(&message, *default)
                .await
                .map_err(StepAbort::Prompt)?;
            store(state, step_name, answer)?;
            if !answer && *exit_on_decline {
                info!("확인이 거부되어 조기 종료를 요청합니다.");
                state.request_early_exit();
            }
        }
        Prompt::Text { default, .. } => {
            let answer = prompter
                .text(&message, default.as_deref())
                .await
                .map_err(StepAbort::Prompt)?;
            store(state, step_name, answer)?;
        }
        Prompt::Select {
            choices, default, ..
        } => {
            let index = prompter
                .select(&message, choices, *default)
                .await
                .map_err(StepAbort::Prompt)?;
            let choice = pick(choices, index)?;
            store(state, step_name, choice)?;
        }
        Prompt::MultiSelect { choices, .. } => {
            let indexes = prompter
                .multi_select(&message, choices)
                .await
                .map_err(StepAbort::Prompt)?;
            let selected = indexes
                .into_iter()
                .map(|index| pick(choices, index))
                .collect::<Result<Vec<_>, _>>()?;
            store(state, step_name, selected)?;
        }
    }
    Ok(StepRunResult::Success)
}

/// 응답 인덱스에 해당하는 선택지를 찾는다. 범위를 벗어나면 입력 실패로 본다.
fn pick(choices: &[String], index: usize) -> Result<String, StepAbort> {
    choices.get(index).cloned().ok_or_else(|| {
        StepAbort::Prompt(anyhow::anyhow!(
            "선택 인덱스 {index}가 범위를 벗어났습니다. (선택지 {}개)",
            choices.len()
        ))
    })
}

fn store<T: Serialize>(state: &mut State, key: &str, value: T) -> Result<(), StepAbort> {
    state
        .set(key, value)
        .map_err(|err| StepAbort::Fatal(err.into()))
}

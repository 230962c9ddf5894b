use super::super::events::EngineEvent;
use super::super::resources::EngineHandles;
use super::super::runtime::StepRuntimeState;
use super::super::state::State;
use super::StepRunResult;
use crate::scenario::{Message, OutputOptions};
use tracing::warn;

/// Output Step을 실행한다. 렌더링 실패는 오류 목록에 기록한다.
pub(super) fn execute_output(
    step_name: &str,
    message: &Message,
    options: OutputOptions,
    state: &mut State,
    handles: &EngineHandles,
    runtime: &mut StepRuntimeState,
) -> StepRunResult {
    match message.render(state) {
        Ok(text) => {
            let text = render_output(&text, options, handles.header_width);
            runtime.logs.extend(text.lines().map(str::to_string));
            handles.emit(EngineEvent::Output {
                step: step_name.to_string(),
                text,
            });
            StepRunResult::Success
        }
        Err(err) => {
            let message = format!("{err:#}");
            warn!(error = %message, "메시지 렌더링 실패");
            state.record_error(step_name, &err);
            StepRunResult::Recorded(message)
        }
    }
}

/// 표시 옵션을 적용해 출력 문자열을 만든다.
///
/// preformatted가 아니면 앞뒤 빈 줄과 각 줄의 들여쓰기를 제거한다.
/// header이면 `width` 길이의 구분선으로 감싼다.
fn render_output(text: &str, options: OutputOptions, width: usize) -> String {
    let body = if options.preformatted {
        text.to_string()
    } else {
        text.trim_matches('\n')
            .lines()
            .map(str::trim)
            .collect::<Vec<_>>()
            .join("\n")
    };
    if options.header {
        let rule = "-".repeat(width);
        format!("{rule}\n{body}\n{rule}")
    } else {
        body
    }
}

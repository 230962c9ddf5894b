use super::super::state::State;
use super::{StepAbort, StepRunResult};
use crate::scenario::{ActionFn, ErrorPolicy};
use tracing::{error, warn};

/// Action Step을 실행하고 정책에 따라 실패를 기록하거나 중단한다.
pub(super) async fn execute_action(
    step_name: &str,
    handler: &ActionFn,
    policy: ErrorPolicy,
    state: &mut State,
) -> Result<StepRunResult, StepAbort> {
    let result = handler(state).await;
    match result {
        Ok(()) => Ok(StepRunResult::Success),
        Err(err) => match policy {
            ErrorPolicy::Record => {
                let message = format!("{err:#}");
                warn!(error = %message, "Action 실패, 오류 목록에 기록");
                state.record_error(step_name, &err);
                Ok(StepRunResult::Recorded(message))
            }
            ErrorPolicy::Abort => {
                error!(error = %format!("{err:#}"), "Action 치명적 실패, 시나리오 중단");
                Err(StepAbort::Fatal(err))
            }
        },
    }
}

use crate::engine::{EngineEvent, PromptBridge};
use crate::prompter::{PromptAnswer, PromptKind, PromptRequest, Prompter};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, warn};

/// 엔진 이벤트를 순서대로 소비하며 출력을 쓰고 입력 요청에 응답하는 콘솔 루프이다.
///
/// 이벤트 채널 하나로 출력과 입력 요청을 함께 받으므로 메시지가 질문보다 먼저 보인다.
/// 응답을 얻지 못한 요청은 취소되어 엔진 쪽 입력 Step이 실패한다.
/// 모든 송신자가 닫히면 종료한다.
pub async fn run_console<P, W>(
    mut rx: UnboundedReceiver<EngineEvent>,
    bridge: PromptBridge,
    prompter: P,
    mut out: W,
) -> anyhow::Result<()>
where
    P: Prompter,
    W: AsyncWrite + Unpin,
{
    while let Some(event) = rx.recv().await {
        match event {
            EngineEvent::Output { text, .. } => {
                out.write_all(format!("{text}\n\n").as_bytes()).await?;
                out.flush().await?;
            }
            EngineEvent::PromptRequested {
                request_id,
                request,
            } => match answer(&prompter, &request).await {
                Ok(answer) => {
                    if !bridge.respond(request_id, answer) {
                        warn!(request_id, "응답을 기다리는 요청이 없습니다.");
                    }
                }
                Err(err) => {
                    warn!(request_id, error = %err, "입력을 받지 못해 요청을 취소합니다.");
                    bridge.cancel(request_id);
                }
            },
            EngineEvent::StepFinished {
                step,
                success: false,
            } => {
                debug!(step = %step, "Step 실패");
            }
            EngineEvent::ScenarioFinished {
                scenario, errors, ..
            } if errors > 0 => {
                out.write_all(
                    format!("[{scenario}] {errors}개의 오류가 기록되었습니다.\n").as_bytes(),
                )
                .await?;
                out.flush().await?;
            }
            _ => {}
        }
    }
    Ok(())
}

/// 요청 종류에 맞는 Prompter 메서드로 응답을 얻는다.
async fn answer<P: Prompter>(
    prompter: &P,
    request: &PromptRequest,
) -> anyhow::Result<PromptAnswer> {
    let PromptRequest {
        kind,
        message,
        choices,
        default,
    } = request;
    Ok(match kind {
        PromptKind::Confirm => {
            let default = default.as_deref() == Some("true");
            PromptAnswer::Confirm(prompter.confirm(message, default).await?)
        }
        PromptKind::Text => PromptAnswer::Text(prompter.text(message, default.as_deref()).await?),
        PromptKind::Select => {
            let default = default
                .as_ref()
                .and_then(|value| choices.iter().position(|c| c == value));
            PromptAnswer::Select(prompter.select(message, choices, default).await?)
        }
        PromptKind::MultiSelect => {
            PromptAnswer::MultiSelect(prompter.multi_select(message, choices).await?)
        }
    })
}

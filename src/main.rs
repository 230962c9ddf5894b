use anyhow::Context;
use rust_scenario::config::{CONFIG_ENV, RunnerConfig, load_config_from_file};
use rust_scenario::console::run_console;
use rust_scenario::demo::{DemoContext, InMemoryMessaging, Stage, broker_file, build_scenarios};
use rust_scenario::engine::PromptBridge;
use rust_scenario::prompter::TerminalPrompter;
use rust_scenario::{EngineHandles, Scenario, ScenarioError, State, run_scenario};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};

/// 선택한 데모 단계를 실행하는 진입점이다.
///
/// 첫 번째 인자로 `deploy`, `demo`, `clean`, `all` 중 하나를 받으며 생략하면 `all`이다.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = load_config()?;
    let stage: Stage = std::env::args()
        .nth(1)
        .as_deref()
        .unwrap_or("all")
        .parse()?;
    info!(?stage, state_file = %config.state_file, "데모 실행 준비");

    // 단계를 따로 실행해도 같은 자원을 보도록 브로커를 상태 파일 옆에 둔다.
    let state_path = config.state_path()?;
    let client = InMemoryMessaging::open(broker_file(&state_path))
        .await
        .context("브로커 파일 로드 실패")?
        .with_delivery_delay(2);
    let ctx = DemoContext::new(Arc::new(client), state_path, config.poll.settings());
    let scenarios = build_scenarios(stage, &ctx)?;

    let bridge = PromptBridge::new();
    let (tx, rx) = mpsc::unbounded_channel();
    let prompter = config.build_prompter(&bridge, &tx);
    let console = tokio::spawn(run_console(
        rx,
        bridge,
        TerminalPrompter::stdio(),
        tokio::io::stdout(),
    ));
    let handles = EngineHandles::new(prompter)
        .with_events(tx)
        .with_header_width(config.header_width);

    let result = run_all(&scenarios, &handles).await;
    // 송신자를 모두 닫아야 콘솔 루프가 끝난다.
    drop(handles);
    console.await.context("콘솔 태스크 실패")??;

    let state = match result {
        Ok(state) => state,
        Err(err) => {
            error!(error = %err, "시나리오가 중단되었습니다.");
            return Err(err.into());
        }
    };
    if state.has_errors() {
        anyhow::bail!("{}개의 오류와 함께 종료되었습니다.", state.errors().len());
    }
    Ok(())
}

/// `SCENARIO_CONFIG`가 가리키는 파일 또는 기본 설정에 환경 변수를 덮어쓴다.
fn load_config() -> anyhow::Result<RunnerConfig> {
    let config = match std::env::var(CONFIG_ENV) {
        Ok(path) => load_config_from_file(Path::new(&path))
            .with_context(|| format!("설정 파일 로드 실패: {path}"))?,
        Err(_) => RunnerConfig::default(),
    };
    Ok(config.apply_env_overrides()?)
}

/// 시나리오를 순서대로 실행하며 상태를 다음 시나리오로 넘긴다.
async fn run_all(
    scenarios: &[Scenario],
    handles: &EngineHandles,
) -> Result<State, ScenarioError> {
    let mut state = State::new();
    for scenario in scenarios {
        state = run_scenario(scenario, state, handles).await?.state;
    }
    Ok(state)
}

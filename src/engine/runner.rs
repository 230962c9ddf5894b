use super::events::EngineEvent;
use super::resources::EngineHandles;
use super::runtime::{ScenarioRuntime, StepStatus};
use super::state::State;
use super::steps::{StepAbort, StepRunResult, run_single_step};
use crate::error::ScenarioError;
use crate::scenario::Scenario;
use tracing::{Instrument, debug, info, info_span};

/// 시나리오 실행 결과이다.
#[derive(Debug)]
pub struct ScenarioOutcome {
    /// 모든 Step 실행 후의 상태.
    pub state: State,
    /// Step별 실행 기록.
    pub runtime: ScenarioRuntime,
}

/// Scenario의 Step을 순서대로 하나씩 실행한다.
///
/// 각 Step마다 skip 조건을 먼저 평가하고, 조건이 참이면 부수 효과 없이 건너뛴다.
/// 조기 종료 플래그가 설정되어도 남은 Step은 계속 평가되며 각자 skip 조건으로 빠진다.
/// 치명적 Action 실패나 입력 실패가 발생한 경우에만 중단하며, 이때 오류에 중단 시점 상태가 담긴다.
pub async fn run_scenario(
    scenario: &Scenario,
    state: State,
    handles: &EngineHandles,
) -> Result<ScenarioOutcome, ScenarioError> {
    let mut state = state;
    let mut runtime = ScenarioRuntime::new(scenario);
    info!(scenario = scenario.name(), steps = scenario.len(), "시나리오 실행 시작");
    handles.emit(EngineEvent::ScenarioStarted {
        scenario: scenario.name().to_string(),
        steps: scenario.len(),
    });
    for (step, step_state) in scenario.steps().iter().zip(runtime.steps.iter_mut()) {
        if step.should_skip(&state) {
            debug!(step = step.name(), "skip 조건 충족, 건너뜀");
            step_state.mark_skipped();
            handles.emit(EngineEvent::StepSkipped {
                step: step.name().to_string(),
            });
            continue;
        }
        step_state.mark_started();
        handles.emit(EngineEvent::StepStarted {
            step: step.name().to_string(),
        });
        let span = info_span!("step", name = step.name(), kind = step.kind().label());
        let result = run_single_step(step, &mut state, handles, step_state)
            .instrument(span)
            .await;
        match result {
            Ok(StepRunResult::Success) => {
                step_state.mark_finished(StepStatus::Success);
                handles.emit(EngineEvent::StepFinished {
                    step: step.name().to_string(),
                    success: true,
                });
            }
            Ok(StepRunResult::Recorded(message)) => {
                step_state.mark_finished(StepStatus::Failed(message));
                handles.emit(EngineEvent::StepFinished {
                    step: step.name().to_string(),
                    success: false,
                });
            }
            Err(abort) => {
                let (StepAbort::Fatal(source) | StepAbort::Prompt(source)) = &abort;
                step_state.mark_finished(StepStatus::Failed(format!("{source:#}")));
                handles.emit(EngineEvent::StepFinished {
                    step: step.name().to_string(),
                    success: false,
                });
                finish(scenario, &state, handles);
                let step = step.name().to_string();
                let state = Box::new(state);
                return Err(match abort {
                    StepAbort::Fatal(source) => ScenarioError::Aborted {
                        step,
                        source,
                        state,
                    },
                    StepAbort::Prompt(source) => ScenarioError::Prompt {
                        step,
                        source,
                        state,
                    },
                });
            }
        }
    }
    finish(scenario, &state, handles);
    Ok(ScenarioOutcome { state, runtime })
}

/// 종료 로그와 이벤트를 남긴다.
fn finish(scenario: &Scenario, state: &State, handles: &EngineHandles) {
    info!(
        scenario = scenario.name(),
        early_exit = state.early_exit(),
        errors = state.errors().len(),
        "시나리오 실행 종료"
    );
    handles.emit(EngineEvent::ScenarioFinished {
        scenario: scenario.name().to_string(),
        early_exit: state.early_exit(),
        errors: state.errors().len(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompter::{PromptAnswer, ScriptedPrompter};
    use crate::scenario::{Prompt, Step, skip};
    use futures::FutureExt;
    use std::sync::{Arc, Mutex};

    type Trace = Arc<Mutex<Vec<String>>>;

    fn scripted(answers: Vec<PromptAnswer>) -> EngineHandles {
        EngineHandles::new(Arc::new(ScriptedPrompter::new(answers)))
    }

    /// skip 조건과 핸들러 호출을 모두 기록하는 Action Step을 만든다.
    fn traced_step(name: &str, trace: &Trace, skip: bool) -> Step {
        let skip_trace = trace.clone();
        let run_trace = trace.clone();
        let skip_name = name.to_string();
        let run_name = name.to_string();
        Step::action(name, move |state| {
            let run_trace = run_trace.clone();
            let run_name = run_name.clone();
            async move {
                run_trace
                    .lock()
                    .expect("trace mutex poisoned")
                    .push(format!("run:{run_name}"));
                state.set(&run_name, true)?;
                anyhow::Ok(())
            }
            .boxed()
        })
        .skip_when(move |_| {
            skip_trace
                .lock()
                .expect("trace mutex poisoned")
                .push(format!("skip?:{skip_name}"));
            skip
        })
    }

    /// 모든 Step을 순서대로 한 번씩 방문하고 핸들러 전에 skip 조건을 평가하는지 검증한다.
    #[tokio::test]
    async fn visits_each_step_once_in_order_checking_skip_first() {
        let trace: Trace = Arc::new(Mutex::new(Vec::new()));
        let scenario = Scenario::new(
            "order",
            vec![
                traced_step("a", &trace, false),
                traced_step("b", &trace, true),
                traced_step("c", &trace, false),
            ],
        )
        .expect("시나리오 생성 실패");

        let outcome = run_scenario(&scenario, State::new(), &EngineHandles::default())
            .await
            .expect("실행 실패");

        let trace = trace.lock().expect("trace mutex poisoned").clone();
        assert_eq!(
            trace,
            vec!["skip?:a", "run:a", "skip?:b", "skip?:c", "run:c"]
        );
        assert_eq!(outcome.runtime.names_with(&StepStatus::Success), vec!["a", "c"]);
        assert_eq!(outcome.runtime.names_with(&StepStatus::Skipped), vec!["b"]);
    }

    /// 건너뛴 Step은 상태와 오류 목록을 변경하지 않는다.
    #[tokio::test]
    async fn skipped_step_leaves_state_untouched() {
        let scenario = Scenario::new(
            "skip",
            vec![
                Step::action("fails", |_state| {
                    async { Err(anyhow::anyhow!("should not run")) }.boxed()
                })
                .skip_when(|_| true),
            ],
        )
        .expect("시나리오 생성 실패");
        let mut initial = State::new();
        initial.set("seed", 1).expect("값 저장 실패");

        let outcome = run_scenario(&scenario, initial.clone(), &EngineHandles::default())
            .await
            .expect("실행 실패");
        assert_eq!(outcome.state, initial);
    }

    /// 조기 종료 이후 on_early_exit 조건을 가진 Step은 실행되지 않는다.
    #[tokio::test]
    async fn early_exit_makes_guarded_steps_self_skip() {
        let trace: Trace = Arc::new(Mutex::new(Vec::new()));
        let scenario = Scenario::new(
            "exit",
            vec![
                Step::input(
                    "continue",
                    Prompt::confirm("Continue?").exit_on_decline(),
                ),
                traced_step("after", &trace, false).skip_when(skip::on_early_exit()),
                Step::output("always", "bye"),
            ],
        )
        .expect("시나리오 생성 실패");

        let outcome = run_scenario(
            &scenario,
            State::new(),
            &scripted(vec![PromptAnswer::Confirm(false)]),
        )
        .await
        .expect("실행 실패");

        assert!(outcome.state.early_exit());
        assert!(trace.lock().expect("trace mutex poisoned").is_empty());
        assert!(!outcome.state.contains("after"));
        assert_eq!(outcome.runtime.output(), vec!["bye"]);
    }

    /// 거부된 확인 응답이 저장되고 그에 의존한 Action이 건너뛰어지는지 검증한다.
    #[tokio::test]
    async fn declined_confirmation_skips_dependent_action() {
        let scenario = Scenario::new(
            "confirm",
            vec![
                Step::output("outputA", "About to create a bucket."),
                Step::input("inputConfirm", Prompt::confirm("Create it?")),
                Step::action("actionB", |state| {
                    async move {
                        state.set("bucket", "created")?;
                        anyhow::Ok(())
                    }
                    .boxed()
                })
                .skip_when(skip::unless_confirmed("inputConfirm")),
            ],
        )
        .expect("시나리오 생성 실패");

        let outcome = run_scenario(
            &scenario,
            State::new(),
            &scripted(vec![PromptAnswer::Confirm(false)]),
        )
        .await
        .expect("실행 실패");

        assert_eq!(outcome.state.get_bool("inputConfirm"), Some(false));
        assert!(!outcome.state.contains("bucket"));
        assert!(!outcome.state.early_exit());
        assert_eq!(
            outcome.runtime.step("actionB").map(|s| s.status.clone()),
            Some(StepStatus::Skipped)
        );
    }

    /// 실패한 Action의 메시지가 마지막 보고 Step 출력에 포함되는지 검증한다.
    #[tokio::test]
    async fn report_step_renders_recorded_errors() {
        let scenario = Scenario::new(
            "report",
            vec![
                Step::action("createQueue", |_state| {
                    async { Err(anyhow::anyhow!("QueueDeletedRecently")) }.boxed()
                }),
                Step::output("next", "still running").skip_when(skip::on_errors()),
                Step::output_with("report", |state| {
                    state
                        .errors()
                        .iter()
                        .map(|e| format!("{}: {}", e.step, e.message))
                        .collect::<Vec<_>>()
                        .join("\n")
                })
                .skip_when(skip::without_errors()),
            ],
        )
        .expect("시나리오 생성 실패");

        let outcome = run_scenario(&scenario, State::new(), &EngineHandles::default())
            .await
            .expect("실행 실패");

        assert_eq!(outcome.state.errors().len(), 1);
        let report = outcome.runtime.step("report").expect("보고 Step 없음");
        assert_eq!(report.status, StepStatus::Success);
        assert!(report.logs.iter().any(|l| l.contains("QueueDeletedRecently")));
        assert_eq!(
            outcome.runtime.step("createQueue").map(|s| s.status.clone()),
            Some(StepStatus::Failed("QueueDeletedRecently".into()))
        );
        assert_eq!(
            outcome.runtime.step("next").map(|s| s.status.clone()),
            Some(StepStatus::Skipped)
        );
    }

    /// 치명적 Action 실패 시 이후 Step을 실행하지 않고 중단 시점 상태를 돌려준다.
    #[tokio::test]
    async fn fatal_action_aborts_with_state() {
        let trace: Trace = Arc::new(Mutex::new(Vec::new()));
        let scenario = Scenario::new(
            "fatal",
            vec![
                traced_step("first", &trace, false),
                Step::action("boom", |_state| {
                    async { Err(anyhow::anyhow!("credentials expired")) }.boxed()
                })
                .fatal(),
                traced_step("never", &trace, false),
            ],
        )
        .expect("시나리오 생성 실패");

        let err = run_scenario(&scenario, State::new(), &EngineHandles::default())
            .await
            .unwrap_err();
        match &err {
            ScenarioError::Aborted { step, source, .. } => {
                assert_eq!(step, "boom");
                assert!(source.to_string().contains("credentials expired"));
            }
            other => panic!("unexpected error: {other}"),
        }
        let state = err.state().expect("상태 없음");
        assert_eq!(state.get_bool("first"), Some(true));
        assert!(!state.has_errors());
        assert!(
            !trace
                .lock()
                .expect("trace mutex poisoned")
                .iter()
                .any(|t| t == "run:never")
        );
    }

    #[tokio::test]
    async fn prompt_failure_aborts_run() {
        let scenario = Scenario::new("prompt", vec![Step::input("name", Prompt::text("Name?"))])
            .expect("시나리오 생성 실패");
        let err = run_scenario(&scenario, State::new(), &scripted(Vec::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, ScenarioError::Prompt { ref step, .. } if step == "name"));
    }

    #[tokio::test]
    async fn input_answers_are_stored_under_step_name() {
        let scenario = Scenario::new(
            "inputs",
            vec![
                Step::input("queue_name", Prompt::text("Queue name?")),
                Step::input("region", Prompt::select("Region?", ["us-east-1", "eu-west-1"])),
                Step::input(
                    "protocols",
                    Prompt::multi_select("Protocols?", ["sqs", "email", "sms"]),
                ),
                Step::template("summary", "${queue_name} in ${region}"),
            ],
        )
        .expect("시나리오 생성 실패");
        let handles = scripted(vec![
            PromptAnswer::Text("orders".into()),
            PromptAnswer::Select(1),
            PromptAnswer::MultiSelect(vec![0, 2]),
        ]);

        let outcome = run_scenario(&scenario, State::new(), &handles)
            .await
            .expect("실행 실패");
        assert_eq!(outcome.state.get_str("queue_name"), Some("orders"));
        assert_eq!(outcome.state.get_str("region"), Some("eu-west-1"));
        assert_eq!(
            outcome
                .state
                .get::<Vec<String>>("protocols")
                .expect("변환 실패"),
            Some(vec!["sqs".to_string(), "sms".to_string()])
        );
        assert_eq!(outcome.runtime.output(), vec!["orders in eu-west-1"]);
    }

    /// 치환할 수 없는 템플릿은 오류로 기록되고 실행은 계속된다.
    #[tokio::test]
    async fn unresolved_template_is_recorded() {
        let scenario = Scenario::new(
            "template",
            vec![
                Step::template("show", "${rust_scenario_missing_key}"),
                Step::output("after", "done"),
            ],
        )
        .expect("시나리오 생성 실패");
        let outcome = run_scenario(&scenario, State::new(), &EngineHandles::default())
            .await
            .expect("실행 실패");
        assert_eq!(outcome.state.errors().len(), 1);
        assert_eq!(outcome.state.errors()[0].step, "show");
        assert_eq!(outcome.runtime.output(), vec!["done"]);
    }

    #[tokio::test]
    async fn events_follow_step_lifecycle() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let handles = EngineHandles::default().with_events(tx);
        let scenario = Scenario::new(
            "events",
            vec![
                Step::output("hello", "hi"),
                Step::output("hidden", "x").skip_when(|_| true),
            ],
        )
        .expect("시나리오 생성 실패");
        run_scenario(&scenario, State::new(), &handles)
            .await
            .expect("실행 실패");
        drop(handles);

        let mut labels = Vec::new();
        while let Some(event) = rx.recv().await {
            labels.push(match event {
                EngineEvent::ScenarioStarted { .. } => "start".to_string(),
                EngineEvent::StepStarted { step } => format!("started:{step}"),
                EngineEvent::StepSkipped { step } => format!("skipped:{step}"),
                EngineEvent::Output { text, .. } => format!("output:{text}"),
                EngineEvent::StepFinished { step, success } => format!("finished:{step}:{success}"),
                EngineEvent::PromptRequested { .. } => "prompt".to_string(),
                EngineEvent::ScenarioFinished { errors, .. } => format!("end:{errors}"),
            });
        }
        assert_eq!(
            labels,
            vec![
                "start",
                "started:hello",
                "output:hi",
                "finished:hello:true",
                "skipped:hidden",
                "end:0"
            ]
        );
    }

    /// 저장 Step과 로드 Step으로 여러 실행에 걸쳐 상태를 이어받는지 검증한다.
    #[tokio::test]
    async fn state_resumes_across_runs_through_file() {
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("시스템 시간이 UTC epoch 이전입니다.")
            .as_nanos();
        let base_dir = std::env::temp_dir().join(format!("rust_scenario_resume_{timestamp}"));
        let path = base_dir.join("state.yaml");

        let deploy = Scenario::new(
            "deploy",
            vec![
                Step::action("create", |state| {
                    async move {
                        state.set("queue_url", "mem://queue/orders")?;
                        anyhow::Ok(())
                    }
                    .boxed()
                }),
                Step::save_state("save", path.clone()),
            ],
        )
        .expect("시나리오 생성 실패");
        let clean = Scenario::new(
            "clean",
            vec![
                Step::load_state("load", path.clone()),
                Step::template("show", "deleting ${queue_url}"),
            ],
        )
        .expect("시나리오 생성 실패");

        let handles = EngineHandles::default();
        let first = run_scenario(&deploy, State::new(), &handles)
            .await
            .expect("배포 실행 실패");
        let second = run_scenario(&clean, State::new(), &handles)
            .await
            .expect("정리 실행 실패");

        assert_eq!(second.state.get_str("queue_url"), Some("mem://queue/orders"));
        assert_eq!(first.state, second.state);
        assert_eq!(second.runtime.output(), vec!["deleting mem://queue/orders"]);

        let _ = std::fs::remove_dir_all(&base_dir);
    }

    /// 같은 오류가 반복 기록된 상태 파일을 로드 Step으로 읽으면 원래 상태와 같아야 한다.
    #[tokio::test]
    async fn loading_snapshot_keeps_repeated_errors() {
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("시스템 시간이 UTC epoch 이전입니다.")
            .as_nanos();
        let base_dir = std::env::temp_dir().join(format!("rust_scenario_repeat_{timestamp}"));
        let path = base_dir.join("state.yaml");

        let mut saved = State::new();
        saved.set("queue_url", "mem://queue/orders").expect("값 저장 실패");
        saved.record_message("poll", "timeout");
        saved.record_message("poll", "timeout");
        crate::engine::save_state(&path, &saved)
            .await
            .expect("상태 저장 실패");

        let scenario = Scenario::new("reload", vec![Step::load_state("load", path.clone())])
            .expect("시나리오 생성 실패");
        let outcome = run_scenario(&scenario, State::new(), &EngineHandles::default())
            .await
            .expect("실행 실패");
        assert_eq!(outcome.state.errors().len(), 2);
        assert_eq!(outcome.state, saved);

        let _ = std::fs::remove_dir_all(&base_dir);
    }
}

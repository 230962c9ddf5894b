use crate::scenario::Scenario;
use std::time::Instant;

/// Step의 런타임 상태를 표현한다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    /// 아직 실행 대기 상태.
    Pending,
    /// 실행 중.
    Running,
    /// skip 조건에 의해 건너뜀.
    Skipped,
    /// 정상 종료.
    Success,
    /// 실패와 함께 오류 메시지를 포함한다.
    Failed(String),
}

/// Step의 시간 및 출력 정보를 담는다.
#[derive(Debug, Clone)]
pub struct StepRuntimeState {
    /// Step 이름.
    pub name: String,
    /// 현재 상태 값.
    pub status: StepStatus,
    /// 시작 시각.
    pub started_at: Option<Instant>,
    /// 종료 시각.
    pub finished_at: Option<Instant>,
    /// 렌더링된 출력 라인.
    pub logs: Vec<String>,
}

impl StepRuntimeState {
    /// 초기 상태를 생성한다.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: StepStatus::Pending,
            started_at: None,
            finished_at: None,
            logs: Vec::new(),
        }
    }

    pub(crate) fn mark_started(&mut self) {
        self.status = StepStatus::Running;
        self.started_at = Some(Instant::now());
    }

    pub(crate) fn mark_skipped(&mut self) {
        self.status = StepStatus::Skipped;
    }

    pub(crate) fn mark_finished(&mut self, status: StepStatus) {
        self.status = status;
        self.finished_at = Some(Instant::now());
    }
}

/// Scenario 실행 중 Step 상태 목록을 시나리오 순서대로 관리한다.
#[derive(Debug, Clone)]
pub struct ScenarioRuntime {
    /// 시나리오 이름.
    pub scenario: String,
    /// Step별 상태 목록.
    pub steps: Vec<StepRuntimeState>,
}

impl ScenarioRuntime {
    /// Scenario를 받아 초기 상태를 생성한다.
    pub fn new(scenario: &Scenario) -> Self {
        let steps = scenario
            .steps()
            .iter()
            .map(|step| StepRuntimeState::new(step.name()))
            .collect();
        Self {
            scenario: scenario.name().to_string(),
            steps,
        }
    }

    /// 이름으로 Step 상태를 조회한다.
    pub fn step(&self, name: &str) -> Option<&StepRuntimeState> {
        self.steps.iter().find(|s| s.name == name)
    }

    /// 해당 상태인 Step 이름 목록을 반환한다.
    pub fn names_with(&self, status: &StepStatus) -> Vec<&str> {
        self.steps
            .iter()
            .filter(|s| &s.status == status)
            .map(|s| s.name.as_str())
            .collect()
    }

    /// 모든 Step의 출력 라인을 순서대로 이어 붙인다.
    pub fn output(&self) -> Vec<&str> {
        self.steps
            .iter()
            .flat_map(|s| s.logs.iter().map(|l| l.as_str()))
            .collect()
    }
}

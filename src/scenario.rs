use crate::engine::{State, load_state, save_state};
use crate::error::ScenarioError;
use futures::FutureExt;
use futures::future::BoxFuture;
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

pub mod skip;

/// Step 실행 여부를 결정하는 조건 함수이다.
pub type SkipPredicate = Box<dyn Fn(&State) -> bool + Send + Sync>;

/// 상태로부터 메시지를 계산하는 함수이다.
pub type MessageFn = Box<dyn Fn(&State) -> String + Send + Sync>;

/// Action Step 핸들러이다. 실행 중인 Step만 상태를 변경할 수 있다.
pub type ActionFn =
    Box<dyn for<'a> Fn(&'a mut State) -> BoxFuture<'a, anyhow::Result<()>> + Send + Sync>;

/// Output/Input Step에서 사용자에게 보여줄 메시지이다.
pub enum Message {
    /// 그대로 출력하는 문자열.
    Literal(String),
    /// `${key}` 플레이스홀더를 상태 값으로 치환하는 문자열.
    Template(String),
    /// 실행 시점 상태로부터 계산하는 메시지.
    Computed(MessageFn),
}

impl Message {
    /// 현재 상태로 메시지를 렌더링한다.
    pub fn render(&self, state: &State) -> anyhow::Result<String> {
        match self {
            Message::Literal(text) => Ok(text.clone()),
            Message::Template(template) => state.expand_placeholders(template),
            Message::Computed(f) => Ok(f(state)),
        }
    }
}

impl From<&str> for Message {
    fn from(value: &str) -> Self {
        Message::Literal(value.to_string())
    }
}

impl From<String> for Message {
    fn from(value: String) -> Self {
        Message::Literal(value)
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Literal(text) => f.debug_tuple("Literal").field(text).finish(),
            Message::Template(text) => f.debug_tuple("Template").field(text).finish(),
            Message::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// Output Step 표시 옵션이다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputOptions {
    /// 구분선으로 감싼 머리글로 출력한다.
    pub header: bool,
    /// 들여쓰기와 공백을 그대로 유지한다.
    pub preformatted: bool,
}

/// Input Step이 사용자에게 묻는 방식이다.
#[derive(Debug)]
pub enum Prompt {
    /// 예/아니오 확인.
    Confirm {
        message: Message,
        default: bool,
        /// 거부 응답 시 조기 종료를 요청한다.
        exit_on_decline: bool,
    },
    /// 자유 텍스트 입력.
    Text {
        message: Message,
        default: Option<String>,
    },
    /// 단일 선택.
    Select {
        message: Message,
        choices: Vec<String>,
        default: Option<usize>,
    },
    /// 다중 선택.
    MultiSelect {
        message: Message,
        choices: Vec<String>,
    },
}

impl Prompt {
    /// 기본 응답이 '예'인 확인 요청을 만든다.
    pub fn confirm(message: impl Into<Message>) -> Self {
        Prompt::Confirm {
            message: message.into(),
            default: true,
            exit_on_decline: false,
        }
    }

    pub fn text(message: impl Into<Message>) -> Self {
        Prompt::Text {
            message: message.into(),
            default: None,
        }
    }

    pub fn select<I, S>(message: impl Into<Message>, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Prompt::Select {
            message: message.into(),
            choices: choices.into_iter().map(Into::into).collect(),
            default: None,
        }
    }

    pub fn multi_select<I, S>(message: impl Into<Message>, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Prompt::MultiSelect {
            message: message.into(),
            choices: choices.into_iter().map(Into::into).collect(),
        }
    }

    /// 확인 요청의 기본 응답을 지정한다.
    pub fn default_answer(mut self, answer: bool) -> Self {
        if let Prompt::Confirm { default, .. } = &mut self {
            *default = answer;
        }
        self
    }

    /// 텍스트 입력의 기본값을 지정한다.
    pub fn default_text(mut self, value: impl Into<String>) -> Self {
        if let Prompt::Text { default, .. } = &mut self {
            *default = Some(value.into());
        }
        self
    }

    /// 단일 선택의 기본 인덱스를 지정한다.
    pub fn default_choice(mut self, index: usize) -> Self {
        if let Prompt::Select { default, .. } = &mut self {
            *default = Some(index);
        }
        self
    }

    /// 확인 요청이 거부되면 조기 종료하도록 설정한다.
    pub fn exit_on_decline(mut self) -> Self {
        if let Prompt::Confirm {
            exit_on_decline, ..
        } = &mut self
        {
            *exit_on_decline = true;
        }
        self
    }

    pub(crate) fn message(&self) -> &Message {
        match self {
            Prompt::Confirm { message, .. }
            | Prompt::Text { message, .. }
            | Prompt::Select { message, .. }
            | Prompt::MultiSelect { message, .. } => message,
        }
    }
}

/// Action Step 실패 시 처리 정책이다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// 오류를 상태의 오류 목록에 기록하고 다음 Step으로 진행한다.
    #[default]
    Record,
    /// 시나리오 실행을 즉시 중단한다.
    Abort,
}

/// StepKind는 엔진이 수행할 개별 작업 유형을 표현한다.
pub enum StepKind {
    /// 사용자에게 메시지를 출력한다.
    Output {
        message: Message,
        options: OutputOptions,
    },
    /// 사용자 입력을 받아 `state[step.name]`에 저장한다.
    Input { prompt: Prompt },
    /// 외부 호출 등 부수 효과가 있는 작업을 수행한다.
    Action {
        handler: ActionFn,
        policy: ErrorPolicy,
    },
}

impl StepKind {
    /// 로그에 사용할 종류 이름이다.
    pub fn label(&self) -> &'static str {
        match self {
            StepKind::Output { .. } => "output",
            StepKind::Input { .. } => "input",
            StepKind::Action { .. } => "action",
        }
    }
}

impl fmt::Debug for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepKind::Output { message, options } => f
                .debug_struct("Output")
                .field("message", message)
                .field("options", options)
                .finish(),
            StepKind::Input { prompt } => f.debug_struct("Input").field("prompt", prompt).finish(),
            StepKind::Action { policy, .. } => f
                .debug_struct("Action")
                .field("policy", policy)
                .finish_non_exhaustive(),
        }
    }
}

/// Step은 Scenario 내 최소 실행 단위를 표현한다.
pub struct Step {
    /// 시나리오 내 고유 이름. Input 응답 저장 키로도 사용한다.
    name: String,
    /// Step에서 실행할 Kind 정보.
    kind: StepKind,
    /// 실행 전 평가하는 skip 조건.
    skip_when: Option<SkipPredicate>,
}

impl Step {
    /// 고정 메시지를 출력하는 Step을 만든다.
    pub fn output(name: impl Into<String>, message: impl Into<Message>) -> Self {
        Self::new(
            name,
            StepKind::Output {
                message: message.into(),
                options: OutputOptions::default(),
            },
        )
    }

    /// `${key}` 플레이스홀더를 치환해 출력하는 Step을 만든다.
    pub fn template(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self::new(
            name,
            StepKind::Output {
                message: Message::Template(template.into()),
                options: OutputOptions::default(),
            },
        )
    }

    /// 상태로부터 계산한 메시지를 출력하는 Step을 만든다.
    pub fn output_with<F>(name: impl Into<String>, render: F) -> Self
    where
        F: Fn(&State) -> String + Send + Sync + 'static,
    {
        Self::new(
            name,
            StepKind::Output {
                message: Message::Computed(Box::new(render)),
                options: OutputOptions::default(),
            },
        )
    }

    /// 누적된 오류를 모두 출력하는 보고 Step을 만든다. 오류가 없으면 건너뛴다.
    pub fn error_report(name: impl Into<String>) -> Self {
        Self::output_with(name, |state| {
            let mut lines = vec![format!("{}개의 오류가 발생했습니다.", state.errors().len())];
            lines.extend(
                state
                    .errors()
                    .iter()
                    .map(|e| format!("- [{}] {}", e.step, e.message)),
            );
            lines.join("\n")
        })
        .preformatted()
        .skip_when(skip::without_errors())
    }

    /// 사용자 입력 Step을 만든다.
    pub fn input(name: impl Into<String>, prompt: Prompt) -> Self {
        Self::new(name, StepKind::Input { prompt })
    }

    /// Action Step을 만든다.
    ///
    /// 핸들러는 `async move { .. }.boxed()` 형태로 상태를 빌려 쓰는 future를 반환한다.
    /// 외부 클라이언트는 클로저가 캡처하여 주입한다.
    pub fn action<F>(name: impl Into<String>, handler: F) -> Self
    where
        F: for<'a> Fn(&'a mut State) -> BoxFuture<'a, anyhow::Result<()>> + Send + Sync + 'static,
    {
        Self::new(
            name,
            StepKind::Action {
                handler: Box::new(handler),
                policy: ErrorPolicy::Record,
            },
        )
    }

    /// 현재 상태를 파일로 저장하는 Action Step을 만든다.
    pub fn save_state(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self::action(name, move |state| {
            let path = path.clone();
            async move {
                save_state(&path, state).await?;
                anyhow::Ok(())
            }
            .boxed()
        })
    }

    /// 파일에서 상태를 읽어 현재 상태에 병합하는 Action Step을 만든다.
    pub fn load_state(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self::action(name, move |state| {
            let path = path.clone();
            async move {
                let loaded = load_state(&path).await?;
                state.merge(loaded);
                anyhow::Ok(())
            }
            .boxed()
        })
    }

    fn new(name: impl Into<String>, kind: StepKind) -> Self {
        Self {
            name: name.into(),
            kind,
            skip_when: None,
        }
    }

    /// skip 조건을 지정한다.
    pub fn skip_when<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&State) -> bool + Send + Sync + 'static,
    {
        self.skip_when = Some(Box::new(predicate));
        self
    }

    /// Output Step을 머리글로 표시한다.
    pub fn header(mut self) -> Self {
        if let StepKind::Output { options, .. } = &mut self.kind {
            options.header = true;
        }
        self
    }

    /// Output Step의 공백을 그대로 유지한다.
    pub fn preformatted(mut self) -> Self {
        if let StepKind::Output { options, .. } = &mut self.kind {
            options.preformatted = true;
        }
        self
    }

    /// Action Step 실패를 시나리오 중단으로 처리한다.
    pub fn fatal(mut self) -> Self {
        if let StepKind::Action { policy, .. } = &mut self.kind {
            *policy = ErrorPolicy::Abort;
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &StepKind {
        &self.kind
    }

    /// skip 조건을 평가한다. 조건이 없으면 항상 실행한다.
    pub fn should_skip(&self, state: &State) -> bool {
        self.skip_when.as_ref().is_some_and(|p| p(state))
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("skip_when", &self.skip_when.is_some())
            .finish()
    }
}

/// Scenario는 순서가 고정된 Step 목록이다.
#[derive(Debug)]
pub struct Scenario {
    /// 시나리오의 표시 이름.
    name: String,
    /// Step 목록.
    steps: Vec<Step>,
}

impl Scenario {
    /// Step 이름이 비어 있지 않고 고유한지 검증하여 시나리오를 만든다.
    pub fn new(name: impl Into<String>, steps: Vec<Step>) -> Result<Self, ScenarioError> {
        let mut seen: HashSet<&str> = HashSet::new();
        for (index, step) in steps.iter().enumerate() {
            if step.name.trim().is_empty() {
                return Err(ScenarioError::EmptyStepName { index });
            }
            if !seen.insert(step.name.as_str()) {
                return Err(ScenarioError::DuplicateStep(step.name.clone()));
            }
        }
        Ok(Self {
            name: name.into(),
            steps,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Step 이름 목록을 순서대로 반환한다.
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name.as_str()).collect()
    }

    /// 전체 Step 수를 반환한다.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Step 수가 비었는지 여부를 확인한다.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_step_names_are_rejected() {
        let result = Scenario::new(
            "dup",
            vec![Step::output("greet", "hi"), Step::output("greet", "again")],
        );
        assert!(matches!(result, Err(ScenarioError::DuplicateStep(name)) if name == "greet"));
    }

    #[test]
    fn empty_step_name_is_rejected() {
        let result = Scenario::new("empty", vec![Step::output("ok", "hi"), Step::output(" ", "x")]);
        assert!(matches!(result, Err(ScenarioError::EmptyStepName { index: 1 })));
    }

    #[test]
    fn builders_set_options_only_on_matching_kinds() {
        let step = Step::output("title", "Welcome").header().preformatted().fatal();
        match step.kind() {
            StepKind::Output { options, .. } => {
                assert!(options.header);
                assert!(options.preformatted);
            }
            other => panic!("unexpected kind: {other:?}"),
        }

        let action = Step::action("noop", |_state| async { anyhow::Ok(()) }.boxed()).fatal();
        assert!(matches!(
            action.kind(),
            StepKind::Action {
                policy: ErrorPolicy::Abort,
                ..
            }
        ));
    }

    #[test]
    fn prompt_defaults_apply_to_their_own_kind() {
        let prompt = Prompt::confirm("go?").default_answer(false).exit_on_decline();
        assert!(matches!(
            prompt,
            Prompt::Confirm {
                default: false,
                exit_on_decline: true,
                ..
            }
        ));
        let prompt = Prompt::select("pick", ["a", "b"]).default_choice(1);
        assert!(matches!(prompt, Prompt::Select { default: Some(1), .. }));
    }

    /// skip 조건이 같은 상태에서 반복 평가해도 같은 값을 내는지 검증한다.
    #[test]
    fn skip_evaluation_is_stable_on_unchanged_state() {
        let step = Step::output("report", "x").skip_when(|state| !state.has_errors());
        let state = State::new();
        let first = step.should_skip(&state);
        let second = step.should_skip(&state);
        assert!(first);
        assert_eq!(first, second);
        assert!(!Step::output("plain", "x").should_skip(&state));
    }

    #[test]
    fn error_report_lists_every_recorded_error() {
        let step = Step::error_report("report");
        let mut state = State::new();
        assert!(step.should_skip(&state));

        state.record_message("create_queue", "access denied");
        state.record_message("delete_topic", "not found");
        assert!(!step.should_skip(&state));
        let StepKind::Output { message, .. } = step.kind() else {
            panic!("report must be an output step");
        };
        let text = message.render(&state).expect("렌더링 실패");
        assert!(text.starts_with("2개의 오류"));
        assert!(text.contains("- [create_queue] access denied"));
        assert!(text.contains("- [delete_topic] not found"));
    }

    #[test]
    fn computed_message_reads_state() {
        let mut state = State::new();
        state.set("queue_url", "mem://queue/a").expect("값 저장 실패");
        let message = Message::Computed(Box::new(|s: &State| {
            format!("url={}", s.get_str("queue_url").unwrap_or("-"))
        }));
        assert_eq!(message.render(&state).expect("렌더링 실패"), "url=mem://queue/a");
    }
}

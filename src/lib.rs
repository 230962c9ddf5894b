//! 이름 있는 Step(출력, 입력, 동작)을 순서대로 실행하는 시나리오 실행기.
//!
//! 모든 Step은 하나의 [`State`]를 공유하며, 각 Step의 skip 조건과 오류 목록,
//! 조기 종료 플래그로 흐름을 제어한다.

pub mod config;
pub mod console;
pub mod demo;
pub mod engine;
pub mod error;
pub mod prompter;
pub mod scenario;

pub use engine::{EngineEvent, EngineHandles, ScenarioOutcome, State, run_scenario};
pub use error::{ConfigError, PollError, ScenarioError, StateError};
pub use prompter::{Prompter, SharedPrompter};
pub use scenario::{ErrorPolicy, Message, Prompt, Scenario, Step, StepKind};

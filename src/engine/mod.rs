mod events;
mod persist;
mod poll;
mod prompt_bridge;
mod resources;
mod runner;
mod runtime;
mod state;
mod steps;

pub use events::EngineEvent;
pub use persist::{load_state, save_state};
pub use poll::{PollSettings, PollStatus, poll_until};
pub use prompt_bridge::PromptBridge;
pub use resources::EngineHandles;
pub use runner::{ScenarioOutcome, run_scenario};
pub use runtime::{ScenarioRuntime, StepRuntimeState, StepStatus};
pub use state::{RecordedError, State};

pub(crate) use state::expand_with;

//! 토픽/큐 메시징 서비스를 다루는 데모 시나리오 모음.
//!
//! deploy 단계는 자원을 만들고 상태를 파일에 저장하며, demo와 clean 단계는
//! 저장된 상태를 읽어 이어서 진행한다. 실제 서비스 호출은 주입된
//! [`MessagingClient`]가 담당한다.

use crate::engine::PollSettings;
use crate::error::ScenarioError;
use crate::scenario::Scenario;
use std::path::{Path, PathBuf};

mod client;
mod scenarios;

pub use client::{InMemoryMessaging, MessagingClient, ServiceError, SharedMessagingClient};
pub use scenarios::{clean_scenario, demo_scenario, deploy_scenario};

/// 데모 시나리오가 상태에 쓰는 키 목록이다.
pub mod keys {
    /// 토픽 이름 입력 (`String`).
    pub const TOPIC_NAME: &str = "topic_name";
    /// 큐 이름 입력 (`String`).
    pub const QUEUE_NAME: &str = "queue_name";
    /// 생성되었거나 재사용한 토픽 ARN (`String`).
    pub const TOPIC_ARN: &str = "topic_arn";
    /// 생성되었거나 재사용한 큐 URL (`String`).
    pub const QUEUE_URL: &str = "queue_url";
    /// 토픽-큐 구독 ARN (`String`).
    pub const SUBSCRIPTION_ARN: &str = "subscription_arn";
    /// 발행할 메시지 입력 (`String`).
    pub const MESSAGE: &str = "message";
    /// 발행된 메시지 ID (`String`).
    pub const MESSAGE_ID: &str = "message_id";
    /// 큐에서 받은 메시지 목록 (`Vec<String>`).
    pub const RECEIVED: &str = "received";
    /// 정리 진행 확인 응답 (`bool`).
    pub const CONFIRM_CLEANUP: &str = "confirm_cleanup";
    /// 큐 삭제 확인 응답 (`bool`).
    pub const CONFIRM_DELETE_QUEUE: &str = "confirm_delete_queue";
    /// 토픽 삭제 확인 응답 (`bool`).
    pub const CONFIRM_DELETE_TOPIC: &str = "confirm_delete_topic";
}

/// 실행할 데모 단계이다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Deploy,
    Demo,
    Clean,
    /// deploy, demo, clean을 순서대로 모두 실행.
    All,
}

impl std::str::FromStr for Stage {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "deploy" => Ok(Stage::Deploy),
            "demo" => Ok(Stage::Demo),
            "clean" => Ok(Stage::Clean),
            "all" => Ok(Stage::All),
            other => anyhow::bail!("알 수 없는 단계입니다: {other} (deploy|demo|clean|all)"),
        }
    }
}

/// 데모 시나리오가 공유하는 협력자이다.
#[derive(Clone)]
pub struct DemoContext {
    /// 주입된 메시징 클라이언트.
    pub client: SharedMessagingClient,
    /// 단계 사이 상태 파일 경로.
    pub state_file: PathBuf,
    /// 메시지 수신 대기 폴링 설정.
    pub poll: PollSettings,
}

impl DemoContext {
    pub fn new(
        client: SharedMessagingClient,
        state_file: impl Into<PathBuf>,
        poll: PollSettings,
    ) -> Self {
        Self {
            client,
            state_file: state_file.into(),
            poll,
        }
    }
}

/// 상태 파일 옆에 두는 브로커 파일 경로이다. `state.yaml`이면 `state.broker.yaml`이 된다.
pub fn broker_file(state_file: &Path) -> PathBuf {
    state_file.with_extension("broker.yaml")
}

/// 단계에 해당하는 시나리오 목록을 실행 순서대로 만든다.
pub fn build_scenarios(stage: Stage, ctx: &DemoContext) -> Result<Vec<Scenario>, ScenarioError> {
    Ok(match stage {
        Stage::Deploy => vec![deploy_scenario(ctx)?],
        Stage::Demo => vec![demo_scenario(ctx)?],
        Stage::Clean => vec![clean_scenario(ctx)?],
        Stage::All => vec![
            deploy_scenario(ctx)?,
            demo_scenario(ctx)?,
            clean_scenario(ctx)?,
        ],
    })
}

use super::client::{ServiceError, SharedMessagingClient};
use super::{DemoContext, keys};
use crate::engine::{PollSettings, PollStatus, poll_until};
use crate::error::ScenarioError;
use crate::scenario::{Message, Prompt, Scenario, Step, skip};
use futures::FutureExt;
use tracing::{debug, info};

/// 토픽과 큐를 만들고 구독을 연결한 뒤 상태를 저장하는 시나리오이다.
///
/// 같은 이름의 자원이 이미 있으면 새로 만들지 않고 기존 자원을 재사용한다.
pub fn deploy_scenario(ctx: &DemoContext) -> Result<Scenario, ScenarioError> {
    Scenario::new(
        "deploy",
        vec![
            Step::output(
                "welcome",
                "
                토픽/큐 메시징 데모에 오신 것을 환영합니다.
                이 단계에서는 토픽과 큐를 만들고 큐를 토픽에 구독시킵니다.
                ",
            )
            .header(),
            Step::input(
                keys::TOPIC_NAME,
                Prompt::text("토픽 이름을 입력하세요:").default_text("scenario-topic"),
            ),
            Step::input(
                keys::QUEUE_NAME,
                Prompt::text("큐 이름을 입력하세요:").default_text("scenario-queue"),
            ),
            create_topic_step(ctx.client.clone()).skip_when(skip::on_errors()),
            create_queue_step(ctx.client.clone()).skip_when(skip::on_errors()),
            subscribe_step(ctx.client.clone()).skip_when(skip::on_errors()),
            Step::template(
                "deployed",
                "토픽 ${topic_arn}이(가) 큐 ${queue_url}(으)로 메시지를 전달합니다.",
            )
            .skip_when(skip::on_errors()),
            Step::save_state("save_state", ctx.state_file.clone()),
            Step::error_report("deploy_errors"),
        ],
    )
}

/// 저장된 상태를 읽어 메시지를 발행하고 큐에서 수신될 때까지 기다리는 시나리오이다.
pub fn demo_scenario(ctx: &DemoContext) -> Result<Scenario, ScenarioError> {
    Scenario::new(
        "demo",
        vec![
            Step::load_state("load_state", ctx.state_file.clone()),
            Step::output(
                "demo_intro",
                "
                토픽에 메시지를 발행하면 구독한 큐로 전달됩니다.
                전달에는 시간이 걸리므로 큐를 주기적으로 확인합니다.
                ",
            )
            .header()
            .skip_when(skip::on_errors()),
            Step::input(
                keys::MESSAGE,
                Prompt::text("발행할 메시지를 입력하세요:")
                    .default_text("Hello from the scenario runner!"),
            )
            .skip_when(skip::on_errors()),
            publish_step(ctx.client.clone()).skip_when(skip::on_errors()),
            Step::template(
                "published",
                "메시지 ${message_id}을(를) 발행했습니다. 큐에서 수신을 기다립니다.",
            )
            .skip_when(skip::on_errors()),
            receive_step(ctx.client.clone(), ctx.poll).skip_when(skip::on_errors()),
            Step::output_with("show_received", |state| {
                let received: Vec<String> = state
                    .get(keys::RECEIVED)
                    .ok()
                    .flatten()
                    .unwrap_or_default();
                let mut lines = vec![format!("{}개의 메시지를 받았습니다.", received.len())];
                lines.extend(received.iter().map(|body| format!("  > {body}")));
                lines.join("\n")
            })
            .preformatted()
            .skip_when(skip::on_errors()),
            Step::error_report("demo_errors"),
        ],
    )
}

/// 저장된 상태의 자원을 하나씩 확인받아 삭제하는 시나리오이다.
///
/// 자원마다 확인 Step과 삭제 Step을 따로 둔다. 첫 확인을 거부하면 조기 종료된다.
pub fn clean_scenario(ctx: &DemoContext) -> Result<Scenario, ScenarioError> {
    Scenario::new(
        "clean",
        vec![
            Step::load_state("load_state", ctx.state_file.clone()),
            Step::output("clean_intro", "생성한 자원을 정리합니다.").header(),
            Step::input(
                keys::CONFIRM_CLEANUP,
                Prompt::confirm("토픽, 큐, 구독을 정리할까요?")
                    .default_answer(true)
                    .exit_on_decline(),
            )
            .skip_when(skip::on_early_exit()),
            unsubscribe_step(ctx.client.clone()).skip_when(skip::either(
                skip::on_early_exit(),
                skip::missing(keys::SUBSCRIPTION_ARN),
            )),
            Step::input(
                keys::CONFIRM_DELETE_QUEUE,
                Prompt::confirm(Message::Template(
                    "큐 ${queue_url}을(를) 삭제할까요?".to_string(),
                ))
                .default_answer(true),
            )
            .skip_when(skip::either(
                skip::on_early_exit(),
                skip::missing(keys::QUEUE_URL),
            )),
            delete_queue_step(ctx.client.clone()).skip_when(skip::either(
                skip::on_early_exit(),
                skip::unless_confirmed(keys::CONFIRM_DELETE_QUEUE),
            )),
            Step::input(
                keys::CONFIRM_DELETE_TOPIC,
                Prompt::confirm(Message::Template(
                    "토픽 ${topic_arn}을(를) 삭제할까요?".to_string(),
                ))
                .default_answer(true),
            )
            .skip_when(skip::either(
                skip::on_early_exit(),
                skip::missing(keys::TOPIC_ARN),
            )),
            delete_topic_step(ctx.client.clone()).skip_when(skip::either(
                skip::on_early_exit(),
                skip::unless_confirmed(keys::CONFIRM_DELETE_TOPIC),
            )),
            Step::output("goodbye", "데모를 마칩니다.").skip_when(skip::on_early_exit()),
            Step::error_report("clean_errors"),
        ],
    )
}

fn create_topic_step(client: SharedMessagingClient) -> Step {
    Step::action("create_topic", move |state| {
        let client = client.clone();
        async move {
            let name: String = state.require(keys::TOPIC_NAME)?;
            let arn = match client.create_topic(&name).await {
                Ok(arn) => arn,
                Err(ServiceError::AlreadyExists { .. }) => {
                    info!(topic = %name, "이미 존재하는 토픽을 재사용합니다.");
                    client.topic_arn(&name).await?
                }
                Err(err) => return Err(err.into()),
            };
            state.set(keys::TOPIC_ARN, arn)?;
            anyhow::Ok(())
        }
        .boxed()
    })
}

fn create_queue_step(client: SharedMessagingClient) -> Step {
    Step::action("create_queue", move |state| {
        let client = client.clone();
        async move {
            let name: String = state.require(keys::QUEUE_NAME)?;
            let url = match client.create_queue(&name).await {
                Ok(url) => url,
                Err(ServiceError::AlreadyExists { .. }) => {
                    info!(queue = %name, "이미 존재하는 큐를 재사용합니다.");
                    client.queue_url(&name).await?
                }
                Err(err) => return Err(err.into()),
            };
            state.set(keys::QUEUE_URL, url)?;
            anyhow::Ok(())
        }
        .boxed()
    })
}

fn subscribe_step(client: SharedMessagingClient) -> Step {
    Step::action("subscribe_queue", move |state| {
        let client = client.clone();
        async move {
            let topic: String = state.require(keys::TOPIC_ARN)?;
            let queue: String = state.require(keys::QUEUE_URL)?;
            let arn = client.subscribe(&topic, &queue).await?;
            state.set(keys::SUBSCRIPTION_ARN, arn)?;
            anyhow::Ok(())
        }
        .boxed()
    })
}

fn publish_step(client: SharedMessagingClient) -> Step {
    Step::action("publish_message", move |state| {
        let client = client.clone();
        async move {
            let topic: String = state.require(keys::TOPIC_ARN)?;
            let body: String = state.require(keys::MESSAGE)?;
            let message_id = client.publish(&topic, &body).await?;
            state.set(keys::MESSAGE_ID, message_id)?;
            anyhow::Ok(())
        }
        .boxed()
    })
}

fn receive_step(client: SharedMessagingClient, poll: PollSettings) -> Step {
    Step::action("wait_for_delivery", move |state| {
        let client = client.clone();
        async move {
            let queue: String = state.require(keys::QUEUE_URL)?;
            let received = poll_until(&poll, |attempt| {
                let client = client.clone();
                let queue = queue.clone();
                async move {
                    let batch = client.receive(&queue).await?;
                    debug!(attempt, count = batch.len(), "큐 확인");
                    anyhow::Ok(if batch.is_empty() {
                        PollStatus::Pending
                    } else {
                        PollStatus::Done(batch)
                    })
                }
            })
            .await?;
            state.set(keys::RECEIVED, received)?;
            anyhow::Ok(())
        }
        .boxed()
    })
}

fn unsubscribe_step(client: SharedMessagingClient) -> Step {
    Step::action("unsubscribe_queue", move |state| {
        let client = client.clone();
        async move {
            let arn: String = state.require(keys::SUBSCRIPTION_ARN)?;
            tolerate_missing(client.unsubscribe(&arn).await)?;
            anyhow::Ok(())
        }
        .boxed()
    })
}

fn delete_queue_step(client: SharedMessagingClient) -> Step {
    Step::action("delete_queue", move |state| {
        let client = client.clone();
        async move {
            let url: String = state.require(keys::QUEUE_URL)?;
            tolerate_missing(client.delete_queue(&url).await)?;
            anyhow::Ok(())
        }
        .boxed()
    })
}

fn delete_topic_step(client: SharedMessagingClient) -> Step {
    Step::action("delete_topic", move |state| {
        let client = client.clone();
        async move {
            let arn: String = state.require(keys::TOPIC_ARN)?;
            tolerate_missing(client.delete_topic(&arn).await)?;
            anyhow::Ok(())
        }
        .boxed()
    })
}

/// 이미 사라진 자원의 삭제는 완료로 취급한다.
fn tolerate_missing(result: Result<(), ServiceError>) -> Result<(), ServiceError> {
    match result {
        Err(ServiceError::NotFound { kind, id }) => {
            info!(kind, id = %id, "이미 삭제된 자원입니다.");
            Ok(())
        }
        other => other,
    }
}

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// 메시징 서비스가 돌려주는 예상 가능한 오류이다.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("{kind} '{name}'이(가) 이미 존재합니다.")]
    AlreadyExists { kind: &'static str, name: String },
    #[error("{kind} '{id}'을(를) 찾을 수 없습니다.")]
    NotFound { kind: &'static str, id: String },
    #[error("브로커 파일 {path} 처리 실패: {message}")]
    Storage { path: String, message: String },
}

impl ServiceError {
    fn storage(path: &Path, err: impl std::fmt::Display) -> Self {
        ServiceError::Storage {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}

/// 데모 시나리오가 사용하는 토픽/큐 메시징 클라이언트 추상화이다.
#[async_trait]
pub trait MessagingClient: Send + Sync {
    /// 토픽을 만들고 ARN을 반환한다.
    async fn create_topic(&self, name: &str) -> Result<String, ServiceError>;

    /// 이름으로 기존 토픽 ARN을 찾는다.
    async fn topic_arn(&self, name: &str) -> Result<String, ServiceError>;

    /// 큐를 만들고 URL을 반환한다.
    async fn create_queue(&self, name: &str) -> Result<String, ServiceError>;

    /// 이름으로 기존 큐 URL을 찾는다.
    async fn queue_url(&self, name: &str) -> Result<String, ServiceError>;

    /// 큐를 토픽에 구독시키고 구독 ARN을 반환한다.
    async fn subscribe(&self, topic_arn: &str, queue_url: &str) -> Result<String, ServiceError>;

    /// 토픽에 메시지를 발행하고 메시지 ID를 반환한다.
    async fn publish(&self, topic_arn: &str, body: &str) -> Result<String, ServiceError>;

    /// 큐에서 볼 수 있는 메시지를 모두 꺼낸다. 아직 없으면 빈 목록이다.
    async fn receive(&self, queue_url: &str) -> Result<Vec<String>, ServiceError>;

    async fn unsubscribe(&self, subscription_arn: &str) -> Result<(), ServiceError>;

    async fn delete_queue(&self, queue_url: &str) -> Result<(), ServiceError>;

    async fn delete_topic(&self, topic_arn: &str) -> Result<(), ServiceError>;
}

/// 클라이언트를 공유하기 위한 Arc 타입 별칭이다.
pub type SharedMessagingClient = Arc<dyn MessagingClient>;

const TOPIC_PREFIX: &str = "arn:memory:topic:";
const SUBSCRIPTION_PREFIX: &str = "arn:memory:subscription:";
const QUEUE_PREFIX: &str = "memory://queue/";

#[derive(Debug, Serialize, Deserialize)]
struct PendingMessage {
    body: String,
    /// 보이기까지 남은 receive 호출 수.
    remaining_polls: u32,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct Broker {
    /// 토픽 ARN → 토픽 이름.
    topics: HashMap<String, String>,
    /// 큐 URL → 대기 메시지.
    queues: HashMap<String, VecDeque<PendingMessage>>,
    /// 구독 ARN → (토픽 ARN, 큐 URL).
    subscriptions: HashMap<String, (String, String)>,
    next_id: u64,
}

impl Broker {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// 프로세스 메모리 안에서 동작하는 메시징 서비스 구현이다.
///
/// 발행된 메시지는 `delivery_delay`번의 receive 호출이 지난 뒤에 보인다.
/// [`open`](Self::open)으로 만들면 변경할 때마다 브로커 전체를 YAML 파일에 기록하므로
/// 다음 실행에서 같은 파일을 열어 자원을 이어 쓸 수 있다.
#[derive(Debug, Default)]
pub struct InMemoryMessaging {
    broker: Mutex<Broker>,
    delivery_delay: u32,
    store: Option<PathBuf>,
}

impl InMemoryMessaging {
    pub fn new() -> Self {
        Self::default()
    }

    /// 브로커 파일을 읽어 클라이언트를 만든다. 파일이 없으면 빈 브로커로 시작한다.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, ServiceError> {
        let path = path.into();
        let broker: Broker = match fs::read_to_string(&path).await {
            Ok(body) => {
                serde_yaml::from_str(&body).map_err(|err| ServiceError::storage(&path, err))?
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Broker::default(),
            Err(err) => return Err(ServiceError::storage(&path, err)),
        };
        debug!(
            path = %path.display(),
            topics = broker.topics.len(),
            queues = broker.queues.len(),
            "브로커 로드"
        );
        Ok(Self {
            broker: Mutex::new(broker),
            delivery_delay: 0,
            store: Some(path),
        })
    }

    /// 메시지 전달 지연(receive 호출 수)을 지정한다.
    pub fn with_delivery_delay(mut self, polls: u32) -> Self {
        self.delivery_delay = polls;
        self
    }

    /// 현재 존재하는 토픽, 큐, 구독 수를 반환한다.
    pub async fn resource_counts(&self) -> (usize, usize, usize) {
        let broker = self.broker.lock().await;
        (
            broker.topics.len(),
            broker.queues.len(),
            broker.subscriptions.len(),
        )
    }

    /// 파일에 연결된 클라이언트라면 브로커를 기록한다. 호출자는 잠금을 쥐고 있어야 한다.
    async fn save(&self, broker: &Broker) -> Result<(), ServiceError> {
        let Some(path) = &self.store else {
            return Ok(());
        };
        let body = serde_yaml::to_string(broker).map_err(|err| ServiceError::storage(path, err))?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|err| ServiceError::storage(path, err))?;
            }
        }
        fs::write(path, body)
            .await
            .map_err(|err| ServiceError::storage(path, err))
    }
}

#[async_trait]
impl MessagingClient for InMemoryMessaging {
    async fn create_topic(&self, name: &str) -> Result<String, ServiceError> {
        let arn = format!("{TOPIC_PREFIX}{name}");
        let mut broker = self.broker.lock().await;
        if broker.topics.contains_key(&arn) {
            return Err(ServiceError::AlreadyExists {
                kind: "topic",
                name: name.to_string(),
            });
        }
        broker.topics.insert(arn.clone(), name.to_string());
        self.save(&broker).await?;
        info!(topic = %arn, "토픽 생성");
        Ok(arn)
    }

    async fn topic_arn(&self, name: &str) -> Result<String, ServiceError> {
        let arn = format!("{TOPIC_PREFIX}{name}");
        let broker = self.broker.lock().await;
        if broker.topics.contains_key(&arn) {
            Ok(arn)
        } else {
            Err(ServiceError::NotFound {
                kind: "topic",
                id: name.to_string(),
            })
        }
    }

    async fn create_queue(&self, name: &str) -> Result<String, ServiceError> {
        let url = format!("{QUEUE_PREFIX}{name}");
        let mut broker = self.broker.lock().await;
        if broker.queues.contains_key(&url) {
            return Err(ServiceError::AlreadyExists {
                kind: "queue",
                name: name.to_string(),
            });
        }
        broker.queues.insert(url.clone(), VecDeque::new());
        self.save(&broker).await?;
        info!(queue = %url, "큐 생성");
        Ok(url)
    }

    async fn queue_url(&self, name: &str) -> Result<String, ServiceError> {
        let url = format!("{QUEUE_PREFIX}{name}");
        let broker = self.broker.lock().await;
        if broker.queues.contains_key(&url) {
            Ok(url)
        } else {
            Err(ServiceError::NotFound {
                kind: "queue",
                id: name.to_string(),
            })
        }
    }

    async fn subscribe(&self, topic_arn: &str, queue_url: &str) -> Result<String, ServiceError> {
        let mut broker = self.broker.lock().await;
        if !broker.topics.contains_key(topic_arn) {
            return Err(ServiceError::NotFound {
                kind: "topic",
                id: topic_arn.to_string(),
            });
        }
        if !broker.queues.contains_key(queue_url) {
            return Err(ServiceError::NotFound {
                kind: "queue",
                id: queue_url.to_string(),
            });
        }
        let arn = format!("{SUBSCRIPTION_PREFIX}{}", broker.next_id());
        broker
            .subscriptions
            .insert(arn.clone(), (topic_arn.to_string(), queue_url.to_string()));
        self.save(&broker).await?;
        info!(subscription = %arn, topic = topic_arn, queue = queue_url, "구독 생성");
        Ok(arn)
    }

    async fn publish(&self, topic_arn: &str, body: &str) -> Result<String, ServiceError> {
        let mut broker = self.broker.lock().await;
        if !broker.topics.contains_key(topic_arn) {
            return Err(ServiceError::NotFound {
                kind: "topic",
                id: topic_arn.to_string(),
            });
        }
        let targets: Vec<String> = broker
            .subscriptions
            .values()
            .filter(|(topic, _)| topic == topic_arn)
            .map(|(_, queue)| queue.clone())
            .collect();
        for url in &targets {
            if let Some(queue) = broker.queues.get_mut(url) {
                queue.push_back(PendingMessage {
                    body: body.to_string(),
                    remaining_polls: self.delivery_delay,
                });
            }
        }
        let message_id = format!("msg-{}", broker.next_id());
        self.save(&broker).await?;
        debug!(
            topic = topic_arn,
            message_id = %message_id,
            deliveries = targets.len(),
            "메시지 발행"
        );
        Ok(message_id)
    }

    async fn receive(&self, queue_url: &str) -> Result<Vec<String>, ServiceError> {
        let mut broker = self.broker.lock().await;
        let queue = broker
            .queues
            .get_mut(queue_url)
            .ok_or_else(|| ServiceError::NotFound {
                kind: "queue",
                id: queue_url.to_string(),
            })?;
        let mut visible = Vec::new();
        let mut waiting = VecDeque::new();
        while let Some(mut message) = queue.pop_front() {
            if message.remaining_polls == 0 {
                visible.push(message.body);
            } else {
                message.remaining_polls -= 1;
                waiting.push_back(message);
            }
        }
        *queue = waiting;
        self.save(&broker).await?;
        Ok(visible)
    }

    async fn unsubscribe(&self, subscription_arn: &str) -> Result<(), ServiceError> {
        let mut broker = self.broker.lock().await;
        if broker.subscriptions.remove(subscription_arn).is_none() {
            return Err(ServiceError::NotFound {
                kind: "subscription",
                id: subscription_arn.to_string(),
            });
        }
        self.save(&broker).await?;
        info!(subscription = subscription_arn, "구독 해제");
        Ok(())
    }

    async fn delete_queue(&self, queue_url: &str) -> Result<(), ServiceError> {
        let mut broker = self.broker.lock().await;
        if broker.queues.remove(queue_url).is_none() {
            return Err(ServiceError::NotFound {
                kind: "queue",
                id: queue_url.to_string(),
            });
        }
        broker.subscriptions.retain(|_, (_, queue)| queue != queue_url);
        self.save(&broker).await?;
        info!(queue = queue_url, "큐 삭제");
        Ok(())
    }

    async fn delete_topic(&self, topic_arn: &str) -> Result<(), ServiceError> {
        let mut broker = self.broker.lock().await;
        if broker.topics.remove(topic_arn).is_none() {
            return Err(ServiceError::NotFound {
                kind: "topic",
                id: topic_arn.to_string(),
            });
        }
        broker.subscriptions.retain(|_, (topic, _)| topic != topic_arn);
        self.save(&broker).await?;
        info!(topic = topic_arn, "토픽 삭제");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 같은 이름으로 다시 만들면 AlreadyExists가 반환되고 조회로 기존 값을 얻는다.
    #[tokio::test]
    async fn duplicate_create_reports_already_exists() {
        let client = InMemoryMessaging::new();
        let arn = client.create_topic("orders").await.expect("토픽 생성 실패");
        assert_eq!(
            client.create_topic("orders").await,
            Err(ServiceError::AlreadyExists {
                kind: "topic",
                name: "orders".into()
            })
        );
        assert_eq!(client.topic_arn("orders").await, Ok(arn));
        assert!(matches!(
            client.queue_url("missing").await,
            Err(ServiceError::NotFound { kind: "queue", .. })
        ));
    }

    /// 발행된 메시지는 지연 횟수만큼 receive한 뒤에 보인다.
    #[tokio::test]
    async fn published_message_is_visible_after_delay() {
        let client = InMemoryMessaging::new().with_delivery_delay(2);
        let topic = client.create_topic("t").await.expect("토픽 생성 실패");
        let queue = client.create_queue("q").await.expect("큐 생성 실패");
        client.subscribe(&topic, &queue).await.expect("구독 실패");
        client.publish(&topic, "hello").await.expect("발행 실패");

        assert!(client.receive(&queue).await.expect("수신 실패").is_empty());
        assert!(client.receive(&queue).await.expect("수신 실패").is_empty());
        assert_eq!(client.receive(&queue).await.expect("수신 실패"), vec!["hello"]);
        assert!(client.receive(&queue).await.expect("수신 실패").is_empty());
    }

    #[tokio::test]
    async fn unsubscribed_queue_receives_nothing() {
        let client = InMemoryMessaging::new();
        let topic = client.create_topic("t").await.expect("토픽 생성 실패");
        let queue = client.create_queue("q").await.expect("큐 생성 실패");
        let sub = client.subscribe(&topic, &queue).await.expect("구독 실패");
        client.unsubscribe(&sub).await.expect("구독 해제 실패");
        client.publish(&topic, "lost").await.expect("발행 실패");
        assert!(client.receive(&queue).await.expect("수신 실패").is_empty());
        assert!(client.unsubscribe(&sub).await.is_err());
    }

    #[tokio::test]
    async fn deleting_topic_drops_its_subscriptions() {
        let client = InMemoryMessaging::new();
        let topic = client.create_topic("t").await.expect("토픽 생성 실패");
        let queue = client.create_queue("q").await.expect("큐 생성 실패");
        client.subscribe(&topic, &queue).await.expect("구독 실패");
        client.delete_topic(&topic).await.expect("토픽 삭제 실패");
        assert_eq!(client.resource_counts().await, (0, 1, 0));
        client.delete_queue(&queue).await.expect("큐 삭제 실패");
        assert_eq!(client.resource_counts().await, (0, 0, 0));
        assert!(client.delete_queue(&queue).await.is_err());
    }

    /// 같은 브로커 파일을 연 두 번째 클라이언트가 자원과 대기 메시지를 이어받는다.
    #[tokio::test]
    async fn reopened_broker_keeps_resources_and_messages() {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("시스템 시간이 UTC epoch 이전입니다.")
            .as_nanos();
        let base_dir = std::env::temp_dir().join(format!("rust_scenario_broker_{nanos}"));
        let path = base_dir.join("state.broker.yaml");

        let first = InMemoryMessaging::open(&path)
            .await
            .expect("브로커 열기 실패")
            .with_delivery_delay(1);
        assert_eq!(first.resource_counts().await, (0, 0, 0));
        let topic = first.create_topic("t").await.expect("토픽 생성 실패");
        let queue = first.create_queue("q").await.expect("큐 생성 실패");
        first.subscribe(&topic, &queue).await.expect("구독 실패");
        first.publish(&topic, "hello").await.expect("발행 실패");
        drop(first);

        let second = InMemoryMessaging::open(&path).await.expect("브로커 열기 실패");
        assert_eq!(second.resource_counts().await, (1, 1, 1));
        assert_eq!(second.topic_arn("t").await, Ok(topic.clone()));
        assert!(second.receive(&queue).await.expect("수신 실패").is_empty());
        assert_eq!(second.receive(&queue).await.expect("수신 실패"), vec!["hello"]);
        // ID 카운터도 이어받으므로 새 구독이 이전 구독을 덮어쓰지 않는다.
        second.subscribe(&topic, &queue).await.expect("구독 실패");
        assert_eq!(second.resource_counts().await, (1, 1, 2));

        second.delete_topic(&topic).await.expect("토픽 삭제 실패");
        second.delete_queue(&queue).await.expect("큐 삭제 실패");
        let third = InMemoryMessaging::open(&path).await.expect("브로커 열기 실패");
        assert_eq!(third.resource_counts().await, (0, 0, 0));

        let _ = std::fs::remove_dir_all(&base_dir);
    }

    #[tokio::test]
    async fn malformed_broker_file_is_a_storage_error() {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("시스템 시간이 UTC epoch 이전입니다.")
            .as_nanos();
        let path = std::env::temp_dir().join(format!("rust_scenario_bad_broker_{nanos}.yaml"));
        std::fs::write(&path, "topics: [not, a, map").expect("파일 작성 실패");

        let err = InMemoryMessaging::open(&path).await.expect_err("잘못된 파일이 허용됨");
        assert!(matches!(err, ServiceError::Storage { .. }));

        let _ = std::fs::remove_file(&path);
    }
}

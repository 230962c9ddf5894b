use crate::prompter::PromptAnswer;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

/// 입력 Step이 보낸 질문과 콘솔이 돌려줄 응답을 요청 번호로 짝지어 둔다.
///
/// [`BridgePrompter`](crate::prompter::BridgePrompter)가 질문마다 번호를 받아
/// `EngineEvent::PromptRequested`로 내보내고, 이벤트를 소비하는 쪽은 같은 번호로
/// [`respond`](Self::respond) 또는 [`cancel`](Self::cancel)을 호출한다.
/// 복제본은 모두 같은 대기 목록을 공유한다.
#[derive(Clone, Debug, Default)]
pub struct PromptBridge {
    waiting: Arc<Mutex<Waiting>>,
}

/// 아직 답을 받지 못한 질문 목록.
#[derive(Debug, Default)]
struct Waiting {
    last_id: u64,
    answers: HashMap<u64, oneshot::Sender<PromptAnswer>>,
}

impl PromptBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// 질문 하나를 대기 목록에 올린다. 번호는 1부터 증가하며,
    /// 반환된 Receiver는 응답을 받거나 질문이 취소되면 완료된다.
    pub fn register(&self) -> (u64, oneshot::Receiver<PromptAnswer>) {
        let (tx, rx) = oneshot::channel();
        let mut waiting = self.waiting.lock().expect("PromptBridge mutex poisoned");
        waiting.last_id += 1;
        let request_id = waiting.last_id;
        waiting.answers.insert(request_id, tx);
        (request_id, rx)
    }

    /// 응답을 질문한 입력 Step에 전달한다.
    ///
    /// 이미 답했거나 취소된 번호, 또는 질문한 쪽이 더 이상 기다리지 않는
    /// 경우에는 `false`를 반환한다.
    pub fn respond(&self, request_id: u64, answer: PromptAnswer) -> bool {
        match self.take(request_id) {
            Some(sender) => sender.send(answer).is_ok(),
            None => false,
        }
    }

    /// 답할 수 없는 질문을 목록에서 뺀다. 기다리던 입력 Step은 수신 오류로 실패한다.
    pub fn cancel(&self, request_id: u64) -> bool {
        self.take(request_id).is_some()
    }

    pub fn pending(&self) -> usize {
        self.waiting
            .lock()
            .expect("PromptBridge mutex poisoned")
            .answers
            .len()
    }

    fn take(&self, request_id: u64) -> Option<oneshot::Sender<PromptAnswer>> {
        self.waiting
            .lock()
            .expect("PromptBridge mutex poisoned")
            .answers
            .remove(&request_id)
    }
}

use crate::error::PollError;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

/// Step 내부 폴링 설정이다. 시도 횟수가 곧 제한 시간 역할을 한다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// 시도 사이 대기 시간.
    pub interval: Duration,
    /// 최대 시도 횟수.
    pub max_attempts: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_attempts: 60,
        }
    }
}

/// 한 번의 폴링 결과이다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStatus<T> {
    /// 아직 완료되지 않았다.
    Pending,
    /// 완료되어 값을 반환한다.
    Done(T),
}

/// 완료 상태가 될 때까지 고정 간격으로 `check`를 호출한다.
///
/// # 매개변수
/// - `settings`: 대기 간격과 최대 시도 횟수.
/// - `check`: 1부터 시작하는 시도 번호를 받아 상태를 확인하는 함수.
///
/// # 반환값
/// 처음 `Done`이 된 값을 반환한다. `check` 오류는 즉시 반환하고,
/// 최대 횟수를 넘기면 [`PollError::Exhausted`]를 반환한다.
pub async fn poll_until<T, F, Fut>(settings: &PollSettings, mut check: F) -> anyhow::Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = anyhow::Result<PollStatus<T>>>,
{
    let max_attempts = settings.max_attempts.max(1);
    for attempt in 1..=max_attempts {
        match check(attempt).await? {
            PollStatus::Done(value) => return Ok(value),
            PollStatus::Pending => {
                debug!(attempt, max_attempts, "아직 완료되지 않아 대기");
                if attempt < max_attempts {
                    sleep(settings.interval).await;
                }
            }
        }
    }
    Err(PollError::Exhausted {
        attempts: max_attempts,
    }
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast(max_attempts: u32) -> PollSettings {
        PollSettings {
            interval: Duration::from_millis(1),
            max_attempts,
        }
    }

    #[tokio::test]
    async fn stops_at_first_done() {
        let mut calls = 0;
        let value = poll_until(&fast(10), |attempt| {
            calls += 1;
            async move {
                if attempt >= 3 {
                    anyhow::Ok(PollStatus::Done(attempt * 10))
                } else {
                    anyhow::Ok(PollStatus::Pending)
                }
            }
        })
        .await
        .expect("폴링 실패");
        assert_eq!(value, 30);
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn exhaustion_is_reported() {
        let err = poll_until(&fast(2), |_| async { anyhow::Ok(PollStatus::<()>::Pending) })
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PollError>(),
            Some(PollError::Exhausted { attempts: 2 })
        ));
    }

    #[tokio::test]
    async fn check_error_is_returned_immediately() {
        let mut calls = 0;
        let result: anyhow::Result<()> = poll_until(&fast(5), |_| {
            calls += 1;
            async { Err(anyhow::anyhow!("job failed")) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }
}

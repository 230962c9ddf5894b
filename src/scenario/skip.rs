//! 자주 쓰는 skip 조건 모음.
//!
//! 모든 조건은 상태만 읽는 순수 함수이므로 같은 상태에서 다시 평가해도 결과가 같다.

use super::SkipPredicate;
use crate::engine::State;

/// 조기 종료가 요청되었으면 건너뛴다.
pub fn on_early_exit() -> impl Fn(&State) -> bool + Send + Sync + 'static {
    |state: &State| state.early_exit()
}

/// 오류가 하나라도 기록되었으면 건너뛴다.
pub fn on_errors() -> impl Fn(&State) -> bool + Send + Sync + 'static {
    |state: &State| state.has_errors()
}

/// 기록된 오류가 없으면 건너뛴다. 오류 보고 Step에 사용한다.
pub fn without_errors() -> impl Fn(&State) -> bool + Send + Sync + 'static {
    |state: &State| !state.has_errors()
}

/// `key`에 저장된 확인 응답이 `true`가 아니면 건너뛴다.
pub fn unless_confirmed(key: &str) -> impl Fn(&State) -> bool + Send + Sync + 'static {
    let key = key.to_string();
    move |state: &State| state.get_bool(&key) != Some(true)
}

/// `key`가 상태에 없으면 건너뛴다.
pub fn missing(key: &str) -> impl Fn(&State) -> bool + Send + Sync + 'static {
    let key = key.to_string();
    move |state: &State| !state.contains(&key)
}

/// 두 조건 중 하나라도 참이면 건너뛴다.
pub fn either<A, B>(first: A, second: B) -> impl Fn(&State) -> bool + Send + Sync + 'static
where
    A: Fn(&State) -> bool + Send + Sync + 'static,
    B: Fn(&State) -> bool + Send + Sync + 'static,
{
    move |state: &State| first(state) || second(state)
}

/// 조건 중 하나라도 참이면 건너뛴다.
pub fn any(predicates: Vec<SkipPredicate>) -> impl Fn(&State) -> bool + Send + Sync + 'static {
    move |state: &State| predicates.iter().any(|p| p(state))
}

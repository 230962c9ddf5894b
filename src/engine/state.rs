use crate::error::StateError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([A-Za-z0-9_.\-]+)\}").expect("정규식 컴파일 실패"));

/// Step에서 기록한 오류 한 건이다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedError {
    /// 오류를 기록한 Step 이름.
    pub step: String,
    /// 오류 메시지.
    pub message: String,
}

/// 시나리오 실행 중 모든 Step이 공유하는 상태 저장소이다.
///
/// 값은 문자열 키로 저장되며 접근 시점에 타입을 지정한다.
/// 오류 목록은 추가만 가능하고 실행 중 줄어들지 않는다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    /// Step이 기록한 값 저장소이다.
    #[serde(default)]
    values: BTreeMap<String, Value>,
    /// 누적된 오류 목록이다.
    #[serde(default)]
    errors: Vec<RecordedError>,
    /// 조기 종료 요청 여부이다.
    #[serde(default)]
    early_exit: bool,
}

impl State {
    /// 비어 있는 상태를 생성한다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 값을 직렬화하여 저장한다.
    ///
    /// # 매개변수
    /// - `key`: 저장할 키.
    /// - `value`: 직렬화 가능한 값.
    pub fn set<T: Serialize>(
        &mut self,
        key: impl Into<String>,
        value: T,
    ) -> Result<(), StateError> {
        let key = key.into();
        let value = serde_yaml::to_value(value).map_err(|source| StateError::Convert {
            key: key.clone(),
            source,
        })?;
        self.values.insert(key, value);
        Ok(())
    }

    /// 값을 요청한 타입으로 조회한다.
    ///
    /// # 반환값
    /// 키가 없으면 `Ok(None)`, 변환에 실패하면 오류를 반환한다.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StateError> {
        match self.values.get(key) {
            Some(value) => serde_yaml::from_value(value.clone())
                .map(Some)
                .map_err(|source| StateError::Convert {
                    key: key.to_string(),
                    source,
                }),
            None => Ok(None),
        }
    }

    /// 반드시 존재해야 하는 값을 조회한다.
    pub fn require<T: DeserializeOwned>(&self, key: &str) -> Result<T, StateError> {
        self.get(key)?
            .ok_or_else(|| StateError::MissingKey(key.to_string()))
    }

    /// 원시 값을 조회한다.
    pub fn get_value(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.values.get(key).and_then(Value::as_bool)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    /// 키 존재 여부를 확인한다.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// 저장된 키 목록을 정렬 순서로 반환한다.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(|k| k.as_str())
    }

    /// 오류를 기록한다. 메시지는 원인 체인을 포함한다.
    pub fn record_error(&mut self, step: impl Into<String>, error: &anyhow::Error) {
        self.record_message(step, format!("{error:#}"));
    }

    /// 문자열 메시지로 오류를 기록한다.
    pub fn record_message(&mut self, step: impl Into<String>, message: impl Into<String>) {
        self.errors.push(RecordedError {
            step: step.into(),
            message: message.into(),
        });
    }

    /// 누적된 오류 목록을 반환한다.
    pub fn errors(&self) -> &[RecordedError] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// 조기 종료를 요청한다. 이후 Step은 skip 조건으로 스스로 건너뛴다.
    pub fn request_early_exit(&mut self) {
        self.early_exit = true;
    }

    pub fn early_exit(&self) -> bool {
        self.early_exit
    }

    /// 다른 상태를 병합한다.
    ///
    /// 값은 덮어쓰고 조기 종료 플래그는 OR 연산한다. 오류는 두 목록이 공유하는
    /// 앞부분을 건너뛰고 나머지를 뒤에 이어 붙이므로, 같은 실행에서 먼저 저장한
    /// 스냅샷을 다시 병합해도 중복되지 않고 같은 오류의 반복 기록은 유지된다.
    pub fn merge(&mut self, other: State) {
        self.values.extend(other.values);
        let shared = self
            .errors
            .iter()
            .zip(&other.errors)
            .take_while(|(mine, theirs)| mine == theirs)
            .count();
        self.errors.extend(other.errors.into_iter().skip(shared));
        self.early_exit |= other.early_exit;
    }

    /// `${key}` 패턴을 상태 값 또는 환경 변수로 치환한다.
    ///
    /// # 매개변수
    /// - `template`: 치환할 원본 문자열.
    ///
    /// # 반환값
    /// 치환하지 못한 플레이스홀더가 남으면 오류를 반환한다.
    pub fn expand_placeholders(&self, template: &str) -> anyhow::Result<String> {
        expand_with(template, |key| {
            self.values
                .get(key)
                .map(render_value)
                .or_else(|| std::env::var(key).ok())
        })
    }
}

/// 조회 함수를 사용해 `${key}` 패턴을 치환한다.
pub(crate) fn expand_with<F>(template: &str, lookup: F) -> anyhow::Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut missing: Vec<String> = Vec::new();
    let result = PLACEHOLDER.replace_all(template, |caps: &regex::Captures| {
        let key = &caps[1];
        match lookup(key) {
            Some(value) => value,
            None => {
                missing.push(key.to_string());
                caps[0].to_string()
            }
        }
    });
    if !missing.is_empty() {
        anyhow::bail!("플레이스홀더 치환 실패: {}", missing.join(", "));
    }
    Ok(result.into_owned())
}

/// 상태 값을 사람이 읽을 수 있는 문자열로 변환한다.
fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => String::new(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

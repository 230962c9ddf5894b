use super::state::State;
use crate::error::StateError;
use std::path::Path;
use tokio::fs;
use tracing::debug;

/// 상태 전체를 YAML 파일로 저장한다. 상위 디렉터리가 없으면 생성한다.
pub async fn save_state(path: &Path, state: &State) -> Result<(), StateError> {
    let shown = path.display().to_string();
    let body = serde_yaml::to_string(state).map_err(|source| StateError::Format {
        path: shown.clone(),
        source,
    })?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| StateError::Io {
                    path: shown.clone(),
                    source,
                })?;
        }
    }
    fs::write(path, body)
        .await
        .map_err(|source| StateError::Io {
            path: shown.clone(),
            source,
        })?;
    debug!(path = %shown, keys = state.keys().count(), "상태 저장 완료");
    Ok(())
}

/// YAML 파일에서 상태를 읽어온다.
pub async fn load_state(path: &Path) -> Result<State, StateError> {
    let shown = path.display().to_string();
    let body = fs::read_to_string(path)
        .await
        .map_err(|source| StateError::Io {
            path: shown.clone(),
            source,
        })?;
    let state: State = serde_yaml::from_str(&body).map_err(|source| StateError::Format {
        path: shown.clone(),
        source,
    })?;
    debug!(path = %shown, keys = state.keys().count(), "상태 로드 완료");
    Ok(state)
}

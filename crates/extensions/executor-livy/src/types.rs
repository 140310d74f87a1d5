//! Livy wire types.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use dqjobs_protocols::{ExecutionError, RemoteSession, SessionState};

/// Body of `POST /batches`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BatchRequest<'a> {
    pub file: &'a str,
    pub class_name: &'a str,
    pub name: &'a str,
    pub args: Vec<String>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub conf: &'a HashMap<String, String>,
}

/// Interpret a Livy batch body.
///
/// A missing `state` is not an error; the caller decides what to do with a
/// session whose state is unknown to the response.
pub(crate) fn parse_session(body: &str, spark_uri: &str) -> Result<RemoteSession, ExecutionError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| ExecutionError::MalformedBody(e.to_string()))?;
    let object = value
        .as_object()
        .ok_or_else(|| ExecutionError::MalformedBody(format!("expected an object, got {value}")))?;

    let state = match object.get("state") {
        None | Some(Value::Null) => None,
        Some(Value::String(raw)) => Some(
            raw.parse::<SessionState>()
                .map_err(ExecutionError::UnrecognizedState)?,
        ),
        Some(other) => return Err(ExecutionError::UnrecognizedState(other.to_string())),
    };

    let app_id = match object.get("appId") {
        Some(Value::String(id)) if !id.is_empty() => Some(id.clone()),
        Some(Value::Number(id)) => Some(id.to_string()),
        _ => None,
    };
    let app_uri = app_id
        .as_ref()
        .map(|id| format!("{}/cluster/app/{}", spark_uri.trim_end_matches('/'), id));

    Ok(RemoteSession {
        id: object.get("id").and_then(Value::as_i64),
        state,
        app_id,
        app_uri,
    })
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP surface for `linkflow-rpc`'s `Request`/`Response` methods (§6). One
//! route accepts the whole `Request` enum as JSON and returns the matching
//! `Response` variant; errors are folded into `Response::Error` rather than
//! surfaced as non-2xx statuses, since the RPC envelope already carries a
//! status family via [`RpcError::status_code`].

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use linkflow_core::{CoreErrorKind, ExecutionKey};
use linkflow_rpc::{ExecutionInfo, ExecutionRef, ExecutionSummary, Request, Response, RpcError};
use linkflow_storage::{EventStore, MutableStateStore, VisibilityStore};
use linkflow_workflow::WorkflowDefinition;

use crate::error::{engine_error_to_rpc, storage_error_to_rpc};
use crate::shard::Daemon;

pub fn router(daemon: Arc<Daemon>) -> Router {
    Router::new().route("/rpc", post(handle)).with_state(daemon)
}

async fn handle(State(daemon): State<Arc<Daemon>>, Json(request): Json<Request>) -> Json<Response> {
    Json(dispatch(&daemon, request).await)
}

async fn dispatch(daemon: &Arc<Daemon>, request: Request) -> Response {
    match request {
        Request::Ping => Response::Pong,
        Request::StartWorkflow(req) => start_workflow(daemon, req).await,
        Request::GetExecution(execution_ref) => get_execution(daemon, execution_ref.into()).await,
        Request::CancelWorkflow(req) => cancel_workflow(daemon, req).await,
        Request::SendSignal(req) => send_signal(daemon, req).await,
        Request::RetryExecution(req) => retry_execution(daemon, req).await,
        Request::ListOpenExecutions(req) => list_executions(daemon, req, true).await,
        Request::ListClosedExecutions(req) => list_executions(daemon, req, false).await,
    }
}

async fn start_workflow(daemon: &Arc<Daemon>, req: linkflow_rpc::StartWorkflowRequest) -> Response {
    let shard_id = linkflow_core::shard_of(&req.namespace_id, &req.workflow_id, daemon.shard_count);
    let engine = daemon.engine_for(shard_id);

    match engine
        .start_workflow(
            req.namespace_id,
            req.workflow_id,
            req.workflow_type,
            req.definition,
            req.input,
            req.idempotency_key,
            Utc::now(),
        )
        .await
    {
        Ok((run_id, outcome)) => {
            Response::StartWorkflow(linkflow_rpc::StartWorkflowResponse { run_id, started: outcome.started })
        }
        Err(err) => Response::Error(engine_error_to_rpc(err)),
    }
}

/// Assembled from [`MutableStateStore`] and the `WorkflowStarted` event's
/// payload rather than the Visibility Store, which has no point-lookup
/// method by design (§4.I lists only `list_open`/`list_closed`). `close_time`
/// is left unset: deriving it exactly would mean scanning the namespace's
/// visibility pages for this `run_id`, which this read path avoids.
async fn get_execution(daemon: &Arc<Daemon>, key: ExecutionKey) -> Response {
    let shard = daemon.shard_for(&key);

    let state = match shard.state.get(&key).await {
        Ok(state) => state,
        Err(err) => return Response::Error(storage_error_to_rpc(err)),
    };

    let workflow_type = match started_event_workflow_type(shard, &key).await {
        Ok(workflow_type) => workflow_type,
        Err(rpc) => return Response::Error(rpc),
    };

    let history_length = match shard.events.get_event_count(&key).await {
        Ok(count) => count,
        Err(err) => return Response::Error(storage_error_to_rpc(err)),
    };

    Response::Execution(ExecutionInfo {
        execution: ExecutionRef::from(&key),
        workflow_type,
        status: state.workflow_status,
        start_time: state.execution_start_time,
        close_time: None,
        history_length,
        current_input: state.current_input,
        failed_node_id: state.failed_node_id,
    })
}

async fn cancel_workflow(daemon: &Arc<Daemon>, req: linkflow_rpc::CancelWorkflowRequest) -> Response {
    let key: ExecutionKey = req.execution.into();
    let engine = daemon.engine_for(key.shard_id(daemon.shard_count));

    match engine.cancel_workflow(&key, &req.reason, Utc::now()).await {
        Ok(()) => Response::Canceled,
        Err(err) => Response::Error(engine_error_to_rpc(err)),
    }
}

async fn send_signal(daemon: &Arc<Daemon>, req: linkflow_rpc::SendSignalRequest) -> Response {
    let key: ExecutionKey = req.execution.into();
    let engine = daemon.engine_for(key.shard_id(daemon.shard_count));

    match engine.receive_signal(&key, &req.signal_name, req.data, Utc::now()).await {
        Ok(()) => Response::SignalSent,
        Err(err) => Response::Error(engine_error_to_rpc(err)),
    }
}

/// Starts a fresh run of the closed execution's `(namespace_id, workflow_id)`
/// under a new `run_id`, replaying the original `workflow_type`, definition,
/// and last recorded input read back from the `WorkflowStarted` event and
/// current `MutableState` (mirrors the engine's own `load_definition`).
async fn retry_execution(daemon: &Arc<Daemon>, req: linkflow_rpc::RetryExecutionRequest) -> Response {
    let key: ExecutionKey = req.execution.into();
    let shard = daemon.shard_for(&key);

    let state = match shard.state.get(&key).await {
        Ok(state) => state,
        Err(err) => return Response::Error(storage_error_to_rpc(err)),
    };

    let (workflow_type, definition) = match started_event(shard, &key).await {
        Ok(parsed) => parsed,
        Err(rpc) => return Response::Error(rpc),
    };

    let engine = daemon.engine_for(key.shard_id(daemon.shard_count));
    match engine
        .start_workflow(
            key.namespace_id,
            key.workflow_id,
            workflow_type,
            definition,
            state.current_input,
            None,
            Utc::now(),
        )
        .await
    {
        Ok((run_id, _outcome)) => Response::RetryExecution(linkflow_rpc::RetryExecutionResponse { run_id }),
        Err(err) => Response::Error(engine_error_to_rpc(err)),
    }
}

async fn list_executions(daemon: &Arc<Daemon>, req: linkflow_rpc::ListExecutionsRequest, open: bool) -> Response {
    let page = if open {
        daemon.visibility.list_open(&req.namespace_id, req.page_size, req.page_token.as_deref()).await
    } else {
        daemon.visibility.list_closed(&req.namespace_id, req.page_size, req.page_token.as_deref()).await
    };

    match page {
        Ok(page) => {
            let executions = page
                .records
                .into_iter()
                .map(|record| ExecutionSummary {
                    execution: ExecutionRef::from(&ExecutionKey::new(
                        record.namespace_id,
                        record.workflow_id,
                        record.run_id,
                    )),
                    workflow_type: record.workflow_type,
                    status: record.status,
                    start_time: record.start_time,
                    close_time: record.close_time,
                })
                .collect();
            Response::Executions(linkflow_rpc::ListExecutionsResponse { executions, next_page_token: page.next_page_token })
        }
        Err(err) => Response::Error(storage_error_to_rpc(err)),
    }
}

async fn started_event_workflow_type(
    shard: &Arc<crate::shard::ShardHandle>,
    key: &ExecutionKey,
) -> Result<String, RpcError> {
    let (workflow_type, _definition) = started_event(shard, key).await?;
    Ok(workflow_type)
}

async fn started_event(
    shard: &Arc<crate::shard::ShardHandle>,
    key: &ExecutionKey,
) -> Result<(String, WorkflowDefinition), RpcError> {
    let events = shard
        .events
        .get_events(key, 1, 1)
        .await
        .map_err(storage_error_to_rpc)?;
    let started = events
        .first()
        .ok_or_else(|| RpcError::new(CoreErrorKind::NotFound, "WorkflowStarted event missing from history"))?;

    let workflow_type = started.payload["workflow_type"]
        .as_str()
        .ok_or_else(|| RpcError::new(CoreErrorKind::InvalidWorkflow, "WorkflowStarted payload missing workflow_type"))?
        .to_string();
    let definition: WorkflowDefinition = serde_json::from_value(started.payload["workflow_def"].clone())
        .map_err(|err| RpcError::new(CoreErrorKind::InvalidWorkflow, err.to_string()))?;

    Ok((workflow_type, definition))
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;

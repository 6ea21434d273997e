//! The gRPC transport adapter. Translates between the wire protocol and the
//! [`QuotaService`] facade contract; never reaches into `BucketContainer`
//! internals directly.
//!
//! Out of the core's scope per spec §1 ("the RPC transport and its
//! request/response encoding") but required ambient plumbing for a runnable
//! service.

/// Generated protobuf/tonic types and server trait.
pub mod pb {
    tonic::include_proto!("quota");
}

use std::time::Duration;

use tonic::{Request, Response, Status};

use crate::error::QuotaError;
use crate::service::QuotaService;
use pb::quota_service_server::QuotaService as QuotaServiceRpc;
use pb::{AllowRequest, AllowResponse};

/// Adapts [`QuotaService`] to the generated `QuotaService` gRPC trait.
pub struct QuotaGrpc {
    facade: QuotaService,
}

impl QuotaGrpc {
    /// Wraps `facade` for serving over gRPC.
    pub fn new(facade: QuotaService) -> Self {
        Self { facade }
    }
}

#[tonic::async_trait]
impl QuotaServiceRpc for QuotaGrpc {
    async fn allow(
        &self,
        request: Request<AllowRequest>,
    ) -> Result<Response<AllowResponse>, Status> {
        let req = request.into_inner();

        if req.namespace.is_empty() || req.name.is_empty() {
            return Ok(Response::new(failed_response()));
        }
        if req.num_tokens_requested == Some(0) {
            return Ok(Response::new(failed_response()));
        }

        let max_wait_override = if req.max_wait_millis_override < 0 {
            None
        } else {
            Some(Duration::from_millis(req.max_wait_millis_override as u64))
        };

        match self
            .facade
            .allow(
                &req.namespace,
                &req.name,
                req.num_tokens_requested,
                max_wait_override,
            )
            .await
        {
            Ok(result) => {
                let status = if result.wait.is_zero() {
                    pb::Status::Ok
                } else {
                    pb::Status::OkWait
                };
                Ok(Response::new(AllowResponse {
                    status: status as i32,
                    num_tokens_granted: result.granted_tokens,
                    wait_millis: result.wait.as_millis() as i64,
                }))
            }
            Err(QuotaError::NoSuchBucket) | Err(QuotaError::TimedOutWaiting) => {
                Ok(Response::new(rejected_response()))
            }
            Err(QuotaError::Rejected { .. }) => Ok(Response::new(rejected_response())),
            Err(QuotaError::Failed(_)) => Ok(Response::new(failed_response())),
        }
    }
}

fn rejected_response() -> AllowResponse {
    AllowResponse {
        status: pb::Status::Rejected as i32,
        num_tokens_granted: 0,
        wait_millis: 0,
    }
}

fn failed_response() -> AllowResponse {
    AllowResponse {
        status: pb::Status::Failed as i32,
        num_tokens_granted: 0,
        wait_millis: 0,
    }
}

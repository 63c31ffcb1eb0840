use std::sync::Arc;

use poem::Result as PoemResult;
use poem_openapi::{
    OpenApi,
    param::{Path, Query},
    payload::Json,
};
use ulid::Ulid;

use crate::{
    application::usecases::{
        get_message_history::GetMessageHistoryRequest, send_message::SendMessageRequest,
    },
    domain::errors::DomainError,
    presentation::http::{
        endpoints::root::{ApiState, EndpointsTags},
        mappers::{map_detail, map_summary},
        requests::SendMessageRequestDto,
        responses::{MessageDetailDto, PaginatedMessagesDto, SendMessageResponseDto},
    },
};

const DEFAULT_PAGE_SIZE: u32 = 50;

#[derive(Clone)]
pub struct MessagesEndpoints {
    state: Arc<ApiState>,
}

impl MessagesEndpoints {
    pub fn new(state: Arc<ApiState>) -> Self {
        Self { state }
    }
}

#[OpenApi]
impl MessagesEndpoints {
    #[oai(
        path = "/messages",
        method = "post",
        tag = EndpointsTags::Messages,
    )]
    pub async fn send_message(
        &self,
        request: Json<SendMessageRequestDto>,
    ) -> PoemResult<Json<SendMessageResponseDto>> {
        let sent_by = parse_ulid(&request.sent_by)?;
        let to = request
            .to
            .iter()
            .map(|id| parse_ulid(id))
            .collect::<PoemResult<Vec<_>>>()?;

        let payload = SendMessageRequest {
            sent_by,
            to,
            body: request.body.clone(),
            priority: request.priority.into(),
        };

        let response = self
            .state
            .send_message_usecase
            .execute(payload)
            .await
            .map_err(|e| match e.downcast_ref::<DomainError>() {
                Some(DomainError::Validation(_)) => bad_request(e),
                _ => internal_error(e),
            })?;

        Ok(Json(SendMessageResponseDto {
            message_id: response.message_id.to_string(),
        }))
    }

    #[oai(
        path = "/messages",
        method = "get",
        tag = EndpointsTags::Messages,
    )]
    pub async fn list_messages(
        &self,
        sent_by: Query<Option<String>>,
        search: Query<Option<String>>,
        limit: Query<Option<u32>>,
        offset: Query<Option<u32>>,
    ) -> PoemResult<Json<PaginatedMessagesDto>> {
        let sent_by = match &sent_by.0 {
            Some(id) => Some(parse_ulid(id)?),
            None => None,
        };
        let offset = offset.0.unwrap_or(0);

        let result = self
            .state
            .message_history_usecase
            .execute(GetMessageHistoryRequest {
                sent_by,
                search: search.0.clone(),
                limit: limit.0.unwrap_or(DEFAULT_PAGE_SIZE),
                offset,
            })
            .await
            .map_err(internal_error)?;

        let next_offset = result
            .has_more
            .then(|| offset + result.entries.len() as u32);

        Ok(Json(PaginatedMessagesDto {
            messages: result.entries.iter().map(map_summary).collect(),
            has_more: result.has_more,
            next_offset,
        }))
    }

    #[oai(
        path = "/messages/:message_id",
        method = "get",
        tag = EndpointsTags::Messages,
    )]
    pub async fn get_message(
        &self,
        message_id: Path<String>,
    ) -> PoemResult<Json<MessageDetailDto>> {
        let message_id = parse_ulid(&message_id.0)?;

        let detail = self
            .state
            .message_detail_usecase
            .execute(message_id)
            .await
            .map_err(internal_error)?
            .ok_or_else(|| {
                poem::Error::from_string("message not found", poem::http::StatusCode::NOT_FOUND)
            })?;

        Ok(Json(map_detail(&detail)))
    }
}

fn parse_ulid(value: &str) -> PoemResult<Ulid> {
    Ulid::from_string(value).map_err(|_| {
        poem::Error::from_string(
            format!("'{value}' is not a valid ulid"),
            poem::http::StatusCode::BAD_REQUEST,
        )
    })
}

fn internal_error(err: anyhow::Error) -> poem::Error {
    poem::Error::from_string(
        err.to_string(),
        poem::http::StatusCode::INTERNAL_SERVER_ERROR,
    )
}

fn bad_request(err: anyhow::Error) -> poem::Error {
    poem::Error::from_string(err.to_string(), poem::http::StatusCode::BAD_REQUEST)
}

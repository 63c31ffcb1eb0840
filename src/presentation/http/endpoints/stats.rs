use std::sync::Arc;

use chrono::{DateTime, Utc};
use poem::Result as PoemResult;
use poem_openapi::{OpenApi, param::Query, payload::Json};

use crate::presentation::http::{
    endpoints::root::{ApiState, EndpointsTags},
    responses::ErrorCountDto,
};

#[derive(Clone)]
pub struct StatsEndpoints {
    state: Arc<ApiState>,
}

impl StatsEndpoints {
    pub fn new(state: Arc<ApiState>) -> Self {
        Self { state }
    }
}

#[OpenApi]
impl StatsEndpoints {
    /// Failed deliveries (ERROR or TIMEOUT) recorded at or after `since`,
    /// or over the whole trail when `since` is omitted.
    #[oai(
        path = "/stats/errors",
        method = "get",
        tag = EndpointsTags::Stats,
    )]
    pub async fn count_errors(
        &self,
        since: Query<Option<String>>,
    ) -> PoemResult<Json<ErrorCountDto>> {
        let since = match &since.0 {
            Some(raw) => Some(parse_since(raw)?),
            None => None,
        };

        let errors = self
            .state
            .count_recent_errors_usecase
            .execute(since)
            .await
            .map_err(|e| {
                poem::Error::from_string(
                    e.to_string(),
                    poem::http::StatusCode::INTERNAL_SERVER_ERROR,
                )
            })?;

        Ok(Json(ErrorCountDto {
            errors,
            since: since.map(|at| at.to_rfc3339()),
        }))
    }
}

fn parse_since(raw: &str) -> PoemResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|_| {
            poem::Error::from_string(
                format!("'{raw}' is not an RFC 3339 timestamp"),
                poem::http::StatusCode::BAD_REQUEST,
            )
        })
}

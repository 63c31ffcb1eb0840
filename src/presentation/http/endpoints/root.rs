use std::sync::Arc;

use poem_openapi::Tags;

use crate::application::usecases::{
    count_recent_errors::CountRecentErrorsUseCase, get_message_detail::GetMessageDetailUseCase,
    get_message_history::GetMessageHistoryUseCase, send_message::SendMessageUseCase,
};

#[derive(Clone)]
pub struct ApiState {
    pub send_message_usecase: Arc<SendMessageUseCase>,
    pub message_history_usecase: Arc<GetMessageHistoryUseCase>,
    pub message_detail_usecase: Arc<GetMessageDetailUseCase>,
    pub count_recent_errors_usecase: Arc<CountRecentErrorsUseCase>,
}

/// Enum of API sections (tags)
#[derive(Tags)]
pub enum EndpointsTags {
    Health,
    Messages,
    Stats,
}

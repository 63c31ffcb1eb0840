pub mod count_recent_errors;
pub mod get_message_detail;
pub mod get_message_history;
pub mod send_message;

pub use count_recent_errors::CountRecentErrorsUseCase;
pub use get_message_detail::GetMessageDetailUseCase;
pub use get_message_history::GetMessageHistoryUseCase;
pub use send_message::SendMessageUseCase;

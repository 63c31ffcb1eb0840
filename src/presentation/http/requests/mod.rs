use poem_openapi::Object;

use crate::presentation::models::PriorityDto;

#[derive(Object, Debug)]
pub struct SendMessageRequestDto {
    /// Ulid of the sending user or system principal.
    #[oai(validator(min_length = 1))]
    pub sent_by: String,
    /// Recipient ids the message is addressed to, in order.
    #[oai(validator(min_items = 1))]
    pub to: Vec<String>,
    #[oai(validator(min_length = 1, max_length = 4096))]
    pub body: String,
    #[oai(default)]
    pub priority: PriorityDto,
}

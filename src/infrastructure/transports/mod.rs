pub mod intelpage;
pub mod ntfy;
pub mod telegram;

pub use intelpage::{INTELPAGE_TRANSPORT, IntelPageTransportFactory};
pub use ntfy::{NTFY_TRANSPORT, NtfyTransportFactory};
pub use telegram::{TELEGRAM_TRANSPORT, TelegramTransportFactory};

pub mod connection_util;
pub mod key_util;
pub mod message_util;

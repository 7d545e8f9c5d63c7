//! Default value functions for serde deserialization.
//!
//! These functions forward to constants defined in `vless_core::defaults`.

use vless_core::defaults;

/// Generate default value functions that forward to vless_core::defaults constants.
macro_rules! default_fns {
    ($($fn_name:ident => $const_name:ident : $ty:ty),* $(,)?) => {
        $(
            pub(crate) fn $fn_name() -> $ty {
                defaults::$const_name
            }
        )*
    };
}

/// Generate default value functions that return String from &str constants.
macro_rules! default_string_fns {
    ($($fn_name:ident => $const_name:ident),* $(,)?) => {
        $(
            pub(crate) fn $fn_name() -> String {
                defaults::$const_name.to_string()
            }
        )*
    };
}

default_fns! {
    default_connect_timeout_secs    => DEFAULT_CONNECT_TIMEOUT_SECS: u64,
    default_idle_timeout_secs       => DEFAULT_IDLE_TIMEOUT_SECS: u64,
    default_half_close_timeout_secs => DEFAULT_HALF_CLOSE_TIMEOUT_SECS: u64,
    default_max_http_header_bytes   => DEFAULT_MAX_HTTP_HEADER_BYTES: usize,
    default_relay_buffer_size       => DEFAULT_RELAY_BUFFER_SIZE: usize,
    default_connection_backlog      => DEFAULT_CONNECTION_BACKLOG: u32,
    default_ws_max_frame_bytes      => DEFAULT_WS_MAX_FRAME_BYTES: usize,
    default_sub_port                => DEFAULT_SUB_PORT: u16,
    min_relay_buffer_size           => MIN_RELAY_BUFFER_SIZE: usize,
    max_relay_buffer_size           => MAX_RELAY_BUFFER_SIZE: usize,
}

default_string_fns! {
    default_listen   => DEFAULT_LISTEN,
    default_ws_path  => DEFAULT_WS_PATH,
    default_sub_path => DEFAULT_SUB_PATH,
}

pub(crate) fn default_true() -> bool {
    true
}

pub(crate) fn default_sub_candidates() -> Vec<String> {
    defaults::DEFAULT_SUB_CANDIDATES
        .iter()
        .map(|s| s.to_string())
        .collect()
}

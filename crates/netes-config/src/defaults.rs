//! Default value functions for serde deserialization.
//!
//! These functions forward to constants defined in `netes_core::defaults`.

use netes_core::defaults;

/// Generate default value functions that forward to netes_core::defaults constants.
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
    default_shutdown_timeout_secs  => DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64,
    default_directory_timeout_secs => DEFAULT_DIRECTORY_TIMEOUT_SECS: u64,
    default_dial_timeout_secs      => DEFAULT_DIAL_TIMEOUT_SECS: u64,
}

default_string_fns! {
    default_listen           => DEFAULT_LISTEN,
    default_service_net_cidr => DEFAULT_SERVICE_NET_CIDR,
    default_directory_url    => DEFAULT_DIRECTORY_URL,
    default_dial_url         => DEFAULT_RELAY_DIAL_URL,
    default_callback_host    => DEFAULT_CALLBACK_HOST,
}

pub(crate) fn default_admission_controllers() -> Vec<String> {
    defaults::DEFAULT_ADMISSION_CONTROLLERS
        .iter()
        .map(|s| (*s).to_string())
        .collect()
}

//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# Tandem Configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[sessions]
# code_attempts = 64            # 1-1000, retries on a 4-digit code collision
# password_iterations = 100000  # 1000-1000000, PBKDF2 rounds for join passwords

[devices]
# heartbeat_interval_secs = 30  # 5-300
# code_attempts = 16            # 1-1000, retries on a device code collision

[channel]
# capacity = 256                # 16-65536 messages buffered per topic

[relay]
# bind = "0.0.0.0"
# port = 8080                   # 1024-65535
# hello_timeout_secs = 10       # 1-120

[logging]
# level = "info"                # debug, info, warn, error
"##
    .to_string()
}

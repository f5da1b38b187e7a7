use crate::schema::TandemConfig;

use super::helpers::validate_range;

pub(crate) fn validate_channel(errors: &mut Vec<String>, config: &TandemConfig) {
    validate_range(
        errors,
        "channel.capacity",
        config.channel.capacity as u64,
        16,
        65_536,
    );
}

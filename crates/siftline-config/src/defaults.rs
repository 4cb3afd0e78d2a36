//! Default values applied when optional configuration fields are omitted.

pub(crate) const fn start_page() -> u32 {
    1
}

pub(crate) const fn phase_2_min_comments() -> u32 {
    80
}

pub(crate) const fn phase_2_min_rate() -> f32 {
    4.0
}

pub(crate) const fn detail_sleep_ms() -> u64 {
    1_500
}

pub(crate) const fn page_sleep_ms() -> u64 {
    3_000
}

pub(crate) const fn entry_sleep_ms() -> u64 {
    250
}

/// 8 days: intentionally longer than the upstream site's observed 7-day ban period.
pub(crate) const fn cooldown_seconds() -> u64 {
    8 * 24 * 60 * 60
}

pub(crate) const fn max_failures() -> u32 {
    3
}

pub(crate) const fn request_timeout_ms() -> u64 {
    10_000
}

pub(crate) const fn inter_add_delay_ms() -> u64 {
    500
}

pub(crate) const fn deep_storage_request_delay_ms() -> u64 {
    2_000
}

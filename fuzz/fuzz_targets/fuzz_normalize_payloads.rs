#![no_main]
use libfuzzer_sys::fuzz_target;
use solarlog::portal::types::{
    CONSUMPTION_SECTION, PRODUCTION_SECTION, PayloadBody, RawPayload, STATUS_SECTION,
};

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data).to_string();
    let now = chrono::Utc::now();
    let date = now.date_naive();

    // Status and daily normalizers must reject garbage without panicking
    let status = RawPayload::new(now).with_section(STATUS_SECTION, PayloadBody::from_text(text.clone()));
    let _ = solarlog::normalize::parse_status(&status);

    let daily = RawPayload::new(now)
        .with_section(PRODUCTION_SECTION, PayloadBody::from_text(text.clone()))
        .with_section(CONSUMPTION_SECTION, PayloadBody::from_text(text));
    let _ = solarlog::normalize::parse_daily(&daily, date);
});

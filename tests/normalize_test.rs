use chrono::{NaiveDate, TimeZone, Utc};
use solarlog::normalize::{parse_daily, parse_status};
use solarlog::portal::types::{CONSUMPTION_SECTION, PRODUCTION_SECTION, STATUS_SECTION};
use solarlog::portal::{PayloadBody, RawPayload};
use solarlog::SolarlogError;

const STATUS_BODY: &str = r#"{
    "P_Grid": 0.41,
    "P_Load": -1.37,
    "P_Akku": null,
    "P_PV": 0.96,
    "IsOnline": true,
    "E_Day": 7.81,
    "E_Total": 23841.2,
    "Inverters": {"1": {"P": 0.96, "E_Day": 7.81}}
}"#;

const LOGIN_PAGE: &str = r#"<!DOCTYPE html>
<html><head><title>Fronius Login</title></head>
<body><form action="https://login.fronius.com/commonauth" method="post">
<input type="hidden" name="sessionDataKey" value="abc"/>
<input type="password" name="password"/>
</form></body></html>"#;

fn month_chart(series: Vec<(&str, Vec<(i64, Option<f64>)>)>) -> String {
    let series: Vec<_> = series
        .iter()
        .map(|(name, points)| {
            let data: Vec<_> = points
                .iter()
                .map(|(ms, v)| serde_json::json!([ms, v]))
                .collect();
            serde_json::json!({"name": name, "data": data})
        })
        .collect();
    serde_json::json!({"settings": {"series": series}, "title": "Month"}).to_string()
}

fn ms(y: i32, m: u32, d: u32) -> i64 {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap().timestamp_millis()
}

#[test]
fn status_text_payload_normalizes() {
    let fetched = Utc.with_ymd_and_hms(2024, 3, 9, 13, 45, 10).unwrap();
    let payload = RawPayload::new(fetched).with_section(
        STATUS_SECTION,
        PayloadBody::from_text(STATUS_BODY.to_string()),
    );

    let reading = parse_status(&payload).unwrap();

    assert_eq!(reading.timestamp, fetched);
    assert!((reading.power_now - 0.96).abs() < 1e-9);
    assert!((reading.grid_power - 0.41).abs() < 1e-9);
    assert!((reading.home_power - 1.37).abs() < 1e-9);
    assert_eq!(reading.energy_total, Some(23841.2));
    assert_eq!(reading.inverters[0].id, "1");
}

#[test]
fn login_page_instead_of_json_is_a_parse_error() {
    let payload = RawPayload::new(Utc::now())
        .with_section(STATUS_SECTION, PayloadBody::from_text(LOGIN_PAGE.to_string()));

    let err = parse_status(&payload).unwrap_err();

    assert!(matches!(err, SolarlogError::Parse { .. }));
    assert!(err.to_string().contains("Fronius Login"));
}

#[test]
fn missing_section_is_a_parse_error() {
    let err = parse_status(&RawPayload::new(Utc::now())).unwrap_err();
    assert!(err.to_string().contains(STATUS_SECTION));

    let payload = RawPayload::new(Utc::now())
        .with_section(PRODUCTION_SECTION, PayloadBody::Text(String::new()));
    let err = parse_status(&payload).unwrap_err();
    assert!(err.to_string().contains("present: [production]"));
}

#[test]
fn daily_totals_come_from_both_charts() {
    let date = NaiveDate::from_ymd_opt(2024, 3, 8).unwrap();
    let production = month_chart(vec![
        (
            "Energy to grid",
            vec![(ms(2024, 3, 7), Some(3.0)), (ms(2024, 3, 8), Some(5.5))],
        ),
        (
            "Consumed directly",
            vec![(ms(2024, 3, 7), Some(2.0)), (ms(2024, 3, 8), Some(2.25))],
        ),
    ]);
    let consumption = month_chart(vec![
        ("Energy from grid", vec![(ms(2024, 3, 8), Some(6.0))]),
        ("Consumed directly", vec![(ms(2024, 3, 8), Some(2.25))]),
    ]);
    let payload = RawPayload::new(Utc::now())
        .with_section(PRODUCTION_SECTION, PayloadBody::from_text(production))
        .with_section(CONSUMPTION_SECTION, PayloadBody::from_text(consumption));

    let reading = parse_daily(&payload, date).unwrap();

    assert_eq!(reading.date, date);
    assert!((reading.energy_produced - 7.75).abs() < 1e-9);
    assert!((reading.home_consumption - 8.25).abs() < 1e-9);
    assert!((reading.grid_import - 6.0).abs() < 1e-9);
    assert!(!reading.complete);
}

#[test]
fn daily_future_day_with_null_values_reads_as_zero() {
    let date = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
    let production = month_chart(vec![
        ("Energy to grid", vec![(ms(2024, 3, 31), None)]),
        ("Consumed directly", vec![(ms(2024, 3, 31), None)]),
    ]);
    let consumption = month_chart(vec![("Energy from grid", vec![(ms(2024, 3, 31), None)])]);
    let payload = RawPayload::new(Utc::now())
        .with_section(PRODUCTION_SECTION, PayloadBody::from_text(production))
        .with_section(CONSUMPTION_SECTION, PayloadBody::from_text(consumption));

    let reading = parse_daily(&payload, date).unwrap();

    assert_eq!(reading.energy_produced, 0.0);
    assert_eq!(reading.home_consumption, 0.0);
}

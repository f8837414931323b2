//! End-to-end triage scenarios against a small synthetic gazetteer.
//!
//! CityA sits at the origin; the other cities lie due north at roughly 90 km
//! (CityB), 150 km (CityC) and 300 km (CityF).

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use pretty_assertions::assert_eq;
use quake_triage::geo::GazetteerEntry;
use quake_triage::{
    Account, AccountRecord, EarthquakeEvent, Gazetteer, Intensity, RiskAssessment, RiskLevel,
    SafetyRecord, SafetyStatus, TriageConfig, TriageEngine,
};
use serde_json::json;

fn event_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2011, 3, 11, 5, 46, 23)
        .single()
        .expect("valid time")
}

fn city(prefecture: &str, lat: f64) -> GazetteerEntry {
    GazetteerEntry {
        prefecture: prefecture.into(),
        municipality: None,
        lat,
        lon: 139.0,
    }
}

fn engine() -> TriageEngine {
    let gazetteer = Gazetteer::new().with_entries([
        city("CityA", 35.0),
        city("CityB", 35.81),
        city("CityC", 36.35),
        city("CityF", 37.7),
    ]);
    TriageEngine::builder(TriageConfig::default())
        .resolver(Arc::new(gazetteer))
        .build()
        .expect("engine")
}

fn event(max_intensity: Intensity, magnitude: f64) -> EarthquakeEvent {
    EarthquakeEvent::new(event_time(), "CityA, CityA-ward", max_intensity, magnitude)
        .expect("event")
}

fn report(minutes: i64, status: SafetyStatus, location: Option<&str>) -> SafetyRecord {
    SafetyRecord {
        timestamp: event_time() + Duration::minutes(minutes),
        status,
        location: location.map(str::to_string),
    }
}

fn account(id: &str, address: &str, safety_history: Vec<SafetyRecord>) -> Account {
    Account {
        id: id.into(),
        address: address.into(),
        safety_history,
    }
}

async fn level_of(event: &EarthquakeEvent, account: Account) -> Option<RiskLevel> {
    let result = engine()
        .triage_accounts(event, &[account])
        .await
        .expect("triage");
    result.first().map(|assessment| assessment.level)
}

#[tokio::test]
async fn same_area_unreported_account_is_critical() {
    let level = level_of(
        &event(Intensity::Seven, 9.0),
        account("a", "CityA, CityA-ward", vec![]),
    )
    .await;
    assert_eq!(level, Some(RiskLevel::Critical));
}

#[tokio::test]
async fn near_100_account_steps_down_two() {
    let at_90_km = account("b", "CityB", vec![]);

    let level = level_of(&event(Intensity::SixUpper, 9.0), at_90_km.clone()).await;
    assert_eq!(level, Some(RiskLevel::Confirm));

    let level = level_of(&event(Intensity::Seven, 9.0), at_90_km).await;
    assert_eq!(level, Some(RiskLevel::High));
}

#[tokio::test]
async fn far_account_reporting_danger_needs_confirmation() {
    let level = level_of(
        &event(Intensity::Seven, 9.0),
        account(
            "c",
            "CityF",
            vec![report(10, SafetyStatus::Danger, None)],
        ),
    )
    .await;
    assert_eq!(level, Some(RiskLevel::Confirm));
}

#[tokio::test]
async fn safe_report_after_event_is_omitted() {
    let level = level_of(
        &event(Intensity::Seven, 9.0),
        account(
            "d",
            "CityA, CityA-ward",
            vec![report(5, SafetyStatus::Safe, None)],
        ),
    )
    .await;
    assert_eq!(level, None);
}

#[tokio::test]
async fn stale_safe_report_does_not_clear() {
    let level = level_of(
        &event(Intensity::Seven, 9.0),
        account(
            "e",
            "CityA, CityA-ward",
            vec![report(-24 * 60, SafetyStatus::Safe, None)],
        ),
    )
    .await;
    assert_eq!(level, Some(RiskLevel::Critical));
}

#[tokio::test]
async fn danger_report_uses_reported_location() {
    // Lives far away but reported DANGER from the epicenter area.
    let level = level_of(
        &event(Intensity::Seven, 9.0),
        account(
            "traveller",
            "CityF",
            vec![report(15, SafetyStatus::Danger, Some("CityA, CityA-ward"))],
        ),
    )
    .await;
    assert_eq!(level, Some(RiskLevel::Critical));
}

#[tokio::test]
async fn smaller_event_attenuates_faster() {
    // M6.5 at 150 km: four steps from 6+ lands on 4.
    let level = level_of(
        &event(Intensity::SixUpper, 6.5),
        account("c", "CityC", vec![]),
    )
    .await;
    assert_eq!(level, Some(RiskLevel::Caution));
}

#[tokio::test]
async fn japanese_records_end_to_end() {
    let engine = TriageEngine::new(&TriageConfig::default()).expect("engine");
    let event = quake_triage::input::EarthquakeEventRecord {
        id: Some("EQ20110311".into()),
        time: "2011-03-11 14:46:23".into(),
        epicenter: "宮城県牡鹿郡沖".into(),
        intensity: json!("震度7"),
        magnitude: 9.0,
    }
    .to_event(engine.utc_offset())
    .expect("event");

    let accounts: Vec<AccountRecord> = serde_json::from_value(json!([
        {"id": "tokyo", "address": "東京都千代田区永田町1丁目", "safety_history": []},
        {"id": "morioka", "address": "岩手県盛岡市内丸", "safety_history": []},
        {"id": "sendai", "address": "宮城県仙台市青葉区", "safety_history": []},
        {"id": "onagawa", "address": "宮城県牡鹿郡女川町", "safety_history": []},
        {"id": "fukushima", "address": "福島県福島市杉妻町", "safety_history": [
            {"timestamp": "2011-03-11 14:00:00", "status": "安全", "location": "福島県福島市"}
        ]},
        {"id": "cleared", "address": "宮城県石巻市", "safety_history": [
            {"timestamp": "2011-03-11 15:10:00", "status": "安全", "location": "宮城県石巻市"}
        ]}
    ]))
    .expect("accounts");

    let result = engine.triage(&event, &accounts).await.expect("triage");
    assert_eq!(
        serde_json::to_value(&result).expect("json"),
        json!([
            {"account_id": "onagawa", "level": 5},
            {"account_id": "sendai", "level": 4},
            {"account_id": "morioka", "level": 3},
            {"account_id": "fukushima", "level": 3}
        ])
    );
}

#[tokio::test]
async fn distant_city_in_the_same_prefecture_is_not_local() {
    let engine = TriageEngine::new(&TriageConfig::default()).expect("engine");
    let event = EarthquakeEvent::new(event_time(), "北海道釧路市", Intensity::Seven, 9.0)
        .expect("event");
    let accounts = [
        account("kushiro", "北海道釧路市黒金町", vec![]),
        account("hakodate", "北海道函館市東雲町", vec![]),
        account("obihiro", "北海道帯広市西5条南7丁目", vec![]),
    ];

    let report = engine
        .run(
            &event,
            &accounts.iter().map(AccountRecord::from).collect::<Vec<_>>(),
        )
        .await
        .expect("run");
    assert_eq!(
        report.assessments,
        vec![
            RiskAssessment {
                account_id: "kushiro".into(),
                level: RiskLevel::Critical,
            },
            RiskAssessment {
                account_id: "obihiro".into(),
                level: RiskLevel::High,
            },
        ]
    );
    // ~330 km away: FAR, suppressed without a lookup warning.
    assert_eq!(report.stats.suppressed, 1);
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);
}

#[tokio::test]
async fn output_is_ordered_by_level_then_input_position() {
    let accounts = [
        account("low", "CityC", vec![]),
        account("top-1", "CityA, CityA-ward", vec![]),
        account("mid", "CityB", vec![]),
        account("top-2", "CityA, CityA-ward", vec![]),
    ];
    let result = engine()
        .triage_accounts(&event(Intensity::Seven, 9.0), &accounts)
        .await
        .expect("triage");
    assert_eq!(
        result,
        vec![
            RiskAssessment {
                account_id: "top-1".into(),
                level: RiskLevel::Critical,
            },
            RiskAssessment {
                account_id: "top-2".into(),
                level: RiskLevel::Critical,
            },
            RiskAssessment {
                account_id: "mid".into(),
                level: RiskLevel::High,
            },
            RiskAssessment {
                account_id: "low".into(),
                level: RiskLevel::Confirm,
            },
        ]
    );
}

//! Canned responses served when no upstream credential is configured.

use chrono::{Duration, FixedOffset, TimeZone, Utc};
use serde_json::json;
use weathermap_client::CurrentConditions;

const MOCK_CITY: &str = "示例城市";
const MOCK_TEMPERATURE: f64 = 25.0;
const MOCK_DESCRIPTION: &str = "晴天";
const MOCK_ICON: &str = "01d";

pub(super) fn current_conditions() -> CurrentConditions {
    CurrentConditions {
        city: MOCK_CITY.to_owned(),
        temperature: MOCK_TEMPERATURE,
        weather: MOCK_DESCRIPTION.to_owned(),
        icon: MOCK_ICON.to_owned(),
    }
}

/// A forecast body in the upstream shape with one entry at local noon,
/// `days` days from today.
pub(super) fn forecast(days: u32, tz: FixedOffset) -> serde_json::Value {
    let target = Utc::now().with_timezone(&tz).date_naive() + Duration::days(i64::from(days));
    let dt = target
        .and_hms_opt(12, 0, 0)
        .and_then(|noon| tz.from_local_datetime(&noon).single())
        .map_or_else(|| Utc::now().timestamp(), |noon| noon.timestamp());

    json!({
        "city": { "name": MOCK_CITY },
        "list": [{
            "dt": dt,
            "main": { "temp": MOCK_TEMPERATURE },
            "weather": [{ "description": MOCK_DESCRIPTION, "icon": MOCK_ICON }]
        }]
    })
}

// Response shaping between the Vertex AI wire format and what the browser extension renders

use chrono::{DateTime, Datelike, SecondsFormat, TimeZone, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::models::{MachineOption, Schedule, ScheduleList};

const BYTES_PER_GB: f64 = 1_000_000_000.0;

/// RAM in (decimal) gigabytes rounded to 2 decimals
pub fn ram_gigabytes(ram_bytes: u64) -> f64 {
    (ram_bytes as f64 / BYTES_PER_GB * 100.0).round() / 100.0
}

/// Whole numbers keep one decimal: `8.0`, `1.5`, `7.52`
pub fn format_gigabytes(gigabytes: f64) -> String {
    if gigabytes.fract() == 0.0 {
        format!("{:.1}", gigabytes)
    } else {
        format!("{}", gigabytes)
    }
}

/// `n1-standard-4 (4 CPUs, 15.0 GB RAM)`
/// The CPU clause is left out when the remote omits `cpuCount`
pub fn machine_descriptor(
    machine_type: &str,
    cpu_count: Option<&str>,
    ram_bytes: u64,
) -> String {
    let ram = format_gigabytes(ram_gigabytes(ram_bytes));
    match cpu_count {
        Some(cpus) => format!("{} ({} CPUs, {} GB RAM)", machine_type, cpus, ram),
        None => format!("{} ({} GB RAM)", machine_type, ram),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UiConfig {
    #[serde(default)]
    notebook_runtime_config: Option<NotebookRuntimeConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NotebookRuntimeConfig {
    #[serde(default)]
    machine_configs: Option<Vec<MachineConfig>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MachineConfig {
    #[serde(default)]
    machine_type: String,
    #[serde(default)]
    cpu_count: Option<Value>,
    #[serde(default)]
    ram_bytes: Option<Value>,
    #[serde(default)]
    accelerator_configs: Option<Value>,
}

/// int64 fields arrive as strings, occasionally as numbers
fn wire_u64(value: Option<&Value>) -> Option<u64> {
    match value? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn wire_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Machine options out of a `uiConfig` payload; an empty payload yields none
pub fn machine_options(payload: Value) -> Result<Vec<MachineOption>, String> {
    if is_empty_payload(&payload) {
        return Ok(Vec::new());
    }

    let config: UiConfig = serde_json::from_value(payload).map_err(|e| e.to_string())?;
    let machine_configs = config
        .notebook_runtime_config
        .and_then(|runtime| runtime.machine_configs)
        .unwrap_or_default();

    machine_configs
        .into_iter()
        .map(|machine| {
            let ram_bytes = wire_u64(machine.ram_bytes.as_ref()).ok_or_else(|| {
                format!("machine '{}' has no usable ramBytes", machine.machine_type)
            })?;
            Ok(MachineOption {
                machine_type: machine_descriptor(
                    &machine.machine_type,
                    wire_text(machine.cpu_count.as_ref()).as_deref(),
                    ram_bytes,
                ),
                accelerator_configs: machine.accelerator_configs.unwrap_or(Value::Null),
            })
        })
        .collect()
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawScheduleList {
    #[serde(default)]
    schedules: Option<Vec<Schedule>>,
    #[serde(default)]
    next_page_token: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// Reduce a `schedules.list` page to summaries, keeping pagination fields
pub fn schedule_list(payload: Value) -> Result<ScheduleList, String> {
    if is_empty_payload(&payload) {
        return Ok(ScheduleList::default());
    }

    let raw: RawScheduleList = serde_json::from_value(payload).map_err(|e| e.to_string())?;
    Ok(ScheduleList {
        schedules: raw
            .schedules
            .unwrap_or_default()
            .iter()
            .map(Schedule::summary)
            .collect(),
        next_page_token: raw.next_page_token.filter(|token| !token.is_empty()),
        extra: raw.extra,
    })
}

fn is_empty_payload(payload: &Value) -> bool {
    match payload {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// `[first instant of the month, first instant of the next month)`
pub fn month_window(instant: DateTime<Utc>) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let (year, month) = (instant.year(), instant.month());
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let start = Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0).single()?;
    let end = Utc
        .with_ymd_and_hms(next_year, next_month, 1, 0, 0, 0)
        .single()?;
    Some((start, end))
}

/// Filter expression for the execution jobs spawned by one schedule
pub fn execution_jobs_filter(
    schedule_name: &str,
    window: Option<(DateTime<Utc>, DateTime<Utc>)>,
) -> String {
    let mut filter = format!("scheduleResourceName=\"{}\"", schedule_name);
    if let Some((start, end)) = window {
        filter.push_str(&format!(
            " AND createTime>=\"{}\" AND createTime<\"{}\"",
            start.to_rfc3339_opts(SecondsFormat::Secs, true),
            end.to_rfc3339_opts(SecondsFormat::Secs, true)
        ));
    }
    filter
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_ram_formatting() {
        assert_eq!(format_gigabytes(ram_gigabytes(8_000_000_000)), "8.0");
        assert_eq!(format_gigabytes(ram_gigabytes(1_500_000_000)), "1.5");
        assert_eq!(format_gigabytes(ram_gigabytes(7_516_192_768)), "7.52");
        assert_eq!(format_gigabytes(ram_gigabytes(0)), "0.0");
    }

    #[test]
    fn test_machine_options_from_ui_config() {
        let payload = json!({
            "notebookRuntimeConfig": {
                "machineConfigs": [
                    {
                        "machineType": "e2-standard-2",
                        "cpuCount": 2,
                        "ramBytes": "8000000000",
                        "acceleratorConfigs": []
                    },
                    {
                        "machineType": "n1-standard-4",
                        "cpuCount": "4",
                        "ramBytes": 15000000000u64,
                        "acceleratorConfigs": [{"type": "NVIDIA_TESLA_T4", "allowedCounts": [1, 2]}]
                    }
                ]
            }
        });

        let options = machine_options(payload).unwrap();
        assert_eq!(options.len(), 2);
        assert_eq!(options[0].machine_type, "e2-standard-2 (2 CPUs, 8.0 GB RAM)");
        assert_eq!(options[0].accelerator_configs, json!([]));
        assert_eq!(options[1].machine_type, "n1-standard-4 (4 CPUs, 15.0 GB RAM)");
        assert_eq!(
            options[1].accelerator_configs[0]["type"],
            json!("NVIDIA_TESLA_T4")
        );
    }

    #[test]
    fn test_empty_ui_config_yields_no_options() {
        assert!(machine_options(json!({})).unwrap().is_empty());
        assert!(machine_options(Value::Null).unwrap().is_empty());
        assert!(machine_options(json!({"notebookRuntimeConfig": {}}))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_schedule_list_reduces_and_keeps_pagination() {
        let payload = json!({
            "schedules": [{
                "name": "projects/p/locations/r/schedules/1",
                "displayName": "nightly",
                "cron": "TZ=UTC 0 0 * * *",
                "state": "ACTIVE",
                "maxRunCount": "5"
            }],
            "nextPageToken": "abc"
        });
        let list = schedule_list(payload).unwrap();
        assert_eq!(list.schedules.len(), 1);
        assert_eq!(list.schedules[0].display_name.as_deref(), Some("nightly"));
        assert_eq!(list.schedules[0].schedule.as_deref(), Some("TZ=UTC 0 0 * * *"));
        assert_eq!(list.schedules[0].status.as_deref(), Some("ACTIVE"));
        assert_eq!(list.next_page_token.as_deref(), Some("abc"));

        let serialized = serde_json::to_value(&list).unwrap();
        assert_eq!(
            serialized,
            json!({
                "schedules": [{"displayName": "nightly", "schedule": "TZ=UTC 0 0 * * *", "status": "ACTIVE"}],
                "nextPageToken": "abc"
            })
        );
    }

    #[test]
    fn test_schedule_list_empty_field() {
        let list = schedule_list(json!({"schedules": []})).unwrap();
        assert!(list.schedules.is_empty());
        assert!(schedule_list(json!({})).unwrap().schedules.is_empty());
    }

    #[test]
    fn test_schedule_list_null_field() {
        let list = schedule_list(json!({"schedules": null, "nextPageToken": ""})).unwrap();
        assert!(list.schedules.is_empty());
        assert_eq!(list.next_page_token, None);
    }

    #[test]
    fn test_machine_without_cpu_count_drops_cpu_clause() {
        let payload = json!({
            "notebookRuntimeConfig": {
                "machineConfigs": [{"machineType": "e2-small", "ramBytes": "1500000000"}]
            }
        });
        let options = machine_options(payload).unwrap();
        assert_eq!(options[0].machine_type, "e2-small (1.5 GB RAM)");
        assert!(machine_options(json!({"notebookRuntimeConfig": {"machineConfigs": null}}))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_month_window_rolls_over_year() {
        let instant = Utc.with_ymd_and_hms(2026, 12, 17, 8, 30, 0).unwrap();
        let (start, end) = month_window(instant).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 12, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_execution_jobs_filter() {
        let window = month_window(Utc.with_ymd_and_hms(2026, 3, 9, 0, 0, 0).unwrap());
        assert_eq!(
            execution_jobs_filter("projects/p/locations/r/schedules/7", window),
            "scheduleResourceName=\"projects/p/locations/r/schedules/7\" AND createTime>=\"2026-03-01T00:00:00Z\" AND createTime<\"2026-04-01T00:00:00Z\""
        );
        assert_eq!(
            execution_jobs_filter("projects/p/locations/r/schedules/7", None),
            "scheduleResourceName=\"projects/p/locations/r/schedules/7\""
        );
    }

    proptest! {
        #[test]
        fn prop_ram_rounding_has_at_most_two_decimals(ram_bytes in 0u64..2_000_000_000_000u64) {
            let rendered = format_gigabytes(ram_gigabytes(ram_bytes));
            let decimals = rendered.split('.').nth(1).map(str::len).unwrap_or(0);
            prop_assert!((1..=2).contains(&decimals), "rendered {}", rendered);
            let parsed: f64 = rendered.parse().unwrap();
            prop_assert!((parsed - ram_bytes as f64 / BYTES_PER_GB).abs() <= 0.005 + 1e-9);
        }
    }
}

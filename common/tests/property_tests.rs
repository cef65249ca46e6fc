// Property-based tests for request shaping, validation and retry policy

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};
use common::errors::{ConfigurationError, ValidationError};
use common::models::{normalize_bucket, Credentials, JobDescription, RawCredentials};
use common::retry::{ExponentialBackoff, RetryStrategy};
use common::vertex::format::month_window;
use proptest::prelude::*;
use serde_json::{json, Map, Value};

const REQUIRED_FIELDS: [&str; 7] = [
    "display_name",
    "input_filename",
    "machine_type",
    "kernel_name",
    "time_zone",
    "region",
    "cloud_storage_bucket",
];

fn complete_payload() -> Map<String, Value> {
    let payload = json!({
        "display_name": "etl",
        "input_filename": "etl.ipynb",
        "machine_type": "n1-standard-4",
        "kernel_name": "python3",
        "time_zone": "UTC",
        "region": "us-central1",
        "cloud_storage_bucket": "etl-bucket"
    });
    match payload {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

/// **Property: Retry limit enforcement**
///
/// *For any* policy with N retries, attempts below N get a delay and attempts
/// at or above N get none.
#[test]
fn property_retry_limit_enforcement() {
    proptest!(|(
        max_retries in 0u32..8u32,
        attempt in 0u32..16u32
    )| {
        let strategy = ExponentialBackoff::new(max_retries, 100, 10_000, 0.1);
        let next_delay = strategy.next_delay(attempt);

        if attempt < max_retries {
            prop_assert!(next_delay.is_some(), "Should provide delay at attempt {}", attempt);
        } else {
            prop_assert!(next_delay.is_none(), "Should not provide delay at attempt {}", attempt);
        }
    });
}

/// **Property: Exponential backoff with jitter**
///
/// *For any* attempt, the delay is the doubled base delay capped at the
/// maximum, plus at most `jitter_factor` of that value.
#[test]
fn property_exponential_backoff_with_jitter() {
    proptest!(|(
        attempt in 0u32..10u32,
        base_delay in 1u64..1_000u64,
        max_delay in 1_000u64..60_000u64,
        jitter_factor in 0.0f64..1.0f64
    )| {
        let strategy = ExponentialBackoff::new(10, base_delay, max_delay, jitter_factor);
        let delay_ms = strategy.next_delay(attempt).unwrap().as_millis() as u64;

        let expected_base = (base_delay * 2_u64.pow(attempt)).min(max_delay);
        let jitter_range = (expected_base as f64 * jitter_factor) as u64;

        prop_assert!(
            delay_ms >= expected_base,
            "Delay {} should be >= base delay {}",
            delay_ms,
            expected_base
        );
        prop_assert!(
            delay_ms <= expected_base + jitter_range,
            "Delay {} should be <= base delay {} + jitter {}",
            delay_ms,
            expected_base,
            jitter_range
        );
    });
}

/// **Property: Every missing field is reported**
///
/// *For any* subset of required fields removed from a valid payload, the
/// validation error names exactly that subset.
#[test]
fn property_job_description_reports_all_missing_fields() {
    proptest!(|(mask in 1u8..128u8)| {
        let mut payload = complete_payload();
        let removed: Vec<&str> = REQUIRED_FIELDS
            .iter()
            .enumerate()
            .filter(|(i, _)| mask & (1 << i) != 0)
            .map(|(_, field)| *field)
            .collect();
        for field in &removed {
            payload.remove(*field);
        }

        match JobDescription::from_value(&Value::Object(payload)) {
            Err(ValidationError::InvalidJobDescription(errors)) => {
                let mut reported: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
                reported.sort_unstable();
                let mut expected = removed.clone();
                expected.sort_unstable();
                prop_assert_eq!(reported, expected);
            }
            other => prop_assert!(false, "unexpected result {:?}", other),
        }
    });
}

/// **Property: Cron strings carry an explicit timezone**
///
/// *For any* schedule expression (including none), the registered cron string
/// starts with `TZ=<zone> ` and falls back to every minute when blank.
#[test]
fn property_cron_has_timezone_prefix() {
    let zones = ["UTC", "Europe/Berlin", "Asia/Ho_Chi_Minh", "America/New_York"];
    proptest!(|(
        zone in 0usize..4usize,
        expression in prop_oneof![
            Just(String::new()),
            Just("   ".to_string()),
            "[0-5]?[0-9] [0-2]?[0-9] \\* \\* [0-6]"
        ]
    )| {
        let mut payload = complete_payload();
        payload.insert("time_zone".to_string(), json!(zones[zone]));
        payload.insert("schedule_value".to_string(), json!(expression));

        let job = JobDescription::from_value(&Value::Object(payload)).unwrap();
        let cron = job.cron();
        let prefix = format!("TZ={} ", zones[zone]);
        prop_assert!(cron.starts_with(&prefix), "cron {} lacks prefix {}", cron, prefix);

        let body = &cron[prefix.len()..];
        if expression.trim().is_empty() {
            prop_assert_eq!(body, "* * * * *");
        } else {
            prop_assert_eq!(body, expression.trim());
        }
    });
}

/// **Property: Bucket normalization is idempotent**
#[test]
fn property_normalize_bucket_idempotent() {
    proptest!(|(
        name in "[a-z0-9][a-z0-9_.-]{2,30}",
        prefixed in any::<bool>(),
        trailing in any::<bool>()
    )| {
        let raw = format!(
            "{}{}{}",
            if prefixed { "gs://" } else { "" },
            name,
            if trailing { "/" } else { "" }
        );
        let once = normalize_bucket(&raw);
        prop_assert_eq!(&once, &name);
        prop_assert_eq!(normalize_bucket(&once), once.clone());
    });
}

/// **Property: Missing credentials are listed together**
#[test]
fn property_missing_credentials_listed() {
    proptest!(|(
        token in proptest::option::of("[a-z]{0,4}"),
        project in proptest::option::of("[a-z]{0,4}"),
        region in proptest::option::of("[a-z]{0,4}")
    )| {
        let raw = RawCredentials {
            access_token: token.clone(),
            project_id: project.clone(),
            region_id: region.clone(),
        };
        let missing: Vec<String> = [
            ("access_token", &token),
            ("project_id", &project),
            ("region_id", &region),
        ]
        .into_iter()
        .filter(|(_, value)| value.as_deref().map_or(true, |v| v.trim().is_empty()))
        .map(|(name, _)| name.to_string())
        .collect();

        match Credentials::try_from(raw) {
            Ok(_) => prop_assert!(missing.is_empty()),
            Err(ConfigurationError::MissingCredentials(names)) => prop_assert_eq!(names, missing),
            Err(other) => prop_assert!(false, "unexpected error {:?}", other),
        }
    });
}

/// **Property: Month window contains the instant**
///
/// *For any* instant, the window starts at midnight on the first of its month
/// and ends at midnight on the first of the next month.
#[test]
fn property_month_window_contains_instant() {
    proptest!(|(seconds in 0i64..4_102_444_800i64)| {
        let instant: DateTime<Utc> = Utc.timestamp_opt(seconds, 0).unwrap();
        let (start, end) = month_window(instant).unwrap();

        prop_assert!(start <= instant && instant < end);
        prop_assert_eq!(start.day(), 1);
        prop_assert_eq!(end.day(), 1);
        prop_assert_eq!((start.hour(), start.minute(), start.second()), (0, 0, 0));
        prop_assert_eq!(start.month(), instant.month());
        prop_assert!((end - start).num_days() >= 28 && (end - start).num_days() <= 31);
    });
}

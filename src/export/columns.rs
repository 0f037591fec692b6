// src/export/columns.rs

use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};

pub const ID: &str = "id";
pub const CREATED_AT: &str = "created_at";
pub const CREATED_AT_DATE: &str = "created_at_date";
pub const CREATED_AT_TIME: &str = "created_at_time";
pub const FAULTS: &str = "Faults";

/// Leading columns of every pretty-mode sheet.
pub const PRETTY_FIXED: [&str; 4] = [ID, CREATED_AT, CREATED_AT_DATE, CREATED_AT_TIME];

/// Leading columns of an empty raw-mode sheet.
pub const RAW_EMPTY: [&str; 2] = [ID, CREATED_AT];

/// Numeric columns that lead the dynamic part of a pretty sheet, in this order.
static PREFERRED_NUMERIC_ORDER: &[&str] = &[
    "T2_1_ambient_temp",
    "T2_2_ambient_temp",
    "T2_temp_mean",
    "T1_1_cold_air_temp",
    "T1_2_cold_air_temp",
    "T1_temp_mean",
    "T0_1_air_outlet_temp",
    "T0_2_air_outlet_temp",
    "T0_temp_mean",
    "TH_1_supply_air_temp",
    "TH_2_supply_air_temp",
    "TH_temp_mean",
    "LP_value",
    "HP_value",
    "LP_set_point",
    "HP_set_point",
    "T1_set_point",
    "TH_T1_set_point",
    "Compressor_timer",
    "Delta_set_to_aeration",
    "Aeration_duration_set",
    "Running_time_hour",
    "Running_time_minute",
    "Running_hours",
    "Running_hours_min",
    "Blower_speed",
    "Hot_valve_speed",
    "AHT_vale_speed",
    "AHT_valve_speed",
    "Heater_speed",
    "Cond_fan_speed",
    "Blower_speed_set_in_manual",
    "Cond_fan_speed_set_in_manual",
    "Hot_gas_valve_set_in_manual",
    "AHT_valve_set_in_manual",
    "Heater_set_in_manual",
    "Fault_code",
    "FS",
    "UF",
    "RHP",
    "BLWR_pct",
    "RMR_pct",
    "CNPR_pct",
    "AHT_pct",
    "HCSR_pct",
];

/// Lower-case substrings that mark a column as a fault flag.
static FAULT_PATTERNS: &[&str] = &[
    "fault",
    "overheat",
    "door_open",
    "short_circuit",
    "warning",
    "top",
    "protection",
    "not_achieved",
];

static HEADER_LABELS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("id", "Record#"),
        ("created_at", "Date & Time (IST)"),
        ("created_at_date", "Date"),
        ("created_at_time", "Time"),
        ("T2_1_ambient_temp", "T2-1 Ambient Temp (°C)"),
        ("T2_2_ambient_temp", "T2-2 Ambient Temp (°C)"),
        ("T1_1_cold_air_temp", "T1-1 Cold Air Temp (°C)"),
        ("T1_2_cold_air_temp", "T1-2 Cold Air Temp (°C)"),
        ("T0_1_air_outlet_temp", "T0-1 Air Outlet Temp (°C)"),
        ("T0_2_air_outlet_temp", "T0-2 Air Outlet Temp (°C)"),
        ("TH_1_supply_air_temp", "TH-1 Supply Air Temp (°C)"),
        ("TH_2_supply_air_temp", "TH-2 Supply Air Temp (°C)"),
        ("T2_temp_mean", "T2 Mean Temp (°C)"),
        ("T1_temp_mean", "T1 Mean Temp (°C)"),
        ("T0_temp_mean", "T0 Mean Temp (°C)"),
        ("TH_temp_mean", "TH Mean Temp (°C)"),
        ("LP_value", "LP Value"),
        ("HP_value", "HP Value"),
        ("T1_set_point", "T1 Set Point"),
        ("TH_T1_set_point", "TH-T1 Set Point"),
        ("Compressor_timer", "Compressor Timer (s)"),
        ("Delta_set_to_aeration", "Delta to Aeration"),
        ("Aeration_duration_set", "Aeration Duration Set"),
        ("Running_time_hour", "Running Hours"),
        ("Running_time_minute", "Running Minutes"),
        ("HP_set_point", "HP Set Point"),
        ("LP_set_point", "LP Set Point"),
        ("Blower_speed", "Blower Speed (%)"),
        ("Hot_valve_speed", "Hot Valve Speed (%)"),
        ("AHT_vale_speed", "AHT Valve Speed (%)"),
        ("AHT_valve_speed", "AHT Valve Speed (%)"),
        ("Heater_speed", "Heater Speed (%)"),
        ("Cond_fan_speed", "Cond Fan Speed (%)"),
        ("Blower_speed_set_in_manual", "Blower Speed (Manual)"),
        ("Cond_fan_speed_set_in_manual", "Cond Fan Speed (Manual)"),
        ("Hot_gas_valve_set_in_manual", "Hot Gas Valve (Manual)"),
        ("AHT_valve_set_in_manual", "AHT Valve (Manual)"),
        ("Heater_set_in_manual", "Heater (Manual)"),
        ("Running_hours", "Total Running Hours"),
        ("Running_hours_min", "Total Running Minutes"),
        ("Fault_code", "Fault Code"),
        ("UF", "UF*"),
        ("RHP", "RHP"),
        ("BLWR_pct", "BLWR%"),
        ("RMR_pct", "RMR%"),
        ("CNPR_pct", "CNPR%"),
        ("AHT_pct", "AHT%"),
        ("HCSR_pct", "HCSR%"),
        ("FS", "FS"),
        ("Faults", "Faults"),
    ])
});

/// Display label for a column, or the column name itself.
pub fn header_label(name: &str) -> &str {
    HEADER_LABELS.get(name).copied().unwrap_or(name)
}

/// Names the pretty shape produces itself; a source column with one of these
/// names never becomes a dynamic column.
pub fn is_reserved(name: &str) -> bool {
    PRETTY_FIXED.contains(&name) || name == FAULTS
}

pub fn looks_like_fault_key(name: &str) -> bool {
    let lower = name.to_lowercase();
    FAULT_PATTERNS.iter().any(|p| lower.contains(p))
}

/// Preferred names that are present come first, in preference order; the rest
/// follow in the order given. Duplicates are dropped.
pub fn order_columns<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    let present: HashSet<&str> = names.iter().map(AsRef::as_ref).collect();
    let mut seen: HashSet<&str> = HashSet::with_capacity(names.len());
    let mut ordered = Vec::with_capacity(present.len());

    for &preferred in PREFERRED_NUMERIC_ORDER {
        if present.contains(preferred) && seen.insert(preferred) {
            ordered.push(preferred.to_string());
        }
    }
    for name in names {
        let name = name.as_ref();
        if seen.insert(name) {
            ordered.push(name.to_string());
        }
    }
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_looks_like_fault_key() {
        let cases = [
            ("fault_code", true),
            ("Fault_code", true),
            ("overheat_protection", true),
            ("Door_Open_alarm", true),
            ("Compressor_stop", true),
            ("temperature", false),
            ("normal_value", false),
        ];
        for (key, expected) in cases {
            assert_eq!(looks_like_fault_key(key), expected, "key {:?}", key);
        }
    }

    #[test]
    fn test_order_columns_preferred_first() {
        let names = ["zeta", "HP_value", "alpha", "T2_1_ambient_temp", "LP_value"];
        assert_eq!(
            order_columns(&names),
            vec!["T2_1_ambient_temp", "LP_value", "HP_value", "zeta", "alpha"]
        );
    }

    #[test]
    fn test_order_columns_is_deterministic_and_deduplicated() {
        let names = ["b", "Fault_code", "a", "b", "FS", "a"];
        let first = order_columns(&names);
        assert_eq!(first, vec!["Fault_code", "FS", "b", "a"]);
        for _ in 0..10 {
            assert_eq!(order_columns(&names), first);
        }
    }

    #[test]
    fn test_order_columns_no_preferred_name_after_other() {
        let names: Vec<String> = ["x1", "UF", "x2", "Blower_speed", "HCSR_pct", "x3"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let ordered = order_columns(&names);
        let first_other = ordered
            .iter()
            .position(|n| !PREFERRED_NUMERIC_ORDER.contains(&n.as_str()))
            .unwrap();
        assert!(ordered[first_other..]
            .iter()
            .all(|n| !PREFERRED_NUMERIC_ORDER.contains(&n.as_str())));
        assert_eq!(ordered.len(), names.len());
    }

    #[test]
    fn test_order_columns_empty() {
        let names: [&str; 0] = [];
        assert!(order_columns(&names).is_empty());
    }

    #[test]
    fn test_header_label() {
        assert_eq!(header_label("id"), "Record#");
        assert_eq!(header_label("T2_1_ambient_temp"), "T2-1 Ambient Temp (°C)");
        assert_eq!(header_label("UF"), "UF*");
        assert_eq!(header_label("unlabelled_column"), "unlabelled_column");
    }

    #[test]
    fn test_is_reserved() {
        for name in PRETTY_FIXED {
            assert!(is_reserved(name));
        }
        assert!(is_reserved("Faults"));
        assert!(!is_reserved("Fault_code"));
    }
}

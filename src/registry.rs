// src/registry.rs

/// Tables that may be exported. The name is interpolated into query text,
/// so nothing outside this list may ever reach the reader.
static ALLOWED_TABLES: &[&str] = &[
    "GTPL_108_gT_40E_P_S7_200_Germany",
    "GTPL_109_gT_40E_P_S7_200_Germany",
    "GTPL_110_gT_40E_P_S7_200_Germany",
    "GTPL_111_gT_80E_P_S7_200_Germany",
    "GTPL_112_gT_80E_P_S7_200_Germany",
    "GTPL_113_gT_80E_P_S7_200_Germany",
    "kabomachinedatasmart200",
    "GTPL_114_GT_140E_S7_1200",
    "GTPL_115_GT_180E_S7_1200",
    "GTPL_119_GT_180E_S7_1200",
    "GTPL_120_GT_180E_S7_1200",
    "GTPL_116_GT_240E_S7_1200",
    "GTPL_117_GT_320E_S7_1200",
    "GTPL_121_GT1000T",
    "gtpl_122_s7_1200_01",
    "GTPL_124_GT_450T_S7_1200",
    "GTPL_131_GT_650T_S7_1200",
    "GTPL_132_GT_650T_S7_1200",
];

/// Exact, case-sensitive membership test.
pub fn is_allowed(table: &str) -> bool {
    ALLOWED_TABLES.iter().any(|&t| t == table)
}

pub fn allowed_tables() -> &'static [&'static str] {
    ALLOWED_TABLES
}

use crate::config::ConfigErrors;
use once_cell::sync::Lazy;
use std::collections::BTreeMap;

/// A fixed dispatcher variant, everything except the two environment roots is baked in
#[derive(Debug, Clone)]
pub struct Preset {
    pub name: &'static str,
    pub description: &'static str,
    pub subjects: &'static [&'static str],
    pub pattern: &'static str,
    pub labels: &'static [&'static str],
    pub parameters: &'static [&'static str],
    // relative to the home directory
    pub script: &'static str,
    pub echo: bool,
}

const SUBJECTS: [&str; 6] = [
    "sub-108293",
    "sub-108237",
    "sub-108254",
    "sub-108250",
    "sub-108284",
    "sub-108306",
];

// frame count varies per session, the parcellation does not
const PATTERN: &str = "timeAppend-*-ParcSchaeffer-reshape-to-schaeffer-schaeffer.nii.gz";

const LABELS: [&str; 2] = ["twil", "idif"];

// number of Schaeffer parcels handed to every job
const PARCELS: [&str; 1] = ["309"];

pub static PRESETS: Lazy<BTreeMap<&'static str, Preset>> = Lazy::new(|| {
    [
        Preset {
            name: "main6",
            description: "Schaeffer parcels for all subjects, submitted silently",
            subjects: &SUBJECTS,
            pattern: PATTERN,
            labels: &LABELS,
            parameters: &PARCELS,
            script: "PycharmProjects/dynesty/idif2024/main6.sh",
            echo: false,
        },
        Preset {
            name: "main6-1",
            description: "Schaeffer parcels for all subjects, echoing every command line",
            subjects: &SUBJECTS,
            pattern: PATTERN,
            labels: &LABELS,
            parameters: &PARCELS,
            script: "PycharmProjects/dynesty/idif2024/main6_1.sh",
            echo: true,
        },
    ]
    .into_iter()
    .map(|preset| (preset.name, preset))
    .collect()
});

pub fn lookup(name: &str) -> Result<&'static Preset, ConfigErrors> {
    PRESETS
        .get(name)
        .ok_or_else(|| ConfigErrors::UnknownPreset(name.to_string()))
}

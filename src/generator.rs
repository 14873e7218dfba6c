//! Synthetic encounter and claim data in the dashboard's CSV layout.

use crate::error::Result;
use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

pub const ICD_CODES: &[(&str, &str)] = &[
    ("I10", "Essential (primary) hypertension"),
    ("E11", "Type 2 diabetes mellitus"),
    ("J45", "Asthma"),
    ("M54", "Dorsalgia (back pain)"),
    ("F32", "Major depressive disorder"),
    ("K21", "Gastro-esophageal reflux disease"),
    ("N39", "Urinary tract infection"),
    ("R51", "Headache"),
    ("M25", "Joint pain"),
    ("L03", "Cellulitis"),
];

pub const CPT_CODES: &[(&str, &str)] = &[
    ("99213", "Office visit (established patient)"),
    ("93000", "Electrocardiogram"),
    ("80050", "General health panel"),
    ("85025", "Complete blood count"),
    ("71020", "Chest X-ray"),
    ("90791", "Psychiatric diagnostic evaluation"),
    ("36415", "Blood draw"),
    ("11720", "Nail debridement"),
    ("12001", "Simple wound repair"),
    ("99173", "Visual acuity screening"),
];

pub const PROVIDERS: &[&str] = &["Dr. Smith", "Dr. Lee", "Dr. Gomez", "Dr. Patel"];
pub const GENDERS: &[&str] = &["Male", "Female", "Other"];
pub const NOTES: &[&str] = &["Stable", "Follow-up needed", "Critical", "Monitor closely"];
pub const STATUSES: &[&str] = &["Paid", "Pending", "Denied"];

pub const ENCOUNTERS_FILE: &str = "ehr_data.csv";
pub const CLAIMS_FILE: &str = "claims_data.csv";

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub records: usize,
    pub seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self { records: 1000, seed: None }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EncounterRow {
    #[serde(rename = "Patient_ID")]
    pub patient_id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "DOB")]
    pub dob: NaiveDate,
    #[serde(rename = "Gender")]
    pub gender: &'static str,
    #[serde(rename = "Admission_Date")]
    pub admission_date: NaiveDate,
    #[serde(rename = "Length_of_Stay")]
    pub length_of_stay: i64,
    #[serde(rename = "Provider")]
    pub provider: &'static str,
    #[serde(rename = "Diagnosis_Code")]
    pub diagnosis_code: &'static str,
    #[serde(rename = "Procedure_Code")]
    pub procedure_code: &'static str,
    #[serde(rename = "Notes")]
    pub notes: &'static str,
    #[serde(rename = "Discharge_Date")]
    pub discharge_date: NaiveDate,
    #[serde(rename = "Diagnosis_Description")]
    pub diagnosis_description: &'static str,
    #[serde(rename = "Procedure_Description")]
    pub procedure_description: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClaimRow {
    #[serde(rename = "Claim_ID")]
    pub claim_id: String,
    #[serde(rename = "Patient_ID")]
    pub patient_id: String,
    #[serde(rename = "Service_Date")]
    pub service_date: NaiveDate,
    #[serde(rename = "ICD_Code")]
    pub icd_code: &'static str,
    #[serde(rename = "CPT_Code")]
    pub cpt_code: &'static str,
    #[serde(rename = "Billed_Amount")]
    pub billed_amount: u32,
    #[serde(rename = "Paid_Amount")]
    pub paid_amount: u32,
    #[serde(rename = "Status")]
    pub status: &'static str,
}

/// One claim per encounter, sharing patient, date and codes.
pub fn generate(config: &GeneratorConfig) -> (Vec<EncounterRow>, Vec<ClaimRow>) {
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let dob_range = (ymd(1950, 1, 1), ymd(2005, 12, 31));
    let admission_range = (ymd(2023, 1, 1), ymd(2025, 1, 1));

    let mut encounters = Vec::with_capacity(config.records);
    let mut claims = Vec::with_capacity(config.records);
    for i in 0..config.records {
        let patient_id = format!("P{}", 1000 + i);
        let (diagnosis_code, diagnosis_description) = pick(&mut rng, ICD_CODES);
        let (procedure_code, procedure_description) = pick(&mut rng, CPT_CODES);
        let admission_date = random_date(&mut rng, admission_range);
        let length_of_stay = rng.gen_range(1..15);

        let billed_amount = rng.gen_range(200..3000);
        let paid_amount = rng.gen_range(0..billed_amount);

        claims.push(ClaimRow {
            claim_id: format!("C{}", 2000 + i),
            patient_id: patient_id.clone(),
            service_date: admission_date,
            icd_code: diagnosis_code,
            cpt_code: procedure_code,
            billed_amount,
            paid_amount,
            status: pick(&mut rng, STATUSES),
        });

        encounters.push(EncounterRow {
            patient_id,
            name: format!("Patient_{}", i),
            dob: random_date(&mut rng, dob_range),
            gender: pick(&mut rng, GENDERS),
            admission_date,
            length_of_stay,
            provider: pick(&mut rng, PROVIDERS),
            diagnosis_code,
            procedure_code,
            notes: pick(&mut rng, NOTES),
            discharge_date: admission_date + Duration::days(length_of_stay),
            diagnosis_description,
            procedure_description,
        });
    }
    (encounters, claims)
}

/// Write both files into `out_dir`, returning their paths.
pub fn write_csv_files(config: &GeneratorConfig, out_dir: impl AsRef<Path>) -> Result<(PathBuf, PathBuf)> {
    let out_dir = out_dir.as_ref();
    std::fs::create_dir_all(out_dir)?;
    let (encounters, claims) = generate(config);

    let encounters_path = out_dir.join(ENCOUNTERS_FILE);
    write_rows(&encounters_path, &encounters)?;
    let claims_path = out_dir.join(CLAIMS_FILE);
    write_rows(&claims_path, &claims)?;

    info!(
        "Wrote {} encounters to {} and {} claims to {}",
        encounters.len(),
        encounters_path.display(),
        claims.len(),
        claims_path.display()
    );
    Ok((encounters_path, claims_path))
}

fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn pick<T: Copy>(rng: &mut StdRng, values: &[T]) -> T {
    values[rng.gen_range(0..values.len())]
}

fn random_date(rng: &mut StdRng, (start, end): (NaiveDate, NaiveDate)) -> NaiveDate {
    let span = (end - start).num_days();
    start + Duration::days(rng.gen_range(0..=span))
}

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(records: usize) -> GeneratorConfig {
        GeneratorConfig { records, seed: Some(7) }
    }

    #[test]
    fn test_rows_are_paired() {
        let (encounters, claims) = generate(&seeded(50));
        assert_eq!(encounters.len(), 50);
        assert_eq!(claims.len(), 50);
        assert_eq!(encounters[0].patient_id, "P1000");
        assert_eq!(claims[49].claim_id, "C2049");
        for (e, c) in encounters.iter().zip(&claims) {
            assert_eq!(e.patient_id, c.patient_id);
            assert_eq!(e.admission_date, c.service_date);
            assert_eq!(e.diagnosis_code, c.icd_code);
            assert_eq!(e.procedure_code, c.cpt_code);
        }
    }

    #[test]
    fn test_value_ranges() {
        let (encounters, claims) = generate(&seeded(200));
        for e in &encounters {
            assert!((1..=14).contains(&e.length_of_stay));
            assert_eq!((e.discharge_date - e.admission_date).num_days(), e.length_of_stay);
            assert!(e.admission_date >= ymd(2023, 1, 1) && e.admission_date <= ymd(2025, 1, 1));
            assert!(e.dob >= ymd(1950, 1, 1) && e.dob <= ymd(2005, 12, 31));
        }
        for c in &claims {
            assert!((200..3000).contains(&c.billed_amount));
            assert!(c.paid_amount < c.billed_amount);
            assert!(STATUSES.contains(&c.status));
        }
    }

    #[test]
    fn test_same_seed_same_data() {
        let (a, _) = generate(&seeded(20));
        let (b, _) = generate(&seeded(20));
        let names = |rows: &[EncounterRow]| rows.iter().map(|r| (r.dob, r.provider)).collect::<Vec<_>>();
        assert_eq!(names(&a[..]), names(&b[..]));
    }
}

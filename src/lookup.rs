//! Code Lookup - free-text search over diagnosis (ICD) and procedure (CPT) codes.

use crate::error::{Result, TableKind};
use crate::schema::{
    self, ADMISSION_DATE, DIAGNOSIS_CODE, DIAGNOSIS_DESCRIPTION, PATIENT_ID, PROCEDURE_CODE,
    PROCEDURE_DESCRIPTION,
};
use polars::prelude::*;

/// Encounter rows whose codes contain the query.
#[derive(Debug, Clone)]
pub struct CodeMatches {
    pub diagnosis: DataFrame,
    pub procedure: DataFrame,
}

/// Search both code columns. An empty query performs no lookup.
pub fn lookup_codes(encounters: &DataFrame, query: &str) -> Result<Option<CodeMatches>> {
    if query.is_empty() {
        return Ok(None);
    }
    Ok(Some(CodeMatches {
        diagnosis: lookup_diagnosis(encounters, query)?,
        procedure: lookup_procedure(encounters, query)?,
    }))
}

/// Rows whose `Diagnosis_Code` contains the upper-cased query, projected to
/// patient id, code, description and admission date.
pub fn lookup_diagnosis(encounters: &DataFrame, query: &str) -> Result<DataFrame> {
    match_code_column(encounters, query, DIAGNOSIS_CODE, DIAGNOSIS_DESCRIPTION)
}

pub fn lookup_procedure(encounters: &DataFrame, query: &str) -> Result<DataFrame> {
    match_code_column(encounters, query, PROCEDURE_CODE, PROCEDURE_DESCRIPTION)
}

fn match_code_column(
    encounters: &DataFrame,
    query: &str,
    code_column: &str,
    description_column: &str,
) -> Result<DataFrame> {
    let projection = [PATIENT_ID, code_column, description_column, ADMISSION_DATE];
    schema::require_all(encounters, TableKind::Encounters, &projection)?;

    let needle = query.to_uppercase();
    let codes = schema::string_values(encounters, TableKind::Encounters, code_column)?;
    let mask: BooleanChunked = codes
        .iter()
        .map(|code| code.as_deref().map_or(false, |c| c.contains(needle.as_str())))
        .collect();

    let mut matches = encounters.filter(&mask)?.select(projection)?;
    let as_text = matches.column(code_column)?.cast(&DataType::String)?;
    matches.with_column(as_text)?;
    Ok(matches)
}

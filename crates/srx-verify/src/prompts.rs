//! Agent prompt templates.

use crate::types::Mismatch;
use srx_core::{Decision, Node};

/// `included_articles` keys the driver must fill.
pub const INCLUDED_KEYS: [&str; 44] = [
    "pmid",
    "author",
    "year",
    "study_design",
    "n_pts",
    "age_mean_years",
    "gender_male_n",
    "gender_female_n",
    "site_maxilla",
    "site_mandible",
    "site_both",
    "primary_cause_breast_cancer",
    "primary_cause_prostate_cancer",
    "primary_cause_mm",
    "primary_cause_osteoporosis",
    "primary_cause_other",
    "primary_cause_other_details",
    "ards_bisphosphonates_alendronate",
    "ards_bisphosphonates_zoledronate",
    "ards_bisphosphonates_risedronate",
    "ards_bisphosphonates_neridronate",
    "ards_bisphosphonates_pamidronate",
    "ards_bisphosphonates_others",
    "ards_bisphosphonates_others_details",
    "ards_denosumab",
    "ards_both",
    "ards_other_drug",
    "ards_other_drug_details",
    "route_iv",
    "route_oral",
    "route_im",
    "route_subcutaneous",
    "route_both",
    "route_not_reported",
    "mronj_stage_at_risk",
    "mronj_stage_0",
    "prevention_technique",
    "group_intervention",
    "group_control",
    "follow_up_mean_months",
    "follow_up_range",
    "outcome_variable",
    "mronj_development",
    "mronj_development_details",
];

/// System prompt for the extraction agent.
pub const DRIVER_SYSTEM: &str = "\
You are an evidence extraction agent for MRONJ prevention literature.
Use ONLY the provided paper text. Do not guess.
If uncertain, use null and lower confidence.
Evidence must be short (1 sentence), no long quotes.
You MUST return strict JSON that matches the provided schema.
";

/// System prompt for the verification agent.
pub const VERIFIER_SYSTEM: &str = "\
You are an independent verifier.
Check whether each listed decision is supported by the provided paper text.
For each decision: return AGREE, DISAGREE (with proposed_value), or UNSURE.
Evidence must be short (1 sentence), no long quotes.
If DISAGREE, propose the minimal corrected value.
Also provide suggested_patch as a minimal JSON object patch (only the corrected fields).
Return strict JSON that matches the provided schema.
";

/// System prompt for the cross-driver adjudication agent.
pub const ADJUDICATOR_SYSTEM: &str = "\
You are a supervisor settling disagreements between two independent extraction runs.
For each listed path, decide PICK_A, PICK_B, or UNSURE based ONLY on the paper text.
Return strict JSON: {\"verdicts\": [{\"path\", \"pick\", \"rationale\"}]}.
";

/// User prompt for one extraction run.
#[must_use]
pub fn driver_prompt(view: &str) -> String {
    format!(
        "TASK:\n\
         A) Identify paper_id (pmid/doi/title) if present.\n\
         B) Classify study_type as one of: rct|cohort|case_series|case_control|systematic_review|other|unclear.\n\
         C) Fill record.sheets.included_articles with the keys listed below (use null if not reported).\n\
         D) Fill record.sheets.level_of_evidence if the paper explicitly states it; else null.\n\
         E) Fill exactly ONE appraisal sheet based on study_type, others must be null:\n\
         \x20  - rct -> rct_appraisal\n\
         \x20  - cohort -> cohort_appraisal\n\
         \x20  - case_series -> case_series_appraisal\n\
         \x20  - case_control -> case_control_appraisal\n\
         \x20  - systematic_review -> systematic_appraisal\n\
         \x20  - other/unclear -> all appraisal sheets null\n\
         F) Appraisal questions: set 1 for Yes, 0 for No, null for unclear/not stated.\n\
         G) critical_decisions: MUST contain an entry for study_type AND for EVERY non-null key you set anywhere in record.sheets.*.\n\
         \x20  Each entry MUST include path (JSON pointer), value, evidence (1 sentence), is_critical=true.\n\
         \n\
         Normalization rules (important):\n\
         - mronj_development must be one of: Yes|No|Unclear|NR\n\
         - Site flags: set maxilla/mandible/both as applicable (null if NR).\n\
         - Route flags: set the most specific route(s); if truly not reported set route_not_reported=1.\n\
         - Drug flags: set specific bisphosphonate subtype(s) if stated; denosumab if stated; ards_both if both.\n\
         \n\
         Included Articles keys to fill:\n\
         {keys}\n\
         \n\
         PAPER_TEXT (VIEW):\n\
         {view}\n",
        keys = INCLUDED_KEYS.join(", "),
    )
}

/// User prompt for one verifier chunk.
///
/// # Errors
/// Returns an error if the record or decision list fails to serialize.
pub fn verifier_prompt(
    view: &str,
    record: &Node,
    decisions: &[Decision],
) -> serde_json::Result<String> {
    Ok(format!(
        "PAPER_TEXT (VIEW):\n{view}\n\n\
         DRIVER_JSON (context):\n{record}\n\n\
         DECISIONS_TO_REVIEW (only review these):\n{decisions}\n",
        record = serde_json::to_string(record)?,
        decisions = serde_json::to_string(decisions)?,
    ))
}

/// User prompt for one adjudication call.
///
/// # Errors
/// Returns an error if the mismatch list fails to serialize.
pub fn adjudicator_prompt(view: &str, mismatches: &[Mismatch]) -> serde_json::Result<String> {
    Ok(format!(
        "PAPER_TEXT (VIEW):\n{view}\n\n\
         MISMATCHES (value_a from run A, value_b from run B):\n{mismatches}\n",
        mismatches = serde_json::to_string(mismatches)?,
    ))
}

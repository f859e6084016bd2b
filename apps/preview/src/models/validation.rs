//! Advisory form validation: required/optional field rules per sub-record.
//!
//! Issues are reported back to the form UI; they never block a regeneration.

use serde::{Deserialize, Serialize};

use crate::models::form::{parse_month, FormData};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldIssue {
    /// Sub-record name, e.g. `experience`.
    pub section: String,
    /// Index of the entry within its section.
    pub index: usize,
    pub field: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormValidation {
    pub passed: bool,
    pub issues: Vec<FieldIssue>,
}

fn missing(section: &str, index: usize, field: &str) -> FieldIssue {
    FieldIssue {
        section: section.to_string(),
        index,
        field: field.to_string(),
        reason: format!("{field} is required"),
    }
}

fn bad_date(section: &str, index: usize, field: &str, value: &str) -> FieldIssue {
    FieldIssue {
        section: section.to_string(),
        index,
        field: field.to_string(),
        reason: format!("'{value}' is not a valid YYYY-MM date"),
    }
}

/// Checks a date field: blank is reported as missing when required, unparsable
/// values are always reported.
fn check_date(
    issues: &mut Vec<FieldIssue>,
    section: &str,
    index: usize,
    field: &str,
    value: &str,
    required: bool,
) {
    let value = value.trim();
    if value.is_empty() {
        if required {
            issues.push(missing(section, index, field));
        }
    } else if parse_month(value).is_none() {
        issues.push(bad_date(section, index, field, value));
    }
}

/// Validates every repeated sub-record of the form.
///
/// Entirely blank entries are skipped: the form UI adds empty rows eagerly and the
/// block builder ignores them too.
pub fn validate_form(form: &FormData) -> FormValidation {
    let mut issues = Vec::new();

    for (i, exp) in form.experience.iter().enumerate() {
        if exp.is_blank() {
            continue;
        }
        if exp.title.trim().is_empty() {
            issues.push(missing("experience", i, "title"));
        }
        if exp.company.trim().is_empty() {
            issues.push(missing("experience", i, "company"));
        }
        check_date(&mut issues, "experience", i, "startDate", &exp.start_date, true);
        check_date(
            &mut issues,
            "experience",
            i,
            "endDate",
            &exp.end_date,
            !exp.current,
        );
    }

    for (i, edu) in form.education.iter().enumerate() {
        if edu.is_blank() {
            continue;
        }
        if edu.degree.trim().is_empty() {
            issues.push(missing("education", i, "degree"));
        }
        if edu.school.trim().is_empty() {
            issues.push(missing("education", i, "school"));
        }
        check_date(&mut issues, "education", i, "startDate", &edu.start_date, false);
        check_date(&mut issues, "education", i, "endDate", &edu.end_date, false);
    }

    for (i, cert) in form.certifications.iter().enumerate() {
        if cert.name.trim().is_empty() && cert.issuer.trim().is_empty() {
            continue;
        }
        if cert.name.trim().is_empty() {
            issues.push(missing("certifications", i, "name"));
        }
        if cert.issuer.trim().is_empty() {
            issues.push(missing("certifications", i, "issuer"));
        }
        check_date(&mut issues, "certifications", i, "date", &cert.date, false);
    }

    for (i, project) in form.projects.iter().enumerate() {
        let blank = project.name.trim().is_empty() && project.description.trim().is_empty();
        if !blank && project.name.trim().is_empty() {
            issues.push(missing("projects", i, "name"));
        }
    }

    FormValidation {
        passed: issues.is_empty(),
        issues,
    }
}

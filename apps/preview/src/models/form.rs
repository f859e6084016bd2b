//! Typed form record: the single input value threaded through a regeneration.
//!
//! Every field defaults to empty so a partially filled form (or a stale persisted
//! record with missing keys) always deserializes.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FormData {
    pub full_name: String,
    pub job_title: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub linkedin: String,
    pub website: String,
    pub github: String,
    pub summary: String,
    pub experience: Vec<ExperienceEntry>,
    pub education: Vec<EducationEntry>,
    pub technical_skills: Vec<SkillEntry>,
    pub soft_skills: Vec<SkillEntry>,
    pub languages: Vec<LanguageEntry>,
    pub certifications: Vec<CertificationEntry>,
    pub projects: Vec<ProjectEntry>,
    pub recruitment_banner: RecruitmentBanner,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExperienceEntry {
    pub title: String,
    pub company: String,
    pub location: String,
    /// `YYYY-MM` or `YYYY-MM-DD`.
    pub start_date: String,
    pub end_date: String,
    pub current: bool,
    pub description: String,
    pub technologies: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EducationEntry {
    pub degree: String,
    pub school: String,
    pub location: String,
    pub start_date: String,
    pub end_date: String,
    pub description: String,
    pub grade: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillEntry {
    pub name: String,
    /// Self-assessed level, 0–100.
    pub level: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageEntry {
    pub name: String,
    pub level: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CertificationEntry {
    pub name: String,
    pub issuer: String,
    pub date: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectEntry {
    pub name: String,
    pub description: String,
    pub technologies: Vec<String>,
    pub url: String,
    pub start_date: String,
    pub end_date: String,
}

/// Recruiter banner field bag. Persisted separately under `cv-recruitment-banner`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RecruitmentBanner {
    /// User toggle: render the banner at all.
    pub show: bool,
    /// User toggle: pin the banner to the front of the document.
    pub fixed: bool,
    pub recruiter_first_name: String,
    pub recruiter_last_name: String,
    pub recruiter_position: String,
    pub recruiter_phone: String,
    pub recruiter_email: String,
    pub company_name: String,
    pub company_logo_url: String,
    pub image_url: String,
    pub message: String,
    pub style: String,
    pub color: String,
    /// Banner height in millimetres. Zero keeps a hidden placeholder.
    pub height_mm: f32,
}

impl Default for RecruitmentBanner {
    fn default() -> Self {
        Self {
            show: false,
            fixed: false,
            recruiter_first_name: String::new(),
            recruiter_last_name: String::new(),
            recruiter_position: String::new(),
            recruiter_phone: String::new(),
            recruiter_email: String::new(),
            company_name: String::new(),
            company_logo_url: String::new(),
            image_url: String::new(),
            message: String::new(),
            style: "modern".to_string(),
            color: "#3B82F6".to_string(),
            height_mm: 50.0,
        }
    }
}

impl RecruitmentBanner {
    pub fn recruiter_name(&self) -> String {
        [
            self.recruiter_first_name.trim(),
            self.recruiter_last_name.trim(),
        ]
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
    }
}

impl ExperienceEntry {
    pub fn is_blank(&self) -> bool {
        self.title.trim().is_empty()
            && self.company.trim().is_empty()
            && self.start_date.trim().is_empty()
            && self.description.trim().is_empty()
    }

    pub fn period(&self) -> String {
        format_period(&self.start_date, &self.end_date, self.current)
    }
}

impl EducationEntry {
    pub fn is_blank(&self) -> bool {
        self.degree.trim().is_empty()
            && self.school.trim().is_empty()
            && self.start_date.trim().is_empty()
            && self.description.trim().is_empty()
    }

    pub fn period(&self) -> String {
        format_period(&self.start_date, &self.end_date, false)
    }
}

impl ProjectEntry {
    pub fn period(&self) -> String {
        format_period(&self.start_date, &self.end_date, false)
    }
}

impl FormData {
    /// Named technical and soft skills, blank names dropped.
    pub fn named_skills(&self) -> (Vec<&SkillEntry>, Vec<&SkillEntry>) {
        (
            named_only(&self.technical_skills),
            named_only(&self.soft_skills),
        )
    }

    /// Plain-text skills summary, one line per category. Empty when no skill is named.
    pub fn skills_text(&self) -> String {
        let (technical, soft) = self.named_skills();
        let mut lines = Vec::new();
        if !technical.is_empty() {
            let names: Vec<&str> = technical.iter().map(|s| s.name.trim()).collect();
            lines.push(format!("Technical skills: {}", names.join(", ")));
        }
        if !soft.is_empty() {
            let names: Vec<&str> = soft.iter().map(|s| s.name.trim()).collect();
            lines.push(format!("Soft skills: {}", names.join(", ")));
        }
        lines.join("\n")
    }
}

fn named_only(skills: &[SkillEntry]) -> Vec<&SkillEntry> {
    skills.iter().filter(|s| !s.name.trim().is_empty()).collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Date / period formatting
// ────────────────────────────────────────────────────────────────────────────

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Parses `YYYY-MM` or `YYYY-MM-DD` (only the month part is kept).
pub fn parse_month(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let month_part = raw.get(..7)?;
    NaiveDate::parse_from_str(&format!("{month_part}-01"), "%Y-%m-%d").ok()
}

/// Formats a date string as "Month YYYY". Unparsable input yields an empty string.
pub fn format_month(raw: &str) -> String {
    match parse_month(raw) {
        Some(date) => format!("{} {}", MONTH_NAMES[date.month0() as usize], date.year()),
        None => String::new(),
    }
}

/// "start - end", "start - Present", or just "start". Empty without a start date.
pub fn format_period(start: &str, end: &str, current: bool) -> String {
    let start_fmt = format_month(start);
    if start_fmt.is_empty() {
        return String::new();
    }
    if current {
        return format!("{start_fmt} - Present");
    }
    let end_fmt = format_month(end);
    if end_fmt.is_empty() {
        start_fmt
    } else {
        format!("{start_fmt} - {end_fmt}")
    }
}

// SPDX-FileCopyrightText: 2026 Jobcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message templates.

use chrono::NaiveDate;
use jobcast_core::types::JobPosting;

/// Formats an amount as Rupiah with `.` thousands separators.
pub fn format_rupiah(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    let sign = if amount < 0 { "-" } else { "" };
    format!("Rp {sign}{grouped}")
}

pub fn format_salary(min: Option<i64>, max: Option<i64>) -> String {
    match (min, max) {
        (Some(min), Some(max)) if min == max => format_rupiah(min),
        (Some(min), Some(max)) => format!("{} - {}", format_rupiah(min), format_rupiah(max)),
        (Some(min), None) => format!("from {}", format_rupiah(min)),
        (None, Some(max)) => format!("up to {}", format_rupiah(max)),
        (None, None) => "Negotiable".to_string(),
    }
}

/// `DD Mon YYYY`, e.g. `05 Mar 2026`.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d %b %Y").to_string()
}

pub fn job_broadcast(job: &JobPosting, full_name: &str) -> String {
    let mut text = String::new();
    if job.is_urgent {
        text.push_str("🚨 *URGENT HIRING* 🚨\n\n");
    }
    text.push_str(&format!(
        "Hello {full_name},\n\n\
         A new job opening matches your profile:\n\n\
         🏢 *Company:* {company}\n\
         💼 *Position:* {title}\n\
         📍 *Location:* {location}\n\
         💰 *Salary:* {salary}\n\
         📅 *Deadline:* {deadline}\n\n\
         Log in to your account to apply before the deadline. Good luck!",
        company = job.company,
        title = job.title,
        location = job.location.as_deref().unwrap_or("-"),
        salary = format_salary(job.salary_min, job.salary_max),
        deadline = job.deadline.map(format_date).unwrap_or_else(|| "-".to_string()),
    ));
    text
}

pub fn welcome(full_name: &str, email: &str, temporary_password: &str) -> String {
    format!(
        "Hello {full_name},\n\n\
         Welcome! Your applicant account has been created.\n\n\
         📧 *Email:* {email}\n\
         🔑 *Temporary password:* {temporary_password}\n\n\
         For your security, change this password right after your first login \
         and never share it with anyone.\n\n\
         See you on the platform!"
    )
}

pub fn stage_update(
    full_name: &str,
    position: &str,
    company: &str,
    stage: &str,
    application_ref: &str,
) -> String {
    format!(
        "Hello {full_name},\n\n\
         There is an update on your application:\n\n\
         💼 *Position:* {position}\n\
         🏢 *Company:* {company}\n\
         📌 *Current stage:* {stage}\n\
         🧾 *Application ref:* {application_ref}\n\n\
         Please keep your phone reachable; the recruitment team may contact you \
         for the next step."
    )
}

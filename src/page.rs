//! Full-page rendering of a [`SessionReport`].

use crate::{
    error::VehicountError,
    session::{NoticeLevel, SessionReport},
    template::{Markup, Template, Value, escape_html},
};

/// Heading and document title.
pub const PAGE_TITLE: &str = "Vehicle Counting System for Traffic Management";

const PAGE_TEMPLATE: Template = Template::new("page.html", include_str!("../templates/page.html"));

fn notice_class(level: NoticeLevel) -> &'static str {
    match level {
        NoticeLevel::Success => "notice notice-success",
        NoticeLevel::Info => "notice notice-info",
        NoticeLevel::Warning => "notice notice-warning",
        NoticeLevel::Error => "notice notice-error",
    }
}

/// Render the upload form followed by everything the report holds.
///
/// # Errors
///
/// Returns [`VehicountError::TemplateError`] if the page template cannot be
/// filled.
pub fn render_page(report: &SessionReport) -> Result<Markup, VehicountError> {
    let notices = Markup::trusted(
        report
            .notices
            .iter()
            .map(|notice| {
                format!(
                    "<div class=\"{}\">{}</div>",
                    notice_class(notice.level),
                    escape_html(&notice.message)
                )
            })
            .collect::<Vec<_>>()
            .join("\n  "),
    );

    let player = report.player.clone().unwrap_or_default();

    let download = match &report.download {
        Some(link) => Markup::trusted(format!(
            "<a class=\"download\" href=\"{}\" download=\"{}\">Download Processed Video</a>",
            escape_html(&link.href()),
            escape_html(&link.file_name)
        )),
        None => Markup::default(),
    };

    PAGE_TEMPLATE.render(&[
        ("title", Value::Text(PAGE_TITLE)),
        ("notices", Value::Markup(&notices)),
        ("player", Value::Markup(&player)),
        ("download", Value::Markup(&download)),
    ])
}

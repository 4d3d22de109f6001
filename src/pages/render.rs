//! HTML for the calendar pages.

use std::fmt::Write as _;

use crate::calendar::Week;
use crate::middleware::AuthUser;
use crate::movie_store::CalendarEntry;
use crate::session::Flash;

const MONTHS: [&str; 12] = [
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

/// Poll the keep-alive route so the token is refreshed while a page stays open.
const KEEP_ALIVE_SECS: u32 = 240;

/// What every page shows around its content.
pub(super) struct Chrome {
    pub(super) user_name: Option<String>,
    pub(super) flashes: Vec<Flash>,
    pub(super) auth_path: String,
}

pub(super) struct CalendarView<'a> {
    pub(super) year: i32,
    pub(super) month_name: &'a str,
    pub(super) weeks: &'a [Week],
    pub(super) movies: &'a [CalendarEntry],
}

/// Escape text for HTML element content and quoted attributes.
pub(super) fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn page(chrome: &Chrome, title: &str, body: &str) -> String {
    let auth = escape(&chrome.auth_path);
    let mut out = String::new();
    let _ = write!(
        out,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{} | Horror Movie Calendar</title>\n</head>\n<body>\n<nav>\n<a href=\"/\">Home</a>\n",
        escape(title)
    );

    match &chrome.user_name {
        Some(name) => {
            let _ = write!(
                out,
                "<span class=\"user\">{}</span>\n<a href=\"/profile\">Profile</a>\n\
                 <form method=\"post\" action=\"{auth}/logout\"><button>Log out</button></form>\n",
                escape(name)
            );
        }
        None => {
            let _ = writeln!(out, "<a href=\"{auth}/login\">Log in</a>");
        }
    }
    out.push_str("</nav>\n");

    for flash in &chrome.flashes {
        let _ = writeln!(
            out,
            "<div class=\"flash flash-{}\">{}</div>",
            flash.level.as_str(),
            escape(&flash.message)
        );
    }

    let _ = writeln!(out, "<main>\n<h1>{}</h1>\n{body}</main>", escape(title));

    if chrome.user_name.is_some() {
        let _ = writeln!(
            out,
            "<script>setInterval(function () {{ fetch(\"{auth}/ping\", {{ credentials: \"same-origin\" }}); }}, {});</script>",
            KEEP_ALIVE_SECS * 1000
        );
    }
    out.push_str("</body>\n</html>\n");
    out
}

pub(super) fn select_year(chrome: &Chrome, years: &[i32]) -> String {
    let mut body = String::from("<form method=\"post\" action=\"/select_month\">\n<select name=\"year\">\n");
    for year in years.iter().rev() {
        let _ = writeln!(body, "<option value=\"{year}\">{year}</option>");
    }
    body.push_str("</select>\n<button>Next</button>\n</form>\n");
    page(chrome, "Select a Year", &body)
}

pub(super) fn select_month(chrome: &Chrome, year: i32) -> String {
    let mut body = format!(
        "<form method=\"post\" action=\"/calendar\">\n<input type=\"hidden\" name=\"year\" value=\"{year}\">\n<select name=\"month\">\n"
    );
    for (index, name) in MONTHS.iter().enumerate() {
        let _ = writeln!(body, "<option value=\"{}\">{name}</option>", index + 1);
    }
    body.push_str("</select>\n<button>Show calendar</button>\n</form>\n");
    page(chrome, &format!("Select a Month in {year}"), &body)
}

pub(super) fn calendar(chrome: &Chrome, view: &CalendarView<'_>) -> String {
    let mut body = String::from(
        "<table class=\"calendar\">\n<tr><th>Sun</th><th>Mon</th><th>Tue</th><th>Wed</th><th>Thu</th><th>Fri</th><th>Sat</th></tr>\n",
    );
    for week in view.weeks {
        body.push_str("<tr>");
        for &day in week {
            if day == 0 {
                body.push_str("<td></td>");
                continue;
            }
            let _ = write!(body, "<td><span class=\"day\">{day}</span>");
            for movie in view.movies.iter().filter(|m| m.day == day) {
                let _ = write!(body, "<div class=\"movie\">{}</div>", escape(&movie.title));
            }
            body.push_str("</td>");
        }
        body.push_str("</tr>\n");
    }
    body.push_str("</table>\n");
    if view.movies.is_empty() {
        body.push_str("<p>No horror releases this month.</p>\n");
    }
    page(chrome, &format!("{} {}", view.month_name, view.year), &body)
}

pub(super) fn profile(chrome: &Chrome, user: &AuthUser) -> String {
    let body = format!(
        "<dl>\n<dt>Name</dt><dd>{}</dd>\n<dt>Email</dt><dd>{}</dd>\n</dl>\n",
        escape(user.user_name.as_deref().unwrap_or("User")),
        escape(user.user_email.as_deref().unwrap_or("Unknown")),
    );
    page(chrome, "Profile", &body)
}

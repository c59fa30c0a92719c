// SPDX-FileCopyrightText: 2026 Motofleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hebrew reply rendering.
//!
//! Every function here is pure. Each output line starts with a
//! RIGHT-TO-LEFT MARK, and Latin or numeric runs such as licence plates are
//! wrapped in directional isolates so they keep their own order inside
//! right-to-left text.

use motofleet_core::{MaintenanceSummary, Motorcycle};
use strum::{Display, EnumString};

use crate::menu::Menu;

/// RIGHT-TO-LEFT MARK.
pub const RLM: char = '\u{200F}';
/// LEFT-TO-RIGHT ISOLATE.
pub const LRI: char = '\u{2066}';
/// POP DIRECTIONAL ISOLATE.
pub const PDI: char = '\u{2069}';

/// Shown for internal failures and unknown error codes.
pub const GENERIC_APOLOGY: &str = "מצטערים, אירעה שגיאה. אנא נסו שוב בעוד מספר רגעים.";

/// Known error and status codes with fixed default texts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorCode {
    InvalidInput,
    InvalidMenuSelection,
    InvalidMotorcycleSelection,
    InvalidMileage,
    InvalidConfirmation,
    Unauthorized,
    NotFound,
    NotImplemented,
    MileageTooLow,
    SessionDataMissing,
    TooManyErrors,
    InternalError,
}

impl ErrorCode {
    pub fn default_message(self) -> &'static str {
        match self {
            ErrorCode::InvalidInput => "הקלט אינו תקין.",
            ErrorCode::InvalidMenuSelection => "בחירה לא תקינה. אנא בחרו מספר מהתפריט.",
            ErrorCode::InvalidMotorcycleSelection => {
                "בחירת אופנוע לא תקינה. אנא בחרו מספר מהרשימה."
            }
            ErrorCode::InvalidMileage => {
                "קילומטראז' לא תקין. יש להזין מספר שלם בין 0 ל-999,999."
            }
            ErrorCode::InvalidConfirmation => "לא הבנתי. אנא השיבו 1 (כן) או 2 (לא).",
            ErrorCode::Unauthorized => "אין לך הרשאה לבצע פעולה זו.",
            ErrorCode::NotFound => "הפריט המבוקש לא נמצא.",
            ErrorCode::NotImplemented => "פעולה זו עדיין אינה זמינה.",
            ErrorCode::MileageTooLow => {
                "הקילומטראז' שהוזן נמוך מהקילומטראז' הרשום לאופנוע."
            }
            ErrorCode::SessionDataMissing => "נתוני השיחה חסרים. נא להתחיל מחדש.",
            ErrorCode::TooManyErrors => "יותר מדי ניסיונות שגויים.",
            ErrorCode::InternalError => GENERIC_APOLOGY,
        }
    }
}

/// Completed actions that get a success line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuccessNotice {
    MileageRecorded { license_plate: String, mileage: u32 },
}

/// Prefixes every line with [`RLM`].
pub fn rtl(text: &str) -> String {
    text.split('\n')
        .map(|line| {
            if line.starts_with(RLM) {
                line.to_string()
            } else {
                format!("{RLM}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Wraps a left-to-right run in an isolate.
pub fn isolate(text: &str) -> String {
    format!("{LRI}{text}{PDI}")
}

/// Groups thousands with `,`: `15000` becomes `15,000`.
pub fn format_number(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if n < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

fn km(n: i64) -> String {
    format!("{} ק\"מ", isolate(&format_number(n)))
}

/// Joins rendered blocks with an RTL-marked blank line.
pub fn join(blocks: &[String]) -> String {
    blocks
        .iter()
        .filter(|b| !b.is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join(&format!("\n{RLM}\n"))
}

pub fn welcome(name: &str) -> String {
    let name = name.trim();
    if name.is_empty() {
        rtl("שלום! 👋 ברוכים הבאים למערכת ניהול הצי.")
    } else {
        rtl(&format!("שלום {name}! 👋 ברוכים הבאים למערכת ניהול הצי."))
    }
}

/// Title, enabled options as `key. label`, then footer, back and timeout hints.
pub fn menu(menu: &Menu) -> String {
    let mut lines = vec![format!("*{}*", menu.title)];
    for option in menu.options.iter().filter(|o| o.enabled) {
        let label = isolate_latin(&option.label);
        match &option.description {
            Some(description) => lines.push(format!(
                "{}. {label} - {}",
                option.key,
                isolate_latin(description)
            )),
            None => lines.push(format!("{}. {label}", option.key)),
        }
    }
    if let Some(footer) = &menu.footer {
        lines.push(isolate_latin(footer));
    }
    if menu.allow_back {
        lines.push("לחזרה לתפריט הראשי השיבו: חזור".to_string());
    }
    if let Some(hint) = menu.timeout_hint {
        let minutes = hint.as_secs() / 60;
        lines.push(format!(
            "⏱ השיחה תתאפס לאחר {} דקות ללא פעילות.",
            isolate(&minutes.to_string())
        ));
    }
    rtl(&lines.join("\n"))
}

/// Wraps ASCII words and number runs of a mixed string in isolates.
fn isolate_latin(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    let mut run = String::new();
    for ch in text.chars() {
        let ltr = ch.is_ascii_alphanumeric()
            || (!run.is_empty() && matches!(ch, '-' | ',' | '.' | ' '));
        if ltr {
            run.push(ch);
        } else {
            flush_run(&mut out, &mut run);
            out.push(ch);
        }
    }
    flush_run(&mut out, &mut run);
    out
}

fn flush_run(out: &mut String, run: &mut String) {
    if run.is_empty() {
        return;
    }
    let trimmed = run.trim_end_matches([' ', '-', ',', '.']);
    let tail = run[trimmed.len()..].to_string();
    out.push_str(&isolate(trimmed));
    out.push_str(&tail);
    run.clear();
}

/// `❌` line with the override text or the code's default.
pub fn error(code: ErrorCode, message: Option<&str>) -> String {
    rtl(&format!("❌ {}", message.unwrap_or(code.default_message())))
}

/// Like [`error`] for a string code. Unknown codes get the generic apology.
pub fn error_for_code(code: &str, message: Option<&str>) -> String {
    match code.parse::<ErrorCode>() {
        Ok(code) => error(code, message),
        Err(_) => rtl(&format!("❌ {}", message.unwrap_or(GENERIC_APOLOGY))),
    }
}

/// The reply sent when processing fails.
pub fn apology() -> String {
    error(ErrorCode::InternalError, None)
}

pub fn success(notice: &SuccessNotice) -> String {
    match notice {
        SuccessNotice::MileageRecorded {
            license_plate,
            mileage,
        } => rtl(&format!(
            "✅ הקילומטראז' נשמר בהצלחה!\nאופנוע: {}\nקילומטראז': {}\nתודה!",
            isolate(license_plate),
            km(i64::from(*mileage))
        )),
    }
}

pub fn mileage_prompt(license_plate: Option<&str>) -> String {
    match license_plate {
        Some(plate) => rtl(&format!(
            "אנא הזינו את הקילומטראז' הנוכחי של האופנוע {} (מספר בלבד):",
            isolate(plate)
        )),
        None => rtl("אנא הזינו את הקילומטראז' הנוכחי (מספר בלבד):"),
    }
}

/// Yes/no prompt restating the pending value.
pub fn mileage_confirmation(mileage: u32, license_plate: Option<&str>) -> String {
    let subject = match license_plate {
        Some(plate) => format!(" לאופנוע {}", isolate(plate)),
        None => String::new(),
    };
    rtl(&format!(
        "האם לאשר קילומטראז' של {}{subject}?\n{}",
        km(i64::from(mileage)),
        yes_no_lines()
    ))
}

/// Bare yes/no options, used when no value is pending.
pub fn yes_no_prompt() -> String {
    rtl(&format!("האם לאשר?\n{}", yes_no_lines()))
}

fn yes_no_lines() -> String {
    format!("{}. כן\n{}. לא", isolate("1"), isolate("2"))
}

/// Title line followed by one line per entry.
pub fn info(title: &str, lines: &[String]) -> String {
    let mut out = vec![format!("ℹ️ *{title}*")];
    out.extend(lines.iter().cloned());
    rtl(&out.join("\n"))
}

pub fn motorcycle_details(motorcycle: &Motorcycle) -> String {
    info(
        "פרטי אופנוע",
        &[
            format!("מספר רישוי: {}", isolate(&motorcycle.license_plate)),
            format!("דגם: {}", isolate_latin(&motorcycle.model)),
            format!(
                "קילומטראז' נוכחי: {}",
                km(i64::from(motorcycle.current_mileage))
            ),
        ],
    )
}

pub fn maintenance_summary(motorcycle: &Motorcycle, summary: &MaintenanceSummary) -> String {
    let mut lines = vec![
        format!("אופנוע: {}", isolate(&motorcycle.license_plate)),
        format!(
            "קילומטראז' נוכחי: {}",
            km(i64::from(motorcycle.current_mileage))
        ),
    ];
    match (summary.last_service_mileage, summary.last_service_date) {
        (Some(mileage), Some(date)) => lines.push(format!(
            "טיפול אחרון: {} בתאריך {}",
            km(i64::from(mileage)),
            isolate(&date.format("%d/%m/%Y").to_string())
        )),
        (Some(mileage), None) => lines.push(format!("טיפול אחרון: {}", km(i64::from(mileage)))),
        (None, Some(date)) => lines.push(format!(
            "טיפול אחרון בתאריך {}",
            isolate(&date.format("%d/%m/%Y").to_string())
        )),
        (None, None) => lines.push("טרם בוצע טיפול".to_string()),
    }
    lines.push(format!(
        "טיפול הבא: {}",
        km(i64::from(summary.next_service_mileage))
    ));
    if summary.is_overdue() {
        lines.push(format!(
            "⚠️ הטיפול באיחור של {}!",
            km(-summary.km_remaining)
        ));
    } else {
        lines.push(format!("נותרו {} עד לטיפול", km(summary.km_remaining)));
    }
    info("סטטוס טיפולים", &lines)
}

pub fn cancelled() -> String {
    rtl("הדיווח בוטל.")
}

/// Notice sent on the turn the error threshold is reached.
pub fn conversation_reset(max_errors: u32) -> String {
    rtl(&format!(
        "⚠️ {} לאחר {} ניסיונות שגויים השיחה אותחלה.\nשלחו הודעה כלשהי כדי להתחיל מחדש.",
        ErrorCode::TooManyErrors.default_message(),
        isolate(&max_errors.to_string())
    ))
}

pub fn goodbye() -> String {
    rtl("תודה ולהתראות! 👋\nשלחו הודעה בכל עת כדי להתחיל מחדש.")
}

/// Entry prompt of the administrative data flow.
pub fn admin_data_prompt() -> String {
    rtl("מצב מנהל: הזינו את נתוני האופנוע.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menu::{MAIN_MENU_ID, MenuOption};
    use chrono::NaiveDate;
    use motofleet_core::MenuAction;
    use std::time::Duration;

    fn assert_rtl(text: &str) {
        for line in text.split('\n') {
            assert!(line.starts_with(RLM), "line without RLM: {line:?}");
        }
    }

    fn bike() -> Motorcycle {
        Motorcycle {
            id: "m1".into(),
            license_plate: "12-345-67".into(),
            model: "Honda PCX 125".into(),
            client_id: None,
            assigned_courier_id: None,
            current_mileage: 14_200,
            last_maintenance_mileage: Some(10_000),
            last_maintenance_date: NaiveDate::from_ymd_opt(2026, 2, 14),
            maintenance_interval_km: 5_000,
        }
    }

    #[test]
    fn formats_thousands() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1_000), "1,000");
        assert_eq!(format_number(15_000), "15,000");
        assert_eq!(format_number(999_999), "999,999");
        assert_eq!(format_number(1_234_567), "1,234,567");
        assert_eq!(format_number(-500), "-500");
    }

    #[test]
    fn every_line_is_rtl_marked() {
        assert_rtl(&welcome("דני"));
        assert_rtl(&goodbye());
        assert_rtl(&mileage_confirmation(15_000, Some("12-345-67")));
        assert_rtl(&join(&[welcome(""), cancelled()]));
    }

    #[test]
    fn rtl_does_not_double_mark() {
        let once = rtl("שלום");
        assert_eq!(rtl(&once), once);
    }

    #[test]
    fn confirmation_restates_value_and_isolates_plate() {
        let text = mileage_confirmation(15_000, Some("12-345-67"));
        assert!(text.contains("15,000"));
        assert!(text.contains(&format!("{LRI}12-345-67{PDI}")));
        assert!(text.contains("כן"));
        assert!(text.contains("לא"));
    }

    #[test]
    fn error_lookup_falls_back_to_generic() {
        assert_eq!(
            error_for_code("invalid_mileage", None),
            error(ErrorCode::InvalidMileage, None)
        );
        assert!(error_for_code("no_such_code", None).contains(GENERIC_APOLOGY));
        assert!(error_for_code("no_such_code", Some("custom")).contains("custom"));
        assert!(error(ErrorCode::NotFound, Some("override")).contains("override"));
        assert_eq!(ErrorCode::MileageTooLow.to_string(), "mileage_too_low");
    }

    #[test]
    fn menu_lists_enabled_options_only() {
        let menu = Menu {
            id: MAIN_MENU_ID.into(),
            title: "תפריט".into(),
            options: vec![
                MenuOption {
                    key: "1".into(),
                    label: "דיווח".into(),
                    description: None,
                    enabled: true,
                    action: MenuAction::ReportMileage,
                },
                MenuOption {
                    key: "2".into(),
                    label: "מוסתר".into(),
                    description: None,
                    enabled: false,
                    action: MenuAction::ViewMaintenance,
                },
            ],
            footer: None,
            allow_back: true,
            timeout_hint: Some(Duration::from_secs(30 * 60)),
            page: 0,
        };
        let text = super::menu(&menu);
        assert_rtl(&text);
        assert!(text.contains("1. דיווח"));
        assert!(!text.contains("מוסתר"));
        assert!(text.contains("חזור"));
        assert!(text.contains(&isolate("30")));
    }

    #[test]
    fn mixed_labels_isolate_latin_runs() {
        assert_eq!(
            isolate_latin("12-345-67 Honda"),
            format!("{LRI}12-345-67 Honda{PDI}")
        );
        assert_eq!(
            isolate_latin("מציג 1-9 מתוך 10"),
            format!("מציג {LRI}1-9{PDI} מתוך {LRI}10{PDI}")
        );
    }

    #[test]
    fn maintenance_summary_reports_remaining_and_overdue() {
        let mut m = bike();
        let summary = MaintenanceSummary {
            last_service_mileage: Some(10_000),
            last_service_date: m.last_maintenance_date,
            next_service_mileage: 15_000,
            km_remaining: 800,
        };
        let text = maintenance_summary(&m, &summary);
        assert_rtl(&text);
        assert!(text.contains("14/02/2026"));
        assert!(text.contains("800"));

        m.current_mileage = 15_250;
        let overdue = MaintenanceSummary {
            km_remaining: -250,
            ..summary
        };
        let text = maintenance_summary(&m, &overdue);
        assert!(text.contains("באיחור"));
        assert!(text.contains("250"));
    }

    #[test]
    fn details_and_success_mention_plate() {
        let m = bike();
        assert!(motorcycle_details(&m).contains("12-345-67"));
        let text = success(&SuccessNotice::MileageRecorded {
            license_plate: m.license_plate.clone(),
            mileage: 15_000,
        });
        assert_rtl(&text);
        assert!(text.contains("15,000"));
        assert!(text.contains("12-345-67"));
    }

    #[test]
    fn reset_notice_names_threshold() {
        let text = conversation_reset(3);
        assert_rtl(&text);
        assert!(text.contains(&isolate("3")));
    }
}

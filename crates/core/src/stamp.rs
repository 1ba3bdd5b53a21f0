use chrono::Local;

pub const DATE_FORMAT: &str = "%d-%m-%Y";
pub const DATE_TIME_FORMAT: &str = "%d-%m-%Y %H:%M";

/// `DD-MM-YYYY HH:MM`, written next to every classification.
pub fn now_stamp() -> String {
    Local::now().format(DATE_TIME_FORMAT).to_string()
}

/// `DD-MM-YYYY`, used for rows added to the master list.
pub fn today_stamp() -> String {
    Local::now().format(DATE_FORMAT).to_string()
}

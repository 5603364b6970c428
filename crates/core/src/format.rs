use crate::error::{ClipError, Result};

/// Format seconds as MM:SS timestamp
pub fn format_timestamp(seconds: f64) -> String {
    let mins = (seconds / 60.0) as u32;
    let secs = (seconds % 60.0) as u32;
    format!("{:02}:{:02}", mins, secs)
}

/// Format seconds the way ffmpeg takes them for `-t`, `-ss` and filter options
pub fn format_seconds(seconds: f64) -> String {
    format!("{:.3}", seconds)
}

/// Parse `SS[.fff]`, `MM:SS[.fff]` or `HH:MM:SS[.fff]` into seconds
pub fn parse_timecode(value: &str) -> Result<f64> {
    let invalid = || ClipError::InvalidTimecode {
        value: value.to_string(),
    };

    let parts: Vec<&str> = value.trim().split(':').collect();
    if parts.is_empty() || parts.len() > 3 {
        return Err(invalid());
    }

    let (last, leading) = parts.split_last().ok_or_else(invalid)?;
    let seconds: f64 = last.parse().map_err(|_| invalid())?;
    if !seconds.is_finite() || seconds < 0.0 || (!leading.is_empty() && seconds >= 60.0) {
        return Err(invalid());
    }

    let mut total = 0.0;
    for (i, part) in leading.iter().enumerate() {
        let n: u32 = part.parse().map_err(|_| invalid())?;
        // minutes are bounded only when hours precede them
        if leading.len() == 2 && i == 1 && n >= 60 {
            return Err(invalid());
        }
        total = total * 60.0 + f64::from(n);
    }

    Ok(total * 60.0 + seconds)
}

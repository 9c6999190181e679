use tracing::Level;

/// 将浮点数四舍五入为两位小数。
pub fn round2(val: f64) -> f64 {
    (val * 100.0).round() / 100.0
}

/// 速度按 1024 进制换算到合适单位，保留两位小数。
pub fn format_speed(bytes_per_second: f64) -> String {
    const UNITS: [&str; 5] = ["B/s", "KB/s", "MB/s", "GB/s", "TB/s"];
    let mut speed = bytes_per_second;
    let mut unit = 0;
    while speed >= 1024.0 && unit < UNITS.len() - 1 {
        speed /= 1024.0;
        unit += 1;
    }
    format!("{:.2}{}", speed, UNITS[unit])
}

// 把字符串转换成 Level，忽略大小写，不识别时返回 None
pub fn parse_level(s: &str) -> Option<Level> {
    match s.to_uppercase().as_str() {
        "ERROR" => Some(Level::ERROR),
        "WARN" | "WARNING" => Some(Level::WARN),
        "INFO" => Some(Level::INFO),
        "DEBUG" => Some(Level::DEBUG),
        "TRACE" => Some(Level::TRACE),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speed_units_step_by_1024() {
        assert_eq!(format_speed(512.0), "512.00B/s");
        assert_eq!(format_speed(2048.0), "2.00KB/s");
        assert_eq!(format_speed(5.5 * 1024.0 * 1024.0), "5.50MB/s");
        assert_eq!(format_speed(3.0 * 1024.0 * 1024.0 * 1024.0), "3.00GB/s");
    }

    #[test]
    fn level_parsing_ignores_case() {
        assert_eq!(parse_level("Info"), Some(Level::INFO));
        assert_eq!(parse_level("WARNING"), Some(Level::WARN));
        assert_eq!(parse_level("verbose"), None);
    }
}

//! # 报表输出模块
//!
//! 测速结论的三种出口：
//!
//! - 控制台表格：无边框制表符分隔，阈值着色；
//! - 链接清单：每行一条分享链接，写入配置的输出路径；
//! - JSON 明细：完整结论的美化输出，便于二次处理。

use tracing::warn;

use crate::common::countrymap;
use crate::error::AppError;
use crate::link;
use crate::link::util::pct_decode;
use crate::model::BenchResult;

const COLOR_RED: &str = "\x1b[31m";
const COLOR_GREEN: &str = "\x1b[32m";
const COLOR_YELLOW: &str = "\x1b[33m";
const COLOR_RESET: &str = "\x1b[0m";

/// 打印结果表格。落地 IP 与解锁两列只在有数据时出现。
pub fn print_table(results: &[BenchResult]) {
    let has_ip = results.iter().any(|r| !r.ip_info.is_empty());
    let has_unlock = results.iter().any(|r| !r.unlock_results.is_empty());

    let mut header = vec![
        "序号", "节点名称", "类型", "延迟", "抖动", "丢包率", "下载速度", "上传速度",
    ];
    if has_ip {
        header.push("落地 IP");
    }
    if has_unlock {
        header.push("解锁");
    }

    println!();
    println!("{}", header.join("\t"));

    for (i, r) in results.iter().enumerate() {
        let mut row = vec![
            format!("{}.", i + 1),
            r.name.clone(),
            r.proto.clone(),
            colored_latency(r),
            colored_jitter(r),
            colored_loss(r),
            colored_download(r),
            colored_upload(r),
        ];
        if has_ip {
            row.push(ip_cell(r));
        }
        if has_unlock {
            let unlock = r.unlock_summary();
            row.push(if unlock.is_empty() { "N/A".to_string() } else { unlock });
        }
        println!("{}", row.join("\t"));
    }
    println!();
}

fn ip_cell(r: &BenchResult) -> String {
    if r.ip_info.is_empty() {
        return "N/A".to_string();
    }
    let mut cell = format!(
        "{}{} {}",
        r.ip_info.country_flag,
        countrymap::chinese_name(&r.ip_info.country),
        r.ip_info.ip
    );
    if !r.ip_info.risk_info.is_empty() {
        cell.push(' ');
        cell.push_str(&r.ip_info.risk_info);
    }
    cell
}

fn colored_latency(r: &BenchResult) -> String {
    let ms = r.latency.average.as_millis();
    let color = if ms == 0 {
        COLOR_RED
    } else if ms < 800 {
        COLOR_GREEN
    } else if ms < 1500 {
        COLOR_YELLOW
    } else {
        COLOR_RED
    };
    format!("{}{}{}", color, r.fmt_latency(), COLOR_RESET)
}

fn colored_jitter(r: &BenchResult) -> String {
    let ms = r.latency.jitter.as_millis();
    let color = if ms == 0 {
        COLOR_RED
    } else if ms < 800 {
        COLOR_GREEN
    } else if ms < 1500 {
        COLOR_YELLOW
    } else {
        COLOR_RED
    };
    format!("{}{}{}", color, r.fmt_jitter(), COLOR_RESET)
}

fn colored_loss(r: &BenchResult) -> String {
    let loss = r.latency.packet_loss;
    let color = if loss < 10.0 {
        COLOR_GREEN
    } else if loss < 20.0 {
        COLOR_YELLOW
    } else {
        COLOR_RED
    };
    format!("{}{}{}", color, r.fmt_packet_loss(), COLOR_RESET)
}

fn colored_download(r: &BenchResult) -> String {
    let mbps = r.download_speed / (1024.0 * 1024.0);
    let color = if mbps >= 10.0 {
        COLOR_GREEN
    } else if mbps >= 5.0 {
        COLOR_YELLOW
    } else {
        COLOR_RED
    };
    format!("{}{}{}", color, r.fmt_download_speed(), COLOR_RESET)
}

fn colored_upload(r: &BenchResult) -> String {
    let mbps = r.upload_speed / (1024.0 * 1024.0);
    let color = if mbps >= 5.0 {
        COLOR_GREEN
    } else if mbps >= 2.0 {
        COLOR_YELLOW
    } else {
        COLOR_RED
    };
    format!("{}{}{}", color, r.fmt_upload_speed(), COLOR_RESET)
}

/// 将结果导出为链接清单，每行一条。
///
/// 链接在写入前做一次百分号解码以保持可读；编码失败的节点退回
/// 只写名称并记录告警。
pub fn save_links(results: &[BenchResult], path: &str) -> Result<(), AppError> {
    let mut lines = Vec::with_capacity(results.len());
    for r in results {
        match link::encode(&r.name, &r.config) {
            Ok(uri) => lines.push(pct_decode(&uri)),
            Err(e) => {
                warn!("⚠️ 节点 {} 无法导出为链接: {}", r.name, e);
                lines.push(r.name.clone());
            }
        }
    }
    std::fs::write(path, lines.join("\n"))?;
    Ok(())
}

/// 将完整结论写成美化 JSON。
pub fn save_json(results: &[BenchResult], path: &str) -> Result<(), AppError> {
    let json = serde_json::to_string_pretty(results)
        .map_err(|e| AppError::ConfigError(format!("结果序列化失败: {e}")))?;
    std::fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::proxy::{ProxyConfig, TrojanConfig};
    use std::time::Duration;

    fn sample(latency_ms: u64, download: f64) -> BenchResult {
        let mut r = BenchResult::new(
            "测试 节点",
            ProxyConfig::Trojan(TrojanConfig {
                server: "t.example.com".into(),
                port: 443,
                password: "pw".into(),
                ..Default::default()
            }),
        );
        r.latency.average = Duration::from_millis(latency_ms);
        r.download_speed = download;
        r
    }

    #[test]
    fn latency_colors_follow_thresholds() {
        assert!(colored_latency(&sample(100, 0.0)).starts_with(COLOR_GREEN));
        assert!(colored_latency(&sample(1000, 0.0)).starts_with(COLOR_YELLOW));
        assert!(colored_latency(&sample(2000, 0.0)).starts_with(COLOR_RED));
        assert!(colored_latency(&sample(0, 0.0)).starts_with(COLOR_RED));
    }

    #[test]
    fn download_colors_use_mb_per_second() {
        let mb = 1024.0 * 1024.0;
        assert!(colored_download(&sample(0, 20.0 * mb)).starts_with(COLOR_GREEN));
        assert!(colored_download(&sample(0, 6.0 * mb)).starts_with(COLOR_YELLOW));
        assert!(colored_download(&sample(0, 1.0 * mb)).starts_with(COLOR_RED));
    }

    #[test]
    fn links_file_holds_one_uri_per_result() {
        let results = vec![sample(100, 0.0), sample(200, 0.0)];
        let path = std::env::temp_dir().join("arena_report_links_test.txt");
        save_links(&results, path.to_str().unwrap()).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("trojan://pw@t.example.com:443"));
        // 写盘前做过解码，锚点里的名称应当还原
        assert!(lines[0].ends_with("#测试 节点"));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn json_dump_is_pretty_printed() {
        let results = vec![sample(100, 0.0)];
        let path = std::env::temp_dir().join("arena_report_json_test.json");
        save_json(&results, path.to_str().unwrap()).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"type\": \"trojan\""));
        assert!(content.contains("\"latency\": 100"));
        std::fs::remove_file(&path).ok();
    }
}

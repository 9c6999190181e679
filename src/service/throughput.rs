//! # 吞吐探测模块
//!
//! 下载与上传各拆成 `concurrent` 条子连接同时跑：
//! - 下载走 `{server}/__down?bytes=N`，按流式读出计数
//! - 上传向 `{server}/__up` 灌零字节流
//!
//! 失败的子连接直接剔除、不重试；被超时截断的部分字节照常计入。
//! 聚合速度 = 总字节数 / 各子连接耗时均值。

use std::time::{Duration, Instant};

use bytes::Bytes;
use futures::StreamExt;
use futures::future::join_all;
use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::common::utils::round2;

const ZERO_CHUNK_SIZE: usize = 64 * 1024;
static ZERO_CHUNK: [u8; ZERO_CHUNK_SIZE] = [0; ZERO_CHUNK_SIZE];

/// 单条子连接的传输成果。
#[derive(Debug, Clone, Copy)]
pub struct TransferSample {
    pub bytes: u64,
    pub elapsed: Duration,
}

/// 一个方向（下载或上传）的聚合结论。
#[derive(Debug, Clone, Copy, Default)]
pub struct ThroughputReport {
    /// 成功子连接传输的总字节数。
    pub bytes: f64,
    /// 成功子连接的平均耗时。
    pub time: Duration,
    /// 字节每秒。
    pub speed: f64,
}

/// 双向吞吐探测。两个方向的子连接同时发出，共享同一条代理出口。
pub async fn run(
    client: &Client,
    server_url: &str,
    download_total: u64,
    upload_total: u64,
    fan_out: usize,
) -> (ThroughputReport, ThroughputReport) {
    let dl_chunk = download_total / fan_out as u64;
    let ul_chunk = upload_total / fan_out as u64;

    let dl_futs = (0..fan_out).map(|_| download_leg(client, server_url, dl_chunk));
    let ul_futs = (0..fan_out).map(|_| upload_leg(client, server_url, ul_chunk));
    let (dl_samples, ul_samples) = futures::join!(join_all(dl_futs), join_all(ul_futs));

    let download = aggregate(dl_samples);
    let upload = aggregate(ul_samples);
    debug!(
        "吞吐探测完成: 下载 {:.0}B/{}ms 上传 {:.0}B/{}ms",
        download.bytes,
        download.time.as_millis(),
        upload.bytes,
        upload.time.as_millis()
    );
    (download, upload)
}

async fn download_leg(client: &Client, server_url: &str, chunk: u64) -> Option<TransferSample> {
    let start = Instant::now();
    let resp = client
        .get(format!("{server_url}/__down?bytes={chunk}"))
        .send()
        .await
        .ok()?;
    if resp.status() != StatusCode::OK {
        return None;
    }
    let mut stream = resp.bytes_stream();
    let mut count: u64 = 0;
    while let Some(piece) = stream.next().await {
        match piece {
            Ok(b) => count += b.len() as u64,
            // 超时或断流时保留已收到的字节
            Err(_) => break,
        }
    }
    Some(TransferSample { bytes: count, elapsed: start.elapsed() })
}

async fn upload_leg(client: &Client, server_url: &str, chunk: u64) -> Option<TransferSample> {
    let start = Instant::now();
    let body = reqwest::Body::wrap_stream(zero_stream(chunk));
    let resp = client
        .post(format!("{server_url}/__up"))
        .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
        .body(body)
        .send()
        .await
        .ok()?;
    if resp.status() != StatusCode::OK {
        return None;
    }
    Some(TransferSample { bytes: chunk, elapsed: start.elapsed() })
}

/// 指定总量的零字节流，按 64KiB 切块。
fn zero_stream(total: u64) -> impl futures::Stream<Item = Result<Bytes, std::io::Error>> {
    futures::stream::unfold(total, |remaining| async move {
        if remaining == 0 {
            return None;
        }
        let n = remaining.min(ZERO_CHUNK_SIZE as u64) as usize;
        Some((Ok(Bytes::from_static(&ZERO_CHUNK[..n])), remaining - n as u64))
    })
}

/// 聚合一个方向的子连接成果，失败项已在上游剔除为 `None`。
pub fn aggregate(samples: Vec<Option<TransferSample>>) -> ThroughputReport {
    let ok: Vec<TransferSample> = samples.into_iter().flatten().collect();
    if ok.is_empty() {
        return ThroughputReport::default();
    }
    let total_bytes: u64 = ok.iter().map(|s| s.bytes).sum();
    let total_time: Duration = ok.iter().map(|s| s.elapsed).sum();
    let avg_time = total_time / ok.len() as u32;
    let secs = avg_time.as_secs_f64();
    let speed = if secs > 0.0 { round2(total_bytes as f64 / secs) } else { 0.0 };
    ThroughputReport { bytes: total_bytes as f64, time: avg_time, speed }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(bytes: u64, millis: u64) -> Option<TransferSample> {
        Some(TransferSample { bytes, elapsed: Duration::from_millis(millis) })
    }

    #[test]
    fn aggregate_divides_total_bytes_by_mean_elapsed() {
        let report = aggregate(vec![sample(1000, 2000), sample(2000, 4000)]);
        assert_eq!(report.bytes, 3000.0);
        assert_eq!(report.time, Duration::from_secs(3));
        assert_eq!(report.speed, 1000.0);
    }

    #[test]
    fn failed_legs_are_excluded_not_zeroed() {
        let report = aggregate(vec![None, sample(1000, 2000), None]);
        assert_eq!(report.bytes, 1000.0);
        assert_eq!(report.speed, 500.0);
    }

    #[test]
    fn all_failed_yields_zero_report() {
        let report = aggregate(vec![None, None]);
        assert_eq!(report.bytes, 0.0);
        assert_eq!(report.speed, 0.0);
        assert!(report.time.is_zero());
    }

    #[tokio::test]
    async fn zero_stream_emits_exact_total() {
        let total: u64 = ZERO_CHUNK_SIZE as u64 * 2 + 123;
        let emitted: u64 = zero_stream(total)
            .map(|b| b.map(|b| b.len() as u64).unwrap_or(0))
            .fold(0, |acc, n| async move { acc + n })
            .await;
        assert_eq!(emitted, total);
    }
}

//! Load testing for the stream endpoint.

use std::time::{Duration, Instant};

use stream_endpoint::client::StreamVerifier;

mod common;

#[tokio::test]
async fn test_stream_throughput() {
    let server = common::start_server(Duration::ZERO).await;

    let concurrency = 16;
    let requests_per_task = 10;
    let total_requests = concurrency * requests_per_task;
    let (chunk, count) = (64 * 1024, 16);

    let client = common::client();
    let start = Instant::now();

    let mut tasks = Vec::new();
    for _ in 0..concurrency {
        let client = client.clone();
        let url = server.url(&format!("/stream1?chunk={chunk}&count={count}"));
        tasks.push(tokio::spawn(async move {
            let mut latencies = Vec::new();
            let mut bytes = 0u64;
            for _ in 0..requests_per_task {
                let req_start = Instant::now();
                let Ok(mut res) = client.get(&url).send().await else {
                    continue;
                };
                let mut verifier = StreamVerifier::new();
                while let Ok(Some(piece)) = res.chunk().await {
                    if verifier.feed(&piece).is_err() {
                        break;
                    }
                }
                if let Ok(report) = verifier.finish() {
                    bytes += report.payload_bytes;
                    latencies.push(req_start.elapsed());
                }
            }
            (latencies, bytes)
        }));
    }

    let mut all_latencies = Vec::new();
    let mut total_bytes = 0u64;
    for task in tasks {
        let (latencies, bytes) = task.await.unwrap();
        all_latencies.extend(latencies);
        total_bytes += bytes;
    }

    let duration = start.elapsed();
    let rps = total_requests as f64 / duration.as_secs_f64();
    let mib_per_sec = total_bytes as f64 / duration.as_secs_f64() / (1024.0 * 1024.0);

    if all_latencies.is_empty() {
        panic!("No successful streams recorded");
    }
    assert_eq!(all_latencies.len(), total_requests);
    assert_eq!(total_bytes, (total_requests * count * (1 + chunk)) as u64);

    all_latencies.sort();
    let p50 = all_latencies[all_latencies.len() / 2];
    let p99 = all_latencies[(all_latencies.len() as f64 * 0.99) as usize];

    println!("\n--- Load Test Results ---");
    println!("Total Requests: {}", total_requests);
    println!("Concurrency:    {}", concurrency);
    println!("Total Duration: {:?}", duration);
    println!("Requests/sec:   {:.2}", rps);
    println!("Throughput:     {:.2} MiB/s", mib_per_sec);
    println!("P50 Latency:    {:?}", p50);
    println!("P99 Latency:    {:?}", p99);
    println!("-------------------------\n");
}

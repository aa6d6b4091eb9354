use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use stream_endpoint::client::{StreamReport, StreamVerifier};

#[derive(Parser)]
#[command(name = "stream-client")]
#[command(about = "Drive and verify a stream-endpoint server", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch /stream1 and verify the framing
    Stream {
        /// Chunk size in bytes (server default when omitted)
        #[arg(long)]
        chunk: Option<i64>,

        /// Number of chunks (server default when omitted)
        #[arg(long)]
        count: Option<i64>,

        /// Concurrent requests
        #[arg(short = 'j', long, default_value_t = 1)]
        concurrency: usize,
    },
    /// Time the /sleep acknowledgement and completion
    Sleep,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Stream {
            chunk,
            count,
            concurrency,
        } => {
            let mut query = Vec::new();
            if let Some(chunk) = chunk {
                query.push(("chunk", chunk.to_string()));
            }
            if let Some(count) = count {
                query.push(("count", count.to_string()));
            }

            let started = Instant::now();
            let mut tasks = Vec::new();
            for _ in 0..concurrency.max(1) {
                let request = client
                    .get(format!("{}/stream1", cli.url))
                    .query(&query);
                tasks.push(tokio::spawn(async move { fetch_stream(request).await }));
            }

            let mut total_bytes = 0u64;
            let mut failures = 0usize;
            for (i, task) in tasks.into_iter().enumerate() {
                match task.await? {
                    Ok((report, elapsed)) => {
                        total_bytes += report.payload_bytes;
                        println!(
                            "#{i}: chunk={} count={} segments={} bytes={} in {:?} ({})",
                            report.params.chunk,
                            report.params.count,
                            report.segments,
                            report.payload_bytes,
                            elapsed,
                            throughput(report.payload_bytes, elapsed)
                        );
                    }
                    Err(e) => {
                        failures += 1;
                        eprintln!("#{i}: {e}");
                    }
                }
            }

            let elapsed = started.elapsed();
            println!("\n--- Stream Results ---");
            println!("Requests:   {}", concurrency.max(1));
            println!("Failures:   {failures}");
            println!("Bytes:      {total_bytes}");
            println!("Duration:   {elapsed:?}");
            println!("Throughput: {}", throughput(total_bytes, elapsed));

            if failures > 0 {
                return Err(format!("{failures} stream(s) failed verification").into());
            }
        }
        Commands::Sleep => {
            let started = Instant::now();
            let mut res = client.get(format!("{}/sleep", cli.url)).send().await?;
            let mut body = Vec::new();
            if let Some(first) = res.chunk().await? {
                println!(
                    "{:?}: {}",
                    started.elapsed(),
                    String::from_utf8_lossy(&first)
                );
                body.extend_from_slice(&first);
            }
            while let Some(next) = res.chunk().await? {
                body.extend_from_slice(&next);
            }
            println!("{:?}: {}", started.elapsed(), String::from_utf8_lossy(&body));
        }
    }

    Ok(())
}

async fn fetch_stream(
    request: reqwest::RequestBuilder,
) -> Result<(StreamReport, Duration), Box<dyn std::error::Error + Send + Sync>> {
    let started = Instant::now();
    let mut res = request.send().await?;

    let status = res.status();
    if !status.is_success() {
        let text = res.text().await.unwrap_or_default();
        return Err(format!("server returned {status}: {text}").into());
    }

    let mut verifier = StreamVerifier::new();
    while let Some(piece) = res.chunk().await? {
        verifier.feed(&piece)?;
    }

    Ok((verifier.finish()?, started.elapsed()))
}

fn throughput(bytes: u64, elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    if secs == 0.0 {
        return "n/a".to_string();
    }
    format!("{:.2} MiB/s", bytes as f64 / secs / (1024.0 * 1024.0))
}

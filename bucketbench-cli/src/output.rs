use std::time::Duration;

use bucketbench_engine::Report;
use bytesize::ByteSize;
use sketches_ddsketch::DDSketch;
use yansi::Paint;

pub fn print_report(report: &Report, elapsed: Duration, concurrency: usize) {
    println!();
    println!(
        "{} ({} files, workers: {})",
        "## DOWNLOADED".bold().green(),
        report.files_downloaded.bold(),
        concurrency.bold()
    );
    println!("  total: {}", ByteSize::b(report.bytes_downloaded).bold());
    print_throughput(report.bytes_downloaded, elapsed);

    println!();
    println!(
        "{} ({} files)",
        "## CONSUMED".bold().green(),
        report.files_consumed.bold()
    );
    println!("  total: {}", ByteSize::b(report.bytes_consumed).bold());

    let samples = &report.first_byte_latencies;
    println!();
    println!(
        "{} ({} samples)",
        "## FIRST-BYTE LATENCY".bold().green(),
        samples.len().bold()
    );
    if !samples.is_empty() {
        let mut sketch = DDSketch::default();
        for latency in samples {
            sketch.add(latency.as_secs_f64());
        }
        print_percentiles(&sketch);
    }
}

fn print_throughput(total: u64, elapsed: Duration) {
    let throughput = (total as f64 / elapsed.as_secs_f64()) as u64;
    println!("  {}/s", ByteSize::b(throughput).bold());
}

fn print_percentiles(sketch: &DDSketch) {
    let count = sketch.count();
    let avg = Duration::from_secs_f64(sketch.sum().unwrap() / count as f64);
    let p50 = Duration::from_secs_f64(sketch.quantile(0.5).unwrap().unwrap());
    let p90 = Duration::from_secs_f64(sketch.quantile(0.9).unwrap().unwrap());
    let p99 = Duration::from_secs_f64(sketch.quantile(0.99).unwrap().unwrap());
    println!(
        "  avg: {:.2?}; p50: {p50:.2?}; p90: {p90:.2?}; p99: {p99:.2?}",
        avg.bold()
    );
}

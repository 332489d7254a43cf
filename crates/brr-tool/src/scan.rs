//! ROM scanning and sample catalogs

use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::Serialize;
use snes_brr::constants::SAMPLES_PER_BLOCK;
use snes_brr::{
    default_rom_regions, export_to_wav, DecoderConfig, RomSampleScanner, SampleRecord, ScanRegion,
    ScanReport,
};
use tracing::info;

use crate::args::ScanArgs;

/// Flat CSV row for one sample
#[derive(Serialize)]
struct CatalogRow {
    offset: String,
    length: usize,
    blocks: usize,
    has_loop: bool,
    has_end: bool,
    loop_start_block: Option<usize>,
    filters: String,
    shift_min: u8,
    shift_max: u8,
    header_issues: usize,
}

impl From<&SampleRecord> for CatalogRow {
    fn from(record: &SampleRecord) -> Self {
        CatalogRow {
            offset: format!("0x{:06X}", record.offset),
            length: record.length,
            blocks: record.block_count,
            has_loop: record.has_loop,
            has_end: record.has_end,
            loop_start_block: record.loop_start_block,
            filters: record
                .filters_used
                .iter()
                .map(u8::to_string)
                .collect::<Vec<_>>()
                .join(";"),
            shift_min: record.shift_range.0,
            shift_max: record.shift_range.1,
            header_issues: record.header_issue_count,
        }
    }
}

pub fn run(args: &ScanArgs) -> anyhow::Result<()> {
    let rom = fs::read(&args.rom).with_context(|| format!("failed to read {}", args.rom.display()))?;
    let regions = scan_regions(&args.regions, rom.len());
    info!(
        rom = %args.rom.display(),
        bytes = rom.len(),
        regions = regions.len(),
        "scanning"
    );

    let scanner = RomSampleScanner::new().with_max_blocks(args.max_blocks);
    let report = scanner.scan_with_stats(&rom, &regions);
    print_summary(&report);

    if let Some(path) = &args.json {
        fs::write(path, report.to_json(args.pretty)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Report: {}", path.display());
    }
    if let Some(path) = &args.csv {
        write_csv(path, &report.records)?;
        println!("Catalog: {}", path.display());
    }
    if let Some(dir) = &args.extract_dir {
        let count = extract_samples(&rom, &report.records, dir, args.wav)?;
        println!("Extracted {count} samples to {}", dir.display());
    }
    Ok(())
}

/// Requested regions, else the standard windows, else the whole buffer
fn scan_regions(requested: &[ScanRegion], len: usize) -> Vec<ScanRegion> {
    if !requested.is_empty() {
        return requested.to_vec();
    }
    let regions = default_rom_regions(len);
    if regions.is_empty() {
        info!("file is smaller than the standard ROM windows; scanning all of it");
        vec![ScanRegion::whole(len)]
    } else {
        regions
    }
}

fn print_summary(report: &ScanReport) {
    let stats = &report.stats;
    println!("Samples found: {}", stats.samples_found);
    println!("Average sample size: {:.1} bytes", stats.average_sample_size());
    if !stats.validation_failures.is_empty() {
        println!("Validation failures:");
        for (reason, count) in &stats.validation_failures {
            println!("  {reason}: {count}");
        }
    }
    if !stats.header_issues.is_empty() {
        println!("Header issues:");
        for (issue, count) in &stats.header_issues {
            println!("  {issue}: {count}");
        }
    }
    if !report.recommendations.is_empty() {
        println!("Recommendations:");
        for (i, hint) in report.recommendations.iter().enumerate() {
            println!("  {}. {hint}", i + 1);
        }
    }
}

fn write_csv(path: &Path, records: &[SampleRecord]) -> anyhow::Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("failed to create {}", path.display()))?;
    for record in records {
        writer.serialize(CatalogRow::from(record))?;
    }
    writer.flush()?;
    Ok(())
}

fn extract_samples(
    rom: &[u8],
    records: &[SampleRecord],
    dir: &Path,
    render_wav: bool,
) -> anyhow::Result<usize> {
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    let mut count = 0;
    for record in records {
        let Some(bytes) = record.bytes(rom) else {
            continue;
        };
        let stem = format!("sample_{:06X}", record.offset);
        fs::write(dir.join(format!("{stem}.brr")), bytes)?;
        if render_wav {
            let config = match record.loop_start_offset() {
                Some(loop_start) => {
                    DecoderConfig::raw().looping(loop_start, record.block_count * SAMPLES_PER_BLOCK * 2)
                }
                None => DecoderConfig::raw(),
            };
            export_to_wav(bytes, &config, dir.join(format!("{stem}.wav")))?;
        }
        count += 1;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOISE: [u8; 8] = [0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC, 0xDE, 0xF0];

    fn blob_with_sample() -> Vec<u8> {
        let mut blob = vec![0xFFu8; 64];
        blob[10] = 0x22;
        blob[11..19].copy_from_slice(&NOISE);
        blob[19] = 0x21;
        blob[20..28].copy_from_slice(&NOISE);
        blob
    }

    #[test]
    fn test_small_file_scans_whole_buffer() {
        assert_eq!(scan_regions(&[], 64), vec![ScanRegion::whole(64)]);
        let requested = [ScanRegion::new(4, 8)];
        assert_eq!(scan_regions(&requested, 64), requested.to_vec());
    }

    #[test]
    fn test_catalog_row() {
        let blob = blob_with_sample();
        let records = RomSampleScanner::new().scan(&blob, ScanRegion::whole(blob.len()));
        let row = CatalogRow::from(&records[0]);
        assert_eq!(row.offset, "0x00000A");
        assert_eq!(row.blocks, 2);
        assert_eq!(row.filters, "0");
    }

    #[test]
    fn test_scan_writes_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let rom = dir.path().join("blob.bin");
        fs::write(&rom, blob_with_sample()).unwrap();
        let args = ScanArgs {
            rom,
            regions: Vec::new(),
            json: Some(dir.path().join("report.json")),
            pretty: true,
            csv: Some(dir.path().join("catalog.csv")),
            extract_dir: Some(dir.path().join("samples")),
            wav: true,
            max_blocks: 500,
        };
        run(&args).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("report.json")).unwrap())
                .unwrap();
        assert_eq!(json["records"][0]["offset"], 10);
        let csv = fs::read_to_string(dir.path().join("catalog.csv")).unwrap();
        assert_eq!(csv.lines().count(), 2);
        assert!(csv.starts_with("offset,length,blocks"));
        assert_eq!(
            fs::read(dir.path().join("samples/sample_00000A.brr")).unwrap().len(),
            18
        );
        assert!(dir.path().join("samples/sample_00000A.wav").exists());
    }
}

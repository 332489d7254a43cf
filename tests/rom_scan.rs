#![cfg(feature = "scanner")]

use snes_brr::scanner::RejectReason;
use snes_brr::{decode_raw, RomSampleScanner, ScanRegion, Termination};

const NOISE: [u8; 8] = [0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC, 0xDE, 0xF0];

fn place(buf: &mut [u8], offset: usize, header: u8, data: [u8; 8]) {
    buf[offset] = header;
    buf[offset + 1..offset + 9].copy_from_slice(&data);
}

#[test]
fn printable_text_is_never_a_sample() {
    let text: Vec<u8> = b"The quick brown fox jumps over the lazy dog! 0123456789 {[(<~>)]}"
        .iter()
        .copied()
        .cycle()
        .take(100)
        .collect();
    let report = RomSampleScanner::new().scan_with_stats(&text, &[ScanRegion::whole(text.len())]);
    assert!(report.records.is_empty());
    assert_eq!(report.stats.chains_walked, 0);
}

#[test]
fn finds_looping_sample_in_erased_flash() {
    let mut rom = vec![0xFFu8; 100];
    place(&mut rom, 37, 0x42, NOISE);
    place(&mut rom, 46, 0x41, NOISE);

    let records = RomSampleScanner::new().scan(&rom, ScanRegion::whole(rom.len()));
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.offset, 37);
    assert_eq!(record.block_count, 2);
    assert!(record.has_loop);
    assert!(record.has_end);
    // shift 4 sets bit 6
    assert_eq!(record.header_issue_count, 2);
}

#[test]
fn found_samples_decode_cleanly() {
    let mut rom = vec![0xFFu8; 200];
    place(&mut rom, 20, 0x24, NOISE);
    place(&mut rom, 29, 0x28, NOISE);
    place(&mut rom, 38, 0x2D, NOISE);

    let report = RomSampleScanner::new().scan_with_stats(&rom, &[ScanRegion::whole(rom.len())]);
    assert_eq!(report.records.len(), 1);
    let record = &report.records[0];
    assert_eq!(record.filters_used, vec![1, 2, 3]);
    assert_eq!(record.loop_start_block, None);

    let bytes = record.bytes(&rom).unwrap();
    let out = decode_raw(bytes);
    assert_eq!(out.termination, Termination::EndFlag);
    assert!(out.is_clean());
    assert_eq!(out.samples.len(), 48);
}

#[test]
fn report_serializes_statistics() {
    let mut rom = vec![0xFFu8; 64];
    place(&mut rom, 0, 0x31, NOISE);
    let report = RomSampleScanner::new().scan_with_stats(&rom, &[ScanRegion::new(0, 80)]);
    assert_eq!(report.records.len(), 1);
    assert!(report.stats.rejections(RejectReason::InvalidShift) > 0);
    // candidates past the buffer end skip a whole block at a time
    assert!(report.stats.rejections(RejectReason::InsufficientData) > 0);

    let json: serde_json::Value = serde_json::from_str(&report.to_json(true).unwrap()).unwrap();
    assert_eq!(json["records"][0]["block_count"], 1);
    assert_eq!(json["stats"]["loop_patterns"]["end_only"], 1);
    assert!(json["stats"]["validation_failures"]["invalid_shift"].as_u64().unwrap() > 0);
}

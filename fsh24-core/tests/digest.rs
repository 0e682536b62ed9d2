use blake2::digest::{Update, VariableOutput};
use blake2::Blake2bVar;
use fsh24_core::digest::{digest_file, digests_match, DIGEST_LEN};
use fsh24_core::HashConfig;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

fn write_random(path: &Path, bytes: usize, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let data: Vec<u8> = (0..bytes).map(|_| rng.gen()).collect();
    std::fs::write(path, data).unwrap();
}

fn overwrite(path: &Path, offset: u64, bytes: &[u8]) {
    let mut f = OpenOptions::new().read(true).write(true).open(path).unwrap();
    f.seek(SeekFrom::Start(offset)).unwrap();
    f.write_all(bytes).unwrap();
}

fn small_samples() -> HashConfig {
    HashConfig { sample_size: 4096, ..HashConfig::default() }
}

#[test]
fn hello_matches_reference_blake2b_192() {
    let td = tempfile::tempdir().unwrap();
    let p = td.path().join("hello.txt");
    std::fs::write(&p, b"HELLOHELLO").unwrap();

    let d = digest_file(&p, &HashConfig::default()).unwrap();

    let mut h = Blake2bVar::new(24).unwrap();
    h.update(b"HELLOHELLO");
    h.update(&10u64.to_be_bytes());
    let mut out = [0u8; 24];
    h.finalize_variable(&mut out).unwrap();

    assert_eq!(d.hex, hex::encode_upper(out));
    assert_eq!(d.hex.len(), DIGEST_LEN * 2);
    assert_eq!(d.chunks, 4);
    assert_eq!(d.file_size, 10);
    assert_eq!(d.bytes_hashed, 10);
}

#[test]
fn empty_file_hashes_only_the_size() {
    let td = tempfile::tempdir().unwrap();
    let p = td.path().join("empty");
    std::fs::write(&p, b"").unwrap();
    let d = digest_file(&p, &HashConfig::default()).unwrap();
    assert_eq!(d.bytes_hashed, 0);
    assert_eq!(d.chunks, 4);
    assert!(d.hex.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
}

#[test]
fn deterministic_across_runs() {
    let td = tempfile::tempdir().unwrap();
    let p = td.path().join("a.bin");
    write_random(&p, 64 * 1024, 7);
    let cfg = small_samples();
    let d1 = digest_file(&p, &cfg).unwrap();
    let d2 = digest_file(&p, &cfg).unwrap();
    assert_eq!(d1, d2);
}

#[test]
fn size_change_changes_digest() {
    let td = tempfile::tempdir().unwrap();
    let p = td.path().join("zeros.bin");
    // All zeros, so a truncated or extended copy samples identical bytes.
    std::fs::write(&p, vec![0u8; 1000]).unwrap();
    let cfg = HashConfig::default();
    let base = digest_file(&p, &cfg).unwrap();

    std::fs::write(&p, vec![0u8; 1001]).unwrap();
    let longer = digest_file(&p, &cfg).unwrap();
    std::fs::write(&p, vec![0u8; 999]).unwrap();
    let shorter = digest_file(&p, &cfg).unwrap();

    assert_ne!(base.hex, longer.hex);
    assert_ne!(base.hex, shorter.hex);
    assert_ne!(longer.hex, shorter.hex);
}

#[test]
fn long_file_reads_first_middle_and_last() {
    let td = tempfile::tempdir().unwrap();
    let p = td.path().join("long.bin");
    write_random(&p, 64 * 1024, 11);
    let d = digest_file(&p, &small_samples()).unwrap();
    assert_eq!(d.chunks, 4);
    assert_eq!(d.bytes_hashed, 4 * 4096);
}

#[test]
fn damage_inside_sampled_chunks_is_detected() {
    let td = tempfile::tempdir().unwrap();
    let p = td.path().join("long.bin");
    write_random(&p, 64 * 1024, 3);
    let cfg = small_samples();
    let base = digest_file(&p, &cfg).unwrap();

    // Samples sit at 0, 32K, 48K and 60K.
    let offsets = [100u64, 32 * 1024 + 5, 48 * 1024 + 4000, 64 * 1024 - 2];
    for (i, offset) in offsets.into_iter().enumerate() {
        write_random(&p, 64 * 1024, 3);
        overwrite(&p, offset, &[0xA5 ^ i as u8, 0x5A]);
        let d = digest_file(&p, &cfg).unwrap();
        assert_ne!(d.hex, base.hex, "damage at {offset} went unnoticed");
    }
}

#[test]
fn damage_outside_samples_is_not_detected() {
    let td = tempfile::tempdir().unwrap();
    let p = td.path().join("long.bin");
    write_random(&p, 64 * 1024, 5);
    let cfg = small_samples();
    let base = digest_file(&p, &cfg).unwrap();
    overwrite(&p, 10 * 1024, &[0xFF; 512]);
    assert_eq!(digest_file(&p, &cfg).unwrap().hex, base.hex);
}

#[test]
fn file_just_at_overlap_limit_hashes_first_chunk_only() {
    let td = tempfile::tempdir().unwrap();
    let p = td.path().join("edge.bin");
    // sample * total_chunks exactly: not strictly larger, so no middle/last.
    write_random(&p, 4 * 4096, 9);
    let d = digest_file(&p, &small_samples()).unwrap();
    assert_eq!(d.bytes_hashed, 4096);

    // Changing bytes past the first chunk keeps the digest.
    let base = d.hex;
    overwrite(&p, 3 * 4096, &[1, 2, 3, 4]);
    assert_eq!(digest_file(&p, &small_samples()).unwrap().hex, base);
}

#[test]
fn missing_file_is_io_error() {
    let td = tempfile::tempdir().unwrap();
    let err = digest_file(&td.path().join("nope"), &HashConfig::default()).unwrap_err();
    assert!(matches!(err, fsh24_core::Error::Io { .. }), "{err:?}");
}

#[test]
fn invalid_config_rejected() {
    let td = tempfile::tempdir().unwrap();
    let p = td.path().join("x");
    std::fs::write(&p, b"x").unwrap();
    for cfg in [
        HashConfig { sample_size: 0, ..HashConfig::default() },
        HashConfig { target_coverage: 0.0, ..HashConfig::default() },
        HashConfig { target_coverage: f64::NAN, ..HashConfig::default() },
    ] {
        assert!(matches!(digest_file(&p, &cfg), Err(fsh24_core::Error::InvalidConfig(_))));
    }
}

#[test]
fn digest_comparison_ignores_case() {
    assert!(digests_match("ABCDEF0123", "abcdef0123"));
    assert!(!digests_match("ABCDEF0123", "ABCDEF0124"));
}
